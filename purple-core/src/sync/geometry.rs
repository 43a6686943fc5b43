//! Geometry node differ (spec §4.7): vertex/polygon layers are matched by
//! name; a layer missing on the remote is created wholesale, an existing one
//! is diffed element-by-element within the common prefix, with vertex and
//! polygon layers using distinct per-element delete opcodes for a shrunk
//! tail.

use crate::node::{GeometryContent, Node, NodeContent, PolygonLayer, VertexLayer};
use crate::transport::{LayerData, OutboundCommand, RemoteNodeView};

pub fn diff(node: &Node, remote: &dyn RemoteNodeView) -> Vec<OutboundCommand> {
    let NodeContent::Geometry(local) = &node.content else {
        return Vec::new();
    };
    let NodeContent::Geometry(remote_content) = remote.content() else {
        return vec![OutboundCommand::SetContent {
            remote: remote.remote_id(),
            content: node.content.clone(),
        }];
    };

    let mut commands = Vec::new();
    let remote_id = remote.remote_id();

    for layer in &local.vertex_layers {
        commands.extend(diff_vertex_layer(
            remote_id,
            layer,
            remote_content.vertex_layers.iter().find(|l| l.name == layer.name),
        ));
    }
    for stale in &remote_content.vertex_layers {
        if !local.vertex_layers.iter().any(|l| l.name == stale.name) {
            commands.push(OutboundCommand::DeleteLayer {
                remote: remote_id,
                layer: stale.name.clone(),
            });
        }
    }

    for layer in &local.polygon_layers {
        commands.extend(diff_polygon_layer(
            remote_id,
            layer,
            remote_content.polygon_layers.iter().find(|l| l.name == layer.name),
        ));
    }
    for stale in &remote_content.polygon_layers {
        if !local.polygon_layers.iter().any(|l| l.name == stale.name) {
            commands.push(OutboundCommand::DeleteLayer {
                remote: remote_id,
                layer: stale.name.clone(),
            });
        }
    }

    if creases_differ(local, remote_content) {
        commands.push(OutboundCommand::SetContent {
            remote: remote_id,
            content: NodeContent::Geometry(GeometryContent {
                vertex_layers: Vec::new(),
                polygon_layers: Vec::new(),
                vertex_crease: local.vertex_crease.clone(),
                edge_crease: local.edge_crease.clone(),
            }),
        });
    }

    commands
}

fn creases_differ(local: &GeometryContent, remote: &GeometryContent) -> bool {
    local.vertex_crease != remote.vertex_crease || local.edge_crease != remote.edge_crease
}

/// If `remote` doesn't exist yet, create the layer wholesale. Otherwise
/// compare vertex-by-vertex within the common prefix, set whichever differ
/// or extend the local side, and delete whatever is left over on the remote
/// tail.
fn diff_vertex_layer(remote_id: purple_types::RemoteId, layer: &VertexLayer, remote: Option<&VertexLayer>) -> Vec<OutboundCommand> {
    let Some(remote) = remote else {
        return vec![OutboundCommand::SetLayer {
            remote: remote_id,
            layer: layer.name.clone(),
            data: LayerData::Vertices(layer.positions.clone()),
        }];
    };

    let mut commands = Vec::new();
    let common = layer.positions.len().min(remote.positions.len());
    for i in 0..common {
        if layer.positions[i] != remote.positions[i] {
            commands.push(OutboundCommand::SetVertex {
                remote: remote_id,
                layer: layer.name.clone(),
                index: i as u32,
                position: layer.positions[i],
            });
        }
    }
    for (i, position) in layer.positions.iter().enumerate().skip(common) {
        commands.push(OutboundCommand::SetVertex {
            remote: remote_id,
            layer: layer.name.clone(),
            index: i as u32,
            position: *position,
        });
    }
    for i in common..remote.positions.len() {
        commands.push(OutboundCommand::DeleteVertex {
            remote: remote_id,
            layer: layer.name.clone(),
            index: i as u32,
        });
    }
    commands
}

/// Same shape as `diff_vertex_layer` but for polygon layers, which carry
/// their own delete opcode (spec §4.7 "distinct delete opcodes").
fn diff_polygon_layer(remote_id: purple_types::RemoteId, layer: &PolygonLayer, remote: Option<&PolygonLayer>) -> Vec<OutboundCommand> {
    let Some(remote) = remote else {
        return vec![OutboundCommand::SetLayer {
            remote: remote_id,
            layer: layer.name.clone(),
            data: LayerData::Polygons(layer.polygons.clone()),
        }];
    };

    let mut commands = Vec::new();
    let common = layer.polygons.len().min(remote.polygons.len());
    for i in 0..common {
        if layer.polygons[i] != remote.polygons[i] {
            commands.push(OutboundCommand::SetPolygon {
                remote: remote_id,
                layer: layer.name.clone(),
                index: i as u32,
                polygon: layer.polygons[i].clone(),
            });
        }
    }
    for (i, polygon) in layer.polygons.iter().enumerate().skip(common) {
        commands.push(OutboundCommand::SetPolygon {
            remote: remote_id,
            layer: layer.name.clone(),
            index: i as u32,
            polygon: polygon.clone(),
        });
    }
    for i in common..remote.polygons.len() {
        commands.push(OutboundCommand::DeletePolygon {
            remote: remote_id,
            layer: layer.name.clone(),
            index: i as u32,
        });
    }
    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Crease, NodeId, NodeKind};
    use crate::transport::FakeRemoteNode;
    use purple_types::{GraphId, ModuleId, RemoteId};

    fn node_with(vertex_layers: Vec<VertexLayer>) -> Node {
        Node {
            id: NodeId(1),
            kind: NodeKind::Geometry,
            name: "g".into(),
            owner: GraphId::new(1),
            creator: ModuleId::new(1),
            tag_groups: vec![],
            remote_id: RemoteId(1),
            content: NodeContent::Geometry(GeometryContent {
                vertex_layers,
                polygon_layers: vec![],
                vertex_crease: Crease::default(),
                edge_crease: Crease::default(),
            }),
            notify: vec![],
        }
    }

    #[test]
    fn new_layer_emits_set_layer() {
        let node = node_with(vec![VertexLayer {
            name: "base".into(),
            positions: vec![[0.0, 0.0, 0.0]],
        }]);
        let remote = FakeRemoteNode {
            remote_id: RemoteId(1),
            name: "g".into(),
            kind: NodeKind::Geometry,
            content: NodeContent::Geometry(GeometryContent::default()),
            tag_groups: vec![],
        };
        let commands = diff(&node, &remote);
        assert!(matches!(commands[0], OutboundCommand::SetLayer { .. }));
    }

    #[test]
    fn removed_layer_emits_delete_layer() {
        let node = node_with(vec![]);
        let remote = FakeRemoteNode {
            remote_id: RemoteId(1),
            name: "g".into(),
            kind: NodeKind::Geometry,
            content: NodeContent::Geometry(GeometryContent {
                vertex_layers: vec![VertexLayer {
                    name: "base".into(),
                    positions: vec![],
                }],
                polygon_layers: vec![],
                vertex_crease: Crease::default(),
                edge_crease: Crease::default(),
            }),
            tag_groups: vec![],
        };
        let commands = diff(&node, &remote);
        assert!(matches!(commands[0], OutboundCommand::DeleteLayer { .. }));
    }

    #[test]
    fn identical_geometry_emits_nothing() {
        let layers = vec![VertexLayer {
            name: "base".into(),
            positions: vec![[1.0, 2.0, 3.0]],
        }];
        let node = node_with(layers.clone());
        let remote = FakeRemoteNode {
            remote_id: RemoteId(1),
            name: "g".into(),
            kind: NodeKind::Geometry,
            content: NodeContent::Geometry(GeometryContent {
                vertex_layers: layers,
                polygon_layers: vec![],
                vertex_crease: Crease::default(),
                edge_crease: Crease::default(),
            }),
            tag_groups: vec![],
        };
        assert!(diff(&node, &remote).is_empty());
    }

    #[test]
    fn changed_vertex_in_existing_layer_emits_per_element_set() {
        let node = node_with(vec![VertexLayer {
            name: "base".into(),
            positions: vec![[0.0, 0.0, 0.0], [9.0, 9.0, 9.0]],
        }]);
        let remote = FakeRemoteNode {
            remote_id: RemoteId(1),
            name: "g".into(),
            kind: NodeKind::Geometry,
            content: NodeContent::Geometry(GeometryContent {
                vertex_layers: vec![VertexLayer {
                    name: "base".into(),
                    positions: vec![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]],
                }],
                polygon_layers: vec![],
                vertex_crease: Crease::default(),
                edge_crease: Crease::default(),
            }),
            tag_groups: vec![],
        };
        let commands = diff(&node, &remote);
        assert_eq!(commands.len(), 1);
        match &commands[0] {
            OutboundCommand::SetVertex { index, position, .. } => {
                assert_eq!(*index, 1);
                assert_eq!(*position, [9.0, 9.0, 9.0]);
            }
            other => panic!("expected SetVertex, got {other:?}"),
        }
    }

    #[test]
    fn shorter_local_vertex_layer_deletes_remote_tail() {
        let node = node_with(vec![VertexLayer {
            name: "base".into(),
            positions: vec![[0.0, 0.0, 0.0]],
        }]);
        let remote = FakeRemoteNode {
            remote_id: RemoteId(1),
            name: "g".into(),
            kind: NodeKind::Geometry,
            content: NodeContent::Geometry(GeometryContent {
                vertex_layers: vec![VertexLayer {
                    name: "base".into(),
                    positions: vec![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [2.0, 2.0, 2.0]],
                }],
                polygon_layers: vec![],
                vertex_crease: Crease::default(),
                edge_crease: Crease::default(),
            }),
            tag_groups: vec![],
        };
        let commands = diff(&node, &remote);
        assert_eq!(commands.len(), 2);
        for command in &commands {
            assert!(matches!(command, OutboundCommand::DeleteVertex { .. }));
        }
    }

    #[test]
    fn shorter_local_polygon_layer_uses_polygon_delete_not_vertex_delete() {
        let node = node_with_polygons(vec![PolygonLayer {
            name: "faces".into(),
            polygons: vec![],
        }]);
        let remote = FakeRemoteNode {
            remote_id: RemoteId(1),
            name: "g".into(),
            kind: NodeKind::Geometry,
            content: NodeContent::Geometry(GeometryContent {
                vertex_layers: vec![],
                polygon_layers: vec![PolygonLayer {
                    name: "faces".into(),
                    polygons: vec![vec![0, 1, 2]],
                }],
                vertex_crease: Crease::default(),
                edge_crease: Crease::default(),
            }),
            tag_groups: vec![],
        };
        let commands = diff(&node, &remote);
        assert_eq!(commands.len(), 1);
        assert!(matches!(commands[0], OutboundCommand::DeletePolygon { .. }));
    }

    fn node_with_polygons(polygon_layers: Vec<PolygonLayer>) -> Node {
        Node {
            id: NodeId(1),
            kind: NodeKind::Geometry,
            name: "g".into(),
            owner: GraphId::new(1),
            creator: ModuleId::new(1),
            tag_groups: vec![],
            remote_id: RemoteId(1),
            content: NodeContent::Geometry(GeometryContent {
                vertex_layers: vec![],
                polygon_layers,
                vertex_crease: Crease::default(),
                edge_crease: Crease::default(),
            }),
            notify: vec![],
        }
    }
}
