//! Curve node differ (spec §4.7): curves matched by name, keys compared
//! across every dimension plus both tangents.

use crate::node::{CurveContent, CurveDef, Node, NodeContent};
use crate::transport::{LayerData, OutboundCommand, RemoteNodeView};

pub fn diff(node: &Node, remote: &dyn RemoteNodeView) -> Vec<OutboundCommand> {
    let NodeContent::Curve(local) = &node.content else {
        return Vec::new();
    };
    let NodeContent::Curve(remote_content) = remote.content() else {
        return vec![OutboundCommand::SetContent {
            remote: remote.remote_id(),
            content: node.content.clone(),
        }];
    };

    let remote_id = remote.remote_id();
    let mut commands = Vec::new();

    for curve in &local.curves {
        let matches = remote_content.curves.iter().find(|c| c.name == curve.name);
        if matches.map(|r| !curves_equal(r, curve)).unwrap_or(true) {
            commands.push(OutboundCommand::SetLayer {
                remote: remote_id,
                layer: curve.name.clone(),
                data: LayerData::Curve(curve.clone()),
            });
        }
    }
    for stale in &remote_content.curves {
        if !local.curves.iter().any(|c| c.name == stale.name) {
            commands.push(OutboundCommand::DeleteLayer {
                remote: remote_id,
                layer: stale.name.clone(),
            });
        }
    }
    commands
}

fn curves_equal(a: &CurveDef, b: &CurveDef) -> bool {
    a.keys == b.keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{CurveKey, NodeId, NodeKind, Tangent};
    use crate::transport::FakeRemoteNode;
    use purple_types::{GraphId, ModuleId, RemoteId};

    fn key(position: f64, values: Vec<f64>) -> CurveKey {
        CurveKey {
            position,
            values,
            pre: Tangent { pos: 0.0, value: 0.0 },
            post: Tangent { pos: 0.0, value: 0.0 },
        }
    }

    fn node_with(curves: Vec<CurveDef>) -> Node {
        Node {
            id: NodeId(1),
            kind: NodeKind::Curve,
            name: "c".into(),
            owner: GraphId::new(1),
            creator: ModuleId::new(1),
            tag_groups: vec![],
            remote_id: RemoteId(1),
            content: NodeContent::Curve(CurveContent { curves }),
            notify: vec![],
        }
    }

    #[test]
    fn identical_keys_emit_nothing() {
        let curve = CurveDef {
            name: "x".into(),
            keys: vec![key(0.0, vec![1.0])],
        };
        let node = node_with(vec![curve.clone()]);
        let remote = FakeRemoteNode {
            remote_id: RemoteId(1),
            name: "c".into(),
            kind: NodeKind::Curve,
            content: NodeContent::Curve(CurveContent { curves: vec![curve] }),
            tag_groups: vec![],
        };
        assert!(diff(&node, &remote).is_empty());
    }

    #[test]
    fn changed_key_value_emits_set_layer() {
        let node = node_with(vec![CurveDef {
            name: "x".into(),
            keys: vec![key(0.0, vec![2.0])],
        }]);
        let remote = FakeRemoteNode {
            remote_id: RemoteId(1),
            name: "c".into(),
            kind: NodeKind::Curve,
            content: NodeContent::Curve(CurveContent {
                curves: vec![CurveDef {
                    name: "x".into(),
                    keys: vec![key(0.0, vec![1.0])],
                }],
            }),
            tag_groups: vec![],
        };
        let commands = diff(&node, &remote);
        assert_eq!(commands.len(), 1);
    }
}
