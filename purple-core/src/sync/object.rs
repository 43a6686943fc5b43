//! Object node differ (spec §4.7): light color equality plus resolution of
//! pending links to other modules' nodes, which may still be waiting on
//! their own remote id.

use purple_types::{ModuleId, RemoteId};

use crate::node::{NodeContent, NodeId, NodeStore, ObjectContent};
use crate::transport::{OutboundCommand, RemoteNodeView};

/// Diffs the object node at `node_id`. `resolve_link` maps a linked module to
/// the node it currently owns (its label-0 output), independent of whether
/// that node has a remote id yet — `diff` does the remote-id check itself so
/// it can drop the pending link the same pass it resolves.
pub fn diff(
    node_id: NodeId,
    remote: &dyn RemoteNodeView,
    store: &mut NodeStore,
    resolve_link: &dyn Fn(ModuleId) -> Option<NodeId>,
) -> Vec<OutboundCommand> {
    let Some(node) = store.get(node_id) else {
        return Vec::new();
    };
    let NodeContent::Object(local) = &node.content else {
        return Vec::new();
    };
    let NodeContent::Object(remote_content) = remote.content() else {
        return vec![OutboundCommand::SetContent {
            remote: remote.remote_id(),
            content: node.content.clone(),
        }];
    };

    let mut commands = Vec::new();
    if local.light_color != remote_content.light_color {
        commands.push(OutboundCommand::SetContent {
            remote: remote.remote_id(),
            content: NodeContent::Object(ObjectContent {
                light_color: local.light_color,
                links: Vec::new(),
            }),
        });
    }

    let pending_targets: Vec<ModuleId> = local.links.iter().filter(|l| !l.deleted).map(|l| l.target).collect();

    let mut resolved: Vec<(ModuleId, RemoteId)> = Vec::new();
    for target in pending_targets {
        let Some(target_node) = resolve_link(target) else {
            continue;
        };
        let Some(target_remote) = store.get(target_node).map(|n| n.remote_id).filter(|r| r.is_known()) else {
            continue;
        };
        resolved.push((target, target_remote));
    }

    for (_, target_remote) in &resolved {
        commands.push(OutboundCommand::SetLink {
            remote: remote.remote_id(),
            target: *target_remote,
        });
    }

    if !resolved.is_empty() {
        if let Some(node) = store.get_mut(node_id) {
            if let NodeContent::Object(local) = &mut node.content {
                local.links.retain(|l| !resolved.iter().any(|(target, _)| *target == l.target));
            }
        }
    }

    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Node, NodeKind, PendingLink};
    use crate::transport::FakeRemoteNode;
    use purple_types::GraphId;

    fn node_with(light: Option<[f32; 3]>, links: Vec<PendingLink>) -> Node {
        Node {
            id: NodeId(1),
            kind: NodeKind::Object,
            name: "o".into(),
            owner: GraphId::new(1),
            creator: ModuleId::new(1),
            tag_groups: vec![],
            remote_id: RemoteId(1),
            content: NodeContent::Object(ObjectContent {
                light_color: light,
                links,
            }),
            notify: vec![],
        }
    }

    fn no_links(_: ModuleId) -> Option<NodeId> {
        None
    }

    /// Plants `node` in a fresh store under its own id (the first id a new
    /// `NodeStore` hands out), so `diff` can fetch and mutate it by id.
    fn seeded_store(node: Node) -> NodeStore {
        let mut store = NodeStore::new();
        let id = store.create(node.kind, node.owner, node.creator);
        assert_eq!(id, node.id);
        store.retain(id);
        *store.get_mut(id).unwrap() = node;
        store
    }

    #[test]
    fn equal_light_color_emits_nothing() {
        let node = node_with(Some([1.0, 1.0, 1.0]), vec![]);
        let remote = FakeRemoteNode {
            remote_id: RemoteId(1),
            name: "o".into(),
            kind: NodeKind::Object,
            content: node.content.clone(),
            tag_groups: vec![],
        };
        let mut store = seeded_store(node);
        assert!(diff(NodeId(1), &remote, &mut store, &no_links).is_empty());
    }

    #[test]
    fn different_light_color_emits_set_content() {
        let node = node_with(Some([1.0, 0.0, 0.0]), vec![]);
        let remote = FakeRemoteNode {
            remote_id: RemoteId(1),
            name: "o".into(),
            kind: NodeKind::Object,
            content: NodeContent::Object(ObjectContent {
                light_color: Some([0.0, 0.0, 0.0]),
                links: vec![],
            }),
            tag_groups: vec![],
        };
        let mut store = seeded_store(node);
        assert_eq!(diff(NodeId(1), &remote, &mut store, &no_links).len(), 1);
    }

    #[test]
    fn unresolvable_link_emits_nothing_and_stays_pending() {
        let target = ModuleId::new(7);
        let node = node_with(
            None,
            vec![PendingLink {
                target,
                deleted: false,
            }],
        );
        let remote = FakeRemoteNode {
            remote_id: RemoteId(1),
            name: "o".into(),
            kind: NodeKind::Object,
            content: node.content.clone(),
            tag_groups: vec![],
        };
        let mut store = seeded_store(node);
        let commands = diff(NodeId(1), &remote, &mut store, &no_links);
        assert!(commands.is_empty());
        let NodeContent::Object(content) = &store.get(NodeId(1)).unwrap().content else {
            unreachable!()
        };
        assert_eq!(content.links.len(), 1);
    }

    #[test]
    fn link_with_known_remote_id_emits_set_link_and_is_dropped() {
        let target = ModuleId::new(7);
        let node = node_with(
            None,
            vec![PendingLink {
                target,
                deleted: false,
            }],
        );
        let remote = FakeRemoteNode {
            remote_id: RemoteId(1),
            name: "o".into(),
            kind: NodeKind::Object,
            content: node.content.clone(),
            tag_groups: vec![],
        };
        let mut store = seeded_store(node);
        let target_node = store.create(NodeKind::Object, GraphId::new(1), ModuleId::new(2));
        store.retain(target_node);
        store.set_remote_id(target_node, RemoteId(42));

        let commands = diff(NodeId(1), &remote, &mut store, &|m| {
            if m == target {
                Some(target_node)
            } else {
                None
            }
        });
        assert!(matches!(
            commands.as_slice(),
            [OutboundCommand::SetLink { target: RemoteId(42), .. }]
        ));
        let NodeContent::Object(content) = &store.get(NodeId(1)).unwrap().content else {
            unreachable!()
        };
        assert!(content.links.is_empty());
    }
}
