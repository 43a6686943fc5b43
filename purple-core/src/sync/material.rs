//! Material node differ (spec §4.7): fragments form a small DAG inside the
//! node (a fragment can reference another fragment by id); equality is
//! structural, and fragments are pushed in dependency order so the server
//! never receives a reference to a fragment it hasn't seen yet.

use std::collections::HashSet;

use crate::node::{FragmentRef, MaterialContent, MaterialFragment, Node, NodeContent};
use crate::transport::{LayerData, OutboundCommand, RemoteNodeView};

pub fn diff(node: &Node, remote: &dyn RemoteNodeView) -> Vec<OutboundCommand> {
    let NodeContent::Material(local) = &node.content else {
        return Vec::new();
    };
    let NodeContent::Material(remote_content) = remote.content() else {
        return vec![OutboundCommand::SetContent {
            remote: remote.remote_id(),
            content: node.content.clone(),
        }];
    };

    if fragments_equal(local, remote_content) {
        return Vec::new();
    }

    let remote_id = remote.remote_id();
    ordered_fragments(local)
        .into_iter()
        .map(|fragment| OutboundCommand::SetLayer {
            remote: remote_id,
            layer: fragment.id.to_string(),
            data: LayerData::Fragment(fragment.clone()),
        })
        .collect()
}

fn fragments_equal(a: &MaterialContent, b: &MaterialContent) -> bool {
    a.fragments.len() == b.fragments.len()
        && a.fragments.iter().all(|fa| b.fragments.iter().any(|fb| fb.id == fa.id && fragment_content_equal(fa, fb)))
}

fn fragment_content_equal(a: &MaterialFragment, b: &MaterialFragment) -> bool {
    a.fragment_type == b.fragment_type && a.scalars == b.scalars && a.refs == b.refs
}

/// Topologically orders fragments so a fragment referencing another by id
/// always comes after its dependency (naive DFS, bounded by fragment count
/// — the same style as the module dependency check in `crate::graph`).
fn ordered_fragments(content: &MaterialContent) -> Vec<&MaterialFragment> {
    let mut ordered = Vec::with_capacity(content.fragments.len());
    let mut visited = HashSet::new();

    fn visit<'a>(
        id: u32,
        content: &'a MaterialContent,
        visited: &mut HashSet<u32>,
        ordered: &mut Vec<&'a MaterialFragment>,
    ) {
        if !visited.insert(id) {
            return;
        }
        let Some(fragment) = content.fragments.iter().find(|f| f.id == id) else {
            return;
        };
        for (_, reference) in &fragment.refs {
            if let FragmentRef::Fragment(dep) = reference {
                visit(*dep, content, visited, ordered);
            }
        }
        ordered.push(fragment);
    }

    for fragment in &content.fragments {
        visit(fragment.id, content, &mut visited, &mut ordered);
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeId, NodeKind};
    use crate::transport::FakeRemoteNode;
    use purple_types::{GraphId, ModuleId, RemoteId};

    fn node_with(fragments: Vec<MaterialFragment>) -> Node {
        Node {
            id: NodeId(1),
            kind: NodeKind::Material,
            name: "m".into(),
            owner: GraphId::new(1),
            creator: ModuleId::new(1),
            tag_groups: vec![],
            remote_id: RemoteId(1),
            content: NodeContent::Material(MaterialContent { fragments }),
            notify: vec![],
        }
    }

    #[test]
    fn dependency_fragment_sorts_before_dependant() {
        let content = MaterialContent {
            fragments: vec![
                MaterialFragment {
                    id: 1,
                    fragment_type: "mix".into(),
                    scalars: vec![],
                    refs: vec![("input".into(), FragmentRef::Fragment(2))],
                },
                MaterialFragment {
                    id: 2,
                    fragment_type: "color".into(),
                    scalars: vec![],
                    refs: vec![],
                },
            ],
        };
        let ordered = ordered_fragments(&content);
        let positions: Vec<u32> = ordered.iter().map(|f| f.id).collect();
        assert_eq!(positions, vec![2, 1]);
    }

    #[test]
    fn identical_fragments_emit_nothing() {
        let fragments = vec![MaterialFragment {
            id: 1,
            fragment_type: "color".into(),
            scalars: vec![],
            refs: vec![],
        }];
        let node = node_with(fragments.clone());
        let remote = FakeRemoteNode {
            remote_id: RemoteId(1),
            name: "m".into(),
            kind: NodeKind::Material,
            content: NodeContent::Material(MaterialContent { fragments }),
            tag_groups: vec![],
        };
        assert!(diff(&node, &remote).is_empty());
    }
}
