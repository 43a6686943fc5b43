//! Text buffer differ (spec §4.7): edits are expressed as a Myers diff
//! against the remote's last-known content rather than a full replace, so a
//! one-character keystroke doesn't re-send an entire buffer.

use similar::{ChangeTag, TextDiff};

use crate::node::{Node, NodeContent, TextContent};
use crate::transport::{LayerData, OutboundCommand, RemoteNodeView, TextEdit};

pub fn diff(node: &Node, remote: &dyn RemoteNodeView) -> Vec<OutboundCommand> {
    let NodeContent::Text(local) = &node.content else {
        return Vec::new();
    };
    let NodeContent::Text(remote_content) = remote.content() else {
        return vec![OutboundCommand::SetContent {
            remote: remote.remote_id(),
            content: node.content.clone(),
        }];
    };

    let remote_id = remote.remote_id();
    let mut commands = Vec::new();

    for buffer in &local.buffers {
        let previous = remote_content.buffers.iter().find(|b| b.name == buffer.name);
        let previous_text = previous.map(|b| b.content.as_str()).unwrap_or("");
        if previous_text == buffer.content {
            continue;
        }
        let edits = edit_script(previous_text, &buffer.content);
        commands.push(OutboundCommand::SetLayer {
            remote: remote_id,
            layer: buffer.name.clone(),
            data: LayerData::TextEdits(edits),
        });
    }
    for stale in &remote_content.buffers {
        if !local.buffers.iter().any(|b| b.name == stale.name) {
            commands.push(OutboundCommand::DeleteLayer {
                remote: remote_id,
                layer: stale.name.clone(),
            });
        }
    }
    commands
}

/// Chunked insert/delete ops turning `before` into `after`, smallest edit
/// first (Myers diff via `similar`).
fn edit_script(before: &str, after: &str) -> Vec<TextEdit> {
    let diff = TextDiff::from_chars(before, after);
    let mut edits = Vec::new();
    let mut cursor = 0usize;
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Equal => cursor += change.value().chars().count(),
            ChangeTag::Delete => {
                let len = change.value().chars().count();
                edits.push(TextEdit::Delete { at: cursor, len });
                cursor += len;
            }
            ChangeTag::Insert => {
                edits.push(TextEdit::Insert {
                    at: cursor,
                    text: change.value().to_string(),
                });
            }
        }
    }
    merge_adjacent(edits)
}

/// Coalesces consecutive single-char ops of the same kind at contiguous
/// positions into one chunk, so a whole-word retype doesn't become a
/// character-by-character command stream.
fn merge_adjacent(edits: Vec<TextEdit>) -> Vec<TextEdit> {
    let mut merged: Vec<TextEdit> = Vec::new();
    for edit in edits {
        match (merged.last_mut(), &edit) {
            (Some(TextEdit::Insert { at, text }), TextEdit::Insert { at: next_at, text: next_text })
                if *at + text.chars().count() == *next_at =>
            {
                text.push_str(next_text);
            }
            (Some(TextEdit::Delete { at, len }), TextEdit::Delete { at: next_at, len: next_len })
                if *at == *next_at =>
            {
                *len += next_len;
            }
            _ => merged.push(edit),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeId, NodeKind, TextBuffer};
    use crate::transport::FakeRemoteNode;
    use purple_types::{GraphId, ModuleId, RemoteId};

    fn node_with(content: &str) -> Node {
        Node {
            id: NodeId(1),
            kind: NodeKind::Text,
            name: "t".into(),
            owner: GraphId::new(1),
            creator: ModuleId::new(1),
            tag_groups: vec![],
            remote_id: RemoteId(1),
            content: NodeContent::Text(TextContent {
                buffers: vec![TextBuffer {
                    name: "body".into(),
                    content: content.to_string(),
                }],
            }),
            notify: vec![],
        }
    }

    #[test]
    fn identical_content_emits_nothing() {
        let node = node_with("hello");
        let remote = FakeRemoteNode {
            remote_id: RemoteId(1),
            name: "t".into(),
            kind: NodeKind::Text,
            content: node.content.clone(),
            tag_groups: vec![],
        };
        assert!(diff(&node, &remote).is_empty());
    }

    #[test]
    fn appended_text_yields_a_single_insert() {
        let edits = edit_script("hello", "hello world");
        assert_eq!(edits, vec![TextEdit::Insert { at: 5, text: " world".to_string() }]);
    }

    #[test]
    fn deleted_suffix_yields_a_single_delete() {
        let edits = edit_script("hello world", "hello");
        assert_eq!(edits, vec![TextEdit::Delete { at: 5, len: 6 }]);
    }
}
