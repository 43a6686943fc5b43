//! The tag-group diff applied to every node kind alike (spec §4.7 "head").

use crate::node::Node;
use crate::transport::{OutboundCommand, RemoteNodeView};

pub fn diff(node: &Node, remote: &dyn RemoteNodeView) -> Vec<OutboundCommand> {
    let mut commands = Vec::new();
    if node.name != remote.name() {
        commands.push(OutboundCommand::SetName {
            remote: remote.remote_id(),
            name: node.name.clone(),
        });
    }
    for group in node.tag_groups.iter().flatten() {
        let remote_group = remote.tag_group(&group.name);
        for tag in &group.tags {
            let changed = match remote_group {
                Some(rg) => rg.tags.iter().find(|t| t.name == tag.name).map(|t| &t.value != &tag.value).unwrap_or(true),
                None => true,
            };
            if changed {
                commands.push(OutboundCommand::SetTag {
                    remote: remote.remote_id(),
                    group: group.name.clone(),
                    name: tag.name.clone(),
                    value: tag.value.clone(),
                });
            }
        }
    }
    commands
}
