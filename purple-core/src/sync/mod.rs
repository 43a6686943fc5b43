//! The node synchronizer (spec §4.7): diffs locally-computed nodes against
//! the server's last-acknowledged view and pushes the difference.
//!
//! Three queues, in the order a node passes through them:
//! - `to_create` — local nodes with no remote id yet, waiting for their
//!   create command to be sent.
//! - `create_pending` — sent, waiting on the server's ack. Matched back to a
//!   node purely by submission order (spec §9 notes this as a deliberate,
//!   documented hazard: if two `CreateNode` commands of the same kind are
//!   in flight and the server's acks arrive out of order, the wrong node
//!   gets the wrong remote id. Avoided in practice by only ever having one
//!   create of a given kind in flight per graph, never fixed structurally).
//! - `to_sync` — has a remote id; diffed against the server's view every
//!   pass by the head differ plus the node's kind-specific differ.

mod bitmap;
mod curve;
mod geometry;
mod head;
mod material;
mod object;
mod text;

use std::collections::{HashSet, VecDeque};

use purple_types::{ModuleId, RemoteId};

use crate::clock::TimeSlice;
use crate::errors::SyncError;
use crate::node::{NodeId, NodeKind, NodeStore};
use crate::transport::{CommandSink, OutboundCommand, RemoteNodeView};

#[derive(Default)]
pub struct Synchronizer {
    to_create: VecDeque<NodeId>,
    create_pending: VecDeque<NodeId>,
    to_sync: HashSet<NodeId>,
}

impl Synchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node for synchronization. Nodes that already carry a
    /// remote id (resumed from a previous process) go straight to `to_sync`.
    pub fn enqueue(&mut self, node: NodeId, store: &NodeStore) {
        let has_remote = store.get(node).map(|n| n.remote_id.is_known()).unwrap_or(false);
        if has_remote {
            self.to_sync.insert(node);
        } else if !self.to_create.contains(&node) {
            self.to_create.push_back(node);
        }
    }

    /// Called when the server acknowledges the oldest in-flight create.
    /// See the module doc for the type+order matching hazard this assumes.
    pub fn on_create_ack(&mut self, remote: RemoteId, store: &mut NodeStore) {
        if let Some(node) = self.create_pending.pop_front() {
            store.set_remote_id(node, remote);
            self.to_sync.insert(node);
        }
    }

    pub fn on_remote_deleted(&mut self, node: NodeId) {
        self.to_sync.remove(&node);
    }

    pub fn pending_creates(&self) -> usize {
        self.to_create.len() + self.create_pending.len()
    }

    /// Runs one pass: drains `to_create` into `create_pending` (one create
    /// command in flight at a time, per the ordering hazard above), then
    /// diffs every node in `to_sync` against its remote view.
    pub fn update<S: CommandSink>(
        &mut self,
        store: &mut NodeStore,
        remote_view: &dyn Fn(NodeId) -> Option<Box<dyn RemoteNodeView>>,
        resolve_link: &dyn Fn(ModuleId) -> Option<NodeId>,
        sink: &mut S,
        slice: &TimeSlice,
    ) -> Result<(), SyncError> {
        if self.create_pending.is_empty() {
            if let Some(node) = self.to_create.pop_front() {
                if let Some(n) = store.get(node) {
                    sink.send(OutboundCommand::CreateNode { local: node, kind: n.kind })?;
                    self.create_pending.push_back(node);
                }
            }
        }

        for node in self.to_sync.iter().copied().collect::<Vec<_>>() {
            if slice.is_expired() {
                break;
            }
            let Some(kind) = store.get(node).map(|n| n.kind) else {
                self.to_sync.remove(&node);
                continue;
            };
            let Some(remote) = remote_view(node) else {
                return Err(SyncError::NoRemoteView(kind));
            };

            let Some(n) = store.get(node) else {
                continue;
            };
            for command in head::diff(n, remote.as_ref()) {
                sink.send(command)?;
            }
            let kind_commands = match kind {
                NodeKind::Object => object::diff(node, remote.as_ref(), store, resolve_link),
                NodeKind::Geometry => {
                    let Some(n) = store.get(node) else { continue };
                    geometry::diff(n, remote.as_ref())
                }
                NodeKind::Bitmap => {
                    let Some(n) = store.get(node) else { continue };
                    bitmap::diff(n, remote.as_ref())
                }
                NodeKind::Text => {
                    let Some(n) = store.get(node) else { continue };
                    text::diff(n, remote.as_ref())
                }
                NodeKind::Curve => {
                    let Some(n) = store.get(node) else { continue };
                    curve::diff(n, remote.as_ref())
                }
                NodeKind::Material => {
                    let Some(n) = store.get(node) else { continue };
                    material::diff(n, remote.as_ref())
                }
                NodeKind::Audio => Vec::new(),
            };
            for command in kind_commands {
                sink.send(command)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeStore;
    use purple_types::GraphId;
    use purple_types::ModuleId;
    use std::time::Duration;

    struct RecordingSink(Vec<OutboundCommand>);
    impl CommandSink for RecordingSink {
        fn send(&mut self, command: OutboundCommand) -> Result<(), SyncError> {
            self.0.push(command);
            Ok(())
        }
    }

    #[test]
    fn new_node_queues_create_before_sync() {
        let mut store = NodeStore::new();
        let id = store.create(NodeKind::Object, GraphId::new(1), ModuleId::new(1));
        store.retain(id);
        let mut sync = Synchronizer::new();
        sync.enqueue(id, &store);
        assert_eq!(sync.pending_creates(), 1);

        let mut sink = RecordingSink(Vec::new());
        let slice = TimeSlice::new(Duration::from_secs(1));
        sync.update(&mut store, &|_| None, &|_| None, &mut sink, &slice).unwrap();
        assert!(matches!(sink.0[0], OutboundCommand::CreateNode { .. }));
    }

    #[test]
    fn ack_moves_node_from_pending_to_sync() {
        let mut store = NodeStore::new();
        let id = store.create(NodeKind::Object, GraphId::new(1), ModuleId::new(1));
        store.retain(id);
        let mut sync = Synchronizer::new();
        sync.enqueue(id, &store);
        let mut sink = RecordingSink(Vec::new());
        let slice = TimeSlice::new(Duration::from_secs(1));
        sync.update(&mut store, &|_| None, &|_| None, &mut sink, &slice).unwrap();
        sync.on_create_ack(RemoteId(5), &mut store);
        assert_eq!(sync.pending_creates(), 0);
        assert_eq!(store.get(id).unwrap().remote_id, RemoteId(5));
    }

    #[test]
    fn resumed_node_with_known_remote_id_skips_create() {
        let mut store = NodeStore::new();
        let id = store.create(NodeKind::Object, GraphId::new(1), ModuleId::new(1));
        store.retain(id);
        store.set_remote_id(id, RemoteId(9));
        let mut sync = Synchronizer::new();
        sync.enqueue(id, &store);
        assert_eq!(sync.pending_creates(), 0);
    }
}
