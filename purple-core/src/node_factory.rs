//! Per-instance labelled-output table (spec §4.6 "Node Factory").
//!
//! Each module instance owns one of these. `create`/`copy` are deterministic
//! given the sequence of calls a compute function makes, which is what lets
//! an instance resume its own node set across a process restart: the factory
//! replays the same label sequence and, for each label, first checks whether
//! a node of the expected name/kind already exists (the "resume hint" coming
//! from `NodeStore::find_by_name_and_kind`) before minting a new one.

use std::collections::HashMap;

use purple_types::{GraphId, Label, ModuleId};

use crate::errors::FactoryError;
use crate::node::{NodeId, NodeKind, NodeStore};

#[derive(Default)]
pub struct NodeFactory {
    owner: GraphId,
    creator: ModuleId,
    next_label: Label,
    labels: HashMap<Label, NodeId>,
    seen_this_pass: std::collections::HashSet<Label>,
}

impl NodeFactory {
    pub fn new(owner: GraphId, creator: ModuleId) -> Self {
        Self {
            owner,
            creator,
            next_label: 0,
            labels: HashMap::new(),
            seen_this_pass: std::collections::HashSet::new(),
        }
    }

    /// Creates (or resumes) the node at `label`. Labels must be requested in
    /// order: `label` must equal the next expected label, or must already be
    /// bound from a previous pass — anything else is a plug-in bug.
    pub fn create(
        &mut self,
        store: &mut NodeStore,
        kind: NodeKind,
        name: &str,
        label: Label,
    ) -> Result<NodeId, FactoryError> {
        if let Some(&existing) = self.labels.get(&label) {
            self.seen_this_pass.insert(label);
            return Ok(existing);
        }
        if label != self.next_label {
            return Err(FactoryError::MismatchedLabel {
                label,
                next: self.next_label,
            });
        }
        let id = match store.find_by_name_and_kind(name, kind) {
            Some(resumed) => resumed,
            None => store.create(kind, self.owner, self.creator),
        };
        store.retain(id);
        if let Some(node) = store.get_mut(id) {
            node.name = name.to_string();
        }
        self.labels.insert(label, id);
        self.seen_this_pass.insert(label);
        self.next_label += 1;
        Ok(id)
    }

    /// Copies an already-created node's content onto the node at `label`,
    /// allocating it the same way `create` would.
    pub fn copy(
        &mut self,
        store: &mut NodeStore,
        source: NodeId,
        name: &str,
        label: Label,
    ) -> Result<NodeId, FactoryError> {
        let source_kind = store.get(source).ok_or(FactoryError::UnknownSourceNode(source))?.kind;
        let source_content = store.get(source).unwrap().content.clone();
        let id = self.create(store, source_kind, name, label)?;
        if let Some(node) = store.get_mut(id) {
            node.content = source_content;
        }
        Ok(id)
    }

    /// Clears the re-confirmation set for a new compute pass. `next_label`
    /// is a persistent high-water mark, not reset here — a pass that mints
    /// more labels than any pass before it must still see `label ==
    /// next_label` for the new ones, while `label < next_label` keeps
    /// resolving through `labels` regardless of what this pass has touched
    /// yet. Call `end_pass` afterwards to release any label this pass
    /// didn't touch — a shorter-running compute shrinks its node set.
    pub fn begin_pass(&mut self) {
        self.seen_this_pass.clear();
    }

    /// Releases every label not re-confirmed since `begin_pass`.
    pub fn end_pass(&mut self, store: &mut NodeStore) {
        let stale: Vec<Label> = self
            .labels
            .keys()
            .copied()
            .filter(|l| !self.seen_this_pass.contains(l))
            .collect();
        for label in stale {
            if let Some(id) = self.labels.remove(&label) {
                store.release(id);
            }
        }
    }

    pub fn get(&self, label: Label) -> Option<NodeId> {
        self.labels.get(&label).copied()
    }

    pub fn labelled_nodes(&self) -> impl Iterator<Item = (&Label, &NodeId)> {
        self.labels.iter()
    }
}
