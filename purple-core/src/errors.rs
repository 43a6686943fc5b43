//! Error kinds (spec §7), modeled the way the workspace this engine grew out
//! of aggregates per-component errors into one top-level enum via
//! `#[from]` conversions.

use purple_types::{GraphId, ModuleId, PluginId};
use thiserror::Error;

use crate::node::NodeKind;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("graph name '{0}' is already in use")]
    DuplicateGraphName(String),
    #[error("persistence anchor is already bound to another graph")]
    AnchorAlreadyBound,
    #[error("unknown graph {0}")]
    UnknownGraph(GraphId),
    #[error("unknown module {0}")]
    UnknownModule(ModuleId),
    #[error("unknown plug-in {0}")]
    UnknownPlugin(PluginId),
    #[error("input index {0} is out of range for this plug-in")]
    InvalidInputIndex(u16),
    #[error("input {index} expects type {expected}, got {actual}")]
    InputTypeMismatch {
        index: u16,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("linking module {from} to module {to} would create a cycle")]
    WouldCycle { from: ModuleId, to: ModuleId },
    #[error("module {0} is not in this graph")]
    ForeignModule(ModuleId),
}

#[derive(Error, Debug)]
pub enum FactoryError {
    #[error("label {label} does not match the next expected label {next}")]
    MismatchedLabel { label: u32, next: u32 },
    #[error("label {0} was never allocated")]
    UnknownLabel(u32),
    #[error("source node {0} does not exist")]
    UnknownSourceNode(crate::node::NodeId),
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("no remote view registered for node kind {0}")]
    NoRemoteView(NodeKind),
    #[error("command sink rejected a command: {0}")]
    CommandRejected(String),
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("failed to parse catalog XML: {0}")]
    CatalogParse(String),
    #[error("failed to parse graph index XML: {0}")]
    IndexParse(String),
    #[error("failed to parse graph description for {graph}: {detail}")]
    GraphParse { graph: GraphId, detail: String },
}

#[derive(Error, Debug)]
pub enum PurpleError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Factory(#[from] FactoryError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("out of memory")]
    OutOfMemory,
}
