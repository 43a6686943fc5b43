//! The boundary between this engine and the remote scene server (spec §1,
//! §4.7). Kept as traits so the synchronizer's differs can be exercised
//! against an in-memory fake instead of a live connection.

use purple_types::RemoteId;

use crate::node::{NodeContent, NodeId, NodeKind};

/// An event arriving from the server: either an acknowledgement of a node
/// this process asked to create, or a change to a node's remote content
/// that a local watcher (the `node-input` built-in) should pick up.
#[derive(Clone, Debug)]
pub enum InboundEvent {
    NodeCreated { local: NodeId, remote: RemoteId },
    NodeChanged { remote: RemoteId, kind: NodeKind },
    NodeDeleted { remote: RemoteId },
    Disconnected,
    Reconnected,
}

/// Pulls queued inbound events without blocking.
pub trait EventSource {
    fn poll(&mut self) -> Vec<InboundEvent>;
}

/// One outbound command a differ emits (spec §4.7's per-kind diff rules all
/// bottom out in these).
#[derive(Clone, Debug)]
pub enum OutboundCommand {
    CreateNode { local: NodeId, kind: NodeKind },
    SetName { remote: RemoteId, name: String },
    SetTag { remote: RemoteId, group: String, name: String, value: crate::value::Value },
    SetContent { remote: RemoteId, content: NodeContent },
    /// A resolved object link (spec §4.7 "object link set") — emitted once
    /// the linked module's node has acquired a remote id of its own.
    SetLink { remote: RemoteId, target: RemoteId },
    DeleteNode { remote: RemoteId },
    /// A named sub-layer (vertex/polygon/bitmap/curve layer) was added or
    /// its data replaced wholesale.
    SetLayer { remote: RemoteId, layer: String, data: LayerData },
    /// A named sub-layer was removed — kept distinct from `SetLayer` so the
    /// server doesn't have to infer deletion from an absent key (spec §4.7).
    DeleteLayer { remote: RemoteId, layer: String },
    /// One vertex in a named vertex layer was added or moved.
    SetVertex { remote: RemoteId, layer: String, index: u32, position: [f32; 3] },
    /// A vertex past the local layer's current length was dropped.
    DeleteVertex { remote: RemoteId, layer: String, index: u32 },
    /// One polygon in a named polygon layer was added or changed.
    SetPolygon { remote: RemoteId, layer: String, index: u32, polygon: Vec<u32> },
    /// A polygon past the local layer's current length was dropped.
    DeletePolygon { remote: RemoteId, layer: String, index: u32 },
    /// One opaque tile of a bitmap layer differed by at least one byte.
    /// `tile_x`/`tile_y` are tile coordinates, not pixels (spec §4.7 "Layer
    /// data compared in tiles").
    SetTile { remote: RemoteId, layer: String, tile_x: u32, tile_y: u32, data: Vec<u8> },
}

/// The payload carried by `OutboundCommand::SetLayer`, tagged by which kind
/// of layer it replaces.
#[derive(Clone, Debug)]
pub enum LayerData {
    Vertices(Vec<[f32; 3]>),
    Polygons(Vec<Vec<u32>>),
    Bitmap(Vec<u8>),
    TextEdits(Vec<TextEdit>),
    Curve(crate::node::CurveDef),
    Fragment(crate::node::MaterialFragment),
}

/// One Myers-diff edit op against a text buffer's previous content.
#[derive(Clone, Debug, PartialEq)]
pub enum TextEdit {
    Insert { at: usize, text: String },
    Delete { at: usize, len: usize },
}

/// Sends commands to the server. Implementations may batch or reorder, but
/// must preserve the create-before-reference ordering the synchronizer
/// already establishes by construction.
pub trait CommandSink {
    fn send(&mut self, command: OutboundCommand) -> Result<(), crate::errors::SyncError>;
}

/// Read-only view of what the server currently believes a node looks like —
/// what the differs compare the local node against (spec §4.7).
pub trait RemoteNodeView {
    fn remote_id(&self) -> RemoteId;
    fn kind(&self) -> NodeKind;
    fn name(&self) -> &str;
    fn content(&self) -> &NodeContent;
    fn tag_group(&self, name: &str) -> Option<&crate::node::TagGroup>;
}

/// An in-memory `RemoteNodeView`/server fake used by differ tests and
/// available to integration tests too.
#[derive(Clone, Debug)]
pub struct FakeRemoteNode {
    pub remote_id: RemoteId,
    pub kind: NodeKind,
    pub name: String,
    pub content: NodeContent,
    pub tag_groups: Vec<crate::node::TagGroup>,
}

impl RemoteNodeView for FakeRemoteNode {
    fn remote_id(&self) -> RemoteId {
        self.remote_id
    }

    fn kind(&self) -> NodeKind {
        self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn content(&self) -> &NodeContent {
        &self.content
    }

    fn tag_group(&self, name: &str) -> Option<&crate::node::TagGroup> {
        self.tag_groups.iter().find(|g| g.name == name)
    }
}
