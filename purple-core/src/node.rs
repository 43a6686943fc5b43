//! Scene nodes (spec §3 "Node") and the arena that owns them.
//!
//! A node is an opaque, reference-counted record shared between the engine's
//! own database, each module's labelled-output table (`crate::node_factory`)
//! and the synchronizer's queues (`crate::sync`). Nodes never move between
//! graphs and are destroyed the instant their ref-count reaches zero.

use purple_types::{GraphId, ModuleId, RemoteId};
use std::collections::HashMap;
use std::fmt;

use crate::value::Value;

/// The closed set of node kinds the per-node-type databases present to the
/// synchronizer (spec §1, §4.7, GLOSSARY). Content beyond what the differ
/// rules name is out of scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Object,
    Geometry,
    Material,
    Bitmap,
    Curve,
    Text,
    Audio,
}

impl NodeKind {
    pub const ALL: [NodeKind; 7] = [
        NodeKind::Object,
        NodeKind::Geometry,
        NodeKind::Material,
        NodeKind::Bitmap,
        NodeKind::Curve,
        NodeKind::Text,
        NodeKind::Audio,
    ];
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Local, process-wide identifier for a node in `NodeStore`'s arena. Distinct
/// from `RemoteId`: a node may exist locally (and be referenced by ports,
/// labelled-output tables and sync queues) long before — or in the fully
/// offline case, without ever — acquiring a remote id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tag {
    pub name: String,
    pub value: Value,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TagGroup {
    pub name: String,
    pub tags: Vec<Tag>,
}

/// A reference from an object node to another module's computed output,
/// whose remote id may not be known yet. Spec §9 notes this is deliberately
/// modeled as a flag rather than by removal, so the synchronizer still gets
/// a chance to emit the remote delete command on the pass where it's set.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingLink {
    pub target: ModuleId,
    pub deleted: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectContent {
    pub light_color: Option<[f32; 3]>,
    pub links: Vec<PendingLink>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VertexLayer {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PolygonLayer {
    pub name: String,
    /// Per-polygon vertex index lists.
    pub polygons: Vec<Vec<u32>>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Crease {
    pub layer_name: Option<String>,
    pub default: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeometryContent {
    pub vertex_layers: Vec<VertexLayer>,
    pub polygon_layers: Vec<PolygonLayer>,
    pub vertex_crease: Crease,
    pub edge_crease: Crease,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BitmapLayer {
    pub name: String,
    /// Row-major pixel bytes, `width * height * bytes_per_pixel` long.
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BitmapContent {
    pub width: u32,
    pub height: u32,
    pub bytes_per_pixel: u32,
    pub layers: Vec<BitmapLayer>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextBuffer {
    pub name: String,
    pub content: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextContent {
    pub buffers: Vec<TextBuffer>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tangent {
    pub pos: f64,
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CurveKey {
    pub position: f64,
    pub values: Vec<f64>,
    pub pre: Tangent,
    pub post: Tangent,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CurveDef {
    pub name: String,
    pub keys: Vec<CurveKey>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CurveContent {
    pub curves: Vec<CurveDef>,
}

/// A material fragment, referencing other fragments either by id (within the
/// same node) or by another node's named layer.
#[derive(Clone, Debug, PartialEq)]
pub enum FragmentRef {
    Fragment(u32),
    Layer { node: String, layer: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct MaterialFragment {
    pub id: u32,
    pub fragment_type: String,
    pub scalars: Vec<(String, Value)>,
    pub refs: Vec<(String, FragmentRef)>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MaterialContent {
    pub fragments: Vec<MaterialFragment>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeContent {
    Object(ObjectContent),
    Geometry(GeometryContent),
    Material(MaterialContent),
    Bitmap(BitmapContent),
    Curve(CurveContent),
    Text(TextContent),
    Audio,
}

impl NodeContent {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeContent::Object(_) => NodeKind::Object,
            NodeContent::Geometry(_) => NodeKind::Geometry,
            NodeContent::Material(_) => NodeKind::Material,
            NodeContent::Bitmap(_) => NodeKind::Bitmap,
            NodeContent::Curve(_) => NodeKind::Curve,
            NodeContent::Text(_) => NodeKind::Text,
            NodeContent::Audio => NodeKind::Audio,
        }
    }

    pub fn blank(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Object => NodeContent::Object(ObjectContent::default()),
            NodeKind::Geometry => NodeContent::Geometry(GeometryContent::default()),
            NodeKind::Material => NodeContent::Material(MaterialContent::default()),
            NodeKind::Bitmap => NodeContent::Bitmap(BitmapContent::default()),
            NodeKind::Curve => NodeContent::Curve(CurveContent::default()),
            NodeKind::Text => NodeContent::Text(TextContent::default()),
            NodeKind::Audio => NodeContent::Audio,
        }
    }
}

/// An observer of a node: either a module watching it (re-scheduled when the
/// node's remote content changes — the `node-input` built-in plug-in uses
/// this) or the synchronizer waiting to learn the node's remote id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NotifyTarget {
    Module(ModuleId),
    Synchronizer,
}

#[derive(Clone, Debug)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    pub owner: GraphId,
    pub creator: ModuleId,
    pub tag_groups: Vec<Option<TagGroup>>,
    pub remote_id: RemoteId,
    pub content: NodeContent,
    pub notify: Vec<NotifyTarget>,
}

impl Node {
    fn new(id: NodeId, kind: NodeKind, owner: GraphId, creator: ModuleId) -> Self {
        Self {
            id,
            kind,
            name: String::new(),
            owner,
            creator,
            tag_groups: Vec::new(),
            remote_id: RemoteId::UNKNOWN,
            content: NodeContent::blank(kind),
            notify: Vec::new(),
        }
    }

    /// Inserts a tag group, reusing a freed slot if one exists. Spec §9
    /// explicitly calls the sentinel-name approach to free-slot tracking
    /// avoidable "with a proper sparse array + free-list"; this is that.
    pub fn add_tag_group(&mut self, group: TagGroup) -> usize {
        if let Some(index) = self.tag_groups.iter().position(|slot| slot.is_none()) {
            self.tag_groups[index] = Some(group);
            index
        } else {
            self.tag_groups.push(Some(group));
            self.tag_groups.len() - 1
        }
    }

    pub fn destroy_tag_group(&mut self, index: usize) {
        if let Some(slot) = self.tag_groups.get_mut(index) {
            *slot = None;
        }
    }

    pub fn tag_group_by_name(&self, name: &str) -> Option<&TagGroup> {
        self.tag_groups.iter().flatten().find(|g| g.name == name)
    }
}

/// An (unordered, for our purposes) collection of node references carried by
/// a port alongside its written value. Scalar reads of a port fall back to
/// converting the first node's name (spec §4.1 "Node set → scalar").
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeSet(pub Vec<NodeId>);

impl NodeSet {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<NodeId> {
        self.0.first().copied()
    }

    pub fn push(&mut self, id: NodeId) {
        self.0.push(id);
    }
}

struct Entry {
    node: Node,
    ref_count: u32,
}

/// The arena owning every `Node`. Ref-counted: `create` starts a node at
/// zero references (the caller must `retain` immediately, per spec §3), and
/// `release` destroys it once the count returns to zero.
#[derive(Default)]
pub struct NodeStore {
    next_id: u64,
    nodes: HashMap<NodeId, Entry>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            nodes: HashMap::new(),
        }
    }

    pub fn create(&mut self, kind: NodeKind, owner: GraphId, creator: ModuleId) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            Entry {
                node: Node::new(id, kind, owner, creator),
                ref_count: 0,
            },
        );
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id).map(|e| &e.node)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id).map(|e| &mut e.node)
    }

    pub fn ref_count(&self, id: NodeId) -> u32 {
        self.nodes.get(&id).map(|e| e.ref_count).unwrap_or(0)
    }

    pub fn retain(&mut self, id: NodeId) {
        if let Some(e) = self.nodes.get_mut(&id) {
            e.ref_count += 1;
        }
    }

    /// Decrements the ref-count, destroying the node once it reaches zero.
    /// Returns `true` if the node was destroyed.
    pub fn release(&mut self, id: NodeId) -> bool {
        let Some(e) = self.nodes.get_mut(&id) else {
            return false;
        };
        e.ref_count = e.ref_count.saturating_sub(1);
        if e.ref_count == 0 {
            self.nodes.remove(&id);
            true
        } else {
            false
        }
    }

    pub fn set_remote_id(&mut self, id: NodeId, remote_id: RemoteId) {
        if let Some(node) = self.get_mut(id) {
            node.remote_id = remote_id;
        }
    }

    pub fn find_by_name_and_kind(&self, name: &str, kind: NodeKind) -> Option<NodeId> {
        self.nodes
            .values()
            .find(|e| e.node.kind == kind && e.node.name == name)
            .map(|e| e.node.id)
    }

    pub fn name_of(&self, id: NodeId) -> Option<&str> {
        self.get(id).map(|n| n.name.as_str())
    }

    /// `NodeSet` → scalar, per spec §4.1: the first node's name, read through
    /// the same string conversion rules.
    pub fn node_set_to_value(&self, nodes: &NodeSet, target: crate::value::ValueType) -> Value {
        match nodes.first().and_then(|id| self.name_of(id)) {
            Some(name) => Value::String(name.to_string()).convert(target),
            None => Value::default_for(target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gid() -> GraphId {
        GraphId::new(1)
    }
    fn mid() -> ModuleId {
        ModuleId::new(1)
    }

    #[test]
    fn ref_counting_destroys_at_zero() {
        let mut store = NodeStore::new();
        let id = store.create(NodeKind::Object, gid(), mid());
        store.retain(id);
        store.retain(id);
        assert_eq!(store.ref_count(id), 2);
        assert!(!store.release(id));
        assert!(store.get(id).is_some());
        assert!(store.release(id));
        assert!(store.get(id).is_none());
    }

    #[test]
    fn tag_group_slot_reused_after_destroy() {
        let mut store = NodeStore::new();
        let id = store.create(NodeKind::Object, gid(), mid());
        let node = store.get_mut(id).unwrap();
        let a = node.add_tag_group(TagGroup {
            name: "a".into(),
            tags: vec![],
        });
        node.destroy_tag_group(a);
        let b = node.add_tag_group(TagGroup {
            name: "b".into(),
            tags: vec![],
        });
        assert_eq!(a, b);
        assert_eq!(node.tag_groups.len(), 1);
    }

    #[test]
    fn node_set_scalar_reads_first_node_name() {
        let mut store = NodeStore::new();
        let id = store.create(NodeKind::Object, gid(), mid());
        store.get_mut(id).unwrap().name = "42".to_string();
        let mut set = NodeSet::empty();
        set.push(id);
        assert_eq!(
            store.node_set_to_value(&set, crate::value::ValueType::Int32),
            Value::Int32(42)
        );
    }
}
