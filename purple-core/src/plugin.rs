//! The plug-in registry (spec §4.2): canonical descriptors built once at
//! init and looked up by id/name thereafter.

use std::collections::HashMap;
use std::sync::Arc;

use purple_types::PluginId;

use crate::errors::GraphError;
use crate::node::NodeStore;
use crate::node_factory::NodeFactory;
use crate::port::Port;
use crate::value::{Value, ValueType};

/// A single declared input slot.
#[derive(Clone, Debug)]
pub struct InputSpec {
    pub name: String,
    pub value_type: ValueType,
    pub required: bool,
    pub default: Option<Value>,
    pub min: Option<Value>,
    pub max: Option<Value>,
    /// Parsed `"k1:v1|k2:v2|..."` enum constraint, kept as ordered pairs.
    pub enum_values: Option<Vec<(String, String)>>,
    pub description: Option<String>,
}

impl InputSpec {
    fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            required: false,
            default: None,
            min: None,
            max: None,
            enum_values: None,
            description: None,
        }
    }
}

/// One tag in the variable-length per-input tag list the builder accepts,
/// mirroring spec §4.2's `required | min(v) | max(v) | default(v) |
/// enum("k1:v1|...") | description(s)`.
#[derive(Clone, Debug)]
pub enum InputTag {
    Required,
    Min(Value),
    Max(Value),
    Default(Value),
    Enum(&'static str),
    Description(&'static str),
}

fn apply_tag(spec: &mut InputSpec, tag: InputTag) {
    match tag {
        InputTag::Required => spec.required = true,
        InputTag::Min(v) => spec.min = Some(v),
        InputTag::Max(v) => spec.max = Some(v),
        InputTag::Default(v) => spec.default = Some(v),
        InputTag::Enum(raw) => {
            spec.enum_values = Some(
                raw.split('|')
                    .filter_map(|pair| pair.split_once(':'))
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            )
        }
        InputTag::Description(text) => spec.description = Some(text.to_string()),
    }
}

/// Status returned by a compute invocation (spec §4.3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComputeStatus {
    Done,
    Again,
    InputMissing,
    Failure,
}

/// A read-only view of one resolved input, handed to `compute`. Wraps either
/// the instance's own port-set entry or (for a module-reference input) the
/// referenced module's output port.
pub struct InputRef<'a> {
    port: &'a Port,
}

impl<'a> InputRef<'a> {
    pub fn new(port: &'a Port) -> Self {
        Self { port }
    }

    pub fn get(&self, target: ValueType, node_store: &NodeStore) -> Value {
        // Reads never fail; a fresh `Port` clone lets us reuse the caching
        // read path without requiring `&mut` all the way through `compute`.
        let mut scratch = Port::new();
        if let Some(v) = self.port.written() {
            scratch.set(v.clone());
        }
        scratch.set_nodes(self.port.nodes().clone());
        scratch.get(target, node_store).0
    }

    pub fn is_set(&self) -> bool {
        self.port.is_set()
    }
}

/// Everything a compute function receives. `output` and `nodes` are the only
/// mutable handles — compute writes exactly one output port and may create
/// or reuse its own labelled nodes through the factory.
pub struct ComputeArgs<'a> {
    pub inputs: &'a [InputRef<'a>],
    pub output: &'a mut Port,
    pub state: &'a mut [u8],
    pub nodes: &'a mut NodeFactory,
    pub node_store: &'a mut NodeStore,
}

pub type ComputeFn = Arc<dyn Fn(&mut ComputeArgs) -> ComputeStatus + Send + Sync>;
pub type CtorFn = Arc<dyn Fn(&mut [u8]) + Send + Sync>;
pub type DtorFn = Arc<dyn Fn(&mut [u8]) + Send + Sync>;

#[derive(Clone)]
pub struct PluginDescriptor {
    pub id: PluginId,
    pub name: String,
    pub inputs: Vec<InputSpec>,
    pub meta: HashMap<String, String>,
    pub state_size: usize,
    pub ctor: Option<CtorFn>,
    pub dtor: Option<DtorFn>,
    pub compute: ComputeFn,
}

/// Builds a descriptor during init. Only descriptors with both a name and a
/// compute function are registered (spec §4.2).
pub struct PluginBuilder {
    name: Option<String>,
    inputs: Vec<InputSpec>,
    meta: HashMap<String, String>,
    state_size: usize,
    ctor: Option<CtorFn>,
    dtor: Option<DtorFn>,
    compute: Option<ComputeFn>,
}

impl PluginBuilder {
    pub fn create(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            inputs: Vec::new(),
            meta: HashMap::new(),
            state_size: 0,
            ctor: None,
            dtor: None,
            compute: None,
        }
    }

    pub fn set_input(mut self, value_type: ValueType, name: impl Into<String>, tags: &[InputTag]) -> Self {
        let mut spec = InputSpec::new(name, value_type);
        for tag in tags {
            apply_tag(&mut spec, tag.clone());
        }
        self.inputs.push(spec);
        self
    }

    pub fn set_meta(mut self, category: impl Into<String>, text: impl Into<String>) -> Self {
        self.meta.insert(category.into(), text.into());
        self
    }

    pub fn set_state(mut self, size: usize, ctor: Option<CtorFn>, dtor: Option<DtorFn>) -> Self {
        self.state_size = size;
        self.ctor = ctor;
        self.dtor = dtor;
        self
    }

    pub fn set_compute(mut self, compute: ComputeFn) -> Self {
        self.compute = Some(compute);
        self
    }

    /// Finishes the descriptor. Returns `None` if name or compute is
    /// missing — such a builder is simply dropped, per spec §4.2.
    fn build(self, id: PluginId) -> Option<PluginDescriptor> {
        let name = self.name?;
        let compute = self.compute?;
        Some(PluginDescriptor {
            id,
            name,
            inputs: self.inputs,
            meta: self.meta,
            state_size: self.state_size,
            ctor: self.ctor,
            dtor: self.dtor,
            compute,
        })
    }
}

#[derive(Default)]
pub struct Registry {
    next_id: u64,
    by_id: HashMap<PluginId, Arc<PluginDescriptor>>,
    by_name: HashMap<String, PluginId>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            by_id: HashMap::new(),
            by_name: HashMap::new(),
        }
    }

    /// Registers a built descriptor. Names are process-unique (spec §4.2);
    /// registering a duplicate name is a programming error in the caller
    /// (built-ins and on-disk libraries are each registered once at init),
    /// surfaced as `GraphError::UnknownPlugin`-adjacent for callers who look
    /// the name up afterwards rather than panicking here.
    pub fn register(&mut self, builder: PluginBuilder) -> Option<PluginId> {
        let id = PluginId::new(self.next_id);
        let descriptor = builder.build(id)?;
        if self.by_name.contains_key(&descriptor.name) {
            return None;
        }
        self.next_id += 1;
        self.by_name.insert(descriptor.name.clone(), id);
        self.by_id.insert(id, Arc::new(descriptor));
        Some(id)
    }

    pub fn get(&self, id: PluginId) -> Result<Arc<PluginDescriptor>, GraphError> {
        self.by_id.get(&id).cloned().ok_or(GraphError::UnknownPlugin(id))
    }

    pub fn find_by_name(&self, name: &str) -> Option<PluginId> {
        self.by_name.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<PluginDescriptor>> {
        self.by_id.values()
    }
}
