//! A graph: a named collection of module instances and the links between
//! them (spec §3 "Graph", §4.4, §4.5). Dependency edges are tracked as plain
//! adjacency sets rather than through a graph library — the module table is
//! edited live (modules and links come and go every frame), which doesn't
//! suit index-stable graph crates built around a build-once-traverse-many
//! DAG; a hand-rolled DFS cycle check bounded by module count is cheap
//! enough to run on every link.

use std::collections::{HashMap, HashSet};

use purple_types::{GraphId, ModuleId, PluginId};

use crate::errors::GraphError;
use crate::module::{ComputeOutcome, Module};
use crate::node::NodeStore;
use crate::plugin::Registry;
use crate::port::Port;
use crate::value::{Value, ValueType};

pub struct Graph {
    pub id: GraphId,
    pub name: String,
    next_module_id: u64,
    modules: HashMap<ModuleId, Module>,
}

impl Graph {
    pub fn new(id: GraphId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            next_module_id: 1,
            modules: HashMap::new(),
        }
    }

    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(&id)
    }

    pub fn module_mut(&mut self, id: ModuleId) -> Option<&mut Module> {
        self.modules.get_mut(&id)
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    pub fn module_create(&mut self, registry: &Registry, plugin: PluginId) -> Result<ModuleId, GraphError> {
        let descriptor = registry.get(plugin)?;
        let id = ModuleId::new(self.next_module_id);
        self.next_module_id += 1;
        self.modules.insert(id, Module::new(id, self.id, &descriptor));
        Ok(id)
    }

    /// Destroys a module, releasing every node its factory still owns and
    /// unlinking it from every dependency/dependant (spec §4.5 "destroy").
    pub fn module_destroy(&mut self, id: ModuleId, node_store: &mut NodeStore) -> Result<(), GraphError> {
        let module = self.modules.remove(&id).ok_or(GraphError::UnknownModule(id))?;
        for (_, node_id) in module.factory.labelled_nodes() {
            node_store.release(*node_id);
        }
        for dep in &module.dependencies {
            if let Some(m) = self.modules.get_mut(dep) {
                m.dependants.remove(&id);
            }
        }
        for dependant in &module.dependants {
            if let Some(m) = self.modules.get_mut(dependant) {
                m.dependencies.remove(&id);
            }
        }
        Ok(())
    }

    /// Sets an input. A `Value::ModuleRef` additionally records a dependency
    /// edge; if the resulting graph would contain a cycle the input is left
    /// unchanged and an error is returned (spec §4.4 "no self-dependency").
    pub fn module_input_set(
        &mut self,
        id: ModuleId,
        index: u16,
        value: Value,
    ) -> Result<(), GraphError> {
        if !self.modules.contains_key(&id) {
            return Err(GraphError::UnknownModule(id));
        }

        if let Value::ModuleRef(target) = value {
            if !self.modules.contains_key(&target) {
                return Err(GraphError::UnknownModule(target));
            }
            if target == id {
                return Err(GraphError::WouldCycle { from: id, to: target });
            }
            if self.path_exists(target, id) {
                return Err(GraphError::WouldCycle { from: id, to: target });
            }
            if let Some(previous) = self.modules[&id].ports.module_reference(index) {
                self.unlink(id, previous);
            }
            self.link(id, target);
        } else if let Some(previous) = self.modules[&id].ports.module_reference(index) {
            self.unlink(id, previous);
        }

        let module = self.modules.get_mut(&id).unwrap();
        module.ports.set(index, value);
        Ok(())
    }

    /// Clears an input back to its declared default, dropping the
    /// dependency edge if the port held a module reference.
    pub fn module_input_clear(
        &mut self,
        id: ModuleId,
        index: u16,
        inputs: &[crate::plugin::InputSpec],
    ) -> Result<(), GraphError> {
        if !self.modules.contains_key(&id) {
            return Err(GraphError::UnknownModule(id));
        }
        if let Some(previous) = self.modules[&id].ports.module_reference(index) {
            self.unlink(id, previous);
        }
        let module = self.modules.get_mut(&id).unwrap();
        module.ports.clear(inputs, index);
        Ok(())
    }

    fn link(&mut self, dependant: ModuleId, dependency: ModuleId) {
        if let Some(m) = self.modules.get_mut(&dependant) {
            m.dependencies.insert(dependency);
        }
        if let Some(m) = self.modules.get_mut(&dependency) {
            m.dependants.insert(dependant);
        }
    }

    fn unlink(&mut self, dependant: ModuleId, dependency: ModuleId) {
        if let Some(m) = self.modules.get_mut(&dependant) {
            m.dependencies.remove(&dependency);
        }
        if let Some(m) = self.modules.get_mut(&dependency) {
            m.dependants.remove(&dependant);
        }
    }

    /// Naive DFS, bounded by module count: true if `to` is reachable from
    /// `from` by following dependency edges — i.e. whether linking
    /// `to -> from`'s dependant would close a cycle.
    fn path_exists(&self, from: ModuleId, to: ModuleId) -> bool {
        let mut stack = vec![from];
        let mut visited = HashSet::new();
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(module) = self.modules.get(&current) {
                stack.extend(module.dependencies.iter().copied());
            }
        }
        false
    }

    /// Runs one compute pass for `id`, resolving any module-reference input
    /// to the upstream module's output port. The instance is temporarily
    /// removed from the module table for the duration of the call so its
    /// dependencies can be borrowed immutably alongside it (spec §4.4, §4.5).
    pub fn compute_module(
        &mut self,
        id: ModuleId,
        registry: &Registry,
        node_store: &mut NodeStore,
    ) -> Result<ComputeOutcome, GraphError> {
        let mut module = self.modules.remove(&id).ok_or(GraphError::UnknownModule(id))?;
        let descriptor = registry.get(module.plugin)?;
        let overrides: Vec<(u16, &Port)> = descriptor
            .inputs
            .iter()
            .enumerate()
            .filter_map(|(i, _)| {
                module
                    .ports
                    .module_reference(i as u16)
                    .and_then(|target| self.modules.get(&target).map(|m| (i as u16, &m.output)))
            })
            .collect();
        let outcome = module.compute(&descriptor, &overrides, node_store);
        self.modules.insert(id, module);
        Ok(outcome)
    }

    pub fn dependants_of(&self, id: ModuleId) -> Vec<ModuleId> {
        self.modules.get(&id).map(|m| m.dependants.iter().copied().collect()).unwrap_or_default()
    }

    /// XML-serializable summary of the graph's current module/link shape,
    /// used by persistence and by diagnostics tooling (spec §4.4 "describe").
    /// Each module's explicitly-set inputs and currently-named output nodes
    /// are carried along so `from_description` can rebuild a live graph by
    /// replaying the same input-sets (spec §6).
    pub fn describe(&self, node_store: &NodeStore) -> GraphDescription {
        let modules = self
            .modules
            .values()
            .map(|m| ModuleDescription {
                id: m.id.get(),
                plugin: m.plugin.get(),
                dependencies: m.dependencies.iter().map(|d| d.get()).collect(),
                inputs: (0..m.ports.size() as u16)
                    .filter(|i| m.ports.is_set(*i))
                    .filter_map(|i| {
                        let value = m.ports.port(i)?.written()?;
                        Some(InputDescription {
                            index: i,
                            value_type: value.value_type().to_string(),
                            value: value.to_display_string(),
                        })
                    })
                    .collect(),
                outputs: m
                    .factory
                    .labelled_nodes()
                    .filter_map(|(label, node_id)| {
                        node_store.get(*node_id).map(|node| OutputDescription {
                            label: *label,
                            name: node.name.clone(),
                        })
                    })
                    .collect(),
            })
            .collect();
        GraphDescription {
            id: self.id.get(),
            name: self.name.clone(),
            modules,
        }
    }

    /// Rebuilds a live graph from a persisted description by instantiating
    /// each module and replaying its recorded input-sets (spec §6 "rebuild
    /// graphs on resume ... by replaying input-sets"). A module whose
    /// persisted id isn't reachable from a prior entry (forward reference)
    /// or whose value fails to parse is skipped with a warning rather than
    /// aborting the whole graph — the rest of the graph still comes up.
    pub fn from_description(description: &GraphDescription, registry: &Registry) -> Result<Self, GraphError> {
        let mut graph = Graph::new(GraphId::new(description.id), description.name.clone());
        let mut id_map: HashMap<u64, ModuleId> = HashMap::new();

        for module in &description.modules {
            match graph.module_create(registry, PluginId::new(module.plugin)) {
                Ok(id) => {
                    id_map.insert(module.id, id);
                }
                Err(err) => {
                    tracing::warn!(module = module.id, plugin = module.plugin, error = %err, "skipping module on resume");
                }
            }
        }

        for module in &description.modules {
            let Some(&id) = id_map.get(&module.id) else {
                continue;
            };
            for input in &module.inputs {
                let Some(value_type) = ValueType::parse(&input.value_type) else {
                    tracing::warn!(module = module.id, index = input.index, ty = %input.value_type, "unrecognized input type on resume, skipping");
                    continue;
                };
                let value = if value_type == ValueType::ModuleRef {
                    match input.value.parse::<u64>().ok().and_then(|persisted| id_map.get(&persisted)) {
                        Some(&target) => Value::ModuleRef(target),
                        None => {
                            tracing::warn!(module = module.id, index = input.index, "unresolvable module reference on resume, skipping");
                            continue;
                        }
                    }
                } else {
                    Value::String(input.value.clone()).convert(value_type)
                };
                if let Err(err) = graph.module_input_set(id, input.index, value) {
                    tracing::warn!(module = module.id, index = input.index, error = %err, "failed to replay input on resume");
                }
            }
        }

        Ok(graph)
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct InputDescription {
    pub index: u16,
    #[serde(rename = "type")]
    pub value_type: String,
    pub value: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct OutputDescription {
    pub label: u32,
    pub name: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ModuleDescription {
    pub id: u64,
    pub plugin: u64,
    pub dependencies: Vec<u64>,
    #[serde(rename = "input", default)]
    pub inputs: Vec<InputDescription>,
    #[serde(rename = "output", default)]
    pub outputs: Vec<OutputDescription>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename = "graph")]
pub struct GraphDescription {
    pub id: u64,
    pub name: String,
    #[serde(rename = "module", default)]
    pub modules: Vec<ModuleDescription>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{ComputeArgs, ComputeStatus, PluginBuilder};
    use std::sync::Arc;

    fn passthrough_registry() -> (Registry, PluginId) {
        let mut registry = Registry::new();
        let id = registry
            .register(PluginBuilder::create("identity").set_compute(Arc::new(|args: &mut ComputeArgs| {
                args.output.set(Value::Int32(1));
                ComputeStatus::Done
            })))
            .unwrap();
        (registry, id)
    }

    #[test]
    fn linking_a_module_to_itself_is_rejected() {
        let (registry, plugin) = passthrough_registry();
        let mut graph = Graph::new(GraphId::new(1), "g");
        let a = graph.module_create(&registry, plugin).unwrap();
        let err = graph.module_input_set(a, 0, Value::ModuleRef(a));
        assert!(matches!(err, Err(GraphError::WouldCycle { .. })));
    }

    #[test]
    fn three_cycle_is_rejected() {
        let (registry, plugin) = passthrough_registry();
        let mut graph = Graph::new(GraphId::new(1), "g");
        let a = graph.module_create(&registry, plugin).unwrap();
        let b = graph.module_create(&registry, plugin).unwrap();
        let c = graph.module_create(&registry, plugin).unwrap();
        graph.module_input_set(a, 0, Value::ModuleRef(b)).unwrap();
        graph.module_input_set(b, 0, Value::ModuleRef(c)).unwrap();
        let err = graph.module_input_set(c, 0, Value::ModuleRef(a));
        assert!(matches!(err, Err(GraphError::WouldCycle { .. })));
    }

    #[test]
    fn destroy_removes_dependant_and_dependency_links() {
        let (registry, plugin) = passthrough_registry();
        let mut graph = Graph::new(GraphId::new(1), "g");
        let a = graph.module_create(&registry, plugin).unwrap();
        let b = graph.module_create(&registry, plugin).unwrap();
        graph.module_input_set(a, 0, Value::ModuleRef(b)).unwrap();
        let mut store = NodeStore::new();
        graph.module_destroy(b, &mut store).unwrap();
        assert!(graph.module(a).unwrap().dependencies.is_empty());
    }

    #[test]
    fn relinking_an_input_drops_the_old_dependency_edge() {
        let (registry, plugin) = passthrough_registry();
        let mut graph = Graph::new(GraphId::new(1), "g");
        let a = graph.module_create(&registry, plugin).unwrap();
        let b = graph.module_create(&registry, plugin).unwrap();
        let c = graph.module_create(&registry, plugin).unwrap();
        graph.module_input_set(a, 0, Value::ModuleRef(b)).unwrap();
        graph.module_input_set(a, 0, Value::ModuleRef(c)).unwrap();
        assert!(!graph.module(b).unwrap().dependants.contains(&a));
        assert!(graph.module(c).unwrap().dependants.contains(&a));
    }

    fn scalar_input_registry() -> (Registry, PluginId) {
        let mut registry = Registry::new();
        let id = registry
            .register(
                PluginBuilder::create("scale")
                    .set_input(crate::value::ValueType::Real64, "amount", &[])
                    .set_compute(Arc::new(|args: &mut ComputeArgs| {
                        args.output.set(Value::Int32(1));
                        ComputeStatus::Done
                    })),
            )
            .unwrap();
        (registry, id)
    }

    #[test]
    fn describe_only_carries_explicitly_set_inputs() {
        let (registry, plugin) = scalar_input_registry();
        let mut graph = Graph::new(GraphId::new(1), "g");
        let a = graph.module_create(&registry, plugin).unwrap();
        graph.module_input_set(a, 0, Value::Real64(1.5)).unwrap();
        let store = NodeStore::new();

        let description = graph.describe(&store);
        assert_eq!(description.modules.len(), 1);
        assert_eq!(description.modules[0].inputs.len(), 1);
        assert_eq!(description.modules[0].inputs[0].value, "1.5");
        assert_eq!(description.modules[0].inputs[0].value_type, "Real64");
    }

    #[test]
    fn from_description_replays_a_set_input() {
        let (registry, plugin) = scalar_input_registry();
        let mut graph = Graph::new(GraphId::new(1), "g");
        let a = graph.module_create(&registry, plugin).unwrap();
        graph.module_input_set(a, 0, Value::Real64(2.5)).unwrap();
        let store = NodeStore::new();
        let description = graph.describe(&store);

        let mut resumed = Graph::from_description(&description, &registry).unwrap();
        let resumed_id = resumed.modules().next().unwrap().id;
        let resumed_module = resumed.module_mut(resumed_id).unwrap();
        let (value, _) = resumed_module.ports.port_mut(0).unwrap().get(crate::value::ValueType::Real64, &store);
        assert_eq!(value, Value::Real64(2.5));
    }
}
