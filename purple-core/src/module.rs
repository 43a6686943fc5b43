//! A module: one running instance of a plug-in inside a graph (spec §3, §4.4).

use std::collections::HashSet;

use purple_types::{GraphId, ModuleId, PluginId};

use crate::node::NodeStore;
use crate::node_factory::NodeFactory;
use crate::plugin::{ComputeArgs, ComputeStatus, PluginDescriptor};
use crate::port::Port;
use crate::portset::PortSet;

/// Outcome of running one compute pass, used by the scheduler to decide
/// whether to re-enqueue the instance and whether to notify dependants.
pub struct ComputeOutcome {
    pub status: ComputeStatus,
    pub output_changed: bool,
}

pub struct Module {
    pub id: ModuleId,
    pub graph: GraphId,
    pub plugin: PluginId,
    pub ports: PortSet,
    pub state: Vec<u8>,
    pub output: Port,
    pub factory: NodeFactory,
    /// Modules whose input reads this instance's output — maintained by
    /// `Graph` as links are made/broken (spec §4.4 "dependants").
    pub dependants: HashSet<ModuleId>,
    /// Modules this instance reads a module-reference input from.
    pub dependencies: HashSet<ModuleId>,
    /// Whether the output port has been cleared for the compute cycle
    /// currently in progress. Spec §4.5/§5: *output-begin* (clear output,
    /// reset the changed flag) runs once per cycle, on the first call after
    /// the previous terminal result — not on every `AGAIN` retry. This is
    /// that "has output-begin already run for this cycle" bit.
    cycle_started: bool,
}

impl Module {
    pub fn new(id: ModuleId, graph: GraphId, plugin: &PluginDescriptor) -> Self {
        Self {
            id,
            graph,
            plugin: plugin.id,
            ports: PortSet::new(&plugin.inputs),
            state: vec![0u8; plugin.state_size],
            output: Port::new(),
            factory: NodeFactory::new(graph, id),
            dependants: HashSet::new(),
            dependencies: HashSet::new(),
            cycle_started: false,
        }
    }

    /// Runs one compute pass. `resolved_inputs` are the module-reference
    /// input overrides the caller already looked up from upstream outputs
    /// (spec §4.4: the graph resolves module references before scheduling,
    /// the module itself never dereferences `ModuleId`s).
    ///
    /// `output_changed` on the returned outcome is only ever `true` on a
    /// terminal result (`Done`/`Failure`/`InputMissing`) — intermediate
    /// writes during an `Again` cycle are never reported, so the scheduler
    /// never notifies dependants mid-cycle (spec §5 "Intermediate writes
    /// during an AGAIN cycle are not observable").
    pub fn compute(
        &mut self,
        descriptor: &PluginDescriptor,
        resolved_inputs: &[(u16, &Port)],
        node_store: &mut NodeStore,
    ) -> ComputeOutcome {
        if self.ports.required_missing(&descriptor.inputs) {
            return ComputeOutcome {
                status: ComputeStatus::InputMissing,
                output_changed: false,
            };
        }

        if !self.cycle_started {
            // output-begin: clear the port and reset the changed flag for
            // this cycle before the first call runs.
            self.output.clear();
            self.cycle_started = true;
        }

        let inputs = self.ports.resolve(resolved_inputs);
        self.factory.begin_pass();

        let status = {
            let mut args = ComputeArgs {
                inputs: &inputs,
                output: &mut self.output,
                state: &mut self.state,
                nodes: &mut self.factory,
                node_store,
            };
            (descriptor.compute)(&mut args)
        };
        self.factory.end_pass(node_store);

        let terminal = status != ComputeStatus::Again;
        let output_changed = if terminal {
            self.cycle_started = false;
            self.output.is_set()
        } else {
            false
        };
        ComputeOutcome { status, output_changed }
    }
}
