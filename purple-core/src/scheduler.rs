//! The cooperative, single-threaded scheduler (spec §4.5).
//!
//! Every module instance that needs to run sits in a ready list exactly
//! once; `update` drains it in FIFO order until either the list is empty or
//! the time slice expires, at which point the remaining entries stay queued
//! for the next call. A module whose output changed enqueues its dependants;
//! `ComputeStatus::Again` re-enqueues the module itself.

use std::collections::{HashSet, VecDeque};

use purple_types::ModuleId;

use crate::clock::TimeSlice;
use crate::errors::GraphError;
use crate::graph::Graph;
use crate::node::NodeStore;
use crate::plugin::{ComputeStatus, Registry};

#[derive(Default)]
pub struct Scheduler {
    ready: VecDeque<ModuleId>,
    queued: HashSet<ModuleId>,
}

/// One entry's outcome, reported back to callers that want to react to
/// individual module runs (the synchronizer cares about geometry/material
/// outputs changing, for instance).
pub struct RanModule {
    pub module: ModuleId,
    pub status: ComputeStatus,
    pub output_changed: bool,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a module if it isn't already waiting to run.
    pub fn add(&mut self, module: ModuleId) {
        if self.queued.insert(module) {
            self.ready.push_back(module);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ready.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.ready.len()
    }

    /// Runs ready modules until the list drains or `slice` expires.
    /// Returns every module actually computed this call, in run order.
    pub fn update(
        &mut self,
        graph: &mut Graph,
        registry: &Registry,
        node_store: &mut NodeStore,
        slice: &TimeSlice,
    ) -> Result<Vec<RanModule>, GraphError> {
        let mut ran = Vec::new();
        while !slice.is_expired() {
            let Some(module) = self.ready.pop_front() else {
                break;
            };
            self.queued.remove(&module);

            if graph.module(module).is_none() {
                // Destroyed while queued; drop silently.
                continue;
            }

            let outcome = graph.compute_module(module, registry, node_store)?;

            if outcome.status == ComputeStatus::Again {
                self.add(module);
            }
            if outcome.output_changed {
                for dependant in graph.dependants_of(module) {
                    self.add(dependant);
                }
            }

            ran.push(RanModule {
                module,
                status: outcome.status,
                output_changed: outcome.output_changed,
            });
        }
        Ok(ran)
    }
}
