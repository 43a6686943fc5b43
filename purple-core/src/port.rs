//! Ports: typed value slots with a lazy conversion cache (spec §3, §4.1).

use std::collections::HashMap;

use crate::node::{NodeId, NodeSet, NodeStore};
use crate::value::{Value, ValueType};

#[derive(Debug, Default)]
pub struct Port {
    written: Option<Value>,
    cache: HashMap<ValueType, Value>,
    nodes: NodeSet,
}

impl Port {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the written payload and clears the conversion cache — the
    /// cache is append-only *between* writes, not across them.
    pub fn set(&mut self, value: Value) {
        self.written = Some(value);
        self.cache.clear();
    }

    /// Reverts the port to unset. Callers wanting "revert to default" layer
    /// that on top by calling `set` with the input spec's default instead.
    pub fn clear(&mut self) {
        self.written = None;
        self.cache.clear();
    }

    pub fn set_nodes(&mut self, nodes: NodeSet) {
        self.nodes = nodes;
        self.cache.clear();
    }

    pub fn push_node(&mut self, id: NodeId) {
        self.nodes.push(id);
        self.cache.clear();
    }

    pub fn nodes(&self) -> &NodeSet {
        &self.nodes
    }

    pub fn present(&self, ty: ValueType) -> bool {
        self.written.as_ref().map(|v| v.value_type() == ty).unwrap_or(false)
    }

    pub fn is_set(&self) -> bool {
        self.written.is_some() || !self.nodes.is_empty()
    }

    pub fn written(&self) -> Option<&Value> {
        self.written.as_ref()
    }

    /// Reads never fail (spec §4.1): returns the written value if its type
    /// matches, else a cached conversion if present, else computes and caches
    /// the conversion, else the type's default. The second element of the
    /// return tuple is `true` when the read fell through to the default
    /// (`get(type) → (payload, default-if-missing)`).
    pub fn get(&mut self, target: ValueType, node_store: &NodeStore) -> (Value, bool) {
        if let Some(written) = &self.written {
            if written.value_type() == target {
                return (written.clone(), false);
            }
        }
        if let Some(cached) = self.cache.get(&target) {
            return (cached.clone(), false);
        }
        if let Some(written) = self.written.clone() {
            let converted = written.convert(target);
            self.cache.insert(target, converted.clone());
            return (converted, false);
        }
        if !self.nodes.is_empty() {
            let converted = node_store.node_set_to_value(&self.nodes, target);
            self.cache.insert(target, converted.clone());
            return (converted, false);
        }
        (Value::default_for(target), true)
    }
}
