//! An instance's bank of input ports (spec §4.3 "Port Set"), sized to the
//! owning plug-in's declared input list and tracking which slots were ever
//! explicitly set versus are still showing their declared default.

use std::collections::HashSet;

use crate::plugin::{InputRef, InputSpec};
use crate::port::Port;
use crate::value::Value;

pub struct PortSet {
    ports: Vec<Port>,
    explicit: HashSet<u16>,
}

impl PortSet {
    /// Builds a port set for `inputs`. A port whose spec declares a default
    /// is seeded with it; one that doesn't is left unset, so `Port::get`
    /// reports `defaulted = true` for it until something is explicitly
    /// written (spec §4.3: "a port not yet explicitly set reads as its
    /// input spec's default, or the type's zero value if none" — and a
    /// required port with no default and nothing written is missing).
    pub fn new(inputs: &[InputSpec]) -> Self {
        let mut ports = Vec::with_capacity(inputs.len());
        for spec in inputs {
            let mut port = Port::new();
            if let Some(default) = &spec.default {
                port.set(default.clone());
            }
            ports.push(port);
        }
        Self {
            ports,
            explicit: HashSet::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.ports.len()
    }

    pub fn set(&mut self, index: u16, value: Value) -> Option<()> {
        let port = self.ports.get_mut(index as usize)?;
        port.set(value);
        self.explicit.insert(index);
        Some(())
    }

    /// Parses `text` as the target port's declared type and sets it — used
    /// for the catalog-driven "set input from string" entry point (spec §6).
    pub fn set_from_string(&mut self, inputs: &[InputSpec], index: u16, text: &str) -> Option<()> {
        let spec = inputs.get(index as usize)?;
        let value = crate::value::Value::String(text.to_string()).convert(spec.value_type);
        self.set(index, value)
    }

    /// Reverts a port to its declared default (or, lacking one, to unset)
    /// and clears the "explicitly set" flag — idempotent, per spec §4.3 and
    /// §8.
    pub fn clear(&mut self, inputs: &[InputSpec], index: u16) -> Option<()> {
        let spec = inputs.get(index as usize)?;
        let port = self.ports.get_mut(index as usize)?;
        match &spec.default {
            Some(default) => port.set(default.clone()),
            None => port.clear(),
        }
        self.explicit.remove(&index);
        Some(())
    }

    pub fn is_set(&self, index: u16) -> bool {
        self.explicit.contains(&index)
    }

    pub fn port(&self, index: u16) -> Option<&Port> {
        self.ports.get(index as usize)
    }

    pub fn port_mut(&mut self, index: u16) -> Option<&mut Port> {
        self.ports.get_mut(index as usize)
    }

    /// Reads a module-reference input's target module id, if the port
    /// currently holds one (spec §4.4 "compute-time input resolution").
    pub fn module_reference(&self, index: u16) -> Option<purple_types::ModuleId> {
        match self.ports.get(index as usize)?.written()? {
            Value::ModuleRef(id) => Some(*id),
            _ => None,
        }
    }

    /// Builds the read-only view handed to `compute`, with `overrides`
    /// substituted in for any module-reference input (the caller resolves
    /// those to the upstream module's output port before calling this).
    pub fn resolve<'a>(&'a self, overrides: &[(u16, &'a Port)]) -> Vec<InputRef<'a>> {
        self.ports
            .iter()
            .enumerate()
            .map(|(i, own)| {
                let idx = i as u16;
                match overrides.iter().find(|(o, _)| *o == idx) {
                    Some((_, resolved)) => InputRef::new(resolved),
                    None => InputRef::new(own),
                }
            })
            .collect()
    }

    /// Spec §4.3: "If a required input is unset, compute is skipped and the
    /// instance reports INPUT_MISSING." A port counts as set once something
    /// has been explicitly written to it, regardless of whether it also
    /// carries a declared default.
    pub fn required_missing(&self, inputs: &[InputSpec]) -> bool {
        inputs.iter().enumerate().any(|(i, spec)| spec.required && !self.is_set(i as u16))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeStore;
    use crate::value::ValueType;

    fn spec(ty: ValueType, required: bool, default: Option<Value>) -> InputSpec {
        InputSpec {
            name: "a".to_string(),
            value_type: ty,
            required,
            default,
            min: None,
            max: None,
            enum_values: None,
            description: None,
        }
    }

    #[test]
    fn new_ports_read_declared_default() {
        let specs = vec![spec(ValueType::Int32, false, Some(Value::Int32(7)))];
        let mut set = PortSet::new(&specs);
        let store = NodeStore::new();
        let (v, _) = set.port_mut(0).unwrap().get(ValueType::Int32, &store);
        assert_eq!(v, Value::Int32(7));
        assert!(!set.is_set(0));
    }

    #[test]
    fn set_marks_explicit_clear_reverts_to_default() {
        let specs = vec![spec(ValueType::Int32, false, Some(Value::Int32(7)))];
        let mut set = PortSet::new(&specs);
        set.set(0, Value::Int32(99));
        assert!(set.is_set(0));
        set.clear(&specs, 0);
        assert!(!set.is_set(0));
        let store = NodeStore::new();
        let (v, _) = set.port_mut(0).unwrap().get(ValueType::Int32, &store);
        assert_eq!(v, Value::Int32(7));
    }

    #[test]
    fn required_input_left_at_default_is_reported_missing() {
        let specs = vec![spec(ValueType::Int32, true, None)];
        let set = PortSet::new(&specs);
        assert!(set.required_missing(&specs));
    }

    #[test]
    fn required_input_explicitly_set_is_not_missing() {
        let specs = vec![spec(ValueType::Int32, true, None)];
        let mut set = PortSet::new(&specs);
        set.set(0, Value::Int32(0));
        assert!(!set.required_missing(&specs));
    }

    #[test]
    fn required_input_with_declared_default_is_still_missing_until_explicitly_set() {
        // A default only changes what a read falls back to — it does not
        // mark the port as explicitly set (spec §4.3).
        let specs = vec![spec(ValueType::Int32, true, Some(Value::Int32(7)))];
        let mut set = PortSet::new(&specs);
        assert!(set.required_missing(&specs));
        set.set(0, Value::Int32(7));
        assert!(!set.required_missing(&specs));
    }
}
