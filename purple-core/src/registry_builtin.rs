//! Built-in plug-ins pre-registered on every `Registry` (spec §4.2): a
//! source that reads a node's current content onto its output, and a sink
//! that creates/updates a node from its input.

use std::sync::Arc;

use crate::plugin::{ComputeArgs, ComputeStatus, InputTag, PluginBuilder, Registry};
use crate::value::{Value, ValueType};

/// Reads the named node (by string input 0) and republishes it as a node
/// reference on its output, so downstream modules can depend on scene
/// content without computing it themselves.
fn node_input_compute(args: &mut ComputeArgs) -> ComputeStatus {
    let name = args.inputs[0].get(ValueType::String, args.node_store);
    let Value::String(name) = name else {
        return ComputeStatus::Failure;
    };
    if name.is_empty() {
        return ComputeStatus::InputMissing;
    }
    let Some(node) = args
        .node_store
        .find_by_name_and_kind(&name, crate::node::NodeKind::Object)
        .or_else(|| crate::node::NodeKind::ALL.iter().find_map(|k| args.node_store.find_by_name_and_kind(&name, *k)))
    else {
        return ComputeStatus::Again;
    };
    let mut nodes = crate::node::NodeSet::empty();
    nodes.push(node);
    args.output.set_nodes(nodes);
    ComputeStatus::Done
}

/// Creates (or reuses, across resumes) a single node named by input 1 of
/// the kind named by input 0, and copies input 2's node set onto it.
fn node_output_compute(args: &mut ComputeArgs) -> ComputeStatus {
    let kind_name = args.inputs[0].get(ValueType::String, args.node_store);
    let Value::String(kind_name) = kind_name else {
        return ComputeStatus::Failure;
    };
    let Some(kind) = parse_kind(&kind_name) else {
        return ComputeStatus::Failure;
    };
    let name = args.inputs[1].get(ValueType::String, args.node_store);
    let Value::String(name) = name else {
        return ComputeStatus::Failure;
    };

    let id = match args.nodes.create(args.node_store, kind, &name, 0) {
        Ok(id) => id,
        Err(_) => return ComputeStatus::Failure,
    };
    let mut nodes = crate::node::NodeSet::empty();
    nodes.push(id);
    args.output.set_nodes(nodes);
    ComputeStatus::Done
}

fn parse_kind(name: &str) -> Option<crate::node::NodeKind> {
    use crate::node::NodeKind::*;
    Some(match name {
        "object" => Object,
        "geometry" => Geometry,
        "material" => Material,
        "bitmap" => Bitmap,
        "curve" => Curve,
        "text" => Text,
        "audio" => Audio,
        _ => return None,
    })
}

pub fn register_builtins(registry: &mut Registry) {
    registry.register(
        PluginBuilder::create("node-input")
            .set_input(ValueType::String, "name", &[InputTag::Required])
            .set_meta("category", "scene")
            .set_compute(Arc::new(node_input_compute)),
    );
    registry.register(
        PluginBuilder::create("node-output")
            .set_input(ValueType::String, "kind", &[InputTag::Required])
            .set_input(ValueType::String, "name", &[InputTag::Required])
            .set_input(ValueType::ModuleRef, "content", &[])
            .set_meta("category", "scene")
            .set_compute(Arc::new(node_output_compute)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_register_under_their_fixed_names() {
        let mut registry = Registry::new();
        register_builtins(&mut registry);
        assert!(registry.find_by_name("node-input").is_some());
        assert!(registry.find_by_name("node-output").is_some());
    }
}
