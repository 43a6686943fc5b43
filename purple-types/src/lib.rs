//! Cross-cutting primitives shared by every crate in the workspace:
//! identifiers, error boxing. Everything domain-specific (values, ports,
//! nodes, graphs) lives in `purple-core`.

pub mod error;
pub mod ids;

pub use error::BoxedError;
pub use ids::{GraphId, Label, ModuleId, PluginId, PortIndex, RemoteId};
