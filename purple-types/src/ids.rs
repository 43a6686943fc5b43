use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! newtype_id {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl $name {
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}:{}", stringify!($name), self.0)
            }
        }
    };
}

newtype_id!(GraphId);
newtype_id!(ModuleId);
newtype_id!(PluginId);

/// Identifier assigned to a node by the remote once it acknowledges creation.
///
/// Locally-created nodes hold [`RemoteId::UNKNOWN`] until the remote assigns
/// a real id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RemoteId(pub u64);

impl RemoteId {
    pub const UNKNOWN: RemoteId = RemoteId(0);

    pub fn is_known(self) -> bool {
        self != Self::UNKNOWN
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_known() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "<unassigned>")
        }
    }
}

/// A small integer a plug-in uses to name each node it creates during a
/// single compute, so re-computations reuse the same node. See
/// `purple_core::node_factory`.
pub type Label = u32;

/// Index of an input slot within a module's port set, or of a module's (sole)
/// output port. Mirrors the teacher workspace's `PortHandle` concept, narrowed
/// to the fixed-size indexed port arrays this engine uses.
pub type PortIndex = u16;
