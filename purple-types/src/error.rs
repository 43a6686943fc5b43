/// A type-erased error, used at the boundary between this engine and its
/// external collaborators (transport, plug-in compute functions) where we
/// don't want every crate to know every other crate's error enum.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;
