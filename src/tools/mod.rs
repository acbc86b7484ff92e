pub mod catalogue;
pub mod registry;

pub use registry::CapabilityRegistry;
