pub mod manifest;
pub mod registry;
pub mod store;

pub use manifest::{normalize_path, CapabilityManifest, FsAccess, FsOp};
pub use registry::{CapabilityEntry, CapabilityRegistry, NamedCapability};
pub use store::ManifestStore;
