//! Config persistence for catalogsync.
//!
//! The sync engine only needs a `read(path) -> Config` / `write(path, Config)`
//! contract; this crate provides it for the supported file formats:
//! - YAML (`.yml`, `.yaml`)
//! - JSON (`.json`)
//! - TypeScript module (`.ts`), written as an auto-generated module that
//!   exports the config as a JSON literal
//!
//! Every read is schema-validated through [`catalogsync_types::validate`].

mod error;
mod file;
mod format;
mod memory;
mod store;

pub use error::{StoreError, StoreResult};
pub use file::FileConfigStore;
pub use format::{with_format_extension, ConfigFormat};
pub use memory::MemoryConfigStore;
pub use store::ConfigStore;
