//! Infrastructure layer: user directory, revocation storage and tenant-scoped read models.

pub mod directory;
pub mod read_model;
pub mod revocation;

pub use directory::{Directory, DirectoryError, InMemoryDirectory, TenantRecord};
pub use read_model::{InMemoryTenantStore, TenantStore};
pub use revocation::InMemoryRevocationList;
