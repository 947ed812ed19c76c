//! Job-ownership registry with an in-memory implementation.

mod memory;

pub use memory::InMemoryJobRegistry;
pub use portal_types::{JobRegistry, RegistryError};
