pub mod diff;
pub mod identity;
pub mod stats;
pub mod store;

#[cfg(test)]
pub mod testing;

pub use identity::IdentityFilter;
pub use store::{GitStore, RepositoryDescriptor, RepositoryStore};
