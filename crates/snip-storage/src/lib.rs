//! [`ExternalStore`](snip_core::ExternalStore) implementations.

pub mod memory;
pub mod mysql;

pub use memory::InMemoryStore;
pub use mysql::MySqlStore;
