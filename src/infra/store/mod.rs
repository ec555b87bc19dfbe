//! Store backends implementing the registry and artifact traits.

pub mod state;
pub mod memory;
pub mod file;
pub mod postgres;

pub use file::FileStore;
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
