pub mod manager;
pub mod memory;
pub mod query_builder;
pub mod repository;
pub mod store;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryStore;
pub use repository::PgSragStore;
pub use store::{RegionColumn, SragQuery, SragStore};
