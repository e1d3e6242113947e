pub mod error;
pub mod fixture;
pub mod printer;
pub mod table;

pub use error::{TableError, TableResult};
pub use table::PersistentTable;
