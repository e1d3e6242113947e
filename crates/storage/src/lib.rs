// MODULE DECLARATIONS
// These files exist internally but we decide what to expose below.
mod error;
mod schema;
mod store;
mod tuple;

// PUBLIC API EXPORTS
// Index and table crates reach rows only through these.
pub use error::{StorageError, StorageResult};
pub use schema::{ColumnDef, ColumnType, MAX_VARCHAR_LENGTH, TupleSchema};
pub use store::{Relocation, RowStore};
pub use tuple::{ADDRESS_SIZE, Tuple, TupleAddress, VARCHAR_NULL_FLAG, Value};
