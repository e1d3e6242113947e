pub mod adapter;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod factory;
pub mod key;
pub mod scheme;
pub mod wrapper;

pub use adapter::{
    HashUniqueIndex, IndexScan, OrderedMultiMapIndex, OrderedUniqueIndex, ScanStart, TableIndex,
};
pub use cursor::{CursorState, ScanCursor};
pub use engine::{EngineCursor, HashTable, MapEngine, OrderedEngine, OrderedTree};
pub use error::{IndexError, IndexResult};
pub use factory::{HashBacking, IndexConfig, IndexFactory};
pub use key::{KeyEncoder, KeyMode};
pub use scheme::{IndexScheme, IndexStats, IndexType};
pub use wrapper::TracingIndex;
