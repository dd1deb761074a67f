//! kvstore-core — the typed KV engine: arena allocator, chained hash
//! table, typed value union, and the binary snapshot codec. No
//! networking lives here; see `kvstore-store` for the thread-safe
//! facade and `kvstored` for the wire protocol.

pub mod arena;
pub mod bytespan;
pub mod codec;
pub mod error;
pub mod hashtable;
pub mod value;

pub use arena::Arena;
pub use bytespan::ByteSpan;
pub use error::{EngineError, EngineResult};
pub use hashtable::HashTable;
pub use value::{Tag, Value};
