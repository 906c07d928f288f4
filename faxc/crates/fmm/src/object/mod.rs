//! Object Module - managed object model
//!
//! Header layout, class ids and the typed reference handles.

pub mod class;
pub mod handle;
pub mod header;

pub use class::{type_id, ClassId, Managed};
pub use handle::{Handle, Object, Scratch, Tracked};
pub use header::{header_size, Header, ObjectState, MAGIC};
