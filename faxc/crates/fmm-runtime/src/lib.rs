//! Fax Memory Runtime
//!
//! C-ABI entry points that generated Fax code calls for every managed
//! object:
//! - Allocation (`__alloc`, `__realloc`, `__free`)
//! - Collector protocol (`__register`, `__link`, `__mark`, `__collect`)
//! - Array construction (`__new_array`)
//! - Layout constants and memory access for the host
//!
//! The collector is fixed at build time: the `recording-collector` feature
//! compiles the recording collector in, otherwise no collector is present
//! and headers are the short form.

mod abi;

pub use abi::*;
