//! # FMM - Fax Memory Manager
//!
//! FMM is the runtime memory layer beneath Fax's managed object model. Fax
//! programs compile to a flat, linearly addressed memory: every reference
//! is a `u32` byte offset into one linear memory, never a native pointer.
//!
//! ## Overview
//!
//! FMM gives every generated constructor one allocation primitive and a
//! collector-agnostic hook protocol:
//!
//! - **Object Header**: class id and payload size in front of every object,
//!   plus two collector words when a collector is compiled in
//! - **Size Classes**: every block is a power of two
//! - **Scratch / Tracked**: objects start as allocator-owned scratch storage
//!   and become collector-owned when registered
//! - **GC Hooks**: `register` / `link` / `mark` / `collect`, implemented by
//!   whichever collector the build selects
//!
//! ## Quick Start
//!
//! ```rust
//! use fmm::{Allocator, ClassId, Handle, RecordingCollector};
//!
//! fn main() -> Result<(), fmm::MemError> {
//!     let mut alloc: Allocator<RecordingCollector> = fmm::init()?;
//!
//!     // Constructor: allocate, fill fields, register
//!     let point = alloc.allocate(8)?;
//!     alloc.payload_mut(&point)?.copy_from_slice(&[1, 0, 0, 0, 2, 0, 0, 0]);
//!     let point = alloc.register(point, ClassId::new(40))?;
//!
//!     // Growth may move the object; the collector hears about the new copy
//!     let point = alloc.reallocate(point, 64)?;
//!     assert_eq!(&alloc.payload(&point)?[..8], &[1, 0, 0, 0, 2, 0, 0, 0]);
//!
//!     alloc.collect(&mut vec![point.address()]);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │          Generated code (fmm-runtime)       │
//! │   __alloc  __realloc  __free  __register    │
//! └──────────────────────┬──────────────────────┘
//!                        │
//! ┌──────────────────────▼──────────────────────┐
//! │           Allocator<C: Collector>           │
//! │   header layout · size classes · states     │──► C::register / link
//! └──────────────────────┬──────────────────────┘    mark / collect
//!                        │
//! ┌──────────────────────▼──────────────────────┐
//! │        BackingAllocator (PoolAllocator)     │
//! │   free-lists per class · bump · static      │
//! └──────────────────────┬──────────────────────┘
//!                        │
//! ┌──────────────────────▼──────────────────────┐
//! │          LinearMemory (64 KiB pages)        │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`allocator`]: Allocation manager and the backing pool
//! - [`composite`]: Array construction over a separate buffer
//! - [`config`]: Memory configuration and validation
//! - [`error`]: Error types for all FMM operations
//! - [`hooks`]: Collector and root set interfaces
//! - [`logging`]: Structured allocation events
//! - [`memory`]: Linear memory
//! - [`object`]: Header layout, class ids and reference handles
//! - [`util`]: Alignment and size classing
//!
//! ## Limitations
//!
//! - **Single-threaded**: one allocator per execution context
//! - **No reclamation of tracked objects**: freeing registered objects is
//!   the collector's job

// Core modules
pub mod allocator;
pub mod config;
pub mod error;

// Memory and object model
pub mod memory;
pub mod object;

// Collector integration
pub mod composite;
pub mod hooks;

// Diagnostics
pub mod logging;

// Utilities
pub mod util;

// Re-export main types for convenience
pub use allocator::{Allocator, AllocatorStats, BackingAllocator, PoolAllocator};
pub use composite::make_array;
pub use config::MemConfig;
pub use error::{MemError, Result};
pub use hooks::{Collector, NoCollector, NoRoots, RecordingCollector, RootSet};
pub use memory::{Address, LinearMemory};
pub use object::{type_id, ClassId, Handle, Managed, Object, Scratch, Tracked};

/// FMM version string from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Create an allocator with default configuration
///
/// # Examples
///
/// ```rust
/// let alloc: fmm::Allocator<fmm::NoCollector> = fmm::init()?;
/// assert_eq!(alloc.stats().allocations, 0);
/// # Ok::<(), fmm::MemError>(())
/// ```
pub fn init<C: Collector + Default>() -> Result<Allocator<C>> {
    Allocator::new()
}

/// Create an allocator from a custom configuration
///
/// # Examples
///
/// ```rust
/// use fmm::{MemConfig, NoCollector};
///
/// let config = MemConfig {
///     initial_pages: 4,
///     trace_events: true,
///     ..Default::default()
/// };
///
/// let alloc: fmm::Allocator<NoCollector> = fmm::init_with_config(config)?;
/// assert_eq!(alloc.memory().pages(), 4);
/// # Ok::<(), fmm::MemError>(())
/// ```
pub fn init_with_config<C: Collector + Default>(config: MemConfig) -> Result<Allocator<C>> {
    Allocator::with_config(config)
}
