//! Object Header - Metadata preceding every managed payload
//!
//! Object Header Layout (little-endian, 32-bit linear memory):
//! ┌─────────────────────────────────────────┐
//! │         Class Id (4 bytes)     @0       │  <- MAGIC while scratch
//! ├─────────────────────────────────────────┤
//! │       Payload Size (4 bytes)   @4       │  <- logical payload length
//! ├─────────────────────────────────────────┤
//! │       Reserved 1 (word)        @8       │  ┐ collector-owned,
//! ├─────────────────────────────────────────┤  │ present only when a
//! │       Reserved 2 (word)        @12      │  ┘ collector is compiled in
//! └─────────────────────────────────────────┘
//!                                             <- reference points here
//!
//! This layout is a stable ABI shared with generated code. Header size and
//! `MAGIC` are baked into every caller.

use super::class::ClassId;
use crate::error::{MemError, Result};
use crate::memory::{Address, LinearMemory};
use crate::util::Alignment;
use serde::Serialize;
use static_assertions::{const_assert, const_assert_eq};
use std::fmt;

/// Class id of an allocated but unregistered object
pub const MAGIC: u32 = 0xA55E_4B17;

/// Size of a machine word in linear memory
pub const WORD_SIZE: usize = 4;

/// Offset of the class id field
pub const CLASS_ID_OFFSET: usize = 0;

/// Offset of the payload size field
pub const PAYLOAD_SIZE_OFFSET: usize = 4;

/// Offset of the first reserved word
pub const RESERVED_OFFSET: usize = 8;

/// Header size for a given build configuration
///
/// Full header (both reserved words) when a collector is compiled in,
/// truncated otherwise; rounded up to block alignment.
pub const fn header_size(gc_present: bool) -> usize {
    let raw = if gc_present {
        RESERVED_OFFSET + 2 * WORD_SIZE
    } else {
        RESERVED_OFFSET
    };
    Alignment::align_up(raw, Alignment::BLOCK)
}

const_assert_eq!(header_size(true), 16);
const_assert_eq!(header_size(false), 8);
const_assert!(MAGIC != 0);
const_assert_eq!(PAYLOAD_SIZE_OFFSET, CLASS_ID_OFFSET + 4);

/// Lifecycle state encoded in the class id field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ObjectState {
    /// Allocated, not yet registered; owned by the allocator
    Scratch,
    /// Registered under a class id; owned by the collector
    Tracked(ClassId),
    /// Neither `MAGIC` nor a valid class id (corruption)
    Invalid(u32),
}

impl ObjectState {
    /// Decode a raw class id field
    #[inline]
    pub const fn decode(raw: u32) -> Self {
        if raw == MAGIC {
            return ObjectState::Scratch;
        }
        match ClassId::from_raw(raw) {
            Some(id) => ObjectState::Tracked(id),
            None => ObjectState::Invalid(raw),
        }
    }
}

impl fmt::Display for ObjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectState::Scratch => write!(f, "scratch"),
            ObjectState::Tracked(id) => write!(f, "tracked({})", id),
            ObjectState::Invalid(raw) => write!(f, "invalid({:#x})", raw),
        }
    }
}

/// Decoded copy of an object header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Raw class id field
    pub class_id: u32,
    /// Logical payload length
    pub payload_size: u32,
    /// Collector words, `None` when no collector is compiled in
    pub reserved: Option<[u32; 2]>,
}

impl Header {
    /// Read the header of the object at `obj`
    pub fn read(memory: &LinearMemory, obj: Address, gc_present: bool) -> Result<Self> {
        let base = obj
            .checked_sub(header_size(gc_present) as Address)
            .ok_or(MemError::InvalidPointer { address: obj })?;
        let reserved = if gc_present {
            let first = base + RESERVED_OFFSET as Address;
            Some([
                memory.load_u32(first)?,
                memory.load_u32(first + WORD_SIZE as Address)?,
            ])
        } else {
            None
        };

        Ok(Self {
            class_id: memory.load_u32(base + CLASS_ID_OFFSET as Address)?,
            payload_size: memory.load_u32(base + PAYLOAD_SIZE_OFFSET as Address)?,
            reserved,
        })
    }

    /// Lifecycle state
    #[inline]
    pub fn state(&self) -> ObjectState {
        ObjectState::decode(self.class_id)
    }

    /// Whether the object is still scratch
    #[inline]
    pub fn is_scratch(&self) -> bool {
        self.class_id == MAGIC
    }
}

/// Block (header) address of the object at `obj`
#[inline]
pub fn block_of(obj: Address, gc_present: bool) -> Address {
    obj - header_size(gc_present) as Address
}

/// Object (payload) address of the block at `block`
#[inline]
pub fn object_of(block: Address, gc_present: bool) -> Address {
    block + header_size(gc_present) as Address
}

/// Initialize a fresh scratch header at `block`
pub fn write_scratch(
    memory: &mut LinearMemory,
    block: Address,
    payload_size: u32,
    gc_present: bool,
) -> Result<()> {
    memory.store_u32(block + CLASS_ID_OFFSET as Address, MAGIC)?;
    memory.store_u32(block + PAYLOAD_SIZE_OFFSET as Address, payload_size)?;
    if gc_present {
        memory.fill(block + RESERVED_OFFSET as Address, 0, 2 * WORD_SIZE)?;
    }
    Ok(())
}

/// Overwrite the class id of the object at `obj`
pub fn write_class_id(
    memory: &mut LinearMemory,
    obj: Address,
    class_id: u32,
    gc_present: bool,
) -> Result<()> {
    let base = block_of(obj, gc_present);
    memory.store_u32(base + CLASS_ID_OFFSET as Address, class_id)
}

/// Overwrite the payload size of the object at `obj`
pub fn write_payload_size(
    memory: &mut LinearMemory,
    obj: Address,
    payload_size: u32,
    gc_present: bool,
) -> Result<()> {
    let base = block_of(obj, gc_present);
    memory.store_u32(base + PAYLOAD_SIZE_OFFSET as Address, payload_size)
}
