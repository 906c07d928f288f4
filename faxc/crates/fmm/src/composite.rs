//! Composite Builder - arrays over a separately allocated buffer
//!
//! An array is two managed objects: a fixed 16-byte array object and a
//! backing buffer of class `BUFFER` holding the elements.
//!
//! Array Payload Layout:
//! ┌──────────────────────────────┐
//! │  buffer      (u32)   @0      │  -> buffer object
//! │  dataStart   (u32)   @4      │  -> first element (buffer payload)
//! │  byteLength  (u32)   @8      │
//! │  length      (u32)   @12     │  element count
//! └──────────────────────────────┘
//!
//! Both objects are allocated before either is registered, and both are
//! registered before the buffer is linked under the array, so the
//! collector never sees a half-built composite.

use crate::allocator::{Allocator, BackingAllocator};
use crate::error::{MemError, Result};
use crate::hooks::Collector;
use crate::memory::Address;
use crate::object::{ClassId, Handle, Tracked};
use crate::util::max_payload;

/// Payload size of the array object
pub const ARRAY_PAYLOAD_SIZE: usize = 16;

pub const BUFFER_OFFSET: Address = 0;
pub const DATA_START_OFFSET: Address = 4;
pub const BYTE_LENGTH_OFFSET: Address = 8;
pub const LENGTH_OFFSET: Address = 12;

/// Build an array of `capacity` elements of `1 << align_log2` bytes each
///
/// The buffer is filled from `source` when given, zeroed otherwise.
///
/// ```rust
/// use fmm::{make_array, Allocator, ClassId, RecordingCollector};
/// use fmm::composite::array_length;
///
/// let mut alloc: Allocator<RecordingCollector> = Allocator::new().unwrap();
/// let arr = make_array(&mut alloc, 4, ClassId::new(32), 2, None).unwrap();
/// assert_eq!(array_length(&alloc, arr).unwrap(), 4);
/// ```
///
/// # Errors
///
/// - `PayloadTooLarge` if `capacity << align_log2` does not fit one block
/// - `InvalidPointer` if `source` does not cover the buffer length
/// - `OutOfMemory` from either allocation
pub fn make_array<C: Collector, B: BackingAllocator>(
    alloc: &mut Allocator<C, B>,
    capacity: usize,
    class: ClassId,
    align_log2: u32,
    source: Option<Address>,
) -> Result<Tracked> {
    let max = max_payload(Allocator::<C, B>::HEADER_SIZE);
    let elem = 1usize.checked_shl(align_log2).unwrap_or(usize::MAX);
    let byte_length = capacity
        .checked_mul(elem)
        .filter(|&len| len <= max)
        .ok_or(MemError::PayloadTooLarge {
            size: capacity.saturating_mul(elem),
            max,
        })?;

    if let Some(src) = source {
        alloc.memory().slice(src, byte_length)?;
    }

    let array = alloc.allocate(ARRAY_PAYLOAD_SIZE)?;
    let buffer = match alloc.allocate(byte_length) {
        Ok(buffer) => buffer,
        Err(err) => {
            alloc.discard(array)?;
            return Err(err);
        }
    };

    let data = buffer.address();
    if let Some(src) = source {
        alloc.memory_mut().copy(data, src, byte_length)?;
    }

    let array = alloc.register(array, class)?;
    let buffer = alloc.register(buffer, ClassId::BUFFER)?;

    let base = array.address();
    let memory = alloc.memory_mut();
    memory.store_u32(base + BUFFER_OFFSET, buffer.address())?;
    memory.store_u32(base + DATA_START_OFFSET, data)?;
    memory.store_u32(base + BYTE_LENGTH_OFFSET, byte_length as u32)?;
    memory.store_u32(base + LENGTH_OFFSET, capacity as u32)?;

    if C::PRESENT {
        alloc.link(buffer, array)?;
    }

    log::trace!(
        "array {:#x}: {} x {} bytes in buffer {:#x}",
        base,
        capacity,
        elem,
        buffer.address()
    );
    Ok(array)
}

/// Element count of an array
pub fn array_length<C: Collector, B: BackingAllocator>(
    alloc: &Allocator<C, B>,
    array: Tracked,
) -> Result<u32> {
    alloc.memory().load_u32(array.address() + LENGTH_OFFSET)
}

/// Backing buffer of an array
pub fn array_buffer<C: Collector, B: BackingAllocator>(
    alloc: &Allocator<C, B>,
    array: Tracked,
) -> Result<Tracked> {
    alloc
        .memory()
        .load_u32(array.address() + BUFFER_OFFSET)
        .map(Tracked::assume)
}

/// Element bytes of an array
pub fn array_data<C: Collector, B: BackingAllocator>(
    alloc: &Allocator<C, B>,
    array: Tracked,
) -> Result<&[u8]> {
    let memory = alloc.memory();
    let start = memory.load_u32(array.address() + DATA_START_OFFSET)?;
    let len = memory.load_u32(array.address() + BYTE_LENGTH_OFFSET)?;
    memory.slice(start, len as usize)
}
