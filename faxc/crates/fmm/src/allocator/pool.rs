//! Pool Allocator - size-indexed backing allocator over linear memory
//!
//! The allocation manager only ever asks for power-of-two blocks, so the
//! pool keeps one free-list per size class. A freed block goes back on the
//! list of its class and is handed out again for the next request of the
//! same class; otherwise blocks are bump-allocated from the top of the
//! heap, growing memory page by page until the configured limit.
//!
//! The bottom of memory holds the static region: compiler-emitted literal
//! objects that are allocated once and never freed.
//!
//! ```text
//! free_lists[3]  (8 B):  ──► 0x1040 ──► 0x1128
//! free_lists[5] (32 B):  ──► 0x10A0
//! free_lists[6] (64 B):  (empty: bump from top)
//! ```

use crate::config::MemConfig;
use crate::error::{MemError, Result};
use crate::memory::{Address, LinearMemory};
use crate::util::{class_index, Alignment, CLASS_COUNT};
use std::collections::BTreeMap;

/// Lowest address ever handed out; 0 stays the null reference
pub const STATIC_BASE: Address = 8;

/// Raw byte allocator the allocation manager is built on
///
/// Sizes requested are always powers of two and multiples of the block
/// alignment. Returned addresses are block (header) addresses.
pub trait BackingAllocator {
    /// Allocate a block of exactly `size` bytes
    fn allocate(&mut self, size: usize) -> Result<Address>;

    /// Return a block to the allocator
    fn free(&mut self, block: Address) -> Result<()>;

    /// Size of the live block starting at `block`
    fn block_size(&self, block: Address) -> Option<usize>;

    /// Whether `addr` lies in the static (non-movable) region
    fn is_static(&self, addr: Address) -> bool;

    /// Underlying memory
    fn memory(&self) -> &LinearMemory;

    /// Underlying memory, mutably
    fn memory_mut(&mut self) -> &mut LinearMemory;

    /// Copy `len` bytes within memory
    fn copy(&mut self, dst: Address, src: Address, len: usize) -> Result<()> {
        self.memory_mut().copy(dst, src, len)
    }

    /// Fill `len` bytes with `byte`
    fn fill(&mut self, dst: Address, byte: u8, len: usize) -> Result<()> {
        self.memory_mut().fill(dst, byte, len)
    }
}

/// Statistics for the pool
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Bytes in live blocks
    pub allocated_bytes: usize,
    /// High-water mark of `allocated_bytes`
    pub peak_bytes: usize,
    /// Live block count
    pub live_blocks: usize,
    /// Blocks served from a free-list
    pub reused_blocks: usize,
    /// Blocks carved from the top of the heap
    pub fresh_blocks: usize,
    /// Blocks returned by `free`
    pub freed_blocks: usize,
    /// Bytes used in the static region
    pub static_bytes: usize,
}

/// Power-of-two free-list pool
pub struct PoolAllocator {
    memory: LinearMemory,
    free_lists: [Vec<Address>; CLASS_COUNT],
    /// Live blocks: address -> size
    live: BTreeMap<Address, usize>,
    static_top: usize,
    heap_base: usize,
    top: usize,
    stats: PoolStats,
}

impl PoolAllocator {
    /// Create a pool over fresh linear memory
    pub fn new(config: &MemConfig) -> Result<Self> {
        config.validate()?;

        let static_end = STATIC_BASE as usize + config.static_size as usize;
        let heap_base = Alignment::align_up(static_end, 2 * Alignment::BLOCK);

        Ok(Self {
            memory: LinearMemory::new(config.initial_pages, config.max_pages),
            free_lists: std::array::from_fn(|_| Vec::new()),
            live: BTreeMap::new(),
            static_top: STATIC_BASE as usize,
            heap_base,
            top: heap_base,
            stats: PoolStats::default(),
        })
    }

    /// Carve `size` bytes out of the static region
    ///
    /// Static blocks are never freed.
    pub fn allocate_static(&mut self, size: usize) -> Result<Address> {
        let start = Alignment::align_up(self.static_top, Alignment::BLOCK);
        let end = start + size;
        if end > self.heap_base {
            return Err(MemError::OutOfMemory {
                requested: size,
                available: self.heap_base.saturating_sub(start),
            });
        }

        self.static_top = end;
        self.stats.static_bytes = end - STATIC_BASE as usize;
        Ok(start as Address)
    }

    /// First address of the movable heap
    pub fn heap_base(&self) -> Address {
        self.heap_base as Address
    }

    /// Blocks waiting on the free-list of `size`
    pub fn free_count(&self, size: usize) -> usize {
        self.free_lists[class_index(size)].len()
    }

    /// Get statistics
    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    fn bump(&mut self, size: usize) -> Result<Address> {
        let start = self.top;
        let end = start + size;
        self.memory.ensure(end)?;
        self.top = end;
        self.stats.fresh_blocks += 1;
        Ok(start as Address)
    }
}

impl BackingAllocator for PoolAllocator {
    fn allocate(&mut self, size: usize) -> Result<Address> {
        debug_assert!(size.is_power_of_two(), "pool sizes must be powers of two");
        debug_assert!(size >= Alignment::BLOCK);

        let block = match self.free_lists[class_index(size)].pop() {
            Some(block) => {
                self.stats.reused_blocks += 1;
                block
            }
            None => self.bump(size)?,
        };

        self.live.insert(block, size);
        self.stats.live_blocks += 1;
        self.stats.allocated_bytes += size;
        self.stats.peak_bytes = self.stats.peak_bytes.max(self.stats.allocated_bytes);
        log::trace!("pool: allocated {} bytes at {:#x}", size, block);

        Ok(block)
    }

    fn free(&mut self, block: Address) -> Result<()> {
        let size = self
            .live
            .remove(&block)
            .ok_or(MemError::InvalidPointer { address: block })?;

        self.free_lists[class_index(size)].push(block);
        self.stats.live_blocks -= 1;
        self.stats.allocated_bytes -= size;
        self.stats.freed_blocks += 1;
        log::trace!("pool: freed {} bytes at {:#x}", size, block);

        Ok(())
    }

    fn block_size(&self, block: Address) -> Option<usize> {
        self.live.get(&block).copied()
    }

    fn is_static(&self, addr: Address) -> bool {
        (addr as usize) < self.heap_base
    }

    fn memory(&self) -> &LinearMemory {
        &self.memory
    }

    fn memory_mut(&mut self) -> &mut LinearMemory {
        &mut self.memory
    }
}
