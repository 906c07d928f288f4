//! Memory Module - Linear memory backing store
//!
//! A single growable, byte-addressed memory. Every reference the allocator
//! hands out is a `u32` offset into it; there are no native pointers.
//!
//! ```text
//! 0        STATIC_BASE      heap_base                       size()
//! ┌────────┬────────────────┬──────────────────────────────────┐
//! │ null   │ static region  │ movable heap (pool blocks)  ...  │
//! └────────┴────────────────┴──────────────────────────────────┘
//! ```
//!
//! Memory grows in 64 KiB pages. Freshly grown pages are zeroed.
//!
//! # Example
//!
//! ```rust
//! use fmm::memory::LinearMemory;
//!
//! let mut memory = LinearMemory::new(1, 4);
//! memory.store_u32(64, 0xDEAD_BEEF).unwrap();
//! memory.copy(128, 64, 4).unwrap();
//! assert_eq!(memory.load_u32(128).unwrap(), 0xDEAD_BEEF);
//! ```

use crate::error::{MemError, Result};
use std::ops::Range;

/// Byte offset into linear memory
pub type Address = u32;

/// Size of one memory page (64 KiB)
pub const PAGE_SIZE: usize = 64 * 1024;

/// Largest page count a 32-bit address space can hold
pub const MAX_PAGES: u32 = 65536;

/// Growable linear memory
pub struct LinearMemory {
    bytes: Vec<u8>,
    max_pages: u32,
}

impl LinearMemory {
    /// Create memory with `initial_pages` committed, growable to `max_pages`
    pub fn new(initial_pages: u32, max_pages: u32) -> Self {
        let max_pages = max_pages.min(MAX_PAGES);
        let initial_pages = initial_pages.min(max_pages);

        Self {
            bytes: vec![0; initial_pages as usize * PAGE_SIZE],
            max_pages,
        }
    }

    /// Current size in bytes
    #[inline]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Current size in pages
    #[inline]
    pub fn pages(&self) -> u32 {
        (self.bytes.len() / PAGE_SIZE) as u32
    }

    /// Page limit
    #[inline]
    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    /// Grow memory by `delta` pages
    ///
    /// Returns the previous page count, or `None` if the limit would be
    /// exceeded (memory is left unchanged).
    pub fn grow(&mut self, delta: u32) -> Option<u32> {
        let previous = self.pages();
        let target = previous.checked_add(delta)?;
        if target > self.max_pages {
            return None;
        }

        self.bytes.resize(target as usize * PAGE_SIZE, 0);
        Some(previous)
    }

    /// Ensure at least `end` bytes are addressable, growing if needed
    pub fn ensure(&mut self, end: usize) -> Result<()> {
        if end <= self.size() {
            return Ok(());
        }

        let missing = end - self.size();
        let delta = missing.div_ceil(PAGE_SIZE);
        let available = (self.max_pages - self.pages()) as usize * PAGE_SIZE;

        u32::try_from(delta)
            .ok()
            .and_then(|delta| self.grow(delta))
            .map(|_| ())
            .ok_or(MemError::OutOfMemory {
                requested: missing,
                available,
            })
    }

    /// Load a little-endian `u32`
    #[inline]
    pub fn load_u32(&self, addr: Address) -> Result<u32> {
        let range = self.range(addr, 4)?;
        let mut word = [0u8; 4];
        word.copy_from_slice(&self.bytes[range]);
        Ok(u32::from_le_bytes(word))
    }

    /// Store a little-endian `u32`
    #[inline]
    pub fn store_u32(&mut self, addr: Address, value: u32) -> Result<()> {
        let range = self.range(addr, 4)?;
        self.bytes[range].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Copy `len` bytes from `src` to `dst` (regions may overlap)
    pub fn copy(&mut self, dst: Address, src: Address, len: usize) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        let src = self.range(src, len)?;
        let dst = self.range(dst, len)?;
        self.bytes.copy_within(src, dst.start);
        Ok(())
    }

    /// Fill `len` bytes at `dst` with `byte`
    pub fn fill(&mut self, dst: Address, byte: u8, len: usize) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        let range = self.range(dst, len)?;
        self.bytes[range].fill(byte);
        Ok(())
    }

    /// Borrow `len` bytes at `addr`
    pub fn slice(&self, addr: Address, len: usize) -> Result<&[u8]> {
        let range = self.range(addr, len)?;
        Ok(&self.bytes[range])
    }

    /// Mutably borrow `len` bytes at `addr`
    pub fn slice_mut(&mut self, addr: Address, len: usize) -> Result<&mut [u8]> {
        let range = self.range(addr, len)?;
        Ok(&mut self.bytes[range])
    }

    /// Raw base pointer, for hosts that access memory directly
    ///
    /// Invalidated by `grow`.
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.bytes.as_mut_ptr()
    }

    fn range(&self, addr: Address, len: usize) -> Result<Range<usize>> {
        let start = addr as usize;
        match start.checked_add(len) {
            Some(end) if end <= self.bytes.len() => Ok(start..end),
            _ => Err(MemError::InvalidPointer { address: addr }),
        }
    }
}
