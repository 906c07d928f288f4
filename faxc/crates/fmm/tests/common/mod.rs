//! Test Utilities for the FMM Test Suite
//!
//! Fixtures and strict assertion helpers shared by the integration tests.
//! Every helper checks the raw header bytes, not just the decoded view.

#![allow(dead_code)]

use fmm::object::{Header, ObjectState, MAGIC};
use fmm::{Allocator, Collector, Handle, MemConfig, NoCollector, RecordingCollector};

/// Class id used for plain test objects
pub const TEST_CLASS: fmm::ClassId = fmm::ClassId::new(40);

/// Class id used for test arrays of 32-bit integers
pub const INT32_ARRAY: fmm::ClassId = fmm::ClassId::new(41);

/// ============================================================================
/// MEMORY FIXTURE
/// ============================================================================

/// Test fixture owning one allocator
pub struct MemFixture<C: Collector> {
    pub alloc: Allocator<C>,
    pub config: MemConfig,
}

impl<C: Collector + Default> MemFixture<C> {
    /// Create fixture with default configuration
    ///
    /// **Bug this finds:** Configuration validation bugs, initialization failures
    pub fn with_defaults() -> Self {
        Self::with_config(MemConfig::default())
    }

    /// Create fixture with a hard page limit
    ///
    /// **Bug this finds:** Growth accounting bugs, OOM reporting
    pub fn with_pages(initial_pages: u32, max_pages: u32) -> Self {
        Self::with_config(MemConfig {
            initial_pages,
            max_pages,
            ..Default::default()
        })
    }

    pub fn with_config(config: MemConfig) -> Self {
        let alloc = Allocator::with_config(config.clone())
            .expect("allocator initialization should succeed with valid config");
        Self { alloc, config }
    }

    /// Header of `obj`, read straight from memory
    pub fn header<R: Handle>(&self, obj: &R) -> Header {
        self.alloc
            .header(obj)
            .unwrap_or_else(|e| panic!("header of {:#x} unreadable: {}", obj.address(), e))
    }

    /// Write a recognizable byte pattern over the whole payload
    pub fn fill_pattern<R: Handle>(&mut self, obj: &R, seed: u8) {
        let payload = self.alloc.payload_mut(obj).expect("payload");
        for (i, byte) in payload.iter_mut().enumerate() {
            *byte = seed.wrapping_add(i as u8);
        }
    }

    /// Payload bytes copied out
    pub fn payload<R: Handle>(&self, obj: &R) -> Vec<u8> {
        self.alloc.payload(obj).expect("payload").to_vec()
    }
}

pub type PlainFixture = MemFixture<NoCollector>;
pub type RecordingFixture = MemFixture<RecordingCollector>;

/// ============================================================================
/// ASSERTION HELPERS
/// ============================================================================

/// Assert header is scratch with the given payload size
///
/// **Bug this finds:** Header not initialized, stale class id on reuse
#[track_caller]
pub fn assert_scratch(header: &Header, payload_size: u32) {
    assert_eq!(
        header.class_id, MAGIC,
        "class id is {:#x}, expected MAGIC",
        header.class_id
    );
    assert_eq!(header.state(), ObjectState::Scratch);
    assert_eq!(header.payload_size, payload_size, "payload size mismatch");
}

/// Assert header is tracked under `class`
#[track_caller]
pub fn assert_tracked(header: &Header, class: fmm::ClassId) {
    assert_eq!(
        header.state(),
        ObjectState::Tracked(class),
        "object not tracked under {}",
        class
    );
}

/// Assert bytes follow the pattern written by `fill_pattern`
#[track_caller]
pub fn assert_pattern(bytes: &[u8], seed: u8) {
    for (i, &byte) in bytes.iter().enumerate() {
        assert_eq!(
            byte,
            seed.wrapping_add(i as u8),
            "pattern broken at byte {}",
            i
        );
    }
}

/// Assert every byte is zero
#[track_caller]
pub fn assert_zeroed(bytes: &[u8]) {
    if let Some(pos) = bytes.iter().position(|&b| b != 0) {
        panic!("byte {} is {:#x}, expected zero", pos, bytes[pos]);
    }
}
