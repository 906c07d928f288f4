//! Allocation Tests - headers, size classes, grow and shrink
//!
//! These tests verify the allocate / reallocate / discard paths in both
//! header configurations:
//! - Fresh objects carry a scratch header and a zeroed payload
//! - Growth preserves old bytes and zero-fills the new tail
//! - Discarded blocks are reused without corrupting live objects
//! - Memory exhaustion is reported, never papered over

mod common;

use common::{
    assert_pattern, assert_scratch, assert_zeroed, PlainFixture, RecordingFixture, TEST_CLASS,
};
use fmm::object::header_size;
use fmm::util::{max_payload, size_class};
use fmm::{Handle, MemError, NoCollector};
use quickcheck_macros::quickcheck;

/// ============================================================================
/// HEADER TESTS
/// ============================================================================

/// **Bug this finds:** Header written with wrong size or wrong sentinel
#[test]
fn test_allocate_writes_header_without_collector() {
    let mut fx = PlainFixture::with_defaults();

    for n in [0, 1, 7, 8, 9, 100, 4096] {
        let obj = fx.alloc.allocate(n).unwrap();
        let header = fx.header(&obj);
        assert_scratch(&header, n as u32);
        assert_eq!(header.reserved, None);
        assert_zeroed(&fx.payload(&obj));
        fx.alloc.discard(obj).unwrap();
    }
}

/// **Bug this finds:** Collector words left dirty from a previous block
#[test]
fn test_allocate_writes_header_with_collector() {
    let mut fx = RecordingFixture::with_defaults();

    let obj = fx.alloc.allocate(48).unwrap();
    fx.fill_pattern(&obj, 0xC0);
    fx.alloc.discard(obj).unwrap();

    let obj = fx.alloc.allocate(48).unwrap();
    let header = fx.header(&obj);
    assert_scratch(&header, 48);
    assert_eq!(header.reserved, Some([0, 0]));
    assert_zeroed(&fx.payload(&obj));
}

/// **Bug this finds:** Reference not offset from block by the header size
#[test]
fn test_references_are_block_aligned() {
    let mut fx = RecordingFixture::with_defaults();

    for n in [1, 2, 3, 31, 33] {
        let obj = fx.alloc.allocate(n).unwrap();
        assert_eq!(obj.address() as usize % 8, 0);
        let _ = fx.alloc.register(obj, TEST_CLASS).unwrap();
    }
}

/// **Invariant verified:** size classes are tight powers of two
#[quickcheck]
fn prop_size_class_is_tight(payload: u32, gc: bool) -> bool {
    let header = header_size(gc);
    let payload = payload as usize % (max_payload(header) + 1);
    let class = size_class(payload, header);

    class.is_power_of_two() && class >= payload + header && class < 2 * (payload + header)
}

#[test]
fn test_size_class_edges() {
    for gc in [false, true] {
        let header = header_size(gc);
        assert_eq!(size_class(0, header), header);
        assert_eq!(size_class(max_payload(header), header), 1 << 31);
        assert_eq!(size_class(1, header), 2 * header);
    }
}

/// ============================================================================
/// REALLOCATE TESTS
/// ============================================================================

/// **Bug this finds:** Old bytes lost on move, garbage in the grown tail
#[quickcheck]
fn prop_grow_round_trip(n: u16, extra: u16) -> bool {
    let mut fx = PlainFixture::with_defaults();
    let n = (n % 2048) as usize;
    let n2 = n + 1 + (extra % 2048) as usize;

    let obj = fx.alloc.allocate(n).unwrap();
    fx.fill_pattern(&obj, 3);
    let obj = fx.alloc.reallocate(obj, n2).unwrap();

    let bytes = fx.payload(&obj);
    let head_ok = bytes[..n]
        .iter()
        .enumerate()
        .all(|(i, &b)| b == 3u8.wrapping_add(i as u8));
    let tail_ok = bytes[n..].iter().all(|&b| b == 0);

    head_ok && tail_ok && fx.header(&obj).payload_size as usize == n2
}

/// **Bug this finds:** In-place resize clobbering live bytes
#[test]
fn test_shrink_then_regrow_within_class() {
    let mut fx = PlainFixture::with_defaults();
    // 56 + 8 byte header fills a 64-byte block exactly
    let obj = fx.alloc.allocate(56).unwrap();
    let addr = obj.address();

    let obj = fx.alloc.reallocate(obj, 30).unwrap();
    fx.fill_pattern(&obj, 0x40);
    let obj = fx.alloc.reallocate(obj, 50).unwrap();

    assert_eq!(obj.address(), addr, "resize within the class must not move");
    let bytes = fx.payload(&obj);
    assert_pattern(&bytes[..30], 0x40);
    assert_eq!(fx.header(&obj).payload_size, 50);
}

/// **Bug this finds:** Growth inside the class re-exposing stale bytes
#[test]
fn test_regrow_zeroes_previously_hidden_bytes() {
    let mut fx = PlainFixture::with_defaults();
    let obj = fx.alloc.allocate(24).unwrap();
    fx.fill_pattern(&obj, 0x10);

    let addr = obj.address();

    let obj = fx.alloc.reallocate(obj, 20).unwrap();
    let obj = fx.alloc.reallocate(obj, 24).unwrap();

    assert_eq!(obj.address(), addr);
    let bytes = fx.payload(&obj);
    assert_pattern(&bytes[..20], 0x10);
    assert_zeroed(&bytes[20..]);
}

/// **Bug this finds:** Shrink across classes losing the retained prefix
#[test]
fn test_shrink_across_classes_moves() {
    let mut fx = PlainFixture::with_defaults();
    let obj = fx.alloc.allocate(1000).unwrap();
    fx.fill_pattern(&obj, 1);
    let addr = obj.address();

    let obj = fx.alloc.reallocate(obj, 10).unwrap();
    assert_ne!(obj.address(), addr);
    assert_pattern(&fx.payload(&obj), 1);
    assert_scratch(&fx.header(&obj), 10);
}

/// ============================================================================
/// DISCARD TESTS
/// ============================================================================

/// **Bug this finds:** Freed block handed out twice, neighbours overwritten
#[test]
fn test_discard_does_not_corrupt_later_allocations() {
    let mut fx = PlainFixture::with_defaults();
    let keep = fx.alloc.allocate(24).unwrap();
    fx.fill_pattern(&keep, 0x77);

    let victims: Vec<_> = (0..16).map(|_| fx.alloc.allocate(24).unwrap()).collect();
    for victim in victims {
        fx.alloc.discard(victim).unwrap();
    }

    let fresh: Vec<_> = (0..16).map(|_| fx.alloc.allocate(24).unwrap()).collect();
    for obj in &fresh {
        fx.fill_pattern(obj, 0x11);
        assert_ne!(obj.address(), keep.address());
    }

    assert_pattern(&fx.payload(&keep), 0x77);
    assert_scratch(&fx.header(&keep), 24);
    assert_eq!(fx.alloc.backing().stats().reused_blocks, 16);
}

/// ============================================================================
/// EXHAUSTION TESTS
/// ============================================================================

/// **Bug this finds:** OOM swallowed or reported with the wrong numbers
#[test]
fn test_out_of_memory_is_reported() {
    let mut fx = PlainFixture::with_pages(1, 2);

    let big = fx.alloc.allocate(64 * 1024 - 8).unwrap();
    assert_eq!(fx.alloc.memory().pages(), 2);

    match fx.alloc.allocate(64 * 1024 - 8) {
        Err(MemError::OutOfMemory { requested, .. }) => assert!(requested > 0),
        other => panic!("expected OutOfMemory, got {:?}", other),
    }

    // the failed request leaves live objects alone
    assert_scratch(&fx.header(&big), 64 * 1024 - 8);
}

#[test]
fn test_payload_too_large() {
    let mut fx = PlainFixture::with_defaults();
    let max = max_payload(header_size(false));

    let obj = fx.alloc.allocate(4).unwrap();
    assert!(matches!(
        fx.alloc.reallocate(obj, max + 1),
        Err(MemError::PayloadTooLarge { max: m, .. }) if m == max
    ));
    assert_eq!(fmm::Allocator::<NoCollector>::HEADER_SIZE, header_size(false));
}
