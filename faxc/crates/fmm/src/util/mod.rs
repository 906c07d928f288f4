//! Util Module - Shared Utilities
//!
//! Alignment helpers and power-of-two size classing.
//!
//! Every block the allocator requests is a power of two. Two objects share
//! a size class exactly when their blocks are interchangeable, which reduces
//! the in-place reallocation decision to one comparison and lets the pool
//! serve requests from one free-list per class.

pub mod alignment;

pub use alignment::Alignment;

/// Largest block the allocator hands out (2 GiB)
pub const MAX_BLOCK_SIZE: usize = 1 << 31;

/// Number of power-of-two classes up to `MAX_BLOCK_SIZE`
pub const CLASS_COUNT: usize = 32;

/// Smallest power of two ≥ `payload_size + header_size`
///
/// Precondition: `payload_size <= max_payload(header_size)`.
///
/// ```
/// use fmm::util::size_class;
///
/// assert_eq!(size_class(0, 8), 8);
/// assert_eq!(size_class(1, 8), 16);
/// assert_eq!(size_class(48, 16), 64);
/// ```
#[inline]
pub const fn size_class(payload_size: usize, header_size: usize) -> usize {
    (payload_size + header_size).next_power_of_two()
}

/// Largest payload whose size class still fits `MAX_BLOCK_SIZE`
#[inline]
pub const fn max_payload(header_size: usize) -> usize {
    MAX_BLOCK_SIZE - header_size
}

/// Free-list index of a size class (its log2)
#[inline]
pub const fn class_index(class: usize) -> usize {
    class.trailing_zeros() as usize
}
