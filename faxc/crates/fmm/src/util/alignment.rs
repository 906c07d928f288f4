//! Alignment Utilities
//!
//! Helper functions for memory alignment.

/// Alignment - utility for alignment operations
pub struct Alignment;

impl Alignment {
    /// Align value up to boundary
    ///
    /// # Examples
    /// ```
    /// use fmm::util::Alignment;
    ///
    /// assert_eq!(Alignment::align_up(100, 8), 104);
    /// assert_eq!(Alignment::align_up(64, 8), 64);
    /// ```
    #[inline]
    pub const fn align_up(value: usize, alignment: usize) -> usize {
        (value + alignment - 1) & !(alignment - 1)
    }

    /// Check if value is aligned
    #[inline]
    pub const fn is_aligned(value: usize, alignment: usize) -> bool {
        value & (alignment - 1) == 0
    }

    /// Alignment of every block and header (8 bytes)
    pub const BLOCK: usize = 8;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(Alignment::align_up(0, 8), 0);
        assert_eq!(Alignment::align_up(1, 8), 8);
        assert_eq!(Alignment::align_up(9, 16), 16);
        assert!(Alignment::is_aligned(Alignment::align_up(13, Alignment::BLOCK), Alignment::BLOCK));
    }
}
