//! Reference Handles - typed scratch/tracked references
//!
//! A reference is the address of a payload's first byte. Its ownership
//! depends on the header state:
//!
//! - `Scratch`: allocated, not registered. Exclusively owned by whoever
//!   holds the handle; move-only, consumed by `reallocate`, `discard` and
//!   `register`.
//! - `Tracked`: registered. Owned by the collector, so the handle is a plain
//!   copyable address that any number of fields may hold.
//!
//! Raw addresses arriving across the ABI are turned back into handles with
//! `assume`; the allocator re-checks the header when the handle is used.

use crate::memory::Address;

mod sealed {
    use crate::memory::Address;

    pub trait Sealed {
        fn at(addr: Address) -> Self;
    }
}

pub(crate) use sealed::Sealed;

/// Common view of `Scratch` and `Tracked`
pub trait Handle: Sealed {
    /// Whether the handle refers to a registered object
    const TRACKED: bool;

    /// Payload address
    fn address(&self) -> Address;
}

/// Reference to an unregistered object
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a scratch object leaks unless it is registered or discarded"]
pub struct Scratch(Address);

impl Scratch {
    /// Reclaim a scratch handle from a raw reference
    ///
    /// Used at the ABI boundary, where generated code passes plain
    /// addresses. Checked builds verify the header when the handle is
    /// consumed.
    pub fn assume(addr: Address) -> Self {
        Scratch(addr)
    }

    /// Give up the handle and return the raw reference
    pub fn into_raw(self) -> Address {
        self.0
    }
}

impl Sealed for Scratch {
    fn at(addr: Address) -> Self {
        Scratch(addr)
    }
}

impl Handle for Scratch {
    const TRACKED: bool = false;

    #[inline]
    fn address(&self) -> Address {
        self.0
    }
}

/// Reference to a registered object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tracked(Address);

impl Tracked {
    /// Reclaim a tracked handle from a raw reference
    pub fn assume(addr: Address) -> Self {
        Tracked(addr)
    }
}

impl Sealed for Tracked {
    fn at(addr: Address) -> Self {
        Tracked(addr)
    }
}

impl Handle for Tracked {
    const TRACKED: bool = true;

    #[inline]
    fn address(&self) -> Address {
        self.0
    }
}

/// A raw reference after header inspection
#[derive(Debug, PartialEq, Eq)]
pub enum Object {
    Scratch(Scratch),
    Tracked(Tracked),
}

impl Object {
    /// Payload address
    pub fn address(&self) -> Address {
        match self {
            Object::Scratch(obj) => obj.address(),
            Object::Tracked(obj) => obj.address(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_addresses() {
        let scratch = Scratch::assume(0x1010);
        assert_eq!(scratch.address(), 0x1010);
        assert_eq!(scratch.into_raw(), 0x1010);

        let tracked = Tracked::assume(0x2020);
        let copy = tracked;
        assert_eq!(copy.address(), tracked.address());
    }

    #[test]
    fn test_object_address() {
        assert_eq!(Object::Scratch(Scratch::assume(8)).address(), 8);
        assert_eq!(Object::Tracked(Tracked::assume(16)).address(), 16);
        assert!(!Scratch::TRACKED);
        assert!(Tracked::TRACKED);
    }
}
