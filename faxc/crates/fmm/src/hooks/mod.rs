//! Hooks Module - the seam a garbage collector plugs into
//!
//! The allocator never knows which collector is in use. It talks to one
//! through the `Collector` trait, chosen once at build time as a type
//! parameter, so every hook call is monomorphized and the "collector
//! present?" question is the associated const `Collector::PRESENT`.
//!
//! ## Call protocol
//!
//! 1. `register(obj)` once, right after the class id is written
//! 2. `link(child, parent)` whenever a managed reference is stored into a
//!    field of another managed object (both already registered)
//! 3. `mark(obj)` for references reachable directly (roots, pinned handles)
//! 4. `collect(roots)` runs a full cycle synchronously; the collector walks
//!    the root set through `RootSet::iterate_roots`
//!
//! ## Implementations
//!
//! - [`NoCollector`]: no collector compiled in. `register`, `link` and
//!   `mark` are fatal; `collect` warns and returns.
//! - [`RecordingCollector`]: records the protocol and reports reachability
//!   over the recorded graph. It reclaims nothing.

pub mod recording;

pub use recording::{CollectReport, HookCall, RecordingCollector};

use crate::memory::Address;
use crate::object::{Handle, Tracked};

/// Enumeration of the root set, supplied by the embedder
pub trait RootSet {
    /// Call `visit` once per root reference
    fn iterate_roots(&mut self, visit: &mut dyn FnMut(Address));
}

/// Empty root set
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRoots;

impl RootSet for NoRoots {
    fn iterate_roots(&mut self, _visit: &mut dyn FnMut(Address)) {}
}

impl RootSet for Vec<Address> {
    fn iterate_roots(&mut self, visit: &mut dyn FnMut(Address)) {
        for &root in self.iter() {
            visit(root);
        }
    }
}

/// Capability interface a garbage collector implements
pub trait Collector {
    /// Whether this is a real collector; selects the full header layout
    const PRESENT: bool;

    /// Short name for diagnostics
    const NAME: &'static str;

    /// A traceable object now exists
    fn register(&mut self, obj: Tracked);

    /// `parent` now holds a reference to `child`
    fn link(&mut self, child: Tracked, parent: Tracked);

    /// `obj` is directly reachable
    fn mark(&mut self, obj: Tracked);

    /// Run a full collection cycle synchronously
    fn collect(&mut self, roots: &mut dyn RootSet);
}

/// Null collector: no collector is compiled in
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCollector;

impl NoCollector {
    #[cold]
    #[track_caller]
    fn missing_hook(hook: &str, obj: Tracked) -> ! {
        log::error!(
            "collector hook `{}` invoked for {:#x} but no collector is compiled in",
            hook,
            obj.address()
        );
        panic!(
            "fatal: collector hook `{}` is not implemented (no collector compiled in)",
            hook
        );
    }
}

impl Collector for NoCollector {
    const PRESENT: bool = false;
    const NAME: &'static str = "none";

    fn register(&mut self, obj: Tracked) {
        Self::missing_hook("register", obj)
    }

    fn link(&mut self, child: Tracked, _parent: Tracked) {
        Self::missing_hook("link", child)
    }

    fn mark(&mut self, obj: Tracked) {
        Self::missing_hook("mark", obj)
    }

    fn collect(&mut self, _roots: &mut dyn RootSet) {
        log::warn!("collect() requested but no collector is compiled in; skipping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "collector hook `register` is not implemented")]
    fn test_no_collector_register_is_fatal() {
        NoCollector.register(Tracked::assume(16));
    }

    #[test]
    #[should_panic(expected = "collector hook `link` is not implemented")]
    fn test_no_collector_link_is_fatal() {
        NoCollector.link(Tracked::assume(16), Tracked::assume(32));
    }

    #[test]
    #[should_panic(expected = "collector hook `mark` is not implemented")]
    fn test_no_collector_mark_is_fatal() {
        NoCollector.mark(Tracked::assume(16));
    }

    #[test]
    fn test_no_collector_collect_is_noop() {
        let mut roots = vec![16, 32];
        NoCollector.collect(&mut roots);
        assert_eq!(roots, vec![16, 32]);
    }

    #[test]
    fn test_vec_root_set() {
        let mut roots: Vec<Address> = vec![8, 24];
        let mut seen = Vec::new();
        roots.iterate_roots(&mut |root| seen.push(root));
        assert_eq!(seen, vec![8, 24]);

        let mut none = NoRoots;
        none.iterate_roots(&mut |_| panic!("no roots expected"));
    }
}
