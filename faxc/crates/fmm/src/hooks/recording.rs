//! Recording Collector
//!
//! A collector implementation that keeps the trace graph it is told about
//! instead of managing memory. Every hook call is appended to a log in
//! order, registrations and edges are indexed, and `collect` computes which
//! registered objects are reachable from the roots and marks.
//!
//! Protocol misuse (a link or mark naming an object that was never
//! registered) is counted rather than fatal, so a caller can inspect it.

use super::{Collector, RootSet};
use crate::memory::Address;
use crate::object::{Handle, Tracked};
use indexmap::{IndexMap, IndexSet};

/// One recorded hook call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookCall {
    Register(Address),
    Link { child: Address, parent: Address },
    Mark(Address),
    Collect,
}

/// Outcome of one `collect` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectReport {
    /// Cycle number, starting at 1
    pub cycle: u64,
    /// Objects registered so far
    pub registered: usize,
    /// Registered objects reachable from roots and marks
    pub reachable: usize,
    /// Registered objects nothing reaches, in registration order
    pub unreachable: Vec<Address>,
}

/// Collector that records the hook protocol
#[derive(Debug, Default)]
pub struct RecordingCollector {
    calls: Vec<HookCall>,
    registered: IndexSet<Address>,
    /// parent -> children
    edges: IndexMap<Address, Vec<Address>>,
    marked: IndexSet<Address>,
    violations: usize,
    last_report: Option<CollectReport>,
}

impl RecordingCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every hook call, in order
    pub fn calls(&self) -> &[HookCall] {
        &self.calls
    }

    /// Whether `addr` has been registered
    pub fn is_registered(&self, addr: Address) -> bool {
        self.registered.contains(&addr)
    }

    /// Children linked under `parent`
    pub fn children(&self, parent: Address) -> &[Address] {
        self.edges.get(&parent).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of link/mark/register calls that broke the ordering rules
    pub fn violations(&self) -> usize {
        self.violations
    }

    /// Report of the most recent `collect`
    pub fn last_report(&self) -> Option<&CollectReport> {
        self.last_report.as_ref()
    }

    /// Forget recorded calls, keeping the graph
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    fn check_registered(&mut self, hook: &str, addr: Address) {
        if !self.registered.contains(&addr) {
            log::warn!("{} names unregistered object {:#x}", hook, addr);
            self.violations += 1;
        }
    }

    fn trace(&self, roots: &mut dyn RootSet) -> IndexSet<Address> {
        let mut live = IndexSet::new();
        let mut stack: Vec<Address> = self.marked.iter().copied().collect();
        roots.iterate_roots(&mut |root| stack.push(root));

        while let Some(addr) = stack.pop() {
            if !self.registered.contains(&addr) || !live.insert(addr) {
                continue;
            }
            stack.extend(self.children(addr).iter().copied());
        }

        live
    }
}

impl Collector for RecordingCollector {
    const PRESENT: bool = true;
    const NAME: &'static str = "recording";

    fn register(&mut self, obj: Tracked) {
        let addr = obj.address();
        self.calls.push(HookCall::Register(addr));
        if !self.registered.insert(addr) {
            log::warn!("object {:#x} registered twice", addr);
            self.violations += 1;
        }
    }

    fn link(&mut self, child: Tracked, parent: Tracked) {
        let (child, parent) = (child.address(), parent.address());
        self.calls.push(HookCall::Link { child, parent });
        self.check_registered("link(child)", child);
        self.check_registered("link(parent)", parent);
        self.edges.entry(parent).or_default().push(child);
    }

    fn mark(&mut self, obj: Tracked) {
        let addr = obj.address();
        self.calls.push(HookCall::Mark(addr));
        self.check_registered("mark", addr);
        self.marked.insert(addr);
    }

    fn collect(&mut self, roots: &mut dyn RootSet) {
        self.calls.push(HookCall::Collect);
        let live = self.trace(roots);

        let unreachable: Vec<Address> = self
            .registered
            .iter()
            .copied()
            .filter(|addr| !live.contains(addr))
            .collect();

        let report = CollectReport {
            cycle: self.last_report.as_ref().map_or(1, |r| r.cycle + 1),
            registered: self.registered.len(),
            reachable: live.len(),
            unreachable,
        };

        log::info!(
            "[GC] Cycle {} traced: {} reachable, {} unreachable of {} registered",
            report.cycle,
            report.reachable,
            report.unreachable.len(),
            report.registered
        );
        self.last_report = Some(report);
    }
}
