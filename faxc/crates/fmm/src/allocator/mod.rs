//! Allocator Module - Managed Object Allocation
//!
//! The allocation manager sits between generated code and the backing
//! byte allocator. It owns the object header and drives every object
//! through its lifecycle:
//!
//! ```text
//!              allocate               register
//! UNALLOCATED ──────────► SCRATCH ──────────────► TRACKED
//!                          │   ▲                    │  ▲
//!                  discard │   │ reallocate         │  │ reallocate
//!                          ▼   └────                └──┘ (re-registered
//!                        FREED                           when moved)
//! ```
//!
//! A scratch object belongs to the allocator and can be freed at any time.
//! A tracked object belongs to the collector; the allocator never frees it.
//!
//! ## Size Classes
//!
//! Every block is the smallest power of two holding `payload + header`.
//! `reallocate` stays in place while the new size maps to the same class
//! and moves otherwise.

pub mod pool;

pub use pool::{BackingAllocator, PoolAllocator, PoolStats, STATIC_BASE};

use crate::config::MemConfig;
use crate::ensure;
use crate::error::{MemError, Result};
use crate::hooks::{Collector, NoCollector, RootSet};
use crate::logging::{EventLogger, LogLevel, LoggerConfig, MemEvent};
use crate::memory::{Address, LinearMemory};
use crate::object::handle::Sealed;
use crate::object::header::{
    block_of, header_size, object_of, write_class_id, write_payload_size, write_scratch,
};
use crate::object::{ClassId, Handle, Header, Object, ObjectState, Scratch, Tracked};
use crate::util::{max_payload, size_class};
#[cfg(feature = "checked")]
use std::panic::Location;

/// Allocation manager statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorStats {
    /// Successful `allocate` calls
    pub allocations: usize,
    /// `reallocate` calls served in place
    pub resized_in_place: usize,
    /// `reallocate` calls that moved the object
    pub moved: usize,
    /// Scratch objects discarded
    pub discarded: usize,
    /// Objects registered (re-registrations after a move included)
    pub registered: usize,
    /// Static literal objects placed
    pub static_objects: usize,
    /// `collect` requests
    pub collections: usize,
}

/// Allocation manager
///
/// Generic over the collector compiled in (`C`) and the byte allocator
/// underneath (`B`). The header size is a constant of `C`.
///
/// ```rust
/// use fmm::{Allocator, ClassId, NoCollector};
///
/// let mut alloc: Allocator<NoCollector> = Allocator::new().unwrap();
/// let obj = alloc.allocate(12).unwrap();
/// alloc.payload_mut(&obj).unwrap()[0] = 7;
///
/// let obj = alloc.register(obj, ClassId::new(20)).unwrap();
/// assert_eq!(alloc.payload(&obj).unwrap()[0], 7);
/// ```
pub struct Allocator<C: Collector = NoCollector, B: BackingAllocator = PoolAllocator> {
    backing: B,
    collector: C,
    config: MemConfig,
    stats: AllocatorStats,
    events: EventLogger,
}

impl<C: Collector + Default> Allocator<C, PoolAllocator> {
    /// Create an allocator over a default-configured pool
    pub fn new() -> Result<Self> {
        Self::with_config(MemConfig::default())
    }

    /// Create an allocator over a pool built from `config`
    pub fn with_config(config: MemConfig) -> Result<Self> {
        let pool = PoolAllocator::new(&config)?;
        Ok(Self::from_parts(pool, C::default(), config))
    }
}

impl<C: Collector> Allocator<C, PoolAllocator> {
    /// Place a static literal object holding `bytes`
    ///
    /// Static objects live below the heap, are born tracked under `class`,
    /// and are never freed. They are not registered with the collector.
    pub fn place_static(&mut self, class: ClassId, bytes: &[u8]) -> Result<Tracked> {
        let max = max_payload(Self::HEADER_SIZE);
        ensure!(
            bytes.len() <= max,
            MemError::PayloadTooLarge {
                size: bytes.len(),
                max,
            }
        );

        let block = self
            .backing
            .allocate_static(Self::HEADER_SIZE + bytes.len())?;
        let obj = object_of(block, C::PRESENT);
        let memory = self.backing.memory_mut();
        write_scratch(memory, block, bytes.len() as u32, C::PRESENT)?;
        memory.slice_mut(obj, bytes.len())?.copy_from_slice(bytes);
        write_class_id(memory, obj, class.get(), C::PRESENT)?;

        self.stats.static_objects += 1;
        self.record(|| MemEvent::Static {
            address: obj,
            class_id: class.get(),
        });
        Ok(Tracked::at(obj))
    }
}

impl<C: Collector, B: BackingAllocator> Allocator<C, B> {
    /// Header size baked into every reference
    pub const HEADER_SIZE: usize = header_size(C::PRESENT);

    /// Assemble an allocator from its parts
    pub fn from_parts(backing: B, collector: C, config: MemConfig) -> Self {
        let events = EventLogger::new(LoggerConfig {
            level: LogLevel::Trace,
            console: config.verbose,
            record: config.trace_events,
            json: false,
            timestamps: true,
        });
        if !config.trace_events && !config.verbose {
            events.disable();
        }

        log::debug!(
            "allocator ready: collector={}, header={} bytes",
            C::NAME,
            Self::HEADER_SIZE
        );

        Self {
            backing,
            collector,
            config,
            stats: AllocatorStats::default(),
            events,
        }
    }

    /// Allocate a scratch object with a zeroed payload of `payload_size` bytes
    ///
    /// # Errors
    ///
    /// - `PayloadTooLarge` if the block would exceed the largest size class
    /// - `OutOfMemory` if the backing allocator cannot grow
    pub fn allocate(&mut self, payload_size: usize) -> Result<Scratch> {
        let max = max_payload(Self::HEADER_SIZE);
        ensure!(
            payload_size <= max,
            MemError::PayloadTooLarge {
                size: payload_size,
                max,
            }
        );

        let class = size_class(payload_size, Self::HEADER_SIZE);
        let block = self.allocate_block(class)?;
        let obj = object_of(block, C::PRESENT);

        write_scratch(
            self.backing.memory_mut(),
            block,
            payload_size as u32,
            C::PRESENT,
        )?;
        self.backing.fill(obj, 0, payload_size)?;

        self.stats.allocations += 1;
        self.record(|| MemEvent::Allocate {
            address: obj,
            payload_size,
            size_class: class,
        });
        Ok(Scratch::at(obj))
    }

    /// Resize an object to `new_size` payload bytes
    ///
    /// Consumes the handle and returns the (possibly moved) object. The
    /// first `min(old, new)` payload bytes are preserved and growth is
    /// zero-filled.
    ///
    /// When the object moves, a scratch object's old block is freed right
    /// away; a tracked object is re-created under the same class id and
    /// registered again, and its old block is left to the collector.
    /// Static objects always move and are never freed.
    #[track_caller]
    pub fn reallocate<R: Handle>(&mut self, obj: R, new_size: usize) -> Result<R> {
        let addr = obj.address();
        let header = self.inspect("reallocate", addr, R::TRACKED)?;

        let max = max_payload(Self::HEADER_SIZE);
        ensure!(
            new_size <= max,
            MemError::PayloadTooLarge {
                size: new_size,
                max,
            }
        );

        let old_size = header.payload_size as usize;
        let new_class = size_class(new_size, Self::HEADER_SIZE);
        let block = block_of(addr, C::PRESENT);
        let is_static = self.backing.is_static(addr);

        if !is_static && self.backing.block_size(block) == Some(new_class) {
            write_payload_size(self.backing.memory_mut(), addr, new_size as u32, C::PRESENT)?;
            if new_size > old_size {
                self.backing
                    .fill(addr + old_size as Address, 0, new_size - old_size)?;
            }

            self.stats.resized_in_place += 1;
            self.record(|| MemEvent::Reallocate {
                old_address: addr,
                new_address: addr,
                old_size,
                new_size,
            });
            return Ok(obj);
        }

        let new_block = self.allocate_block(new_class)?;
        let new_obj = object_of(new_block, C::PRESENT);
        write_scratch(
            self.backing.memory_mut(),
            new_block,
            new_size as u32,
            C::PRESENT,
        )?;
        self.backing.copy(new_obj, addr, old_size.min(new_size))?;
        if new_size > old_size {
            self.backing
                .fill(new_obj + old_size as Address, 0, new_size - old_size)?;
        }

        if R::TRACKED {
            write_class_id(
                self.backing.memory_mut(),
                new_obj,
                header.class_id,
                C::PRESENT,
            )?;
            if C::PRESENT {
                self.collector.register(Tracked::at(new_obj));
                self.stats.registered += 1;
            }
        } else if !is_static {
            self.backing.free(block)?;
        }

        self.stats.moved += 1;
        self.record(|| MemEvent::Reallocate {
            old_address: addr,
            new_address: new_obj,
            old_size,
            new_size,
        });
        Ok(R::at(new_obj))
    }

    /// Free a scratch object
    ///
    /// # Errors
    ///
    /// - `StaticObject` for a static literal
    /// - `ProtocolViolation` if the object was registered (checked builds)
    /// - `InvalidPointer` if the block is not live (double discard)
    #[track_caller]
    pub fn discard(&mut self, obj: Scratch) -> Result<()> {
        let addr = obj.into_raw();
        ensure!(
            !self.backing.is_static(addr),
            MemError::StaticObject {
                address: addr,
                operation: "discarded",
            }
        );

        let header = self.inspect("discard", addr, false)?;
        self.backing.free(block_of(addr, C::PRESENT))?;

        self.stats.discarded += 1;
        self.record(|| MemEvent::Discard {
            address: addr,
            payload_size: header.payload_size as usize,
        });
        Ok(())
    }

    /// Hand a scratch object to the collector under `class`
    ///
    /// Writes the class id, then calls the collector's register hook when
    /// a collector is compiled in. Registration is one-way.
    #[track_caller]
    pub fn register(&mut self, obj: Scratch, class: ClassId) -> Result<Tracked> {
        let addr = obj.into_raw();
        self.inspect("register", addr, false)?;
        write_class_id(self.backing.memory_mut(), addr, class.get(), C::PRESENT)?;

        let tracked = Tracked::at(addr);
        if C::PRESENT {
            self.collector.register(tracked);
        }

        self.stats.registered += 1;
        self.record(|| MemEvent::Register {
            address: addr,
            class_id: class.get(),
        });
        Ok(tracked)
    }

    /// Declare that `parent` holds a reference to `child`
    #[track_caller]
    pub fn link(&mut self, child: Tracked, parent: Tracked) -> Result<()> {
        self.inspect("link", child.address(), true)?;
        self.inspect("link", parent.address(), true)?;
        self.collector.link(child, parent);
        Ok(())
    }

    /// Declare `obj` directly reachable
    #[track_caller]
    pub fn mark(&mut self, obj: Tracked) -> Result<()> {
        self.inspect("mark", obj.address(), true)?;
        self.collector.mark(obj);
        Ok(())
    }

    /// Run a full collection cycle over `roots`
    pub fn collect(&mut self, roots: &mut dyn RootSet) {
        self.stats.collections += 1;
        self.record(|| MemEvent::Collect {
            collector: C::NAME.to_string(),
        });
        self.collector.collect(roots);
    }

    /// Turn a raw reference back into a typed handle
    ///
    /// The address must be the payload of a live block or of a static
    /// literal; the header decides which handle comes back.
    pub fn adopt(&self, addr: Address) -> Result<Object> {
        self.locate(addr)?;
        let header = Header::read(self.backing.memory(), addr, C::PRESENT)?;

        match header.state() {
            ObjectState::Scratch => Ok(Object::Scratch(Scratch::at(addr))),
            ObjectState::Tracked(_) => Ok(Object::Tracked(Tracked::at(addr))),
            ObjectState::Invalid(_) => Err(MemError::InvalidPointer { address: addr }),
        }
    }

    /// Decoded header of `obj`
    pub fn header<R: Handle>(&self, obj: &R) -> Result<Header> {
        Header::read(self.backing.memory(), obj.address(), C::PRESENT)
    }

    /// Payload bytes of `obj`
    pub fn payload<R: Handle>(&self, obj: &R) -> Result<&[u8]> {
        let header = self.header(obj)?;
        self.backing
            .memory()
            .slice(obj.address(), header.payload_size as usize)
    }

    /// Payload bytes of `obj`, mutably
    pub fn payload_mut<R: Handle>(&mut self, obj: &R) -> Result<&mut [u8]> {
        let header = self.header(obj)?;
        self.backing
            .memory_mut()
            .slice_mut(obj.address(), header.payload_size as usize)
    }

    /// Get statistics
    pub fn stats(&self) -> AllocatorStats {
        self.stats
    }

    /// Configuration this allocator was built with
    pub fn config(&self) -> &MemConfig {
        &self.config
    }

    /// Recorded allocation events (enabled by `trace_events`)
    pub fn events(&self) -> &EventLogger {
        &self.events
    }

    pub fn memory(&self) -> &LinearMemory {
        self.backing.memory()
    }

    pub fn memory_mut(&mut self) -> &mut LinearMemory {
        self.backing.memory_mut()
    }

    pub fn backing(&self) -> &B {
        &self.backing
    }

    pub fn collector(&self) -> &C {
        &self.collector
    }

    pub fn collector_mut(&mut self) -> &mut C {
        &mut self.collector
    }

    fn allocate_block(&mut self, size: usize) -> Result<Address> {
        self.backing.allocate(size).inspect_err(|err| {
            if let MemError::OutOfMemory { available, .. } = err {
                self.events.log(MemEvent::AllocationFailure {
                    size,
                    available: *available,
                });
            }
        })
    }

    /// Reject addresses that are neither static nor a live block's payload
    fn locate(&self, addr: Address) -> Result<()> {
        if self.backing.is_static(addr) {
            return Ok(());
        }

        addr.checked_sub(Self::HEADER_SIZE as Address)
            .and_then(|block| self.backing.block_size(block))
            .map(|_| ())
            .ok_or(MemError::InvalidPointer { address: addr })
    }

    /// Read the header of `addr`, checking its state in checked builds
    #[track_caller]
    fn inspect(&self, operation: &'static str, addr: Address, tracked: bool) -> Result<Header> {
        self.locate(addr)?;
        let header = Header::read(self.backing.memory(), addr, C::PRESENT)?;

        #[cfg(feature = "checked")]
        {
            let actual = header.state();
            let ok = match actual {
                ObjectState::Scratch => !tracked,
                ObjectState::Tracked(_) => tracked,
                ObjectState::Invalid(_) => false,
            };

            if !ok {
                let expected = if tracked { "tracked" } else { "scratch" };
                let err = MemError::ProtocolViolation {
                    operation,
                    address: addr,
                    expected,
                    actual,
                    location: Location::caller(),
                };
                log::error!("{}", err);
                self.events.log(MemEvent::ProtocolViolation {
                    operation: operation.to_string(),
                    address: addr,
                    detail: format!("expected {}, found {}", expected, actual),
                });
                return Err(err);
            }
        }

        #[cfg(not(feature = "checked"))]
        let _ = (operation, tracked);

        Ok(header)
    }

    fn record(&self, event: impl FnOnce() -> MemEvent) {
        if self.events.is_enabled() {
            self.events.log(event());
        }
    }
}
