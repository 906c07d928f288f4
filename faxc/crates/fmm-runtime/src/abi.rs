//! Memory ABI - C FFI surface over one allocator per execution context
//!
//! Every entry point has a safe Rust twin that does the work; the
//! `extern "C"` function only forwards to it. Any error is fatal: the
//! runtime logs a diagnostic and panics, which aborts the process when it
//! reaches the C boundary.

use fmm::logging::{configure_logger, log_event, LoggerConfig, MemEvent};
use fmm::object::MAGIC;
use fmm::{
    make_array, Address, Allocator, ClassId, Handle, MemConfig, NoRoots, Object, Scratch, Tracked,
};
use std::cell::RefCell;
use std::fmt::Display;

/// Collector compiled into this runtime
#[cfg(feature = "recording-collector")]
pub type ActiveCollector = fmm::RecordingCollector;

/// Collector compiled into this runtime
#[cfg(not(feature = "recording-collector"))]
pub type ActiveCollector = fmm::NoCollector;

/// Allocator type behind the ABI
pub type Runtime = Allocator<ActiveCollector>;

thread_local! {
    static RUNTIME: RefCell<Option<Runtime>> = const { RefCell::new(None) };
}

#[cold]
#[track_caller]
fn fatal(op: &str, err: impl Display) -> ! {
    let message = format!("{}: {}", op, err);
    log_event(MemEvent::Fatal {
        message: message.clone(),
    });
    panic!("fatal: {}", message);
}

/// Build this context's allocator from `FMM_*` settings
///
/// The global logger only forwards to `log`; a fatal event is the last
/// thing a context does, so nothing is kept.
fn build_runtime() -> fmm::Result<Runtime> {
    configure_logger(LoggerConfig {
        record: false,
        ..Default::default()
    });
    Runtime::with_config(MemConfig::from_env())
}

fn new_runtime() -> Runtime {
    build_runtime().unwrap_or_else(|e| fatal("init", e))
}

/// Run `f` against this context's allocator, creating it on first use
pub fn with_runtime<T>(f: impl FnOnce(&mut Runtime) -> T) -> T {
    RUNTIME.with(|cell| {
        let mut slot = cell.borrow_mut();
        f(slot.get_or_insert_with(new_runtime))
    })
}

fn run<T>(op: &str, f: impl FnOnce(&mut Runtime) -> fmm::Result<T>) -> T {
    with_runtime(f).unwrap_or_else(|e| fatal(op, e))
}

/// Allocate a scratch object
pub fn alloc(size: u32) -> Address {
    run("__alloc", |rt| rt.allocate(size as usize)).into_raw()
}

/// Resize a scratch or tracked object
pub fn realloc(ptr: Address, size: u32) -> Address {
    run("__realloc", |rt| match rt.adopt(ptr)? {
        Object::Scratch(obj) => rt.reallocate(obj, size as usize).map(Scratch::into_raw),
        Object::Tracked(obj) => rt.reallocate(obj, size as usize).map(|obj| obj.address()),
    })
}

/// Free a scratch object
pub fn free(ptr: Address) {
    run("__free", |rt| rt.discard(Scratch::assume(ptr)))
}

/// Register a scratch object under class `id`
pub fn register(ptr: Address, id: u32) -> Address {
    let class = ClassId::from_raw(id)
        .unwrap_or_else(|| fatal("__register", format!("class id {:#x} is reserved", id)));
    run("__register", |rt| rt.register(Scratch::assume(ptr), class)).address()
}

/// Record that `parent` references `child`
pub fn link(child: Address, parent: Address) {
    run("__link", |rt| {
        rt.link(Tracked::assume(child), Tracked::assume(parent))
    })
}

/// Mark a tracked object directly reachable
pub fn mark(ptr: Address) {
    run("__mark", |rt| rt.mark(Tracked::assume(ptr)))
}

/// Run a collection cycle with an empty root set
pub fn collect() {
    with_runtime(|rt| rt.collect(&mut NoRoots))
}

/// Build an array; `source == 0` means no source
pub fn new_array(capacity: u32, id: u32, align_log2: u32, source: Address) -> Address {
    let class = ClassId::from_raw(id)
        .unwrap_or_else(|| fatal("__new_array", format!("class id {:#x} is reserved", id)));
    let source = (source != 0).then_some(source);

    run("__new_array", |rt| {
        make_array(rt, capacity as usize, class, align_log2, source)
    })
    .address()
}

#[no_mangle]
pub extern "C" fn fmm_init() -> bool {
    RUNTIME.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_some() {
            return true;
        }

        match build_runtime() {
            Ok(runtime) => {
                *slot = Some(runtime);
                true
            }
            Err(e) => {
                log::error!("Failed to create memory runtime: {}", e);
                false
            }
        }
    })
}

#[no_mangle]
pub extern "C" fn fmm_shutdown() {
    RUNTIME.with(|cell| {
        if let Some(runtime) = cell.borrow_mut().take() {
            log::debug!("memory runtime shut down: {:?}", runtime.stats());
        }
    })
}

#[no_mangle]
pub extern "C" fn __alloc(size: u32) -> u32 {
    alloc(size)
}

#[no_mangle]
pub extern "C" fn __realloc(ptr: u32, size: u32) -> u32 {
    realloc(ptr, size)
}

#[no_mangle]
pub extern "C" fn __free(ptr: u32) {
    free(ptr)
}

#[no_mangle]
pub extern "C" fn __register(ptr: u32, id: u32) -> u32 {
    register(ptr, id)
}

#[no_mangle]
pub extern "C" fn __link(child: u32, parent: u32) {
    link(child, parent)
}

#[no_mangle]
pub extern "C" fn __mark(ptr: u32) {
    mark(ptr)
}

#[no_mangle]
pub extern "C" fn __collect() {
    collect()
}

#[no_mangle]
pub extern "C" fn __new_array(capacity: u32, id: u32, align_log2: u32, source: u32) -> u32 {
    new_array(capacity, id, align_log2, source)
}

#[no_mangle]
pub extern "C" fn __header_size() -> u32 {
    Runtime::HEADER_SIZE as u32
}

#[no_mangle]
pub extern "C" fn __magic() -> u32 {
    MAGIC
}

/// Base of linear memory; invalidated whenever memory grows
#[no_mangle]
pub extern "C" fn __memory_base() -> *mut u8 {
    with_runtime(|rt| rt.memory_mut().as_mut_ptr())
}

#[no_mangle]
pub extern "C" fn __memory_size() -> u32 {
    with_runtime(|rt| u32::try_from(rt.memory().size()).unwrap_or(u32::MAX))
}
