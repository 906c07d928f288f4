//! Allocation Logging and Tracing
//!
//! Structured event log for allocator operations, useful for:
//! - Debugging generated code that misuses the protocol
//! - Replaying the allocation traffic of a run
//! - Production monitoring (JSON output)
//!
//! Events are rendered through the `log` facade. Log Levels:
//! - ERROR: allocation failures, protocol violations, fatal aborts
//! - WARN: degraded collection (no collector)
//! - INFO: collection cycles
//! - DEBUG: register, discard, reallocate
//! - TRACE: allocate

use crate::memory::Address;
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

/// Log level for allocator events
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

/// Allocator event types
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MemEvent {
    /// Scratch object allocated
    Allocate {
        address: Address,
        payload_size: usize,
        size_class: usize,
    },

    /// Object resized, in place or by move
    Reallocate {
        old_address: Address,
        new_address: Address,
        old_size: usize,
        new_size: usize,
    },

    /// Scratch object freed
    Discard { address: Address, payload_size: usize },

    /// Object handed to the collector
    Register { address: Address, class_id: u32 },

    /// Static literal placed
    Static { address: Address, class_id: u32 },

    /// Collection cycle requested
    Collect { collector: String },

    /// Allocation failure
    AllocationFailure { size: usize, available: usize },

    /// Header state did not match the operation
    ProtocolViolation {
        operation: String,
        address: Address,
        detail: String,
    },

    /// Execution context aborted
    Fatal { message: String },
}

impl MemEvent {
    /// Log level of this event
    pub fn level(&self) -> LogLevel {
        match self {
            MemEvent::AllocationFailure { .. }
            | MemEvent::ProtocolViolation { .. }
            | MemEvent::Fatal { .. } => LogLevel::Error,
            MemEvent::Collect { .. } => LogLevel::Info,
            MemEvent::Reallocate { .. }
            | MemEvent::Discard { .. }
            | MemEvent::Register { .. }
            | MemEvent::Static { .. } => LogLevel::Debug,
            MemEvent::Allocate { .. } => LogLevel::Trace,
        }
    }
}

/// Event logger configuration
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Minimum log level
    pub level: LogLevel,

    /// Forward events to the `log` facade
    pub console: bool,

    /// Keep events in memory for `events()`
    pub record: bool,

    /// Enable JSON format
    pub json: bool,

    /// Include timestamps in rendered output
    pub timestamps: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Debug,
            console: true,
            record: true,
            json: false,
            timestamps: true,
        }
    }
}

/// Event logger - records allocator events
pub struct EventLogger {
    config: LoggerConfig,
    events: Mutex<Vec<(DateTime<Local>, MemEvent)>>,
    enabled: AtomicBool,
}

impl EventLogger {
    /// Create new event logger
    pub fn new(config: LoggerConfig) -> Self {
        Self {
            config,
            events: Mutex::new(Vec::new()),
            enabled: AtomicBool::new(true),
        }
    }

    /// Create a logger that records nothing until enabled
    pub fn disabled() -> Self {
        let logger = Self::new(LoggerConfig::default());
        logger.disable();
        logger
    }

    /// Enable logging
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    /// Disable logging
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    /// Check if logging is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Log an event
    pub fn log(&self, event: MemEvent) {
        if !self.is_enabled() || event.level() > self.config.level {
            return;
        }

        let timestamp = Local::now();
        if self.config.console {
            log::log!(event.level().into(), "{}", self.render(timestamp, &event));
        }

        if self.config.record {
            self.events.lock().push((timestamp, event));
        }
    }

    /// Render one event in the configured format
    pub fn render(&self, timestamp: DateTime<Local>, event: &MemEvent) -> String {
        if self.config.json {
            let mut value = serde_json::to_value(event).unwrap_or(serde_json::Value::Null);
            if self.config.timestamps {
                if let Some(object) = value.as_object_mut() {
                    object.insert("ts".to_string(), timestamp.to_rfc3339().into());
                }
            }
            return value.to_string();
        }

        let body = Self::human(event);
        if self.config.timestamps {
            format!("[{}] {}", timestamp.format("%Y-%m-%d %H:%M:%S%.3f"), body)
        } else {
            body
        }
    }

    fn human(event: &MemEvent) -> String {
        match event {
            MemEvent::Allocate {
                address,
                payload_size,
                size_class,
            } => format!(
                "[MM] Allocated {:#x} ({} bytes, class {})",
                address, payload_size, size_class
            ),
            MemEvent::Reallocate {
                old_address,
                new_address,
                old_size,
                new_size,
            } if old_address == new_address => format!(
                "[MM] Resized {:#x} in place ({} -> {} bytes)",
                old_address, old_size, new_size
            ),
            MemEvent::Reallocate {
                old_address,
                new_address,
                old_size,
                new_size,
            } => format!(
                "[MM] Moved {:#x} -> {:#x} ({} -> {} bytes)",
                old_address, new_address, old_size, new_size
            ),
            MemEvent::Discard {
                address,
                payload_size,
            } => format!("[MM] Discarded {:#x} ({} bytes)", address, payload_size),
            MemEvent::Register { address, class_id } => {
                format!("[MM] Registered {:#x} as class {}", address, class_id)
            }
            MemEvent::Static { address, class_id } => {
                format!("[MM] Static literal {:#x} of class {}", address, class_id)
            }
            MemEvent::Collect { collector } => {
                format!("[MM] Collection requested (collector: {})", collector)
            }
            MemEvent::AllocationFailure { size, available } => format!(
                "[MM] Allocation failure: {} bytes (available: {})",
                size, available
            ),
            MemEvent::ProtocolViolation {
                operation,
                address,
                detail,
            } => format!(
                "[MM] Protocol violation in {} on {:#x}: {}",
                operation, address, detail
            ),
            MemEvent::Fatal { message } => format!("[MM] Fatal: {}", message),
        }
    }

    /// Snapshot of recorded events
    pub fn events(&self) -> Vec<MemEvent> {
        self.events.lock().iter().map(|(_, e)| e.clone()).collect()
    }

    /// Clear all events
    pub fn clear_events(&self) {
        self.events.lock().clear();
    }

    /// Get event count
    pub fn event_count(&self) -> usize {
        self.events.lock().len()
    }
}

impl Default for EventLogger {
    fn default() -> Self {
        Self::new(LoggerConfig::default())
    }
}

lazy_static::lazy_static! {
    static ref GLOBAL_LOGGER: Mutex<EventLogger> = Mutex::new(EventLogger::default());
}

/// Log an event to the global logger
pub fn log_event(event: MemEvent) {
    GLOBAL_LOGGER.lock().log(event);
}

/// Configure global logger
pub fn configure_logger(config: LoggerConfig) {
    *GLOBAL_LOGGER.lock() = EventLogger::new(config);
}

/// Get global logger event count
pub fn get_event_count() -> usize {
    GLOBAL_LOGGER.lock().event_count()
}
