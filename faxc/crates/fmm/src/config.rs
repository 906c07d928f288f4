//! Configuration Module - Linear Memory Parameters
//!
//! Manages the parameters of the linear memory the allocator runs on.

use crate::memory::{MAX_PAGES, PAGE_SIZE};

/// Main configuration for the Fax Memory Manager
///
/// # Examples
///
/// ```rust
/// use fmm::MemConfig;
///
/// // Use default configuration
/// let config = MemConfig::default();
///
/// // Small fixed-size memory for an arena-only program
/// let config = MemConfig {
///     initial_pages: 2,
///     max_pages: 2,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct MemConfig {
    /// Pages (64 KiB each) committed when the memory is created
    ///
    /// Default: 1
    pub initial_pages: u32,

    /// Hard limit on memory growth, in pages
    ///
    /// Allocation fails with `OutOfMemory` once this is reached.
    /// Default: 16384 (1 GiB)
    pub max_pages: u32,

    /// Bytes reserved at the bottom of memory for static literal objects
    ///
    /// Objects placed here are never freed and never resized in place.
    /// Default: 4 KiB
    pub static_size: u32,

    /// Enable verbose allocator logging (`log::debug!` per operation)
    ///
    /// Default: false
    pub verbose: bool,

    /// Record structured allocation events in the event logger
    ///
    /// Default: false
    pub trace_events: bool,
}

impl Default for MemConfig {
    fn default() -> Self {
        MemConfig {
            initial_pages: 1,
            max_pages: 16 * 1024,
            static_size: 4 * KB,
            verbose: false,
            trace_events: false,
        }
    }
}

impl MemConfig {
    /// Validate configuration
    ///
    /// ```rust
    /// use fmm::MemConfig;
    ///
    /// let config = MemConfig {
    ///     max_pages: 0,  // Invalid!
    ///     ..Default::default()
    /// };
    ///
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_pages == 0 {
            return Err(ConfigError::InvalidPageCount(
                "max_pages must be > 0".to_string(),
            ));
        }

        if self.max_pages > MAX_PAGES {
            return Err(ConfigError::InvalidPageCount(format!(
                "max_pages cannot exceed {} (4 GiB address space)",
                MAX_PAGES
            )));
        }

        if self.initial_pages == 0 || self.initial_pages > self.max_pages {
            return Err(ConfigError::InvalidPageCount(
                "initial_pages must be between 1 and max_pages".to_string(),
            ));
        }

        let initial_bytes = self.initial_pages as u64 * PAGE_SIZE as u64;
        if self.static_size as u64 >= initial_bytes {
            return Err(ConfigError::InvalidStaticSize(format!(
                "static_size ({}) must fit below the initial memory ({} bytes)",
                self.static_size, initial_bytes
            )));
        }

        Ok(())
    }

    /// Build configuration from environment variables
    ///
    /// Overrides defaults with environment variables:
    /// - FMM_INITIAL_PAGES
    /// - FMM_MAX_PAGES
    /// - FMM_STATIC_SIZE
    /// - FMM_VERBOSE
    /// - FMM_TRACE_EVENTS
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("FMM_INITIAL_PAGES") {
            if let Ok(pages) = val.parse::<u32>() {
                config.initial_pages = pages;
            }
        }

        if let Ok(val) = std::env::var("FMM_MAX_PAGES") {
            if let Ok(pages) = val.parse::<u32>() {
                config.max_pages = pages;
            }
        }

        if let Ok(val) = std::env::var("FMM_STATIC_SIZE") {
            if let Ok(size) = val.parse::<u32>() {
                config.static_size = size;
            }
        }

        if let Ok(val) = std::env::var("FMM_VERBOSE") {
            config.verbose = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("FMM_TRACE_EVENTS") {
            config.trace_events = parse_flag(&val);
        }

        config
    }

    /// Maximum linear memory size in bytes
    pub fn max_memory_bytes(&self) -> usize {
        self.max_pages as usize * PAGE_SIZE
    }
}

/// Error types for configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid page count: {0}")]
    InvalidPageCount(String),

    #[error("Invalid static size: {0}")]
    InvalidStaticSize(String),
}

const KB: u32 = 1024;

fn parse_flag(val: &str) -> bool {
    val == "1" || val.eq_ignore_ascii_case("true")
}
