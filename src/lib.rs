//! # rotatelog
//!
//! A size-bounded, rotating append-only log file writer with:
//! - Size-triggered rotation into a numbered backlog (`app.log.1`, `app.log.2.gz`, ...)
//! - Optional gzip / bzip2 / xz compression of older segments
//! - Non-blocking rotation notifications for tailing readers
//! - A single lock around check-rotate-append, so records never straddle files
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Record formatter (caller)                    │
//! │                  io::Write / write(&self)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    RotatingWriter                            │
//! │             (Mutex: size check → rotate → append)            │
//! └──────────┬─────────────────────────────────┬────────────────┘
//!            │                                 │
//!            ▼                                 ▼
//!   ┌─────────────────┐               ┌─────────────────┐
//!   │  Segment chain  │               │ RotationNotifier│
//!   │ rename/compress │               │ (lossy pub/sub) │
//!   └─────────────────┘               └────────┬────────┘
//!                                              │
//!                                              ▼
//!                                     Tailing readers re-open
//!                                       the active path
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use rotatelog::{Config, Compression, RotatingWriter};
//!
//! # fn main() -> rotatelog::Result<()> {
//! let config = Config::builder()
//!     .path("/var/log/app/app.log")
//!     .max_size(10 * 1024 * 1024)
//!     .max_files(5)
//!     .compression(Compression::Gzip)
//!     .build();
//!
//! let writer = RotatingWriter::open(config)?;
//! let rotations = writer.subscribe();
//!
//! writer.write(b"{\"msg\":\"hello\"}\n")?;
//! if rotations.try_recv().is_ok() {
//!     // re-open /var/log/app/app.log from offset 0
//! }
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod compression;
pub mod notify;
pub mod segment;
pub mod writer;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{RotateError, Result};
pub use config::{Capacity, Config};
pub use compression::Compression;
pub use notify::{RotationEvent, RotationNotifier, SubscriberId, Subscription};
pub use segment::Segment;
pub use writer::RotatingWriter;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of rotatelog
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
