//! Rotating Writer
//!
//! Appends log records to the active file and rotates it into a numbered
//! backlog once it reaches the configured capacity.
//!
//! ## Rotation
//! ```text
//! before:  app.log   app.log.1   app.log.2.gz   app.log.3.gz
//!             │          │             │
//!             │          │             └──────────────▶ app.log.3.gz  (old .3 evicted)
//!             │          └─ rename ─▶ app.log.2 ─ compress ─▶ app.log.2.gz
//!             └─ rename ─▶ app.log.1
//! after:   app.log (empty, reopened)
//! ```

use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::compression::{self, Compression};
use crate::config::{Capacity, Config};
use crate::error::{Result, RotateError};
use crate::notify::{RotationNotifier, Subscription};
use crate::segment::{self, segment_path};

/// Size-bounded, rotating append-only log file
///
/// ## Concurrency:
/// - `inner`: one Mutex covers capacity check, rotation and append, so a
///   record is never split across two files and rotation never interleaves
///   with a write
/// - All methods take `&self`; share the writer through an `Arc`
pub struct RotatingWriter {
    config: Config,
    inner: Mutex<Inner>,
    notifier: RotationNotifier,
}

struct Inner {
    /// `None` after a failed reopen; the next write tries again
    file: Option<File>,

    /// Bytes in the active file
    current_size: u64,

    /// Completed rotations since open
    rotations: u64,

    /// The active file was retired to `.1` but the fresh one could not be created
    retired_without_reopen: bool,

    closed: bool,
}

/// Open (or create) `path` for appending and report its current length
fn open_append(path: &Path) -> io::Result<(File, u64)> {
    let mut file = segment::open_options().append(true).create(true).open(path)?;
    let size = file.seek(SeekFrom::End(0))?;
    Ok((file, size))
}

/// Rename `from` to `to`, treating a missing `from` as nothing to do
fn rename_if_exists(from: &Path, to: &Path) -> io::Result<()> {
    match std::fs::rename(from, to) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

impl RotatingWriter {
    /// Open or create the active log file described by `config`
    ///
    /// An existing file is appended to, and its length counts toward the
    /// capacity, so restarts keep filling the same segment.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        if config.compression.is_enabled() && config.max_files < 3 {
            warn!(
                max_files = config.max_files,
                compression = %config.compression,
                "compression has no effect with fewer than 3 files"
            );
        }

        let (file, size) = open_append(&config.path)?;

        info!(
            path = %config.path.display(),
            size,
            capacity = %config.capacity,
            max_files = config.max_files,
            compression = %config.compression,
            "opened rotating log"
        );

        Ok(Self {
            config,
            inner: Mutex::new(Inner {
                file: Some(file),
                current_size: size,
                rotations: 0,
                retired_without_reopen: false,
                closed: false,
            }),
            notifier: RotationNotifier::default(),
        })
    }

    /// Open with the raw settings: capacity in bytes (`-1` disables rotation),
    /// file count, and compression name (`""`, `gzip`, `bzip2`, `xz`)
    pub fn new(
        path: impl AsRef<Path>,
        capacity: i64,
        max_files: usize,
        compression: &str,
    ) -> Result<Self> {
        let config = Config::builder()
            .path(path.as_ref())
            .capacity(Capacity::from_bytes(capacity)?)
            .max_files(max_files)
            .compression(compression.parse()?)
            .build();
        Self::open(config)
    }

    // =========================================================================
    // Writing
    // =========================================================================

    /// Append one record, rotating first if the active file is full
    ///
    /// Returns the number of bytes written. If rotation fails nothing is
    /// written and the error is returned; the size counter only moves on a
    /// successful append.
    pub fn write(&self, buf: &[u8]) -> Result<usize> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(RotateError::Closed);
        }

        self.active(&mut inner)?;
        if self.should_rotate(inner.current_size) {
            self.rotate(&mut inner)?;
        }

        self.active(&mut inner)?.write_all(buf)?;
        inner.current_size += buf.len() as u64;
        Ok(buf.len())
    }

    /// Flush the active file
    pub fn flush(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if let Some(file) = inner.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }

    /// Force the active file's data to disk
    pub fn sync(&self) -> Result<()> {
        let inner = self.inner.lock();
        if let Some(file) = inner.file.as_ref() {
            file.sync_data()?;
        }
        Ok(())
    }

    /// Release the active file. Later writes fail with [`RotateError::Closed`].
    ///
    /// Subscriptions stay registered; they disconnect when the writer is dropped.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Ok(());
        }
        inner.closed = true;

        if let Some(file) = inner.file.take() {
            file.sync_all()?;
        }
        debug!(path = %self.config.path.display(), "closed rotating log");
        Ok(())
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    /// Receive an event after every rotation
    pub fn subscribe(&self) -> Subscription {
        self.notifier.subscribe()
    }

    /// Stop delivering events to `subscription`
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        self.notifier.unsubscribe(subscription.id())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Path of the active file
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn capacity(&self) -> Capacity {
        self.config.capacity
    }

    pub fn max_files(&self) -> usize {
        self.config.max_files
    }

    pub fn compression(&self) -> Compression {
        self.config.compression
    }

    /// Bytes currently in the active file
    pub fn current_size(&self) -> u64 {
        self.inner.lock().current_size
    }

    /// Rotations completed since this writer was opened
    pub fn rotations(&self) -> u64 {
        self.inner.lock().rotations
    }

    // =========================================================================
    // Rotation
    // =========================================================================

    /// The active handle, re-opening the active path if a previous rotation lost it
    fn active<'a>(&self, inner: &'a mut Inner) -> Result<&'a mut File> {
        let file = match inner.file.take() {
            Some(file) => file,
            None => {
                let path = &self.config.path;
                let (file, size) = open_append(path)
                    .map_err(|e| RotateError::rotation("reopening the active file", e))?;
                warn!(path = %path.display(), size, "recovered active log file");
                inner.current_size = size;

                // Followers still hold the retired inode
                if inner.retired_without_reopen {
                    inner.retired_without_reopen = false;
                    self.finish_rotation(inner);
                }
                file
            }
        };
        Ok(inner.file.insert(file))
    }

    fn should_rotate(&self, size: u64) -> bool {
        self.config.max_files >= 2 && self.config.capacity.is_reached(size)
    }

    /// Retire the active file and start an empty one. Called with the lock held.
    ///
    /// If a step before the active file is renamed fails, the active file is
    /// re-opened for appending so writing continues on the same segment and
    /// the next write tries again.
    #[instrument(skip_all, fields(path = %self.config.path.display(), size = inner.current_size))]
    fn rotate(&self, inner: &mut Inner) -> Result<()> {
        let path = &self.config.path;

        drop(inner.file.take());

        if let Err(err) = self.shift_segments() {
            warn!(error = %err, "rotation aborted, continuing on the current file");
            let (file, size) = open_append(path)
                .map_err(|e| RotateError::rotation("reopening the active file", e))?;
            inner.file = Some(file);
            inner.current_size = size;
            return Err(err);
        }

        let file = segment::open_options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| {
                inner.retired_without_reopen = true;
                RotateError::rotation("reopening the active file", e)
            })?;

        inner.file = Some(file);
        inner.current_size = 0;
        self.finish_rotation(inner);
        Ok(())
    }

    /// Count the rotation and tell subscribers to re-open the active path
    fn finish_rotation(&self, inner: &mut Inner) {
        inner.rotations += 1;
        let delivered = self.notifier.publish();
        info!(rotation = inner.rotations, notified = delivered, "rotated log file");
    }

    /// Move every segment one slot down the chain and retire the active file to `.1`
    fn shift_segments(&self) -> Result<()> {
        let base = &self.config.path;
        let max_files = self.config.max_files;
        let compression = self.config.compression;
        let ext = compression.extension();

        let first = segment_path(base, 1, "");
        let second = segment_path(base, 2, "");

        // A plain `.2` means an earlier rotation stopped at compression. Finish
        // that one first; nothing moves until its data is safely compressed.
        if max_files > 2 && compression.is_enabled() && second.try_exists()? {
            compression::compress_file(&second, compression)?;
            if !first.try_exists()? {
                return rename_if_exists(base, &first)
                    .map_err(|e| RotateError::rotation("retiring the active file", e));
            }
        }

        // Highest index first so nothing is overwritten before it moved
        for index in (3..max_files).rev() {
            let from = segment_path(base, index - 1, ext);
            let to = segment_path(base, index, ext);
            rename_if_exists(&from, &to)
                .map_err(|e| RotateError::rotation("shifting retired segments", e))?;
        }

        if max_files > 2 && first.try_exists()? {
            std::fs::rename(&first, &second)
                .map_err(|e| RotateError::rotation("renaming segment .1 to .2", e))?;
            compression::compress_file(&second, compression)?;
        }

        // `.1` stays plain so a reader tailing it never sees it vanish
        rename_if_exists(base, &first)
            .map_err(|e| RotateError::rotation("retiring the active file", e))
    }
}

impl Write for &RotatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        RotatingWriter::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        RotatingWriter::flush(self).map_err(io::Error::from)
    }
}

impl Write for RotatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        RotatingWriter::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        RotatingWriter::flush(self).map_err(io::Error::from)
    }
}
