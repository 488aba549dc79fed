//! Segment chain layout
//!
//! Naming of the active file and its retired segments, discovery of the
//! segments present on disk, and ordered read-back.
//!
//! ## On-disk Layout
//! ```text
//! {path}          active file (index 0)
//! {path}.1        most recently retired, always plain
//! {path}.2.gz     older, compressed when a codec is configured
//! ...
//! {path}.{N-1}.gz oldest kept (N = max_files)
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use crate::compression::Compression;
use crate::error::Result;

/// Options used for every file the crate creates (mode 0640 on unix)
pub(crate) fn open_options() -> OpenOptions {
    #[allow(unused_mut)]
    let mut options = OpenOptions::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o640);
    }
    options
}

/// Path of segment `index` (0 is the active file) with `extension` appended
pub fn segment_path(base: &Path, index: usize, extension: &str) -> PathBuf {
    if index == 0 {
        return base.to_path_buf();
    }
    let mut name = base.as_os_str().to_os_string();
    name.push(format!(".{}{}", index, extension));
    PathBuf::from(name)
}

/// One file of the chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// 0 for the active file, N for `{path}.N`
    pub index: usize,
    pub path: PathBuf,
    /// Codec the file is stored with
    pub compression: Compression,
}

impl Segment {
    pub fn is_active(&self) -> bool {
        self.index == 0
    }

    /// Open the segment, decompressing transparently
    pub fn open(&self) -> Result<Box<dyn Read>> {
        let file = BufReader::new(File::open(&self.path)?);
        Ok(self.compression.decoder(file))
    }

    /// Size of the file as stored on disk
    pub fn stored_len(&self) -> Result<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }
}

/// List the segments present on disk, oldest first (active file last).
///
/// A compressed index that is missing falls back to a plain file with the same
/// index, which is what a failed compression leaves behind.
pub fn list_segments(base: &Path, max_files: usize, compression: Compression) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();

    for index in (1..max_files).rev() {
        if index >= 2 && compression.is_enabled() {
            let path = segment_path(base, index, compression.extension());
            if path.try_exists()? {
                segments.push(Segment { index, path, compression });
                continue;
            }
        }

        let path = segment_path(base, index, "");
        if path.try_exists()? {
            segments.push(Segment {
                index,
                path,
                compression: Compression::None,
            });
        }
    }

    if base.try_exists()? {
        segments.push(Segment {
            index: 0,
            path: base.to_path_buf(),
            compression: Compression::None,
        });
    }

    Ok(segments)
}

/// Read the whole chain back in write order
pub fn read_all(base: &Path, max_files: usize, compression: Compression) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for segment in list_segments(base, max_files, compression)? {
        segment.open()?.read_to_end(&mut out)?;
    }
    Ok(out)
}
