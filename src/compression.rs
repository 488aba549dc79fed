//! Segment compression
//!
//! Retired segments `.2` and older are stored through one of the supported
//! codecs. `.1` is never compressed so a reader tailing the file that was just
//! retired does not see it disappear underneath it.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use lzma_rust2::{XzOptions, XzReader, XzWriter};
use tracing::{debug, warn};

use crate::error::{Result, RotateError};
use crate::segment;

/// Compression applied to older retired segments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Bzip2,
    Xz,
}

impl Compression {
    /// File suffix appended to compressed segments
    pub fn extension(self) -> &'static str {
        match self {
            Compression::None => "",
            Compression::Gzip => ".gz",
            Compression::Bzip2 => ".bz",
            Compression::Xz => ".xz",
        }
    }

    /// Name as accepted by [`FromStr`]
    pub fn as_str(self) -> &'static str {
        match self {
            Compression::None => "",
            Compression::Gzip => "gzip",
            Compression::Bzip2 => "bzip2",
            Compression::Xz => "xz",
        }
    }

    pub fn is_enabled(self) -> bool {
        self != Compression::None
    }

    /// Path of the compressed counterpart of `path`
    pub fn compressed_path(self, path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_os_string();
        name.push(self.extension());
        PathBuf::from(name)
    }

    /// Wrap `reader` so it yields the decompressed stream
    pub fn decoder<'a, R: Read + 'a>(self, reader: R) -> Box<dyn Read + 'a> {
        match self {
            Compression::None => Box::new(reader),
            Compression::Gzip => Box::new(GzDecoder::new(reader)),
            Compression::Bzip2 => Box::new(BzDecoder::new(reader)),
            Compression::Xz => Box::new(XzReader::new(reader, false)),
        }
    }
}

impl FromStr for Compression {
    type Err = RotateError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" | "none" => Ok(Compression::None),
            "gzip" => Ok(Compression::Gzip),
            "bzip2" => Ok(Compression::Bzip2),
            "xz" => Ok(Compression::Xz),
            other => Err(RotateError::UnknownCompression(other.to_string())),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compression::None => f.write_str("none"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Compress `path` in place into `path<ext>`.
///
/// The source is removed only once the compressed file has been completely
/// written and synced. On failure the partial output is removed and the
/// source is left untouched.
pub fn compress_file(path: &Path, compression: Compression) -> Result<()> {
    let target = compression.compressed_path(path);

    let written = match compression {
        Compression::None => return Ok(()),
        Compression::Gzip => write_compressed(path, &target, |input, output| {
            let mut encoder = GzEncoder::new(output, flate2::Compression::default());
            io::copy(input, &mut encoder)?;
            encoder.finish()
        }),
        Compression::Bzip2 => write_compressed(path, &target, |input, output| {
            let mut encoder = BzEncoder::new(output, bzip2::Compression::default());
            io::copy(input, &mut encoder)?;
            encoder.finish()
        }),
        Compression::Xz => write_compressed(path, &target, |input, output| {
            let mut encoder = XzWriter::new(output, XzOptions::with_preset(6))?;
            io::copy(input, &mut encoder)?;
            encoder.finish()
        }),
    };

    if let Err(source) = written {
        match fs::remove_file(&target) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                target = %target.display(),
                error = %e,
                "failed to remove partial compressed segment"
            ),
        }
        return Err(RotateError::Compression {
            path: path.to_path_buf(),
            source,
        });
    }

    if let Err(e) = fs::remove_file(path) {
        // Same data in both; the next rotation recompresses the leftover before shifting
        warn!(path = %path.display(), error = %e, "failed to remove compressed source segment");
    }

    debug!(from = %path.display(), to = %target.display(), "compressed segment");
    Ok(())
}

type Output = BufWriter<File>;

/// Stream `source` through `encode` into a freshly created `target`, then sync it
fn write_compressed<F>(source: &Path, target: &Path, encode: F) -> io::Result<()>
where
    F: FnOnce(&mut BufReader<File>, Output) -> io::Result<Output>,
{
    let mut input = BufReader::new(File::open(source)?);
    let output = BufWriter::new(
        segment::open_options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(target)?,
    );

    let output = encode(&mut input, output)?;
    let file = output.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()
}
