//! Reading and writing `.obj` archives.
//!
//! An archive is a JSON object with `fps`, `width`, `height` and a `frames` array of
//! pre-rasterized frame strings. Writing is streamed frame by frame; reading loads the
//! whole document before playback starts.

use crate::{ReelError, Result, DEFAULT_FPS};
use log::{debug, warn};
use serde_json::Value;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;
use std::str::FromStr;

/// Recoverable problems found in archive metadata
#[derive(Debug, Clone, PartialEq)]
pub enum ArchiveWarning {
    /// `fps` absent or not a number
    MissingFps,
    /// `fps` present but zero or negative
    NonPositiveFps(f64),
}

impl fmt::Display for ArchiveWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveWarning::MissingFps => {
                write!(f, "No valid 'fps' data found. Defaulting to {}.", DEFAULT_FPS)
            }
            ArchiveWarning::NonPositiveFps(fps) => {
                write!(f, "Invalid 'fps' value {}. Defaulting to {}.", fps, DEFAULT_FPS)
            }
        }
    }
}

/// A fully loaded archive
#[derive(Debug, Clone, PartialEq)]
pub struct Archive {
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    pub frames: Vec<String>,
    /// Metadata problems that were replaced by defaults
    pub warnings: Vec<ArchiveWarning>,
}

impl Archive {
    /// Load an archive from disk
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                ReelError::InputNotFound(path.to_path_buf())
            }
            _ => ReelError::Io(e),
        })?;
        debug!("Reading archive '{}'", path.display());
        deserialize(BufReader::new(file))
    }

    fn from_value(document: Value) -> Result<Self> {
        let Value::Object(mut fields) = document else {
            return Err(ReelError::MissingFrames);
        };

        let frames = match fields.remove("frames") {
            Some(Value::Array(entries)) => entries
                .into_iter()
                .enumerate()
                .map(|(index, entry)| match entry {
                    Value::String(frame) => Ok(frame),
                    _ => Err(ReelError::InvalidFrame(index)),
                })
                .collect::<Result<Vec<_>>>()?,
            _ => return Err(ReelError::MissingFrames),
        };

        let mut warnings = Vec::new();
        let fps = match fields.get("fps").and_then(Value::as_f64) {
            Some(fps) if fps > 0.0 => fps,
            Some(fps) => {
                warnings.push(ArchiveWarning::NonPositiveFps(fps));
                DEFAULT_FPS
            }
            None => {
                warnings.push(ArchiveWarning::MissingFps);
                DEFAULT_FPS
            }
        };
        for warning in &warnings {
            warn!("{}", warning);
        }

        let dimension = |name: &str| {
            fields
                .get(name)
                .and_then(Value::as_u64)
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(0)
        };

        Ok(Self {
            fps,
            width: dimension("width"),
            height: dimension("height"),
            frames,
            warnings,
        })
    }
}

impl FromStr for Archive {
    type Err = ReelError;

    fn from_str(document: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(document).map_err(ReelError::ArchiveFormat)?;
        Self::from_value(value)
    }
}

/// Parse a whole archive document from `reader`
pub fn deserialize<R: Read>(reader: R) -> Result<Archive> {
    let value: Value = serde_json::from_reader(reader).map_err(|e| {
        if e.is_io() {
            ReelError::Io(e.into())
        } else {
            ReelError::ArchiveFormat(e)
        }
    })?;
    Archive::from_value(value)
}

/// Write a complete archive in one call
pub fn serialize<W, I, S>(sink: W, fps: f64, width: u32, height: u32, frames: I) -> Result<W>
where
    W: Write,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut writer = ArchiveWriter::begin(sink, fps, width, height)?;
    for frame in frames {
        writer.write_frame(frame.as_ref())?;
    }
    writer.finish()
}

/// Streams an archive document to a sink, one frame at a time
pub struct ArchiveWriter<W: Write> {
    sink: W,
    frames_written: usize,
}

impl<W: Write> ArchiveWriter<W> {
    /// Write the metadata and open the `frames` array
    pub fn begin(mut sink: W, fps: f64, width: u32, height: u32) -> Result<Self> {
        writeln!(sink, "{{")?;
        if fps.is_finite() {
            writeln!(sink, "  \"fps\": {},", fps)?;
        } else {
            writeln!(sink, "  \"fps\": null,")?;
        }
        writeln!(sink, "  \"width\": {},", width)?;
        writeln!(sink, "  \"height\": {},", height)?;
        write!(sink, "  \"frames\": [")?;
        Ok(Self {
            sink,
            frames_written: 0,
        })
    }

    fn separator(&mut self) -> io::Result<()> {
        if self.frames_written > 0 {
            write!(self.sink, ",")?;
        }
        write!(self.sink, "\n    ")
    }

    /// Append a frame, escaping it as a JSON string
    pub fn write_frame(&mut self, frame: &str) -> Result<()> {
        self.separator()?;
        serde_json::to_writer(&mut self.sink, frame).map_err(io::Error::from)?;
        self.frames_written += 1;
        Ok(())
    }

    /// Append a frame whose text is already a valid JSON string body
    pub fn write_escaped_frame(&mut self, body: &str) -> Result<()> {
        self.separator()?;
        write!(self.sink, "\"{}\"", body)?;
        self.frames_written += 1;
        Ok(())
    }

    pub fn frames_written(&self) -> usize {
        self.frames_written
    }

    /// Close the document and hand back the sink
    pub fn finish(mut self) -> Result<W> {
        if self.frames_written > 0 {
            write!(self.sink, "\n  ")?;
        }
        writeln!(self.sink, "]")?;
        writeln!(self.sink, "}}")?;
        self.sink.flush()?;
        Ok(self.sink)
    }
}
