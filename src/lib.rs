//! ASCII Reel - colored ASCII video playback and translation for the terminal
//!
//! Video frames are decoded with FFmpeg, rasterized into true-color ASCII text and
//! either played straight to the terminal or stored in a JSON archive (`.obj`) that
//! can be replayed later without decoding.

use std::path::PathBuf;

pub mod archive;
pub mod charset;
pub mod cli;
pub mod converter;
pub mod decoder;
pub mod renderer;

pub use archive::{deserialize, serialize, Archive, ArchiveWarning, ArchiveWriter};
pub use charset::{get_charset, Charset};
pub use cli::{Cli, Command, PlayTarget};
pub use converter::{glyph_index, luma, CellSample, FrameConverter, OutputMode};
pub use decoder::{load_video, FrameIterator, VideoDecoder, VideoFrame};
pub use renderer::{
    calculate_frame_delay, PlaybackOptions, PlaybackReport, Player, TerminalState,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Frame rate used when an archive or a video stream does not declare a usable one.
pub const DEFAULT_FPS: f64 = 24.0;

/// Error types used throughout the application
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    #[error("File not found or could not be opened: '{}'", .0.display())]
    InputNotFound(PathBuf),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Archive is not a valid JSON document: {0}")]
    ArchiveFormat(#[source] serde_json::Error),

    #[error("No valid 'frames' data found in the archive")]
    MissingFrames,

    #[error("Frame {0} in the archive is not a string")]
    InvalidFrame(usize),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Video decoding error: {0}")]
    Decode(String),

    #[error("Video decoding error: {0}")]
    VideoDecoding(#[from] ffmpeg_next::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReelError {
    /// True for every way an archive document can fail to load.
    pub fn is_malformed_archive(&self) -> bool {
        matches!(
            self,
            ReelError::ArchiveFormat(_) | ReelError::MissingFrames | ReelError::InvalidFrame(_)
        )
    }
}

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, ReelError>;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        calculate_frame_delay, deserialize, get_charset, glyph_index, luma, serialize, Archive,
        ArchiveWarning, ArchiveWriter, Charset, FrameConverter, OutputMode, PlaybackOptions,
        PlaybackReport, Player, ReelError, Result, VideoFrame, DEFAULT_FPS,
    };
}
