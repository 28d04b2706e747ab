use std::path::{Path, PathBuf};
use clap::{Parser, Subcommand};

use crate::{ReelError, Result};

/// Extensions decoded directly by `play`
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mkv", "mov"];

/// Extension of pre-rendered archives
pub const ARCHIVE_EXTENSION: &str = "obj";

/// Colored ASCII video player and translator for the terminal
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play a video (.mp4, .avi, .mkv, .mov) or a pre-rendered .obj archive
    Play {
        /// Path to the video or archive
        path: PathBuf,

        /// Output width in characters (videos only)
        #[arg(short, long, default_value_t = 80)]
        width: u32,

        /// Character set: short, medium, long or blocks (videos only)
        #[arg(short, long, default_value = "medium")]
        charset: String,
    },

    /// Convert a video into a .obj archive of colored ASCII frames
    Translate {
        /// Path to the input video
        input: PathBuf,

        /// Path of the archive to write
        output: PathBuf,

        /// Output width in characters
        #[arg(short, long, default_value_t = 120)]
        width: u32,

        /// Character set: short, medium, long or blocks
        #[arg(short, long, default_value = "medium")]
        charset: String,

        /// Write uncolored grayscale frames
        #[arg(long)]
        plain: bool,
    },
}

/// What `play` should do with a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayTarget {
    Archive,
    Video,
}

impl PlayTarget {
    /// Pick the playback path from the file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| {
                ReelError::UnsupportedFormat(format!(
                    "could not detect file type of '{}' (no extension)",
                    path.display()
                ))
            })?
            .to_ascii_lowercase();

        if extension == ARCHIVE_EXTENSION {
            Ok(PlayTarget::Archive)
        } else if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
            Ok(PlayTarget::Video)
        } else {
            Err(ReelError::UnsupportedFormat(format!(
                "'.{}' (supported formats: .mp4, .avi, .mkv, .mov, .obj)",
                extension
            )))
        }
    }
}

impl Cli {
    /// Validate command line arguments
    pub fn validate(&self) -> std::result::Result<(), String> {
        // Width only applies to frames rasterized from video
        let (input, width) = match &self.command {
            Command::Play { path, width, .. } => match PlayTarget::from_path(path) {
                Ok(PlayTarget::Archive) => (path, None),
                _ => (path, Some(*width)),
            },
            Command::Translate { input, width, .. } => (input, Some(*width)),
        };

        if width == Some(0) {
            return Err("Width must be greater than 0".to_string());
        }

        if !input.exists() {
            return Err(format!("File not found at '{}'", input.display()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_targets() {
        assert_eq!(PlayTarget::from_path(Path::new("clip.obj")).unwrap(), PlayTarget::Archive);
        assert_eq!(PlayTarget::from_path(Path::new("a/b/clip.mp4")).unwrap(), PlayTarget::Video);
        for name in ["x.avi", "x.mkv", "x.mov", "X.MP4", "x.Obj"] {
            assert!(PlayTarget::from_path(Path::new(name)).is_ok(), "{name}");
        }
    }

    #[test]
    fn test_unsupported_targets() {
        for name in ["clip.txt", "clip", "archive.json", "dir.mp4/clip"] {
            let result = PlayTarget::from_path(Path::new(name));
            assert!(matches!(result, Err(ReelError::UnsupportedFormat(_))), "{name}");
        }
    }

    #[test]
    fn test_play_defaults() {
        let cli = Cli::parse_from(["ascii-reel", "play", "clip.mp4"]);
        match cli.command {
            Command::Play { width, charset, .. } => {
                assert_eq!(width, 80);
                assert_eq!(charset, "medium");
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(!cli.verbose);
    }

    #[test]
    fn test_translate_defaults() {
        let cli = Cli::parse_from(["ascii-reel", "translate", "in.mp4", "out.obj", "--charset", "long"]);
        match cli.command {
            Command::Translate { width, charset, plain, output, .. } => {
                assert_eq!(width, 120);
                assert_eq!(charset, "long");
                assert!(!plain);
                assert_eq!(output, PathBuf::from("out.obj"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_validate() {
        let cli = Cli::parse_from(["ascii-reel", "play", "Cargo.toml", "--width", "0"]);
        assert!(cli.validate().unwrap_err().contains("greater than 0"));

        let cli = Cli::parse_from(["ascii-reel", "play", "missing.obj"]);
        assert!(cli.validate().unwrap_err().contains("File not found"));

        let cli = Cli::parse_from(["ascii-reel", "-v", "play", "Cargo.toml"]);
        assert!(cli.validate().is_ok());
        assert!(cli.verbose);

        let cli = Cli::parse_from(["ascii-reel", "translate", "Cargo.toml", "out.obj", "-w", "0"]);
        assert!(cli.validate().unwrap_err().contains("greater than 0"));
    }

    #[test]
    fn test_validate_ignores_width_for_archives() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("clip.OBJ");
        std::fs::write(&archive, r#"{"fps": 24, "frames": []}"#).unwrap();

        let path = archive.to_str().unwrap();
        let cli = Cli::parse_from(["ascii-reel", "play", path, "--width", "0"]);
        assert!(cli.validate().is_ok());
    }
}
