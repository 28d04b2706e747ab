use ascii_reel::cli::{Cli, Command, PlayTarget};
use ascii_reel::renderer::PREROLL;
use ascii_reel::{
    get_charset, load_video, Archive, ArchiveWriter, Charset, FrameConverter, OutputMode,
    PlaybackOptions, PlaybackReport, Player,
};

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, error, info, warn};
use std::fs::File;
use std::future::Future;
use std::io::{self, BufWriter};
use std::path::Path;

/// Exit status after Ctrl+C, following the shell convention of 128 + SIGINT
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Translate progress is reported every this many frames
const PROGRESS_INTERVAL: usize = 100;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(e) = cli.validate() {
        error!("Invalid arguments: {}", e);
        std::process::exit(1);
    }

    info!("Starting ASCII Reel v{}", ascii_reel::VERSION);

    match &cli.command {
        Command::Play {
            path,
            width,
            charset,
        } => match PlayTarget::from_path(path)? {
            PlayTarget::Archive => play_archive(path).await,
            PlayTarget::Video => play_video(path, *width, charset).await,
        },
        Command::Translate {
            input,
            output,
            width,
            charset,
            plain,
        } => translate(input, output, *width, charset, *plain),
    }
}

fn resolve_charset(name: &str) -> Charset {
    let charset = get_charset(name);
    if charset.name() != name {
        warn!("Unknown charset '{}', using '{}'", name, charset.name());
    }
    charset
}

/// Run playback until it finishes or Ctrl+C arrives
async fn until_interrupted<F>(playback: F) -> Result<PlaybackReport>
where
    F: Future<Output = ascii_reel::Result<PlaybackReport>>,
{
    tokio::select! {
        result = playback => Ok(result?),
        _ = tokio::signal::ctrl_c() => {
            // The playback future, and the terminal guard inside it, is gone by now
            eprintln!("\nPlayback stopped.");
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    }
}

async fn play_archive(path: &Path) -> Result<()> {
    let archive = Archive::open(path)
        .with_context(|| format!("Failed to load archive '{}'", path.display()))?;

    let fps = archive.fps;
    let banner = format!(
        "Loaded {} frames ({}x{}) at {:.2} FPS\nStarting playback... Press Ctrl+C to stop.",
        archive.frames.len(),
        archive.width,
        archive.height,
        fps
    );

    let mut player = Player::new(io::stdout(), PlaybackOptions::archive());
    let frames = archive.frames.into_iter().map(Ok);
    let report = until_interrupted(player.play(&banner, fps, frames)).await?;
    debug!("Archive playback done: {:?}", report);
    Ok(())
}

async fn play_video(path: &Path, width: u32, charset_name: &str) -> Result<()> {
    let converter = FrameConverter::new(width, resolve_charset(charset_name))?;
    let frames = load_video(path)?;

    let fps = frames.decoder().fps();
    let banner = format!(
        "Playing video: {}\nFPS: {}\nTotal frames: {}\nASCII width: {} columns\nCharacter set: {} ({} chars)\nStarting playback in {} seconds... Press Ctrl+C to stop.",
        path.display(),
        fps,
        frames.decoder().total_frames(),
        width,
        converter.charset().name(),
        converter.charset().len(),
        PREROLL.as_secs()
    );

    let rendered = frames.map(|frame| {
        frame.and_then(|frame| converter.convert_frame(&frame, OutputMode::ColorRaw))
    });

    let mut player = Player::new(io::stdout(), PlaybackOptions::direct());
    let report = until_interrupted(player.play(&banner, fps, rendered))
        .await
        .with_context(|| format!("Playback of '{}' failed", path.display()))?;
    debug!("Video playback done: {:?}", report);
    Ok(())
}

fn translate(input: &Path, output: &Path, width: u32, charset_name: &str, plain: bool) -> Result<()> {
    let converter = FrameConverter::new(width, resolve_charset(charset_name))?;
    let frames = load_video(input)?;

    let fps = frames.decoder().fps();
    let total = frames.decoder().total_frames();
    println!("Processing video: {}", input.display());
    println!("FPS: {}", fps);
    println!("Total frames: {}", total);
    println!("ASCII width: {} columns", width);
    println!(
        "Character set: {} ({} chars)",
        converter.charset().name(),
        converter.charset().len()
    );

    let file = File::create(output)
        .with_context(|| format!("Could not open output file '{}'", output.display()))?;

    // Row count comes from the first frame, as every frame shares its size
    let mut frames = frames.peekable();
    let height = match frames.peek() {
        Some(Ok(frame)) => converter.output_height(frame.width, frame.height)?,
        _ => 0,
    };

    let mode = if plain {
        OutputMode::Plain
    } else {
        OutputMode::ColorJson
    };
    let mut writer = ArchiveWriter::begin(BufWriter::new(file), fps, width, height)?;

    for frame in frames {
        let frame = frame?;
        let text = converter.convert_frame(&frame, mode)?;
        match mode {
            OutputMode::ColorJson => writer.write_escaped_frame(&text)?,
            _ => writer.write_frame(&text)?,
        }

        let processed = writer.frames_written();
        if processed % PROGRESS_INTERVAL == 0 {
            println!("Processed {}/{} frames...", processed, total);
        }
    }

    let processed = writer.frames_written();
    writer
        .finish()
        .with_context(|| format!("Could not write '{}'", output.display()))?;

    println!("Processed all {} frames.", processed);
    println!("ASCII video data saved to '{}'", output.display());
    Ok(())
}
