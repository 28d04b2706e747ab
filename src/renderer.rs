use crate::{ReelError, Result};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute, queue,
    style::{Print, ResetColor},
    terminal::{Clear, ClearType},
};
use log::{debug, info};
use std::io::{self, Write};
use std::time::Duration;
use tokio::time::sleep;

/// Pause between the session banner and the first frame
pub const PREROLL: Duration = Duration::from_secs(2);

/// Where a playback run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Priming,
    Playing,
    Done,
}

/// Scoped ownership of the terminal's cursor and screen.
///
/// Whatever was changed on acquisition is put back when the guard is finished or
/// dropped, including when the playback future is cancelled.
pub struct TerminalState<'a, W: Write> {
    out: &'a mut W,
    cursor_hidden: bool,
    restored: bool,
}

impl<'a, W: Write> TerminalState<'a, W> {
    pub fn acquire(out: &'a mut W, hide_cursor: bool) -> Result<Self> {
        if hide_cursor {
            execute!(out, Hide)?;
        }
        debug!("Terminal acquired (cursor hidden: {})", hide_cursor);
        Ok(Self {
            out,
            cursor_hidden: hide_cursor,
            restored: false,
        })
    }

    pub fn cursor_hidden(&self) -> bool {
        self.cursor_hidden
    }

    /// Clear the viewport and draw one frame from the top-left corner
    pub fn draw(&mut self, frame: &str) -> Result<()> {
        queue!(
            self.out,
            Clear(ClearType::All),
            MoveTo(0, 0),
            Print(frame),
            Print("\n")
        )?;
        self.out.flush()?;
        Ok(())
    }

    /// Clear the screen and give the cursor back
    pub fn finish(mut self) -> Result<()> {
        self.restore()?;
        Ok(())
    }

    fn restore(&mut self) -> io::Result<()> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        queue!(self.out, ResetColor, Clear(ClearType::All), MoveTo(0, 0))?;
        if self.cursor_hidden {
            queue!(self.out, Show)?;
        }
        self.out.flush()?;
        debug!("Terminal restored to normal state");
        Ok(())
    }
}

impl<W: Write> Drop for TerminalState<'_, W> {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

/// Playback settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackOptions {
    /// Hide the cursor while frames are shown
    pub hide_cursor: bool,
    /// Pause after the banner before the first frame
    pub preroll: Duration,
}

impl PlaybackOptions {
    /// Settings for frames decoded on the fly
    pub fn direct() -> Self {
        Self {
            hide_cursor: true,
            preroll: PREROLL,
        }
    }

    /// Settings for replaying an archive; the cursor stays visible
    pub fn archive() -> Self {
        Self {
            hide_cursor: false,
            preroll: PREROLL,
        }
    }
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self::direct()
    }
}

/// Summary of a finished playback run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackReport {
    pub frames_shown: usize,
    pub frame_delay: Duration,
}

/// Timed, strictly sequential frame display
pub struct Player<W: Write> {
    out: W,
    options: PlaybackOptions,
    phase: Phase,
}

impl<W: Write> Player<W> {
    pub fn new(out: W, options: PlaybackOptions) -> Self {
        Self {
            out,
            options,
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn options(&self) -> &PlaybackOptions {
        &self.options
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Show `banner`, wait out the pre-roll, then draw every frame at `fps`.
    ///
    /// A frame that takes longer than the frame delay to produce simply delays the
    /// ones after it. The first frame error stops playback and is returned.
    pub async fn play<I>(&mut self, banner: &str, fps: f64, frames: I) -> Result<PlaybackReport>
    where
        I: IntoIterator<Item = Result<String>>,
    {
        let frame_delay = calculate_frame_delay(fps)?;
        let Self {
            out,
            options,
            phase,
        } = self;

        *phase = Phase::Priming;
        out.write_all(banner.as_bytes())?;
        if !banner.is_empty() && !banner.ends_with('\n') {
            out.write_all(b"\n")?;
        }
        out.flush()?;
        if !options.preroll.is_zero() {
            sleep(options.preroll).await;
        }

        *phase = Phase::Playing;
        let mut terminal = TerminalState::acquire(out, options.hide_cursor)?;
        let mut frames_shown = 0;
        for frame in frames {
            let frame = frame?;
            terminal.draw(&frame)?;
            frames_shown += 1;
            sleep(frame_delay).await;
        }
        terminal.finish()?;
        *phase = Phase::Done;

        info!("Playback finished. Total frames: {}", frames_shown);
        Ok(PlaybackReport {
            frames_shown,
            frame_delay,
        })
    }
}

/// Delay between frames, rounded to whole microseconds
pub fn calculate_frame_delay(fps: f64) -> Result<Duration> {
    if !fps.is_finite() || fps <= 0.0 {
        return Err(ReelError::InvalidConfig(format!(
            "Frame rate must be greater than 0, got {}",
            fps
        )));
    }
    Ok(Duration::from_micros((1_000_000.0 / fps).round() as u64))
}
