use ffmpeg_next as ffmpeg;
use std::path::Path;
use log::{debug, info, warn};

use crate::{ReelError, Result, DEFAULT_FPS};

/// Video decoder that extracts frames from video files
pub struct VideoDecoder {
    input_context: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: Option<ffmpeg::software::scaling::Context>,
    eof_sent: bool,
    frame_count: u64,
    total_frames: u64,
    fps: f64,
}

/// A decoded video frame in packed BGR order
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Pixel data, 3 bytes per pixel (blue, green, red), no row padding
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Frame number, starting at 1
    pub frame_number: u64,
}

impl VideoFrame {
    /// Build a frame where every pixel has the same BGR value.
    #[doc(hidden)]
    pub fn filled(width: u32, height: u32, bgr: [u8; 3]) -> Self {
        let data = bgr.repeat(width as usize * height as usize);
        Self {
            data,
            width,
            height,
            frame_number: 1,
        }
    }
}

impl VideoDecoder {
    /// Open a video file and prepare its best video stream for decoding
    pub fn new(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ReelError::InputNotFound(path.to_path_buf()));
        }

        if let Err(e) = ffmpeg::init() {
            debug!("FFmpeg init error: {:?}", e);
        }

        debug!("Attempting to open video file: {}", path.display());
        let input_context = ffmpeg::format::input(&path).map_err(|e| {
            info!("FFmpeg error details: {:?}", e);
            ReelError::InputNotFound(path.to_path_buf())
        })?;

        let stream = input_context
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| {
                ReelError::Decode(format!("No video stream found in file '{}'", path.display()))
            })?;

        let stream_index = stream.index();
        info!("Found video stream {} in file '{}'", stream_index, path.display());

        let context_decoder = ffmpeg::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = context_decoder.decoder().video()?;

        let rate = stream.avg_frame_rate();
        let fps = if rate.denominator() != 0 && rate.numerator() > 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            warn!("Stream does not declare a frame rate. Defaulting to {}.", DEFAULT_FPS);
            DEFAULT_FPS
        };

        let total_frames = stream.frames().max(0) as u64;

        debug!(
            "Video info: {}x{}, {:.2} FPS, {} frames",
            decoder.width(),
            decoder.height(),
            fps,
            total_frames
        );

        Ok(Self {
            input_context,
            stream_index,
            decoder,
            scaler: None,
            eof_sent: false,
            frame_count: 0,
            total_frames,
            fps,
        })
    }

    /// Get video FPS
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Frame count declared by the container (0 when unknown)
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Get video dimensions
    pub fn dimensions(&self) -> (u32, u32) {
        (self.decoder.width(), self.decoder.height())
    }

    /// Get the next frame from the video, or `None` once the stream is drained
    pub fn next_frame(&mut self) -> Result<Option<VideoFrame>> {
        let mut decoded_frame = ffmpeg::frame::Video::empty();

        loop {
            match self.decoder.receive_frame(&mut decoded_frame) {
                Ok(()) => {
                    self.frame_count += 1;
                    return self.convert_frame(&decoded_frame).map(Some);
                }
                Err(ffmpeg::Error::Eof) => return Ok(None),
                Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::util::error::EAGAIN => {
                    if self.eof_sent {
                        return Ok(None);
                    }
                }
                Err(e) => return Err(e.into()),
            }

            match self.next_packet() {
                Some(packet) => self.decoder.send_packet(&packet)?,
                None => {
                    self.decoder.send_eof()?;
                    self.eof_sent = true;
                }
            }
        }
    }

    fn next_packet(&mut self) -> Option<ffmpeg::Packet> {
        let index = self.stream_index;
        self.input_context
            .packets()
            .find(|(stream, _)| stream.index() == index)
            .map(|(_, packet)| packet)
    }

    /// Convert an FFmpeg frame to packed BGR24
    fn convert_frame(&mut self, frame: &ffmpeg::frame::Video) -> Result<VideoFrame> {
        let width = frame.width();
        let height = frame.height();

        if self.scaler.is_none() {
            self.scaler = Some(ffmpeg::software::scaling::Context::get(
                frame.format(),
                width,
                height,
                ffmpeg::format::Pixel::BGR24,
                width,
                height,
                ffmpeg::software::scaling::Flags::BILINEAR,
            )?);
        }

        let mut bgr_frame = ffmpeg::frame::Video::empty();
        if let Some(ref mut scaler) = self.scaler {
            scaler.run(frame, &mut bgr_frame)?;
        }

        // FFmpeg rows may be padded past width * 3
        let row_bytes = width as usize * 3;
        let stride = bgr_frame.stride(0);
        let mut data = Vec::with_capacity(row_bytes * height as usize);
        for row in bgr_frame.data(0).chunks(stride.max(row_bytes).max(1)).take(height as usize) {
            let row = row.get(..row_bytes).ok_or_else(|| {
                ReelError::Decode(format!("Short row in decoded frame {}", self.frame_count))
            })?;
            data.extend_from_slice(row);
        }

        debug!("Decoded frame {}: {}x{}", self.frame_count, width, height);

        Ok(VideoFrame {
            data,
            width,
            height,
            frame_number: self.frame_count,
        })
    }

    /// Get current frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

/// Iterator wrapper for VideoDecoder
pub struct FrameIterator {
    decoder: VideoDecoder,
    finished: bool,
}

impl FrameIterator {
    /// Create a new frame iterator
    pub fn new(decoder: VideoDecoder) -> Self {
        Self {
            decoder,
            finished: false,
        }
    }

    /// Get the underlying decoder reference
    pub fn decoder(&self) -> &VideoDecoder {
        &self.decoder
    }
}

impl Iterator for FrameIterator {
    type Item = Result<VideoFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.decoder.next_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Create a frame iterator from a video file
pub fn load_video(path: &Path) -> Result<FrameIterator> {
    let decoder = VideoDecoder::new(path)?;
    Ok(FrameIterator::new(decoder))
}
