use crate::charset::Charset;
use crate::decoder::VideoFrame;
use crate::{ReelError, Result};
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma, Pixel, Rgb};
use log::debug;
use std::ops::Deref;

/// Largest character grid, in cells, a frame may be rasterized into
pub const MAX_CELLS: u32 = 1 << 24;

/// How a rasterized frame is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Glyphs only, rows separated by newlines
    Plain,
    /// True-color escapes written as raw bytes, ready for the terminal
    ColorRaw,
    /// True-color escapes encoded as the body of a JSON string literal
    ColorJson,
}

impl OutputMode {
    fn line_break(self) -> &'static str {
        match self {
            OutputMode::ColorJson => "\\n",
            _ => "\n",
        }
    }

    fn row_reset(self) -> &'static str {
        match self {
            OutputMode::Plain => "",
            OutputMode::ColorRaw => "\x1b[0m",
            OutputMode::ColorJson => "\\u001b[0m",
        }
    }
}

/// A pixel format the rasterizer can sample.
pub trait CellSample: Pixel<Subpixel = u8> + 'static {
    /// Brightness used to pick a glyph
    fn luma(&self) -> u8;

    /// Foreground color as (red, green, blue)
    fn rgb(&self) -> (u8, u8, u8);
}

/// Color pixels keep the decoder's channel order: blue, green, red.
impl CellSample for Rgb<u8> {
    fn luma(&self) -> u8 {
        let [b, g, r] = self.0;
        luma(r, g, b)
    }

    fn rgb(&self) -> (u8, u8, u8) {
        let [b, g, r] = self.0;
        (r, g, b)
    }
}

impl CellSample for Luma<u8> {
    fn luma(&self) -> u8 {
        self.0[0]
    }

    fn rgb(&self) -> (u8, u8, u8) {
        let y = self.0[0];
        (y, y, y)
    }
}

/// Standard luma weighting, truncated to an integer
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    let y = 0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64;
    y.clamp(0.0, 255.0) as u8
}

/// Map a luma value onto a ramp of `len` glyphs
pub fn glyph_index(luma: u8, len: usize) -> usize {
    let index = (luma as f64 / 256.0 * len as f64) as usize;
    index.min(len.saturating_sub(1))
}

/// Video frame to ASCII converter
#[derive(Debug, Clone)]
pub struct FrameConverter {
    width: u32,
    charset: Charset,
}

impl FrameConverter {
    /// Create a converter producing `width` columns per row
    pub fn new(width: u32, charset: Charset) -> Result<Self> {
        if width == 0 {
            return Err(ReelError::InvalidConfig(
                "Output width must be greater than 0".to_string(),
            ));
        }
        Ok(Self { width, charset })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn charset(&self) -> &Charset {
        &self.charset
    }

    /// Rows produced for a source of the given size.
    ///
    /// Character cells are treated as twice as tall as they are wide. Grids larger
    /// than [`MAX_CELLS`] are rejected.
    pub fn output_height(&self, src_width: u32, src_height: u32) -> Result<u32> {
        let cell_width = src_width as f32 / self.width as f32;
        let cell_height = cell_width * 2.0;
        if !cell_height.is_finite() || cell_height <= 0.0 {
            return Err(ReelError::InvalidConfig(format!(
                "Cannot rasterize a {}x{} frame into {} columns",
                src_width, src_height, self.width
            )));
        }
        let rows = (src_height as f32 / cell_height) as u32;
        match self.width.checked_mul(rows) {
            Some(cells) if cells <= MAX_CELLS => Ok(rows),
            _ => Err(ReelError::InvalidConfig(format!(
                "A {}x{} frame at {} columns needs {} rows, more than {} cells",
                src_width, src_height, self.width, rows, MAX_CELLS
            ))),
        }
    }

    /// Convert a decoded frame in the given mode.
    ///
    /// Plain output reduces the frame to luma before resizing, colorized output
    /// resizes the color frame.
    pub fn convert_frame(&self, frame: &VideoFrame, mode: OutputMode) -> Result<String> {
        let image: ImageBuffer<Rgb<u8>, &[u8]> =
            ImageBuffer::from_raw(frame.width, frame.height, frame.data.as_slice()).ok_or_else(
                || {
                    ReelError::Decode(format!(
                        "Frame {} holds {} bytes, expected {}x{}x3",
                        frame.frame_number,
                        frame.data.len(),
                        frame.width,
                        frame.height
                    ))
                },
            )?;

        match mode {
            OutputMode::Plain => {
                let gray: ImageBuffer<Luma<u8>, Vec<u8>> =
                    ImageBuffer::from_fn(frame.width, frame.height, |x, y| {
                        Luma([image.get_pixel(x, y).luma()])
                    });
                self.rasterize(&gray, mode)
            }
            OutputMode::ColorRaw | OutputMode::ColorJson => self.rasterize(&image, mode),
        }
    }

    /// Resize `image` to the character grid and emit one glyph per cell
    pub fn rasterize<P, C>(&self, image: &ImageBuffer<P, C>, mode: OutputMode) -> Result<String>
    where
        P: CellSample,
        C: Deref<Target = [u8]>,
    {
        let (src_width, src_height) = image.dimensions();
        let rows = self.output_height(src_width, src_height)?;
        if rows == 0 {
            debug!("Frame {}x{} yields no rows at width {}", src_width, src_height, self.width);
            return Ok(String::new());
        }

        let resized = imageops::resize(image, self.width, rows, FilterType::Triangle);
        let glyph_count = self.charset.len();

        let cell_bytes = match mode {
            OutputMode::Plain => 4,
            _ => 24,
        };
        let cells = self.width as usize * rows as usize;
        let mut out = String::with_capacity(cell_bytes * cells);

        for (y, row) in resized.rows().enumerate() {
            if y > 0 {
                out.push_str(mode.line_break());
            }
            for pixel in row {
                let glyph = self.charset.glyph(glyph_index(pixel.luma(), glyph_count));
                let (r, g, b) = pixel.rgb();
                match mode {
                    OutputMode::Plain => out.push(glyph),
                    OutputMode::ColorRaw => {
                        out.push_str(&format!("\x1b[38;2;{};{};{}m", r, g, b));
                        out.push(glyph);
                    }
                    OutputMode::ColorJson => {
                        out.push_str(&format!("\\u001b[38;2;{};{};{}m", r, g, b));
                        match glyph {
                            '\\' => out.push_str("\\\\"),
                            '"' => out.push_str("\\\""),
                            _ => out.push(glyph),
                        }
                    }
                }
            }
            out.push_str(mode.row_reset());
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset::get_charset;

    fn converter(width: u32, charset: &str) -> FrameConverter {
        FrameConverter::new(width, get_charset(charset)).unwrap()
    }

    /// Frame whose pixels run through every gray level left to right
    fn gradient_frame(width: u32, height: u32) -> VideoFrame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for _ in 0..height {
            for x in 0..width {
                let level = (x * 255 / (width - 1)) as u8;
                data.extend_from_slice(&[level, level, level]);
            }
        }
        VideoFrame {
            data,
            width,
            height,
            frame_number: 1,
        }
    }

    #[test]
    fn test_luminance_calculation() {
        assert_eq!(luma(255, 255, 255), 255);
        assert_eq!(luma(0, 0, 0), 0);
        assert_eq!(luma(255, 0, 0), 76);
        assert_eq!(luma(0, 255, 0), 149);
        assert_eq!(luma(0, 0, 255), 29);
    }

    #[test]
    fn test_bgr_channel_order() {
        let pixel = Rgb([10u8, 20, 30]);
        assert_eq!(pixel.rgb(), (30, 20, 10));
        assert_eq!(pixel.luma(), luma(30, 20, 10));
    }

    #[test]
    fn test_char_index_mapping() {
        assert_eq!(glyph_index(0, 10), 0);
        assert_eq!(glyph_index(255, 10), 9);
        assert_eq!(glyph_index(25, 10), 0);
        assert_eq!(glyph_index(26, 10), 1);
        assert_eq!(glyph_index(255, 70), 69);
        assert_eq!(glyph_index(255, 1), 0);
    }

    #[test]
    fn test_glyph_index_is_monotonic() {
        for len in [1, 4, 5, 10, 70] {
            for y in 0..255u8 {
                assert!(glyph_index(y, len) <= glyph_index(y + 1, len));
                assert!(glyph_index(y + 1, len) < len);
            }
        }
    }

    #[test]
    fn test_zero_width_rejected() {
        let result = FrameConverter::new(0, get_charset("medium"));
        assert!(matches!(result, Err(ReelError::InvalidConfig(_))));
    }

    #[test]
    fn test_output_height() {
        let conv = converter(120, "medium");
        assert_eq!(conv.output_height(1920, 1080).unwrap(), 33);
        assert_eq!(converter(2, "medium").output_height(2, 2).unwrap(), 1);
        assert_eq!(converter(80, "medium").output_height(40, 20).unwrap(), 20);
        assert!(matches!(
            conv.output_height(0, 100),
            Err(ReelError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_oversized_grid_rejected() {
        let tiny = VideoFrame::filled(2, 2, [0, 0, 0]);
        for width in [100_000, 4_000_000_000] {
            let result = converter(width, "medium").convert_frame(&tiny, OutputMode::Plain);
            assert!(matches!(result, Err(ReelError::InvalidConfig(_))), "{width}");
        }

        // 4096 columns by 4096 rows is exactly the limit
        let conv = converter(4096, "medium");
        assert_eq!(conv.output_height(4096, 8192).unwrap(), 4096);
        assert!(conv.output_height(4096, 8194).is_err());
    }

    #[test]
    fn test_black_frame_maps_to_first_glyph() {
        let conv = converter(2, "medium");
        let frame = VideoFrame::filled(2, 2, [0, 0, 0]);

        assert_eq!(conv.convert_frame(&frame, OutputMode::Plain).unwrap(), "  ");
        assert_eq!(
            conv.convert_frame(&frame, OutputMode::ColorRaw).unwrap(),
            "\x1b[38;2;0;0;0m \x1b[38;2;0;0;0m \x1b[0m"
        );
    }

    #[test]
    fn test_white_frame_maps_to_last_glyph() {
        let conv = converter(2, "medium");
        let frame = VideoFrame::filled(2, 2, [255, 255, 255]);

        assert_eq!(conv.convert_frame(&frame, OutputMode::Plain).unwrap(), "@@");
        assert_eq!(
            conv.convert_frame(&frame, OutputMode::ColorJson).unwrap(),
            "\\u001b[38;2;255;255;255m@\\u001b[38;2;255;255;255m@\\u001b[0m"
        );
    }

    #[test]
    fn test_color_is_emitted_as_rgb() {
        // blue, green, red bytes
        let frame = VideoFrame::filled(4, 4, [30, 20, 10]);
        let out = converter(2, "medium")
            .convert_frame(&frame, OutputMode::ColorRaw)
            .unwrap();
        assert!(out.starts_with("\x1b[38;2;10;20;30m"));
    }

    #[test]
    fn test_plain_grid_dimensions() {
        let frame = gradient_frame(160, 120);
        let out = converter(40, "long")
            .convert_frame(&frame, OutputMode::Plain)
            .unwrap();

        let lines: Vec<&str> = out.split('\n').collect();
        assert_eq!(lines.len(), 15);
        for line in lines {
            assert_eq!(line.chars().count(), 40);
        }
        assert!(!out.ends_with('\n'));
    }

    #[test]
    fn test_colorized_grid_dimensions() {
        let frame = gradient_frame(160, 120);
        let out = converter(40, "blocks")
            .convert_frame(&frame, OutputMode::ColorRaw)
            .unwrap();

        let lines: Vec<&str> = out.split('\n').collect();
        assert_eq!(lines.len(), 15);
        for line in lines {
            assert_eq!(line.matches("\x1b[38;2;").count(), 40);
            assert!(line.ends_with("\x1b[0m"));
        }
    }

    #[test]
    fn test_json_mode_parses_back_to_raw_mode() {
        let conv = converter(64, "long");
        let frame = gradient_frame(256, 64);

        let raw = conv.convert_frame(&frame, OutputMode::ColorRaw).unwrap();
        let escaped = conv.convert_frame(&frame, OutputMode::ColorJson).unwrap();
        assert!(!escaped.contains('\x1b'));
        assert!(!escaped.contains('\n'));

        let parsed: String = serde_json::from_str(&format!("\"{}\"", escaped)).unwrap();
        assert_eq!(parsed, raw);
    }

    #[test]
    fn test_json_mode_escapes_quote_and_backslash() {
        // Gray levels 20 and 105 select '"' (index 5) and '\\' (index 28)
        let conv = converter(1, "long");
        let quote = VideoFrame::filled(1, 2, [20, 20, 20]);
        let backslash = VideoFrame::filled(1, 2, [105, 105, 105]);

        let out = conv.convert_frame(&quote, OutputMode::ColorJson).unwrap();
        assert!(out.contains("m\\\"\\u001b[0m"), "{out}");
        let out = conv.convert_frame(&backslash, OutputMode::ColorJson).unwrap();
        assert!(out.contains("m\\\\\\u001b[0m"), "{out}");
    }

    #[test]
    fn test_row_count_edges() {
        let conv = converter(8, "medium");
        let tall_enough = VideoFrame::filled(4, 1, [0, 0, 0]);
        assert_eq!(conv.convert_frame(&tall_enough, OutputMode::Plain).unwrap().len(), 8);

        let conv = converter(2, "medium");
        let strip = VideoFrame::filled(8, 4, [0, 0, 0]);
        assert_eq!(conv.convert_frame(&strip, OutputMode::Plain).unwrap(), "");
    }

    #[test]
    fn test_frame_size_mismatch() {
        let frame = VideoFrame {
            data: vec![0; 5],
            width: 2,
            height: 2,
            frame_number: 7,
        };
        let result = converter(2, "medium").convert_frame(&frame, OutputMode::ColorRaw);
        assert!(matches!(result, Err(ReelError::Decode(_))));
    }
}
