/// 4 characters, minimal detail
pub const SHORT_RAMP: &str = " .:|";

/// 10 characters, balanced (default)
pub const MEDIUM_RAMP: &str = " .:-=+*#%@";

/// 70 characters, maximum detail
pub const LONG_RAMP: &str =
    " .'`^\",:;Il!i><~+_-?][}{1)(|\\/tfjrxnuvczXYUJCLQ0OZmwqpdbkhao*#MW&8%B@$";

/// Block character ramp for a more solid appearance
pub const BLOCKS_RAMP: &str = " ░▒▓█";

/// Names accepted by [`get_charset`] without falling back.
pub const CHARSET_NAMES: &[&str] = &["short", "medium", "long", "blocks"];

/// An ordered glyph ramp, darkest glyph first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charset {
    name: &'static str,
    glyphs: Vec<char>,
}

impl Charset {
    fn from_ramp(name: &'static str, ramp: &str) -> Self {
        Self {
            name,
            glyphs: ramp.chars().collect(),
        }
    }

    /// Preset name this ramp was resolved to
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn glyphs(&self) -> &[char] {
        &self.glyphs
    }

    /// Number of glyphs in the ramp (never zero)
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Glyph at `index`, saturating at the densest glyph.
    pub fn glyph(&self, index: usize) -> char {
        self.glyphs[index.min(self.glyphs.len() - 1)]
    }
}

impl Default for Charset {
    fn default() -> Self {
        Self::from_ramp("medium", MEDIUM_RAMP)
    }
}

/// Resolve a preset name to its glyph ramp.
///
/// Unknown names, including the empty string, resolve to `medium`.
pub fn get_charset(name: &str) -> Charset {
    match name {
        "short" => Charset::from_ramp("short", SHORT_RAMP),
        "medium" => Charset::from_ramp("medium", MEDIUM_RAMP),
        "long" => Charset::from_ramp("long", LONG_RAMP),
        "blocks" => Charset::from_ramp("blocks", BLOCKS_RAMP),
        _ => Charset::default(),
    }
}
