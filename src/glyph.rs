use heapless::Vec;

use crate::ConfigurationFault;

/// Number of custom characters the HD44780 CGRAM holds in 5x8 mode
pub const MAX_GLYPHS: usize = 8;

/// One custom character: 8 rows top to bottom, the low 5 bits of each row are the pixels.
pub type Glyph = [u8; 8];

/// PacMan and ghost glyphs: pacman closed, pacman open, two ghost frames, heart, small dot, pacman
/// facing left.
pub const PACMAN_GLYPHS: [Glyph; 7] = [
    [0x00, 0x00, 0x0e, 0x1b, 0x1f, 0x1f, 0x0e, 0x00],
    [0x00, 0x00, 0x0f, 0x16, 0x1c, 0x1e, 0x0f, 0x00],
    [0x00, 0x0e, 0x19, 0x1d, 0x1f, 0x1f, 0x15, 0x00],
    [0x00, 0x0e, 0x13, 0x17, 0x1f, 0x1f, 0x1b, 0x00],
    [0x00, 0x0a, 0x1f, 0x1f, 0x1f, 0x0e, 0x04, 0x00],
    [0x00, 0x00, 0x0a, 0x0e, 0x0e, 0x04, 0x00, 0x00],
    [0x00, 0x00, 0x1e, 0x0d, 0x07, 0x0f, 0x1e, 0x00],
];

/// Up to 8 glyphs, loaded into CGRAM as a whole starting at slot 0.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GlyphTable {
    glyphs: Vec<Glyph, MAX_GLYPHS>,
}

impl GlyphTable {
    pub fn new() -> Self {
        Self { glyphs: Vec::new() }
    }

    pub fn from_slice(glyphs: &[Glyph]) -> Result<Self, ConfigurationFault> {
        let glyphs = Vec::from_slice(glyphs).map_err(|_| ConfigurationFault::TooManyGlyphs)?;
        Ok(Self { glyphs })
    }

    pub fn push(&mut self, glyph: Glyph) -> Result<(), ConfigurationFault> {
        self.glyphs
            .push(glyph)
            .map_err(|_| ConfigurationFault::TooManyGlyphs)
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Glyph> {
        self.glyphs.iter()
    }
}
