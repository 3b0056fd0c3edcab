//! Glyph sources for the text rasterizer
//!
//! A [`GlyphSource`] answers two questions for a character at a pixel size:
//! how far the pen advances and which coverage bitmap to stamp. Sources are
//! loaded once per batch and only read afterwards.
//!
//! Fonts are resolved in tiers: a custom font file, then platform fonts
//! (feature `system-fonts`), then [`BuiltinGlyphs`], which always succeeds.

use std::path::{Path, PathBuf};

use fontdue::{Font, FontSettings};
use log::{debug, info, warn};

use crate::{Error, Result};

/// Ink extent of a glyph relative to its pen origin on the baseline.
///
/// Y grows downwards, so `top` is negative for ink above the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InkBox {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl InkBox {
    pub fn width(&self) -> u32 {
        (self.right - self.left).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        (self.bottom - self.top).max(0) as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphMetrics {
    pub advance: f32,
    /// `None` for glyphs without ink (spaces, control characters)
    pub ink: Option<InkBox>,
}

/// A rasterized glyph: one coverage byte per pixel of its ink box.
#[derive(Debug, Clone)]
pub struct GlyphCoverage {
    pub metrics: GlyphMetrics,
    pub width: usize,
    pub height: usize,
    pub coverage: Vec<u8>,
}

impl GlyphCoverage {
    fn empty(metrics: GlyphMetrics) -> Self {
        Self {
            metrics,
            width: 0,
            height: 0,
            coverage: Vec::new(),
        }
    }
}

/// Where the active glyph source came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontTier {
    Custom(PathBuf),
    System(PathBuf),
    Builtin,
}

pub trait GlyphSource: Send + Sync {
    fn name(&self) -> &str;
    fn metrics(&self, ch: char, px: f32) -> GlyphMetrics;
    fn rasterize(&self, ch: char, px: f32) -> GlyphCoverage;
}

/// Outline glyphs from a TrueType/OpenType font, rasterized by fontdue.
///
/// Characters the font has no glyph for are drawn with [`BuiltinGlyphs`] so a
/// Latin-only system font still produces visible boxes for Han text.
pub struct FontdueGlyphs {
    name: String,
    font: Font,
}

impl FontdueGlyphs {
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Result<Self> {
        let name = name.into();
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| Error::AssetError(format!("failed to parse font {}: {}", name, e)))?;
        Ok(Self { name, font })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| Error::AssetError(format!("failed to read font {}: {}", path.display(), e)))?;
        Self::from_bytes(path.display().to_string(), &bytes)
    }

    fn covers(&self, ch: char) -> bool {
        ch.is_whitespace() || self.font.lookup_glyph_index(ch) != 0
    }
}

fn ink_from_fontdue(m: &fontdue::Metrics) -> Option<InkBox> {
    if m.width == 0 || m.height == 0 {
        return None;
    }
    Some(InkBox {
        left: m.xmin,
        top: -(m.ymin + m.height as i32),
        right: m.xmin + m.width as i32,
        bottom: -m.ymin,
    })
}

impl GlyphSource for FontdueGlyphs {
    fn name(&self) -> &str {
        &self.name
    }

    fn metrics(&self, ch: char, px: f32) -> GlyphMetrics {
        if !self.covers(ch) {
            return BuiltinGlyphs.metrics(ch, px);
        }
        let m = self.font.metrics(ch, px);
        GlyphMetrics {
            advance: m.advance_width,
            ink: ink_from_fontdue(&m),
        }
    }

    fn rasterize(&self, ch: char, px: f32) -> GlyphCoverage {
        if !self.covers(ch) {
            return BuiltinGlyphs.rasterize(ch, px);
        }
        let (m, bitmap) = self.font.rasterize(ch, px);
        let metrics = GlyphMetrics {
            advance: m.advance_width,
            ink: ink_from_fontdue(&m),
        };
        if metrics.ink.is_none() {
            return GlyphCoverage::empty(metrics);
        }
        GlyphCoverage {
            metrics,
            width: m.width,
            height: m.height,
            coverage: bitmap,
        }
    }
}

/// Minimal built-in glyphs: every visible character is an outlined box.
///
/// Han and other non-ASCII characters get a full-em advance, ASCII a 0.6em
/// advance. Output depends only on the character class and size, so renders
/// are reproducible on any host.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinGlyphs;

impl BuiltinGlyphs {
    fn stroke(px: f32) -> usize {
        ((px / 12.0).round() as usize).max(1)
    }
}

impl GlyphSource for BuiltinGlyphs {
    fn name(&self) -> &str {
        "builtin-box"
    }

    fn metrics(&self, ch: char, px: f32) -> GlyphMetrics {
        if ch == '\u{3000}' {
            return GlyphMetrics { advance: px, ink: None };
        }
        if ch.is_whitespace() || ch.is_control() {
            return GlyphMetrics {
                advance: (px * 0.5).round(),
                ink: None,
            };
        }
        let (advance, left, right, top, bottom) = if ch.is_ascii() {
            (0.6, 0.06, 0.54, -0.70, 0.0)
        } else {
            (1.0, 0.10, 0.90, -0.82, 0.06)
        };
        let left = (px * left).round() as i32;
        let top = (px * top).round() as i32;
        let ink = InkBox {
            left,
            top,
            right: ((px * right).round() as i32).max(left + 1),
            bottom: ((px * bottom).round() as i32).max(top + 1),
        };
        GlyphMetrics {
            advance: (px * advance).round(),
            ink: Some(ink),
        }
    }

    fn rasterize(&self, ch: char, px: f32) -> GlyphCoverage {
        let metrics = self.metrics(ch, px);
        let Some(ink) = metrics.ink else {
            return GlyphCoverage::empty(metrics);
        };
        let (w, h) = (ink.width() as usize, ink.height() as usize);
        let t = Self::stroke(px);
        let mut coverage = vec![0u8; w * h];
        for y in 0..h {
            for x in 0..w {
                let edge = x < t || y < t || x + t >= w || y + t >= h;
                if edge {
                    coverage[y * w + x] = 255;
                }
            }
        }
        GlyphCoverage {
            metrics,
            width: w,
            height: h,
            coverage,
        }
    }
}

/// Platform font files tried when the custom font is unavailable.
#[cfg(feature = "system-fonts")]
pub const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/google-noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
    "/usr/share/fonts/truetype/droid/DroidSansFallbackFull.ttf",
    "/System/Library/Fonts/PingFang.ttc",
    "/System/Library/Fonts/STHeiti Medium.ttc",
    "/Library/Fonts/Arial Unicode.ttf",
    "C:/Windows/Fonts/msyh.ttc",
    "C:/Windows/Fonts/simhei.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
];

#[cfg(not(feature = "system-fonts"))]
pub const SYSTEM_FONT_CANDIDATES: &[&str] = &[];

/// Resolve the glyph source for a batch. Never fails: every tier that cannot
/// be used is logged and the next one is tried.
pub fn load_glyphs(custom: Option<&Path>) -> (Box<dyn GlyphSource>, FontTier) {
    if let Some(path) = custom {
        match FontdueGlyphs::from_path(path) {
            Ok(font) => {
                info!("Loaded custom font {}", path.display());
                return (Box::new(font), FontTier::Custom(path.to_path_buf()));
            }
            Err(e) => warn!("Custom font unavailable, trying system fonts: {}", e),
        }
    }

    for candidate in SYSTEM_FONT_CANDIDATES {
        let path = Path::new(candidate);
        if !path.is_file() {
            continue;
        }
        match FontdueGlyphs::from_path(path) {
            Ok(font) => {
                warn!("Falling back to system font {}", path.display());
                return (Box::new(font), FontTier::System(path.to_path_buf()));
            }
            Err(e) => debug!("Skipping system font: {}", e),
        }
    }

    warn!("No usable font found; rendering with built-in box glyphs");
    (Box::new(BuiltinGlyphs), FontTier::Builtin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_han_glyph_is_full_em() {
        let m = BuiltinGlyphs.metrics('时', 100.0);
        assert_eq!(m.advance, 100.0);
        let ink = m.ink.unwrap();
        assert!(ink.top < 0 && ink.bottom > 0);
        assert_eq!(ink.width(), 80);
    }

    #[test]
    fn builtin_space_has_no_ink() {
        let g = BuiltinGlyphs.rasterize(' ', 64.0);
        assert!(g.metrics.ink.is_none());
        assert!(g.coverage.is_empty());
        assert!(g.metrics.advance > 0.0);
    }

    #[test]
    fn builtin_box_has_hollow_centre() {
        let g = BuiltinGlyphs.rasterize('A', 120.0);
        assert_eq!(g.coverage.len(), g.width * g.height);
        assert_eq!(g.coverage[0], 255);
        let centre = (g.height / 2) * g.width + g.width / 2;
        assert_eq!(g.coverage[centre], 0);
    }

    #[test]
    fn tiny_sizes_still_have_ink() {
        let m = BuiltinGlyphs.metrics('x', 1.0);
        let ink = m.ink.unwrap();
        assert!(ink.width() >= 1 && ink.height() >= 1);
    }

    #[test]
    fn missing_custom_font_falls_back() {
        let (source, tier) = load_glyphs(Some(Path::new("/definitely/not/here.ttf")));
        assert_ne!(tier, FontTier::Custom(PathBuf::from("/definitely/not/here.ttf")));
        assert!(!source.name().is_empty());
    }

    #[test]
    fn garbage_font_bytes_are_rejected() {
        let err = FontdueGlyphs::from_bytes("junk", b"not a font").err().unwrap();
        assert!(matches!(err, Error::AssetError(_)));
    }
}
