//! Quotecard
//!
//! Renders one fixed-layout "quote card" per input record: a headline quote,
//! a reflective sub-text, a brand header, theme iconography and decorative
//! dividers, composited onto a high-resolution gradient background and
//! exported as an uncompressed PNG.
//!
//! # Pipeline
//!
//! - **Glyph rasterizer** ([`rendering::text`]): supersampled text blocks
//!   downscaled with Lanczos3, returning a tight-fit bitmap.
//! - **Layout engine** ([`rendering::layout`]): length-driven font tiers,
//!   wrapping and a vertical flow where every stage hangs off the measured
//!   bottom of the previous one.
//! - **Paint / raster** ([`rendering::paint`], [`rendering::raster`]): a
//!   back-to-front display list executed onto a fresh canvas per record.
//!
//! # Example
//!
//! ```no_run
//! use quotecard::{assets::Assets, rendering::CardRenderer, CardConfig, Record};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CardConfig::default();
//! let assets = Assets::builtin();
//! let renderer = CardRenderer::new(config)?;
//! let record = Record::new("1", "每个人都有自己的时区", "完美主义是进步的敌人");
//! let card = renderer.compose(&record, &assets)?;
//! println!("{}x{}", card.width(), card.height());
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{Error, Result};

pub mod assets;
pub mod batch;
pub mod output;
pub mod records;
pub mod rendering;

pub use records::Record;

/// An 8-bit straight-alpha colour, serialized as `[r, g, b, a]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color(pub u8, pub u8, pub u8, pub u8);

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color(r, g, b, 255)
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color(r, g, b, a)
    }
}

/// Full configuration for a card renderer.
///
/// Built once per batch and handed to [`rendering::CardRenderer::new`]; the
/// renderer never mutates it. Every field has a default, so a JSON config
/// file only needs to name what it overrides:
///
/// ```
/// let cfg: quotecard::CardConfig =
///     serde_json::from_str(r#"{ "export": { "dpi": 150 } }"#).unwrap();
/// assert_eq!(cfg.export.dpi, 150);
/// assert_eq!(cfg.canvas.width, 2160);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CardConfig {
    /// Output canvas dimensions
    pub canvas: CanvasSize,
    /// Colours for every painted element
    pub palette: Palette,
    /// Font sizes, spacing and supersampling
    pub typography: Typography,
    /// Offsets and gaps of the vertical flow
    pub layout: LayoutConfig,
    /// File naming and PNG metadata
    pub export: ExportConfig,
    /// Brand title shown next to the logo
    pub brand: BrandConfig,
}

impl CardConfig {
    /// Reject configurations the pipeline cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(Error::ConfigError("canvas dimensions must be non-zero".into()));
        }
        let ss = self.typography.supersample;
        if !(1..=8).contains(&ss) {
            return Err(Error::ConfigError(format!(
                "supersample factor must be within 1..=8, got {}",
                ss
            )));
        }
        for (name, spacing) in [
            ("quote_line_spacing", self.typography.quote_line_spacing),
            ("reflection_line_spacing", self.typography.reflection_line_spacing),
        ] {
            if !spacing.is_finite() || spacing < 1.0 {
                return Err(Error::ConfigError(format!("{} must be >= 1.0", name)));
            }
        }
        let step = self.layout.fit_step;
        if !(step > 0.0 && step < 1.0) {
            return Err(Error::ConfigError("fit_step must be within (0, 1)".into()));
        }
        if self.export.dpi == 0 {
            return Err(Error::ConfigError("dpi must be non-zero".into()));
        }
        Ok(())
    }

    /// Copy with every pixel dimension multiplied by `factor`.
    ///
    /// Colours, line spacing, supersampling and the fit step are unchanged.
    /// Useful for quick previews and tests; dimensions never drop below one
    /// pixel.
    pub fn scaled(&self, factor: f32) -> CardConfig {
        let px = |v: u32| ((v as f32 * factor).round() as u32).max(1);
        let t = &self.typography;
        let l = &self.layout;
        CardConfig {
            canvas: CanvasSize {
                width: px(self.canvas.width),
                height: px(self.canvas.height),
            },
            palette: self.palette.clone(),
            typography: Typography {
                quote_base_size: px(t.quote_base_size),
                reflection_base_size: px(t.reflection_base_size),
                title_size: px(t.title_size),
                theme_label_size: px(t.theme_label_size),
                quote_mark_size: px(t.quote_mark_size),
                pad_x: px(t.pad_x),
                pad_y: px(t.pad_y),
                min_font_size: px(t.min_font_size),
                ..t.clone()
            },
            layout: LayoutConfig {
                margin_x: px(l.margin_x),
                margin_bottom: px(l.margin_bottom),
                logo_origin: (px(l.logo_origin.0), px(l.logo_origin.1)),
                logo_size: px(l.logo_size),
                logo_ring_gap: px(l.logo_ring_gap),
                logo_shadow_offset: px(l.logo_shadow_offset),
                title_gap: px(l.title_gap),
                underline_gap: px(l.underline_gap),
                gap_header_icon: px(l.gap_header_icon),
                theme_icon_size: px(l.theme_icon_size),
                gap_icon_label: px(l.gap_icon_label),
                gap_label_divider: px(l.gap_label_divider),
                gap_divider_block: px(l.gap_divider_block),
                backdrop_pad_x: px(l.backdrop_pad_x),
                backdrop_pad_y: px(l.backdrop_pad_y),
                backdrop_radius: px(l.backdrop_radius),
                gap_block_divider: px(l.gap_block_divider),
                gap_reflection_icon: px(l.gap_reflection_icon),
                secondary_icon_size: px(l.secondary_icon_size),
                gap_icon_line: px(l.gap_icon_line),
                corner_inset: px(l.corner_inset),
                corner_size: px(l.corner_size),
                grid_size: px(l.grid_size),
                fit_step: l.fit_step,
            },
            export: self.export.clone(),
            brand: self.brand.clone(),
        }
    }
}

/// Canvas dimensions in output pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasSize {
    fn default() -> Self {
        // 4K portrait
        Self {
            width: 2160,
            height: 3840,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub background_top: Color,
    pub background_bottom: Color,
    pub grid: Color,
    pub corner: Color,
    pub quote_text: Color,
    pub reflection_text: Color,
    pub title_text: Color,
    pub theme_label: Color,
    pub title_underline: Color,
    pub logo_ring: Color,
    pub logo_shadow: Color,
    pub quote_mark: Color,
    pub bottom_line: Color,
    /// Backdrop tint at the top edge of a text panel
    pub backdrop_top: Color,
    /// Backdrop tint at the bottom edge of a text panel
    pub backdrop_bottom: Color,
    pub placeholder_fill: Color,
    pub placeholder_border: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background_top: Color::rgb(245, 240, 230),
            background_bottom: Color::rgb(230, 220, 200),
            grid: Color::rgba(255, 255, 255, 15),
            corner: Color::rgba(160, 160, 160, 100),
            quote_text: Color::rgb(60, 60, 60),
            reflection_text: Color::rgb(120, 120, 120),
            title_text: Color::rgb(80, 80, 80),
            theme_label: Color::rgb(110, 110, 110),
            title_underline: Color::rgba(120, 120, 120, 150),
            logo_ring: Color::rgba(180, 180, 180, 80),
            logo_shadow: Color::rgba(0, 0, 0, 40),
            quote_mark: Color::rgba(150, 150, 150, 120),
            bottom_line: Color::rgba(140, 140, 140, 100),
            backdrop_top: Color::rgba(255, 255, 255, 35),
            backdrop_bottom: Color::rgba(255, 250, 240, 15),
            placeholder_fill: Color::rgba(200, 196, 188, 110),
            placeholder_border: Color::rgba(170, 165, 155, 140),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Typography {
    /// Base size of the quote before length tiers apply
    pub quote_base_size: u32,
    /// Base size of the reflection before length tiers apply
    pub reflection_base_size: u32,
    pub title_size: u32,
    pub theme_label_size: u32,
    pub quote_mark_size: u32,
    pub quote_line_spacing: f32,
    pub reflection_line_spacing: f32,
    /// Supersampling factor used by the text rasterizer
    pub supersample: u32,
    /// Horizontal padding around a text bitmap, in output pixels
    pub pad_x: u32,
    /// Vertical padding around a text bitmap, in output pixels
    pub pad_y: u32,
    /// Smallest size the fit pass may shrink a text block to
    pub min_font_size: u32,
}

impl Default for Typography {
    fn default() -> Self {
        Self {
            quote_base_size: 160,
            reflection_base_size: 110,
            title_size: 85,
            theme_label_size: 60,
            quote_mark_size: 80,
            quote_line_spacing: 1.8,
            reflection_line_spacing: 1.7,
            supersample: 4,
            pad_x: 10,
            pad_y: 15,
            min_font_size: 12,
        }
    }
}

/// Gaps and fixed offsets of the vertical flow.
///
/// Only `logo_origin` is absolute; every other vertical value is a gap added
/// to the measured bottom of the preceding stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub margin_x: u32,
    pub margin_bottom: u32,
    pub logo_origin: (u32, u32),
    pub logo_size: u32,
    pub logo_ring_gap: u32,
    pub logo_shadow_offset: u32,
    pub title_gap: u32,
    pub underline_gap: u32,
    pub gap_header_icon: u32,
    pub theme_icon_size: u32,
    pub gap_icon_label: u32,
    pub gap_label_divider: u32,
    pub gap_divider_block: u32,
    pub backdrop_pad_x: u32,
    pub backdrop_pad_y: u32,
    pub backdrop_radius: u32,
    pub gap_block_divider: u32,
    pub gap_reflection_icon: u32,
    pub secondary_icon_size: u32,
    pub gap_icon_line: u32,
    pub corner_inset: u32,
    pub corner_size: u32,
    pub grid_size: u32,
    /// Scale applied to both text blocks per fit iteration
    pub fit_step: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            margin_x: 60,
            margin_bottom: 160,
            logo_origin: (160, 160),
            logo_size: 360,
            logo_ring_gap: 30,
            logo_shadow_offset: 8,
            title_gap: 80,
            underline_gap: 15,
            gap_header_icon: 110,
            theme_icon_size: 140,
            gap_icon_label: 30,
            gap_label_divider: 70,
            gap_divider_block: 70,
            backdrop_pad_x: 56,
            backdrop_pad_y: 40,
            backdrop_radius: 36,
            gap_block_divider: 90,
            gap_reflection_icon: 70,
            secondary_icon_size: 100,
            gap_icon_line: 60,
            corner_inset: 50,
            corner_size: 100,
            grid_size: 100,
            fit_step: 0.92,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Resolution written to the PNG pHYs chunk
    pub dpi: u32,
    /// Appended to the record id to form the file stem
    pub suffix: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            suffix: "_card".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrandConfig {
    pub title: String,
}

impl Default for BrandConfig {
    fn default() -> Self {
        Self {
            title: "每天一点心理学".to_string(),
        }
    }
}
