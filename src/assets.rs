//! Batch-wide assets: glyph source, logo and icons
//!
//! Loaded once before the first record and shared read-only. Loading never
//! fails; anything missing is logged and replaced at paint time by a neutral
//! placeholder tile of the same size.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use log::{debug, info, warn};

use crate::rendering::glyph::{load_glyphs, BuiltinGlyphs, FontTier, GlyphSource};
use crate::rendering::theme::Theme;
use crate::{Color, Palette};

/// Icon slug drawn below the reflection block
pub const SECONDARY_ICON: &str = "secondary";

/// Where [`Assets::load`] looks for its inputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPaths {
    pub logo: PathBuf,
    /// Directory holding `<slug>.png` per theme plus `secondary.png`
    pub icons_dir: PathBuf,
    pub font: PathBuf,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            logo: PathBuf::from("resources/logo.png"),
            icons_dir: PathBuf::from("resources/icons"),
            font: PathBuf::from("resources/fonts/SmileySans-Oblique.ttf"),
        }
    }
}

pub struct Assets {
    glyphs: Box<dyn GlyphSource>,
    font_tier: FontTier,
    logo: Option<RgbaImage>,
    icons: HashMap<String, RgbaImage>,
}

impl fmt::Debug for Assets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assets")
            .field("glyphs", &self.glyphs.name())
            .field("font_tier", &self.font_tier)
            .field("logo", &self.logo.as_ref().map(|l| l.dimensions()))
            .field("icons", &self.icons.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn load_raster(path: &Path) -> Option<RgbaImage> {
    if !path.is_file() {
        return None;
    }
    match image::open(path) {
        Ok(img) => Some(img.to_rgba8()),
        Err(e) => {
            warn!("Failed to decode {}: {}", path.display(), e);
            None
        }
    }
}

impl Assets {
    pub fn load(paths: &AssetPaths) -> Self {
        let (glyphs, font_tier) = load_glyphs(Some(&paths.font));

        let logo = load_raster(&paths.logo);
        match &logo {
            Some(img) => info!("Loaded logo {} ({}x{})", paths.logo.display(), img.width(), img.height()),
            None => warn!("Logo {} unavailable, using placeholder", paths.logo.display()),
        }

        let mut assets = Self {
            glyphs,
            font_tier,
            logo,
            icons: HashMap::new(),
        };
        let slugs = Theme::ALL.iter().map(|t| t.slug()).chain(std::iter::once(SECONDARY_ICON));
        for slug in slugs {
            let path = paths.icons_dir.join(format!("{}.png", slug));
            match load_raster(&path) {
                Some(img) => {
                    debug!("Loaded icon {}", path.display());
                    assets = assets.with_icon(slug, img);
                }
                None => warn!("Icon {} unavailable, using placeholder", path.display()),
            }
        }
        assets
    }

    /// Built-in glyphs and no rasters; every image slot becomes a placeholder.
    pub fn builtin() -> Self {
        Self {
            glyphs: Box::new(BuiltinGlyphs),
            font_tier: FontTier::Builtin,
            logo: None,
            icons: HashMap::new(),
        }
    }

    pub fn with_icon(mut self, slug: impl Into<String>, icon: RgbaImage) -> Self {
        self.icons.insert(slug.into(), icon);
        self
    }

    pub fn glyphs(&self) -> &dyn GlyphSource {
        self.glyphs.as_ref()
    }

    pub fn font_tier(&self) -> &FontTier {
        &self.font_tier
    }

    pub fn logo(&self) -> Option<&RgbaImage> {
        self.logo.as_ref()
    }

    pub fn icon(&self, slug: &str) -> Option<&RgbaImage> {
        self.icons.get(slug)
    }
}

/// Neutral square standing in for a missing raster.
pub fn placeholder_tile(size: u32, palette: &Palette) -> RgbaImage {
    let size = size.max(1);
    let border = (size / 24).max(1);
    let Color(fr, fg, fb, fa) = palette.placeholder_fill;
    let Color(br, bg, bb, ba) = palette.placeholder_border;
    RgbaImage::from_fn(size, size, |x, y| {
        let edge = x < border || y < border || x >= size - border || y >= size - border;
        if edge {
            image::Rgba([br, bg, bb, ba])
        } else {
            image::Rgba([fr, fg, fb, fa])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_degrades_to_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AssetPaths {
            logo: dir.path().join("nope.png"),
            icons_dir: dir.path().join("icons"),
            font: dir.path().join("nope.ttf"),
        };
        let assets = Assets::load(&paths);
        assert!(assets.logo().is_none());
        assert!(assets.icon("time").is_none());
        assert_ne!(assets.font_tier(), &FontTier::Custom(paths.font.clone()));
    }

    #[test]
    fn icons_are_found_by_slug() {
        let dir = tempfile::tempdir().unwrap();
        let icons = dir.path().join("icons");
        std::fs::create_dir_all(&icons).unwrap();
        RgbaImage::from_pixel(8, 8, image::Rgba([1, 2, 3, 255]))
            .save(icons.join("growth.png"))
            .unwrap();
        RgbaImage::from_pixel(4, 4, image::Rgba([9, 9, 9, 255]))
            .save(icons.join("secondary.png"))
            .unwrap();
        let paths = AssetPaths {
            icons_dir: icons,
            ..AssetPaths::default()
        };
        let assets = Assets::load(&paths);
        assert_eq!(assets.icon("growth").map(|i| i.dimensions()), Some((8, 8)));
        assert_eq!(assets.icon(SECONDARY_ICON).map(|i| i.dimensions()), Some((4, 4)));
    }

    #[test]
    fn placeholder_has_requested_size_and_border() {
        let palette = Palette::default();
        let tile = placeholder_tile(48, &palette);
        assert_eq!(tile.dimensions(), (48, 48));
        assert_eq!(tile.get_pixel(0, 0).0[3], palette.placeholder_border.3);
        assert_eq!(tile.get_pixel(24, 24).0[3], palette.placeholder_fill.3);
    }
}
