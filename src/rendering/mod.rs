//! Card rendering: text rasterizer, layout engine and paint/raster stages
//!
//! [`CardRenderer::compose`] runs the whole pipeline for one record:
//! plan the layout from text measurements, render each text block, record a
//! back-to-front paint list and execute it on a fresh canvas.

use std::borrow::Cow;

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage, RgbaImage};
use log::{debug, warn};
use sha2::{Digest, Sha256};

use crate::assets::{placeholder_tile, Assets, SECONDARY_ICON};
use crate::{CardConfig, Color, Record, Result};

pub mod glyph;
pub mod layout;
pub mod paint;
pub mod raster;
pub mod text;
pub mod theme;

use layout::{CardLayout, ElementType, Field, Rect, RenderSpec, CLOSE_QUOTE_MARK, OPEN_QUOTE_MARK};
use paint::{DividerStyle, PaintCommand};
use text::TextRasterizer;

/// Outline colour used by [`CardRenderer::debug_bounds`]
pub const DEBUG_OUTLINE: Color = Color::rgba(255, 0, 0, 100);

/// A composed card and the layout it was painted from.
#[derive(Debug, Clone)]
pub struct RenderedCard {
    pub image: RgbaImage,
    pub layout: CardLayout,
}

impl RenderedCard {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Drop the alpha channel for export. The background is opaque, so no
    /// matting is needed.
    pub fn flatten(&self) -> RgbImage {
        flatten(&self.image)
    }

    /// Hex SHA-256 over the dimensions and raw RGBA bytes.
    pub fn digest(&self) -> String {
        digest(&self.image)
    }
}

pub fn flatten(image: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let p = image.get_pixel(x, y).0;
        Rgb([p[0], p[1], p[2]])
    })
}

pub fn digest(image: &RgbaImage) -> String {
    let mut hasher = Sha256::new();
    hasher.update(image.width().to_le_bytes());
    hasher.update(image.height().to_le_bytes());
    hasher.update(image.as_raw());
    hex::encode(hasher.finalize())
}

/// Scale a raster to a `size`×`size` square, borrowing when it already fits.
fn fit_square(img: &RgbaImage, size: u32) -> Cow<'_, RgbaImage> {
    if img.dimensions() == (size, size) {
        Cow::Borrowed(img)
    } else {
        Cow::Owned(imageops::resize(img, size, size, FilterType::Lanczos3))
    }
}

fn center(rect: Rect) -> (f32, f32) {
    (
        rect.x as f32 + rect.width as f32 / 2.0,
        rect.y as f32 + rect.height as f32 / 2.0,
    )
}

/// Horizontal stroke filling `rect` top to bottom.
fn bar(rect: Rect, color: Color) -> PaintCommand<'static> {
    let y = rect.y as f32 + rect.height as f32 / 2.0;
    PaintCommand::Line {
        from: (rect.x as f32, y),
        to: (rect.right() as f32, y),
        width: rect.height as f32,
        color,
    }
}

pub struct CardRenderer {
    config: CardConfig,
}

impl CardRenderer {
    pub fn new(config: CardConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CardConfig {
        &self.config
    }

    fn rasterizer<'a>(&self, assets: &'a Assets) -> TextRasterizer<'a> {
        TextRasterizer::new(assets.glyphs(), &self.config.typography)
    }

    /// Validate `record` and place every element without painting.
    pub fn plan(&self, record: &Record, assets: &Assets) -> Result<CardLayout> {
        record.validate()?;
        layout::plan(record, &self.config, &self.rasterizer(assets))
    }

    /// Background layers shared by cards and bounds previews.
    fn background(&self) -> Vec<PaintCommand<'static>> {
        let cfg = &self.config;
        let p = &cfg.palette;
        let (w, h) = (cfg.canvas.width as f32, cfg.canvas.height as f32);
        let inset = cfg.layout.corner_inset as f32;
        let size = cfg.layout.corner_size as f32;
        vec![
            PaintCommand::VerticalGradient {
                top: p.background_top,
                bottom: p.background_bottom,
            },
            PaintCommand::Grid {
                spacing: cfg.layout.grid_size,
                color: p.grid,
            },
            PaintCommand::Polygon {
                points: vec![(inset, inset), (inset + size, inset), (inset, inset + size)],
                color: p.corner,
            },
            PaintCommand::Polygon {
                points: vec![
                    (w - inset, h - inset),
                    (w - inset - size, h - inset),
                    (w - inset, h - inset - size),
                ],
                color: p.corner,
            },
        ]
    }

    pub fn compose(&self, record: &Record, assets: &Assets) -> Result<RenderedCard> {
        let cfg = &self.config;
        let p = &cfg.palette;
        let t = &cfg.typography;
        let l = &cfg.layout;
        let rasterizer = self.rasterizer(assets);
        let layout = self.plan(record, assets)?;

        let title = rasterizer.render(&cfg.brand.title, t.title_size, p.title_text, 1.0);
        let label = rasterizer.render(layout.theme.label(), t.theme_label_size, p.theme_label, 1.0);
        let q = &layout.quote;
        let quote = rasterizer.render(&q.text, q.font_size, q.color, q.line_spacing);
        let r = &layout.reflection;
        let reflection = rasterizer.render(&r.text, r.font_size, r.color, r.line_spacing);
        let open_mark = rasterizer.render(OPEN_QUOTE_MARK, t.quote_mark_size, p.quote_mark, 1.0);
        let close_mark = rasterizer.render(CLOSE_QUOTE_MARK, t.quote_mark_size, p.quote_mark, 1.0);

        let placeholders = |size: u32| Cow::<RgbaImage>::Owned(placeholder_tile(size, p));
        let logo_img = match assets.logo() {
            Some(img) => fit_square(img, l.logo_size),
            None => placeholders(l.logo_size),
        };
        let theme_icon = match assets.icon(layout.theme.slug()) {
            Some(img) => fit_square(img, l.theme_icon_size),
            None => placeholders(l.theme_icon_size),
        };
        let secondary_icon = match assets.icon(SECONDARY_ICON) {
            Some(img) => fit_square(img, l.secondary_icon_size),
            None => placeholders(l.secondary_icon_size),
        };

        let node = |elem: ElementType| layout.rect(elem).unwrap_or(Rect::new(0, 0, 0, 0));
        let image_at = |elem: ElementType, image| {
            let rect = node(elem);
            PaintCommand::Image {
                x: rect.x,
                y: rect.y,
                image,
            }
        };
        let panel = |elem: ElementType| PaintCommand::Backdrop {
            rect: node(elem),
            radius: l.backdrop_radius,
            top: p.backdrop_top,
            bottom: p.backdrop_bottom,
        };
        let divider = |elem: ElementType, style: DividerStyle| PaintCommand::Divider {
            y: node(elem).y + style.extent() as i32,
            width: cfg.canvas.width,
            style,
        };

        let logo = node(ElementType::Logo);
        let ring = node(ElementType::LogoRing);
        let shadow = Rect::new(
            logo.x + l.logo_shadow_offset as i32,
            logo.y + l.logo_shadow_offset as i32,
            logo.width,
            logo.height,
        );

        let mut commands = self.background();
        commands.extend([
            PaintCommand::Ring {
                center: center(ring),
                radius: ring.width as f32 / 2.0,
                width: 3.0,
                color: p.logo_ring,
            },
            PaintCommand::SolidRect {
                rect: shadow,
                color: p.logo_shadow,
            },
            image_at(ElementType::Logo, logo_img),
            bar(node(ElementType::TitleUnderline), p.title_underline),
            image_at(ElementType::Title, Cow::Borrowed(&title.image)),
            image_at(ElementType::ThemeIcon, theme_icon),
            image_at(ElementType::ThemeLabel, Cow::Borrowed(&label.image)),
            divider(ElementType::TopDivider, DividerStyle::Elegant),
            panel(ElementType::QuoteBackdrop),
            image_at(ElementType::Quote, Cow::Borrowed(&quote.image)),
            divider(ElementType::BottomDivider, DividerStyle::Geometric),
            panel(ElementType::ReflectionBackdrop),
            image_at(ElementType::OpenQuoteMark, Cow::Borrowed(&open_mark.image)),
            image_at(ElementType::CloseQuoteMark, Cow::Borrowed(&close_mark.image)),
            image_at(ElementType::Reflection, Cow::Borrowed(&reflection.image)),
            image_at(ElementType::SecondaryIcon, secondary_icon),
            bar(node(ElementType::BottomLine), p.bottom_line),
        ]);
        debug!("Record {}: {} paint commands", record.id, commands.len());

        let image = raster::render(cfg.canvas, &commands)?;
        Ok(RenderedCard { image, layout })
    }

    /// Render `text` as a quote block on the background and outline the
    /// bitmap bounds the rasterizer returned.
    ///
    /// Used to check that glyphs never spill outside their bitmap: every
    /// visible stroke must sit inside the red frame.
    pub fn debug_bounds(&self, text: &str, assets: &Assets) -> Result<RgbaImage> {
        let cfg = &self.config;
        let rasterizer = self.rasterizer(assets);
        let spec = RenderSpec::for_field(Field::Quote, text, cfg);
        let block = rasterizer.render(&spec.text, spec.font_size, spec.color, spec.line_spacing);
        let x = (cfg.canvas.width as i32 - block.width() as i32) / 2;
        let y = (cfg.canvas.height as i32 - block.height() as i32) / 2;
        let bounds = Rect::new(x, y, block.width(), block.height()).inflate(5, 5);
        if let Some((x0, y0, x1, y1)) = block.ink_bounds() {
            if x0 == 0 || y0 == 0 || x1 == block.width() || y1 == block.height() {
                warn!("Ink of {:?} touches its bitmap edge and may be clipped", text);
            }
        }

        let mut commands = self.background();
        commands.push(PaintCommand::Image {
            x,
            y,
            image: Cow::Borrowed(&block.image),
        });
        commands.push(PaintCommand::StrokeRect {
            rect: bounds,
            width: 4,
            color: DEBUG_OUTLINE,
        });

        raster::render(cfg.canvas, &commands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn small_renderer() -> CardRenderer {
        CardRenderer::new(CardConfig::default().scaled(0.25)).unwrap()
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut cfg = CardConfig::default();
        cfg.typography.supersample = 0;
        assert!(matches!(CardRenderer::new(cfg), Err(Error::ConfigError(_))));
    }

    #[test]
    fn composed_card_matches_canvas_and_is_opaque() {
        let renderer = small_renderer();
        let record = Record::new("1", "每个人都有自己的时区", "完美主义是进步的敌人");
        let card = renderer.compose(&record, &Assets::builtin()).unwrap();
        assert_eq!((card.width(), card.height()), (540, 960));
        assert!(card.image.pixels().all(|p| p.0[3] == 255));
        assert_eq!(card.flatten().dimensions(), (540, 960));
    }

    #[test]
    fn composing_twice_is_pixel_identical() {
        let renderer = small_renderer();
        let assets = Assets::builtin();
        let record = Record::new("2", "真正的成长发生在舒适圈之外", "试着迈出一小步");
        let a = renderer.compose(&record, &assets).unwrap();
        let b = renderer.compose(&record, &assets).unwrap();
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);
    }

    #[test]
    fn malformed_record_is_rejected_before_layout() {
        let renderer = small_renderer();
        let record = Record::new("3", "   ", "reflection");
        let err = renderer.compose(&record, &Assets::builtin()).unwrap_err();
        assert!(matches!(err, Error::MalformedRecord(_)));
    }

    #[test]
    fn provided_icon_replaces_placeholder() {
        let renderer = small_renderer();
        let size = renderer.config().layout.theme_icon_size;
        let assets = Assets::builtin().with_icon("time", RgbaImage::from_pixel(10, 10, image::Rgba([200, 0, 0, 255])));
        let record = Record::new("4", "每个人都有自己的时区", "慢慢来");
        let card = renderer.compose(&record, &assets).unwrap();
        let icon = card.layout.rect(ElementType::ThemeIcon).unwrap();
        let px = card.image.get_pixel((icon.x + size as i32 / 2) as u32, (icon.y + size as i32 / 2) as u32);
        assert!(px.0[0] >= 195 && px.0[1] <= 5 && px.0[3] == 255);
    }

    #[test]
    fn debug_bounds_draws_red_frame() {
        let renderer = small_renderer();
        let img = renderer.debug_bounds("完美主义", &Assets::builtin()).unwrap();
        assert_eq!(img.dimensions(), (540, 960));
        let reddish = img.pixels().filter(|p| p.0[0] > p.0[1].saturating_add(40)).count();
        assert!(reddish > 0);
    }
}
