//! Supersampled text block rasterizer
//!
//! Text is drawn at `size × S` into a coverage mask, then the mask is
//! downscaled by `1/S` with Lanczos3 and coloured. The downscale is what
//! anti-aliases the glyph edges, independent of what the glyph source does at
//! small sizes.
//!
//! [`TextRasterizer::measure`] and [`TextRasterizer::render`] share the same
//! geometry pass, so the layout engine can place blocks from measurements
//! alone and the rendered bitmap will have exactly those dimensions.

use std::collections::HashMap;

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, Rgba, RgbaImage};

use super::glyph::{GlyphCoverage, GlyphSource};
use crate::{Color, Typography};

/// A rendered text block with straight alpha.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphBitmap {
    pub image: RgbaImage,
}

impl GlyphBitmap {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Tight box `(x0, y0, x1, y1)` (exclusive max) around pixels with any alpha.
    pub fn ink_bounds(&self) -> Option<(u32, u32, u32, u32)> {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for (x, y, p) in self.image.enumerate_pixels() {
            if p.0[3] == 0 {
                continue;
            }
            bounds = Some(match bounds {
                None => (x, y, x + 1, y + 1),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x + 1), y1.max(y + 1)),
            });
        }
        bounds
    }
}

/// Output dimensions of a text block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug)]
struct LineGeometry {
    chars: Vec<char>,
    /// Glyph pen origins, rounded to whole supersampled pixels
    origins: Vec<i32>,
    ink_left: i32,
    ink_width: i32,
}

/// Layout of a block in supersampled pixels
#[derive(Debug)]
struct BlockGeometry {
    px: f32,
    lines: Vec<LineGeometry>,
    max_width: i32,
    above: i32,
    pitch: f32,
    pad_x: i32,
    pad_y: i32,
    canvas_w: u32,
    canvas_h: u32,
}

pub struct TextRasterizer<'a> {
    glyphs: &'a dyn GlyphSource,
    supersample: u32,
    pad_x: u32,
    pad_y: u32,
}

fn round_up(v: u32, multiple: u32) -> u32 {
    v.div_ceil(multiple) * multiple
}

impl<'a> TextRasterizer<'a> {
    pub fn new(glyphs: &'a dyn GlyphSource, typography: &Typography) -> Self {
        Self {
            glyphs,
            supersample: typography.supersample.max(1),
            pad_x: typography.pad_x,
            pad_y: typography.pad_y,
        }
    }

    fn geometry(&self, text: &str, font_size: u32, line_spacing: f32) -> BlockGeometry {
        let s = self.supersample;
        let px = font_size as f32 * s as f32;
        let spacing = line_spacing.max(1.0);

        let mut lines = Vec::new();
        let mut above = 0i32;
        let mut below = 0i32;
        for raw in text.split('\n') {
            let chars: Vec<char> = raw.trim_end_matches('\r').chars().collect();
            let mut origins = Vec::with_capacity(chars.len());
            let mut pen = 0.0f32;
            let mut left = i32::MAX;
            let mut right = i32::MIN;
            for &ch in &chars {
                let m = self.glyphs.metrics(ch, px);
                let origin = pen.round() as i32;
                origins.push(origin);
                if let Some(ink) = m.ink {
                    left = left.min(origin + ink.left);
                    right = right.max(origin + ink.right);
                    above = above.max(-ink.top);
                    below = below.max(ink.bottom);
                }
                pen += m.advance;
            }
            let (ink_left, ink_width) = if right > left { (left, right - left) } else { (0, 0) };
            lines.push(LineGeometry {
                chars,
                origins,
                ink_left,
                ink_width,
            });
        }

        let max_width = lines.iter().map(|l| l.ink_width).max().unwrap_or(0);
        let line_height = above + below;
        let pitch = line_height as f32 * spacing;
        let n = lines.len() as f32;
        // line_h × n + (n − 1) × line_h × (spacing − 1)
        let total_h = (line_height as f32 * n + (n - 1.0) * line_height as f32 * (spacing - 1.0)).ceil() as u32;

        let pad_x = (self.pad_x * s) as i32;
        let pad_y = (self.pad_y * s) as i32;
        let canvas_w = round_up(max_width as u32 + 2 * pad_x as u32, s);
        let canvas_h = round_up(total_h + 2 * pad_y as u32, s);

        BlockGeometry {
            px,
            lines,
            max_width,
            above,
            pitch,
            pad_x,
            pad_y,
            canvas_w,
            canvas_h,
        }
    }

    /// Dimensions `render` would return for the same arguments.
    pub fn measure(&self, text: &str, font_size: u32, line_spacing: f32) -> BlockSize {
        let g = self.geometry(text, font_size, line_spacing);
        BlockSize {
            width: g.canvas_w / self.supersample,
            height: g.canvas_h / self.supersample,
        }
    }

    pub fn render(&self, text: &str, font_size: u32, color: Color, line_spacing: f32) -> GlyphBitmap {
        let g = self.geometry(text, font_size, line_spacing);
        let mut mask = GrayImage::new(g.canvas_w, g.canvas_h);
        let mut cache: HashMap<char, GlyphCoverage> = HashMap::new();

        for (i, line) in g.lines.iter().enumerate() {
            if line.ink_width == 0 {
                continue;
            }
            let top = g.pad_y + (i as f32 * g.pitch).round() as i32;
            let baseline = top + g.above;
            // centre within the widest line, then cancel the line's own left bearing
            let x0 = g.pad_x + (g.max_width - line.ink_width) / 2 - line.ink_left;

            for (&ch, &origin) in line.chars.iter().zip(&line.origins) {
                let glyph = cache
                    .entry(ch)
                    .or_insert_with(|| self.glyphs.rasterize(ch, g.px));
                if let Some(ink) = glyph.metrics.ink {
                    stamp(&mut mask, glyph, x0 + origin + ink.left, baseline + ink.top);
                }
            }
        }

        let s = self.supersample;
        let coverage = if s > 1 {
            imageops::resize(&mask, g.canvas_w / s, g.canvas_h / s, FilterType::Lanczos3)
        } else {
            mask
        };

        let Color(r, gr, b, a) = color;
        let image = RgbaImage::from_fn(coverage.width(), coverage.height(), |x, y| {
            let cov = coverage.get_pixel(x, y).0[0] as u32;
            Rgba([r, gr, b, (cov * a as u32 / 255) as u8])
        });
        GlyphBitmap { image }
    }
}

/// Union a glyph's coverage into the mask at `(x, y)`.
fn stamp(mask: &mut GrayImage, glyph: &GlyphCoverage, x: i32, y: i32) {
    let (mw, mh) = (mask.width() as i32, mask.height() as i32);
    for gy in 0..glyph.height {
        let ty = y + gy as i32;
        if ty < 0 || ty >= mh {
            continue;
        }
        for gx in 0..glyph.width {
            let tx = x + gx as i32;
            if tx < 0 || tx >= mw {
                continue;
            }
            let c = glyph.coverage[gy * glyph.width + gx];
            if c == 0 {
                continue;
            }
            let dst = mask.get_pixel_mut(tx as u32, ty as u32);
            if c > dst.0[0] {
                *dst = Luma([c]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::glyph::BuiltinGlyphs;

    fn rasterizer(glyphs: &BuiltinGlyphs) -> TextRasterizer<'_> {
        TextRasterizer::new(glyphs, &Typography::default())
    }

    /// Padding-only block, the smallest any text can produce
    fn padding_only() -> BlockSize {
        let t = Typography::default();
        BlockSize {
            width: 2 * t.pad_x,
            height: 2 * t.pad_y,
        }
    }

    #[test]
    fn measure_matches_render() {
        let glyphs = BuiltinGlyphs;
        let r = rasterizer(&glyphs);
        let text = "每个人都有自己的\n时区";
        let size = r.measure(text, 40, 1.8);
        let bmp = r.render(text, 40, Color::rgb(60, 60, 60), 1.8);
        assert_eq!((bmp.width(), bmp.height()), (size.width, size.height));
    }

    #[test]
    fn non_empty_text_has_ink_inside_padding() {
        let glyphs = BuiltinGlyphs;
        let r = rasterizer(&glyphs);
        let bmp = r.render("完美主义", 24, Color::rgb(0, 0, 0), 1.0);
        let (x0, y0, x1, y1) = bmp.ink_bounds().expect("ink");
        assert!(x1 > x0 && y1 > y0);
        let min = padding_only();
        assert!(bmp.width() > min.width && bmp.height() > min.height);
    }

    #[test]
    fn empty_text_is_padding_only() {
        let glyphs = BuiltinGlyphs;
        let r = rasterizer(&glyphs);
        let size = r.measure("", 80, 1.8);
        assert_eq!(size, padding_only());
        let bmp = r.render("   ", 80, Color::rgb(0, 0, 0), 1.8);
        assert!(bmp.ink_bounds().is_none());
    }

    #[test]
    fn spacing_is_a_multiplier_of_line_height() {
        let glyphs = BuiltinGlyphs;
        let r = rasterizer(&glyphs);
        let one = r.measure("时", 50, 1.0).height;
        let two_tight = r.measure("时\n时", 50, 1.0).height;
        let two_loose = r.measure("时\n时", 50, 2.0).height;
        let pad = padding_only().height;
        let line = one - pad;
        assert!(two_tight - pad >= 2 * line - 1 && two_tight - pad <= 2 * line + 1);
        assert!(two_loose - pad >= 3 * line - 1 && two_loose - pad <= 3 * line + 1);
    }

    #[test]
    fn lines_are_centred() {
        let glyphs = BuiltinGlyphs;
        let r = rasterizer(&glyphs);
        let bmp = r.render("时时时时\n时", 20, Color::rgb(0, 0, 0), 1.0);
        let (x0, _, x1, _) = bmp.ink_bounds().unwrap();
        let mid = bmp.width() as i32 / 2;
        let ink_mid = (x0 + x1) as i32 / 2;
        assert!((mid - ink_mid).abs() <= 1);
    }

    #[test]
    fn colour_alpha_scales_coverage() {
        let glyphs = BuiltinGlyphs;
        let r = rasterizer(&glyphs);
        let bmp = r.render("时", 30, Color::rgba(10, 20, 30, 128), 1.0);
        let max_alpha = bmp.image.pixels().map(|p| p.0[3]).max().unwrap();
        assert!(max_alpha > 0 && max_alpha <= 128);
        assert!(bmp.image.pixels().all(|p| p.0[0] == 10 && p.0[1] == 20 && p.0[2] == 30));
    }
}
