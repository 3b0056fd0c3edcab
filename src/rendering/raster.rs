//! Raster executor for paint commands
//!
//! The canvas is a premultiplied [`Pixmap`]. Shapes are anti-aliased paths
//! filled or stroked by tiny-skia; text and icon bitmaps are premultiplied
//! and composited with `draw_pixmap`. [`into_image`] converts the finished
//! canvas back to straight-alpha RGBA for export.

use image::RgbaImage;
use tiny_skia::{
    BlendMode, FillRule, GradientStop, IntSize, LineCap, LinearGradient, Paint, Path, PathBuilder, Pixmap,
    PixmapPaint, Point, SpreadMode, Stroke, Transform,
};

use super::layout::Rect;
use super::paint::{DividerStyle, PaintCommand};
use crate::{CanvasSize, Color, Error, Result};

/// A fresh, fully transparent canvas.
pub fn new_canvas(size: CanvasSize) -> Result<Pixmap> {
    Pixmap::new(size.width, size.height).ok_or_else(|| {
        Error::RenderError(format!(
            "cannot allocate a {}x{} canvas",
            size.width, size.height
        ))
    })
}

pub fn execute(canvas: &mut Pixmap, commands: &[PaintCommand<'_>]) {
    for cmd in commands {
        match cmd {
            PaintCommand::VerticalGradient { top, bottom } => vertical_gradient(canvas, *top, *bottom),
            PaintCommand::Grid { spacing, color } => grid(canvas, *spacing, *color),
            PaintCommand::Polygon { points, color } => fill_polygon(canvas, points, *color),
            PaintCommand::SolidRect { rect, color } => fill_rect(canvas, *rect, *color),
            PaintCommand::Line { from, to, width, color } => line(canvas, *from, *to, *width, *color),
            PaintCommand::Disc { center, radius, color } => disc(canvas, *center, *radius, *color),
            PaintCommand::Ring {
                center,
                radius,
                width,
                color,
            } => ring(canvas, *center, *radius, *width, *color),
            PaintCommand::Backdrop {
                rect,
                radius,
                top,
                bottom,
            } => backdrop(canvas, *rect, *radius, *top, *bottom),
            PaintCommand::Divider { y, width, style } => divider(canvas, *y, *width, *style),
            PaintCommand::StrokeRect { rect, width, color } => stroke_rect(canvas, *rect, *width, *color),
            PaintCommand::Image { x, y, image } => draw_image(canvas, image, *x, *y),
        }
    }
}

/// Straight-alpha copy of a finished canvas.
pub fn into_image(canvas: Pixmap) -> Result<RgbaImage> {
    let (w, h) = (canvas.width(), canvas.height());
    let mut data = canvas.take();
    demultiply_in_place(&mut data);
    RgbaImage::from_raw(w, h, data)
        .ok_or_else(|| Error::RenderError("canvas buffer does not match its dimensions".into()))
}

/// Execute `commands` on a fresh canvas of `size`.
pub fn render(size: CanvasSize, commands: &[PaintCommand<'_>]) -> Result<RgbaImage> {
    let mut canvas = new_canvas(size)?;
    execute(&mut canvas, commands);
    into_image(canvas)
}

fn premultiply_in_place(bytes: &mut [u8]) {
    for px in bytes.chunks_exact_mut(4) {
        let a = px[3] as u16;
        for c in &mut px[..3] {
            *c = ((*c as u16 * a + 127) / 255) as u8;
        }
    }
}

fn demultiply_in_place(bytes: &mut [u8]) {
    for px in bytes.chunks_exact_mut(4) {
        let a = px[3] as u16;
        match a {
            255 => {}
            0 => px[..3].fill(0),
            _ => {
                for c in &mut px[..3] {
                    *c = ((*c as u16 * 255 + a / 2) / a).min(255) as u8;
                }
            }
        }
    }
}

fn sk_color(color: Color) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba8(color.0, color.1, color.2, color.3)
}

fn solid(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.0, color.1, color.2, color.3);
    paint.anti_alias = true;
    paint
}

fn sk_rect(rect: Rect) -> Option<tiny_skia::Rect> {
    tiny_skia::Rect::from_xywh(rect.x as f32, rect.y as f32, rect.width as f32, rect.height as f32)
}

fn lerp_u8(a: u8, b: u8, t: f32) -> u8 {
    (a as f32 + (b as f32 - a as f32) * t).round() as u8
}

fn lerp_color(a: Color, b: Color, t: f32) -> Color {
    Color(
        lerp_u8(a.0, b.0, t),
        lerp_u8(a.1, b.1, t),
        lerp_u8(a.2, b.2, t),
        lerp_u8(a.3, b.3, t),
    )
}

fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Replace every pixel with a linear top-to-bottom gradient.
fn vertical_gradient(canvas: &mut Pixmap, top: Color, bottom: Color) {
    let (w, h) = (canvas.width() as f32, canvas.height() as f32);
    let Some(area) = tiny_skia::Rect::from_xywh(0.0, 0.0, w, h) else {
        return;
    };
    let stops = vec![
        GradientStop::new(0.0, sk_color(top)),
        GradientStop::new(1.0, sk_color(bottom)),
    ];
    let Some(shader) = LinearGradient::new(
        Point::from_xy(0.0, 0.0),
        Point::from_xy(0.0, h),
        stops,
        SpreadMode::Pad,
        Transform::identity(),
    ) else {
        return;
    };
    let mut paint = Paint::default();
    paint.shader = shader;
    paint.blend_mode = BlendMode::Source;
    canvas.fill_rect(area, &paint, Transform::identity(), None);
}

/// One-pixel lines every `spacing` pixels, filled as a single path so
/// crossings are painted once.
fn grid(canvas: &mut Pixmap, spacing: u32, color: Color) {
    if spacing == 0 {
        return;
    }
    let (w, h) = (canvas.width(), canvas.height());
    let mut pb = PathBuilder::new();
    for x in (0..w).step_by(spacing as usize) {
        if let Some(r) = tiny_skia::Rect::from_xywh(x as f32, 0.0, 1.0, h as f32) {
            pb.push_rect(r);
        }
    }
    for y in (0..h).step_by(spacing as usize) {
        if let Some(r) = tiny_skia::Rect::from_xywh(0.0, y as f32, w as f32, 1.0) {
            pb.push_rect(r);
        }
    }
    let Some(path) = pb.finish() else {
        return;
    };
    let mut paint = solid(color);
    paint.anti_alias = false;
    canvas.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
}

fn polygon_path(points: &[(f32, f32)]) -> Option<Path> {
    let ((x0, y0), rest) = points.split_first()?;
    if rest.len() < 2 {
        return None;
    }
    let mut pb = PathBuilder::new();
    pb.move_to(*x0, *y0);
    for (x, y) in rest {
        pb.line_to(*x, *y);
    }
    pb.close();
    pb.finish()
}

fn fill_polygon(canvas: &mut Pixmap, points: &[(f32, f32)], color: Color) {
    if let Some(path) = polygon_path(points) {
        canvas.fill_path(&path, &solid(color), FillRule::EvenOdd, Transform::identity(), None);
    }
}

fn fill_rect(canvas: &mut Pixmap, rect: Rect, color: Color) {
    if let Some(r) = sk_rect(rect) {
        canvas.fill_rect(r, &solid(color), Transform::identity(), None);
    }
}

/// Outline drawn inside `rect`.
fn stroke_rect(canvas: &mut Pixmap, rect: Rect, width: u32, color: Color) {
    let w = width.min(rect.width / 2).min(rect.height / 2) as f32;
    if w <= 0.0 {
        return;
    }
    let half = w / 2.0;
    let Some(inner) = tiny_skia::Rect::from_xywh(
        rect.x as f32 + half,
        rect.y as f32 + half,
        rect.width as f32 - w,
        rect.height as f32 - w,
    ) else {
        return;
    };
    let stroke = Stroke {
        width: w,
        ..Stroke::default()
    };
    canvas.stroke_path(
        &PathBuilder::from_rect(inner),
        &solid(color),
        &stroke,
        Transform::identity(),
        None,
    );
}

fn line(canvas: &mut Pixmap, from: (f32, f32), to: (f32, f32), width: f32, color: Color) {
    let mut pb = PathBuilder::new();
    pb.move_to(from.0, from.1);
    pb.line_to(to.0, to.1);
    let Some(path) = pb.finish() else {
        return;
    };
    let stroke = Stroke {
        width,
        line_cap: LineCap::Butt,
        ..Stroke::default()
    };
    canvas.stroke_path(&path, &solid(color), &stroke, Transform::identity(), None);
}

fn disc(canvas: &mut Pixmap, center: (f32, f32), radius: f32, color: Color) {
    if let Some(path) = PathBuilder::from_circle(center.0, center.1, radius) {
        canvas.fill_path(&path, &solid(color), FillRule::Winding, Transform::identity(), None);
    }
}

/// Outline whose outer edge sits at `radius`.
fn ring(canvas: &mut Pixmap, center: (f32, f32), radius: f32, width: f32, color: Color) {
    let Some(path) = PathBuilder::from_circle(center.0, center.1, radius - width / 2.0) else {
        return;
    };
    let stroke = Stroke {
        width,
        ..Stroke::default()
    };
    canvas.stroke_path(&path, &solid(color), &stroke, Transform::identity(), None);
}

/// Cubic handle length for a unit quarter circle
const KAPPA: f32 = 0.552_284_8;

fn rounded_rect(rect: Rect, radius: f32) -> Option<Path> {
    let r = sk_rect(rect)?;
    let radius = radius.min(r.width() / 2.0).min(r.height() / 2.0);
    if radius <= 0.0 {
        return Some(PathBuilder::from_rect(r));
    }
    let k = radius * (1.0 - KAPPA);
    let (l, t, rt, b) = (r.left(), r.top(), r.right(), r.bottom());
    let mut pb = PathBuilder::new();
    pb.move_to(l + radius, t);
    pb.line_to(rt - radius, t);
    pb.cubic_to(rt - k, t, rt, t + k, rt, t + radius);
    pb.line_to(rt, b - radius);
    pb.cubic_to(rt, b - k, rt - k, b, rt - radius, b);
    pb.line_to(l + radius, b);
    pb.cubic_to(l + k, b, l, b - k, l, b - radius);
    pb.line_to(l, t + radius);
    pb.cubic_to(l, t + k, l + k, t, l + radius, t);
    pb.close();
    pb.finish()
}

/// Gradient stops sampled along the smoothstep curve of a backdrop tint
const BACKDROP_STOPS: usize = 8;

fn backdrop(canvas: &mut Pixmap, rect: Rect, radius: u32, top: Color, bottom: Color) {
    let Some(path) = rounded_rect(rect, radius as f32) else {
        return;
    };
    let stops = (0..=BACKDROP_STOPS)
        .map(|i| {
            let t = i as f32 / BACKDROP_STOPS as f32;
            GradientStop::new(t, sk_color(lerp_color(top, bottom, smoothstep(t))))
        })
        .collect();
    let Some(shader) = LinearGradient::new(
        Point::from_xy(0.0, rect.y as f32),
        Point::from_xy(0.0, rect.bottom() as f32),
        stops,
        SpreadMode::Pad,
        Transform::identity(),
    ) else {
        return;
    };
    let mut paint = Paint::default();
    paint.shader = shader;
    paint.anti_alias = true;
    canvas.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
}

const ELEGANT_LINE: Color = Color::rgba(150, 150, 150, 180);
const ELEGANT_ACCENT: Color = Color::rgba(100, 100, 100, 200);
const ELEGANT_INNER: Color = Color::rgba(200, 200, 200, 150);
const GEOMETRIC_LINE: Color = Color::rgba(120, 120, 120, 160);
const GEOMETRIC_DIAMOND: Color = Color::rgba(140, 140, 140, 180);

/// Full-width divider centred on `y`.
fn divider(canvas: &mut Pixmap, y: i32, width: u32, style: DividerStyle) {
    let y = y as f32;
    let w = width as f32;
    let cx = (width / 2) as f32;
    match style {
        DividerStyle::Elegant => {
            line(canvas, (100.0, y), (w - 100.0, y), 2.0, ELEGANT_LINE);
            disc(canvas, (cx, y), 15.0, ELEGANT_ACCENT);
            disc(canvas, (cx, y), 8.0, ELEGANT_INNER);
            for offset in [-120.0, 120.0] {
                disc(canvas, (cx + offset, y), 5.0, ELEGANT_ACCENT);
            }
        }
        DividerStyle::Geometric => {
            line(canvas, (80.0, y), (w - 80.0, y), 3.0, GEOMETRIC_LINE);
            let d = 20.0;
            fill_polygon(
                canvas,
                &[(cx, y - d), (cx + d, y), (cx, y + d), (cx - d, y)],
                GEOMETRIC_DIAMOND,
            );
            for offset in [-100.0, 100.0] {
                fill_polygon(
                    canvas,
                    &[
                        (cx + offset, y - 8.0),
                        (cx + offset - 8.0, y + 8.0),
                        (cx + offset + 8.0, y + 8.0),
                    ],
                    GEOMETRIC_LINE,
                );
            }
        }
    }
}

/// Source-over a straight-alpha bitmap with its top-left corner at `(x, y)`.
fn draw_image(canvas: &mut Pixmap, image: &RgbaImage, x: i32, y: i32) {
    let Some(size) = IntSize::from_wh(image.width(), image.height()) else {
        return;
    };
    let mut data = image.as_raw().clone();
    premultiply_in_place(&mut data);
    let Some(bitmap) = Pixmap::from_vec(data, size) else {
        return;
    };
    canvas.draw_pixmap(x, y, bitmap.as_ref(), &PixmapPaint::default(), Transform::identity(), None);
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::borrow::Cow;

    const WHITE: Color = Color::rgb(255, 255, 255);
    const BLACK: Color = Color::rgb(0, 0, 0);

    fn filled(w: u32, h: u32, color: Color) -> Pixmap {
        let mut p = Pixmap::new(w, h).unwrap();
        p.fill(sk_color(color));
        p
    }

    fn pixel(canvas: &Pixmap, x: u32, y: u32) -> [u8; 4] {
        let c = canvas.pixel(x, y).unwrap().demultiply();
        [c.red(), c.green(), c.blue(), c.alpha()]
    }

    #[test]
    fn gradient_runs_top_to_bottom() {
        let mut canvas = new_canvas(CanvasSize { width: 4, height: 100 }).unwrap();
        execute(
            &mut canvas,
            &[PaintCommand::VerticalGradient {
                top: Color::rgb(245, 240, 230),
                bottom: Color::rgb(230, 220, 200),
            }],
        );
        let first = pixel(&canvas, 0, 0);
        assert!(first[0] >= 244 && first[2] >= 229 && first[3] == 255);
        let last = pixel(&canvas, 3, 99);
        assert!(last[0] < 232 && last[3] == 255);
    }

    #[test]
    fn translucent_rect_blends() {
        let mut canvas = filled(10, 10, BLACK);
        execute(
            &mut canvas,
            &[PaintCommand::SolidRect {
                rect: Rect::new(2, 2, 4, 4),
                color: Color::rgba(255, 255, 255, 128),
            }],
        );
        let p = pixel(&canvas, 3, 3);
        assert!(p[0] > 100 && p[0] < 160);
        assert_eq!(p[3], 255);
        assert_eq!(pixel(&canvas, 0, 0), [0, 0, 0, 255]);
    }

    #[test]
    fn commands_clip_at_canvas_edges() {
        let mut canvas = filled(20, 20, WHITE);
        execute(
            &mut canvas,
            &[
                PaintCommand::Disc {
                    center: (0.0, 0.0),
                    radius: 30.0,
                    color: BLACK,
                },
                PaintCommand::SolidRect {
                    rect: Rect::new(-5, 15, 100, 100),
                    color: Color::rgb(1, 2, 3),
                },
            ],
        );
        assert_eq!(pixel(&canvas, 19, 19), [1, 2, 3, 255]);
        assert_eq!(pixel(&canvas, 2, 2), [0, 0, 0, 255]);
    }

    #[test]
    fn backdrop_corners_are_rounded() {
        let mut canvas = new_canvas(CanvasSize { width: 100, height: 60 }).unwrap();
        execute(
            &mut canvas,
            &[PaintCommand::Backdrop {
                rect: Rect::new(0, 0, 100, 60),
                radius: 20,
                top: Color::rgba(255, 255, 255, 35),
                bottom: Color::rgba(255, 250, 240, 15),
            }],
        );
        assert_eq!(pixel(&canvas, 0, 0)[3], 0);
        assert!(pixel(&canvas, 50, 1)[3] > pixel(&canvas, 50, 58)[3]);
    }

    #[test]
    fn translucent_layers_keep_an_opaque_canvas_opaque() {
        let mut canvas = filled(16, 16, Color::rgb(245, 240, 230));
        let mut commands = Vec::new();
        for a in [1u8, 15, 35, 100, 128, 200, 254] {
            commands.push(PaintCommand::SolidRect {
                rect: Rect::new(0, 0, 16, 16),
                color: Color::rgba(0, 0, 0, a),
            });
            commands.push(PaintCommand::Disc {
                center: (8.0, 8.0),
                radius: 5.5,
                color: Color::rgba(255, 255, 255, a),
            });
        }
        execute(&mut canvas, &commands);
        let image = into_image(canvas).unwrap();
        assert!(image.pixels().all(|p| p.0[3] == 255));
    }

    #[test]
    fn straight_alpha_survives_the_round_trip() {
        let mut canvas = new_canvas(CanvasSize { width: 2, height: 2 }).unwrap();
        execute(
            &mut canvas,
            &[PaintCommand::SolidRect {
                rect: Rect::new(0, 0, 1, 1),
                color: Color::rgba(200, 100, 50, 128),
            }],
        );
        let image = into_image(canvas).unwrap();
        let p = image.get_pixel(0, 0).0;
        assert!(p[0].abs_diff(200) <= 2 && p[1].abs_diff(100) <= 2 && p[2].abs_diff(50) <= 2);
        assert_eq!(p[3], 128);
        assert_eq!(image.get_pixel(1, 1).0, [0, 0, 0, 0]);
    }

    #[test]
    fn smoothstep_is_eased() {
        assert_eq!(smoothstep(0.0), 0.0);
        assert_eq!(smoothstep(1.0), 1.0);
        assert!(smoothstep(0.1) < 0.1);
        assert!(smoothstep(0.9) > 0.9);
    }

    #[test]
    fn both_divider_styles_paint_around_centre() {
        for style in [DividerStyle::Elegant, DividerStyle::Geometric] {
            let mut canvas = filled(400, 60, WHITE);
            execute(&mut canvas, &[PaintCommand::Divider { y: 30, width: 400, style }]);
            assert_ne!(pixel(&canvas, 200, 30), [255, 255, 255, 255], "{:?}", style);
            assert_eq!(pixel(&canvas, 200, 2), [255, 255, 255, 255], "{:?}", style);
        }
    }

    #[test]
    fn image_command_overlays_with_alpha() {
        let mut canvas = filled(8, 8, WHITE);
        let mut stamp = RgbaImage::new(2, 2);
        stamp.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        execute(
            &mut canvas,
            &[PaintCommand::Image {
                x: 3,
                y: 3,
                image: Cow::Owned(stamp),
            }],
        );
        assert_eq!(pixel(&canvas, 3, 3), [255, 0, 0, 255]);
        assert_eq!(pixel(&canvas, 4, 4), [255, 255, 255, 255]);
    }

    #[test]
    fn grid_lines_blend_once_at_crossings() {
        let mut canvas = filled(30, 30, BLACK);
        execute(
            &mut canvas,
            &[PaintCommand::Grid {
                spacing: 10,
                color: Color::rgba(255, 255, 255, 100),
            }],
        );
        assert_eq!(pixel(&canvas, 10, 10), pixel(&canvas, 10, 5));
        assert_ne!(pixel(&canvas, 10, 5), [0, 0, 0, 255]);
        assert_eq!(pixel(&canvas, 5, 5), [0, 0, 0, 255]);
    }
}
