//! Paint command set for the card template
//!
//! Commands are recorded back to front and executed in order by
//! [`crate::rendering::raster::execute`].

use std::borrow::Cow;

use image::RgbaImage;

use super::layout::Rect;
use crate::Color;

/// Fixed visual styles for the dividers around the quote block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DividerStyle {
    /// Thin line with a centre disc and two small dots
    Elegant,
    /// Heavier line with a centre diamond and two triangles
    Geometric,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand<'a> {
    VerticalGradient {
        top: Color,
        bottom: Color,
    },
    Grid {
        spacing: u32,
        color: Color,
    },
    Polygon {
        points: Vec<(f32, f32)>,
        color: Color,
    },
    SolidRect {
        rect: Rect,
        color: Color,
    },
    Line {
        from: (f32, f32),
        to: (f32, f32),
        width: f32,
        color: Color,
    },
    Disc {
        center: (f32, f32),
        radius: f32,
        color: Color,
    },
    Ring {
        center: (f32, f32),
        radius: f32,
        width: f32,
        color: Color,
    },
    /// Rounded panel with a smoothstep-eased vertical tint gradient
    Backdrop {
        rect: Rect,
        radius: u32,
        top: Color,
        bottom: Color,
    },
    Divider {
        y: i32,
        width: u32,
        style: DividerStyle,
    },
    StrokeRect {
        rect: Rect,
        width: u32,
        color: Color,
    },
    /// Alpha-blend a bitmap with its top-left corner at `(x, y)`
    Image {
        x: i32,
        y: i32,
        image: Cow<'a, RgbaImage>,
    },
}
