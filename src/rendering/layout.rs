//! Card layout: length-driven sizing, wrapping and the vertical flow
//!
//! Only the brand header has an absolute position. Every later stage starts at
//! the measured bottom of the previous one plus a gap from [`LayoutConfig`],
//! because text block heights vary with the record.

use log::debug;

use super::paint::DividerStyle;
use super::text::{BlockSize, TextRasterizer};
use super::theme::{extract_theme, Theme};
use crate::{CardConfig, Color, Error, LayoutConfig, Record, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    /// Grow by `dx` on both sides horizontally and `dy` vertically.
    pub fn inflate(&self, dx: u32, dy: u32) -> Rect {
        Rect {
            x: self.x - dx as i32,
            y: self.y - dy as i32,
            width: self.width + 2 * dx,
            height: self.height + 2 * dy,
        }
    }

    pub fn within(&self, outer: &Rect) -> bool {
        self.x >= outer.x && self.y >= outer.y && self.right() <= outer.right() && self.bottom() <= outer.bottom()
    }
}

/// Every element the card template places, in paint order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Logo,
    LogoRing,
    Title,
    TitleUnderline,
    ThemeIcon,
    ThemeLabel,
    TopDivider,
    QuoteBackdrop,
    Quote,
    BottomDivider,
    ReflectionBackdrop,
    OpenQuoteMark,
    CloseQuoteMark,
    Reflection,
    SecondaryIcon,
    BottomLine,
}

impl ElementType {
    /// Dividers span the canvas; everything else keeps the side margin.
    fn spans_width(self) -> bool {
        matches!(
            self,
            ElementType::TopDivider | ElementType::BottomDivider | ElementType::BottomLine
        )
    }

    /// Text block whose line width decides this element's width.
    fn field(self) -> Option<Field> {
        match self {
            ElementType::Quote | ElementType::QuoteBackdrop => Some(Field::Quote),
            ElementType::Reflection
            | ElementType::ReflectionBackdrop
            | ElementType::OpenQuoteMark
            | ElementType::CloseQuoteMark => Some(Field::Reflection),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    pub elem_type: ElementType,
    pub rect: Rect,
}

/// Which record field a text block renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Quote,
    Reflection,
}

/// Character-count thresholds and the size ratio each tier applies.
pub const SIZE_TIERS: [(usize, f32); 5] = [
    (30, 1.0),
    (50, 0.85),
    (80, 0.70),
    (120, 0.60),
    (usize::MAX, 0.50),
];

/// `(minimum size ratio, columns)`; the last entry is the catch-all.
const QUOTE_WRAP: [(f32, usize); 4] = [(0.85, 14), (0.70, 18), (0.60, 22), (0.0, 26)];
const REFLECTION_WRAP: [(f32, usize); 3] = [(0.85, 18), (0.70, 22), (0.0, 25)];

/// Index into [`SIZE_TIERS`] for a text of `char_count` characters.
pub fn size_tier(char_count: usize) -> usize {
    SIZE_TIERS
        .iter()
        .position(|(max, _)| char_count <= *max)
        .unwrap_or(SIZE_TIERS.len() - 1)
}

pub fn tier_font_size(base: u32, char_count: usize) -> u32 {
    let ratio = SIZE_TIERS[size_tier(char_count)].1;
    (base as f32 * ratio).round() as u32
}

/// Columns per line for a font size; larger sizes wrap sooner.
pub fn wrap_columns(field: Field, font_size: u32, base: u32) -> usize {
    let table: &[(f32, usize)] = match field {
        Field::Quote => &QUOTE_WRAP,
        Field::Reflection => &REFLECTION_WRAP,
    };
    let ratio = font_size as f32 / base.max(1) as f32;
    table
        .iter()
        .find(|(min, _)| ratio + 1e-3 >= *min)
        .map(|(_, cols)| *cols)
        .unwrap_or(table[table.len() - 1].1)
}

/// Per-block render parameters derived from one record field.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSpec {
    /// Wrapped text, lines separated by `\n`
    pub text: String,
    pub font_size: u32,
    /// Columns chosen by the length tier
    pub wrap_columns: usize,
    /// Columns the text is actually wrapped at; never above `wrap_columns`
    pub fitted_columns: usize,
    pub line_spacing: f32,
    pub color: Color,
    /// Index into [`SIZE_TIERS`]
    pub tier: usize,
}

impl RenderSpec {
    pub fn for_field(field: Field, text: &str, config: &CardConfig) -> Self {
        let t = &config.typography;
        let (base, spacing, color) = match field {
            Field::Quote => (t.quote_base_size, t.quote_line_spacing, config.palette.quote_text),
            Field::Reflection => (
                t.reflection_base_size,
                t.reflection_line_spacing,
                config.palette.reflection_text,
            ),
        };
        let text = text.trim();
        let n = text.chars().count();
        let tier = size_tier(n);
        let font_size = tier_font_size(base, n);
        let wrap_columns = wrap_columns(field, font_size, base);
        Self {
            text: wrap_text(text, wrap_columns),
            font_size,
            wrap_columns,
            fitted_columns: wrap_columns,
            line_spacing: spacing,
            color,
            tier,
        }
    }

    fn scaled(&self, scale: f32) -> Self {
        Self {
            font_size: ((self.font_size as f32 * scale).round() as u32).max(1),
            ..self.clone()
        }
    }

    /// Rewrap `source` one column narrower. Returns false at one column.
    fn narrow(&mut self, source: &str) -> bool {
        if self.fitted_columns <= 1 {
            return false;
        }
        self.fitted_columns -= 1;
        self.text = wrap_text(source.trim(), self.fitted_columns);
        true
    }
}

/// Punctuation that must not open a line.
fn is_closing_punct(ch: char) -> bool {
    "，。！？；：、）」』”’》…,.!?;:)]}".contains(ch)
}

enum Token {
    Word(String),
    Space,
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !word.is_empty() {
                tokens.push(Token::Word(std::mem::take(&mut word)));
            }
            if !matches!(tokens.last(), Some(Token::Space) | None) {
                tokens.push(Token::Space);
            }
        } else if ch.is_ascii_alphanumeric() || (ch.is_ascii() && !word.is_empty() && !is_closing_punct(ch)) {
            word.push(ch);
        } else {
            if !word.is_empty() {
                tokens.push(Token::Word(std::mem::take(&mut word)));
            }
            tokens.push(Token::Word(ch.to_string()));
        }
    }
    if !word.is_empty() {
        tokens.push(Token::Word(word));
    }
    tokens
}

/// Greedy wrap at `columns` characters per line.
///
/// Every non-ASCII character is a break opportunity; ASCII words stay whole
/// unless longer than a line. One closing punctuation mark may hang past a
/// full line; a run of them wraps after the first.
pub fn wrap_text(text: &str, columns: usize) -> String {
    let columns = columns.max(1);
    let mut lines: Vec<String> = Vec::new();
    let mut line = String::new();
    let mut len = 0usize;

    for token in tokenize(text) {
        match token {
            Token::Space => {
                if len > 0 && len < columns {
                    line.push(' ');
                    len += 1;
                }
            }
            Token::Word(word) => {
                let wlen = word.chars().count();
                let hangs = wlen == 1 && len == columns && word.chars().all(is_closing_punct);
                if len + wlen > columns && len > 0 && !hangs {
                    lines.push(std::mem::take(&mut line).trim_end().to_string());
                    len = 0;
                }
                if wlen > columns {
                    // hard-split overlong ASCII runs
                    for ch in word.chars() {
                        if len == columns {
                            lines.push(std::mem::take(&mut line));
                            len = 0;
                        }
                        line.push(ch);
                        len += 1;
                    }
                } else {
                    line.push_str(&word);
                    len += wlen;
                }
            }
        }
    }
    let tail = line.trim_end();
    if !tail.is_empty() || lines.is_empty() {
        lines.push(tail.to_string());
    }
    lines.join("\n")
}

impl DividerStyle {
    /// Half the height of the divider's tallest accent
    pub fn extent(self) -> u32 {
        match self {
            DividerStyle::Elegant => 16,
            DividerStyle::Geometric => 21,
        }
    }
}

/// Fully placed card for one record.
#[derive(Debug, Clone)]
pub struct CardLayout {
    pub nodes: Vec<LayoutNode>,
    pub quote: RenderSpec,
    pub reflection: RenderSpec,
    pub theme: Theme,
    /// Scale the fit pass applied to both text blocks (1.0 when untouched)
    pub fit_scale: f32,
}

impl CardLayout {
    pub fn rect(&self, elem_type: ElementType) -> Option<Rect> {
        self.nodes.iter().find(|n| n.elem_type == elem_type).map(|n| n.rect)
    }

    /// Lowest edge of any placed element
    pub fn bottom(&self) -> i32 {
        self.nodes.iter().map(|n| n.rect.bottom()).max().unwrap_or(0)
    }

    /// First element outside the safe area, if any.
    pub fn first_violation(&self, config: &CardConfig) -> Option<Overflow> {
        let (w, h) = (config.canvas.width, config.canvas.height);
        let m = config.layout.margin_x;
        let canvas = Rect::new(0, 0, w, h.saturating_sub(config.layout.margin_bottom));
        let inset = Rect::new(m as i32, 0, w.saturating_sub(2 * m), canvas.height);
        self.nodes.iter().find_map(|n| {
            let area = if n.elem_type.spans_width() { &canvas } else { &inset };
            if n.rect.within(area) {
                return None;
            }
            Some(Overflow {
                element: n.elem_type,
                horizontal: n.rect.x < area.x || n.rect.right() > area.right(),
            })
        })
    }
}

/// An element that left the safe area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overflow {
    pub element: ElementType,
    /// Crossed a side margin, as opposed to only the bottom edge
    pub horizontal: bool,
}

/// Text measurements needed by the flow, one set per fit attempt.
struct Measured {
    title: BlockSize,
    label: BlockSize,
    quote: BlockSize,
    reflection: BlockSize,
    open_mark: BlockSize,
    close_mark: BlockSize,
}

pub const OPEN_QUOTE_MARK: &str = "“";
pub const CLOSE_QUOTE_MARK: &str = "”";

fn centered_x(canvas_w: u32, width: u32) -> i32 {
    (canvas_w as i32 - width as i32) / 2
}

fn flow(config: &CardConfig, m: &Measured) -> Vec<LayoutNode> {
    let c: &LayoutConfig = &config.layout;
    let w = config.canvas.width;
    let mut nodes = Vec::with_capacity(16);
    let mut push = |elem_type: ElementType, rect: Rect| {
        nodes.push(LayoutNode { elem_type, rect });
        rect
    };

    // Brand header: the only absolute origin
    let (ox, oy) = (c.logo_origin.0 as i32, c.logo_origin.1 as i32);
    let logo = push(ElementType::Logo, Rect::new(ox, oy, c.logo_size, c.logo_size));
    let ring_r = c.logo_size / 2 + c.logo_ring_gap;
    let ring = push(
        ElementType::LogoRing,
        Rect::new(
            logo.x + (c.logo_size / 2) as i32 - ring_r as i32,
            logo.y + (c.logo_size / 2) as i32 - ring_r as i32,
            2 * ring_r,
            2 * ring_r,
        ),
    );
    let title = push(
        ElementType::Title,
        Rect::new(
            logo.right() + c.title_gap as i32,
            logo.y + (c.logo_size as i32 - m.title.height as i32) / 2,
            m.title.width,
            m.title.height,
        ),
    );
    let underline = push(
        ElementType::TitleUnderline,
        Rect::new(title.x, title.bottom() + c.underline_gap as i32, title.width, 3),
    );
    let header_bottom = ring
        .bottom()
        .max(underline.bottom())
        .max(logo.bottom() + c.logo_shadow_offset as i32);

    let icon = push(
        ElementType::ThemeIcon,
        Rect::new(
            centered_x(w, c.theme_icon_size),
            header_bottom + c.gap_header_icon as i32,
            c.theme_icon_size,
            c.theme_icon_size,
        ),
    );
    let label = push(
        ElementType::ThemeLabel,
        Rect::new(
            centered_x(w, m.label.width),
            icon.bottom() + c.gap_icon_label as i32,
            m.label.width,
            m.label.height,
        ),
    );

    let top_extent = DividerStyle::Elegant.extent();
    let top_divider = push(
        ElementType::TopDivider,
        Rect::new(0, label.bottom() + c.gap_label_divider as i32, w, 2 * top_extent),
    );

    let quote_y = top_divider.bottom() + c.gap_divider_block as i32;
    let quote = Rect::new(
        centered_x(w, m.quote.width),
        quote_y + c.backdrop_pad_y as i32,
        m.quote.width,
        m.quote.height,
    );
    let quote_panel = push(
        ElementType::QuoteBackdrop,
        quote.inflate(c.backdrop_pad_x, c.backdrop_pad_y),
    );
    push(ElementType::Quote, quote);

    let bottom_extent = DividerStyle::Geometric.extent();
    let bottom_divider = push(
        ElementType::BottomDivider,
        Rect::new(0, quote_panel.bottom() + c.gap_block_divider as i32, w, 2 * bottom_extent),
    );

    let reflection_y = bottom_divider.bottom() + c.gap_divider_block as i32;
    let reflection = Rect::new(
        centered_x(w, m.reflection.width),
        reflection_y + c.backdrop_pad_y as i32,
        m.reflection.width,
        m.reflection.height,
    );
    let reflection_panel = push(
        ElementType::ReflectionBackdrop,
        reflection.inflate(c.backdrop_pad_x, c.backdrop_pad_y),
    );
    // marks hug the text corners and overhang the panel slightly
    push(
        ElementType::OpenQuoteMark,
        Rect::new(
            reflection.x - m.open_mark.width as i32 + 12,
            reflection.y - m.open_mark.height as i32 / 3,
            m.open_mark.width,
            m.open_mark.height,
        ),
    );
    push(
        ElementType::CloseQuoteMark,
        Rect::new(
            reflection.right() - 12,
            reflection.bottom() - m.close_mark.height as i32 * 2 / 3,
            m.close_mark.width,
            m.close_mark.height,
        ),
    );
    push(ElementType::Reflection, reflection);

    let secondary = push(
        ElementType::SecondaryIcon,
        Rect::new(
            centered_x(w, c.secondary_icon_size),
            reflection_panel.bottom() + c.gap_reflection_icon as i32,
            c.secondary_icon_size,
            c.secondary_icon_size,
        ),
    );
    push(
        ElementType::BottomLine,
        Rect::new((w / 4) as i32, secondary.bottom() + c.gap_icon_line as i32, w / 2, 3),
    );

    nodes
}

/// Compute the placement of every element for `record`.
///
/// Text blocks start at their length tier. A block that crosses a side
/// margin is rewrapped one column narrower at the same size. Only when the
/// flow runs past the bottom edge (or a block cannot get narrower) do both
/// blocks shrink by `fit_step`. A record that would need text below
/// `min_font_size` is rejected.
pub fn plan(record: &Record, config: &CardConfig, rasterizer: &TextRasterizer<'_>) -> Result<CardLayout> {
    let t = &config.typography;
    let theme = extract_theme(&record.content);
    let mut quote = RenderSpec::for_field(Field::Quote, &record.content, config);
    let mut reflection = RenderSpec::for_field(Field::Reflection, &record.reflection, config);

    let title = rasterizer.measure(&config.brand.title, t.title_size, 1.0);
    let label = rasterizer.measure(theme.label(), t.theme_label_size, 1.0);
    let open_mark = rasterizer.measure(OPEN_QUOTE_MARK, t.quote_mark_size, 1.0);
    let close_mark = rasterizer.measure(CLOSE_QUOTE_MARK, t.quote_mark_size, 1.0);

    let mut scale = 1.0f32;
    loop {
        let q = quote.scaled(scale);
        let r = reflection.scaled(scale);
        let measured = Measured {
            title,
            label,
            quote: rasterizer.measure(&q.text, q.font_size, q.line_spacing),
            reflection: rasterizer.measure(&r.text, r.font_size, r.line_spacing),
            open_mark,
            close_mark,
        };
        let layout = CardLayout {
            nodes: flow(config, &measured),
            quote: q,
            reflection: r,
            theme,
            fit_scale: scale,
        };

        let Some(overflow) = layout.first_violation(config) else {
            debug!(
                "Planned record {}: theme={:?} quote={}px/{}cols reflection={}px/{}cols scale={:.3} bottom={}",
                record.id,
                theme,
                layout.quote.font_size,
                layout.quote.fitted_columns,
                layout.reflection.font_size,
                layout.reflection.fitted_columns,
                scale,
                layout.bottom()
            );
            return Ok(layout);
        };

        if overflow.horizontal {
            let narrowed = match overflow.element.field() {
                Some(Field::Quote) => quote.narrow(&record.content),
                Some(Field::Reflection) => reflection.narrow(&record.reflection),
                None => false,
            };
            if narrowed {
                continue;
            }
        }

        scale *= config.layout.fit_step;
        let smallest = quote.font_size.min(reflection.font_size) as f32 * scale;
        if smallest < t.min_font_size as f32 {
            return Err(Error::LayoutError(format!(
                "record {}: {:?} does not fit on a {}x{} canvas",
                record.id, overflow.element, config.canvas.width, config.canvas.height
            )));
        }
    }
}
