//! Block styles shared by text measurement and rasterization. All lengths
//! are typographic points (1/72 in).

use crate::atom::AtomKind;
use crate::types::{Color, Pt};

pub const ACCENT: u32 = 0x8a0303;
pub const PANEL: u32 = 0xfdf6e3;
pub const INK: u32 = 0x433422;
pub const MUTED: u32 = 0x8b7d6b;
pub const RULE: u32 = 0xd4c5a9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font_size: Pt,
    pub line_height: Pt,
    pub color: Color,
    pub bold: bool,
}

impl TextStyle {
    pub fn new(font_size: f32, line_height: f32, color: u32) -> Self {
        Self {
            font_size: Pt::from_f32(font_size),
            line_height: Pt::from_f32(line_height),
            color: Color::from_hex(color),
            bold: false,
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockStyle {
    pub text: TextStyle,
    pub padding: Pt,
    pub margin_bottom: Pt,
    pub background: Option<Color>,
    pub border: Option<Color>,
}

impl BlockStyle {
    pub fn plain(text: TextStyle, margin_bottom: f32) -> Self {
        Self {
            text,
            padding: Pt::ZERO,
            margin_bottom: Pt::from_f32(margin_bottom),
            background: None,
            border: None,
        }
    }

    pub fn boxed(text: TextStyle, padding: f32, margin_bottom: f32) -> Self {
        Self {
            text,
            padding: Pt::from_f32(padding),
            margin_bottom: Pt::from_f32(margin_bottom),
            background: Some(Color::from_hex(PANEL)),
            border: Some(Color::from_hex(RULE)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyleSheet {
    pub header: BlockStyle,
    pub header_title: TextStyle,
    pub header_subtitle: TextStyle,
    pub header_meta: TextStyle,
    pub heading: BlockStyle,
    pub paragraph: BlockStyle,
    pub meta: BlockStyle,
    pub timeline: BlockStyle,
    pub timeline_label: TextStyle,
    /// Left indent of timeline bodies (room for the bullet).
    pub timeline_indent: Pt,
    pub character: BlockStyle,
    pub character_name: TextStyle,
    pub character_role: TextStyle,
    pub character_stats: TextStyle,
    pub portrait_size: Pt,
    pub location: BlockStyle,
    pub location_header: TextStyle,
    pub location_item: TextStyle,
    pub location_trigger: TextStyle,
    pub generic: BlockStyle,
    /// Vertical gap between stacked fields inside a card.
    pub field_gap: Pt,
}

impl Default for StyleSheet {
    fn default() -> Self {
        let body = TextStyle::new(10.0, 14.0, INK);
        Self {
            header: BlockStyle::plain(TextStyle::new(11.0, 15.0, MUTED), 18.0),
            header_title: TextStyle::new(26.0, 32.0, ACCENT).bold(),
            header_subtitle: TextStyle::new(12.0, 16.0, MUTED),
            header_meta: TextStyle::new(10.0, 14.0, MUTED),
            heading: BlockStyle::plain(TextStyle::new(15.0, 20.0, ACCENT).bold(), 8.0),
            paragraph: BlockStyle::plain(body, 10.0),
            meta: BlockStyle::plain(TextStyle::new(9.0, 12.0, MUTED), 8.0),
            timeline: BlockStyle::plain(TextStyle::new(9.5, 13.5, INK), 8.0),
            timeline_label: TextStyle::new(9.5, 13.5, ACCENT).bold(),
            timeline_indent: Pt::from_f32(10.0),
            character: BlockStyle::boxed(TextStyle::new(9.5, 13.5, INK), 8.0, 12.0),
            character_name: TextStyle::new(12.0, 16.0, ACCENT).bold(),
            character_role: TextStyle::new(9.0, 12.5, MUTED),
            character_stats: TextStyle::new(8.5, 12.0, INK),
            portrait_size: Pt::from_f32(42.0),
            location: BlockStyle::boxed(TextStyle::new(9.5, 13.5, INK), 8.0, 12.0),
            location_header: TextStyle::new(11.5, 15.5, ACCENT).bold(),
            location_item: TextStyle::new(9.0, 12.5, MUTED),
            location_trigger: TextStyle::new(9.0, 13.0, ACCENT),
            generic: BlockStyle::plain(body, 10.0),
            field_gap: Pt::from_f32(3.0),
        }
    }
}

impl StyleSheet {
    pub fn block(&self, kind: AtomKind) -> &BlockStyle {
        match kind {
            AtomKind::Heading => &self.heading,
            AtomKind::Paragraph => &self.paragraph,
            AtomKind::MetaLine => &self.meta,
            AtomKind::TimelineEntry => &self.timeline,
            AtomKind::CharacterCard => &self.character,
            AtomKind::LocationCard => &self.location,
            AtomKind::SpanningHeader => &self.header,
            AtomKind::GenericBlock => &self.generic,
        }
    }

    /// Heading text scaled down for deeper levels.
    pub fn heading_text(&self, level: u8) -> TextStyle {
        let base = self.heading.text;
        if level <= 1 {
            return base;
        }
        let factor = match level {
            2 => 0.88,
            _ => 0.78,
        };
        TextStyle {
            font_size: base.font_size * factor,
            line_height: base.line_height * factor,
            ..base
        }
    }
}
