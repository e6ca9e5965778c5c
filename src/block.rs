//! Block layout of a single atom at a fixed width.
//!
//! The same layout drives measurement (`TextMetricsOracle`) and drawing
//! (`raster`), so a committed fragment is drawn exactly as it was measured.

use crate::atom::{
    Atom, AtomContent, CharacterContent, CharacterFields, Continuation, HeaderContent,
    LocationContent, LocationFields, TimelineContent,
};
use crate::font::FontMetrics;
use crate::style::{StyleSheet, TextStyle};
use crate::types::{Color, Pt, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubElement {
    Text,
    Label,
    Body,
    Portrait,
    Name,
    Role,
    Stats,
    Description,
    Header,
    ItemTag,
    Trigger,
    Title,
    Subtitle,
    Meta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineBox {
    pub element: SubElement,
    /// Offsets relative to the block's top-left corner.
    pub x: Pt,
    pub y: Pt,
    pub width: Pt,
    pub text: String,
    pub style: TextStyle,
    pub centered: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShapeKind {
    Rect,
    Bullet,
    Rule,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shape {
    pub kind: ShapeKind,
    pub rect: Rect,
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockLayout {
    pub height: Pt,
    pub margin_bottom: Pt,
    pub lines: Vec<LineBox>,
    pub shapes: Vec<Shape>,
    /// Top offset of each visible sub-element.
    pub offsets: Vec<(SubElement, Pt)>,
}

/// Vertical stack of wrapped text runs inside one column of a block.
struct Stack<'a> {
    metrics: &'a FontMetrics,
    x: Pt,
    width: Pt,
    y: Pt,
    gap: Pt,
    started: bool,
    lines: Vec<LineBox>,
    offsets: Vec<(SubElement, Pt)>,
}

impl<'a> Stack<'a> {
    fn new(metrics: &'a FontMetrics, x: Pt, y: Pt, width: Pt, gap: Pt) -> Self {
        Self {
            metrics,
            x,
            width,
            y,
            gap,
            started: false,
            lines: Vec::new(),
            offsets: Vec::new(),
        }
    }

    fn push(&mut self, element: SubElement, text: &str, style: TextStyle) {
        self.push_aligned(element, text, style, false);
    }

    fn push_aligned(&mut self, element: SubElement, text: &str, style: TextStyle, centered: bool) {
        let wrapped = self.metrics.wrap(text, self.width, &style);
        if wrapped.is_empty() {
            return;
        }
        if self.started {
            self.y += self.gap;
        }
        self.started = true;
        self.offsets.push((element, self.y));
        for line in wrapped {
            self.lines.push(LineBox {
                element,
                x: self.x,
                y: self.y,
                width: self.width,
                text: line,
                style,
                centered,
            });
            self.y += style.line_height;
        }
    }
}

pub fn layout_atom(
    atom: &Atom,
    width: Pt,
    sheet: &StyleSheet,
    metrics: &FontMetrics,
) -> BlockLayout {
    let block = sheet.block(atom.kind);
    let mut layout = match &atom.content {
        AtomContent::Text(text) => {
            let style = if atom.kind == crate::atom::AtomKind::Heading {
                sheet.heading_text(atom.level)
            } else {
                block.text
            };
            let mut stack = Stack::new(metrics, Pt::ZERO, Pt::ZERO, width, Pt::ZERO);
            stack.push(SubElement::Text, text, style);
            finish_stack(stack)
        }
        AtomContent::Opaque { text, .. } => {
            let mut stack = Stack::new(metrics, Pt::ZERO, Pt::ZERO, width, Pt::ZERO);
            stack.push(SubElement::Text, text, block.text);
            finish_stack(stack)
        }
        AtomContent::Timeline(entry) => {
            layout_timeline(atom.continuation, entry, width, sheet, metrics)
        }
        AtomContent::Character(card) => layout_character(card, width, sheet, metrics),
        AtomContent::Location(card) => layout_location(card, width, sheet, metrics),
        AtomContent::Header(header) => layout_header(header, width, sheet, metrics),
    };
    layout.margin_bottom = block.margin_bottom;
    layout
}

fn finish_stack(stack: Stack<'_>) -> BlockLayout {
    BlockLayout {
        height: stack.y,
        margin_bottom: Pt::ZERO,
        lines: stack.lines,
        shapes: Vec::new(),
        offsets: stack.offsets,
    }
}

fn layout_timeline(
    continuation: Continuation,
    entry: &TimelineContent,
    width: Pt,
    sheet: &StyleSheet,
    metrics: &FontMetrics,
) -> BlockLayout {
    let indent = sheet.timeline_indent;
    let inner = (width - indent).max(Pt::from_i32(1));
    let mut stack = Stack::new(metrics, indent, Pt::ZERO, inner, Pt::ZERO);
    if entry.show_label {
        stack.push(SubElement::Label, &entry.label, sheet.timeline_label);
    }
    stack.push(SubElement::Body, &entry.body, sheet.timeline.text);
    let mut layout = finish_stack(stack);
    if !continuation.continues_previous() && layout.height.is_positive() {
        let size = Pt::from_f32(4.0);
        let lead = if entry.show_label {
            sheet.timeline_label.line_height
        } else {
            sheet.timeline.text.line_height
        };
        layout.shapes.push(Shape {
            kind: ShapeKind::Bullet,
            rect: Rect {
                x: Pt::ZERO,
                y: (lead - size).max(Pt::ZERO) / 2,
                width: size,
                height: size,
            },
            fill: Some(sheet.timeline_label.color),
            stroke: None,
        });
    }
    layout
}

fn card_background(width: Pt, height: Pt, sheet_block: &crate::style::BlockStyle) -> Shape {
    Shape {
        kind: ShapeKind::Rect,
        rect: Rect {
            x: Pt::ZERO,
            y: Pt::ZERO,
            width,
            height,
        },
        fill: sheet_block.background,
        stroke: sheet_block.border,
    }
}

fn layout_character(
    card: &CharacterContent,
    width: Pt,
    sheet: &StyleSheet,
    metrics: &FontMetrics,
) -> BlockLayout {
    let block = &sheet.character;
    let pad = block.padding;
    let inner = (width - pad - pad).max(Pt::from_i32(1));
    let show_portrait = card.shows(CharacterFields::PORTRAIT);
    let portrait_gap = Pt::from_f32(8.0);
    let (info_x, info_width) = if show_portrait {
        (
            pad + sheet.portrait_size + portrait_gap,
            (inner - sheet.portrait_size - portrait_gap).max(Pt::from_i32(1)),
        )
    } else {
        (pad, inner)
    };

    let mut stack = Stack::new(metrics, info_x, pad, info_width, sheet.field_gap);
    if card.shows(CharacterFields::NAME) {
        stack.push(SubElement::Name, &card.name, sheet.character_name);
    }
    if card.shows(CharacterFields::ROLE) {
        stack.push(SubElement::Role, &card.role, sheet.character_role);
    }
    if card.shows(CharacterFields::STATS) {
        stack.push(SubElement::Stats, &card.stats, sheet.character_stats);
    }
    if card.shows(CharacterFields::DESCRIPTION) {
        stack.push(SubElement::Description, &card.description, block.text);
    }
    let info_height = stack.y - pad;
    let mut offsets = stack.offsets;
    let lines = stack.lines;

    let mut shapes = Vec::new();
    let mut inner_height = info_height;
    if show_portrait {
        inner_height = inner_height.max(sheet.portrait_size);
        offsets.insert(0, (SubElement::Portrait, pad));
    }
    let height = pad + inner_height + pad;
    shapes.push(card_background(width, height, block));
    if show_portrait {
        shapes.push(Shape {
            kind: ShapeKind::Rect,
            rect: Rect {
                x: pad,
                y: pad,
                width: sheet.portrait_size,
                height: sheet.portrait_size,
            },
            fill: Some(Color::from_hex(crate::style::RULE)),
            stroke: Some(sheet.character_name.color),
        });
    }
    BlockLayout {
        height,
        margin_bottom: Pt::ZERO,
        lines,
        shapes,
        offsets,
    }
}

fn layout_location(
    card: &LocationContent,
    width: Pt,
    sheet: &StyleSheet,
    metrics: &FontMetrics,
) -> BlockLayout {
    let block = &sheet.location;
    let pad = block.padding;
    let inner = (width - pad - pad).max(Pt::from_i32(1));
    let mut stack = Stack::new(metrics, pad, pad, inner, sheet.field_gap);
    if card.visible.contains(LocationFields::HEADER) {
        stack.push(SubElement::Header, &card.header, sheet.location_header);
        if let Some(item) = &card.item_tag {
            stack.push(SubElement::ItemTag, item, sheet.location_item);
        }
    }
    if card.visible.contains(LocationFields::DESCRIPTION) {
        stack.push(SubElement::Description, &card.description, block.text);
    }
    if card.shows_trigger() {
        if let Some(trigger) = &card.trigger_event {
            stack.push(SubElement::Trigger, trigger, sheet.location_trigger);
        }
    }
    let height = stack.y + pad;
    let background = card_background(width, height, block);
    BlockLayout {
        height,
        margin_bottom: Pt::ZERO,
        lines: stack.lines,
        shapes: vec![background],
        offsets: stack.offsets,
    }
}

fn layout_header(
    header: &HeaderContent,
    width: Pt,
    sheet: &StyleSheet,
    metrics: &FontMetrics,
) -> BlockLayout {
    let mut stack = Stack::new(metrics, Pt::ZERO, Pt::ZERO, width, Pt::from_f32(6.0));
    stack.push_aligned(SubElement::Title, &header.title, sheet.header_title, true);
    stack.push_aligned(SubElement::Subtitle, &header.subtitle, sheet.header_subtitle, true);
    let meta = header
        .meta
        .iter()
        .map(|m| m.trim())
        .filter(|m| !m.is_empty())
        .collect::<Vec<_>>()
        .join("    ");
    stack.push_aligned(SubElement::Meta, &meta, sheet.header_meta, true);
    let rule_gap = Pt::from_f32(6.0);
    let rule_y = stack.y + rule_gap;
    let mut layout = finish_stack(stack);
    layout.shapes.push(Shape {
        kind: ShapeKind::Rule,
        rect: Rect {
            x: Pt::ZERO,
            y: rule_y,
            width,
            height: Pt::from_f32(1.0),
        },
        fill: Some(sheet.header_title.color),
        stroke: None,
    });
    layout.height = rule_y + Pt::from_f32(1.0);
    layout
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::{AtomKind, CharacterFields};

    fn character(visible: CharacterFields, description: &str) -> Atom {
        Atom {
            kind: AtomKind::CharacterCard,
            index: 0,
            level: 0,
            continuation: Continuation::None,
            content: AtomContent::Character(CharacterContent {
                portrait: true,
                name: "Ada Whitlock".to_string(),
                role: "Librarian".to_string(),
                stats: "INT 80 POW 65".to_string(),
                description: description.to_string(),
                visible,
            }),
        }
    }

    #[test]
    fn paragraph_height_is_line_count_times_leading() {
        let sheet = StyleSheet::default();
        let metrics = FontMetrics::default();
        let atom = Atom::text(AtomKind::Paragraph, 0, "word ".repeat(40));
        let layout = layout_atom(&atom, Pt::from_i32(120), &sheet, &metrics);
        let lines = layout.lines.len();
        assert!(lines > 1);
        assert_eq!(layout.height, sheet.paragraph.text.line_height.times(lines));
        assert_eq!(layout.margin_bottom, sheet.paragraph.margin_bottom);
    }

    #[test]
    fn hiding_card_fields_never_grows_the_card() {
        let sheet = StyleSheet::default();
        let metrics = FontMetrics::default();
        let width = Pt::from_i32(200);
        let full = layout_atom(
            &character(CharacterFields::all(), "A quiet archivist."),
            width,
            &sheet,
            &metrics,
        );
        let desc_only = layout_atom(
            &character(CharacterFields::DESCRIPTION, "A quiet archivist."),
            width,
            &sheet,
            &metrics,
        );
        let shell = layout_atom(&character(CharacterFields::empty(), ""), width, &sheet, &metrics);
        assert!(desc_only.height < full.height);
        assert_eq!(shell.height, sheet.character.padding + sheet.character.padding);
        assert!(full.offsets.iter().any(|(e, _)| *e == SubElement::Portrait));
        assert!(!desc_only.offsets.iter().any(|(e, _)| *e == SubElement::Name));
    }

    #[test]
    fn end_fragment_timeline_has_no_bullet_or_label() {
        let sheet = StyleSheet::default();
        let metrics = FontMetrics::default();
        let entry = TimelineContent {
            label: "Day 3".to_string(),
            body: "The bells ring at midnight.".to_string(),
            show_label: false,
        };
        let layout =
            layout_timeline(Continuation::End, &entry, Pt::from_i32(200), &sheet, &metrics);
        assert!(layout.shapes.is_empty());
        assert!(layout.lines.iter().all(|l| l.element == SubElement::Body));
    }

    #[test]
    fn header_lines_are_centered() {
        let sheet = StyleSheet::default();
        let metrics = FontMetrics::default();
        let header = HeaderContent {
            title: "The Black Water Curse".to_string(),
            subtitle: "Curse of Black Water".to_string(),
            meta: vec!["Era: 1925".to_string(), " ".to_string()],
        };
        let layout = layout_header(&header, Pt::from_i32(450), &sheet, &metrics);
        assert_eq!(layout.lines.len(), 3);
        assert!(layout.lines.iter().all(|l| l.centered));
        assert_eq!(layout.lines[2].text, "Era: 1925");
    }
}
