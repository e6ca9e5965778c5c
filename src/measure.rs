//! Measurement Oracle: the capability that turns a tentative rendering of
//! an atom into geometry.
//!
//! Implementations must be deterministic for identical input, and height
//! must not decrease when a text field grows (the split search relies on
//! it). `&mut self` keeps one measurement surface in use at a time.

use crate::atom::{Atom, AtomContent, CharacterFields, LocationFields};
use crate::block::{SubElement, layout_atom};
use crate::font::FontMetrics;
use crate::style::StyleSheet;
use crate::types::{MM_PER_INCH, PT_PER_INCH, Pt};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Measurement {
    pub height: Pt,
    pub margin_bottom: Pt,
    pub sub_offsets: Vec<(SubElement, Pt)>,
}

pub trait MeasurementOracle {
    /// Measures `unit_length_mm` millimetres in this oracle's units and
    /// returns units per millimetre. Called once per run.
    fn calibrate(&mut self, unit_length_mm: f32) -> f32;

    /// Geometry of `atom` laid out at `width`.
    fn measure(&mut self, atom: &Atom, width: Pt) -> Measurement;
}

/// Oracle backed by font metrics and the block layout used for drawing.
/// Units are typographic points.
#[derive(Debug, Clone)]
pub struct TextMetricsOracle {
    sheet: StyleSheet,
    metrics: FontMetrics,
}

impl TextMetricsOracle {
    pub fn new(sheet: StyleSheet, metrics: FontMetrics) -> Self {
        Self { sheet, metrics }
    }

    pub fn sheet(&self) -> &StyleSheet {
        &self.sheet
    }

    pub fn metrics(&self) -> &FontMetrics {
        &self.metrics
    }
}

impl Default for TextMetricsOracle {
    fn default() -> Self {
        Self::new(StyleSheet::default(), FontMetrics::default())
    }
}

impl MeasurementOracle for TextMetricsOracle {
    fn calibrate(&mut self, unit_length_mm: f32) -> f32 {
        if !(unit_length_mm.is_finite() && unit_length_mm > 0.0) {
            return PT_PER_INCH / MM_PER_INCH;
        }
        let measured = Pt::from_f32(unit_length_mm / MM_PER_INCH * PT_PER_INCH);
        measured.to_f32() / unit_length_mm
    }

    fn measure(&mut self, atom: &Atom, width: Pt) -> Measurement {
        let layout = layout_atom(atom, width, &self.sheet, &self.metrics);
        Measurement {
            height: layout.height,
            margin_bottom: layout.margin_bottom,
            sub_offsets: layout.offsets,
        }
    }
}

/// Width-independent oracle: every text field takes
/// `ceil(chars / line_capacity) * line_height`. Cards add padding on both
/// sides and a fixed portrait height. Useful wherever a real renderer is
/// not wanted.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearOracle {
    pub line_capacity: usize,
    pub line_height: Pt,
    pub margin_bottom: Pt,
    pub card_padding: Pt,
    pub portrait_height: Pt,
    pub units_per_mm: f32,
}

impl LinearOracle {
    pub fn new(line_capacity: usize, line_height: Pt) -> Self {
        Self {
            line_capacity: line_capacity.max(1),
            line_height,
            margin_bottom: Pt::ZERO,
            card_padding: Pt::ZERO,
            portrait_height: Pt::ZERO,
            units_per_mm: 1.0,
        }
    }

    pub fn with_margin_bottom(mut self, margin: Pt) -> Self {
        self.margin_bottom = margin;
        self
    }

    pub fn with_card_chrome(mut self, padding: Pt, portrait_height: Pt) -> Self {
        self.card_padding = padding;
        self.portrait_height = portrait_height;
        self
    }

    pub fn field_height(&self, text: &str) -> Pt {
        let chars = text.chars().count();
        let lines = chars.div_ceil(self.line_capacity);
        self.line_height.times(lines)
    }

    fn stack(
        &self,
        offsets: &mut Vec<(SubElement, Pt)>,
        y: &mut Pt,
        element: SubElement,
        height: Pt,
    ) {
        if height.is_positive() {
            offsets.push((element, *y));
            *y += height;
        }
    }
}

impl MeasurementOracle for LinearOracle {
    fn calibrate(&mut self, _unit_length_mm: f32) -> f32 {
        self.units_per_mm
    }

    fn measure(&mut self, atom: &Atom, _width: Pt) -> Measurement {
        let mut offsets = Vec::new();
        let mut y = Pt::ZERO;
        match &atom.content {
            AtomContent::Text(text) | AtomContent::Opaque { text, .. } => {
                self.stack(&mut offsets, &mut y, SubElement::Text, self.field_height(text));
            }
            AtomContent::Timeline(entry) => {
                if entry.show_label {
                    self.stack(
                        &mut offsets,
                        &mut y,
                        SubElement::Label,
                        self.field_height(&entry.label),
                    );
                }
                self.stack(&mut offsets, &mut y, SubElement::Body, self.field_height(&entry.body));
            }
            AtomContent::Character(card) => {
                y = self.card_padding;
                if card.shows(CharacterFields::PORTRAIT) {
                    self.stack(&mut offsets, &mut y, SubElement::Portrait, self.portrait_height);
                }
                let fields = [
                    (CharacterFields::NAME, SubElement::Name, &card.name),
                    (CharacterFields::ROLE, SubElement::Role, &card.role),
                    (CharacterFields::STATS, SubElement::Stats, &card.stats),
                    (CharacterFields::DESCRIPTION, SubElement::Description, &card.description),
                ];
                for (flag, element, text) in fields {
                    if card.shows(flag) {
                        self.stack(&mut offsets, &mut y, element, self.field_height(text));
                    }
                }
                y += self.card_padding;
            }
            AtomContent::Location(card) => {
                y = self.card_padding;
                if card.visible.contains(LocationFields::HEADER) {
                    self.stack(
                        &mut offsets,
                        &mut y,
                        SubElement::Header,
                        self.field_height(&card.header),
                    );
                    if let Some(item) = &card.item_tag {
                        self.stack(
                            &mut offsets,
                            &mut y,
                            SubElement::ItemTag,
                            self.field_height(item),
                        );
                    }
                }
                if card.visible.contains(LocationFields::DESCRIPTION) {
                    self.stack(
                        &mut offsets,
                        &mut y,
                        SubElement::Description,
                        self.field_height(&card.description),
                    );
                }
                if card.shows_trigger() {
                    if let Some(trigger) = &card.trigger_event {
                        self.stack(
                            &mut offsets,
                            &mut y,
                            SubElement::Trigger,
                            self.field_height(trigger),
                        );
                    }
                }
                y += self.card_padding;
            }
            AtomContent::Header(header) => {
                self.stack(
                    &mut offsets,
                    &mut y,
                    SubElement::Title,
                    self.field_height(&header.title),
                );
                self.stack(
                    &mut offsets,
                    &mut y,
                    SubElement::Subtitle,
                    self.field_height(&header.subtitle),
                );
                self.stack(
                    &mut offsets,
                    &mut y,
                    SubElement::Meta,
                    self.field_height(&header.meta.join("  ")),
                );
            }
        }
        Measurement {
            height: y,
            margin_bottom: self.margin_bottom,
            sub_offsets: offsets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::AtomKind;

    #[test]
    fn linear_oracle_rounds_partial_lines_up() {
        let mut oracle = LinearOracle::new(10, Pt::from_i32(20));
        let atom = Atom::text(AtomKind::Paragraph, 0, "x".repeat(250));
        assert_eq!(oracle.measure(&atom, Pt::ZERO).height, Pt::from_i32(500));
        let atom = Atom::text(AtomKind::Paragraph, 0, "x".repeat(251));
        assert_eq!(oracle.measure(&atom, Pt::ZERO).height, Pt::from_i32(520));
        let atom = Atom::text(AtomKind::Paragraph, 0, "");
        assert_eq!(oracle.measure(&atom, Pt::ZERO).height, Pt::ZERO);
    }

    #[test]
    fn linear_oracle_is_deterministic_and_reports_offsets() {
        let mut oracle =
            LinearOracle::new(10, Pt::from_i32(20)).with_margin_bottom(Pt::from_i32(4));
        let atom = Atom {
            kind: AtomKind::TimelineEntry,
            index: 0,
            level: 0,
            continuation: crate::atom::Continuation::None,
            content: AtomContent::Timeline(crate::atom::TimelineContent {
                label: "Day 1".to_string(),
                body: "y".repeat(15),
                show_label: true,
            }),
        };
        let first = oracle.measure(&atom, Pt::from_i32(100));
        let second = oracle.measure(&atom, Pt::from_i32(100));
        assert_eq!(first, second);
        assert_eq!(first.height, Pt::from_i32(60));
        assert_eq!(first.margin_bottom, Pt::from_i32(4));
        assert_eq!(
            first.sub_offsets,
            vec![(SubElement::Label, Pt::ZERO), (SubElement::Body, Pt::from_i32(20))]
        );
    }

    #[test]
    fn text_metrics_calibration_matches_points_per_millimetre() {
        let mut oracle = TextMetricsOracle::default();
        let scale = oracle.calibrate(100.0);
        assert!((scale - 72.0 / 25.4).abs() < 1e-3);
        assert!((oracle.calibrate(f32::NAN) - 72.0 / 25.4).abs() < 1e-6);
    }

    #[test]
    fn text_metrics_height_grows_with_text() {
        let mut oracle = TextMetricsOracle::default();
        let width = Pt::from_i32(200);
        let short = Atom::text(AtomKind::Paragraph, 0, "Fog rolls in.");
        let long = Atom::text(AtomKind::Paragraph, 0, "Fog rolls in. ".repeat(30));
        let a = oracle.measure(&short, width);
        let b = oracle.measure(&long, width);
        assert!(b.height > a.height);
        assert_eq!(a.margin_bottom, oracle.sheet().paragraph.margin_bottom);
    }
}
