//! The layout engine: places atoms into two-column pages in document order.

use crate::atom::{Atom, AtomKind};
use crate::atomizer::atomize;
use crate::column::AddResult;
use crate::debug::{DebugLogger, Field, layout_trace_enabled};
use crate::document::ModuleDocument;
use crate::error::GutterError;
use crate::geometry::{PageGeometry, ResolvedGeometry};
use crate::measure::MeasurementOracle;
use crate::metrics::{LayoutMetrics, PageMetrics};
use crate::page::{Layout, LayoutWarning, Page, PlacedFragment};
use crate::progress::{Phase, ProgressCallback, ProgressEvent, report};
use crate::split::Probe;
use crate::types::Pt;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOptions {
    /// Slack allowed when comparing a measured bottom edge to the limit.
    pub tolerance: Pt,
    /// Subtracted from the content height to get the column limit.
    pub column_reserve: Pt,
    /// A non-empty column with less budget than this is closed instead of
    /// splitting into it.
    pub min_split_height: Pt,
    /// Shortest head a text cut may leave behind.
    pub min_fragment_chars: usize,
    /// Length handed to the oracle's calibration.
    pub calibration_mm: f32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            tolerance: Pt::from_f32(0.5),
            column_reserve: Pt::from_i32(2),
            min_split_height: Pt::from_i32(12),
            min_fragment_chars: 5,
            calibration_mm: 100.0,
        }
    }
}

impl LayoutOptions {
    pub fn validate(&self) -> Result<(), GutterError> {
        let lengths = [
            ("tolerance", self.tolerance),
            ("column_reserve", self.column_reserve),
            ("min_split_height", self.min_split_height),
        ];
        for (name, value) in lengths {
            if value < Pt::ZERO {
                return Err(GutterError::InvalidConfiguration(format!(
                    "{name} must not be negative, got {}",
                    value.to_f32()
                )));
            }
        }
        if !self.calibration_mm.is_finite() || self.calibration_mm <= 0.0 {
            return Err(GutterError::InvalidConfiguration(format!(
                "calibration_mm must be positive, got {}",
                self.calibration_mm
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutPhase {
    EmptyPage,
    HeaderPending,
    FillingColumn0,
    FillingColumn1,
    PageFull,
    Done,
}

/// The layout cursor: the page being filled, the active column and the
/// current phase. Owned by exactly one session.
#[derive(Debug, Clone)]
pub struct LayoutState {
    pub page: Page,
    pub column: usize,
    pub phase: LayoutPhase,
}

impl LayoutState {
    fn fresh(number: usize, column_limit: Pt) -> Self {
        Self {
            page: Page::new(number, column_limit),
            column: 0,
            phase: LayoutPhase::EmptyPage,
        }
    }

    fn filling(&self) -> LayoutPhase {
        if self.column == 0 {
            LayoutPhase::FillingColumn0
        } else {
            LayoutPhase::FillingColumn1
        }
    }
}

/// One pagination run. `step` places one source atom (and every fragment
/// split from it) so a host can yield between atoms; dropping the session
/// abandons the run.
pub struct LayoutSession<'o> {
    oracle: &'o mut dyn MeasurementOracle,
    options: LayoutOptions,
    geometry: ResolvedGeometry,
    column_limit: Pt,
    atoms: std::vec::IntoIter<Atom>,
    pending_header: Option<Atom>,
    total: usize,
    placed: usize,
    state: LayoutState,
    pages: Vec<Page>,
    warnings: Vec<LayoutWarning>,
    metrics: LayoutMetrics,
    debug: Option<Arc<DebugLogger>>,
    progress: Option<ProgressCallback>,
    started: Instant,
}

impl<'o> LayoutSession<'o> {
    pub fn new(
        document: &ModuleDocument,
        oracle: &'o mut dyn MeasurementOracle,
        geometry: &PageGeometry,
        options: LayoutOptions,
    ) -> Result<Self, GutterError> {
        if document.is_empty() {
            return Err(GutterError::MissingContent(
                "module document has no content".to_string(),
            ));
        }
        Self::from_atoms(atomize(document), oracle, geometry, options)
    }

    pub fn from_atoms(
        atoms: Vec<Atom>,
        oracle: &'o mut dyn MeasurementOracle,
        geometry: &PageGeometry,
        options: LayoutOptions,
    ) -> Result<Self, GutterError> {
        if atoms.is_empty() {
            return Err(GutterError::MissingContent(
                "document produced no atoms".to_string(),
            ));
        }
        options.validate()?;
        let scale = oracle.calibrate(options.calibration_mm);
        let geometry = geometry.resolve(scale)?;
        let column_limit = geometry.content_height - options.column_reserve;
        if !column_limit.is_positive() {
            return Err(GutterError::InvalidGeometry(format!(
                "column reserve {} consumes the content height {}",
                options.column_reserve.to_f32(),
                geometry.content_height.to_f32()
            )));
        }
        Ok(Self {
            oracle,
            options,
            geometry,
            column_limit,
            total: atoms.len(),
            atoms: atoms.into_iter(),
            pending_header: None,
            placed: 0,
            state: LayoutState::fresh(1, column_limit),
            pages: Vec::new(),
            warnings: Vec::new(),
            metrics: LayoutMetrics::default(),
            debug: None,
            progress: None,
            started: Instant::now(),
        })
    }

    pub(crate) fn with_debug(mut self, debug: Option<Arc<DebugLogger>>) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_progress(mut self, progress: Option<ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    pub fn state(&self) -> &LayoutState {
        &self.state
    }

    pub fn geometry(&self) -> &ResolvedGeometry {
        &self.geometry
    }

    /// Column height before any header is subtracted.
    pub fn column_limit(&self) -> Pt {
        self.column_limit
    }

    pub fn finished_pages(&self) -> &[Page] {
        &self.pages
    }

    /// Source atoms not yet placed.
    pub fn remaining(&self) -> usize {
        self.total - self.placed
    }

    /// Places the next source atom. Returns `false` once every atom is placed.
    ///
    /// A spanning header takes two steps: the first closes the page in
    /// progress and leaves the session in `HeaderPending`, the second
    /// installs the header on the fresh page.
    pub fn step(&mut self) -> bool {
        if let Some(header) = self.pending_header.take() {
            self.place_header(header);
        } else {
            let Some(atom) = self.atoms.next() else {
                return false;
            };
            if atom.kind == AtomKind::SpanningHeader {
                self.begin_header(atom);
                return true;
            }
            self.place(atom);
        }
        self.placed += 1;
        report(
            self.progress.as_ref(),
            ProgressEvent::new(Phase::LayingOut, self.placed, self.total),
        );
        true
    }

    /// Places whatever is left and closes the run.
    pub fn finish(mut self) -> Layout {
        while self.step() {}
        let page = &self.state.page;
        if page.has_fragments() || page.header.is_some() || self.pages.is_empty() {
            self.close_page();
        }
        self.state.phase = LayoutPhase::Done;
        self.metrics.atoms = self.total;
        self.metrics.layout_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        if let Some(logger) = self.debug.as_deref() {
            logger.emit_summary("layout");
            logger.flush();
        }
        Layout {
            pages: self.pages,
            geometry: self.geometry,
            column_limit: self.column_limit,
            tolerance: self.options.tolerance,
            warnings: self.warnings,
            metrics: self.metrics,
        }
    }

    fn place(&mut self, atom: Atom) {
        let mut current = atom;
        loop {
            let column = self.state.column;
            let kind = current.kind;
            let index = current.index;
            let budget = self.state.page.columns[column].remaining();
            let mut probe = Probe::new(
                &mut *self.oracle,
                self.geometry.column_width,
                self.options.tolerance,
                self.options.min_fragment_chars,
            );
            let result = self.state.page.columns[column].add(current, &mut probe, &self.options);
            self.metrics.probes += probe.probes();
            match result {
                AddResult::Placed => {
                    self.state.phase = self.state.filling();
                    self.trace("place", kind, index, budget);
                    return;
                }
                AddResult::Forced => {
                    self.state.phase = self.state.filling();
                    self.metrics.forced_placements += 1;
                    self.warn(
                        index,
                        kind,
                        "smallest form is taller than an empty column; placed anyway",
                    );
                    self.log(
                        "layout.force_place",
                        &[
                            ("atom", Field::Int(index as i64)),
                            ("kind", Field::Str(kind.name())),
                            ("page", Field::Int(self.state.page.number as i64)),
                            ("column", Field::Int(column as i64)),
                        ],
                    );
                    self.trace("force", kind, index, budget);
                    return;
                }
                AddResult::Split(tail) => {
                    self.metrics.splits += 1;
                    self.log(
                        "layout.split",
                        &[
                            ("atom", Field::Int(index as i64)),
                            ("kind", Field::Str(kind.name())),
                            ("page", Field::Int(self.state.page.number as i64)),
                            ("column", Field::Int(column as i64)),
                            ("budget", Field::Num(budget.to_f32() as f64)),
                        ],
                    );
                    self.trace("split", kind, index, budget);
                    self.advance("split");
                    current = tail;
                }
                AddResult::Deferred(atom) => {
                    self.metrics.deferrals += 1;
                    self.log(
                        "layout.defer",
                        &[
                            ("atom", Field::Int(index as i64)),
                            ("kind", Field::Str(kind.name())),
                            ("page", Field::Int(self.state.page.number as i64)),
                            ("column", Field::Int(column as i64)),
                            ("budget", Field::Num(budget.to_f32() as f64)),
                        ],
                    );
                    self.trace("defer", kind, index, budget);
                    self.advance("defer");
                    current = atom;
                }
            }
        }
    }

    /// Every header starts a page of its own.
    fn begin_header(&mut self, atom: Atom) {
        if self.state.page.has_fragments() || self.state.page.header.is_some() {
            self.close_page();
        }
        self.state.phase = LayoutPhase::HeaderPending;
        self.pending_header = Some(atom);
    }

    fn place_header(&mut self, atom: Atom) {
        let measured = self.oracle.measure(&atom, self.geometry.content_width);
        self.metrics.probes += 1;
        let (kind, index) = (atom.kind, atom.index);
        let forced = measured.height + measured.margin_bottom >= self.column_limit;
        let header = PlacedFragment {
            atom,
            y: Pt::ZERO,
            height: measured.height,
            margin_bottom: measured.margin_bottom,
            sub_offsets: measured.sub_offsets,
            forced,
        };
        self.state.page.set_header(header, self.column_limit);
        self.state.column = 0;
        self.state.phase = LayoutPhase::FillingColumn0;
        if forced {
            self.metrics.forced_placements += 1;
            self.warn(index, kind, "header leaves no room for the columns");
        }
        self.log(
            "layout.header",
            &[
                ("atom", Field::Int(index as i64)),
                ("page", Field::Int(self.state.page.number as i64)),
                ("height", Field::Num(self.state.page.header_height.to_f32() as f64)),
            ],
        );
        self.trace("header", kind, index, self.column_limit);
    }

    /// Column 0 moves to column 1; column 1 closes the page.
    fn advance(&mut self, reason: &str) {
        if self.state.column == 0 {
            self.state.column = 1;
            self.state.phase = LayoutPhase::FillingColumn1;
            self.log(
                "layout.column_break",
                &[
                    ("page", Field::Int(self.state.page.number as i64)),
                    ("reason", Field::Str(reason)),
                ],
            );
            return;
        }
        self.state.phase = LayoutPhase::PageFull;
        self.log(
            "layout.page_break",
            &[
                ("from_page", Field::Int(self.state.page.number as i64)),
                ("to_page", Field::Int(self.state.page.number as i64 + 1)),
                ("reason", Field::Str(reason)),
            ],
        );
        self.close_page();
    }

    fn close_page(&mut self) {
        let next = LayoutState::fresh(self.state.page.number + 1, self.column_limit);
        let done = std::mem::replace(&mut self.state, next);
        self.metrics.pages.push(PageMetrics {
            page_number: done.page.number,
            fragment_count: done.page.fragment_count(),
            has_header: done.page.header.is_some(),
        });
        self.pages.push(done.page);
    }

    fn warn(&mut self, atom_index: usize, kind: AtomKind, message: &str) {
        self.warnings.push(LayoutWarning {
            atom_index,
            kind,
            page: self.state.page.number,
            column: self.state.column,
            message: message.to_string(),
        });
    }

    fn log(&self, kind: &str, fields: &[(&str, Field<'_>)]) {
        if let Some(logger) = self.debug.as_deref() {
            logger.event(kind, fields);
        }
    }

    fn trace(&self, action: &str, kind: AtomKind, index: usize, budget: Pt) {
        if layout_trace_enabled() {
            let column = &self.state.page.columns[self.state.column];
            eprintln!(
                "[gutter.layout] {} atom={} kind={} page={} column={} budget={:.3} \
                 filled={:.3} phase={:?}",
                action,
                index,
                kind.name(),
                self.state.page.number,
                self.state.column,
                budget.to_f32(),
                column.filled_height().to_f32(),
                self.state.phase
            );
        }
    }
}

pub struct Paginator;

impl Paginator {
    /// Lays out `document` in one go.
    pub fn run(
        document: &ModuleDocument,
        oracle: &mut dyn MeasurementOracle,
        geometry: &PageGeometry,
        options: LayoutOptions,
    ) -> Result<Layout, GutterError> {
        Ok(LayoutSession::new(document, oracle, geometry, options)?.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::{
        AtomContent, CharacterContent, CharacterFields, Continuation, HeaderContent,
        LocationContent, LocationFields, TimelineContent,
    };
    use crate::document::{CharacterCard, LocationCard, Node, TitleBlock};
    use crate::measure::LinearOracle;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    fn oracle() -> LinearOracle {
        LinearOracle::new(10, Pt::from_i32(20))
    }

    /// A page whose columns hold exactly `column` units at scale 1.
    fn geometry(column: f32) -> PageGeometry {
        PageGeometry::new(210.0, column + 50.0, 25.0, 10.0)
    }

    fn options() -> LayoutOptions {
        LayoutOptions {
            column_reserve: Pt::ZERO,
            ..LayoutOptions::default()
        }
    }

    fn run(atoms: Vec<Atom>, oracle: &mut LinearOracle, column: f32) -> Layout {
        LayoutSession::from_atoms(atoms, oracle, &geometry(column), options())
            .unwrap()
            .finish()
    }

    fn header(index: usize, title: &str) -> Atom {
        Atom {
            kind: AtomKind::SpanningHeader,
            index,
            level: 0,
            continuation: Continuation::None,
            content: AtomContent::Header(HeaderContent {
                title: title.to_string(),
                subtitle: String::new(),
                meta: Vec::new(),
            }),
        }
    }

    fn timeline(index: usize, label: &str, body: &str) -> Atom {
        Atom {
            kind: AtomKind::TimelineEntry,
            index,
            level: 0,
            continuation: Continuation::None,
            content: AtomContent::Timeline(TimelineContent {
                label: label.to_string(),
                body: body.to_string(),
                show_label: true,
            }),
        }
    }

    fn character(index: usize, description: &str) -> Atom {
        Atom {
            kind: AtomKind::CharacterCard,
            index,
            level: 0,
            continuation: Continuation::None,
            content: AtomContent::Character(CharacterContent {
                portrait: false,
                name: "n".repeat(10),
                role: "r".repeat(10),
                stats: "s".repeat(40),
                description: description.to_string(),
                visible: CharacterFields::all(),
            }),
        }
    }

    #[test]
    fn empty_input_fails_before_layout() {
        let mut oracle = oracle();
        let err = LayoutSession::from_atoms(Vec::new(), &mut oracle, &geometry(300.0), options())
            .err()
            .unwrap();
        assert!(matches!(err, GutterError::MissingContent(_)));
        let empty = ModuleDocument::default();
        let err = Paginator::run(&empty, &mut oracle, &geometry(300.0), options()).unwrap_err();
        assert!(matches!(err, GutterError::MissingContent(_)));
        let wrappers_only = ModuleDocument::new(vec![Node::Section { children: Vec::new() }]);
        let err = Paginator::run(&wrappers_only, &mut oracle, &geometry(300.0), options())
            .unwrap_err();
        assert!(matches!(err, GutterError::MissingContent(_)));
    }

    #[test]
    fn bad_options_are_rejected() {
        let mut oracle = oracle();
        let bad = LayoutOptions {
            tolerance: Pt::from_i32(-1),
            ..options()
        };
        let atoms = vec![Atom::text(AtomKind::Paragraph, 0, "x")];
        assert!(matches!(
            LayoutSession::from_atoms(atoms.clone(), &mut oracle, &geometry(300.0), bad).err(),
            Some(GutterError::InvalidConfiguration(_))
        ));
        let greedy = LayoutOptions {
            column_reserve: Pt::from_i32(400),
            ..options()
        };
        assert!(matches!(
            LayoutSession::from_atoms(atoms, &mut oracle, &geometry(300.0), greedy).err(),
            Some(GutterError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn overflowing_paragraph_splits_into_exactly_two_fragments() {
        let mut oracle = oracle();
        let source = "x".repeat(250);
        let layout = run(
            vec![Atom::text(AtomKind::Paragraph, 0, source.clone())],
            &mut oracle,
            300.0,
        );
        assert_eq!(layout.page_count(), 1);
        let pieces = layout.fragments_of(0);
        assert_eq!(pieces.len(), 2);
        assert!(pieces[0].height <= Pt::from_i32(300));
        assert_eq!(pieces[0].height + pieces[1].height, Pt::from_i32(500));
        assert_eq!(layout.pages[0].columns[0].fragments().len(), 1);
        assert_eq!(layout.pages[0].columns[1].fragments().len(), 1);
        assert_eq!(
            layout.sequence(),
            vec![(0, Continuation::Start), (0, Continuation::End)]
        );
        assert_eq!(layout.metrics.splits, 1);
    }

    #[test]
    fn character_card_tail_holds_only_the_description() {
        let mut oracle = oracle();
        let layout = run(vec![character(0, &"d".repeat(40))], &mut oracle, 150.0);
        let pieces = layout.fragments_of(0);
        assert_eq!(pieces.len(), 2);
        let (AtomContent::Character(head), AtomContent::Character(tail)) =
            (&pieces[0].atom.content, &pieces[1].atom.content)
        else {
            panic!("character fragments expected");
        };
        assert!(head.shows(CharacterFields::NAME));
        assert!(head.shows(CharacterFields::ROLE));
        assert!(head.shows(CharacterFields::STATS));
        assert!(!head.description.is_empty());
        assert_eq!(tail.visible, CharacterFields::DESCRIPTION);
        assert_eq!(format!("{}{}", head.description, tail.description), "d".repeat(40));
    }

    #[test]
    fn timeline_with_oversized_label_moves_whole() {
        let mut oracle = oracle();
        // 260 of 300 units used, 40 left: the 60-unit label cannot fit
        let layout = run(
            vec![
                Atom::text(AtomKind::Paragraph, 0, "p".repeat(130)),
                timeline(1, &"L".repeat(30), "what happened"),
            ],
            &mut oracle,
            300.0,
        );
        let page = &layout.pages[0];
        assert!(page.columns[0].fragments().iter().all(|f| f.atom.index != 1));
        let moved = &page.columns[1].fragments()[0];
        assert_eq!(moved.atom.index, 1);
        assert_eq!(moved.atom.continuation, Continuation::None);
        assert_eq!(layout.metrics.deferrals, 1);
    }

    #[test]
    fn headings_are_never_split() {
        let mut oracle = oracle();
        let layout = run(
            vec![
                Atom::text(AtomKind::Paragraph, 0, "p".repeat(120)),
                Atom::text(AtomKind::Heading, 1, "h".repeat(40)),
            ],
            &mut oracle,
            300.0,
        );
        let pieces = layout.fragments_of(1);
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].atom.continuation, Continuation::None);
        assert_eq!(pieces[0].y, Pt::ZERO);
    }

    #[test]
    fn header_starts_a_new_page_and_shrinks_its_columns() {
        let mut oracle = oracle().with_margin_bottom(Pt::from_i32(10));
        let layout = run(
            vec![
                header(0, "Shadows over Innsmouth"),
                Atom::text(AtomKind::Paragraph, 1, "a".repeat(50)),
                header(2, "Appendix"),
                Atom::text(AtomKind::Paragraph, 3, "b".repeat(50)),
            ],
            &mut oracle,
            300.0,
        );
        assert_eq!(layout.page_count(), 2);
        for page in &layout.pages {
            let header = page.header.as_ref().unwrap();
            assert_eq!(header.atom.kind, AtomKind::SpanningHeader);
            assert_eq!(page.header_height, header.height + header.margin_bottom);
            assert_eq!(page.columns[0].limit(), layout.column_limit - page.header_height);
            assert!(page.fragments().all(|(_, f)| f.atom.kind != AtomKind::SpanningHeader));
        }
        // "Shadows over Innsmouth" wraps to three lines at ten per line
        assert_eq!(layout.pages[0].header_height, Pt::from_i32(70));
        assert_eq!(layout.metrics.pages.len(), 2);
        assert!(layout.metrics.pages.iter().all(|p| p.has_header));
    }

    #[test]
    fn consecutive_headers_each_get_a_page() {
        let mut oracle = oracle();
        let layout = run(vec![header(0, "One"), header(1, "Two")], &mut oracle, 300.0);
        assert_eq!(layout.page_count(), 2);
        assert!(layout.pages.iter().all(|page| page.header.is_some()));
    }

    #[test]
    fn header_is_pending_between_page_close_and_install() {
        let mut oracle = oracle();
        let atoms = vec![
            Atom::text(AtomKind::Paragraph, 0, "a".repeat(30)),
            header(1, "Appendix"),
            Atom::text(AtomKind::Paragraph, 2, "b".repeat(30)),
        ];
        let mut session =
            LayoutSession::from_atoms(atoms, &mut oracle, &geometry(300.0), options()).unwrap();
        assert!(session.step());
        assert!(session.step());
        assert_eq!(session.state().phase, LayoutPhase::HeaderPending);
        assert_eq!(session.finished_pages().len(), 1);
        assert!(session.state().page.is_empty());
        assert_eq!(session.remaining(), 2);
        assert!(session.step());
        assert_eq!(session.state().phase, LayoutPhase::FillingColumn0);
        assert!(session.state().page.header.is_some());
        assert_eq!(session.remaining(), 1);
        let layout = session.finish();
        assert_eq!(layout.page_count(), 2);
        assert_eq!(layout.sequence().len(), 3);
    }

    #[test]
    fn unplaceable_atom_is_forced_with_a_warning() {
        let mut oracle = oracle();
        let layout = run(
            vec![
                Atom::text(AtomKind::Paragraph, 0, "p".repeat(20)),
                Atom::text(AtomKind::Heading, 1, "h".repeat(200)),
                Atom::text(AtomKind::Paragraph, 2, "q".repeat(20)),
            ],
            &mut oracle,
            300.0,
        );
        assert_eq!(layout.warnings.len(), 1);
        let warning = &layout.warnings[0];
        assert_eq!(warning.atom_index, 1);
        assert_eq!(warning.kind, AtomKind::Heading);
        assert_eq!((warning.page, warning.column), (1, 1));
        let forced = layout.fragments_of(1);
        assert!(forced[0].forced);
        // the next atom starts a fresh page
        assert_eq!(layout.pages[1].columns[0].fragments()[0].atom.index, 2);
        assert_eq!(layout.metrics.forced_placements, 1);
    }

    #[test]
    fn long_paragraph_chains_start_middle_and_end() {
        let mut oracle = oracle();
        let layout = run(
            vec![Atom::text(AtomKind::Paragraph, 0, "z".repeat(700))],
            &mut oracle,
            300.0,
        );
        let flags: Vec<Continuation> = layout.sequence().into_iter().map(|(_, c)| c).collect();
        assert_eq!(
            flags,
            vec![
                Continuation::Start,
                Continuation::Middle,
                Continuation::Middle,
                Continuation::Middle,
                Continuation::End
            ]
        );
        assert_eq!(layout.page_count(), 3);
    }

    #[test]
    fn stepping_reports_progress_and_can_stop_early() {
        let mut oracle = oracle();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: ProgressCallback = Arc::new(move |event: &ProgressEvent| {
            if let Ok(mut events) = sink.lock() {
                events.push(*event);
            }
        });
        let atoms: Vec<Atom> = (0..4)
            .map(|i| Atom::text(AtomKind::Paragraph, i, "w".repeat(30)))
            .collect();
        let mut session = LayoutSession::from_atoms(atoms, &mut oracle, &geometry(300.0), options())
            .unwrap()
            .with_progress(Some(callback));
        assert_eq!(session.state().phase, LayoutPhase::EmptyPage);
        assert!(session.step());
        assert_eq!(session.state().phase, LayoutPhase::FillingColumn0);
        assert!(session.step());
        assert_eq!(session.remaining(), 2);
        drop(session);
        let events = seen.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], ProgressEvent::new(Phase::LayingOut, 2, 4));
    }

    #[test]
    fn calibration_scales_geometry() {
        let mut oracle = oracle();
        oracle.units_per_mm = 2.0;
        let layout = run(vec![Atom::text(AtomKind::Paragraph, 0, "x")], &mut oracle, 300.0);
        assert_eq!(layout.column_limit, Pt::from_i32(600));
        assert_eq!(layout.geometry.column_width, Pt::from_i32(150));
    }

    fn mixed_document() -> ModuleDocument {
        let mut children = vec![Node::TitleBlock(TitleBlock {
            title: "The Drowned Bell".to_string(),
            subtitle: "A scenario".to_string(),
            meta: vec!["Era: 1920s".to_string()],
        })];
        for i in 0..6 {
            children.push(Node::heading(2, &format!("Part {i}")));
            children.push(Node::paragraph(&"lorem ipsum ".repeat(5 + i * 7)));
            children.push(Node::List {
                children: (0..3)
                    .map(|j| Node::TimelineEntry {
                        label: format!("Day {j}"),
                        body: "the tide rises ".repeat(2 + j * 3),
                    })
                    .collect(),
            });
            children.push(Node::CharacterCard(CharacterCard {
                portrait: i % 2 == 0,
                name: format!("Keeper {i}"),
                role: "Lighthouse keeper".to_string(),
                stats: "STR 50 CON 60 POW 70".to_string(),
                description: "Knows more than they say. ".repeat(3 + i * 2),
            }));
            children.push(Node::LocationCard(LocationCard {
                header: format!("Cove {i}"),
                item_tag: Some("Brass key".to_string()),
                description: "Wet stone and old rope. ".repeat(2 + i * 3),
                trigger_event: Some("The bell tolls once more. ".repeat(1 + i)),
            }));
            children.push(Node::Meta {
                text: "Sanity loss 1/1d4".to_string(),
            });
        }
        ModuleDocument::new(children)
    }

    #[test]
    fn layouts_keep_order_fit_and_every_character() {
        let document = mixed_document();
        let source = atomize(&document);
        for column in [90.0, 140.0, 230.0, 333.0, 480.0] {
            let mut oracle = LinearOracle::new(12, Pt::from_i32(14))
                .with_margin_bottom(Pt::from_i32(4))
                .with_card_chrome(Pt::from_i32(6), Pt::from_i32(40));
            let layout =
                Paginator::run(&document, &mut oracle, &geometry(column), options()).unwrap();

            // order: sorted by atom index, start before middle before end
            let sequence = layout.sequence();
            assert!(sequence.windows(2).all(|w| w[0] <= w[1]), "order broken at {column}");
            let mut indices: Vec<usize> = sequence.iter().map(|(i, _)| *i).collect();
            indices.dedup();
            assert_eq!(indices, (0..source.len()).collect::<Vec<_>>(), "atom lost at {column}");

            // fit: nothing crosses its column limit unless forced
            for page in &layout.pages {
                for (_, fragment) in page.fragments() {
                    let limit = page.columns[0].limit() + layout.tolerance;
                    assert!(fragment.forced || fragment.bottom() <= limit, "overflow at {column}");
                }
            }

            // lossless: every splittable field concatenates back to its source
            let mut rebuilt: BTreeMap<(usize, &str), String> = BTreeMap::new();
            for fragment in layout.placements() {
                for (field, text) in fragment.atom.splittable_text() {
                    rebuilt
                        .entry((fragment.atom.index, field))
                        .or_default()
                        .push_str(text);
                }
            }
            for atom in &source {
                for (field, text) in atom.splittable_text() {
                    let got = rebuilt.get(&(atom.index, field)).map(String::as_str).unwrap_or("");
                    assert_eq!(got, text, "atom {} field {field} at {column}", atom.index);
                }
            }

            // header isolation
            assert!(layout.pages[0].header.is_some());
            assert_eq!(
                layout
                    .placements()
                    .iter()
                    .filter(|f| f.atom.kind == AtomKind::SpanningHeader)
                    .count(),
                1
            );
        }
    }

    #[test]
    fn location_tail_never_repeats_the_header() {
        let mut oracle = oracle();
        let atom = Atom {
            kind: AtomKind::LocationCard,
            index: 0,
            level: 0,
            continuation: Continuation::None,
            content: AtomContent::Location(LocationContent {
                header: "Chapel".to_string(),
                item_tag: None,
                description: "c".repeat(100),
                trigger_event: Some("Organ plays".to_string()),
                visible: LocationFields::all(),
            }),
        };
        let layout = run(vec![atom], &mut oracle, 120.0);
        let pieces = layout.fragments_of(0);
        assert!(pieces.len() >= 2);
        for piece in &pieces[1..] {
            let AtomContent::Location(card) = &piece.atom.content else {
                panic!("location expected");
            };
            assert!(!card.visible.contains(LocationFields::HEADER));
        }
    }

    #[test]
    fn debug_log_records_decisions() {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let path = std::env::temp_dir().join(format!("gutter_layout_{nanos}.jsonl"));
        let logger = Arc::new(DebugLogger::new(&path).unwrap());
        let mut oracle = oracle();
        let layout = LayoutSession::from_atoms(
            vec![Atom::text(AtomKind::Paragraph, 0, "x".repeat(250))],
            &mut oracle,
            &geometry(300.0),
            options(),
        )
        .unwrap()
        .with_debug(Some(logger))
        .finish();
        assert_eq!(layout.page_count(), 1);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"type\":\"layout.split\""));
        assert!(text.contains("\"type\":\"layout.column_break\""));
        assert!(text.contains("\"type\":\"debug.summary\""));
        let _ = std::fs::remove_file(&path);
    }
}
