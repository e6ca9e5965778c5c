mod atom;
mod atomizer;
mod block;
mod column;
mod debug;
mod document;
mod error;
mod font;
mod geometry;
mod html;
mod measure;
mod metrics;
mod page;
mod paginator;
mod pdf;
mod progress;
mod raster;
mod render;
mod search;
mod split;
mod style;
mod types;

pub use atom::{
    Atom, AtomContent, AtomKind, CharacterContent, CharacterFields, Continuation, HeaderContent,
    LocationContent, LocationFields, TimelineContent,
};
pub use atomizer::atomize;
pub use block::{BlockLayout, LineBox, Shape, ShapeKind, SubElement, layout_atom};
pub use column::{AddResult, Column};
use debug::DebugLogger;
pub use document::{
    CharacterCard, LocationCard, ModuleContent, ModuleDocument, Node, NpcRecord, SceneRecord,
    TimelineRecord, TitleBlock,
};
pub use error::GutterError;
pub use font::{FontFace, FontMetrics};
pub use geometry::{PageGeometry, ResolvedGeometry};
pub use html::parse_module_html;
pub use measure::{LinearOracle, Measurement, MeasurementOracle, TextMetricsOracle};
pub use metrics::{LayoutMetrics, PageMetrics, RenderMetrics};
pub use page::{Layout, LayoutWarning, Page, PlacedFragment};
pub use paginator::{LayoutOptions, LayoutPhase, LayoutSession, LayoutState, Paginator};
pub use pdf::{PageImage, assemble_pdf, page_count};
pub use progress::{Phase, ProgressCallback, ProgressEvent};
pub use raster::{encode_jpeg, rasterize_page};
pub use render::{PageRenderer, RasterPdfRenderer, RenderedDocument};
pub use search::max_fitting_prefix;
pub use split::{Probe, SplitOutcome, split_atom};
pub use style::{BlockStyle, StyleSheet, TextStyle};
pub use types::{Color, Pt, Rect};

use std::path::{Path, PathBuf};
use std::sync::Arc;

const MAX_DPI: u32 = 1200;

/// Configured pagination pipeline. Everything here is fixed for a run; only
/// the oracle's calibration is computed when a run starts.
pub struct Gutter {
    geometry: PageGeometry,
    options: LayoutOptions,
    sheet: StyleSheet,
    metrics: FontMetrics,
    dpi: u32,
    jpeg_quality: u8,
    debug: Option<Arc<DebugLogger>>,
    progress: Option<ProgressCallback>,
}

pub struct GutterBuilder {
    geometry: PageGeometry,
    options: LayoutOptions,
    sheet: StyleSheet,
    font_file: Option<PathBuf>,
    font_bytes: Option<(String, Vec<u8>)>,
    dpi: u32,
    jpeg_quality: u8,
    debug_path: Option<PathBuf>,
    progress: Option<ProgressCallback>,
}

impl Gutter {
    pub fn builder() -> GutterBuilder {
        GutterBuilder::new()
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    pub fn style_sheet(&self) -> &StyleSheet {
        &self.sheet
    }

    /// The oracle that matches what the raster renderer draws.
    pub fn oracle(&self) -> TextMetricsOracle {
        TextMetricsOracle::new(self.sheet.clone(), self.metrics.clone())
    }

    /// Starts a step-wise run; the caller drives it with `step`.
    pub fn session<'o>(
        &self,
        document: &ModuleDocument,
        oracle: &'o mut dyn MeasurementOracle,
    ) -> Result<LayoutSession<'o>, GutterError> {
        Ok(
            LayoutSession::new(document, oracle, &self.geometry, self.options)?
                .with_debug(self.debug.clone())
                .with_progress(self.progress.clone()),
        )
    }

    pub fn paginate(&self, document: &ModuleDocument) -> Result<Layout, GutterError> {
        let mut oracle = self.oracle();
        self.paginate_with(document, &mut oracle)
    }

    pub fn paginate_with(
        &self,
        document: &ModuleDocument,
        oracle: &mut dyn MeasurementOracle,
    ) -> Result<Layout, GutterError> {
        Ok(self.session(document, oracle)?.finish())
    }

    pub fn paginate_html(&self, html: &str) -> Result<Layout, GutterError> {
        self.paginate(&parse_module_html(html)?)
    }

    /// Lays out generated module content (`title`, `npcs`, `scenes`, ...).
    pub fn paginate_module_json(&self, json: &str) -> Result<Layout, GutterError> {
        self.paginate(&ModuleContent::from_json(json)?.into_document())
    }

    pub fn renderer(&self) -> RasterPdfRenderer {
        RasterPdfRenderer::new(self.sheet.clone(), self.metrics.clone())
            .with_dpi(self.dpi)
            .with_jpeg_quality(self.jpeg_quality)
            .with_debug(self.debug.clone())
    }

    pub fn render_pdf(&self, layout: &Layout) -> Result<RenderedDocument, GutterError> {
        self.renderer().render(layout, self.progress.as_ref())
    }

    pub fn render_png_pages(&self, layout: &Layout) -> Result<Vec<Vec<u8>>, GutterError> {
        self.renderer().render_png_pages(layout)
    }

    /// Renders and writes the PDF. Returns the page count.
    pub fn write_pdf(&self, layout: &Layout, path: impl AsRef<Path>) -> Result<usize, GutterError> {
        let rendered = self.render_pdf(layout)?;
        std::fs::write(path, &rendered.bytes)?;
        Ok(rendered.page_count)
    }

    pub fn document_to_pdf(
        &self,
        document: &ModuleDocument,
    ) -> Result<RenderedDocument, GutterError> {
        let layout = self.paginate(document)?;
        self.render_pdf(&layout)
    }
}

impl GutterBuilder {
    pub fn new() -> Self {
        Self {
            geometry: PageGeometry::a4(),
            options: LayoutOptions::default(),
            sheet: StyleSheet::default(),
            font_file: None,
            font_bytes: None,
            dpi: 144,
            jpeg_quality: 90,
            debug_path: None,
            progress: None,
        }
    }

    pub fn geometry(mut self, geometry: PageGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn page_size_mm(mut self, width: f32, height: f32) -> Self {
        self.geometry.page_width_mm = width;
        self.geometry.page_height_mm = height;
        self
    }

    pub fn margin_mm(mut self, margin: f32) -> Self {
        self.geometry.margin_mm = margin;
        self
    }

    pub fn column_gap_mm(mut self, gap: f32) -> Self {
        self.geometry.column_gap_mm = gap;
        self
    }

    pub fn options(mut self, options: LayoutOptions) -> Self {
        self.options = options;
        self
    }

    pub fn tolerance(mut self, tolerance: f32) -> Self {
        self.options.tolerance = Pt::from_f32(tolerance);
        self
    }

    pub fn style_sheet(mut self, sheet: StyleSheet) -> Self {
        self.sheet = sheet;
        self
    }

    pub fn font_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_file = Some(path.into());
        self
    }

    pub fn font_bytes(mut self, name: impl Into<String>, data: Vec<u8>) -> Self {
        self.font_bytes = Some((name.into(), data));
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn on_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn build(self) -> Result<Gutter, GutterError> {
        self.geometry.validate()?;
        self.options.validate()?;
        if self.dpi == 0 || self.dpi > MAX_DPI {
            return Err(GutterError::InvalidConfiguration(format!(
                "dpi must be in 1..={MAX_DPI}, got {}",
                self.dpi
            )));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(GutterError::InvalidConfiguration(format!(
                "jpeg_quality must be in 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        let face = match (self.font_bytes, self.font_file) {
            (Some((name, data)), _) => Some(Arc::new(FontFace::from_bytes(name, data)?)),
            (None, Some(path)) => Some(Arc::new(FontFace::from_file(path)?)),
            (None, None) => None,
        };
        let debug = if let Some(path) = self.debug_path {
            Some(Arc::new(DebugLogger::new(path)?))
        } else {
            None
        };
        Ok(Gutter {
            geometry: self.geometry,
            options: self.options,
            sheet: self.sheet,
            metrics: FontMetrics::new(face),
            dpi: self.dpi,
            jpeg_quality: self.jpeg_quality,
            debug,
            progress: self.progress,
        })
    }
}

impl Default for GutterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
