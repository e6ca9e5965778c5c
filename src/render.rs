//! Page rendering: finished pages to a paged output artifact.

use crate::debug::{DebugLogger, Field};
use crate::error::GutterError;
use crate::font::FontMetrics;
use crate::metrics::RenderMetrics;
use crate::page::Layout;
use crate::pdf::{PageImage, assemble_pdf};
use crate::progress::{Phase, ProgressCallback, ProgressEvent, report};
use crate::raster::{encode_jpeg, rasterize_page};
use crate::style::StyleSheet;
use crate::types::{MM_PER_INCH, PT_PER_INCH};
use rayon::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub metrics: RenderMetrics,
}

/// Consumes a finished layout. Any failure is terminal for the run and no
/// partial artifact is returned.
pub trait PageRenderer {
    fn render(
        &self,
        layout: &Layout,
        progress: Option<&ProgressCallback>,
    ) -> Result<RenderedDocument, GutterError>;
}

/// Rasterizes each page to a JPEG and wraps the images in a PDF. Pages
/// share no state, so they are rasterized in parallel.
#[derive(Clone)]
pub struct RasterPdfRenderer {
    sheet: StyleSheet,
    metrics: FontMetrics,
    dpi: u32,
    jpeg_quality: u8,
    debug: Option<Arc<DebugLogger>>,
}

impl RasterPdfRenderer {
    pub fn new(sheet: StyleSheet, metrics: FontMetrics) -> Self {
        Self {
            sheet,
            metrics,
            dpi: 144,
            jpeg_quality: 90,
            debug: None,
        }
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    pub(crate) fn with_debug(mut self, debug: Option<Arc<DebugLogger>>) -> Self {
        self.debug = debug;
        self
    }

    /// PNG bytes per page, in page order.
    pub fn render_png_pages(&self, layout: &Layout) -> Result<Vec<Vec<u8>>, GutterError> {
        layout
            .pages
            .par_iter()
            .map(|page| {
                let pixmap =
                    rasterize_page(page, &layout.geometry, &self.sheet, &self.metrics, self.dpi)?;
                pixmap.encode_png().map_err(|e| GutterError::Render {
                    page: page.number,
                    message: format!("png encode failed: {e}"),
                })
            })
            .collect()
    }
}

impl PageRenderer for RasterPdfRenderer {
    fn render(
        &self,
        layout: &Layout,
        progress: Option<&ProgressCallback>,
    ) -> Result<RenderedDocument, GutterError> {
        let total = layout.pages.len();
        report(progress, ProgressEvent::new(Phase::Rendering, 0, total));
        let raster_start = Instant::now();
        let done = AtomicUsize::new(0);
        let images: Vec<PageImage> = layout
            .pages
            .par_iter()
            .map(|page| {
                let pixmap =
                    rasterize_page(page, &layout.geometry, &self.sheet, &self.metrics, self.dpi)?;
                let jpeg = encode_jpeg(&pixmap, self.jpeg_quality).map_err(|err| match err {
                    GutterError::Render { message, .. } => GutterError::Render {
                        page: page.number,
                        message,
                    },
                    other => other,
                })?;
                if let Some(logger) = self.debug.as_deref() {
                    logger.event(
                        "render.page",
                        &[
                            ("page", Field::Int(page.number as i64)),
                            ("width_px", Field::Int(pixmap.width() as i64)),
                            ("height_px", Field::Int(pixmap.height() as i64)),
                            ("jpeg_bytes", Field::Int(jpeg.len() as i64)),
                        ],
                    );
                }
                let completed = done.fetch_add(1, Ordering::Relaxed) + 1;
                report(progress, ProgressEvent::new(Phase::Rendering, completed, total));
                Ok(PageImage {
                    jpeg,
                    width_px: pixmap.width(),
                    height_px: pixmap.height(),
                })
            })
            .collect::<Result<Vec<_>, GutterError>>()?;
        let raster_ms = raster_start.elapsed().as_secs_f64() * 1000.0;

        let assemble_start = Instant::now();
        let physical = layout.geometry.physical;
        let to_pt = PT_PER_INCH / MM_PER_INCH;
        let bytes = assemble_pdf(
            &images,
            physical.page_width_mm * to_pt,
            physical.page_height_mm * to_pt,
        )?;
        let assemble_ms = assemble_start.elapsed().as_secs_f64() * 1000.0;
        if let Some(logger) = self.debug.as_deref() {
            logger.emit_summary("render");
            logger.flush();
        }
        Ok(RenderedDocument {
            page_count: images.len(),
            metrics: RenderMetrics {
                pages: images.len(),
                raster_ms,
                assemble_ms,
                total_bytes: bytes.len(),
            },
            bytes,
        })
    }
}
