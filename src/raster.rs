use crate::block::{BlockLayout, LineBox, ShapeKind, layout_atom};
use crate::error::GutterError;
use crate::font::{FontFace, FontMetrics};
use crate::geometry::ResolvedGeometry;
use crate::page::{Page, PlacedFragment};
use crate::style::StyleSheet;
use crate::types::{Color, MM_PER_INCH, Pt};
use image::ExtendedColorType;
use image::codecs::jpeg::JpegEncoder;
use tiny_skia::{FillRule, Paint, Path, PathBuilder, Pixmap, Rect, Stroke, Transform};
use ttf_parser::OutlineBuilder;

/// Draws one finished page onto a white pixmap. Fragments are laid out
/// again with the same style sheet and font metrics that measured them;
/// `dpi` fixes the physical resolution.
pub fn rasterize_page(
    page: &Page,
    geometry: &ResolvedGeometry,
    sheet: &StyleSheet,
    metrics: &FontMetrics,
    dpi: u32,
) -> Result<Pixmap, GutterError> {
    let render_err = |message: String| GutterError::Render {
        page: page.number,
        message,
    };
    if dpi == 0 {
        return Err(render_err("dpi must be > 0".to_string()));
    }
    // device pixels per layout unit
    let scale = dpi as f32 / MM_PER_INCH / geometry.units_per_mm;
    let width_px = units_to_px(geometry.page_width, scale);
    let height_px = units_to_px(geometry.page_height, scale);
    let mut pixmap = Pixmap::new(width_px, height_px).ok_or_else(|| {
        render_err(format!(
            "invalid raster size {}x{} at {} DPI",
            width_px, height_px, dpi
        ))
    })?;
    pixmap.fill(tiny_skia::Color::WHITE);
    let base = Transform::from_scale(scale, scale);

    let top = geometry.content_top();
    if let Some(header) = &page.header {
        let layout = layout_atom(&header.atom, geometry.content_width, sheet, metrics);
        draw_block(&mut pixmap, &layout, geometry.margin, top, base, metrics);
    }
    let body_top = top + page.header_height;
    for (column, fragment) in page.fragments() {
        draw_fragment(
            &mut pixmap,
            fragment,
            geometry.column_x[column],
            body_top,
            geometry.column_width,
            base,
            sheet,
            metrics,
        );
    }
    Ok(pixmap)
}

#[allow(clippy::too_many_arguments)]
fn draw_fragment(
    pixmap: &mut Pixmap,
    fragment: &PlacedFragment,
    x: Pt,
    body_top: Pt,
    width: Pt,
    base: Transform,
    sheet: &StyleSheet,
    metrics: &FontMetrics,
) {
    let layout = layout_atom(&fragment.atom, width, sheet, metrics);
    draw_block(pixmap, &layout, x, body_top + fragment.y, base, metrics);
}

fn draw_block(
    pixmap: &mut Pixmap,
    layout: &BlockLayout,
    x: Pt,
    y: Pt,
    base: Transform,
    metrics: &FontMetrics,
) {
    let transform = base.pre_translate(x.to_f32(), y.to_f32());
    for shape in &layout.shapes {
        let Some(rect) = to_rect(shape.rect.x, shape.rect.y, shape.rect.width, shape.rect.height)
        else {
            continue;
        };
        match shape.kind {
            ShapeKind::Rect | ShapeKind::Rule => {
                if let Some(fill) = shape.fill {
                    pixmap.fill_rect(rect, &fill_paint(fill), transform, None);
                }
                if let Some(stroke) = shape.stroke {
                    let path = PathBuilder::from_rect(rect);
                    let mut line = Stroke::default();
                    line.width = 0.75;
                    pixmap.stroke_path(&path, &fill_paint(stroke), &line, transform, None);
                }
            }
            ShapeKind::Bullet => {
                let radius = rect.width().min(rect.height()) / 2.0;
                if let (Some(fill), Some(path)) = (
                    shape.fill,
                    PathBuilder::from_circle(rect.x() + radius, rect.y() + radius, radius),
                ) {
                    pixmap.fill_path(&path, &fill_paint(fill), FillRule::Winding, transform, None);
                }
            }
        }
    }
    for line in &layout.lines {
        draw_line(pixmap, line, transform, metrics);
    }
}

fn draw_line(pixmap: &mut Pixmap, line: &LineBox, transform: Transform, metrics: &FontMetrics) {
    let font_size = line.style.font_size;
    let text_width = metrics.text_width(&line.text, font_size);
    let x = if line.centered {
        line.x + ((line.width - text_width).max(Pt::ZERO) / 2)
    } else {
        line.x
    };
    let half_leading = (line.style.line_height - font_size).max(Pt::ZERO) / 2;
    let paint = fill_paint(line.style.color);

    if let Some(face) = metrics.face() {
        let baseline = line.y + half_leading + font_size * face.ascent_em();
        if draw_glyphs(pixmap, face, &line.text, x, baseline, font_size, &paint, transform) {
            return;
        }
    }
    // no outlines available: a bar where the text would sit
    let bar_height = font_size * 0.55;
    let bar_y = line.y + half_leading + (font_size - bar_height) / 2;
    if let Some(rect) = to_rect(x, bar_y, text_width, bar_height) {
        let mut paint = paint;
        paint.set_color(to_sk_color(line.style.color, 0.45));
        pixmap.fill_rect(rect, &paint, transform, None);
    }
}

/// Returns `false` when nothing could be drawn from the face.
#[allow(clippy::too_many_arguments)]
fn draw_glyphs(
    pixmap: &mut Pixmap,
    face: &FontFace,
    text: &str,
    x: Pt,
    baseline: Pt,
    font_size: Pt,
    paint: &Paint<'_>,
    transform: Transform,
) -> bool {
    let units_per_em = face.units_per_em() as f32;
    let scale = font_size.to_f32() / units_per_em;
    face.with_face(|parsed| {
        let mut pen_x = x.to_f32();
        let origin_y = baseline.to_f32();
        let mut drawn = 0usize;
        for ch in text.chars() {
            let Some(glyph) = parsed.glyph_index(ch) else {
                pen_x += font_size.to_f32() * 0.6;
                continue;
            };
            let mut builder = GlyphPathBuilder::new(pen_x, origin_y, scale);
            if parsed.outline_glyph(glyph, &mut builder).is_some() {
                if let Some(path) = builder.finish() {
                    pixmap.fill_path(&path, paint, FillRule::Winding, transform, None);
                    drawn += 1;
                }
            }
            let advance = parsed.glyph_hor_advance(glyph).unwrap_or(0) as f32;
            pen_x += advance * scale;
        }
        drawn > 0
    })
    .unwrap_or(false)
}

/// Converts font-unit outlines (y up) into layout units (y down) at a
/// baseline origin.
struct GlyphPathBuilder {
    builder: PathBuilder,
    origin_x: f32,
    origin_y: f32,
    scale: f32,
}

impl GlyphPathBuilder {
    fn new(origin_x: f32, origin_y: f32, scale: f32) -> Self {
        Self {
            builder: PathBuilder::new(),
            origin_x,
            origin_y,
            scale,
        }
    }

    fn finish(self) -> Option<Path> {
        self.builder.finish()
    }

    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (self.origin_x + x * self.scale, self.origin_y - y * self.scale)
    }
}

impl OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x, y) = self.map(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x2, y2) = self.map(x2, y2);
        let (x, y) = self.map(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

/// Flattens onto white and encodes as baseline JPEG.
pub fn encode_jpeg(pixmap: &Pixmap, quality: u8) -> Result<Vec<u8>, GutterError> {
    let mut rgb = Vec::with_capacity(pixmap.width() as usize * pixmap.height() as usize * 3);
    for pixel in pixmap.pixels() {
        let color = pixel.demultiply();
        rgb.extend_from_slice(&[color.red(), color.green(), color.blue()]);
    }
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
        .encode(&rgb, pixmap.width(), pixmap.height(), ExtendedColorType::Rgb8)
        .map_err(|e| GutterError::Render {
            page: 0,
            message: format!("jpeg encode failed: {e}"),
        })?;
    Ok(out)
}

fn units_to_px(value: Pt, scale: f32) -> u32 {
    let px = (value.to_f32() * scale).round();
    if px.is_finite() && px > 0.0 {
        px.min(u32::MAX as f32) as u32
    } else {
        0
    }
}

fn to_rect(x: Pt, y: Pt, width: Pt, height: Pt) -> Option<Rect> {
    Rect::from_xywh(x.to_f32(), y.to_f32(), width.to_f32(), height.to_f32())
}

fn fill_paint(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(to_sk_color(color, 1.0));
    paint.anti_alias = true;
    paint
}

fn to_sk_color(color: Color, opacity: f32) -> tiny_skia::Color {
    let r = color.r.clamp(0.0, 1.0);
    let g = color.g.clamp(0.0, 1.0);
    let b = color.b.clamp(0.0, 1.0);
    let a = opacity.clamp(0.0, 1.0);
    tiny_skia::Color::from_rgba(r, g, b, a)
        .unwrap_or_else(|| tiny_skia::Color::from_rgba8(0, 0, 0, 255))
}
