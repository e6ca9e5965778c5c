#[derive(Debug, Clone, Default)]
pub struct PageMetrics {
    pub page_number: usize,
    pub fragment_count: usize,
    pub has_header: bool,
}

#[derive(Debug, Clone, Default)]
pub struct LayoutMetrics {
    pub pages: Vec<PageMetrics>,
    pub atoms: usize,
    pub splits: usize,
    pub deferrals: usize,
    pub forced_placements: usize,
    /// Oracle calls issued while searching for split points.
    pub probes: usize,
    pub layout_ms: f64,
}

#[derive(Debug, Clone, Default)]
pub struct RenderMetrics {
    pub pages: usize,
    pub raster_ms: f64,
    pub assemble_ms: f64,
    pub total_bytes: usize,
}
