use crate::atom::{Atom, AtomKind, Continuation};
use crate::block::SubElement;
use crate::column::Column;
use crate::geometry::ResolvedGeometry;
use crate::metrics::LayoutMetrics;
use crate::types::Pt;
use std::fmt;

/// An atom or fragment committed to a column (or to a page's header slot).
/// `y` is measured from the top of the column body, below any header.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedFragment {
    pub atom: Atom,
    pub y: Pt,
    pub height: Pt,
    pub margin_bottom: Pt,
    pub sub_offsets: Vec<(SubElement, Pt)>,
    /// Placed past the column limit as a last resort.
    pub forced: bool,
}

impl PlacedFragment {
    pub fn bottom(&self) -> Pt {
        self.y + self.height
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// 1-based.
    pub number: usize,
    pub header: Option<PlacedFragment>,
    /// Header height plus its bottom margin; zero without a header.
    pub header_height: Pt,
    pub columns: [Column; 2],
}

impl Page {
    pub(crate) fn new(number: usize, column_limit: Pt) -> Self {
        Self {
            number,
            header: None,
            header_height: Pt::ZERO,
            columns: [Column::new(column_limit), Column::new(column_limit)],
        }
    }

    /// Installs the spanning header and shrinks both columns by its height.
    /// Only valid while the columns are empty.
    pub(crate) fn set_header(&mut self, header: PlacedFragment, column_limit: Pt) {
        self.header_height = header.height + header.margin_bottom;
        self.header = Some(header);
        let limit = column_limit - self.header_height;
        self.columns = [Column::new(limit), Column::new(limit)];
    }

    pub fn has_fragments(&self) -> bool {
        self.columns.iter().any(|column| !column.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_none() && !self.has_fragments()
    }

    pub fn fragment_count(&self) -> usize {
        self.columns.iter().map(|column| column.fragments().len()).sum()
    }

    /// Column fragments in reading order, tagged with their column index.
    pub fn fragments(&self) -> impl Iterator<Item = (usize, &PlacedFragment)> {
        self.columns
            .iter()
            .enumerate()
            .flat_map(|(idx, column)| column.fragments().iter().map(move |f| (idx, f)))
    }
}

/// A degenerate placement the engine accepted to keep making progress.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutWarning {
    pub atom_index: usize,
    pub kind: AtomKind,
    pub page: usize,
    pub column: usize,
    pub message: String,
}

impl fmt::Display for LayoutWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} #{} on page {} column {}: {}",
            self.kind.name(),
            self.atom_index,
            self.page,
            self.column + 1,
            self.message
        )
    }
}

/// Result of one pagination run. Read-only once produced.
#[derive(Debug, Clone)]
pub struct Layout {
    pub pages: Vec<Page>,
    pub geometry: ResolvedGeometry,
    /// Column height before any header is subtracted.
    pub column_limit: Pt,
    pub tolerance: Pt,
    pub warnings: Vec<LayoutWarning>,
    pub metrics: LayoutMetrics,
}

impl Layout {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Every placed piece in reading order, headers first on their page.
    pub fn placements(&self) -> Vec<&PlacedFragment> {
        let mut out = Vec::new();
        for page in &self.pages {
            if let Some(header) = &page.header {
                out.push(header);
            }
            out.extend(page.fragments().map(|(_, fragment)| fragment));
        }
        out
    }

    /// `(atom index, continuation)` for every placement in reading order.
    pub fn sequence(&self) -> Vec<(usize, Continuation)> {
        self.placements()
            .into_iter()
            .map(|fragment| (fragment.atom.index, fragment.atom.continuation))
            .collect()
    }

    pub fn fragments_of(&self, atom_index: usize) -> Vec<&PlacedFragment> {
        self.placements()
            .into_iter()
            .filter(|fragment| fragment.atom.index == atom_index)
            .collect()
    }
}
