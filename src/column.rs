use crate::atom::Atom;
use crate::measure::Measurement;
use crate::page::PlacedFragment;
use crate::paginator::LayoutOptions;
use crate::split::{Probe, SplitOutcome, split_atom};
use crate::types::Pt;

pub enum AddResult {
    Placed,
    /// The head was committed; the remainder goes to the next column.
    Split(Atom),
    /// Nothing was committed; the atom moves whole to the next column.
    Deferred(Atom),
    /// Committed past the limit because the column was empty and the atom
    /// has no smaller form.
    Forced,
}

/// One column of a page. The filled height is derived from the committed
/// fragments rather than tracked separately.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    limit: Pt,
    fragments: Vec<PlacedFragment>,
}

impl Column {
    pub fn new(limit: Pt) -> Self {
        Self {
            limit,
            fragments: Vec::new(),
        }
    }

    pub fn limit(&self) -> Pt {
        self.limit
    }

    pub fn fragments(&self) -> &[PlacedFragment] {
        &self.fragments
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn filled_height(&self) -> Pt {
        self.fragments
            .last()
            .map(|fragment| fragment.bottom() + fragment.margin_bottom)
            .unwrap_or(Pt::ZERO)
    }

    /// Remaining budget; zero once a bottom margin has pushed past the limit.
    pub fn remaining(&self) -> Pt {
        (self.limit - self.filled_height()).max(Pt::ZERO)
    }

    pub fn add(
        &mut self,
        atom: Atom,
        probe: &mut Probe<'_>,
        options: &LayoutOptions,
    ) -> AddResult {
        let budget = self.remaining();
        let measured = probe.measure(&atom);
        // compare the bottom edge: a margin may already sit past the limit
        if self.filled_height() + measured.height <= self.limit + probe.tolerance() {
            self.commit(atom, measured, false);
            return AddResult::Placed;
        }
        let overrun = self.filled_height() > self.limit;
        if !self.is_empty() && (overrun || budget < options.min_split_height) {
            return AddResult::Deferred(atom);
        }
        match split_atom(&atom, budget, probe) {
            SplitOutcome::Fits => {
                self.commit(atom, measured, false);
                AddResult::Placed
            }
            SplitOutcome::Split { head, tail } => {
                let head_measured = probe.measure(&head);
                self.commit(head, head_measured, false);
                AddResult::Split(tail)
            }
            SplitOutcome::Defer if self.is_empty() => {
                self.commit(atom, measured, true);
                AddResult::Forced
            }
            SplitOutcome::Defer => AddResult::Deferred(atom),
        }
    }

    fn commit(&mut self, atom: Atom, measured: Measurement, forced: bool) {
        let y = self.filled_height();
        self.fragments.push(PlacedFragment {
            atom,
            y,
            height: measured.height,
            margin_bottom: measured.margin_bottom,
            sub_offsets: measured.sub_offsets,
            forced,
        });
    }
}
