//! Splitting strategies for atoms that overflow their column.
//!
//! Every strategy answers one question for a given budget: does the atom
//! fit whole, can it be cut into a head that fits plus a tail for the next
//! column, or must it move whole. Cuts are on character boundaries and are
//! lossless: the head's text followed by the tail's text is the original.

use crate::atom::{
    Atom, AtomContent, AtomKind, CharacterContent, CharacterFields, LocationContent, LocationFields,
    TimelineContent,
};
use crate::measure::{Measurement, MeasurementOracle};
use crate::search::{char_len, max_fitting_prefix, prefix, split_at_char};
use crate::types::Pt;

#[derive(Debug, Clone, PartialEq)]
pub enum SplitOutcome {
    /// The whole atom fits; nothing to cut.
    Fits,
    Split { head: Atom, tail: Atom },
    /// No useful head exists at this budget; move the atom whole.
    Defer,
}

/// Measurement handle used while placing one column: the oracle, the
/// column width, the fit tolerance and the minimum head size.
pub struct Probe<'a> {
    oracle: &'a mut dyn MeasurementOracle,
    width: Pt,
    tolerance: Pt,
    min_fragment_chars: usize,
    probes: usize,
}

impl<'a> Probe<'a> {
    pub fn new(
        oracle: &'a mut dyn MeasurementOracle,
        width: Pt,
        tolerance: Pt,
        min_fragment_chars: usize,
    ) -> Self {
        Self {
            oracle,
            width,
            tolerance,
            min_fragment_chars,
            probes: 0,
        }
    }

    pub fn measure(&mut self, atom: &Atom) -> Measurement {
        self.probes += 1;
        self.oracle.measure(atom, self.width)
    }

    pub fn fits(&mut self, atom: &Atom, budget: Pt) -> bool {
        self.measure(atom).height <= budget + self.tolerance
    }

    pub fn tolerance(&self) -> Pt {
        self.tolerance
    }

    /// Oracle calls issued so far.
    pub fn probes(&self) -> usize {
        self.probes
    }

    fn usable_head(&self, kept: usize) -> bool {
        kept > 0 && kept >= self.min_fragment_chars
    }
}

pub fn split_atom(atom: &Atom, budget: Pt, probe: &mut Probe<'_>) -> SplitOutcome {
    match (&atom.content, atom.kind) {
        (AtomContent::Text(text), AtomKind::Paragraph | AtomKind::MetaLine) => {
            split_text(atom, text, budget, probe)
        }
        (AtomContent::Timeline(entry), _) => split_timeline(atom, entry, budget, probe),
        (AtomContent::Character(card), _) => split_character(atom, card, budget, probe),
        (AtomContent::Location(card), _) => split_location(atom, card, budget, probe),
        // headings, spanning headers and generic blocks move whole
        _ => SplitOutcome::Defer,
    }
}

fn split_text(atom: &Atom, text: &str, budget: Pt, probe: &mut Probe<'_>) -> SplitOutcome {
    let head_flag = atom.continuation.head();
    let total = char_len(text);
    let kept = max_fitting_prefix(total, |n| {
        let candidate = atom.derive(head_flag, AtomContent::Text(prefix(text, n).to_string()));
        probe.fits(&candidate, budget)
    });
    if kept >= total {
        return SplitOutcome::Fits;
    }
    if !probe.usable_head(kept) {
        return SplitOutcome::Defer;
    }
    let (head, tail) = split_at_char(text, kept);
    SplitOutcome::Split {
        head: atom.derive(head_flag, AtomContent::Text(head)),
        tail: atom.derive(atom.continuation.tail(), AtomContent::Text(tail)),
    }
}

fn split_timeline(
    atom: &Atom,
    entry: &TimelineContent,
    budget: Pt,
    probe: &mut Probe<'_>,
) -> SplitOutcome {
    let head_flag = atom.continuation.head();
    let with_body = |body: &str| {
        atom.derive(
            head_flag,
            AtomContent::Timeline(TimelineContent {
                body: body.to_string(),
                ..entry.clone()
            }),
        )
    };
    // the label is never cut; if it cannot stand alone the entry moves
    if !probe.fits(&with_body(""), budget) {
        return SplitOutcome::Defer;
    }
    let total = char_len(&entry.body);
    let kept = max_fitting_prefix(total, |n| {
        probe.fits(&with_body(prefix(&entry.body, n)), budget)
    });
    if kept >= total {
        return SplitOutcome::Fits;
    }
    if !probe.usable_head(kept) {
        return SplitOutcome::Defer;
    }
    let (head, tail) = split_at_char(&entry.body, kept);
    SplitOutcome::Split {
        head: with_body(&head),
        tail: atom.derive(
            atom.continuation.tail(),
            AtomContent::Timeline(TimelineContent {
                label: entry.label.clone(),
                body: tail,
                show_label: false,
            }),
        ),
    }
}

fn split_character(
    atom: &Atom,
    card: &CharacterContent,
    budget: Pt,
    probe: &mut Probe<'_>,
) -> SplitOutcome {
    let head_flag = atom.continuation.head();
    let with = |visible: CharacterFields, description: &str| {
        atom.derive(
            head_flag,
            AtomContent::Character(CharacterContent {
                description: description.to_string(),
                visible,
                ..card.clone()
            }),
        )
    };

    if !probe.fits(&with(CharacterFields::empty(), &card.description), budget) {
        return SplitOutcome::Defer;
    }

    let mut shown = CharacterFields::empty();
    let mut has_content = false;
    for field in CharacterFields::ORDER {
        if !card.visible.contains(field) {
            continue;
        }
        if field == CharacterFields::DESCRIPTION {
            return split_character_description(atom, card, shown, has_content, budget, probe);
        }
        let candidate = shown | field;
        if probe.fits(&with(candidate, &card.description), budget) {
            shown = candidate;
            has_content |= card.shows(field);
            continue;
        }
        if !has_content {
            return SplitOutcome::Defer;
        }
        // field boundary: the rest of the card moves on, nothing repeats
        let rest = card.visible & CharacterFields::from_field_onward(field);
        return SplitOutcome::Split {
            head: with(shown, ""),
            tail: atom.derive(
                atom.continuation.tail(),
                AtomContent::Character(CharacterContent {
                    visible: rest,
                    ..card.clone()
                }),
            ),
        };
    }
    SplitOutcome::Fits
}

fn split_character_description(
    atom: &Atom,
    card: &CharacterContent,
    shown: CharacterFields,
    has_content: bool,
    budget: Pt,
    probe: &mut Probe<'_>,
) -> SplitOutcome {
    let head_flag = atom.continuation.head();
    let visible = shown | CharacterFields::DESCRIPTION;
    let head_with = |description: &str| {
        atom.derive(
            head_flag,
            AtomContent::Character(CharacterContent {
                description: description.to_string(),
                visible,
                ..card.clone()
            }),
        )
    };
    let total = char_len(&card.description);
    let kept = max_fitting_prefix(total, |n| {
        probe.fits(&head_with(prefix(&card.description, n)), budget)
    });
    if kept >= total {
        return SplitOutcome::Fits;
    }
    let tail_with = |description: String| {
        atom.derive(
            atom.continuation.tail(),
            AtomContent::Character(CharacterContent {
                description,
                visible: CharacterFields::DESCRIPTION,
                ..card.clone()
            }),
        )
    };
    if !probe.usable_head(kept) {
        if !has_content {
            return SplitOutcome::Defer;
        }
        // the earlier fields are complete; the description moves whole
        return SplitOutcome::Split {
            head: atom.derive(
                head_flag,
                AtomContent::Character(CharacterContent {
                    description: String::new(),
                    visible: shown,
                    ..card.clone()
                }),
            ),
            tail: tail_with(card.description.clone()),
        };
    }
    let (head, tail) = split_at_char(&card.description, kept);
    SplitOutcome::Split {
        head: head_with(&head),
        tail: tail_with(tail),
    }
}

fn split_location(
    atom: &Atom,
    card: &LocationContent,
    budget: Pt,
    probe: &mut Probe<'_>,
) -> SplitOutcome {
    let head_flag = atom.continuation.head();
    let header = card.visible & LocationFields::HEADER;
    let with = |visible: LocationFields, description: &str, trigger: Option<&str>| {
        atom.derive(
            head_flag,
            AtomContent::Location(LocationContent {
                header: card.header.clone(),
                item_tag: card.item_tag.clone(),
                description: description.to_string(),
                trigger_event: trigger.map(str::to_string),
                visible,
            }),
        )
    };
    let tail_with = |visible: LocationFields, description: String, trigger: Option<String>| {
        atom.derive(
            atom.continuation.tail(),
            AtomContent::Location(LocationContent {
                header: card.header.clone(),
                item_tag: card.item_tag.clone(),
                description,
                trigger_event: trigger,
                visible,
            }),
        )
    };

    let has_description = card.visible.contains(LocationFields::DESCRIPTION);
    let mut base = header;
    if has_description {
        base |= LocationFields::DESCRIPTION;
        if !probe.fits(&with(base, "", None), budget) {
            return SplitOutcome::Defer;
        }
        let total = char_len(&card.description);
        let kept = max_fitting_prefix(total, |n| {
            probe.fits(&with(base, prefix(&card.description, n), None), budget)
        });
        if kept < total {
            if !probe.usable_head(kept) {
                return SplitOutcome::Defer;
            }
            let (head, tail) = split_at_char(&card.description, kept);
            let rest = card.visible - LocationFields::HEADER;
            return SplitOutcome::Split {
                head: with(base, &head, None),
                tail: tail_with(rest, tail, card.trigger_event.clone()),
            };
        }
    } else if !probe.fits(&with(base, "", None), budget) {
        return SplitOutcome::Defer;
    }

    let trigger = match (&card.trigger_event, card.shows_trigger()) {
        (Some(trigger), true) => trigger.as_str(),
        _ => return SplitOutcome::Fits,
    };
    let full = base | LocationFields::TRIGGER;
    if probe.fits(&with(full, &card.description, Some(trigger)), budget) {
        return SplitOutcome::Fits;
    }
    let total = char_len(trigger);
    let kept = max_fitting_prefix(total, |n| {
        probe.fits(&with(full, &card.description, Some(prefix(trigger, n))), budget)
    });
    if !probe.usable_head(kept) {
        if !has_description {
            return SplitOutcome::Defer;
        }
        // the description is complete; cut at the field boundary instead
        return SplitOutcome::Split {
            head: with(base, &card.description, None),
            tail: tail_with(LocationFields::TRIGGER, String::new(), Some(trigger.to_string())),
        };
    }
    let (head, tail) = split_at_char(trigger, kept);
    SplitOutcome::Split {
        head: with(full, &card.description, Some(&head)),
        tail: tail_with(LocationFields::TRIGGER, String::new(), Some(tail)),
    }
}
