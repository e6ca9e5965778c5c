//! Atoms: the units the paginator places or splits.

use bitflags::bitflags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomKind {
    Heading,
    Paragraph,
    MetaLine,
    TimelineEntry,
    CharacterCard,
    LocationCard,
    SpanningHeader,
    GenericBlock,
}

impl AtomKind {
    pub fn name(self) -> &'static str {
        match self {
            AtomKind::Heading => "Heading",
            AtomKind::Paragraph => "Paragraph",
            AtomKind::MetaLine => "MetaLine",
            AtomKind::TimelineEntry => "TimelineEntry",
            AtomKind::CharacterCard => "CharacterCard",
            AtomKind::LocationCard => "LocationCard",
            AtomKind::SpanningHeader => "SpanningHeader",
            AtomKind::GenericBlock => "GenericBlock",
        }
    }
}

/// Which part of a split atom a fragment holds. A remainder that is split
/// again produces a `Middle` piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Continuation {
    None,
    Start,
    Middle,
    End,
}

impl Continuation {
    /// Flag for the head piece when an atom carrying `self` is split.
    pub fn head(self) -> Continuation {
        match self {
            Continuation::None | Continuation::Start => Continuation::Start,
            Continuation::Middle | Continuation::End => Continuation::Middle,
        }
    }

    /// Flag for the tail piece when an atom carrying `self` is split.
    pub fn tail(self) -> Continuation {
        Continuation::End
    }

    pub fn continues_previous(self) -> bool {
        matches!(self, Continuation::Middle | Continuation::End)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CharacterFields: u8 {
        const PORTRAIT = 1 << 0;
        const NAME = 1 << 1;
        const ROLE = 1 << 2;
        const STATS = 1 << 3;
        const DESCRIPTION = 1 << 4;
    }
}

impl CharacterFields {
    /// Reveal order used when looking for a split boundary.
    pub const ORDER: [CharacterFields; 5] = [
        CharacterFields::PORTRAIT,
        CharacterFields::NAME,
        CharacterFields::ROLE,
        CharacterFields::STATS,
        CharacterFields::DESCRIPTION,
    ];

    /// The field itself and every field revealed after it.
    pub fn from_field_onward(field: CharacterFields) -> CharacterFields {
        let mut out = CharacterFields::empty();
        let mut seen = false;
        for candidate in Self::ORDER {
            if candidate == field {
                seen = true;
            }
            if seen {
                out |= candidate;
            }
        }
        out
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LocationFields: u8 {
        /// Title plus the optional item tag.
        const HEADER = 1 << 0;
        const DESCRIPTION = 1 << 1;
        const TRIGGER = 1 << 2;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineContent {
    pub label: String,
    pub body: String,
    pub show_label: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CharacterContent {
    pub portrait: bool,
    pub name: String,
    pub role: String,
    pub stats: String,
    pub description: String,
    pub visible: CharacterFields,
}

impl CharacterContent {
    /// Whether `field` is both visible and present.
    pub fn shows(&self, field: CharacterFields) -> bool {
        if !self.visible.contains(field) {
            return false;
        }
        if field == CharacterFields::PORTRAIT {
            return self.portrait;
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationContent {
    pub header: String,
    pub item_tag: Option<String>,
    pub description: String,
    pub trigger_event: Option<String>,
    pub visible: LocationFields,
}

impl LocationContent {
    pub fn shows_trigger(&self) -> bool {
        self.visible.contains(LocationFields::TRIGGER) && self.trigger_event.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderContent {
    pub title: String,
    pub subtitle: String,
    pub meta: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AtomContent {
    /// Heading, Paragraph and MetaLine text.
    Text(String),
    Timeline(TimelineContent),
    Character(CharacterContent),
    Location(LocationContent),
    Header(HeaderContent),
    /// GenericBlock: rendered as-is, never split.
    Opaque { tag: String, text: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub kind: AtomKind,
    /// Position in the atomizer output. Fragments keep their source index.
    pub index: usize,
    /// Heading level for headings, 0 otherwise.
    pub level: u8,
    pub continuation: Continuation,
    pub content: AtomContent,
}

impl Atom {
    pub fn text(kind: AtomKind, index: usize, text: impl Into<String>) -> Self {
        Self {
            kind,
            index,
            level: 0,
            continuation: Continuation::None,
            content: AtomContent::Text(text.into()),
        }
    }

    pub fn is_fragment(&self) -> bool {
        self.continuation != Continuation::None
    }

    /// Clones this atom with a new payload and continuation flag.
    pub fn derive(&self, continuation: Continuation, content: AtomContent) -> Atom {
        Atom {
            kind: self.kind,
            index: self.index,
            level: self.level,
            continuation,
            content,
        }
    }

    /// Text of every splittable field, in reading order. Used to check that a
    /// sequence of fragments reconstructs its source.
    pub fn splittable_text(&self) -> Vec<(&'static str, &str)> {
        match &self.content {
            AtomContent::Text(text) => vec![("text", text.as_str())],
            AtomContent::Timeline(t) => vec![("body", t.body.as_str())],
            AtomContent::Character(c) => {
                if c.visible.contains(CharacterFields::DESCRIPTION) {
                    vec![("description", c.description.as_str())]
                } else {
                    Vec::new()
                }
            }
            AtomContent::Location(l) => {
                let mut out = Vec::new();
                if l.visible.contains(LocationFields::DESCRIPTION) {
                    out.push(("description", l.description.as_str()));
                }
                if l.visible.contains(LocationFields::TRIGGER) {
                    if let Some(trigger) = &l.trigger_event {
                        out.push(("trigger_event", trigger.as_str()));
                    }
                }
                out
            }
            AtomContent::Header(_) | AtomContent::Opaque { .. } => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuation_flags_chain_through_repeated_splits() {
        let first = Continuation::None;
        assert_eq!(first.head(), Continuation::Start);
        assert_eq!(first.tail(), Continuation::End);
        let again = first.tail();
        assert_eq!(again.head(), Continuation::Middle);
        assert_eq!(again.tail(), Continuation::End);
        assert!(Continuation::Start < Continuation::Middle);
        assert!(Continuation::Middle < Continuation::End);
    }

    #[test]
    fn field_onward_masks_follow_reveal_order() {
        assert_eq!(
            CharacterFields::from_field_onward(CharacterFields::ROLE),
            CharacterFields::ROLE | CharacterFields::STATS | CharacterFields::DESCRIPTION
        );
        assert_eq!(
            CharacterFields::from_field_onward(CharacterFields::PORTRAIT),
            CharacterFields::all()
        );
    }

    #[test]
    fn portrait_is_shown_only_when_present() {
        let card = CharacterContent {
            portrait: false,
            name: "Ada".to_string(),
            role: String::new(),
            stats: String::new(),
            description: String::new(),
            visible: CharacterFields::all(),
        };
        assert!(!card.shows(CharacterFields::PORTRAIT));
        assert!(card.shows(CharacterFields::NAME));
    }
}
