use crate::atom::{
    Atom, AtomContent, AtomKind, CharacterContent, CharacterFields, Continuation, HeaderContent,
    LocationContent, LocationFields, TimelineContent,
};
use crate::document::{ModuleDocument, Node};

/// Flattens the document tree into atoms in document order. Wrapper nodes
/// are transparent; never fails.
pub fn atomize(document: &ModuleDocument) -> Vec<Atom> {
    let mut atoms = Vec::new();
    for node in &document.children {
        visit(node, &mut atoms);
    }
    atoms
}

fn visit(node: &Node, atoms: &mut Vec<Atom>) {
    let index = atoms.len();
    let atom = match node {
        Node::Section { children } | Node::List { children } | Node::Group { children } => {
            for child in children {
                visit(child, atoms);
            }
            return;
        }
        Node::TitleBlock(block) => Atom {
            kind: AtomKind::SpanningHeader,
            index,
            level: 0,
            continuation: Continuation::None,
            content: AtomContent::Header(HeaderContent {
                title: block.title.clone(),
                subtitle: block.subtitle.clone(),
                meta: block.meta.clone(),
            }),
        },
        Node::Heading { level, text } => Atom {
            level: (*level).max(1),
            ..Atom::text(AtomKind::Heading, index, text.clone())
        },
        Node::Paragraph { text } => Atom::text(AtomKind::Paragraph, index, text.clone()),
        Node::Meta { text } => Atom::text(AtomKind::MetaLine, index, text.clone()),
        Node::TimelineEntry { label, body } => Atom {
            kind: AtomKind::TimelineEntry,
            index,
            level: 0,
            continuation: Continuation::None,
            content: AtomContent::Timeline(TimelineContent {
                label: label.clone(),
                body: body.clone(),
                show_label: true,
            }),
        },
        Node::CharacterCard(card) => Atom {
            kind: AtomKind::CharacterCard,
            index,
            level: 0,
            continuation: Continuation::None,
            content: AtomContent::Character(CharacterContent {
                portrait: card.portrait,
                name: card.name.clone(),
                role: card.role.clone(),
                stats: card.stats.clone(),
                description: card.description.clone(),
                visible: CharacterFields::all(),
            }),
        },
        Node::LocationCard(card) => Atom {
            kind: AtomKind::LocationCard,
            index,
            level: 0,
            continuation: Continuation::None,
            content: AtomContent::Location(LocationContent {
                header: card.header.clone(),
                item_tag: card.item_tag.clone(),
                description: card.description.clone(),
                trigger_event: card.trigger_event.clone(),
                visible: LocationFields::all(),
            }),
        },
        Node::Other { tag, text } => Atom {
            kind: AtomKind::GenericBlock,
            index,
            level: 0,
            continuation: Continuation::None,
            content: AtomContent::Opaque {
                tag: tag.clone(),
                text: text.clone(),
            },
        },
    };
    atoms.push(atom);
}
