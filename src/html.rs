//! Import of authored module markup into the Document Model.
//!
//! Recognized class markers map to leaf nodes; `ul`/`ol` become lists,
//! character and location containers become groups, and every other
//! wrapper element is transparent.

use crate::document::{CharacterCard, LocationCard, ModuleDocument, Node, TitleBlock};
use crate::error::GutterError;
use kuchiki::traits::TendrilSink;
use kuchiki::{ElementData, NodeData, NodeRef};

const SKIPPED_TAGS: &[&str] = &["head", "script", "style", "template", "noscript", "br", "hr"];

pub fn parse_module_html(html: &str) -> Result<ModuleDocument, GutterError> {
    if html.trim().is_empty() {
        return Err(GutterError::Html("empty module markup".to_string()));
    }
    let document = kuchiki::parse_html().one(html);
    let body = document
        .select_first("body")
        .map_err(|_| GutterError::Html("module markup has no body".to_string()))?;
    let children = convert_children(body.as_node());
    if children.is_empty() {
        return Err(GutterError::Html(
            "module markup contains no recognizable content".to_string(),
        ));
    }
    Ok(ModuleDocument::new(children))
}

fn convert_children(node: &NodeRef) -> Vec<Node> {
    let mut out = Vec::new();
    for child in node.children() {
        convert_node(&child, &mut out);
    }
    out
}

fn convert_node(node: &NodeRef, out: &mut Vec<Node>) {
    match node.data() {
        NodeData::Text(text) => {
            let text = normalize(&text.borrow());
            if !text.is_empty() {
                out.push(Node::Paragraph { text });
            }
        }
        NodeData::Element(element) => convert_element(node, element, out),
        _ => {}
    }
}

fn convert_element(node: &NodeRef, element: &ElementData, out: &mut Vec<Node>) {
    let tag = element.name.local.as_ref().to_ascii_lowercase();
    if SKIPPED_TAGS.contains(&tag.as_str()) {
        return;
    }
    let classes = class_list(element);
    let has = |name: &str| classes.iter().any(|c| c == name);

    if has("book-header-section") {
        out.push(Node::TitleBlock(title_block(node)));
    } else if has("book-section") {
        out.push(Node::Section {
            children: convert_children(node),
        });
    } else if has("npc-card") {
        out.push(Node::CharacterCard(character_card(node)));
    } else if has("scene-box") {
        out.push(Node::LocationCard(location_card(node)));
    } else if has("npc-container") || has("scene-container") {
        out.push(Node::Group {
            children: convert_children(node),
        });
    } else if has("book-h1") {
        out.push(Node::heading(1, normalize(&node.text_contents())));
    } else if let Some(level) = heading_level(&tag) {
        out.push(Node::heading(level, normalize(&node.text_contents())));
    } else if has("book-meta") {
        out.push(Node::Meta {
            text: normalize(&node.text_contents()),
        });
    } else if has("book-p") || tag == "p" {
        out.push(Node::paragraph(normalize(&node.text_contents())));
    } else if tag == "ul" || tag == "ol" {
        out.push(Node::List {
            children: convert_children(node),
        });
    } else if tag == "li" {
        out.push(list_item(node));
    } else if has_element_children(node) {
        out.extend(convert_children(node));
    } else {
        let text = normalize(&node.text_contents());
        if !text.is_empty() {
            out.push(Node::Other { tag, text });
        }
    }
}

fn heading_level(tag: &str) -> Option<u8> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

fn class_list(element: &ElementData) -> Vec<String> {
    element
        .attributes
        .borrow()
        .get("class")
        .map(|raw| raw.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

fn has_element_children(node: &NodeRef) -> bool {
    node.children().any(|child| child.as_element().is_some())
}

/// Collapses runs of whitespace to single spaces.
fn normalize(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn text_of(node: &NodeRef, selector: &str) -> String {
    node.select_first(selector)
        .map(|found| normalize(&found.as_node().text_contents()))
        .unwrap_or_default()
}

fn optional_text_of(node: &NodeRef, selector: &str) -> Option<String> {
    let text = text_of(node, selector);
    (!text.is_empty()).then_some(text)
}

fn title_block(node: &NodeRef) -> TitleBlock {
    let mut title = text_of(node, ".book-title");
    if title.is_empty() {
        title = text_of(node, "h1");
    }
    let subtitle = optional_text_of(node, ".book-subtitle")
        .or_else(|| optional_text_of(node, "h2"))
        .unwrap_or_default();
    let meta: Vec<String> = node
        .select(".book-meta")
        .map(|found| {
            found
                .map(|m| normalize(&m.as_node().text_contents()))
                .filter(|text| !text.is_empty())
                .collect()
        })
        .unwrap_or_default();
    TitleBlock {
        title,
        subtitle,
        meta,
    }
}

fn character_card(node: &NodeRef) -> CharacterCard {
    CharacterCard {
        portrait: node.select_first(".npc-portrait").is_ok(),
        name: text_of(node, ".npc-name"),
        role: text_of(node, ".npc-role"),
        stats: text_of(node, ".npc-stats"),
        description: text_of(node, ".npc-desc"),
    }
}

fn location_card(node: &NodeRef) -> LocationCard {
    LocationCard {
        header: text_of(node, ".scene-title"),
        item_tag: optional_text_of(node, ".scene-item"),
        description: text_of(node, ".scene-desc"),
        trigger_event: optional_text_of(node, ".scene-event"),
    }
}

/// A list item whose first element is `<strong>` is a timeline entry: the
/// strong text is the label, everything after it the body.
fn list_item(node: &NodeRef) -> Node {
    let first_element = node.children().find(|child| match child.data() {
        NodeData::Element(_) => true,
        NodeData::Text(text) => !text.borrow().trim().is_empty(),
        _ => false,
    });
    let label_node = first_element.filter(|child| {
        child
            .as_element()
            .is_some_and(|el| el.name.local.as_ref().eq_ignore_ascii_case("strong"))
    });
    let Some(label_node) = label_node else {
        return Node::paragraph(normalize(&node.text_contents()));
    };
    let label = normalize(&label_node.text_contents());
    let body: String = label_node
        .following_siblings()
        .map(|sibling| sibling.text_contents())
        .collect();
    let body = normalize(&body)
        .trim_start_matches([':', '-', '\u{ff1a}'])
        .trim_start()
        .to_string();
    Node::TimelineEntry { label, body }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODULE: &str = r#"
        <html><head><style>.x { color: red }</style></head><body>
        <div class="book-header-section">
            <div class="book-title">The Black Water Curse</div>
            <div class="book-subtitle">Curse of Black Water</div>
            <div class="book-meta">Era: 1925</div>
        </div>
        <div class="book-section">
            <div class="book-h1">2. Timeline</div>
            <ul class="out-timeline">
                <li><strong>Day 1</strong>: A body washes ashore.</li>
                <li>No label here.</li>
            </ul>
        </div>
        <div class="book-section">
            <h2>3. Dramatis Personae</h2>
            <div class="npc-container">
                <div class="npc-card">
                    <div class="npc-portrait"></div>
                    <div class="npc-name">Ada</div>
                    <div class="npc-role">Librarian</div>
                    <div class="npc-stats">INT 80</div>
                    <div class="npc-desc">Quiet,
                        watchful.</div>
                </div>
            </div>
        </div>
        <div class="scene-container">
            <div class="scene-box">
                <div class="scene-title">Docks</div>
                <div class="scene-desc">Fog everywhere.</div>
                <div class="scene-event">  </div>
            </div>
        </div>
        <p class="book-p">The tide turns.</p>
        <figure>caption only</figure>
        </body></html>"#;

    #[test]
    fn class_markers_map_to_nodes() {
        let doc = parse_module_html(MODULE).unwrap();
        assert_eq!(doc.children.len(), 6);
        let Node::TitleBlock(block) = &doc.children[0] else {
            panic!("expected title block, got {:?}", doc.children[0]);
        };
        assert_eq!(block.title, "The Black Water Curse");
        assert_eq!(block.subtitle, "Curse of Black Water");
        assert_eq!(block.meta, vec!["Era: 1925"]);

        let Node::Section { children } = &doc.children[1] else {
            panic!("expected section");
        };
        assert_eq!(children[0], Node::heading(1, "2. Timeline"));
        let Node::List { children: items } = &children[1] else {
            panic!("expected list");
        };
        assert_eq!(
            items[0],
            Node::TimelineEntry {
                label: "Day 1".to_string(),
                body: "A body washes ashore.".to_string(),
            }
        );
        assert_eq!(items[1], Node::paragraph("No label here."));
    }

    #[test]
    fn cards_collect_their_fields() {
        let doc = parse_module_html(MODULE).unwrap();
        let Node::Section { children } = &doc.children[2] else {
            panic!("expected section");
        };
        assert_eq!(children[0], Node::heading(2, "3. Dramatis Personae"));
        let Node::Group { children: cards } = &children[1] else {
            panic!("expected group");
        };
        let Node::CharacterCard(card) = &cards[0] else {
            panic!("expected character card");
        };
        assert!(card.portrait);
        assert_eq!(card.name, "Ada");
        assert_eq!(card.stats, "INT 80");
        assert_eq!(card.description, "Quiet, watchful.");

        let Node::Group { children: scenes } = &doc.children[3] else {
            panic!("expected group");
        };
        let Node::LocationCard(scene) = &scenes[0] else {
            panic!("expected location card");
        };
        assert_eq!(scene.header, "Docks");
        assert_eq!(scene.item_tag, None);
        assert_eq!(scene.trigger_event, None);
    }

    #[test]
    fn unknown_leaves_are_kept_as_other() {
        let doc = parse_module_html(MODULE).unwrap();
        assert_eq!(doc.children[4], Node::paragraph("The tide turns."));
        assert_eq!(
            doc.children[5],
            Node::Other {
                tag: "figure".to_string(),
                text: "caption only".to_string(),
            }
        );
    }

    #[test]
    fn blank_markup_is_rejected() {
        assert!(matches!(parse_module_html("   "), Err(GutterError::Html(_))));
        assert!(matches!(
            parse_module_html("<html><body><script>x()</script></body></html>"),
            Err(GutterError::Html(_))
        ));
    }
}
