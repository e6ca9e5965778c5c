//! Document Model: the read-only tree a module is authored as.
//!
//! Wrapper nodes (`Section`, `List`, `Group`) only carry children. Leaf nodes
//! carry the text the paginator places. Every text field defaults to empty
//! when absent from serialized input.

use crate::error::GutterError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleDocument {
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Section {
        #[serde(default)]
        children: Vec<Node>,
    },
    List {
        #[serde(default)]
        children: Vec<Node>,
    },
    Group {
        #[serde(default)]
        children: Vec<Node>,
    },
    TitleBlock(TitleBlock),
    Heading {
        #[serde(default = "default_heading_level")]
        level: u8,
        #[serde(default)]
        text: String,
    },
    Paragraph {
        #[serde(default)]
        text: String,
    },
    Meta {
        #[serde(default)]
        text: String,
    },
    TimelineEntry {
        #[serde(default)]
        label: String,
        #[serde(default)]
        body: String,
    },
    CharacterCard(CharacterCard),
    LocationCard(LocationCard),
    Other {
        #[serde(default)]
        tag: String,
        #[serde(default)]
        text: String,
    },
}

fn default_heading_level() -> u8 {
    1
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TitleBlock {
    pub title: String,
    pub subtitle: String,
    pub meta: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterCard {
    pub portrait: bool,
    pub name: String,
    pub role: String,
    pub stats: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationCard {
    pub header: String,
    pub item_tag: Option<String>,
    pub description: String,
    pub trigger_event: Option<String>,
}

impl ModuleDocument {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    pub fn from_json(json: &str) -> Result<Self, GutterError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, GutterError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// True when no leaf in the tree carries any content.
    pub fn is_empty(&self) -> bool {
        self.children.iter().all(Node::is_empty)
    }
}

impl Node {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Node::Paragraph { text: text.into() }
    }

    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Node::Heading {
            level,
            text: text.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Node::Section { children } | Node::List { children } | Node::Group { children } => {
                children.iter().all(Node::is_empty)
            }
            Node::TitleBlock(block) => {
                block.title.trim().is_empty()
                    && block.subtitle.trim().is_empty()
                    && block.meta.iter().all(|m| m.trim().is_empty())
            }
            Node::Heading { text, .. } | Node::Paragraph { text } | Node::Meta { text } => {
                text.trim().is_empty()
            }
            Node::TimelineEntry { label, body } => {
                label.trim().is_empty() && body.trim().is_empty()
            }
            // Cards and unknown blocks still occupy space even when their text is blank.
            Node::CharacterCard(_) | Node::LocationCard(_) | Node::Other { .. } => false,
        }
    }
}

/// Generated module content as returned by the text-generation collaborator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleContent {
    pub title: String,
    pub title_en: String,
    pub location: String,
    pub location_en: String,
    pub era: String,
    pub boss: String,
    pub truth: String,
    pub timeline: Vec<TimelineRecord>,
    pub climax: String,
    pub npcs: Vec<NpcRecord>,
    pub scenes: Vec<SceneRecord>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineRecord {
    pub time: String,
    pub event: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NpcRecord {
    pub name: String,
    pub role: String,
    pub stats: String,
    pub desc: String,
    pub secret: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneRecord {
    pub name: String,
    pub item: String,
    pub desc: String,
    pub event: String,
}

impl ModuleContent {
    pub fn from_json(json: &str) -> Result<Self, GutterError> {
        Ok(serde_json::from_str(json)?)
    }

    fn resolved_title(&self) -> String {
        let title = self.title.trim();
        if !title.is_empty() {
            return title.to_string();
        }
        let location = self.location.trim();
        if location.is_empty() {
            "Untitled Module".to_string()
        } else {
            format!("Shadows of {location}")
        }
    }

    fn resolved_subtitle(&self) -> String {
        let subtitle = self.title_en.trim();
        if !subtitle.is_empty() {
            return subtitle.to_string();
        }
        let location = if self.location_en.trim().is_empty() {
            self.location.trim()
        } else {
            self.location_en.trim()
        };
        if location.is_empty() {
            String::new()
        } else {
            format!("Shadows of {location}")
        }
    }

    /// Assembles the canonical five-section module layout.
    pub fn into_document(self) -> ModuleDocument {
        let mut meta = Vec::new();
        if !self.era.trim().is_empty() {
            meta.push(format!("Era: {}", self.era.trim()));
        }
        if !self.boss.trim().is_empty() {
            meta.push(format!("Antagonist: {}", self.boss.trim()));
        }
        let header = Node::TitleBlock(TitleBlock {
            title: self.resolved_title(),
            subtitle: self.resolved_subtitle(),
            meta,
        });

        let lore = Node::Section {
            children: vec![
                Node::heading(1, "1. Keeper's Lore"),
                Node::paragraph(self.truth),
            ],
        };

        let timeline_body = if self.timeline.is_empty() {
            Node::paragraph("(timeline not yet generated)")
        } else {
            Node::List {
                children: self
                    .timeline
                    .into_iter()
                    .map(|record| Node::TimelineEntry {
                        label: record.time,
                        body: record.event,
                    })
                    .collect(),
            }
        };
        let timeline = Node::Section {
            children: vec![Node::heading(1, "2. Timeline"), timeline_body],
        };

        let npc_body = if self.npcs.is_empty() {
            Node::paragraph("(character dossiers not yet generated)")
        } else {
            Node::Group {
                children: self
                    .npcs
                    .into_iter()
                    .map(|npc| {
                        let mut description = npc.desc;
                        if !npc.secret.trim().is_empty() {
                            description.push_str("\n\nSecret: ");
                            description.push_str(npc.secret.trim());
                        }
                        Node::CharacterCard(CharacterCard {
                            portrait: true,
                            name: npc.name,
                            role: npc.role,
                            stats: npc.stats,
                            description,
                        })
                    })
                    .collect(),
            }
        };
        let personae = Node::Section {
            children: vec![Node::heading(1, "3. Dramatis Personae"), npc_body],
        };

        let scene_body = if self.scenes.is_empty() {
            Node::paragraph("(locations not yet generated)")
        } else {
            Node::Group {
                children: self
                    .scenes
                    .into_iter()
                    .map(|scene| {
                        Node::LocationCard(LocationCard {
                            header: scene.name,
                            item_tag: non_blank(scene.item),
                            description: scene.desc,
                            trigger_event: non_blank(scene.event),
                        })
                    })
                    .collect(),
            }
        };
        let locations = Node::Section {
            children: vec![Node::heading(1, "4. Locations"), scene_body],
        };

        let conclusion = Node::Section {
            children: vec![
                Node::heading(1, "5. Conclusion"),
                Node::paragraph(self.climax),
            ],
        };

        ModuleDocument::new(vec![
            header, lore, timeline, personae, locations, conclusion,
        ])
    }
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
