use crate::error::GutterError;
use crate::style::TextStyle;
use crate::types::Pt;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use ttf_parser::Face;

/// A loaded TrueType/OpenType face. The font program is kept as bytes and
/// re-parsed on demand; advances are cached per character.
#[derive(Debug)]
pub struct FontFace {
    name: String,
    data: Arc<Vec<u8>>,
    units_per_em: u16,
    ascender: i16,
    descender: i16,
    advance_cache: Mutex<HashMap<char, Option<u16>>>,
}

impl FontFace {
    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Result<Self, GutterError> {
        let name = name.into();
        let (units_per_em, ascender, descender) = {
            let face = Face::parse(&data, 0)
                .map_err(|e| GutterError::Font(format!("{name}: {e}")))?;
            (face.units_per_em(), face.ascender(), face.descender())
        };
        if units_per_em == 0 {
            return Err(GutterError::Font(format!("{name}: units_per_em is zero")));
        }
        Ok(Self {
            name,
            data: Arc::new(data),
            units_per_em,
            ascender,
            descender,
            advance_cache: Mutex::new(HashMap::new()),
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GutterError> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("font")
            .to_string();
        Self::from_bytes(name, data)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    /// Ascender as a fraction of the em square.
    pub fn ascent_em(&self) -> f32 {
        self.ascender as f32 / self.units_per_em as f32
    }

    pub fn descent_em(&self) -> f32 {
        self.descender as f32 / self.units_per_em as f32
    }

    fn advance_units(&self, ch: char) -> Option<u16> {
        if let Ok(cache) = self.advance_cache.lock() {
            if let Some(value) = cache.get(&ch) {
                return *value;
            }
        }
        let value = Face::parse(&self.data, 0).ok().and_then(|face| {
            let gid = face.glyph_index(ch)?;
            face.glyph_hor_advance(gid)
        });
        if let Ok(mut cache) = self.advance_cache.lock() {
            cache.insert(ch, value);
        }
        value
    }

    /// Runs `f` against a freshly parsed face.
    pub fn with_face<R>(&self, f: impl FnOnce(&Face<'_>) -> R) -> Option<R> {
        let face = Face::parse(&self.data, 0).ok()?;
        Some(f(&face))
    }
}

/// Character advance source: a real face when one is loaded, otherwise a
/// fixed per-class table (0.6 em for narrow glyphs, 1.0 em for East Asian
/// wide glyphs).
#[derive(Debug, Clone, Default)]
pub struct FontMetrics {
    face: Option<Arc<FontFace>>,
}

impl FontMetrics {
    pub fn new(face: Option<Arc<FontFace>>) -> Self {
        Self { face }
    }

    pub fn face(&self) -> Option<&Arc<FontFace>> {
        self.face.as_ref()
    }

    pub fn char_width(&self, ch: char, font_size: Pt) -> Pt {
        if let Some(face) = &self.face {
            if let Some(units) = face.advance_units(ch) {
                return font_size * (units as f32 / face.units_per_em as f32);
            }
        }
        font_size * fallback_advance_em(ch)
    }

    pub fn text_width(&self, text: &str, font_size: Pt) -> Pt {
        text.chars().map(|ch| self.char_width(ch, font_size)).sum()
    }

    /// Greedy line breaking at whitespace, breaking inside a word only when
    /// the word alone is wider than the line. Blank input yields no lines.
    pub fn wrap(&self, text: &str, max_width: Pt, style: &TextStyle) -> Vec<String> {
        let max_width = max_width.max(Pt::from_f32(1.0));
        let space = self.char_width(' ', style.font_size);
        let mut lines = Vec::new();
        for segment in text.split('\n') {
            if segment.trim().is_empty() {
                if !lines.is_empty() {
                    lines.push(String::new());
                }
                continue;
            }
            let mut current = String::new();
            let mut current_width = Pt::ZERO;
            for word in segment.split_whitespace() {
                let word_width = self.text_width(word, style.font_size);
                if !current.is_empty() {
                    let next_width = current_width + space + word_width;
                    if next_width <= max_width {
                        current.push(' ');
                        current.push_str(word);
                        current_width = next_width;
                        continue;
                    }
                    lines.push(std::mem::take(&mut current));
                    current_width = Pt::ZERO;
                }
                if word_width > max_width {
                    let mut parts = self.break_word(word, max_width, style.font_size);
                    if let Some(last) = parts.pop() {
                        lines.extend(parts);
                        current_width = self.text_width(&last, style.font_size);
                        current = last;
                    }
                } else {
                    current.push_str(word);
                    current_width = word_width;
                }
            }
            if !current.is_empty() {
                lines.push(current);
            }
        }
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        lines
    }

    fn break_word(&self, word: &str, max_width: Pt, font_size: Pt) -> Vec<String> {
        let mut parts = Vec::new();
        let mut current = String::new();
        let mut current_width = Pt::ZERO;
        for ch in word.chars() {
            let w = self.char_width(ch, font_size);
            let mut next_width = current_width + w;
            if !current.is_empty() && next_width > max_width {
                parts.push(std::mem::take(&mut current));
                next_width = w;
            }
            current.push(ch);
            current_width = next_width;
        }
        if !current.is_empty() {
            parts.push(current);
        }
        parts
    }
}

fn fallback_advance_em(ch: char) -> f32 {
    if is_wide(ch) {
        1.0
    } else if ch == ' ' {
        0.3
    } else {
        0.6
    }
}

fn is_wide(ch: char) -> bool {
    matches!(ch as u32,
        0x1100..=0x115F
        | 0x2E80..=0x303E
        | 0x3040..=0x33FF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xA960..=0xA97F
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6
        | 0x1F300..=0x1FAFF
        | 0x20000..=0x3FFFD)
}
