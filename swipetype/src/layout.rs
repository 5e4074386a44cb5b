//! Keyboard layouts.
//!
//! A layout is an immutable snapshot: ordered rows of keys, each with a
//! rectangle normalized to the keyboard bounds. Only [`KeyKind::Char`] keys
//! carrying a letter take part in key detection, pruning and correction;
//! everything else is filtered out by [`KeyboardLayout::letter_keys`].
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use unic_ucd_category::GeneralCategory;

use crate::error::LayoutError;
use crate::types::Point;

/// A rectangle as fractions of the keyboard width and height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// left edge
    pub x: f32,
    /// top edge
    pub y: f32,
    /// width
    pub width: f32,
    /// height
    pub height: f32,
}

impl Rect {
    /// A rectangle in layout-relative units.
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Rect {
        Rect {
            x,
            y,
            width,
            height,
        }
    }
}

/// Modifier keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modifier {
    /// shift
    Shift,
    /// control
    Ctrl,
    /// alt
    Alt,
    /// meta or command
    Meta,
    /// function layer
    Fn,
}

/// Keys that trigger an editing or keyboard action rather than text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// delete backwards
    Backspace,
    /// newline or submit
    Enter,
    /// space bar
    Space,
    /// tab
    Tab,
    /// switch to another layout
    SwitchLayout,
    /// emoji picker
    Emoji,
}

/// What a key does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum KeyKind {
    /// produces a character
    Char(char),
    /// holds a modifier
    Modifier(Modifier),
    /// runs an action
    Action(Action),
    /// occupies space without doing anything
    Spacer,
}

/// A key and where it sits on the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Key {
    /// what the key does
    pub kind: KeyKind,
    /// position relative to the keyboard
    pub rect: Rect,
}

impl Key {
    /// the key's letter, lowercased, if it produces one
    pub fn letter(&self) -> Option<char> {
        match self.kind {
            KeyKind::Char(c) if GeneralCategory::of(c).is_letter() => c.to_lowercase().next(),
            _ => None,
        }
    }
}

/// A row of keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// keys, left to right
    pub keys: Vec<Key>,
}

/// Index of a key in the layout's row-major key order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyRef(pub usize);

/// A letter key resolved to pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterKey {
    /// the key
    pub key: KeyRef,
    /// its letter
    pub letter: char,
    /// center in pixels
    pub center: Point,
    /// width in pixels
    pub width: f32,
    /// height in pixels
    pub height: f32,
}

/// An immutable keyboard layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyboardLayout {
    /// rows, top to bottom
    pub rows: Vec<Row>,
}

const QWERTY_ROWS: [&str; 3] = ["qwertyuiop", "asdfghjkl", "zxcvbnm"];

impl KeyboardLayout {
    /// A layout made of `rows`.
    pub fn new(rows: Vec<Row>) -> KeyboardLayout {
        KeyboardLayout { rows }
    }

    /// The standard QWERTY letter layout with a modifier row.
    ///
    /// Every letter key is a tenth of the keyboard wide and a quarter high.
    pub fn qwerty() -> KeyboardLayout {
        let w = 0.1;
        let h = 0.25;
        let mut rows = Vec::with_capacity(4);

        for (i, letters) in QWERTY_ROWS.iter().enumerate() {
            let y = i as f32 * h;
            let offset = match i {
                0 => 0.0,
                1 => 0.05,
                _ => 0.15,
            };
            let mut keys = Vec::with_capacity(letters.len() + 2);

            if i == 2 {
                keys.push(Key {
                    kind: KeyKind::Modifier(Modifier::Shift),
                    rect: Rect::new(0.0, y, 0.15, h),
                });
            }

            for (j, c) in letters.chars().enumerate() {
                keys.push(Key {
                    kind: KeyKind::Char(c),
                    rect: Rect::new(offset + j as f32 * w, y, w, h),
                });
            }

            if i == 2 {
                keys.push(Key {
                    kind: KeyKind::Action(Action::Backspace),
                    rect: Rect::new(0.85, y, 0.15, h),
                });
            }

            rows.push(Row { keys });
        }

        let y = 3.0 * h;
        rows.push(Row {
            keys: vec![
                Key {
                    kind: KeyKind::Action(Action::SwitchLayout),
                    rect: Rect::new(0.0, y, 0.15, h),
                },
                Key {
                    kind: KeyKind::Char(','),
                    rect: Rect::new(0.15, y, 0.1, h),
                },
                Key {
                    kind: KeyKind::Action(Action::Space),
                    rect: Rect::new(0.25, y, 0.5, h),
                },
                Key {
                    kind: KeyKind::Char('.'),
                    rect: Rect::new(0.75, y, 0.1, h),
                },
                Key {
                    kind: KeyKind::Action(Action::Enter),
                    rect: Rect::new(0.85, y, 0.15, h),
                },
            ],
        });

        KeyboardLayout { rows }
    }

    /// reads a JSON layout
    pub fn from_reader<R: Read>(reader: R) -> Result<KeyboardLayout, LayoutError> {
        let layout: KeyboardLayout = serde_json::from_reader(reader).map_err(LayoutError::Parse)?;

        if layout.keys().all(|(_, k)| k.letter().is_none()) {
            return Err(LayoutError::Empty);
        }

        Ok(layout)
    }

    /// reads a JSON layout file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<KeyboardLayout, LayoutError> {
        let file = std::fs::File::open(path).map_err(LayoutError::Io)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// all keys in row-major order
    pub fn keys(&self) -> impl Iterator<Item = (KeyRef, &Key)> {
        self.rows
            .iter()
            .flat_map(|r| r.keys.iter())
            .enumerate()
            .map(|(i, k)| (KeyRef(i), k))
    }

    /// The key behind `key`.
    pub fn key(&self, key: KeyRef) -> Option<&Key> {
        self.rows.iter().flat_map(|r| r.keys.iter()).nth(key.0)
    }

    /// the key under `point`, for a keyboard of `width` × `height` pixels
    pub fn key_at(&self, point: Point, width: f32, height: f32) -> Option<KeyRef> {
        self.keys()
            .find(|(_, k)| {
                let x = k.rect.x * width;
                let y = k.rect.y * height;
                point.x >= x
                    && point.x < x + k.rect.width * width
                    && point.y >= y
                    && point.y < y + k.rect.height * height
            })
            .map(|(r, _)| r)
    }

    /// letter keys resolved to pixels; all other key kinds are dropped
    pub fn letter_keys(&self, width: f32, height: f32) -> Vec<LetterKey> {
        self.keys()
            .filter_map(|(r, k)| {
                let letter = k.letter()?;
                let w = k.rect.width * width;
                let h = k.rect.height * height;

                Some(LetterKey {
                    key: r,
                    letter,
                    center: Point::new(k.rect.x * width + w / 2.0, k.rect.y * height + h / 2.0),
                    width: w,
                    height: h,
                })
            })
            .collect()
    }

    /// mean letter key width in pixels, 0 if there are no letter keys
    pub fn average_key_width(&self, width: f32) -> f32 {
        let widths: Vec<f32> = self
            .keys()
            .filter(|(_, k)| k.letter().is_some())
            .map(|(_, k)| k.rect.width * width)
            .collect();

        if widths.is_empty() {
            return 0.0;
        }

        widths.iter().sum::<f32>() / widths.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn qwerty_letters() {
        let layout = KeyboardLayout::qwerty();
        let letters: String = layout
            .letter_keys(1000.0, 400.0)
            .iter()
            .map(|k| k.letter)
            .collect();

        assert_eq!(letters, "qwertyuiopasdfghjklzxcvbnm");
        assert!((layout.average_key_width(1000.0) - 100.0).abs() < 1e-3);
    }

    #[test]
    fn non_letters_are_filtered() {
        let layout = KeyboardLayout::qwerty();
        let letter_refs: Vec<KeyRef> = layout.letter_keys(1.0, 1.0).iter().map(|k| k.key).collect();

        for (r, k) in layout.keys() {
            match k.kind {
                KeyKind::Char(c) if c.is_alphabetic() => assert!(letter_refs.contains(&r)),
                _ => assert!(!letter_refs.contains(&r)),
            }
        }
    }

    #[test]
    fn hit_test() {
        let layout = KeyboardLayout::qwerty();
        let q = layout.key_at(Point::new(10.0, 10.0), 1000.0, 400.0).unwrap();
        assert_eq!(layout.key(q).unwrap().kind, KeyKind::Char('q'));

        let shift = layout.key_at(Point::new(20.0, 250.0), 1000.0, 400.0).unwrap();
        assert_eq!(
            layout.key(shift).unwrap().kind,
            KeyKind::Modifier(Modifier::Shift)
        );

        assert!(layout.key_at(Point::new(-5.0, 10.0), 1000.0, 400.0).is_none());
    }

    #[test]
    fn centers() {
        let layout = KeyboardLayout::qwerty();
        let keys = layout.letter_keys(1000.0, 400.0);
        let a = keys.iter().find(|k| k.letter == 'a').unwrap();
        assert!((a.center.x - 100.0).abs() < 1e-3);
        assert!((a.center.y - 150.0).abs() < 1e-3);
    }

    #[test]
    fn json_roundtrip_and_empty() {
        let json = serde_json::to_string(&KeyboardLayout::qwerty()).unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", json).unwrap();
        assert_eq!(
            KeyboardLayout::from_path(file.path()).unwrap(),
            KeyboardLayout::qwerty()
        );

        let empty = r#"{ "rows": [ { "keys": [
            { "kind": { "type": "action", "value": "space" },
              "rect": { "x": 0.0, "y": 0.0, "width": 1.0, "height": 1.0 } }
        ] } ] }"#;
        assert!(matches!(
            KeyboardLayout::from_reader(empty.as_bytes()),
            Err(LayoutError::Empty)
        ));
    }
}
