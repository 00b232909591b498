//! Item records: immutable snapshots of one item's queryable attributes.
//!
//! Values are stored in a slot per registered [`Attribute`], so attribute
//! lookup during evaluation is an index, not a string comparison. Every value
//! is checked against the attribute's kind when the record is built.

use std::collections::BTreeMap;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::error::{EvalError, Result};
use crate::schema::{ATTRIBUTE_COUNT, AttrKind, Attribute, Rarity};

/// Stable identity of an item across frames (the game-side address/handle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemKey(pub u64);

/// Screen-space rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// True when the interiors overlap. Rectangles that only share an edge
    /// do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        other.x < self.right()
            && self.x < other.right()
            && other.y < self.bottom()
            && self.y < other.bottom()
    }
}

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Rarity(Rarity),
    List(Vec<String>),
}

impl AttrValue {
    fn type_name(&self) -> &'static str {
        match self {
            AttrValue::Str(_) => "string",
            AttrValue::Int(_) => "integer",
            AttrValue::Float(_) => "float",
            AttrValue::Bool(_) => "boolean",
            AttrValue::Rarity(_) => "rarity",
            AttrValue::List(_) => "string list",
        }
    }

    /// Coerce into the representation `kind` stores, if compatible.
    ///
    /// Integers widen to floats, and strings naming a rarity become rarities.
    fn coerce(self, kind: AttrKind) -> Option<AttrValue> {
        match (kind, self) {
            (AttrKind::String, v @ AttrValue::Str(_)) => Some(v),
            (AttrKind::Integer, v @ AttrValue::Int(_)) => Some(v),
            (AttrKind::Float, v @ AttrValue::Float(_)) => Some(v),
            (AttrKind::Float, AttrValue::Int(n)) => Some(AttrValue::Float(n as f64)),
            (AttrKind::Boolean, v @ AttrValue::Bool(_)) => Some(v),
            (AttrKind::Rarity, v @ AttrValue::Rarity(_)) => Some(v),
            (AttrKind::Rarity, AttrValue::Str(s)) => s.parse().ok().map(AttrValue::Rarity),
            (AttrKind::StringList, v @ AttrValue::List(_)) => Some(v),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Str(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Str(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<i32> for AttrValue {
    fn from(v: i32) -> Self {
        AttrValue::Int(v.into())
    }
}

impl From<u32> for AttrValue {
    fn from(v: u32) -> Self {
        AttrValue::Int(v.into())
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bool(v)
    }
}

impl From<Rarity> for AttrValue {
    fn from(v: Rarity) -> Self {
        AttrValue::Rarity(v)
    }
}

impl From<Vec<String>> for AttrValue {
    fn from(v: Vec<String>) -> Self {
        AttrValue::List(v)
    }
}

impl From<Vec<&str>> for AttrValue {
    fn from(v: Vec<&str>) -> Self {
        AttrValue::List(v.into_iter().map(str::to_string).collect())
    }
}

/// An immutable snapshot of one item.
///
/// Cloning a record copies the snapshot; nothing links it back to the live
/// game object it was captured from.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRecord {
    key: ItemKey,
    values: Box<[Option<AttrValue>]>,
    rect: Option<Rect>,
}

impl ItemRecord {
    pub fn builder(key: ItemKey) -> ItemRecordBuilder {
        ItemRecordBuilder {
            key,
            values: vec![None; ATTRIBUTE_COUNT],
            rect: None,
            error: None,
        }
    }

    pub fn key(&self) -> ItemKey {
        self.key
    }

    /// Screen rectangle attached by the caller, if any.
    pub fn rect(&self) -> Option<Rect> {
        self.rect
    }

    /// Return a copy of this record with the given screen rectangle.
    pub fn with_rect(mut self, rect: Rect) -> Self {
        self.rect = Some(rect);
        self
    }

    /// Value of `attr`, or `None` when the item does not carry it.
    pub fn get(&self, attr: Attribute) -> Option<&AttrValue> {
        self.values.get(attr.index()).and_then(Option::as_ref)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&AttrValue> {
        Attribute::lookup(name).and_then(|a| self.get(a))
    }

    /// Iterate over the attributes this item carries, in registry order.
    pub fn attributes(&self) -> impl Iterator<Item = (Attribute, &AttrValue)> {
        Attribute::all().filter_map(|a| self.get(a).map(|v| (a, v)))
    }

    /// Build a record from JSON of the form
    /// `{"key": 1, "rect": {...}, "attributes": {"Rarity": "Rare", ...}}`.
    ///
    /// `rect` and `attributes` are optional; `null` attribute values are
    /// treated as absent.
    pub fn from_json(value: &Value) -> Result<ItemRecord> {
        let obj = value
            .as_object()
            .ok_or_else(|| EvalError::InvalidItem("item must be a JSON object".into()))?;

        let key = obj
            .get("key")
            .and_then(Value::as_u64)
            .ok_or_else(|| EvalError::InvalidItem("missing or non-integer 'key'".into()))?;
        let mut builder = ItemRecord::builder(ItemKey(key));

        if let Some(rect) = obj.get("rect")
            && !rect.is_null()
        {
            let rect: Rect = serde_json::from_value(rect.clone())
                .map_err(|e| EvalError::InvalidItem(format!("invalid 'rect': {e}")))?;
            builder = builder.rect(rect);
        }

        if let Some(attrs) = obj.get("attributes") {
            let attrs = attrs.as_object().ok_or_else(|| {
                EvalError::InvalidItem("'attributes' must be a JSON object".into())
            })?;
            for (name, v) in attrs {
                let attr = Attribute::lookup(name)
                    .ok_or_else(|| EvalError::InvalidItem(format!("unknown attribute '{name}'")))?;
                if let Some(value) = json_to_value(attr, v)? {
                    builder = builder.set(attr, value);
                }
            }
        }

        builder.build()
    }
}

impl Serialize for ItemRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let attributes: BTreeMap<&str, &AttrValue> =
            self.attributes().map(|(a, v)| (a.name(), v)).collect();
        let mut st = serializer.serialize_struct("ItemRecord", 3)?;
        st.serialize_field("key", &self.key)?;
        st.serialize_field("rect", &self.rect)?;
        st.serialize_field("attributes", &attributes)?;
        st.end()
    }
}

fn json_to_value(attr: Attribute, v: &Value) -> Result<Option<AttrValue>> {
    if v.is_null() {
        return Ok(None);
    }
    let converted = match attr.kind() {
        AttrKind::String => v.as_str().map(AttrValue::from),
        AttrKind::Integer => v.as_i64().map(AttrValue::Int),
        AttrKind::Float => v.as_f64().map(AttrValue::Float),
        AttrKind::Boolean => v.as_bool().map(AttrValue::Bool),
        AttrKind::Rarity => v
            .as_str()
            .and_then(|s| s.parse::<Rarity>().ok())
            .map(AttrValue::Rarity),
        AttrKind::StringList => v.as_array().and_then(|arr| {
            arr.iter()
                .map(|e| e.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .map(AttrValue::List)
        }),
    };
    converted.map(Some).ok_or_else(|| {
        EvalError::InvalidItem(format!(
            "attribute '{}' expects {} value, got {v}",
            attr.name(),
            attr.kind()
        ))
    })
}

/// Builder for [`ItemRecord`]. The first invalid value is reported by
/// [`build`](ItemRecordBuilder::build).
#[derive(Debug)]
pub struct ItemRecordBuilder {
    key: ItemKey,
    values: Vec<Option<AttrValue>>,
    rect: Option<Rect>,
    error: Option<EvalError>,
}

impl ItemRecordBuilder {
    /// Set an attribute by name.
    pub fn attr(self, name: &str, value: impl Into<AttrValue>) -> Self {
        match Attribute::lookup(name) {
            Some(attr) => self.set(attr, value),
            None => self.fail(format!("unknown attribute '{name}'")),
        }
    }

    /// Set a resolved attribute.
    pub fn set(mut self, attr: Attribute, value: impl Into<AttrValue>) -> Self {
        let value = value.into();
        let found = value.type_name();
        match value.coerce(attr.kind()) {
            Some(v) => {
                self.values[attr.index()] = Some(v);
                self
            }
            None => self.fail(format!(
                "attribute '{}' expects {} value, got {found}",
                attr.name(),
                attr.kind()
            )),
        }
    }

    pub fn rect(mut self, rect: Rect) -> Self {
        self.rect = Some(rect);
        self
    }

    pub fn build(self) -> Result<ItemRecord> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(ItemRecord {
            key: self.key,
            values: self.values.into_boxed_slice(),
            rect: self.rect,
        })
    }

    fn fail(mut self, message: String) -> Self {
        if self.error.is_none() {
            self.error = Some(EvalError::InvalidItem(message));
        }
        self
    }
}
