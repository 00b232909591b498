//! Declared attribute registry.
//!
//! Every attribute a rule may reference is listed here with its kind. Rule
//! text is resolved against this table at compile time, so evaluation never
//! meets an unknown name or a value of the wrong type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Value kind of an item attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrKind {
    String,
    Integer,
    Float,
    Boolean,
    Rarity,
    StringList,
}

impl AttrKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, AttrKind::Integer | AttrKind::Float)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AttrKind::String => "string",
            AttrKind::Integer => "integer",
            AttrKind::Float => "float",
            AttrKind::Boolean => "boolean",
            AttrKind::Rarity => "rarity",
            AttrKind::StringList => "string_list",
        }
    }
}

impl fmt::Display for AttrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttrKind::String => "a string",
            AttrKind::Integer => "an integer",
            AttrKind::Float => "a float",
            AttrKind::Boolean => "a boolean",
            AttrKind::Rarity => "a rarity",
            AttrKind::StringList => "a string list",
        };
        f.write_str(s)
    }
}

/// Item rarity, ordered from most common to rarest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rarity {
    Normal,
    Magic,
    Rare,
    Unique,
}

impl Rarity {
    pub const ALL: [Rarity; 4] = [Rarity::Normal, Rarity::Magic, Rarity::Rare, Rarity::Unique];

    pub fn as_str(self) -> &'static str {
        match self {
            Rarity::Normal => "Normal",
            Rarity::Magic => "Magic",
            Rarity::Rare => "Rare",
            Rarity::Unique => "Unique",
        }
    }
}

impl FromStr for Rarity {
    type Err = ();

    /// Case-insensitive: `"rare"`, `"Rare"` and `"RARE"` all parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rarity::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in the attribute registry.
#[derive(Debug, Serialize)]
pub struct AttributeDef {
    pub name: &'static str,
    pub kind: AttrKind,
    pub description: &'static str,
}

const fn def(name: &'static str, kind: AttrKind, description: &'static str) -> AttributeDef {
    AttributeDef {
        name,
        kind,
        description,
    }
}

/// All attributes rules may reference.
pub const ATTRIBUTES: &[AttributeDef] = &[
    def("Path", AttrKind::String, "Metadata path of the base item"),
    def("ClassName", AttrKind::String, "Item class, e.g. \"Ring\" or \"Body Armour\""),
    def("BaseName", AttrKind::String, "Base type name"),
    def("Name", AttrKind::String, "Display name"),
    def("UniqueName", AttrKind::String, "Unique item name, empty for non-uniques"),
    def("Rarity", AttrKind::Rarity, "Normal, Magic, Rare or Unique"),
    def("ItemLevel", AttrKind::Integer, "Item level"),
    def("Quality", AttrKind::Integer, "Quality percentage"),
    def("Width", AttrKind::Integer, "Inventory width in cells"),
    def("Height", AttrKind::Integer, "Inventory height in cells"),
    def("StackSize", AttrKind::Integer, "Current stack size"),
    def("Sockets", AttrKind::Integer, "Number of sockets"),
    def("LinkedSockets", AttrKind::Integer, "Size of the largest link group"),
    def("PrefixCount", AttrKind::Integer, "Number of explicit prefixes"),
    def("SuffixCount", AttrKind::Integer, "Number of explicit suffixes"),
    def("Armour", AttrKind::Integer, "Armour rating"),
    def("Evasion", AttrKind::Integer, "Evasion rating"),
    def("EnergyShield", AttrKind::Integer, "Energy shield"),
    def("MapTier", AttrKind::Integer, "Map tier"),
    def("GemLevel", AttrKind::Integer, "Skill gem level"),
    def("Dps", AttrKind::Float, "Weapon damage per second"),
    def("IsIdentified", AttrKind::Boolean, "Item is identified"),
    def("IsCorrupted", AttrKind::Boolean, "Item is corrupted"),
    def("IsMirrored", AttrKind::Boolean, "Item is mirrored"),
    def("ModNames", AttrKind::StringList, "Internal names of the item's explicit mods"),
];

/// Number of registered attributes.
pub const ATTRIBUTE_COUNT: usize = ATTRIBUTES.len();

/// A resolved reference to a registered attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Attribute(u16);

impl Attribute {
    /// Resolve an attribute by its exact (case-sensitive) name.
    pub fn lookup(name: &str) -> Option<Attribute> {
        ATTRIBUTES
            .iter()
            .position(|d| d.name == name)
            .map(|i| Attribute(i as u16))
    }

    /// Registered name differing from `name` only in ASCII case, if any.
    pub fn suggest(name: &str) -> Option<&'static str> {
        ATTRIBUTES
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
            .map(|d| d.name)
    }

    pub fn all() -> impl Iterator<Item = Attribute> {
        (0..ATTRIBUTE_COUNT).map(|i| Attribute(i as u16))
    }

    pub fn def(self) -> &'static AttributeDef {
        &ATTRIBUTES[self.index()]
    }

    pub fn name(self) -> &'static str {
        self.def().name
    }

    pub fn kind(self) -> AttrKind {
        self.def().kind
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
