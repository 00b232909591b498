//! JSON game-state fixtures for the `frame` command.
//!
//! A fixture stands in for the live game: panel visibility and contents, the
//! hovered item, and the current area.
//!
//! ```json
//! {
//!   "area": { "is_town": false, "is_hideout": true },
//!   "inventory": { "visible": true, "items": [ { "key": 1, "rect": {...}, "attributes": {...} } ] },
//!   "stash": { "visible": false, "items": [] },
//!   "hovered": { "item": { "key": 1, "attributes": {...} }, "tooltip": {...} },
//!   "filter_test": "Rarity == \"Rare\""
//! }
//! ```

use std::fs;
use std::path::Path;

use invlight_eval::{AreaInfo, GameStateProvider, HoveredItem, ItemRecord, Panel, Rect, Result};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPanel {
    visible: bool,
    items: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawHovered {
    item: Value,
    tooltip: Option<Rect>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawState {
    area: Option<AreaInfo>,
    inventory: RawPanel,
    stash: RawPanel,
    hovered: Option<RawHovered>,
    filter_test: Option<String>,
}

#[derive(Debug, Default)]
struct PanelState {
    visible: bool,
    items: Vec<ItemRecord>,
}

impl PanelState {
    fn from_raw(raw: RawPanel) -> Result<Self> {
        let items = raw
            .items
            .iter()
            .map(ItemRecord::from_json)
            .collect::<Result<Vec<_>>>()?;
        Ok(PanelState {
            visible: raw.visible,
            items,
        })
    }
}

/// A fixed game state loaded from JSON.
#[derive(Debug)]
pub struct FixtureState {
    pub area: Option<AreaInfo>,
    pub filter_test: Option<String>,
    inventory: PanelState,
    stash: PanelState,
    hovered: Option<HoveredItem>,
}

impl FixtureState {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let raw: RawState = serde_json::from_str(&text)?;
        let hovered = match raw.hovered {
            Some(h) => Some(HoveredItem {
                item: ItemRecord::from_json(&h.item)?,
                tooltip: h.tooltip,
            }),
            None => None,
        };
        Ok(FixtureState {
            area: raw.area,
            filter_test: raw.filter_test,
            inventory: PanelState::from_raw(raw.inventory)?,
            stash: PanelState::from_raw(raw.stash)?,
            hovered,
        })
    }

    fn panel(&self, panel: Panel) -> &PanelState {
        match panel {
            Panel::Inventory => &self.inventory,
            Panel::Stash => &self.stash,
        }
    }
}

impl GameStateProvider for FixtureState {
    fn panel_visible(&self, panel: Panel) -> bool {
        self.panel(panel).visible
    }

    fn panel_items(&self, panel: Panel) -> Vec<ItemRecord> {
        self.panel(panel).items.clone()
    }

    fn hovered_item(&self) -> Option<HoveredItem> {
        self.hovered.clone()
    }
}
