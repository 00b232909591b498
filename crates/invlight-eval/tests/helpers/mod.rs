#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use invlight_eval::{
    GameStateProvider, HoveredItem, ItemKey, ItemRecord, Panel, Rarity, Rect, RuleDirectories,
    RuleSetEntry, RuleSetManager,
};
use parking_lot::Mutex;
use serde_json::Value;

pub fn item(json: Value) -> ItemRecord {
    ItemRecord::from_json(&json).unwrap()
}

pub fn rare(key: u64, level: i64) -> ItemRecord {
    ItemRecord::builder(ItemKey(key))
        .attr("Rarity", Rarity::Rare)
        .attr("ItemLevel", level)
        .build()
        .unwrap()
}

/// Item with a rectangle at grid cell `(col, row)` (one cell is 50px).
pub fn placed(key: u64, rarity: Rarity, col: u32, row: u32) -> ItemRecord {
    ItemRecord::builder(ItemKey(key))
        .attr("Rarity", rarity)
        .rect(Rect::new(col as f32 * 50.0, row as f32 * 50.0, 50.0, 50.0))
        .build()
        .unwrap()
}

pub fn write_rule(dir: &Path, name: &str, text: &str) {
    fs::write(dir.join(name), text).unwrap();
}

/// Manager over `dir` with the given files enabled, already reloaded.
pub fn manager_with(dir: &Path, enabled: &[&str]) -> Arc<RuleSetManager> {
    let entries = enabled
        .iter()
        .map(|n| RuleSetEntry::new(*n, *n, true))
        .collect();
    let mgr = RuleSetManager::new(RuleDirectories::new(dir), entries);
    mgr.reload().unwrap();
    Arc::new(mgr)
}

/// Scriptable game state. Counts `panel_items` calls per panel.
#[derive(Default)]
pub struct FakeGame {
    pub inventory_visible: Mutex<bool>,
    pub stash_visible: Mutex<bool>,
    pub inventory: Mutex<Vec<ItemRecord>>,
    pub stash: Mutex<Vec<ItemRecord>>,
    pub hovered: Mutex<Option<HoveredItem>>,
    pub inventory_reads: AtomicUsize,
    pub stash_reads: AtomicUsize,
}

impl FakeGame {
    pub fn with_inventory(items: Vec<ItemRecord>) -> Arc<FakeGame> {
        let game = FakeGame::default();
        *game.inventory_visible.lock() = true;
        *game.inventory.lock() = items;
        Arc::new(game)
    }

    pub fn show_stash(&self, items: Vec<ItemRecord>) {
        *self.stash_visible.lock() = true;
        *self.stash.lock() = items;
    }

    pub fn hover(&self, item: ItemRecord, tooltip: Option<Rect>) {
        *self.hovered.lock() = Some(HoveredItem { item, tooltip });
    }

    pub fn inventory_reads(&self) -> usize {
        self.inventory_reads.load(Ordering::SeqCst)
    }
}

impl GameStateProvider for FakeGame {
    fn panel_visible(&self, panel: Panel) -> bool {
        match panel {
            Panel::Inventory => *self.inventory_visible.lock(),
            Panel::Stash => *self.stash_visible.lock(),
        }
    }

    fn panel_items(&self, panel: Panel) -> Vec<ItemRecord> {
        match panel {
            Panel::Inventory => {
                self.inventory_reads.fetch_add(1, Ordering::SeqCst);
                self.inventory.lock().clone()
            }
            Panel::Stash => {
                self.stash_reads.fetch_add(1, Ordering::SeqCst);
                self.stash.lock().clone()
            }
        }
    }

    fn hovered_item(&self) -> Option<HoveredItem> {
        self.hovered.lock().clone()
    }
}
