//! Per-frame highlight selection.
//!
//! The host calls [`HighlightSelector::tick`] once per render frame. Each
//! visible panel's items come from a [`TimedCache`] over the
//! [`GameStateProvider`], are filtered through the rule set's active engine,
//! and are returned as [`DrawCommand`]s for the host's renderer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::cache::{ITEM_SNAPSHOT_TTL, TimedCache};
use crate::compiler::{CompiledPredicate, compile};
use crate::engine::Engine;
use crate::item::{ItemKey, ItemRecord, Rect};
use crate::ruleset::RuleSetManager;
use crate::settings::{Color, DIMMED_ALPHA, Settings};

// =============================================================================
// Host-facing types
// =============================================================================

/// Item panels the overlay draws on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Panel {
    Inventory,
    Stash,
}

/// The item under the cursor and the screen area of its tooltip.
#[derive(Debug, Clone)]
pub struct HoveredItem {
    pub item: ItemRecord,
    pub tooltip: Option<Rect>,
}

/// Source of live game state, implemented by the host.
///
/// Returned records are snapshots; the selector may keep them for up to
/// one snapshot TTL.
pub trait GameStateProvider: Send + Sync {
    fn panel_visible(&self, panel: Panel) -> bool;

    /// Items currently shown in `panel`, with screen rectangles attached.
    fn panel_items(&self, panel: Panel) -> Vec<ItemRecord>;

    fn hovered_item(&self) -> Option<HoveredItem>;
}

/// Area flags reported on an area change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct AreaInfo {
    #[serde(default)]
    pub is_town: bool,
    #[serde(default)]
    pub is_hideout: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightStyle {
    Normal,
    /// Drawn under the hovered item's tooltip.
    Dimmed,
}

/// One frame rectangle for the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawCommand {
    pub panel: Panel,
    pub item: ItemKey,
    pub rect: Rect,
    pub color: Color,
    pub thickness: u32,
    pub style: HighlightStyle,
}

/// Result of the ad-hoc test expression against the hovered item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterTestOutcome {
    Matched(bool),
    Error(String),
}

/// Output of one [`HighlightSelector::tick`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Frame {
    pub commands: Vec<DrawCommand>,
    pub filter_test: Option<FilterTestOutcome>,
}

/// Render-time options, usually derived from
/// [`Settings::highlight_options`](crate::Settings::highlight_options).
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightOptions {
    pub enabled: bool,
    pub frame_color: Color,
    pub frame_thickness: u32,
    pub run_outside_town: bool,
    pub enable_for_stash: bool,
    pub filter_test: Option<String>,
}

/// Same as the options of [`Settings::default`](crate::Settings), so the
/// overlay starts switched off.
impl Default for HighlightOptions {
    fn default() -> Self {
        Settings::default().highlight_options()
    }
}

// =============================================================================
// Selector
// =============================================================================

/// Compiled test expression plus the last outcome that was logged.
struct FilterTestState {
    text: String,
    compiled: std::result::Result<CompiledPredicate, String>,
    last_logged: Option<(ItemKey, FilterTestOutcome)>,
}

/// Frame orchestrator.
///
/// Safe to share between a render thread calling `tick` and a UI thread
/// changing options, reporting area changes, or reloading the rule set.
pub struct HighlightSelector {
    provider: Arc<dyn GameStateProvider>,
    rules: Arc<RuleSetManager>,
    inventory: TimedCache<Vec<ItemRecord>>,
    stash: TimedCache<Vec<ItemRecord>>,
    options: ArcSwap<HighlightOptions>,
    in_safe_area: AtomicBool,
    filter_test: Mutex<Option<FilterTestState>>,
}

impl HighlightSelector {
    pub fn new(
        provider: Arc<dyn GameStateProvider>,
        rules: Arc<RuleSetManager>,
        options: HighlightOptions,
    ) -> Self {
        Self::with_snapshot_ttl(provider, rules, options, ITEM_SNAPSHOT_TTL)
    }

    pub fn with_snapshot_ttl(
        provider: Arc<dyn GameStateProvider>,
        rules: Arc<RuleSetManager>,
        options: HighlightOptions,
        ttl: Duration,
    ) -> Self {
        HighlightSelector {
            inventory: panel_cache(&provider, Panel::Inventory, ttl),
            stash: panel_cache(&provider, Panel::Stash, ttl),
            provider,
            rules,
            options: ArcSwap::from_pointee(options),
            // Until the first area change, assume a town.
            in_safe_area: AtomicBool::new(true),
            filter_test: Mutex::new(None),
        }
    }

    pub fn set_options(&self, options: HighlightOptions) {
        self.options.store(Arc::new(options));
    }

    pub fn options(&self) -> Arc<HighlightOptions> {
        self.options.load_full()
    }

    /// Record whether the new area is a town or hideout.
    pub fn on_area_change(&self, area: AreaInfo) {
        let safe = area.is_town || area.is_hideout;
        log::debug!("area change, safe area: {safe}");
        self.in_safe_area.store(safe, Ordering::Relaxed);
    }

    pub fn in_safe_area(&self) -> bool {
        self.in_safe_area.load(Ordering::Relaxed)
    }

    /// Compute this frame's draw commands and test expression result.
    pub fn tick(&self, now: Instant) -> Frame {
        let opts = self.options.load_full();
        if !opts.enabled {
            return Frame::default();
        }

        let hovered = self.provider.hovered_item();
        let engine = self.rules.active();
        let mut commands = Vec::new();

        if self.in_safe_area() || opts.run_outside_town {
            if self.provider.panel_visible(Panel::Inventory) {
                let items = self.inventory.get(now);
                emit(Panel::Inventory, &items, &engine, hovered.as_ref(), &opts, &mut commands);
            }
            if opts.enable_for_stash && self.provider.panel_visible(Panel::Stash) {
                let items = self.stash.get(now);
                emit(Panel::Stash, &items, &engine, hovered.as_ref(), &opts, &mut commands);
            }
        }

        let filter_test = match (opts.filter_test.as_deref(), hovered.as_ref()) {
            (Some(text), Some(h)) => Some(self.run_filter_test(text, &h.item)),
            _ => None,
        };

        Frame {
            commands,
            filter_test,
        }
    }

    fn run_filter_test(&self, text: &str, item: &ItemRecord) -> FilterTestOutcome {
        let mut guard = self.filter_test.lock();
        if guard.as_ref().is_none_or(|s| s.text != text) {
            *guard = Some(FilterTestState {
                text: text.to_string(),
                compiled: compile(text).map_err(|e| e.to_string()),
                last_logged: None,
            });
        }
        let Some(state) = guard.as_mut() else {
            return FilterTestOutcome::Error("filter test unavailable".into());
        };

        let outcome = match &state.compiled {
            Ok(pred) => FilterTestOutcome::Matched(pred.matches(item)),
            Err(msg) => FilterTestOutcome::Error(msg.clone()),
        };

        let logged = (item.key(), outcome.clone());
        if state.last_logged.as_ref() != Some(&logged) {
            match &outcome {
                FilterTestOutcome::Matched(m) => log::info!("[Filter Test] Hovered Item: {m}"),
                FilterTestOutcome::Error(e) => log::warn!("[Filter Test] {e}"),
            }
            state.last_logged = Some(logged);
        }
        outcome
    }
}

fn panel_cache(
    provider: &Arc<dyn GameStateProvider>,
    panel: Panel,
    ttl: Duration,
) -> TimedCache<Vec<ItemRecord>> {
    let provider = Arc::clone(provider);
    TimedCache::new(ttl, move || provider.panel_items(panel))
}

fn emit(
    panel: Panel,
    items: &[ItemRecord],
    engine: &Engine,
    hovered: Option<&HoveredItem>,
    opts: &HighlightOptions,
    out: &mut Vec<DrawCommand>,
) {
    for item in items {
        let Some(rect) = item.rect() else { continue };
        if !engine.matches_any(item) {
            continue;
        }
        let under_tooltip = hovered.is_some_and(|h| {
            h.item.key() != item.key() && h.tooltip.is_some_and(|t| t.intersects(&rect))
        });
        let (style, color) = if under_tooltip {
            (HighlightStyle::Dimmed, opts.frame_color.with_alpha(DIMMED_ALPHA))
        } else {
            (HighlightStyle::Normal, opts.frame_color)
        };
        out.push(DrawCommand {
            panel,
            item: item.key(),
            rect,
            color,
            thickness: opts.frame_thickness,
            style,
        });
    }
}
