mod helpers;

use std::sync::Arc;
use std::time::{Duration, Instant};

use helpers::{FakeGame, manager_with, placed, write_rule};
use invlight_eval::{
    AreaInfo, Color, FilterTestOutcome, HighlightOptions, HighlightSelector, HighlightStyle,
    ItemKey, Panel, Rarity, Rect, RuleSetManager, Settings,
};
use tempfile::TempDir;

fn rare_and_unique_rules(tmp: &TempDir) -> Arc<RuleSetManager> {
    write_rule(tmp.path(), "rare.ifl", r#"Rarity == "Rare""#);
    write_rule(tmp.path(), "unique.ifl", r#"Rarity == "Unique""#);
    manager_with(tmp.path(), &["rare.ifl", "unique.ifl"])
}

fn selector(
    game: &Arc<FakeGame>,
    rules: Arc<RuleSetManager>,
    opts: HighlightOptions,
) -> HighlightSelector {
    HighlightSelector::new(game.clone(), rules, opts)
}

/// Default options with the overlay switched on.
fn on() -> HighlightOptions {
    HighlightOptions {
        enabled: true,
        ..HighlightOptions::default()
    }
}

fn keys(frame: &invlight_eval::Frame) -> Vec<u64> {
    frame.commands.iter().map(|c| c.item.0).collect()
}

#[test]
fn highlights_items_matching_any_rule() {
    let tmp = TempDir::new().unwrap();
    let game = FakeGame::with_inventory(vec![
        placed(1, Rarity::Rare, 0, 0),
        placed(2, Rarity::Magic, 1, 0),
        placed(3, Rarity::Unique, 2, 0),
    ]);
    let sel = selector(&game, rare_and_unique_rules(&tmp), on());

    let frame = sel.tick(Instant::now());
    assert_eq!(keys(&frame), vec![1, 3]);
    let cmd = &frame.commands[0];
    assert_eq!(cmd.panel, Panel::Inventory);
    assert_eq!(cmd.color, Color::RED);
    assert_eq!(cmd.thickness, 1);
    assert_eq!(cmd.style, HighlightStyle::Normal);
    assert_eq!(cmd.rect, Rect::new(0.0, 0.0, 50.0, 50.0));
}

#[test]
fn snapshot_reused_within_ttl() {
    let tmp = TempDir::new().unwrap();
    let game = FakeGame::with_inventory(vec![placed(1, Rarity::Rare, 0, 0)]);
    let sel = selector(&game, rare_and_unique_rules(&tmp), on());

    let t0 = Instant::now();
    sel.tick(t0);
    sel.tick(t0 + Duration::from_millis(100));
    assert_eq!(game.inventory_reads(), 1);

    // Items changed in game but the snapshot is still fresh
    game.inventory.lock().push(placed(2, Rarity::Rare, 1, 0));
    assert_eq!(keys(&sel.tick(t0 + Duration::from_millis(150))), vec![1]);

    assert_eq!(keys(&sel.tick(t0 + Duration::from_millis(250))), vec![1, 2]);
    assert_eq!(game.inventory_reads(), 2);
}

#[test]
fn hidden_panel_is_not_read() {
    let tmp = TempDir::new().unwrap();
    let game = FakeGame::with_inventory(vec![placed(1, Rarity::Rare, 0, 0)]);
    *game.inventory_visible.lock() = false;
    let sel = selector(&game, rare_and_unique_rules(&tmp), on());

    assert!(sel.tick(Instant::now()).commands.is_empty());
    assert_eq!(game.inventory_reads(), 0);
}

#[test]
fn outside_town_respects_run_outside_town() {
    let tmp = TempDir::new().unwrap();
    let game = FakeGame::with_inventory(vec![placed(1, Rarity::Rare, 0, 0)]);
    let opts = HighlightOptions {
        run_outside_town: false,
        ..on()
    };
    let sel = selector(&game, rare_and_unique_rules(&tmp), opts);
    let now = Instant::now();

    // Starts assuming a town
    assert!(sel.in_safe_area());
    assert_eq!(keys(&sel.tick(now)), vec![1]);

    sel.on_area_change(AreaInfo::default());
    assert!(sel.tick(now).commands.is_empty());

    sel.on_area_change(AreaInfo {
        is_town: false,
        is_hideout: true,
    });
    assert_eq!(keys(&sel.tick(now)), vec![1]);

    sel.on_area_change(AreaInfo::default());
    sel.set_options(on());
    assert_eq!(keys(&sel.tick(now)), vec![1]);
}

#[test]
fn stash_requires_option_and_visibility() {
    let tmp = TempDir::new().unwrap();
    let game = FakeGame::with_inventory(Vec::new());
    game.show_stash(vec![placed(10, Rarity::Unique, 0, 0)]);
    let sel = selector(&game, rare_and_unique_rules(&tmp), on());
    let now = Instant::now();

    let frame = sel.tick(now);
    assert_eq!(keys(&frame), vec![10]);
    assert_eq!(frame.commands[0].panel, Panel::Stash);

    sel.set_options(HighlightOptions {
        enable_for_stash: false,
        ..on()
    });
    assert!(sel.tick(now).commands.is_empty());
}

#[test]
fn item_under_tooltip_is_dimmed() {
    let tmp = TempDir::new().unwrap();
    let hovered = placed(1, Rarity::Rare, 0, 0);
    let game = FakeGame::with_inventory(vec![
        hovered.clone(),
        placed(2, Rarity::Rare, 1, 0),
        placed(3, Rarity::Rare, 5, 5),
    ]);
    // Tooltip covers cells (0,0) and (1,0)
    game.hover(hovered, Some(Rect::new(0.0, 0.0, 120.0, 40.0)));
    let sel = selector(&game, rare_and_unique_rules(&tmp), on());

    let frame = sel.tick(Instant::now());
    let styles: Vec<(u64, HighlightStyle)> =
        frame.commands.iter().map(|c| (c.item.0, c.style)).collect();
    assert_eq!(
        styles,
        vec![
            // the hovered item itself keeps the normal style
            (1, HighlightStyle::Normal),
            (2, HighlightStyle::Dimmed),
            (3, HighlightStyle::Normal),
        ]
    );
    assert_eq!(frame.commands[1].color, Color::RED.with_alpha(45));
}

#[test]
fn items_without_rect_are_skipped() {
    let tmp = TempDir::new().unwrap();
    let no_rect = invlight_eval::ItemRecord::builder(ItemKey(4))
        .attr("Rarity", Rarity::Rare)
        .build()
        .unwrap();
    let game = FakeGame::with_inventory(vec![no_rect, placed(5, Rarity::Rare, 0, 0)]);
    let sel = selector(&game, rare_and_unique_rules(&tmp), on());
    assert_eq!(keys(&sel.tick(Instant::now())), vec![5]);
}

#[test]
fn filter_test_reports_match_and_errors() {
    let tmp = TempDir::new().unwrap();
    let game = FakeGame::with_inventory(Vec::new());
    *game.inventory_visible.lock() = false;
    let sel = selector(
        &game,
        rare_and_unique_rules(&tmp),
        HighlightOptions {
            filter_test: Some(r#"Rarity >= "Rare""#.into()),
            ..on()
        },
    );
    let now = Instant::now();

    // Nothing hovered: no test result
    assert_eq!(sel.tick(now).filter_test, None);

    game.hover(placed(1, Rarity::Unique, 0, 0), None);
    assert_eq!(sel.tick(now).filter_test, Some(FilterTestOutcome::Matched(true)));

    game.hover(placed(2, Rarity::Normal, 0, 0), None);
    assert_eq!(sel.tick(now).filter_test, Some(FilterTestOutcome::Matched(false)));

    sel.set_options(HighlightOptions {
        filter_test: Some("Rarity >".into()),
        ..on()
    });
    let frame = sel.tick(now);
    assert!(matches!(frame.filter_test, Some(FilterTestOutcome::Error(_))));
}

#[test]
fn disabled_overlay_draws_nothing() {
    let tmp = TempDir::new().unwrap();
    let game = FakeGame::with_inventory(vec![placed(1, Rarity::Rare, 0, 0)]);
    let sel = selector(
        &game,
        rare_and_unique_rules(&tmp),
        HighlightOptions {
            enabled: false,
            ..on()
        },
    );
    assert_eq!(sel.tick(Instant::now()), invlight_eval::Frame::default());
    assert_eq!(game.inventory_reads(), 0);
}

#[test]
fn reload_takes_effect_on_next_frame() {
    let tmp = TempDir::new().unwrap();
    write_rule(tmp.path(), "rare.ifl", r#"Rarity == "Rare""#);
    let rules = manager_with(tmp.path(), &["rare.ifl"]);
    let game = FakeGame::with_inventory(vec![placed(1, Rarity::Rare, 0, 0)]);
    let sel = selector(&game, Arc::clone(&rules), on());
    let now = Instant::now();
    assert_eq!(keys(&sel.tick(now)), vec![1]);

    write_rule(tmp.path(), "rare.ifl", r#"Rarity == "Unique""#);
    rules.reload().unwrap();
    assert!(sel.tick(now).commands.is_empty());
}

#[test]
fn default_options_match_default_settings() {
    let opts = HighlightOptions::default();
    assert_eq!(opts, Settings::default().highlight_options());
    assert!(!opts.enabled);

    let tmp = TempDir::new().unwrap();
    let game = FakeGame::with_inventory(vec![placed(1, Rarity::Rare, 0, 0)]);
    let sel = selector(&game, rare_and_unique_rules(&tmp), opts);
    assert!(sel.tick(Instant::now()).commands.is_empty());
}
