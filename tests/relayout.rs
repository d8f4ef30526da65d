//! Partial relayout tests — layout_range after edits.

use pretty_assertions::assert_eq;
use scorelayout::builder::ScoreBuilder;
use scorelayout::layout::System;
use scorelayout::*;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn quarters(n: usize) -> Score {
    ScoreBuilder::new()
        .part("Flute", 1)
        .part("Oboe", 1)
        .measures(n, |_, m| {
            m.notes(0, &[480, 480, 480, 480]);
            m.notes(4, &[960, 960]);
        })
        .build()
}

fn snapshot(systems: &[System]) -> Vec<(u32, Vec<usize>)> {
    systems.iter().map(|s| (s.id.0, s.measures.clone())).collect()
}

#[test]
fn unchanged_range_stops_early() {
    init_logger();
    let mut score = quarters(40);
    let mut ctx = layout_score(&mut score, LayoutOptions::default());
    let before = snapshot(ctx.systems());
    let widths: Vec<f64> = ctx.systems()[0].measures.iter().map(|&m| score.measures[m].width).collect();
    assert!(before.len() > 2);

    let (stick, etick) = (score.measures[1].tick, score.measures[2].tick);
    ctx.layout_range(&mut score, stick, etick);

    assert!(ctx.range_done(), "the first system ends where it did before");
    assert_eq!(snapshot(ctx.systems()), before);
    let after: Vec<f64> = ctx.systems()[0].measures.iter().map(|&m| score.measures[m].width).collect();
    assert_eq!(after, widths);
    println!("✓ relayout of measures 1..2 kept {} systems", before.len());
}

#[test]
fn range_after_last_system_changes_nothing() {
    init_logger();
    let mut score = quarters(20);
    let mut ctx = layout_score(&mut score, LayoutOptions::default());
    let before = snapshot(ctx.systems());

    let end = score.end_tick();
    ctx.layout_range(&mut score, end, end);
    assert_eq!(snapshot(ctx.systems()), before);
    assert_eq!(ctx.current_measure(), None);
}

#[test]
fn inserted_break_matches_full_layout() {
    init_logger();
    let mut score = quarters(40);
    let mut ctx = layout_score(&mut score, LayoutOptions::default());
    let ids: Vec<u32> = ctx.systems().iter().map(|s| s.id.0).collect();

    score.measures[3].breaks.line = true;
    let (stick, etick) = (score.measures[3].tick, score.measures[4].tick);
    ctx.layout_range(&mut score, stick, etick);
    let partial: Vec<Vec<usize>> = ctx.systems().iter().map(|s| s.measures.clone()).collect();
    assert_eq!(partial[0], vec![0, 1, 2, 3]);

    let mut fresh = score.clone();
    let full = layout_score(&mut fresh, LayoutOptions::default());
    let expected: Vec<Vec<usize>> = full.systems().iter().map(|s| s.measures.clone()).collect();
    assert_eq!(partial, expected);

    // old systems are recycled before new ones are made
    assert_eq!(ctx.systems()[0].id.0, ids[0]);
    for system in ctx.systems() {
        for &mi in &system.measures {
            assert_eq!(score.measures[mi].system, Some(system.id));
        }
    }
}

#[test]
fn system_ids_survive_full_relayout() {
    init_logger();
    let mut score = quarters(40);
    let mut ctx = layout_score(&mut score, LayoutOptions::default());
    let before = snapshot(ctx.systems());

    ctx.layout_all(&mut score);
    assert_eq!(snapshot(ctx.systems()), before);
    assert!(!ctx.range_done());
}

#[test]
fn removed_measures_shrink_the_layout() {
    init_logger();
    let mut score = quarters(40);
    let mut ctx = layout_score(&mut score, LayoutOptions::default());
    let count = ctx.systems().len();

    let mut shorter = quarters(10);
    ctx.layout_all(&mut shorter);
    assert!(ctx.systems().len() < count);
    let ids: Vec<u32> = ctx.systems().iter().map(|s| s.id.0).collect();
    let expected: Vec<u32> = (0..ids.len() as u32).collect();
    assert_eq!(ids, expected, "the first pooled systems are reused in order");
}

#[test]
fn relayout_after_measures_were_deleted() {
    init_logger();
    let mut score = quarters(40);
    let mut ctx = layout_score(&mut score, LayoutOptions::default());
    assert!(ctx.systems().len() > 2);
    let cut = ctx.systems()[1].measures[0] + 1;

    score.measures.truncate(cut);
    let end = score.end_tick();
    ctx.layout_range(&mut score, end, end);

    assert_eq!(ctx.systems().len(), 2);
    assert_eq!(ctx.systems()[1].measures, vec![cut - 1]);
    for system in ctx.systems() {
        assert!(system.measures.iter().all(|&mi| mi < cut));
        assert!(system.end_tick(&score) <= end);
    }

    ctx.layout_all(&mut score);
    let placed: Vec<usize> = ctx.systems().iter().flat_map(|s| s.measures.clone()).collect();
    let expected: Vec<usize> = (0..cut).collect();
    assert_eq!(placed, expected);
    println!("✓ relayout after deleting measures keeps {} systems", ctx.systems().len());
}
