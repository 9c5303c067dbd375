//! Merge validation
//!
//! Random layer stacks are merged and compared position by position against a brute-force
//! evaluation: at every offset, each attribute must come from the highest layer covering it.

use editor_highlights::{
    AttributeKey, AttributeSet, AttributeValue, Color, DirectMergeContainer, Highlight,
    HighlightLayer, HighlightsChange, HighlightsSequence, MergeConfig, OffsetsBag, VecSequence,
    collect_highlights,
};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};

const KEYS: [AttributeKey; 4] = [
    AttributeKey::Foreground,
    AttributeKey::Background,
    AttributeKey::Bold,
    AttributeKey::Italic,
];

struct StaticLayer {
    highlights: Vec<Highlight>,
}

impl HighlightLayer for StaticLayer {
    fn highlights(&self, start: usize, end: usize) -> Box<dyn HighlightsSequence + '_> {
        Box::new(VecSequence::clipped(self.highlights.clone(), start, end))
    }
}

fn random_attributes(rng: &mut StdRng) -> AttributeSet {
    let palette = [Color::RED, Color::GREEN, Color::BLUE, Color::YELLOW];
    let mut attrs = AttributeSet::empty();
    while attrs.is_empty() {
        if rng.gen_bool(0.5) {
            attrs = attrs.with(AttributeKey::Foreground, palette[rng.gen_range(0..4)]);
        }
        if rng.gen_bool(0.4) {
            attrs = attrs.with(AttributeKey::Background, palette[rng.gen_range(0..4)]);
        }
        if rng.gen_bool(0.3) {
            attrs = attrs.with(AttributeKey::Bold, rng.gen_bool(0.5));
        }
        if rng.gen_bool(0.3) {
            attrs = attrs.with(AttributeKey::Italic, true);
        }
    }
    attrs
}

fn random_layer(rng: &mut StdRng, len: usize) -> Vec<Highlight> {
    let mut highlights = Vec::new();
    let mut pos = rng.gen_range(0..10);
    while pos < len {
        let end = (pos + rng.gen_range(1..12)).min(len);
        highlights.push(Highlight::new(pos, end, random_attributes(rng)));
        pos = end + rng.gen_range(0..8);
    }
    highlights
}

fn expected_at(
    layers: &[Vec<Highlight>],
    offset: usize,
    key: &AttributeKey,
) -> Option<AttributeValue> {
    layers.iter().rev().find_map(|layer| {
        layer
            .iter()
            .find(|h| h.start.offset <= offset && offset < h.end.offset)
            .and_then(|h| h.attributes.as_ref())
            .and_then(|attrs| attrs.get(key).cloned())
    })
}

fn container_for(layers: &[Vec<Highlight>]) -> DirectMergeContainer {
    let layers = layers
        .iter()
        .map(|highlights| {
            Arc::new(StaticLayer {
                highlights: highlights.clone(),
            }) as Arc<dyn HighlightLayer>
        })
        .collect();
    DirectMergeContainer::new(layers)
}

fn check_window(
    layers: &[Vec<Highlight>],
    container: &DirectMergeContainer,
    start: usize,
    end: usize,
) {
    let merged = collect_highlights(&mut container.covering_highlights(start, end));

    let mut pos = start;
    for h in &merged {
        assert_eq!(h.start.offset, pos, "covering merge must be contiguous");
        assert!(h.end.offset > h.start.offset);
        for offset in h.start.offset..h.end.offset {
            for key in &KEYS {
                let actual = h.attributes.as_ref().and_then(|a| a.get(key).cloned());
                assert_eq!(
                    actual,
                    expected_at(layers, offset, key),
                    "key {key:?} at offset {offset}"
                );
            }
        }
        pos = h.end.offset;
    }
    assert_eq!(pos, end.max(start));

    let plain = collect_highlights(&mut container.highlights(start, end));
    let covered: Vec<_> = merged.into_iter().filter(|h| h.attributes.is_some()).collect();
    assert_eq!(plain, covered);
}

#[test]
fn test_random_stacks_match_brute_force() {
    let mut rng = StdRng::seed_from_u64(2024);
    for round in 0..40 {
        let len = 120;
        let layer_count = 1 + round % 5;
        let layers: Vec<_> = (0..layer_count).map(|_| random_layer(&mut rng, len)).collect();
        let container = container_for(&layers);

        check_window(&layers, &container, 0, len);
        let a = rng.gen_range(0..len);
        let b = rng.gen_range(a..=len);
        check_window(&layers, &container, a, b);
    }
}

#[test]
fn test_repeated_queries_are_identical() {
    let mut rng = StdRng::seed_from_u64(77);
    let layers: Vec<_> = (0..4).map(|_| random_layer(&mut rng, 200)).collect();
    let container = container_for(&layers);

    let first = collect_highlights(&mut container.covering_highlights(10, 190));
    let second = collect_highlights(&mut container.covering_highlights(10, 190));
    assert_eq!(first, second);
}

#[test]
fn test_higher_layer_wins_collisions() {
    let layers = vec![
        vec![Highlight::new(0, 10, AttributeSet::single(AttributeKey::Foreground, Color::RED))],
        vec![Highlight::new(
            3,
            6,
            AttributeSet::single(AttributeKey::Foreground, Color::BLUE)
                .with(AttributeKey::Bold, true),
        )],
    ];
    let container = container_for(&layers);
    let colors: Vec<_> = collect_highlights(&mut container.highlights(0, 10))
        .into_iter()
        .map(|h| {
            let attrs = h.attributes.unwrap_or_else(AttributeSet::empty);
            (
                h.start.offset,
                h.end.offset,
                attrs.color(&AttributeKey::Foreground),
                attrs.flag(&AttributeKey::Bold),
            )
        })
        .collect();
    assert_eq!(
        colors,
        vec![
            (0, 3, Some(Color::RED), false),
            (3, 6, Some(Color::BLUE), true),
            (6, 10, Some(Color::RED), false),
        ]
    );
}

#[test]
fn test_concrete_three_layer_scenario() {
    let white = AttributeSet::single(AttributeKey::Background, Color::WHITE);
    let layers = vec![
        vec![Highlight::new(0, 20, white.clone())],
        vec![Highlight::new(5, 10, AttributeSet::single(AttributeKey::Foreground, Color::RED))],
        vec![Highlight::new(8, 12, AttributeSet::single(AttributeKey::Bold, true))],
    ];
    let container = container_for(&layers);

    let white_red = white.with(AttributeKey::Foreground, Color::RED);
    let expected = vec![
        Highlight::new(0, 5, white.clone()),
        Highlight::new(5, 8, white_red.clone()),
        Highlight::new(8, 10, white_red.with(AttributeKey::Bold, true)),
        Highlight::new(10, 12, white.with(AttributeKey::Bold, true)),
        Highlight::new(12, 20, white),
    ];
    assert_eq!(collect_highlights(&mut container.covering_highlights(0, 20)), expected);
}

#[test]
fn test_malformed_layer_does_not_disturb_others() {
    let good = vec![Highlight::new(
        0,
        20,
        AttributeSet::single(AttributeKey::Foreground, Color::RED),
    )];
    let overlapping = vec![
        Highlight::new(0, 10, AttributeSet::single(AttributeKey::Bold, true)),
        Highlight::new(5, 8, AttributeSet::single(AttributeKey::Italic, true)),
    ];
    let container = DirectMergeContainer::with_config(
        vec![
            Arc::new(StaticLayer { highlights: good }) as Arc<dyn HighlightLayer>,
            Arc::new(StaticLayer {
                highlights: overlapping,
            }),
        ],
        MergeConfig {
            max_empty_highlight_count: 5,
        },
    );

    let merged: Vec<_> = collect_highlights(&mut container.covering_highlights(0, 20))
        .into_iter()
        .map(|h| {
            let attrs = h.attributes.unwrap_or_else(AttributeSet::empty);
            (
                h.start.offset,
                h.end.offset,
                attrs.color(&AttributeKey::Foreground),
                attrs.flag(&AttributeKey::Bold),
                attrs.flag(&AttributeKey::Italic),
            )
        })
        .collect();
    // The overlapping layer keeps its first highlight and is dropped afterwards.
    assert_eq!(
        merged,
        vec![
            (0, 10, Some(Color::RED), true, false),
            (10, 20, Some(Color::RED), false, false),
        ]
    );
}

#[test]
fn test_layer_changes_mark_sequences_stale() {
    let bag = Arc::new(OffsetsBag::new());
    bag.add_highlight(0, 5, AttributeSet::single(AttributeKey::Bold, true));
    bag.add_highlight(10, 15, AttributeSet::single(AttributeKey::Bold, true));
    let container = DirectMergeContainer::new(vec![bag.clone() as Arc<dyn HighlightLayer>]);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);
    container
        .changes()
        .subscribe(move |change| seen_clone.lock().unwrap().push(*change));

    let mut sequence = container.highlights(0, 20);
    assert!(sequence.move_next());
    assert_eq!((sequence.start_offset(), sequence.end_offset()), (0, 5));

    bag.add_highlight(6, 8, AttributeSet::single(AttributeKey::Italic, true));
    assert!(sequence.is_stale());
    assert!(!sequence.move_next());
    assert_eq!(*seen.lock().unwrap(), vec![HighlightsChange::new(6, 8)]);

    let fresh = collect_highlights(&mut container.highlights(0, 20));
    assert_eq!(fresh.len(), 3);
}

#[test]
fn test_nested_containers_merge_like_flat_stack() {
    let mut rng = StdRng::seed_from_u64(5);
    let layers: Vec<_> = (0..4).map(|_| random_layer(&mut rng, 100)).collect();
    let flat = container_for(&layers);

    let lower = Arc::new(container_for(&layers[..2]));
    let upper = Arc::new(container_for(&layers[2..]));
    let nested = DirectMergeContainer::new(vec![
        lower as Arc<dyn HighlightLayer>,
        upper as Arc<dyn HighlightLayer>,
    ]);

    let flat_result = collect_highlights(&mut flat.covering_highlights(0, 100));
    for h in collect_highlights(&mut nested.covering_highlights(0, 100)) {
        for offset in h.start.offset..h.end.offset {
            let reference = flat_result
                .iter()
                .find(|f| f.start.offset <= offset && offset < f.end.offset)
                .and_then(|f| f.attributes.clone());
            assert_eq!(h.attributes, reference, "offset {offset}");
        }
    }
}
