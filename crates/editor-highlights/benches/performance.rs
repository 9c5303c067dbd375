use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use editor_highlights::{
    AttributeKey, AttributeSet, Color, DirectMergeContainer, FontSpec, HighlightLayer,
    HighlightsReader, HighlightsSequence, Mark, OffsetTracker, OffsetsBag,
};
use ropey::Rope;
use std::sync::Arc;

fn tracker_with_marks(count: usize, spacing: usize) -> OffsetTracker<Mark> {
    let mut tracker = OffsetTracker::new();
    for i in 0..count {
        tracker.add(Mark::new(i * spacing));
    }
    tracker
}

fn bench_sequential_typing(c: &mut Criterion) {
    c.bench_function("offset_tracker/typing_middle_10k_marks", |b| {
        b.iter_batched(
            || tracker_with_marks(10_000, 8),
            |mut tracker| {
                let mut offset = 40_000;
                for _ in 0..1_000 {
                    tracker.insert_update(offset, 1);
                    offset += 1;
                }
                black_box(tracker.offset_at(9_999));
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_far_jumps(c: &mut Criterion) {
    c.bench_function("offset_tracker/alternating_ends_10k_marks", |b| {
        b.iter_batched(
            || tracker_with_marks(10_000, 8),
            |mut tracker| {
                for i in 0..100 {
                    let offset = if i % 2 == 0 { 10 } else { 79_000 };
                    tracker.insert_update(offset, 1);
                    tracker.remove_update(offset, 1);
                }
                black_box(tracker.gap_start());
            },
            BatchSize::LargeInput,
        )
    });
}

fn layered_container(layer_count: usize, len: usize) -> DirectMergeContainer {
    let palette = [Color::RED, Color::GREEN, Color::BLUE, Color::YELLOW];
    let layers = (0..layer_count)
        .map(|layer| {
            let bag = OffsetsBag::new();
            let step = 5 + layer * 3;
            let mut pos = layer;
            while pos + step < len {
                let attrs = AttributeSet::single(AttributeKey::Foreground, palette[layer % 4])
                    .with(AttributeKey::Bold, layer % 2 == 0);
                bag.add_highlight(pos, pos + step / 2 + 1, attrs);
                pos += step;
            }
            Arc::new(bag) as Arc<dyn HighlightLayer>
        })
        .collect();
    DirectMergeContainer::new(layers)
}

fn bench_merge(c: &mut Criterion) {
    let container = layered_container(8, 20_000);
    c.bench_function("merge/8_layers_viewport_4k", |b| {
        b.iter(|| {
            let mut seq = container.covering_highlights(black_box(8_000), 12_000);
            let mut count = 0usize;
            while seq.move_next() {
                count += 1;
            }
            black_box(count);
        })
    });
}

fn bench_same_font_runs(c: &mut Criterion) {
    let container = layered_container(4, 4_000);
    let line = "the quick brown fox jumps over the lazy dog ".repeat(100);
    let text = Rope::from_str(&line);
    let len = text.len_chars().min(4_000);
    let font = FontSpec::default();
    c.bench_function("reader/same_font_runs_4k", |b| {
        b.iter(|| {
            let mut reader = HighlightsReader::for_container(&container, 0, len);
            reader.read_until(len);
            let list = reader.list_mut();
            let mut runs = 0usize;
            while list.start_offset() < len {
                black_box(list.cut_same_font(&font, len, usize::MAX, &text));
                runs += 1;
            }
            black_box(runs);
        })
    });
}

criterion_group!(
    benches,
    bench_sequential_typing,
    bench_far_jumps,
    bench_merge,
    bench_same_font_runs
);
criterion_main!(benches);
