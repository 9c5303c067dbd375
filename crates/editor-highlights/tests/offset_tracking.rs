//! Offset tracking validation
//!
//! Random edit streams are applied both to an `OffsetTracker` and to a plain `Vec<usize>`
//! reference that shifts every position by hand; both must always agree.

use editor_highlights::{Mark, OffsetTracker};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn shift_insert(reference: &mut [usize], offset: usize, length: usize, fixed_zero: bool) {
    for pos in reference.iter_mut() {
        if *pos >= offset && !(fixed_zero && *pos == 0) {
            *pos += length;
        }
    }
}

fn shift_remove(reference: &mut [usize], offset: usize, length: usize) {
    let end = offset + length;
    for pos in reference.iter_mut() {
        if *pos >= end {
            *pos -= length;
        } else if *pos >= offset {
            *pos = offset;
        }
    }
}

fn run_random_edits(seed: u64, fixed_zero: bool) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut doc_len = 1_000usize;
    let mut tracker = if fixed_zero {
        OffsetTracker::with_fixed_zero()
    } else {
        OffsetTracker::new()
    };
    let mut reference = Vec::new();
    let mut marks = Vec::new();

    for _ in 0..200 {
        let offset = rng.gen_range(0..=doc_len);
        let mark = Mark::new(offset);
        tracker.add(mark.clone());
        marks.push(mark);
        reference.push(offset);
    }
    if fixed_zero {
        let mark = Mark::new(0);
        tracker.add(mark.clone());
        marks.push(mark);
        reference.push(0);
    }

    for step in 0..2_000 {
        if rng.gen_bool(0.55) || doc_len < 20 {
            // Mostly local typing, sometimes a jump.
            let offset = if rng.gen_bool(0.8) {
                (doc_len / 2 + step % 7).min(doc_len)
            } else {
                rng.gen_range(0..=doc_len)
            };
            let length = rng.gen_range(1..=8);
            tracker.insert_update(offset, length);
            shift_insert(&mut reference, offset, length, fixed_zero);
            doc_len += length;
        } else {
            let offset = rng.gen_range(0..doc_len);
            let length = rng.gen_range(1..=(doc_len - offset).min(15));
            tracker.remove_update(offset, length);
            shift_remove(&mut reference, offset, length);
            doc_len -= length;
        }

        if step % 100 == 0 {
            let offsets: Vec<usize> = tracker.offsets().collect();
            assert!(
                offsets.windows(2).all(|w| w[0] <= w[1]),
                "offsets out of order at step {step}"
            );
        }
    }

    for (mark, expected) in marks.iter().zip(&reference) {
        assert_eq!(tracker.element_offset(mark), *expected);
    }

    let mut sorted = reference.clone();
    sorted.sort_unstable();
    assert_eq!(tracker.offsets().collect::<Vec<_>>(), sorted);
}

#[test]
fn test_random_edits_match_reference() {
    for seed in [1, 7, 42, 1234] {
        run_random_edits(seed, false);
    }
}

#[test]
fn test_random_edits_match_reference_with_fixed_zero() {
    for seed in [3, 99] {
        run_random_edits(seed, true);
    }
}

#[test]
fn test_lookup_after_edits() {
    let mut tracker = OffsetTracker::new();
    for offset in [10, 20, 20, 30] {
        tracker.add(Mark::new(offset));
    }
    tracker.insert_update(15, 5);
    tracker.remove_update(0, 5);

    assert_eq!(tracker.offsets().collect::<Vec<_>>(), vec![5, 20, 20, 30]);
    assert_eq!(tracker.find_element_index(0), 0);
    assert_eq!(tracker.find_element_index(6), 1);
    assert_eq!(tracker.find_element_index(20), 1);
    assert_eq!(tracker.find_element_index(21), 3);
    assert_eq!(tracker.find_element_index(100), 4);
}

#[test]
fn test_removed_marks_keep_their_last_offset() {
    let mut tracker = OffsetTracker::new();
    let mark = Mark::new(12);
    tracker.add(mark.clone());
    tracker.insert_update(0, 3);

    let index = tracker.index_of(&mark).unwrap();
    tracker.remove(index);
    tracker.insert_update(0, 100);

    assert!(!mark.is_attached());
    assert_eq!(mark.frozen_offset(), Some(15));
}
