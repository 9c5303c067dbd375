//! Run-length window over merged highlights.
//!
//! A [`HighlightsList`] holds consecutive [`HighlightItem`]s starting at a known position. A
//! renderer consumes it front to back by cutting runs of text that can be painted with uniform
//! attributes. Items are usually appended by a
//! [`HighlightsReader`](crate::reader::HighlightsReader).

use crate::attributes::{AttributeKey, AttributeSet, FontSpec};
use crate::highlight::{Highlight, HighlightItem, SplitOffset};
use ropey::Rope;
use std::collections::VecDeque;

/// Attributes of a run spanning two or more highlight items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundAttributes {
    start: SplitOffset,
    items: Vec<HighlightItem>,
}

impl CompoundAttributes {
    fn new(start: SplitOffset, items: Vec<HighlightItem>) -> Self {
        debug_assert!(items.len() >= 2, "compound run needs at least two items");
        Self { start, items }
    }

    /// Start of the run.
    pub fn start(&self) -> SplitOffset {
        self.start
    }

    /// End of the run.
    pub fn end(&self) -> SplitOffset {
        self.items.last().map_or(self.start, HighlightItem::end)
    }

    /// Items covered by the run.
    pub fn items(&self) -> &[HighlightItem] {
        &self.items
    }

    /// Attributes of the first item, used where a single attribute set is needed.
    pub fn primary(&self) -> Option<&AttributeSet> {
        self.items.first().and_then(HighlightItem::attributes)
    }

    /// The covered items as standalone highlights.
    pub fn highlights(&self) -> impl Iterator<Item = Highlight> + '_ {
        let mut start = self.start;
        self.items.iter().map(move |item| {
            let highlight = Highlight::with_split(start, item.end(), item.attributes().cloned());
            start = item.end();
            highlight
        })
    }
}

/// Attributes of a run cut from a [`HighlightsList`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunAttributes {
    /// The run lies within one item.
    Single(Option<AttributeSet>),
    /// The run spans several items.
    Compound(CompoundAttributes),
}

impl RunAttributes {
    /// Attributes of the run, or of its first item for compound runs.
    pub fn primary(&self) -> Option<&AttributeSet> {
        match self {
            Self::Single(attrs) => attrs.as_ref(),
            Self::Compound(compound) => compound.primary(),
        }
    }

    /// Returns `true` for [`RunAttributes::Compound`].
    pub fn is_compound(&self) -> bool {
        matches!(self, Self::Compound(_))
    }
}

/// Consecutive highlight items starting at [`HighlightsList::start`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HighlightsList {
    start: SplitOffset,
    items: VecDeque<HighlightItem>,
}

impl HighlightsList {
    /// Create an empty list starting at `start_offset`.
    pub fn new(start_offset: usize) -> Self {
        Self {
            start: SplitOffset::at(start_offset),
            items: VecDeque::new(),
        }
    }

    /// Start position of the first item.
    pub fn start(&self) -> SplitOffset {
        self.start
    }

    /// Start offset of the first item.
    pub fn start_offset(&self) -> usize {
        self.start.offset
    }

    /// End of the last item (the start when empty).
    pub fn end(&self) -> SplitOffset {
        self.items.back().map_or(self.start, HighlightItem::end)
    }

    /// End offset of the last item.
    pub fn end_offset(&self) -> usize {
        self.end().offset
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the list holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item at `index`.
    pub fn get(&self, index: usize) -> Option<&HighlightItem> {
        self.items.get(index)
    }

    /// Items in order.
    pub fn items(&self) -> impl Iterator<Item = &HighlightItem> {
        self.items.iter()
    }

    /// Append an item; it must end after the current end.
    pub fn add(&mut self, item: HighlightItem) {
        debug_assert!(
            item.end() > self.end(),
            "item ending at {} does not extend list ending at {}",
            item.end(),
            self.end()
        );
        self.items.push_back(item);
    }

    /// Cut the run `[start, end)` off the front of the list.
    ///
    /// `end` must not exceed [`HighlightsList::end`].
    pub fn cut(&mut self, end: impl Into<SplitOffset>) -> RunAttributes {
        let end = end.into();
        debug_assert!(end <= self.end(), "cut to {end} past list end {}", self.end());
        let Some(first) = self.items.front() else {
            self.start = self.start.max(end);
            return RunAttributes::Single(None);
        };
        if end <= self.start {
            return RunAttributes::Single(None);
        }
        if first.end() >= end {
            let attrs = first.attributes().cloned();
            if first.end() == end {
                self.items.pop_front();
            }
            self.start = end;
            return RunAttributes::Single(attrs);
        }

        let start = self.start;
        let consumed = self.items.iter().take_while(|item| item.end() <= end).count();
        let mut cut: Vec<HighlightItem> = self.items.drain(..consumed).collect();
        let reached = cut.last().map_or(start, HighlightItem::end);
        if reached < end
            && let Some(next) = self.items.front()
        {
            cut.push(HighlightItem::with_split(
                end.offset,
                end.split,
                next.attributes().cloned(),
            ));
        }
        self.start = end;
        if cut.len() == 1 {
            RunAttributes::Single(cut.pop().and_then(|item| item.attributes().cloned()))
        } else {
            RunAttributes::Compound(CompoundAttributes::new(start, cut))
        }
    }

    /// Cut the longest run that renders with a single font.
    ///
    /// The run starts at the list start and extends over following items while they resolve to
    /// the same font as the first item (starting from `default_font`) and no item prepends virtual
    /// text. The run never goes past `max_end_offset`. Once it would extend past `ws_end_offset`,
    /// it ends right after the first whitespace character of `text` at or after `ws_end_offset`.
    pub fn cut_same_font(
        &mut self,
        default_font: &FontSpec,
        max_end_offset: usize,
        ws_end_offset: usize,
        text: &Rope,
    ) -> RunAttributes {
        let max_end = SplitOffset::at(max_end_offset);
        debug_assert!(max_end <= self.end(), "max end {max_end} past list end {}", self.end());
        let Some(first) = self.items.front() else {
            return RunAttributes::Single(None);
        };

        let first_attrs = first.attributes();
        let first_font = default_font.resolve(first_attrs);
        let mut run_end = first.end();
        if prepend_text(first_attrs).is_none() {
            for item in self.items.iter().skip(1) {
                if run_end >= max_end {
                    break;
                }
                let attrs = item.attributes();
                if prepend_text(attrs).is_some() || default_font.resolve(attrs) != first_font {
                    break;
                }
                run_end = item.end();
            }
        }
        let mut end = run_end.min(max_end);

        let ws_end = SplitOffset::at(ws_end_offset);
        if end > ws_end {
            let from = ws_end_offset.max(self.start.offset).min(text.len_chars());
            let to = end.offset.min(text.len_chars());
            if from < to
                && let Some(ws) = text
                    .chars_at(from)
                    .take(to - from)
                    .position(char::is_whitespace)
            {
                end = end.min(SplitOffset::at(from + ws + 1));
            }
        }
        self.cut(end)
    }

    /// Attributes for the single character at the list start; advances by one character.
    pub fn cut_single_char(&mut self) -> Option<AttributeSet> {
        let attrs = self.items.front()?.attributes().cloned();
        let end = SplitOffset::at(self.start.offset + 1);
        self.drop_until(end);
        attrs
    }

    /// Discard everything before `new_start_offset`.
    pub fn skip(&mut self, new_start_offset: usize) {
        let target = SplitOffset::at(new_start_offset);
        if target > self.start {
            self.drop_until(target);
        }
    }

    fn drop_until(&mut self, target: SplitOffset) {
        while self.items.front().is_some_and(|item| item.end() <= target) {
            self.items.pop_front();
        }
        self.start = target;
    }
}

fn prepend_text(attrs: Option<&AttributeSet>) -> Option<&str> {
    attrs.and_then(|a| a.text(&AttributeKey::PrependText))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::Color;

    fn red() -> AttributeSet {
        AttributeSet::single(AttributeKey::Foreground, Color::RED)
    }

    fn blue() -> AttributeSet {
        AttributeSet::single(AttributeKey::Foreground, Color::BLUE)
    }

    fn bold() -> AttributeSet {
        AttributeSet::single(AttributeKey::Bold, true)
    }

    fn list(start: usize, items: &[(usize, Option<AttributeSet>)]) -> HighlightsList {
        let mut list = HighlightsList::new(start);
        for (end, attrs) in items {
            list.add(HighlightItem::new(*end, attrs.clone()));
        }
        list
    }

    #[test]
    fn test_cut_within_single_item() {
        let mut l = list(0, &[(5, Some(red())), (9, Some(blue()))]);
        assert_eq!(l.cut(3usize), RunAttributes::Single(Some(red())));
        assert_eq!(l.start_offset(), 3);
        assert_eq!(l.len(), 2);

        assert_eq!(l.cut(5usize), RunAttributes::Single(Some(red())));
        assert_eq!(l.len(), 1);
        assert_eq!(l.start_offset(), 5);
    }

    #[test]
    fn test_cut_across_items_is_compound() {
        let mut l = list(2, &[(4, Some(red())), (6, None), (9, Some(blue()))]);
        let RunAttributes::Compound(compound) = l.cut(7usize) else {
            panic!("expected compound attributes");
        };
        assert_eq!(compound.start(), SplitOffset::at(2));
        assert_eq!(compound.end(), SplitOffset::at(7));
        assert_eq!(compound.primary(), Some(&red()));
        let ranges: Vec<(usize, usize)> = compound
            .highlights()
            .map(|h| (h.start.offset, h.end.offset))
            .collect();
        assert_eq!(ranges, vec![(2, 4), (4, 6), (6, 7)]);

        // The straddling item stays in the list.
        assert_eq!(l.start_offset(), 7);
        assert_eq!(l.len(), 1);
        assert_eq!(l.cut(9usize), RunAttributes::Single(Some(blue())));
        assert!(l.is_empty());
    }

    #[test]
    fn test_cut_single_char_and_skip() {
        let mut l = list(0, &[(1, Some(red())), (4, Some(blue())), (10, None)]);
        assert_eq!(l.cut_single_char(), Some(red()));
        assert_eq!(l.cut_single_char(), Some(blue()));
        assert_eq!(l.start_offset(), 2);
        assert_eq!(l.len(), 2);

        l.skip(6);
        assert_eq!(l.start_offset(), 6);
        assert_eq!(l.len(), 1);
        assert_eq!(l.cut_single_char(), None);
        assert_eq!(l.start_offset(), 7);

        // Skipping backwards is a no-op.
        l.skip(3);
        assert_eq!(l.start_offset(), 7);
    }

    #[test]
    fn test_cut_same_font_merges_color_changes() {
        let text = Rope::from_str("abcdefghijklmnopqrst");
        let mut l = list(0, &[(3, Some(red())), (6, Some(blue())), (9, Some(bold())), (12, None)]);
        let font = FontSpec::default();

        let run = l.cut_same_font(&font, 12, usize::MAX, &text);
        let RunAttributes::Compound(compound) = run else {
            panic!("expected compound attributes");
        };
        assert_eq!(compound.end(), SplitOffset::at(6));

        // Bold run on its own.
        assert_eq!(
            l.cut_same_font(&font, 12, usize::MAX, &text),
            RunAttributes::Single(Some(bold()))
        );
        assert_eq!(l.start_offset(), 9);
    }

    #[test]
    fn test_cut_same_font_respects_max_end() {
        let text = Rope::from_str("abcdefghijkl");
        let mut l = list(0, &[(3, Some(red())), (10, Some(blue()))]);
        let run = l.cut_same_font(&FontSpec::default(), 5, usize::MAX, &text);
        assert!(run.is_compound());
        assert_eq!(l.start_offset(), 5);
    }

    #[test]
    fn test_cut_same_font_stops_at_prepend_text() {
        let text = Rope::from_str("abcdefghijkl");
        let hint = AttributeSet::single(AttributeKey::PrependText, ": u32");
        let mut l = list(0, &[(3, Some(red())), (6, Some(hint)), (9, Some(red()))]);
        let run = l.cut_same_font(&FontSpec::default(), 9, usize::MAX, &text);
        assert_eq!(run, RunAttributes::Single(Some(red())));
        assert_eq!(l.start_offset(), 3);
    }

    #[test]
    fn test_cut_same_font_breaks_after_whitespace() {
        let text = Rope::from_str("let value = compute(x);");
        let mut l = list(0, &[(23, Some(red()))]);
        let font = FontSpec::default();

        // Whitespace before the soft limit does not matter.
        let run = l.cut_same_font(&font, 23, 6, &text);
        assert_eq!(run, RunAttributes::Single(Some(red())));
        assert_eq!(l.start_offset(), 10);

        // Past the limit the next run ends right after the following space.
        l.cut_same_font(&font, 23, 0, &text);
        assert_eq!(l.start_offset(), 12);
    }
}
