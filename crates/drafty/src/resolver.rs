use crate::model::Style;
use bitflags::bitflags;
use std::cmp::Ordering;
use std::ops::Range;

bitflags! {
    /// Set of inline styles that produce markers.
    ///
    /// Bit order is the nesting order: lower bits are opened first and closed last.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StyleSet: u8 {
        const DELETED = 1 << 0;
        const STRONG = 1 << 1;
        const EMPHASIS = 1 << 2;
        const CODE = 1 << 3;
    }
}

impl StyleSet {
    /// Every marker style, outermost first.
    pub const ORDER: [StyleSet; 4] = [
        StyleSet::DELETED,
        StyleSet::STRONG,
        StyleSet::EMPHASIS,
        StyleSet::CODE,
    ];

    /// Marker flag for a style. Line breaks, hidden ranges and unknown tags have none.
    pub fn from_style(style: &Style) -> StyleSet {
        match style {
            Style::Deleted => StyleSet::DELETED,
            Style::Strong => StyleSet::STRONG,
            Style::Emphasis => StyleSet::EMPHASIS,
            Style::Code => StyleSet::CODE,
            Style::LineBreak | Style::Hidden | Style::Unknown(_) => StyleSet::empty(),
        }
    }

    /// Single styles of this set, outermost first.
    pub fn ordered(self) -> impl DoubleEndedIterator<Item = StyleSet> {
        Self::ORDER.into_iter().filter(move |style| self.contains(*style))
    }

    /// Markers needed to go from `self` being open to `next` being open.
    ///
    /// Returns the styles to close (innermost first) and the styles to open
    /// (outermost first). Styles shared by the longest common canonical prefix
    /// stay open.
    pub fn transition(self, next: StyleSet) -> (Vec<StyleSet>, Vec<StyleSet>) {
        let open: Vec<_> = self.ordered().collect();
        let wanted: Vec<_> = next.ordered().collect();
        let shared = open
            .iter()
            .zip(&wanted)
            .take_while(|(a, b)| a == b)
            .count();

        let close = open[shared..].iter().rev().copied().collect();
        let reopen = wanted[shared..].to_vec();
        (close, reopen)
    }
}

/// Maximal codepoint range with a stable set of active styles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub range: Range<usize>,
    pub styles: StyleSet,
}

#[derive(Debug, Clone, Copy)]
struct Boundary {
    pos: usize,
    is_start: bool,
    styles: StyleSet,
}

impl Boundary {
    fn start(pos: usize, styles: StyleSet) -> Self {
        Self {
            pos,
            is_start: true,
            styles,
        }
    }

    fn end(pos: usize, styles: StyleSet) -> Self {
        Self {
            pos,
            is_start: false,
            styles,
        }
    }
}

impl PartialEq for Boundary {
    fn eq(&self, other: &Self) -> bool {
        self.pos == other.pos && self.is_start == other.is_start
    }
}

impl Eq for Boundary {}

impl PartialOrd for Boundary {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Boundary {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.pos.cmp(&other.pos) {
            // At same position: ends before starts so no empty run is produced
            Ordering::Equal => match (self.is_start, other.is_start) {
                (false, true) => Ordering::Less,
                (true, false) => Ordering::Greater,
                _ => Ordering::Equal,
            },
            ord => ord,
        }
    }
}

/// Flatten possibly overlapping style ranges into consecutive runs.
///
/// The runs cover `0..text_len` without gaps, so concatenating the text under
/// each run gives back the whole text. Ranges are clamped to `text_len`; empty
/// ranges and ranges without marker styles are ignored.
pub fn resolve_runs<I>(text_len: usize, styled: I) -> Vec<Run>
where
    I: IntoIterator<Item = (Range<usize>, StyleSet)>,
{
    let mut events = Vec::new();
    for (range, styles) in styled {
        let start = range.start.min(text_len);
        let end = range.end.min(text_len);
        if start >= end || styles.is_empty() {
            continue;
        }
        events.push(Boundary::start(start, styles));
        events.push(Boundary::end(end, styles));
    }
    events.sort();

    // Overlapping spans may repeat a style, so count coverage per style.
    let mut depth = [0u32; StyleSet::ORDER.len()];
    let mut runs: Vec<Run> = Vec::new();
    let mut last_pos = 0;

    for event in events {
        if event.pos > last_pos {
            push_run(&mut runs, last_pos..event.pos, active(&depth));
            last_pos = event.pos;
        }
        for (slot, style) in StyleSet::ORDER.iter().enumerate() {
            if !event.styles.contains(*style) {
                continue;
            }
            if event.is_start {
                depth[slot] += 1;
            } else {
                depth[slot] = depth[slot].saturating_sub(1);
            }
        }
    }

    if last_pos < text_len {
        push_run(&mut runs, last_pos..text_len, active(&depth));
    }

    tracing::trace!(runs = runs.len(), "resolved style runs");
    runs
}

fn active(depth: &[u32]) -> StyleSet {
    StyleSet::ORDER
        .iter()
        .zip(depth)
        .filter(|(_, count)| **count > 0)
        .fold(StyleSet::empty(), |set, (style, _)| set | *style)
}

fn push_run(runs: &mut Vec<Run>, range: Range<usize>, styles: StyleSet) {
    if let Some(prev) = runs.last_mut() {
        if prev.styles == styles && prev.range.end == range.start {
            prev.range.end = range.end;
            return;
        }
    }
    runs.push(Run { range, styles });
}

/// Styles active over the whole of `range`.
///
/// For an empty range the styles active on both sides of its offset are used.
pub fn covering_styles(runs: &[Run], range: &Range<usize>) -> StyleSet {
    if range.is_empty() {
        let before = range.start.checked_sub(1).map(|pos| styles_at(runs, pos));
        let after = styles_at(runs, range.start);
        return before.map_or(StyleSet::empty(), |before| before & after);
    }

    let first = runs.partition_point(|run| run.range.end <= range.start);
    let mut covering = StyleSet::all();
    let mut seen = false;
    for run in runs[first..]
        .iter()
        .take_while(|run| run.range.start < range.end)
    {
        covering &= run.styles;
        seen = true;
    }
    if seen { covering } else { StyleSet::empty() }
}

fn styles_at(runs: &[Run], pos: usize) -> StyleSet {
    let idx = runs.partition_point(|run| run.range.end <= pos);
    runs.get(idx)
        .filter(|run| run.range.start <= pos)
        .map_or(StyleSet::empty(), |run| run.styles)
}
