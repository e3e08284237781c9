use super::DraftyOutput;
use crate::model::{Entity, Style};
use crate::resolver::{Run, StyleSet, covering_styles, resolve_runs};
use crate::validate::ValidatedDocument;
use std::cmp::Reverse;
use std::ops::Range;

/// What replaces the covered text of a span.
#[derive(Debug, Clone, Copy)]
enum Replacement<'a> {
    Entity(&'a Entity),
    LineBreak,
    Hidden,
}

#[derive(Debug, Clone)]
struct Substitution<'a> {
    range: Range<usize>,
    replacement: Replacement<'a>,
}

/// Codepoint to byte offset table for a text.
struct CharOffsets<'a> {
    text: &'a str,
    offsets: Vec<usize>,
}

impl<'a> CharOffsets<'a> {
    fn new(text: &'a str) -> Self {
        let offsets = text
            .char_indices()
            .map(|(idx, _)| idx)
            .chain(std::iter::once(text.len()))
            .collect();
        Self { text, offsets }
    }

    fn slice(&self, range: Range<usize>) -> &'a str {
        let start = self.offsets.get(range.start).copied();
        let end = self.offsets.get(range.end).copied();
        match (start, end) {
            (Some(start), Some(end)) => self.text.get(start..end).unwrap_or_default(),
            _ => "",
        }
    }
}

struct Walker<'a, 'o, O: DraftyOutput> {
    text: CharOffsets<'a>,
    runs: Vec<Run>,
    output: &'o mut O,
    open: StyleSet,
    /// Codepoint offset written up to.
    pos: usize,
    /// First run that may still contain unwritten text.
    next_run: usize,
}

impl<'a, 'o, O: DraftyOutput> Walker<'a, 'o, O> {
    /// Write the text from the current position up to `limit`, run by run.
    fn write_text_until(&mut self, limit: usize) -> Result<(), O::Error> {
        while let Some(run) = self.runs.get(self.next_run) {
            if run.range.start >= limit {
                break;
            }
            let start = run.range.start.max(self.pos);
            let end = run.range.end.min(limit);
            let styles = run.styles;
            let exhausted = run.range.end <= limit;
            if start < end {
                self.switch_to(styles)?;
                let segment = self.text.slice(start..end);
                self.output.write_text(segment)?;
            }
            if !exhausted {
                break;
            }
            self.next_run += 1;
        }
        self.pos = self.pos.max(limit);
        Ok(())
    }

    fn switch_to(&mut self, styles: StyleSet) -> Result<(), O::Error> {
        if self.open == styles {
            return Ok(());
        }
        let (close, reopen) = self.open.transition(styles);
        for style in close {
            self.output.close_style(style)?;
        }
        for style in reopen {
            self.output.open_style(style)?;
        }
        self.open = styles;
        Ok(())
    }
}

/// Walk a validated document, driving `output` with text, style markers and entities.
///
/// Style spans are flattened into runs and markers are nested in the canonical
/// [`StyleSet`] order. Entity spans, line breaks and hidden spans replace the text
/// they cover. Attachment spans (`at == -1`) are written after the text.
pub fn process_document<O: DraftyOutput>(
    doc: &ValidatedDocument,
    output: &mut O,
) -> Result<(), O::Error> {
    let text_len = doc.text_len();
    let mut styled = Vec::new();
    let mut substitutions = Vec::new();

    for span in &doc.spans {
        let Some(range) = span.range() else {
            continue;
        };
        let replacement = match (doc.entity_for(span), &span.style) {
            (Some(entity), _) => Some(Replacement::Entity(entity)),
            (None, Some(Style::LineBreak)) => Some(Replacement::LineBreak),
            (None, Some(Style::Hidden)) => Some(Replacement::Hidden),
            _ => None,
        };
        if let Some(replacement) = replacement {
            substitutions.push(Substitution {
                range: range.clone(),
                replacement,
            });
        }
        if let Some(style) = &span.style {
            styled.push((range, StyleSet::from_style(style)));
        }
    }

    let runs = resolve_runs(text_len, styled);

    // Insertions first, then longer replacements win at the same offset.
    substitutions.sort_by_key(|sub| {
        (
            sub.range.start,
            !sub.range.is_empty(),
            Reverse(sub.range.len()),
        )
    });

    let mut walker = Walker {
        text: CharOffsets::new(&doc.text),
        runs,
        output,
        open: StyleSet::empty(),
        pos: 0,
        next_run: 0,
    };

    for sub in substitutions {
        if sub.range.start < walker.pos {
            tracing::trace!(range = ?sub.range, "skipping overlapped substitution");
            continue;
        }
        walker.write_text_until(sub.range.start)?;

        match sub.replacement {
            Replacement::Entity(entity) => {
                walker.switch_to(covering_styles(&walker.runs, &sub.range))?;
                let covered = walker.text.slice(sub.range.clone());
                walker.output.write_entity(entity, covered)?;
            }
            Replacement::LineBreak => {
                walker.switch_to(covering_styles(&walker.runs, &sub.range))?;
                walker.output.write_line_break()?;
            }
            Replacement::Hidden => {}
        }
        walker.pos = sub.range.end;
    }

    walker.write_text_until(text_len)?;
    walker.switch_to(StyleSet::empty())?;

    for span in doc.spans.iter().filter(|span| span.is_attachment()) {
        if let Some(entity) = doc.entity_for(span) {
            walker.output.write_entity(entity, "")?;
        }
    }

    Ok(())
}
