use super::{DraftyOutput, process_document};
use crate::model::{Entity, EntityType};
use crate::resolver::StyleSet;
use crate::validate::ValidatedDocument;
use std::fmt::Write;

/// Opening and closing marker for each style.
const MARKERS: [(StyleSet, &str); 4] = [
    (StyleSet::DELETED, "~"),
    (StyleSet::STRONG, "*"),
    (StyleSet::EMPHASIS, "_"),
    (StyleSet::CODE, "`"),
];

fn marker(style: StyleSet) -> &'static str {
    MARKERS
        .iter()
        .find(|(flag, _)| *flag == style)
        .map_or("", |(_, marker)| marker)
}

/// Writes a document as markdown-like plain text.
pub struct PlainTextOutput<W: Write> {
    writer: W,
}

impl<W: Write> PlainTextOutput<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// `@name`, `#tag` style fallback used when an entity covers no text.
    fn write_prefixed(
        &mut self,
        covered: &str,
        prefix: char,
        value: Option<&str>,
    ) -> Result<(), std::fmt::Error> {
        match value {
            Some(value) if covered.is_empty() => {
                self.writer.write_char(prefix)?;
                self.writer.write_str(value)
            }
            _ => self.writer.write_str(covered),
        }
    }
}

impl<W: Write> DraftyOutput for PlainTextOutput<W> {
    type Error = std::fmt::Error;

    fn write_text(&mut self, text: &str) -> Result<(), Self::Error> {
        self.writer.write_str(text)
    }

    fn open_style(&mut self, style: StyleSet) -> Result<(), Self::Error> {
        self.writer.write_str(marker(style))
    }

    fn close_style(&mut self, style: StyleSet) -> Result<(), Self::Error> {
        self.writer.write_str(marker(style))
    }

    fn write_entity(&mut self, entity: &Entity, covered: &str) -> Result<(), Self::Error> {
        let name = entity.field_str("name").unwrap_or_default();
        match &entity.kind {
            EntityType::Link => match entity.field_str("url") {
                Some(url) if covered.is_empty() || covered == url => self.writer.write_str(url),
                Some(url) => write!(self.writer, "[{}]({})", covered, url),
                None => self.writer.write_str(covered),
            },
            EntityType::Image => write!(self.writer, "[IMAGE '{}']", name),
            EntityType::File => write!(self.writer, "[FILE '{}']", name),
            EntityType::Video => write!(self.writer, "[VIDEO '{}']", name),
            EntityType::Audio => write!(self.writer, "[AUDIO '{}']", name),
            EntityType::Mention => self.write_prefixed(covered, '@', entity.field_str("val")),
            EntityType::Hashtag => self.write_prefixed(covered, '#', entity.field_str("val")),
            EntityType::Button => {
                let label = if covered.is_empty() { name } else { covered };
                write!(self.writer, "[{}]", label)
            }
            EntityType::Unknown(_) => self.writer.write_str(covered),
        }
    }

    fn write_line_break(&mut self) -> Result<(), Self::Error> {
        self.writer.write_char('\n')
    }
}

/// Render a validated document as plain text.
#[tracing::instrument(level = "trace", skip_all, fields(spans = doc.spans.len()))]
pub fn render(doc: &ValidatedDocument) -> String {
    let mut output = PlainTextOutput::new(String::new());
    match process_document(doc, &mut output) {
        Ok(()) => output.into_inner(),
        Err(std::fmt::Error) => unreachable!("writing to a String does not fail"),
    }
}
