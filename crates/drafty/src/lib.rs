//! Drafty documents
//!
//! A Drafty document is plain text plus formatting spans and the entities
//! (links, images, attachments, mentions...) they refer to. This crate checks
//! decoded documents, renders them to a markdown-like plain text and cuts them
//! down to size-bounded previews.
//!
//! ```
//! use serde_json::json;
//!
//! let value = json!({
//!     "txt": "This text is formatted",
//!     "fmt": [{"at": 5, "len": 4, "tp": "ST"}, {"at": 13, "len": 9, "tp": "EM"}]
//! });
//! let doc = drafty::validate(&value).unwrap();
//! assert_eq!(drafty::render(&doc), "This *text* is _formatted_");
//!
//! let short = drafty::preview(&doc, 9);
//! assert_eq!(short.text, "This text");
//! ```

pub mod error;
pub mod model;
mod plain_text;
pub mod preview;
mod processor;
pub mod resolver;
pub mod validate;

pub use error::ValidationError;
pub use model::{Document, Entity, EntityData, EntityType, Span, Style};
pub use plain_text::{PlainTextOutput, render};
pub use preview::{preview, retained_fields};
pub use processor::process_document;
pub use resolver::{Run, StyleSet, resolve_runs};
pub use validate::{ValidatedDocument, validate};

/// Receiver for the events produced by [`process_document`].
pub trait DraftyOutput {
    type Error;

    fn write_text(&mut self, text: &str) -> Result<(), Self::Error>;
    /// Open a single style marker.
    fn open_style(&mut self, style: StyleSet) -> Result<(), Self::Error>;
    fn close_style(&mut self, style: StyleSet) -> Result<(), Self::Error>;
    /// `covered` is the text the entity replaces; empty for attachments.
    fn write_entity(&mut self, entity: &Entity, covered: &str) -> Result<(), Self::Error>;
    fn write_line_break(&mut self) -> Result<(), Self::Error>;
}

/// Validate a decoded document and render it as plain text.
pub fn to_plain_text(value: &serde_json::Value) -> Result<String, ValidationError> {
    let doc = validate(value)?;
    Ok(render(&doc))
}

/// Validate a decoded document and shorten it to at most `max_length` codepoints.
pub fn to_preview(value: &serde_json::Value, max_length: usize) -> Result<Document, ValidationError> {
    let doc = validate(value)?;
    Ok(preview(&doc, max_length))
}
