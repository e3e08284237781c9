use miette::Diagnostic;
use thiserror::Error;

/// Reason a decoded document was rejected.
///
/// Span and entity positions are indices into the document's `fmt` and `ent` lists.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ValidationError {
    #[error("{path} must be {expected}")]
    #[diagnostic(code(drafty::validate::type_mismatch))]
    TypeMismatch { path: String, expected: &'static str },

    #[error("span {span} has negative length {len}")]
    #[diagnostic(code(drafty::validate::negative_length))]
    NegativeLength { span: usize, len: i64 },

    #[error("span {span} (at {at}, len {len}) is outside of the text ({text_len} codepoints)")]
    #[diagnostic(
        code(drafty::validate::out_of_bounds),
        help("span offsets count unicode codepoints, not bytes")
    )]
    OutOfBounds {
        span: usize,
        at: i64,
        len: i64,
        text_len: usize,
    },

    #[error("span {span} references entity {key}, but the document has {entities} entities")]
    #[diagnostic(code(drafty::validate::dangling_entity_reference))]
    DanglingEntityReference {
        span: usize,
        key: i64,
        entities: usize,
    },

    #[error("data of entity {entity} is not a mapping")]
    #[diagnostic(code(drafty::validate::invalid_entity_data))]
    InvalidEntityData { entity: usize },
}

impl ValidationError {
    pub(crate) fn type_mismatch(path: impl Into<String>, expected: &'static str) -> Self {
        Self::TypeMismatch {
            path: path.into(),
            expected,
        }
    }
}
