use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::ops::Range;

/// Entity payload, kept in insertion order.
pub type EntityData = Map<String, Value>;

/// A Drafty document: plain text plus formatting spans and the entities they reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "txt", default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(rename = "fmt", default, skip_serializing_if = "Vec::is_empty")]
    pub spans: Vec<Span>,
    #[serde(rename = "ent", default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<Entity>,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.spans.push(span);
        self
    }

    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entities.push(entity);
        self
    }
}

/// Formatting instruction over a range of codepoints.
///
/// `start == -1` attaches the span to the whole document instead of a text range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    #[serde(rename = "at", default, skip_serializing_if = "is_zero")]
    pub start: i64,
    #[serde(rename = "len", default, skip_serializing_if = "is_zero")]
    pub length: i64,
    #[serde(rename = "tp", default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Style>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<i64>,
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

impl Span {
    pub const ATTACHMENT: i64 = -1;

    pub fn styled(start: i64, length: i64, style: Style) -> Self {
        Self {
            start,
            length,
            style: Some(style),
            key: None,
        }
    }

    pub fn entity(start: i64, length: i64, key: i64) -> Self {
        Self {
            start,
            length,
            style: None,
            key: Some(key),
        }
    }

    pub fn attachment(key: i64) -> Self {
        Self::entity(Self::ATTACHMENT, 0, key)
    }

    pub fn is_attachment(&self) -> bool {
        self.start == Self::ATTACHMENT
    }

    /// Entity this span refers to. Unstyled spans without an explicit key point at entity 0.
    pub fn entity_key(&self) -> Option<i64> {
        match (self.key, &self.style) {
            (Some(key), _) => Some(key),
            (None, None) => Some(0),
            (None, Some(_)) => None,
        }
    }

    /// Codepoint range covered by an inline span, `None` for attachments.
    ///
    /// Only meaningful once the span has been validated.
    pub fn range(&self) -> Option<Range<usize>> {
        if self.is_attachment() {
            return None;
        }
        let start = usize::try_from(self.start).ok()?;
        let length = usize::try_from(self.length).ok()?;
        Some(start..start + length)
    }
}

/// Inline style tag of a span.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Style {
    /// `ST`
    Strong,
    /// `EM`
    Emphasis,
    /// `DL`
    Deleted,
    /// `CO`
    Code,
    /// `BR`
    LineBreak,
    /// `HD`
    Hidden,
    Unknown(String),
}

impl Style {
    pub fn as_str(&self) -> &str {
        match self {
            Style::Strong => "ST",
            Style::Emphasis => "EM",
            Style::Deleted => "DL",
            Style::Code => "CO",
            Style::LineBreak => "BR",
            Style::Hidden => "HD",
            Style::Unknown(tag) => tag,
        }
    }
}

impl From<&str> for Style {
    fn from(tag: &str) -> Self {
        match tag {
            "ST" => Style::Strong,
            "EM" => Style::Emphasis,
            "DL" => Style::Deleted,
            "CO" => Style::Code,
            "BR" => Style::LineBreak,
            "HD" => Style::Hidden,
            other => Style::Unknown(other.to_owned()),
        }
    }
}

impl From<String> for Style {
    fn from(tag: String) -> Self {
        Style::from(tag.as_str())
    }
}

impl From<Style> for String {
    fn from(style: Style) -> Self {
        match style {
            Style::Unknown(tag) => tag,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Out-of-line rich object referenced by spans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "tp")]
    pub kind: EntityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<EntityData>,
}

impl Entity {
    pub fn new(kind: EntityType) -> Self {
        Self { kind, data: None }
    }

    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.data
            .get_or_insert_with(EntityData::new)
            .insert(name.to_owned(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.as_ref()?.get(name)
    }

    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.field(name)?.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityType {
    /// `LN`
    Link,
    /// `MN`
    Mention,
    /// `HT`
    Hashtag,
    /// `IM`
    Image,
    /// `EX`
    File,
    /// `BN`
    Button,
    /// `VD`
    Video,
    /// `AU`
    Audio,
    Unknown(String),
}

impl EntityType {
    pub fn as_str(&self) -> &str {
        match self {
            EntityType::Link => "LN",
            EntityType::Mention => "MN",
            EntityType::Hashtag => "HT",
            EntityType::Image => "IM",
            EntityType::File => "EX",
            EntityType::Button => "BN",
            EntityType::Video => "VD",
            EntityType::Audio => "AU",
            EntityType::Unknown(tag) => tag,
        }
    }
}

impl From<&str> for EntityType {
    fn from(tag: &str) -> Self {
        match tag {
            "LN" => EntityType::Link,
            "MN" => EntityType::Mention,
            "HT" => EntityType::Hashtag,
            "IM" => EntityType::Image,
            "EX" => EntityType::File,
            "BN" => EntityType::Button,
            "VD" => EntityType::Video,
            "AU" => EntityType::Audio,
            other => EntityType::Unknown(other.to_owned()),
        }
    }
}

impl From<String> for EntityType {
    fn from(tag: String) -> Self {
        EntityType::from(tag.as_str())
    }
}

impl From<EntityType> for String {
    fn from(kind: EntityType) -> Self {
        match kind {
            EntityType::Unknown(tag) => tag,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
