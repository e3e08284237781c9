use crate::model::{Document, Entity, EntityData, EntityType, Span};
use crate::validate::ValidatedDocument;

/// Data fields an entity keeps in a preview.
///
/// | tp   | kept                                             |
/// |------|--------------------------------------------------|
/// | `LN` | `url`                                            |
/// | `MN` | `val`                                            |
/// | `HT` | `val`                                            |
/// | `IM` | `mime`, `name`, `width`, `height`, `size`        |
/// | `EX` | `mime`, `name`, `size`                           |
/// | `VD` | `mime`, `name`, `width`, `height`, `size`, `duration` |
/// | `AU` | `mime`, `name`, `size`, `duration`               |
/// | `BN` | `act`, `name`, `val`                             |
///
/// Anything else, including inline payloads (`val` of media entities), `ref`
/// urls and embedded previews, is dropped. Unknown entity types keep nothing.
pub fn retained_fields(kind: &EntityType) -> &'static [&'static str] {
    match kind {
        EntityType::Link => &["url"],
        EntityType::Mention | EntityType::Hashtag => &["val"],
        EntityType::Image => &["mime", "name", "width", "height", "size"],
        EntityType::File => &["mime", "name", "size"],
        EntityType::Video => &["mime", "name", "width", "height", "size", "duration"],
        EntityType::Audio => &["mime", "name", "size", "duration"],
        EntityType::Button => &["act", "name", "val"],
        EntityType::Unknown(_) => &[],
    }
}

fn light_entity(entity: &Entity) -> Entity {
    let keep = retained_fields(&entity.kind);
    let data = entity
        .data
        .as_ref()
        .map(|data| {
            data.iter()
                .filter(|(name, _)| keep.contains(&name.as_str()))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect::<EntityData>()
        })
        .filter(|data| !data.is_empty());

    Entity {
        kind: entity.kind.clone(),
        data,
    }
}

/// Clip an inline span to the first `max_length` codepoints.
fn clip_span(span: &Span, max_length: usize) -> Option<Span> {
    if span.is_attachment() {
        return Some(span.clone());
    }
    let range = span.range()?;
    if range.start >= max_length {
        return None;
    }
    let end = range.end.min(max_length);
    Some(Span {
        length: i64::try_from(end - range.start).ok()?,
        ..span.clone()
    })
}

/// Shorten a document to at most `max_length` codepoints of text.
///
/// Spans starting past the cut are dropped and the rest are clipped to it;
/// attachment spans are always kept. Only entities still referenced survive,
/// renumbered `0..n` in order of first reference, with their data reduced to
/// [`retained_fields`].
#[tracing::instrument(level = "debug", skip(doc), fields(text_len = doc.text_len()))]
pub fn preview(doc: &ValidatedDocument, max_length: usize) -> Document {
    let text: String = doc.text.chars().take(max_length).collect();

    let mut remap: Vec<Option<usize>> = vec![None; doc.entities.len()];
    let mut entities = Vec::new();
    let mut spans = Vec::with_capacity(doc.spans.len());

    for span in &doc.spans {
        let Some(mut span) = clip_span(span, max_length) else {
            continue;
        };
        if let Some(old) = span.entity_key().and_then(|key| usize::try_from(key).ok()) {
            let Some(entity) = doc.entities.get(old) else {
                continue;
            };
            let new = *remap[old].get_or_insert_with(|| {
                entities.push(light_entity(entity));
                entities.len() - 1
            });
            span.key = i64::try_from(new).ok();
        }
        spans.push(span);
    }

    tracing::debug!(
        spans_dropped = doc.spans.len() - spans.len(),
        entities_dropped = doc.entities.len() - entities.len(),
        "built preview"
    );

    Document {
        text,
        spans,
        entities,
    }
}
