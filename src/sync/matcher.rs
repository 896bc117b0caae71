use sha2::{Digest, Sha256};

use crate::model::board::CheckItem;
use crate::model::task::ExternalTask;

const KEY_PREFIX: &str = "{ref:";
const KEY_LEN: usize = 12;

/// Tasks whose content matches `text`, in snapshot order.
///
/// Strict mode needs exact equality; otherwise `text` must occur inside the
/// task's content. Blank text matches nothing.
pub fn find_matches<'a>(tasks: &'a [ExternalTask], text: &str, strict: bool) -> Vec<&'a ExternalTask> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    tasks
        .iter()
        .filter(|t| {
            if strict {
                t.content == text
            } else {
                t.content.contains(text)
            }
        })
        .collect()
}

/// Stable key for one check item on one card.
pub fn correlation_key(card_id: &str, item_id: &str) -> String {
    let digest = Sha256::digest(format!("{card_id}:{item_id}").as_bytes());
    digest
        .iter()
        .take(KEY_LEN / 2)
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Append the correlation marker to task content.
pub fn tag(content: &str, key: &str) -> String {
    format!("{content} {KEY_PREFIX}{key}}}")
}

/// The correlation key embedded in task content, if any.
pub fn embedded_key(content: &str) -> Option<&str> {
    let start = content.rfind(KEY_PREFIX)? + KEY_PREFIX.len();
    let key = content.get(start..start + KEY_LEN)?;
    let closed = content.get(start + KEY_LEN..)?.starts_with('}');
    (closed && key.chars().all(|c| c.is_ascii_hexdigit())).then_some(key)
}

/// Tasks that correspond to `item` on card `card_id`.
///
/// A `{ref:<key>}` marker ties a task the groomer created to one check item
/// and is tried first. Text matching only considers tasks with no marker.
pub fn match_item(
    tasks: &[ExternalTask],
    card_id: &str,
    item: &CheckItem,
    strict: bool,
) -> Vec<ExternalTask> {
    let key = correlation_key(card_id, &item.id);
    let keyed: Vec<ExternalTask> = tasks
        .iter()
        .filter(|t| embedded_key(&t.content) == Some(key.as_str()))
        .cloned()
        .collect();
    if !keyed.is_empty() {
        return keyed;
    }

    let unmarked: Vec<ExternalTask> = tasks
        .iter()
        .filter(|t| embedded_key(&t.content).is_none())
        .cloned()
        .collect();
    find_matches(&unmarked, &item.name, strict)
        .into_iter()
        .cloned()
        .collect()
}
