use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A single timestamped annotation on a shipment. Never edited after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEntry {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub content: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub created_at: String,
    #[serde(
        default,
        deserialize_with = "lenient_optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_name: Option<String>,
}

/// Stored entries were written by more than one client: numeric ids
/// (millisecond timestamps) and `null` content both occur.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

fn lenient_optional<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

impl NoteEntry {
    /// Builds a new entry with a fresh id and the current time.
    pub fn new(content: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            created_at: Utc::now().to_rfc3339(),
            user_name: Some(user_name.into()),
        }
    }
}

/// The shapes a persisted or submitted notes field can take.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NotesInput {
    Entries(Vec<NoteEntry>),
    Raw(String),
}

/// Normalizes a notes field into an ordered list.
///
/// Structured lists pass through untouched. Text is decoded as a JSON list of
/// entries; text that is not such a list becomes one synthesized entry
/// attributed to `placeholder_author`. Never fails.
pub fn parse_notes(input: Option<NotesInput>, placeholder_author: &str) -> Vec<NoteEntry> {
    match input {
        None => Vec::new(),
        Some(NotesInput::Entries(entries)) => entries,
        Some(NotesInput::Raw(raw)) => parse_notes_text(&raw, placeholder_author),
    }
}

/// Convenience for the stored text column.
pub fn parse_notes_column(column: Option<&str>, placeholder_author: &str) -> Vec<NoteEntry> {
    parse_notes(column.map(|s| NotesInput::Raw(s.to_string())), placeholder_author)
}

fn parse_notes_text(raw: &str, placeholder_author: &str) -> Vec<NoteEntry> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items
            .into_iter()
            .map(|item| entry_from_value(item, placeholder_author))
            .collect(),
        _ => vec![NoteEntry::new(raw, placeholder_author)],
    }
}

/// One element of a stored list. Objects keep their own fields; a bare
/// scalar becomes the content of a synthesized entry.
fn entry_from_value(item: Value, placeholder_author: &str) -> NoteEntry {
    match item {
        Value::Object(_) => serde_json::from_value(item.clone()).unwrap_or_else(|_| {
            NoteEntry::new(item.to_string(), placeholder_author)
        }),
        Value::String(s) => NoteEntry::new(s, placeholder_author),
        other => NoteEntry::new(other.to_string(), placeholder_author),
    }
}

/// Appends a note at the end of `existing`, preserving insertion order.
///
/// The caller persists the whole returned list; there is no partial update.
pub fn append_note(
    mut existing: Vec<NoteEntry>,
    content: &str,
    user_name: Option<&str>,
    placeholder_author: &str,
) -> Vec<NoteEntry> {
    let author = user_name
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(placeholder_author);
    existing.push(NoteEntry::new(content, author));
    existing
}

pub fn encode_notes(notes: &[NoteEntry]) -> serde_json::Result<String> {
    serde_json::to_string(notes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTHOR: &str = "Unknown User";

    #[test]
    fn test_absent_and_empty() {
        assert!(parse_notes(None, AUTHOR).is_empty());
        assert!(parse_notes(Some(NotesInput::Entries(vec![])), AUTHOR).is_empty());
        assert!(parse_notes_column(Some(""), AUTHOR).is_empty());
        assert!(parse_notes_column(Some("[]"), AUTHOR).is_empty());
    }

    #[test]
    fn test_json_array_text() {
        let notes = parse_notes_column(
            Some(r#"[{"id":"1","content":"x","created_at":"t"}]"#),
            AUTHOR,
        );
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, "1");
        assert_eq!(notes[0].content, "x");
        assert_eq!(notes[0].user_name, None);
    }

    #[test]
    fn test_numeric_ids_survive_decoding() {
        let notes = parse_notes_column(
            Some(
                r#"[{"id":1700000000000,"content":"courier booked","created_at":"2024-01-01T00:00:00Z"},
                    {"id":"b","content":"permit in","created_at":"2024-01-02T00:00:00Z","user_name":"Dana"}]"#,
            ),
            AUTHOR,
        );
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].id, "1700000000000");
        assert_eq!(notes[0].content, "courier booked");
        assert_eq!(notes[1].id, "b");
        assert_eq!(notes[1].user_name.as_deref(), Some("Dana"));
    }

    #[test]
    fn test_null_content_keeps_entry() {
        let notes = parse_notes_column(
            Some(r#"[{"id":"a","content":null,"created_at":"t"}]"#),
            AUTHOR,
        );
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, "a");
        assert_eq!(notes[0].content, "");
        assert_eq!(notes[0].created_at, "t");
    }

    #[test]
    fn test_scalar_list_items_become_entries() {
        let notes = parse_notes_column(Some(r#"["call lab", 7]"#), AUTHOR);
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].content, "call lab");
        assert_eq!(notes[1].content, "7");
        assert_eq!(notes[1].user_name.as_deref(), Some(AUTHOR));
    }

    #[test]
    fn test_append_after_legacy_list_keeps_old_entries() {
        let stored = r#"[{"id":1,"content":"old","created_at":"t"}]"#;
        let notes = append_note(parse_notes_column(Some(stored), AUTHOR), "new", None, AUTHOR);
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].id, "1");
        assert_eq!(notes[1].content, "new");
    }

    #[test]
    fn test_plain_text_is_wrapped_with_fresh_ids() {
        let first = parse_notes_column(Some("just a plain string"), AUTHOR);
        let second = parse_notes_column(Some("just a plain string"), AUTHOR);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].content, "just a plain string");
        assert_eq!(first[0].user_name.as_deref(), Some(AUTHOR));
        assert!(!first[0].id.is_empty());
        assert_ne!(first[0].id, second[0].id);
    }

    #[test]
    fn test_json_non_list_is_wrapped() {
        let notes = parse_notes_column(Some(r#"{"content":"x"}"#), AUTHOR);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].content, r#"{"content":"x"}"#);

        let notes = parse_notes_column(Some("42"), AUTHOR);
        assert_eq!(notes[0].content, "42");
    }

    #[test]
    fn test_structured_list_passes_through_in_order() {
        let entries = vec![
            NoteEntry {
                id: "b".to_string(),
                content: "second".to_string(),
                created_at: String::new(),
                user_name: None,
            },
            NoteEntry {
                id: "a".to_string(),
                content: "first".to_string(),
                created_at: String::new(),
                user_name: None,
            },
        ];
        let parsed = parse_notes(Some(NotesInput::Entries(entries.clone())), AUTHOR);
        assert_eq!(parsed, entries);
    }

    #[test]
    fn test_untagged_input_deserializes_both_shapes() {
        let list: NotesInput = serde_json::from_str(r#"[{"content":"x"}]"#).unwrap();
        assert!(matches!(list, NotesInput::Entries(ref v) if v.len() == 1));
        let text: NotesInput = serde_json::from_str(r#""hello""#).unwrap();
        assert!(matches!(text, NotesInput::Raw(ref s) if s == "hello"));
    }

    #[test]
    fn test_append_keeps_order_and_defaults_author() {
        let notes = append_note(Vec::new(), "Courier booked", None, AUTHOR);
        let notes = append_note(notes, "Permit received", Some("Dana"), AUTHOR);
        let notes = append_note(notes, "Health cert pending", Some("  "), AUTHOR);
        assert_eq!(notes.len(), 3);
        assert_eq!(notes[0].content, "Courier booked");
        assert_eq!(notes[0].user_name.as_deref(), Some(AUTHOR));
        assert_eq!(notes[1].user_name.as_deref(), Some("Dana"));
        assert_eq!(notes[2].user_name.as_deref(), Some(AUTHOR));
    }

    #[test]
    fn test_encoded_notes_parse_back() {
        let notes = append_note(Vec::new(), "x", Some("Dana"), AUTHOR);
        let blob = encode_notes(&notes).unwrap();
        assert_eq!(parse_notes_column(Some(&blob), AUTHOR), notes);
    }
}
