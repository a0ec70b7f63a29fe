//! Human-readable summaries of keymap diffs.

use keysync_core::KeymapChanges;

/// Render `changes` as e.g. `"2 added, 1 updated"`.
///
/// `None` renders as an empty string and an empty diff as `"no changes"`.
/// Clauses are always ordered add, remove, update; zero counts are omitted.
pub fn summarize(changes: Option<&KeymapChanges>) -> String {
    let Some(changes) = changes else {
        return String::new();
    };
    if changes.is_empty() {
        return "no changes".to_string();
    }

    [
        (changes.add.len(), "added"),
        (changes.remove.len(), "removed"),
        (changes.update.len(), "updated"),
    ]
    .into_iter()
    .filter(|(count, _)| *count > 0)
    .map(|(count, verb)| format!("{count} {verb}"))
    .collect::<Vec<_>>()
    .join(", ")
}
