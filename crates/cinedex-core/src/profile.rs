//! The singular `users/{id}` document and its comma-joined preference list.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDocument {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub profile_picture: String,
    /// Genre names joined with `,` as the store keeps them.
    #[serde(default)]
    pub preferences: String,
}

impl UserDocument {
    pub fn preference_list(&self) -> Vec<String> {
        parse_preferences(&self.preferences)
    }

    pub fn set_preferences(&mut self, genres: &[String]) {
        self.preferences = join_preferences(genres);
    }
}

/// Split the stored string, dropping empty segments.
pub fn parse_preferences(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn join_preferences(genres: &[String]) -> String {
    genres.join(",")
}

/// Add `genre` if absent, remove it if present.  Order is kept.
pub fn toggle_preference(genres: &mut Vec<String>, genre: &str) {
    if let Some(pos) = genres.iter().position(|g| g == genre) {
        genres.remove(pos);
    } else {
        genres.push(genre.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_drops_empty_segments() {
        assert_eq!(
            parse_preferences("Action,,Drama, Horror ,"),
            vec!["Action", "Drama", "Horror"]
        );
        assert!(parse_preferences("").is_empty());
    }

    #[test]
    fn test_toggle_preference() {
        let mut prefs = parse_preferences("Action,Drama");
        toggle_preference(&mut prefs, "Western");
        toggle_preference(&mut prefs, "Action");
        assert_eq!(join_preferences(&prefs), "Drama,Western");
    }

    #[test]
    fn test_user_document_uses_store_field_names() {
        let doc: UserDocument = serde_json::from_str(
            r#"{"username": "ripley", "profilePicture": "https://x/p.png", "preferences": "Horror,Science Fiction"}"#,
        )
        .unwrap();
        assert_eq!(doc.profile_picture, "https://x/p.png");
        assert_eq!(doc.preference_list(), vec!["Horror", "Science Fiction"]);
    }
}
