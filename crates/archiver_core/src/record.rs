use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Published,
    Draft,
}

impl PostStatus {
    /// Maps the source's publish state; anything other than `publish` is
    /// archived as a draft.
    pub fn from_remote(status: &str) -> Self {
        if status == "publish" {
            PostStatus::Published
        } else {
            PostStatus::Draft
        }
    }
}

/// Metadata document written to `meta.json` for every archived post.
///
/// Always regenerated in full from the remote post; never merged with a
/// previous version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    pub id: String,
    pub title: String,
    pub status: PostStatus,
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_image: Option<String>,
    pub excerpt: String,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub published_date: String,
    pub updated_date: String,
    pub remote_id: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_maps_publish_only() {
        assert_eq!(PostStatus::from_remote("publish"), PostStatus::Published);
        assert_eq!(PostStatus::from_remote("future"), PostStatus::Draft);
        assert_eq!(PostStatus::from_remote("draft"), PostStatus::Draft);
    }

    #[test]
    fn absent_title_image_is_omitted() {
        let record = PostRecord {
            id: "hello".into(),
            title: "Hello".into(),
            status: PostStatus::Published,
            authors: vec!["jane".into()],
            title_image: None,
            excerpt: String::new(),
            categories: vec![],
            tags: vec![],
            published_date: "2024-01-01T00:00:00".into(),
            updated_date: "2024-01-02T00:00:00".into(),
            remote_id: 7,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("titleImage"));
        assert!(json.contains("\"status\":\"published\""));
        assert!(json.contains("\"remoteId\":7"));
    }
}
