use serde::{Deserialize, Serialize};

/// A comment as served by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentView {
    pub id: String,
    pub content: String,
    pub author_id: String,
    pub post_id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub child_ids: Vec<String>,
    pub vote_count: i64,
    pub reply_count: i64,
    pub is_deleted: bool,
    pub is_edited: bool,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub edited_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentDetails {
    pub comment: CommentView,
    #[serde(default)]
    pub replies: Option<Vec<CommentView>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn backend_page_payload_parses() {
        let raw = r#"{
            "items": [{
                "id": "c1",
                "content": "[deleted]",
                "author_id": "u1",
                "post_id": "p1",
                "parent_id": null,
                "child_ids": ["c2"],
                "vote_count": -1,
                "reply_count": 4,
                "is_deleted": true,
                "is_edited": false,
                "created_at": "2024-01-01T00:00:00.000000Z",
                "updated_at": "2024-01-02T00:00:00.000000Z"
            }],
            "total": 7,
            "page": 1,
            "limit": 1,
            "total_pages": 7,
            "has_more": true
        }"#;
        let page: Page<CommentView> = serde_json::from_str(raw).unwrap();
        assert_eq!(page.items[0].child_ids, vec!["c2".to_string()]);
        assert_eq!(page.items[0].edited_at, None);
        assert!(page.has_more);
        assert_eq!(page.total_pages, 7);
    }
}
