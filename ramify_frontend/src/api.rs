use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::{Client, Response};
use reqwest::Url;

use crate::models::{CommentDetails, CommentView, ErrorResponse, Page};

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base = sanitize_base_url(base_url.into())?;
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            base_url: base,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn list_comments(
        &self,
        post_id: &str,
        parent_id: Option<&str>,
        page: usize,
        limit: usize,
    ) -> Result<Page<CommentView>> {
        let mut url = self.url(&format!("/posts/{post_id}/comments"))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("page", &page.to_string())
                .append_pair("limit", &limit.to_string());
            if let Some(parent_id) = parent_id {
                query.append_pair("parent_id", parent_id);
            }
        }
        let response = checked(self.client.get(url).send()?)?;
        Ok(response.json()?)
    }

    pub fn list_direct_replies(
        &self,
        comment_id: &str,
        page: usize,
        limit: usize,
    ) -> Result<Page<CommentView>> {
        let mut url = self.url(&format!("/comments/{comment_id}/replies"))?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("limit", &limit.to_string());
        let response = checked(self.client.get(url).send()?)?;
        Ok(response.json()?)
    }

    /// Walks every page of a post's comments under one parent.
    pub fn all_comments(
        &self,
        post_id: &str,
        parent_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CommentView>> {
        collect_pages(|page| self.list_comments(post_id, parent_id, page, limit))
    }

    /// Walks every page of a comment's direct replies.
    pub fn all_direct_replies(&self, comment_id: &str, limit: usize) -> Result<Vec<CommentView>> {
        collect_pages(|page| self.list_direct_replies(comment_id, page, limit))
    }

    pub fn get_comment(&self, comment_id: &str, include_children: bool) -> Result<CommentDetails> {
        let mut url = self.url(&format!("/comments/{comment_id}"))?;
        if include_children {
            url.query_pairs_mut().append_pair("include_children", "true");
        }
        let response = checked(self.client.get(url).send()?)?;
        Ok(response.json()?)
    }

    /// Appends `path` to the base URL, keeping any path prefix the base carries.
    fn url(&self, path: &str) -> Result<Url> {
        let joined = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        Url::parse(&joined).context("invalid request URL")
    }
}

/// Requests pages from 1 upward until the server reports no more.
fn collect_pages<T, F>(mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(usize) -> Result<Page<T>>,
{
    let mut items = Vec::new();
    let mut page = 1;
    loop {
        let batch = fetch(page)?;
        items.extend(batch.items);
        if !batch.has_more {
            break;
        }
        page += 1;
    }
    Ok(items)
}

/// Turns a non-2xx response into an error carrying the server's message.
fn checked(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .json::<ErrorResponse>()
        .map(|body| body.message)
        .unwrap_or_else(|_| status.to_string());
    anyhow::bail!("request failed ({status}): {message}")
}

fn sanitize_base_url(mut base: String) -> Result<String> {
    if !base.starts_with("http://") && !base.starts_with("https://") {
        base = format!("http://{base}");
    }
    while base.ends_with('/') {
        base.pop();
    }
    let _ = Url::parse(&base).context("invalid base URL")?;
    Ok(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn base_url_gets_scheme_and_loses_trailing_slash() {
        assert_eq!(
            sanitize_base_url("localhost:8080/".into()).unwrap(),
            "http://localhost:8080"
        );
        assert_eq!(
            sanitize_base_url("https://example.org".into()).unwrap(),
            "https://example.org"
        );
    }

    #[test]
    fn paths_join_onto_base() {
        let client = ApiClient::new("http://127.0.0.1:9000").unwrap();
        let url = client.url("/comments/abc/replies").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/comments/abc/replies");
    }

    #[test]
    fn paths_keep_the_base_prefix() {
        let client = ApiClient::new("http://host:9000/api/v1/").unwrap();
        let url = client.url("/comments/abc/replies").unwrap();
        assert_eq!(url.as_str(), "http://host:9000/api/v1/comments/abc/replies");
        let url = client.url("posts/p1/comments").unwrap();
        assert_eq!(url.as_str(), "http://host:9000/api/v1/posts/p1/comments");
    }

    fn page_of(items: Vec<u32>, page: usize, has_more: bool) -> Page<u32> {
        Page {
            total: 0,
            limit: items.len(),
            total_pages: 0,
            items,
            page,
            has_more,
        }
    }

    #[test]
    fn pages_are_walked_until_the_last_one() {
        let mut requested = Vec::new();
        let items = collect_pages(|page| {
            requested.push(page);
            Ok(match page {
                1 => page_of(vec![1, 2], 1, true),
                2 => page_of(vec![3, 4], 2, true),
                _ => page_of(vec![5], page, false),
            })
        })
        .unwrap();
        assert_eq!(items, vec![1, 2, 3, 4, 5]);
        assert_eq!(requested, vec![1, 2, 3]);
    }

    #[test]
    fn a_failed_page_fails_the_walk() {
        let result: Result<Vec<u32>> = collect_pages(|page| {
            if page == 2 {
                anyhow::bail!("server went away");
            }
            Ok(page_of(vec![1], page, true))
        });
        assert!(result.is_err());
    }
}
