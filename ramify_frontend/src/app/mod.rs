use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::api::ApiClient;
use crate::config::RenderConfig;

mod messages;
pub mod state;
mod tasks;
pub mod tree;

pub use messages::AppMessage;
use state::RenderRow;
use tree::CommentTree;

/// Drives a [`CommentTree`] against the backend. Fetches run on worker
/// threads and report back over a channel, which the owner drains with
/// [`ThreadViewer::process_messages`] (typically once per frame).
pub struct ThreadViewer {
    api: ApiClient,
    tree: CommentTree,
    tx: Sender<AppMessage>,
    rx: Receiver<AppMessage>,
    in_flight: usize,
    pub error: Option<String>,
}

impl ThreadViewer {
    pub fn new(config: RenderConfig) -> Result<Self> {
        let api = ApiClient::new(config.api_url.clone())?;
        let (tx, rx) = mpsc::channel();
        Ok(Self {
            api,
            tree: CommentTree::new(config),
            tx,
            rx,
            in_flight: 0,
            error: None,
        })
    }

    pub fn tree(&self) -> &CommentTree {
        &self.tree
    }

    pub fn open_post(&mut self, post_id: &str) {
        self.in_flight += 1;
        tasks::load_roots(
            self.api.clone(),
            self.tx.clone(),
            post_id.to_string(),
            self.tree.config().page_limit,
        );
    }

    /// Re-roots the view at a comment, used by "continue thread" links.
    pub fn open_comment(&mut self, comment_id: &str) {
        self.in_flight += 1;
        tasks::load_focus(self.api.clone(), self.tx.clone(), comment_id.to_string());
    }

    /// "Load N replies" clicked.
    pub fn load_replies(&mut self, comment_id: &str) {
        if let Some(request) = self.tree.request_load(comment_id) {
            self.in_flight += 1;
            tasks::load_replies(
                self.api.clone(),
                self.tx.clone(),
                request.comment_id,
                self.tree.config().page_limit,
            );
        }
    }

    pub fn toggle_collapsed(&mut self, comment_id: &str) -> bool {
        self.tree.toggle_collapsed(comment_id)
    }

    pub fn show_more(&mut self, comment_id: &str) {
        self.tree.show_more(comment_id);
    }

    pub fn rows(&self) -> Vec<RenderRow> {
        self.tree.rows()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }

    /// Applies every message that has already arrived.
    pub fn process_messages(&mut self) {
        while let Ok(message) = self.rx.try_recv() {
            messages::handle_message(self, message);
        }
    }

    /// Blocks until all fetches, including follow-up auto-loads, settle or
    /// `timeout` passes. Returns whether the viewer went idle.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.is_busy() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(message) => messages::handle_message(self, message),
                Err(RecvTimeoutError::Timeout) => return false,
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
        true
    }
}

/// Short relative age such as `5m` or `3d`; the raw string when unparsable.
pub fn relative_age(created_at: &str, now: DateTime<Utc>) -> String {
    let Ok(created) = DateTime::parse_from_rfc3339(created_at) else {
        return created_at.to_string();
    };
    let elapsed = now.signed_duration_since(created.with_timezone(&Utc));
    if elapsed.num_days() > 0 {
        format!("{}d", elapsed.num_days())
    } else if elapsed.num_hours() > 0 {
        format!("{}h", elapsed.num_hours())
    } else if elapsed.num_minutes() > 0 {
        format!("{}m", elapsed.num_minutes())
    } else {
        "now".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn relative_age_picks_the_largest_unit() {
        let now = DateTime::parse_from_rfc3339("2024-03-10T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(relative_age("2024-03-08T11:00:00.000000Z", now), "2d");
        assert_eq!(relative_age("2024-03-10T09:30:00.000000Z", now), "2h");
        assert_eq!(relative_age("2024-03-10T11:55:00.000000Z", now), "5m");
        assert_eq!(relative_age("2024-03-10T12:00:00.000000Z", now), "now");
        assert_eq!(relative_age("yesterday", now), "yesterday");
    }

    #[test]
    fn unknown_comment_load_does_not_count_as_busy() {
        let mut viewer = ThreadViewer::new(RenderConfig::default()).unwrap();
        viewer.load_replies("missing");
        assert!(!viewer.is_busy());
        assert!(viewer.wait_idle(Duration::from_millis(10)));
    }
}
