//! Offline repair for ancestor reply counts.
//!
//! Reply-count propagation after a comment insert is not atomic, so a crash
//! midway leaves some ancestors under-counted. This pass recounts descendants
//! from the stored parent links and raises any stored count that fell short.
//! Counts are never lowered.

use crate::database::repositories::CommentRepository;
use crate::database::Database;
use crate::error::CommentResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub post_id: String,
    pub examined: usize,
    pub repaired: usize,
}

pub fn reconcile_reply_counts(database: &Database, post_id: &str) -> CommentResult<ReconcileReport> {
    let records = database.with_repositories(|repos| repos.comments().list_for_post(post_id))?;

    let parents: HashMap<&str, Option<&str>> = records
        .iter()
        .map(|record| (record.id.as_str(), record.parent_id.as_deref()))
        .collect();
    let mut descendants: HashMap<&str, i64> = HashMap::new();
    for record in &records {
        let mut cursor = record.parent_id.as_deref();
        let mut hops = 0;
        while let Some(ancestor) = cursor {
            *descendants.entry(ancestor).or_default() += 1;
            cursor = parents.get(ancestor).copied().flatten();
            hops += 1;
            if hops > records.len() {
                tracing::warn!(post_id = %post_id, comment_id = %record.id, "parent cycle detected");
                break;
            }
        }
    }

    let mut repaired = 0;
    for record in &records {
        let expected = descendants.get(record.id.as_str()).copied().unwrap_or(0);
        if record.reply_count >= expected {
            continue;
        }
        let raised = database
            .with_repositories(|repos| repos.comments().raise_reply_count(&record.id, expected))?;
        if raised {
            tracing::info!(
                comment_id = %record.id,
                stored = record.reply_count,
                expected,
                "reply count repaired"
            );
            repaired += 1;
        }
    }

    Ok(ReconcileReport {
        post_id: post_id.to_string(),
        examined: records.len(),
        repaired,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{Collaborators, CreatePostInput, LocalDirectory};
    use crate::comments::{CommentService, CreateCommentInput};
    use crate::config::CommentConfig;

    #[test]
    fn under_counted_ancestors_are_raised() {
        let database = Database::open_in_memory().unwrap();
        let post = LocalDirectory::new(database.clone())
            .create_post(
                "op",
                CreatePostInput {
                    title: "Repair".into(),
                    community_id: None,
                },
            )
            .unwrap();
        let service = CommentService::new(
            database.clone(),
            Collaborators::local(database.clone()),
            CommentConfig::default(),
        );
        let mut parent: Option<String> = None;
        let mut chain = Vec::new();
        for depth in 0..4 {
            let id = service
                .create_comment(CreateCommentInput {
                    author_id: "alice".into(),
                    post_id: post.id.clone(),
                    parent_id: parent.clone(),
                    content: format!("depth {depth}"),
                })
                .unwrap()
                .id;
            parent = Some(id.clone());
            chain.push(id);
        }

        // Simulate a propagation that stopped after the first ancestor.
        database
            .with_conn(|conn| {
                conn.execute(
                    "UPDATE comments SET reply_count = reply_count - 1 WHERE id IN (?1, ?2)",
                    rusqlite::params![chain[0], chain[1]],
                )?;
                Ok(())
            })
            .unwrap();
        assert_eq!(service.get_record(&chain[0]).unwrap().reply_count, 2);

        let report = reconcile_reply_counts(&database, &post.id).unwrap();
        assert_eq!(report.examined, 4);
        assert_eq!(report.repaired, 2);
        let counts: Vec<i64> = chain
            .iter()
            .map(|id| service.get_record(id).unwrap().reply_count)
            .collect();
        assert_eq!(counts, vec![3, 2, 1, 0]);

        let again = reconcile_reply_counts(&database, &post.id).unwrap();
        assert_eq!(again.repaired, 0);
    }

    #[test]
    fn over_counts_are_left_alone() {
        let database = Database::open_in_memory().unwrap();
        let post = LocalDirectory::new(database.clone())
            .create_post(
                "op",
                CreatePostInput {
                    title: "Repair".into(),
                    community_id: None,
                },
            )
            .unwrap();
        let service = CommentService::new(
            database.clone(),
            Collaborators::local(database.clone()),
            CommentConfig::default(),
        );
        let id = service
            .create_comment(CreateCommentInput {
                author_id: "alice".into(),
                post_id: post.id.clone(),
                parent_id: None,
                content: "lonely".into(),
            })
            .unwrap()
            .id;
        database
            .with_conn(|conn| {
                conn.execute("UPDATE comments SET reply_count = 9 WHERE id = ?1", [&id])?;
                Ok(())
            })
            .unwrap();

        let report = reconcile_reply_counts(&database, &post.id).unwrap();
        assert_eq!(report.repaired, 0);
        assert_eq!(service.get_record(&id).unwrap().reply_count, 9);
    }
}
