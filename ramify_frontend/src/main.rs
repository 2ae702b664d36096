use std::time::Duration;

use anyhow::{bail, Result};
use chrono::Utc;
use ramify_frontend::app::relative_age;
use ramify_frontend::{init_logging, RenderConfig, RenderRow, ThreadViewer};

fn main() -> Result<()> {
    init_logging();
    let Some(post_id) = std::env::args().nth(1) else {
        bail!("usage: ramify_frontend <post_id>");
    };

    let mut viewer = ThreadViewer::new(RenderConfig::from_env())?;
    viewer.open_post(&post_id);
    if !viewer.wait_idle(Duration::from_secs(30)) {
        log::warn!("some replies were still loading when the view was printed");
    }
    if let Some(error) = &viewer.error {
        bail!("{error}");
    }

    let now = Utc::now();
    for row in viewer.rows() {
        let line = match row {
            RenderRow::Comment {
                id,
                depth,
                author_id,
                content,
                vote_count,
                ..
            } => {
                let age = viewer
                    .tree()
                    .node(&id)
                    .map(|node| format!(" {}", relative_age(&node.comment.created_at, now)))
                    .unwrap_or_default();
                format!("{}[{vote_count:+}] {author_id}{age}: {content}", indent(depth))
            }
            RenderRow::CollapsedBadge {
                depth, reply_count, ..
            } => format!("{}[+{reply_count}]", indent(depth)),
            RenderRow::LoadReplies {
                depth, count, error, ..
            } => match error {
                Some(error) => format!("{}load {count} replies (failed: {error})", indent(depth)),
                None => format!("{}load {count} replies", indent(depth)),
            },
            RenderRow::Loading { depth, .. } => format!("{}loading...", indent(depth)),
            RenderRow::ShowMore {
                depth, remaining, ..
            } => format!("{}show {remaining} more", indent(depth)),
            RenderRow::ContinueThread { parent_id, depth, .. } => {
                format!("{}continue thread -> {parent_id}", indent(depth))
            }
        };
        println!("{line}");
    }
    Ok(())
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}
