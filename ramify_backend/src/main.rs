use anyhow::Result;
use clap::{Parser, Subcommand};
use ramify_backend::config::RamifyConfig;
use ramify_backend::node::RamifyNode;
use ramify_backend::reconcile;
use ramify_backend::telemetry;
use ramify_backend::utils;

#[derive(Parser)]
#[command(author, version, about = "Ramify discussion-thread backend")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (Axum) for REST/API access
    Serve,
    /// Raise under-counted reply counts for every comment of a post
    Reconcile { post_id: String },
    /// Print a post's full comment tree as JSON
    Tree { post_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    utils::print_banner();
    telemetry::init_tracing();

    let args = Args::parse();
    let config = RamifyConfig::from_env()?;
    let node = RamifyNode::start(config)?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => node.run_http_server().await,
        Command::Reconcile { post_id } => {
            let report = reconcile::reconcile_reply_counts(&node.database(), &post_id)?;
            tracing::info!(
                post_id = %report.post_id,
                examined = report.examined,
                repaired = report.repaired,
                "reconciliation finished"
            );
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::Tree { post_id } => {
            let tree = node.snapshot().reader.build_full_tree(&post_id)?;
            println!("{}", serde_json::to_string_pretty(&tree)?);
            Ok(())
        }
    }
}
