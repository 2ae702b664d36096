use crate::api;
use crate::bootstrap::{self, BootstrapResources};
use crate::collaborators::{Collaborators, LocalDirectory};
use crate::comments::CommentService;
use crate::config::RamifyConfig;
use crate::database::Database;
use crate::reader::TreeReader;
use crate::votes::VoteLedger;
use anyhow::Result;

/// Bootstraps the backend once and hands out cloned handles for whichever
/// entrypoint (CLI subcommand, REST server) needs them.
pub struct RamifyNode {
    config: RamifyConfig,
    bootstrap: BootstrapResources,
}

impl RamifyNode {
    pub fn start(config: RamifyConfig) -> Result<Self> {
        let bootstrap = bootstrap::initialize(&config)?;

        tracing::info!(
            directories_created = ?bootstrap.directories_created,
            database_initialized = bootstrap.database_initialized,
            db_path = %config.paths.db_path.display(),
            "ramify node initialized"
        );

        Ok(Self { config, bootstrap })
    }

    /// Returns a snapshot of the node's reusable handles.
    pub fn snapshot(&self) -> NodeSnapshot {
        let database = self.bootstrap.database.clone();
        let collaborators = Collaborators::local(database.clone());
        NodeSnapshot {
            config: self.config.clone(),
            directory: LocalDirectory::new(database.clone()),
            comments: CommentService::new(
                database.clone(),
                collaborators.clone(),
                self.config.comments,
            ),
            reader: TreeReader::new(database.clone(), collaborators, self.config.comments),
            votes: VoteLedger::new(database.clone()),
            database,
        }
    }

    /// Runs the REST API server until shutdown.
    pub async fn run_http_server(&self) -> Result<()> {
        api::serve_http(self.snapshot()).await
    }

    pub fn database(&self) -> Database {
        self.bootstrap.database.clone()
    }
}

/// Cloned service handles, cheap to pass around.
#[derive(Clone)]
pub struct NodeSnapshot {
    pub config: RamifyConfig,
    pub database: Database,
    pub directory: LocalDirectory,
    pub comments: CommentService,
    pub reader: TreeReader,
    pub votes: VoteLedger,
}
