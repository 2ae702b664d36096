use crate::database::models::{VoteDirection, VoteTargetKind};
use crate::database::repositories::{
    CommentRepository, PostRepository, SqliteRepositories, VoteRepository,
};
use crate::database::Database;
use crate::error::{CommentError, CommentResult};
use crate::utils::now_utc_iso;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A votable node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteTarget {
    pub kind: VoteTargetKind,
    pub id: String,
}

impl VoteTarget {
    pub fn comment(id: impl Into<String>) -> Self {
        Self {
            kind: VoteTargetKind::Comment,
            id: id.into(),
        }
    }

    pub fn post(id: impl Into<String>) -> Self {
        Self {
            kind: VoteTargetKind::Post,
            id: id.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub upvoters: BTreeSet<String>,
    pub downvoters: BTreeSet<String>,
    pub vote_count: i64,
}

enum NodeState {
    Missing,
    Tombstoned,
    Live,
}

enum Outcome {
    Missing,
    Tombstoned,
    Applied(VoteTally),
}

enum Mutation {
    Cast(VoteDirection),
    Clear,
}

/// Upvote/downvote bookkeeping for comments and posts alike.
///
/// Every mutation runs in one transaction under the connection lock: the vote
/// row change and the recomputed `vote_count` land together.
#[derive(Clone)]
pub struct VoteLedger {
    database: Database,
}

impl VoteLedger {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub fn upvote(&self, target: &VoteTarget, user_id: &str) -> CommentResult<VoteTally> {
        self.apply(target, user_id, Mutation::Cast(VoteDirection::Up))
    }

    pub fn downvote(&self, target: &VoteTarget, user_id: &str) -> CommentResult<VoteTally> {
        self.apply(target, user_id, Mutation::Cast(VoteDirection::Down))
    }

    /// Drops the user's vote, if any. Allowed on tombstoned nodes.
    pub fn remove_vote(&self, target: &VoteTarget, user_id: &str) -> CommentResult<VoteTally> {
        self.apply(target, user_id, Mutation::Clear)
    }

    pub fn tally(&self, target: &VoteTarget) -> CommentResult<VoteTally> {
        let tally = self.database.with_repositories(|repos| {
            match node_state(&repos, target)? {
                NodeState::Missing => Ok(None),
                _ => Ok(Some(read_tally(&repos, target)?)),
            }
        })?;
        tally.ok_or_else(|| CommentError::not_found(target.kind.as_str(), &target.id))
    }

    fn apply(
        &self,
        target: &VoteTarget,
        user_id: &str,
        mutation: Mutation,
    ) -> CommentResult<VoteTally> {
        if user_id.trim().is_empty() {
            return Err(CommentError::Validation("voter id may not be empty".into()));
        }
        let outcome = self.database.with_repositories(|repos| {
            let tx = repos.conn().unchecked_transaction()?;
            let state = node_state(&repos, target)?;
            let outcome = match (state, &mutation) {
                (NodeState::Missing, _) => Outcome::Missing,
                (NodeState::Tombstoned, Mutation::Cast(_)) => Outcome::Tombstoned,
                (_, Mutation::Cast(direction)) => {
                    repos
                        .votes()
                        .cast(target.kind, &target.id, user_id, *direction, &now_utc_iso())?;
                    Outcome::Applied(store_tally(&repos, target)?)
                }
                (_, Mutation::Clear) => {
                    repos.votes().clear(target.kind, &target.id, user_id)?;
                    Outcome::Applied(store_tally(&repos, target)?)
                }
            };
            tx.commit()?;
            Ok(outcome)
        })?;

        match outcome {
            Outcome::Missing => Err(CommentError::not_found(target.kind.as_str(), &target.id)),
            Outcome::Tombstoned => Err(CommentError::InvalidState(format!(
                "{} {} is deleted",
                target.kind.as_str(),
                target.id
            ))),
            Outcome::Applied(tally) => {
                tracing::debug!(
                    kind = target.kind.as_str(),
                    target_id = %target.id,
                    user_id = %user_id,
                    vote_count = tally.vote_count,
                    "vote recorded"
                );
                Ok(tally)
            }
        }
    }
}

fn node_state(repos: &SqliteRepositories<'_>, target: &VoteTarget) -> Result<NodeState> {
    let deleted = match target.kind {
        VoteTargetKind::Comment => repos.comments().get(&target.id)?.map(|c| c.is_deleted),
        VoteTargetKind::Post => repos.posts().get(&target.id)?.map(|p| p.is_deleted),
    };
    Ok(match deleted {
        None => NodeState::Missing,
        Some(true) => NodeState::Tombstoned,
        Some(false) => NodeState::Live,
    })
}

fn read_tally(repos: &SqliteRepositories<'_>, target: &VoteTarget) -> Result<VoteTally> {
    let votes = repos.votes();
    let upvoters = votes.voters(target.kind, &target.id, VoteDirection::Up)?;
    let downvoters = votes.voters(target.kind, &target.id, VoteDirection::Down)?;
    Ok(VoteTally {
        vote_count: upvoters.len() as i64 - downvoters.len() as i64,
        upvoters: upvoters.into_iter().collect(),
        downvoters: downvoters.into_iter().collect(),
    })
}

/// Recomputes the tally from the vote rows and writes `vote_count` back.
fn store_tally(repos: &SqliteRepositories<'_>, target: &VoteTarget) -> Result<VoteTally> {
    let tally = read_tally(repos, target)?;
    match target.kind {
        VoteTargetKind::Comment => repos.comments().set_vote_count(&target.id, tally.vote_count)?,
        VoteTargetKind::Post => repos.posts().set_vote_count(&target.id, tally.vote_count)?,
    }
    Ok(tally)
}
