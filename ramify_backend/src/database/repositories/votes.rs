use crate::database::models::{VoteDirection, VoteTargetKind};
use anyhow::Result;
use rusqlite::{params, Connection};

pub(super) struct SqliteVoteRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

impl<'conn> super::VoteRepository for SqliteVoteRepository<'conn> {
    fn cast(
        &self,
        kind: VoteTargetKind,
        target_id: &str,
        voter_id: &str,
        direction: VoteDirection,
        created_at: &str,
    ) -> Result<()> {
        // One row per (target, voter): switching sides overwrites the row, so
        // a voter can never sit in both sets.
        self.conn.execute(
            r#"
            INSERT INTO votes (target_kind, target_id, voter_id, direction, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(target_kind, target_id, voter_id) DO UPDATE SET
                direction = excluded.direction,
                created_at = CASE
                    WHEN votes.direction = excluded.direction THEN votes.created_at
                    ELSE excluded.created_at
                END
            "#,
            params![
                kind.as_str(),
                target_id,
                voter_id,
                direction.as_i64(),
                created_at
            ],
        )?;
        Ok(())
    }

    fn clear(&self, kind: VoteTargetKind, target_id: &str, voter_id: &str) -> Result<bool> {
        let removed = self.conn.execute(
            r#"
            DELETE FROM votes
            WHERE target_kind = ?1 AND target_id = ?2 AND voter_id = ?3
            "#,
            params![kind.as_str(), target_id, voter_id],
        )?;
        Ok(removed > 0)
    }

    fn voters(
        &self,
        kind: VoteTargetKind,
        target_id: &str,
        direction: VoteDirection,
    ) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT voter_id
            FROM votes
            WHERE target_kind = ?1 AND target_id = ?2 AND direction = ?3
            ORDER BY voter_id ASC
            "#,
        )?;
        let rows = stmt.query_map(
            params![kind.as_str(), target_id, direction.as_i64()],
            |row| row.get::<_, String>(0),
        )?;
        let mut voters = Vec::new();
        for row in rows {
            voters.push(row?);
        }
        Ok(voters)
    }
}
