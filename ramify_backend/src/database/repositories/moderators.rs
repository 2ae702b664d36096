use anyhow::Result;
use rusqlite::{params, Connection};

pub(super) struct SqliteModeratorRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

impl<'conn> super::ModeratorRepository for SqliteModeratorRepository<'conn> {
    fn add(&self, community_id: &str, user_id: &str, added_at: &str) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR IGNORE INTO community_moderators (community_id, user_id, added_at)
            VALUES (?1, ?2, ?3)
            "#,
            params![community_id, user_id, added_at],
        )?;
        Ok(())
    }

    fn remove(&self, community_id: &str, user_id: &str) -> Result<()> {
        self.conn.execute(
            "DELETE FROM community_moderators WHERE community_id = ?1 AND user_id = ?2",
            params![community_id, user_id],
        )?;
        Ok(())
    }

    fn is_moderator(&self, community_id: &str, user_id: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            r#"
            SELECT COUNT(*)
            FROM community_moderators
            WHERE community_id = ?1 AND user_id = ?2
            "#,
            params![community_id, user_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}
