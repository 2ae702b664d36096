use crate::database::models::PostRecord;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

pub(super) struct SqlitePostRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

impl<'conn> super::PostRepository for SqlitePostRepository<'conn> {
    fn create(&self, record: &PostRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO posts (id, author_id, community_id, title, is_deleted, comment_count, vote_count, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                record.id,
                record.author_id,
                record.community_id,
                record.title,
                record.is_deleted as i64,
                record.comment_count,
                record.vote_count,
                record.created_at
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<PostRecord>> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT id, author_id, community_id, title, is_deleted, comment_count, vote_count, created_at
                FROM posts
                WHERE id = ?1
                "#,
                params![id],
                |row| {
                    Ok(PostRecord {
                        id: row.get(0)?,
                        author_id: row.get(1)?,
                        community_id: row.get(2)?,
                        title: row.get(3)?,
                        is_deleted: row.get::<_, i64>(4)? != 0,
                        comment_count: row.get(5)?,
                        vote_count: row.get(6)?,
                        created_at: row.get(7)?,
                    })
                },
            )
            .optional()?)
    }

    fn set_deleted(&self, id: &str, deleted: bool) -> Result<()> {
        self.conn.execute(
            "UPDATE posts SET is_deleted = ?2 WHERE id = ?1",
            params![id, deleted as i64],
        )?;
        Ok(())
    }

    fn adjust_comment_count(&self, id: &str, delta: i64) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE posts SET comment_count = MAX(comment_count + ?2, 0) WHERE id = ?1",
            params![id, delta],
        )?;
        Ok(changed > 0)
    }

    fn set_vote_count(&self, id: &str, vote_count: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE posts SET vote_count = ?2 WHERE id = ?1",
            params![id, vote_count],
        )?;
        Ok(())
    }
}
