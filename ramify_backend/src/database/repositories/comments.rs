use crate::database::models::{CommentRecord, CommentSort};
use anyhow::Result;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const COMMENT_COLUMNS: &str = "id, post_id, parent_id, author_id, content, vote_count, reply_count, \
     is_deleted, is_edited, created_at, updated_at, edited_at";

pub(super) struct SqliteCommentRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

fn map_comment(row: &Row<'_>) -> rusqlite::Result<CommentRecord> {
    Ok(CommentRecord {
        id: row.get(0)?,
        post_id: row.get(1)?,
        parent_id: row.get(2)?,
        author_id: row.get(3)?,
        content: row.get(4)?,
        vote_count: row.get(5)?,
        reply_count: row.get(6)?,
        is_deleted: row.get::<_, i64>(7)? != 0,
        is_edited: row.get::<_, i64>(8)? != 0,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
        edited_at: row.get(11)?,
    })
}

fn order_clause(sort: CommentSort) -> &'static str {
    match sort {
        CommentSort::Newest => "ORDER BY created_at DESC, rowid DESC",
        CommentSort::Top => "ORDER BY vote_count DESC, created_at DESC, rowid DESC",
    }
}

impl<'conn> super::CommentRepository for SqliteCommentRepository<'conn> {
    fn create(&self, record: &CommentRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO comments (id, post_id, parent_id, author_id, content, vote_count, reply_count,
                                  is_deleted, is_edited, created_at, updated_at, edited_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                record.id,
                record.post_id,
                record.parent_id,
                record.author_id,
                record.content,
                record.vote_count,
                record.reply_count,
                record.is_deleted as i64,
                record.is_edited as i64,
                record.created_at,
                record.updated_at,
                record.edited_at,
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<CommentRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?1"),
                params![id],
                map_comment,
            )
            .optional()?)
    }

    fn get_many(&self, ids: &[String]) -> Result<Vec<CommentRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id IN ({placeholders})"
        ))?;
        let rows = stmt.query_map(params_from_iter(ids.iter()), map_comment)?;
        let mut comments = Vec::new();
        for row in rows {
            comments.push(row?);
        }
        Ok(comments)
    }

    fn list_for_post(&self, post_id: &str) -> Result<Vec<CommentRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = ?1 ORDER BY created_at ASC, rowid ASC"
        ))?;
        let rows = stmt.query_map(params![post_id], map_comment)?;
        let mut comments = Vec::new();
        for row in rows {
            comments.push(row?);
        }
        Ok(comments)
    }

    fn list_by_parent(
        &self,
        post_id: &str,
        parent_id: Option<&str>,
        sort: CommentSort,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CommentRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = ?1 AND parent_id IS ?2 {} LIMIT ?3 OFFSET ?4",
            order_clause(sort)
        ))?;
        let rows = stmt.query_map(
            params![post_id, parent_id, limit as i64, offset as i64],
            map_comment,
        )?;
        let mut comments = Vec::new();
        for row in rows {
            comments.push(row?);
        }
        Ok(comments)
    }

    fn count_by_parent(&self, post_id: &str, parent_id: Option<&str>) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM comments WHERE post_id = ?1 AND parent_id IS ?2",
            params![post_id, parent_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn list_live_children(&self, parent_id: &str) -> Result<Vec<CommentRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE parent_id = ?1 AND is_deleted = 0 {}",
            order_clause(CommentSort::Newest)
        ))?;
        let rows = stmt.query_map(params![parent_id], map_comment)?;
        let mut comments = Vec::new();
        for row in rows {
            comments.push(row?);
        }
        Ok(comments)
    }

    fn append_child(&self, parent_id: &str, child_id: &str) -> Result<i64> {
        let position = self.conn.query_row(
            r#"
            INSERT INTO comment_children (parent_id, child_id, position)
            SELECT ?1, ?2, COALESCE(MAX(position), -1) + 1
            FROM comment_children
            WHERE parent_id = ?1
            RETURNING position
            "#,
            params![parent_id, child_id],
            |row| row.get(0),
        )?;
        Ok(position)
    }

    fn child_ids(&self, parent_id: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT child_id
            FROM comment_children
            WHERE parent_id = ?1
            ORDER BY position ASC
            "#,
        )?;
        let rows = stmt.query_map(params![parent_id], |row| row.get::<_, String>(0))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    fn child_ids_page(&self, parent_id: &str, offset: usize, limit: usize) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT child_id
            FROM comment_children
            WHERE parent_id = ?1
            ORDER BY position ASC
            LIMIT ?2 OFFSET ?3
            "#,
        )?;
        let rows = stmt.query_map(params![parent_id, limit as i64, offset as i64], |row| {
            row.get::<_, String>(0)
        })?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    fn child_count(&self, parent_id: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM comment_children WHERE parent_id = ?1",
            params![parent_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn increment_reply_count(&self, id: &str) -> Result<Option<Option<String>>> {
        Ok(self
            .conn
            .query_row(
                r#"
                UPDATE comments
                SET reply_count = reply_count + 1
                WHERE id = ?1
                RETURNING parent_id
                "#,
                params![id],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?)
    }

    fn raise_reply_count(&self, id: &str, floor: i64) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE comments SET reply_count = ?2 WHERE id = ?1 AND reply_count < ?2",
            params![id, floor],
        )?;
        Ok(changed > 0)
    }

    fn update_content(&self, id: &str, content: &str, edited_at: &str) -> Result<bool> {
        let changed = self.conn.execute(
            r#"
            UPDATE comments
            SET content = ?2, is_edited = 1, edited_at = ?3, updated_at = ?3
            WHERE id = ?1 AND is_deleted = 0
            "#,
            params![id, content, edited_at],
        )?;
        Ok(changed > 0)
    }

    fn tombstone(&self, id: &str, placeholder: &str, updated_at: &str) -> Result<bool> {
        let changed = self.conn.execute(
            r#"
            UPDATE comments
            SET is_deleted = 1, content = ?2, updated_at = ?3
            WHERE id = ?1 AND is_deleted = 0
            "#,
            params![id, placeholder, updated_at],
        )?;
        Ok(changed > 0)
    }

    fn set_vote_count(&self, id: &str, vote_count: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE comments SET vote_count = ?2 WHERE id = ?1",
            params![id, vote_count],
        )?;
        Ok(())
    }
}
