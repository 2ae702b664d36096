use crate::database::models::UserRecord;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

pub(super) struct SqliteUserRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

impl<'conn> super::UserRepository for SqliteUserRepository<'conn> {
    fn upsert(&self, record: &UserRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO users (id, username, is_deleted, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                username = excluded.username,
                is_deleted = excluded.is_deleted
            "#,
            params![
                record.id,
                record.username,
                record.is_deleted as i64,
                record.created_at
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<UserRecord>> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT id, username, is_deleted, created_at
                FROM users
                WHERE id = ?1
                "#,
                params![id],
                |row| {
                    Ok(UserRecord {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        is_deleted: row.get::<_, i64>(2)? != 0,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()?)
    }
}
