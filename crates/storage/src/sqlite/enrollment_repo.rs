use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, ser};
use crate::repository::{EnrollmentRepository, StorageError, decode_list, encode_list};

#[async_trait::async_trait]
impl EnrollmentRepository for SqliteRepository {
    async fn load_list(&self, key: &str) -> Result<Vec<String>, StorageError> {
        let row = sqlx::query("SELECT value FROM enrollments WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        match row {
            Some(row) => decode_list(&row.try_get::<String, _>("value").map_err(ser)?),
            None => Ok(Vec::new()),
        }
    }

    async fn store_list(&self, key: &str, items: &[String]) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO enrollments (key, value)
            VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            ",
        )
        .bind(key)
        .bind(encode_list(items)?)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }
}
