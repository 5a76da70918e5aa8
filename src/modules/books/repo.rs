use rust_decimal::Decimal;
use sqlx::MySqlPool;

use super::models::Book;

/// Data access for the `books` table.
///
/// Every statement runs on a connection scoped to that statement, acquired
/// from the shared bounded pool and released on all exit paths.
#[derive(Clone)]
pub struct BookRepo {
    pool: MySqlPool,
}

impl BookRepo {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Insert a row and return the generated identifier.
    pub async fn insert(
        &self,
        name: &str,
        description: &str,
        price: Decimal,
        image_url: &str,
    ) -> Result<i64, sqlx::Error> {
        let result =
            sqlx::query("INSERT INTO books (name, description, price, image_url) VALUES (?, ?, ?, ?)")
                .bind(name)
                .bind(description)
                .bind(price)
                .bind(image_url)
                .execute(&self.pool)
                .await?;

        Ok(result.last_insert_id() as i64)
    }

    /// Fetch a single row by id.
    pub async fn get(&self, id: i64) -> Result<Option<Book>, sqlx::Error> {
        sqlx::query_as::<_, Book>(
            "SELECT id, name, description, price, image_url FROM books WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Fetch every row; order unspecified.
    pub async fn list(&self) -> Result<Vec<Book>, sqlx::Error> {
        sqlx::query_as::<_, Book>("SELECT id, name, description, price, image_url FROM books")
            .fetch_all(&self.pool)
            .await
    }

    /// Remove a row; returns `false` when no row matched.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
