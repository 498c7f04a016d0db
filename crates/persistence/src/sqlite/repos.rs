//! Repository implementations cho SQLite
//!
//! Raw CRUD trên bảng `card`. Các hàm nhận bất kỳ sqlx executor nào, nên
//! dùng được cả với pool lẫn bên trong một transaction.

use crate::error::{PersistenceError, PersistenceResult};
use crate::sqlite::schema::{CardRow, CREATE_CARD_TABLE};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Executor, Sqlite, SqlitePool};
use std::path::Path;

// ============================================================================
// Card Repository
// ============================================================================

/// Repository cho card table
pub struct CardRepo;

impl CardRepo {
    /// Lấy tất cả rows có cùng id
    pub async fn get_by_id<'e, E>(executor: E, id: i64) -> PersistenceResult<Vec<CardRow>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let rows = sqlx::query_as::<_, CardRow>(
            "SELECT id, number, pin, balance FROM card WHERE id = ?",
        )
        .bind(id)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    /// Kiểm tra id đã tồn tại chưa
    pub async fn contains_id<'e, E>(executor: E, id: i64) -> PersistenceResult<bool>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM card WHERE id = ? LIMIT 1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(row.is_some())
    }

    /// Thêm card mới
    pub async fn insert<'e, E>(executor: E, row: &CardRow) -> PersistenceResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("INSERT INTO card (id, number, pin, balance) VALUES (?, ?, ?, ?)")
            .bind(row.id)
            .bind(&row.number)
            .bind(&row.pin)
            .bind(row.balance)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Cập nhật toàn bộ row theo id
    pub async fn update<'e, E>(executor: E, row: &CardRow) -> PersistenceResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE card SET number = ?, pin = ?, balance = ? WHERE id = ?")
            .bind(&row.number)
            .bind(&row.pin)
            .bind(row.balance)
            .bind(row.id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Card", &row.id.to_string()));
        }
        Ok(())
    }

    /// Chỉ cập nhật balance
    pub async fn update_balance<'e, E>(executor: E, id: i64, balance: i64) -> PersistenceResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE card SET balance = ? WHERE id = ?")
            .bind(balance)
            .bind(id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Card", &id.to_string()));
        }
        Ok(())
    }

    /// Xóa card theo id
    pub async fn delete<'e, E>(executor: E, id: i64) -> PersistenceResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM card WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Card", &id.to_string()));
        }
        Ok(())
    }

    /// Đếm cards
    pub async fn count<'e, E>(executor: E) -> PersistenceResult<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM card")
            .fetch_one(executor)
            .await?;
        Ok(row.0)
    }
}

// ============================================================================
// Database initialization
// ============================================================================

/// Mở file SQLite với đúng một connection cho cả process
pub async fn connect(db_path: &Path) -> PersistenceResult<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Tạo bảng `card` nếu chưa có
pub async fn create_schema(pool: &SqlitePool) -> PersistenceResult<()> {
    sqlx::query(CREATE_CARD_TABLE).execute(pool).await?;
    Ok(())
}
