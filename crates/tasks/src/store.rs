use async_trait::async_trait;

use crate::{
    error::{Error, Result},
    task::{Attachment, NewTask, Task},
};

/// Trait for persisting tasks. The dialog engine and the dispatcher only
/// see this seam, so tests can substitute their own implementation.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert a task and return its assigned id.
    async fn create(&self, task: NewTask) -> Result<i64>;

    async fn get(&self, id: i64) -> Result<Option<Task>>;

    /// Non-completed tasks for one owner, newest first by id.
    async fn list_pending(&self, owner_id: i64) -> Result<Vec<Task>>;

    /// Mark a task completed. Returns `false` when the task is missing or
    /// already completed, so redelivered actions stay no-ops.
    async fn set_completed(&self, id: i64) -> Result<bool>;

    /// Remove a task. Returns `false` when nothing was removed.
    async fn delete(&self, id: i64) -> Result<bool>;
}

// ── SQLite-backed implementation ────────────────────────────────────

/// Stores tasks in a SQLite database.
pub struct SqliteTaskStore {
    pool: sqlx::SqlitePool,
}

impl SqliteTaskStore {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the tasks table if it does not exist yet.
    pub async fn init(pool: &sqlx::SqlitePool) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS tasks (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id        INTEGER NOT NULL,
                title           TEXT    NOT NULL,
                attachment_kind TEXT    NOT NULL DEFAULT 'none',
                attachment_ref  TEXT,
                completed       INTEGER NOT NULL DEFAULT 0
            )"#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_tasks_owner_pending ON tasks(owner_id, completed)",
        )
        .execute(pool)
        .await
        .ok();

        Ok(())
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn create(&self, task: NewTask) -> Result<i64> {
        if task.title.trim().is_empty() {
            return Err(Error::EmptyTitle);
        }
        let result = sqlx::query(
            "INSERT INTO tasks (owner_id, title, attachment_kind, attachment_ref) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(task.owner_id)
        .bind(&task.title)
        .bind(task.attachment.kind())
        .bind(task.attachment.reference())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn get(&self, id: i64) -> Result<Option<Task>> {
        let row = sqlx::query_as::<_, TaskRow>("SELECT * FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn list_pending(&self, owner_id: i64) -> Result<Vec<Task>> {
        let rows = sqlx::query_as::<_, TaskRow>(
            "SELECT * FROM tasks WHERE owner_id = ? AND completed = 0 ORDER BY id DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn set_completed(&self, id: i64) -> Result<bool> {
        // Conditional single-statement update: racing redeliveries of the
        // same button press resolve to exactly one affected row.
        let result = sqlx::query("UPDATE tasks SET completed = 1 WHERE id = ? AND completed = 0")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Internal row type for sqlx mapping.
#[derive(sqlx::FromRow)]
struct TaskRow {
    id: i64,
    owner_id: i64,
    title: String,
    attachment_kind: String,
    attachment_ref: Option<String>,
    completed: i64,
}

impl From<TaskRow> for Task {
    fn from(r: TaskRow) -> Self {
        Self {
            id: r.id,
            owner_id: r.owner_id,
            title: r.title,
            attachment: Attachment::from_columns(&r.attachment_kind, r.attachment_ref),
            completed: r.completed != 0,
        }
    }
}
