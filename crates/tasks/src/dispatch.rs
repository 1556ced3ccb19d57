use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    error::{Error, Result},
    store::TaskStore,
};

/// A decoded inline-button action.
///
/// Button tokens (`done_<id>`, `delete_<id>`) are decoded once here at the
/// boundary; everything downstream dispatches on the variant instead of
/// re-parsing strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    Complete(i64),
    Delete(i64),
}

impl TaskAction {
    /// Decode a raw callback token. Unknown verbs and non-numeric ids are
    /// rejected without touching the store.
    pub fn decode(token: &str) -> Result<Self> {
        let (verb, id) = if let Some(id) = token.strip_prefix("done_") {
            (Self::Complete as fn(i64) -> Self, id)
        } else if let Some(id) = token.strip_prefix("delete_") {
            (Self::Delete as fn(i64) -> Self, id)
        } else {
            return Err(Error::invalid_action(token));
        };
        let id: i64 = id.parse().map_err(|_| Error::invalid_action(token))?;
        Ok(verb(id))
    }

    /// The token carried by the inline button for this action.
    #[must_use]
    pub fn token(&self) -> String {
        match self {
            Self::Complete(id) => format!("done_{id}"),
            Self::Delete(id) => format!("delete_{id}"),
        }
    }

    #[must_use]
    pub fn task_id(&self) -> i64 {
        match self {
            Self::Complete(id) | Self::Delete(id) => *id,
        }
    }
}

/// What applying an action did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The task was completed or deleted by this call.
    Applied,
    /// The task was already resolved (or never existed). Benign: the
    /// gateway may deliver the same button press more than once.
    NoOp,
}

/// Applies complete/delete actions to stored tasks.
pub struct Dispatcher {
    store: Arc<dyn TaskStore>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    /// Apply a decoded action. Never errors on redelivery: a second apply
    /// of the same action reports [`ActionOutcome::NoOp`].
    pub async fn apply(&self, action: TaskAction) -> Result<ActionOutcome> {
        let applied = match action {
            TaskAction::Complete(id) => self.store.set_completed(id).await?,
            TaskAction::Delete(id) => self.store.delete(id).await?,
        };
        if applied {
            info!(task_id = action.task_id(), ?action, "task action applied");
            Ok(ActionOutcome::Applied)
        } else {
            debug!(
                task_id = action.task_id(),
                ?action,
                "task already resolved, ignoring redelivered action"
            );
            Ok(ActionOutcome::NoOp)
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        store::SqliteTaskStore,
        task::{Attachment, NewTask},
    };

    async fn memory_store() -> Arc<dyn TaskStore> {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
        SqliteTaskStore::init(&pool).await.unwrap();
        Arc::new(SqliteTaskStore::new(pool))
    }

    async fn seed(store: &Arc<dyn TaskStore>, title: &str) -> i64 {
        store
            .create(NewTask {
                owner_id: 1,
                title: title.into(),
                attachment: Attachment::None,
            })
            .await
            .unwrap()
    }

    #[test]
    fn decode_valid_tokens() {
        assert_eq!(TaskAction::decode("done_42").unwrap(), TaskAction::Complete(42));
        assert_eq!(TaskAction::decode("delete_7").unwrap(), TaskAction::Delete(7));
    }

    #[test]
    fn decode_rejects_malformed_tokens() {
        for token in ["done_", "done_abc", "nuke_42", "42", "", "delete_1_2"] {
            let err = TaskAction::decode(token).unwrap_err();
            assert!(matches!(err, Error::InvalidAction { .. }), "{token:?}");
        }
    }

    #[test]
    fn token_roundtrip() {
        for action in [TaskAction::Complete(3), TaskAction::Delete(12)] {
            assert_eq!(TaskAction::decode(&action.token()).unwrap(), action);
        }
    }

    #[tokio::test]
    async fn complete_twice_applies_once() {
        let store = memory_store().await;
        let id = seed(&store, "water plants").await;
        let dispatcher = Dispatcher::new(Arc::clone(&store));

        let first = dispatcher.apply(TaskAction::Complete(id)).await.unwrap();
        let second = dispatcher.apply(TaskAction::Complete(id)).await.unwrap();
        assert_eq!(first, ActionOutcome::Applied);
        assert_eq!(second, ActionOutcome::NoOp);

        let task = store.get(id).await.unwrap().unwrap();
        assert!(task.completed);
    }

    #[tokio::test]
    async fn delete_after_delete_is_a_noop() {
        let store = memory_store().await;
        let id = seed(&store, "old chore").await;
        let dispatcher = Dispatcher::new(Arc::clone(&store));

        assert_eq!(
            dispatcher.apply(TaskAction::Delete(id)).await.unwrap(),
            ActionOutcome::Applied
        );
        assert_eq!(
            dispatcher.apply(TaskAction::Delete(id)).await.unwrap(),
            ActionOutcome::NoOp
        );
    }

    #[tokio::test]
    async fn actions_on_missing_tasks_are_noops() {
        let store = memory_store().await;
        let dispatcher = Dispatcher::new(store);

        assert_eq!(
            dispatcher.apply(TaskAction::Complete(404)).await.unwrap(),
            ActionOutcome::NoOp
        );
        assert_eq!(
            dispatcher.apply(TaskAction::Delete(404)).await.unwrap(),
            ActionOutcome::NoOp
        );
    }

    #[tokio::test]
    async fn racing_completes_apply_exactly_once() {
        // File-backed database so both workers share state through real
        // connections rather than per-connection in-memory databases.
        let dir = tempfile::tempdir().unwrap();
        let options = sqlx::sqlite::SqliteConnectOptions::new()
            .filename(dir.path().join("race.db"))
            .create_if_missing(true);
        let pool = sqlx::SqlitePool::connect_with(options).await.unwrap();
        SqliteTaskStore::init(&pool).await.unwrap();
        let store: Arc<dyn TaskStore> = Arc::new(SqliteTaskStore::new(pool));

        let id = seed(&store, "raced").await;
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&store)));

        let a = tokio::spawn({
            let d = Arc::clone(&dispatcher);
            async move { d.apply(TaskAction::Complete(id)).await }
        });
        let b = tokio::spawn({
            let d = Arc::clone(&dispatcher);
            async move { d.apply(TaskAction::Complete(id)).await }
        });

        let outcomes = [a.await.unwrap().unwrap(), b.await.unwrap().unwrap()];
        let applied = outcomes
            .iter()
            .filter(|o| **o == ActionOutcome::Applied)
            .count();
        assert_eq!(applied, 1, "exactly one worker flips the flag: {outcomes:?}");
        assert!(store.get(id).await.unwrap().unwrap().completed);
    }
}
