//! End-to-end capture flows against the real SQLite store: dialog turns
//! produce a stored task, the pending listing feeds action tokens, and the
//! dispatcher resolves them idempotently.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{sync::Arc, time::Duration};

use {
    taskling_dialog::{AttachmentChoice, DialogController, DialogInput, DialogReply},
    taskling_tasks::{
        ActionOutcome, Attachment, Dispatcher, SqliteTaskStore, TaskAction, TaskStore,
    },
};

const OWNER: i64 = 99;

async fn store() -> Arc<dyn TaskStore> {
    let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
    SqliteTaskStore::init(&pool).await.unwrap();
    Arc::new(SqliteTaskStore::new(pool))
}

async fn capture(controller: &DialogController, title: &str) -> i64 {
    controller.handle(OWNER, DialogInput::Start).await;
    controller
        .handle(OWNER, DialogInput::Text(title.into()))
        .await;
    let reply = controller
        .handle(OWNER, DialogInput::Choice(AttachmentChoice::Skip))
        .await;
    let DialogReply::Saved(task) = reply else {
        panic!("expected Saved, got {reply:?}");
    };
    task.id
}

#[tokio::test]
async fn captured_task_appears_in_pending_and_completes_once() {
    let store = store().await;
    let controller = DialogController::new(Arc::clone(&store), Duration::from_secs(1800));
    let dispatcher = Dispatcher::new(Arc::clone(&store));

    let id = capture(&controller, "Buy milk").await;

    let pending = store.list_pending(OWNER).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].title, "Buy milk");
    assert_eq!(pending[0].attachment, Attachment::None);

    // The renderer's token shape drives the dispatcher.
    let token = TaskAction::Complete(id).token();
    let action = TaskAction::decode(&token).unwrap();
    assert_eq!(dispatcher.apply(action).await.unwrap(), ActionOutcome::Applied);
    // Redelivery of the same press is benign.
    assert_eq!(dispatcher.apply(action).await.unwrap(), ActionOutcome::NoOp);

    assert!(store.list_pending(OWNER).await.unwrap().is_empty());
    // Completed, not deleted.
    assert!(store.get(id).await.unwrap().unwrap().completed);
}

#[tokio::test]
async fn link_capture_then_delete() {
    let store = store().await;
    let controller = DialogController::new(Arc::clone(&store), Duration::from_secs(1800));
    let dispatcher = Dispatcher::new(Arc::clone(&store));

    controller.handle(OWNER, DialogInput::Start).await;
    controller
        .handle(OWNER, DialogInput::Text("Submit report".into()))
        .await;
    controller
        .handle(OWNER, DialogInput::Choice(AttachmentChoice::Link))
        .await;
    let reply = controller
        .handle(
            OWNER,
            DialogInput::Text("https://docs.example/report".into()),
        )
        .await;
    let DialogReply::Saved(task) = reply else {
        panic!("expected Saved, got {reply:?}");
    };
    assert_eq!(
        task.attachment,
        Attachment::Link("https://docs.example/report".into())
    );

    assert_eq!(
        dispatcher.apply(TaskAction::Delete(task.id)).await.unwrap(),
        ActionOutcome::Applied
    );
    assert_eq!(
        dispatcher.apply(TaskAction::Delete(task.id)).await.unwrap(),
        ActionOutcome::NoOp
    );
    assert!(store.get(task.id).await.unwrap().is_none());
}

#[tokio::test]
async fn pending_listing_is_newest_first() {
    let store = store().await;
    let controller = DialogController::new(Arc::clone(&store), Duration::from_secs(1800));

    let first = capture(&controller, "first").await;
    let second = capture(&controller, "second").await;

    let ids: Vec<i64> = store
        .list_pending(OWNER)
        .await
        .unwrap()
        .iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(ids, vec![second, first]);
}
