use std::{sync::Arc, time::Duration};

use {
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info},
};

use taskling_tasks::{Attachment, NewTask, Task, TaskStore};

use crate::{
    classify::{AttachmentPayload, classify},
    error::Error,
    registry::SessionRegistry,
    session::{DialogState, Session},
};

/// How often the background sweep looks for abandoned sessions.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// One inline choice on the attachment step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentChoice {
    Media,
    Link,
    Skip,
    Back,
}

/// One turn of user input, already decoded by the gateway adapter.
#[derive(Debug, Clone)]
pub enum DialogInput {
    /// Entry command: start a new capture dialog.
    Start,
    /// Cancel command: discard the dialog, whatever state it is in.
    Cancel,
    /// A plain text message.
    Text(String),
    /// A tap on the attachment choice keyboard.
    Choice(AttachmentChoice),
    /// Attachment material (photo/video) from a media message.
    Payload(AttachmentPayload),
}

/// What the gateway should tell the user after a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogReply {
    AskTitle,
    AskAttachmentChoice,
    AskMedia,
    AskLink,
    /// The task was persisted and the session destroyed.
    Saved(Task),
    Cancelled,
    /// Input rejected; the state did not change and the user should retry.
    Invalid { message: String },
    /// The store write failed. The session and draft are retained so the
    /// user can repeat the triggering action.
    SaveFailed,
    /// No session is active and the input was not an entry command.
    Ignored,
}

impl DialogReply {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

/// Per-owner finite state machine driving task creation.
///
/// Cheap to clone; all state lives behind `Arc`s. Every turn for an owner
/// runs under that owner's session lock, so turns apply in arrival order.
#[derive(Clone)]
pub struct DialogController {
    store: Arc<dyn TaskStore>,
    sessions: Arc<SessionRegistry>,
}

impl DialogController {
    #[must_use]
    pub fn new(store: Arc<dyn TaskStore>, session_ttl: Duration) -> Self {
        Self {
            store,
            sessions: Arc::new(SessionRegistry::new(session_ttl)),
        }
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Periodically drop abandoned sessions until the token is cancelled.
    pub fn spawn_expiry_sweeper(&self, cancel: CancellationToken) {
        let sessions = Arc::clone(&self.sessions);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        let expired = sessions.sweep();
                        if expired > 0 {
                            debug!(expired, "swept idle dialog sessions");
                        }
                    },
                }
            }
        });
    }

    /// Apply one turn of input for an owner.
    ///
    /// Store failures during finalize come back as
    /// [`DialogReply::SaveFailed`] with the session intact; every other
    /// outcome is a normal reply.
    pub async fn handle(&self, owner_id: i64, input: DialogInput) -> DialogReply {
        let slot = self.sessions.slot(owner_id);
        let mut guard = slot.lock().await;

        // Lazy expiry: an abandoned session is treated as absent.
        if let Some(session) = guard.as_ref()
            && session.expired(self.sessions.ttl())
        {
            debug!(owner_id, "dialog session expired, discarding");
            *guard = None;
        }

        match input {
            DialogInput::Start => {
                // Last-writer-wins: a fresh entry command replaces any
                // dialog already in flight for this owner.
                if guard.is_some() {
                    debug!(owner_id, "restarting dialog over an active session");
                }
                *guard = Some(Session::new());
                DialogReply::AskTitle
            },
            DialogInput::Cancel => {
                if guard.take().is_some() {
                    info!(owner_id, "dialog cancelled");
                    DialogReply::Cancelled
                } else {
                    DialogReply::Ignored
                }
            },
            input => match guard.as_mut() {
                None => {
                    debug!(owner_id, ?input, "no active dialog, ignoring input");
                    DialogReply::Ignored
                },
                Some(_) => self.step(owner_id, &mut guard, input).await,
            },
        }
    }

    /// Advance an active session by one turn. `slot` is guaranteed `Some`.
    async fn step(
        &self,
        owner_id: i64,
        slot: &mut Option<Session>,
        input: DialogInput,
    ) -> DialogReply {
        let Some(session) = slot.as_mut() else {
            return DialogReply::Ignored;
        };
        session.touch();

        match (&session.state, input) {
            (DialogState::AwaitingTitle, DialogInput::Text(text)) => {
                let title = text.trim();
                if title.is_empty() {
                    return DialogReply::invalid("The title can't be empty. What should it be?");
                }
                session.state = DialogState::AwaitingAttachmentChoice {
                    title: title.to_string(),
                };
                DialogReply::AskAttachmentChoice
            },
            (DialogState::AwaitingTitle, _) => {
                DialogReply::invalid("Send the task title as a plain text message.")
            },

            (DialogState::AwaitingAttachmentChoice { title }, DialogInput::Choice(choice)) => {
                let title = title.clone();
                match choice {
                    AttachmentChoice::Media => {
                        session.state = DialogState::AwaitingMediaPayload { title };
                        DialogReply::AskMedia
                    },
                    AttachmentChoice::Link => {
                        session.state = DialogState::AwaitingLinkPayload { title };
                        DialogReply::AskLink
                    },
                    AttachmentChoice::Skip => {
                        self.finalize(owner_id, slot, title, Attachment::None).await
                    },
                    AttachmentChoice::Back => {
                        // Drops the draft attachment choice; the next text
                        // message replaces the title.
                        session.state = DialogState::AwaitingTitle;
                        DialogReply::AskTitle
                    },
                }
            },
            (DialogState::AwaitingAttachmentChoice { .. }, _) => {
                DialogReply::invalid("Pick one of the attachment options below.")
            },

            (DialogState::AwaitingMediaPayload { title }, DialogInput::Payload(payload)) => {
                match classify(&payload) {
                    Ok(attachment @ (Attachment::Photo(_) | Attachment::Video(_))) => {
                        let title = title.clone();
                        self.finalize(owner_id, slot, title, attachment).await
                    },
                    Ok(_) | Err(Error::UnsupportedAttachment) => DialogReply::invalid(
                        "I can't attach that. Send a photo or a video, or go back.",
                    ),
                    Err(e) => {
                        error!(owner_id, error = %e, "attachment classification failed");
                        DialogReply::invalid("Something went wrong with that attachment, try again.")
                    },
                }
            },
            (DialogState::AwaitingMediaPayload { .. }, DialogInput::Choice(AttachmentChoice::Back)) => {
                back_to_choice(session);
                DialogReply::AskAttachmentChoice
            },
            (DialogState::AwaitingMediaPayload { .. }, _) => {
                DialogReply::invalid("Send the photo or video now, or go back.")
            },

            (DialogState::AwaitingLinkPayload { title }, DialogInput::Text(text)) => {
                match classify(&AttachmentPayload::Text(text)) {
                    Ok(attachment @ Attachment::Link(_)) => {
                        let title = title.clone();
                        self.finalize(owner_id, slot, title, attachment).await
                    },
                    _ => DialogReply::invalid(
                        "That doesn't look like a link. It must start with http:// or https://.",
                    ),
                }
            },
            (DialogState::AwaitingLinkPayload { .. }, DialogInput::Choice(AttachmentChoice::Back)) => {
                back_to_choice(session);
                DialogReply::AskAttachmentChoice
            },
            (DialogState::AwaitingLinkPayload { .. }, _) => {
                DialogReply::invalid("Send the link as a text message, or go back.")
            },
        }
    }

    /// Persist the drafted task and destroy the session.
    ///
    /// The session is destroyed only after the write succeeds; on failure
    /// the draft stays in place so the triggering action can be repeated.
    async fn finalize(
        &self,
        owner_id: i64,
        slot: &mut Option<Session>,
        title: String,
        attachment: Attachment,
    ) -> DialogReply {
        let new_task = NewTask {
            owner_id,
            title: title.clone(),
            attachment: attachment.clone(),
        };
        match self.store.create(new_task).await {
            Ok(id) => {
                info!(owner_id, task_id = id, kind = attachment.kind(), "task saved");
                *slot = None;
                DialogReply::Saved(Task {
                    id,
                    owner_id,
                    title,
                    attachment,
                    completed: false,
                })
            },
            Err(e) => {
                error!(owner_id, error = %e, "failed to persist task, keeping draft");
                DialogReply::SaveFailed
            },
        }
    }
}

/// Return a payload-collecting state to the attachment choice step.
fn back_to_choice(session: &mut Session) {
    let title = match &session.state {
        DialogState::AwaitingMediaPayload { title }
        | DialogState::AwaitingLinkPayload { title } => title.clone(),
        _ => return,
    };
    session.state = DialogState::AwaitingAttachmentChoice { title };
}
