use {
    teloxide::types::{
        CallbackQuery, ChatId, InlineKeyboardMarkup, MediaKind, Message, MessageKind, ReplyMarkup,
    },
    tracing::{debug, warn},
};

use {
    taskling_dialog::{
        AttachmentChoice, AttachmentPayload, DialogInput, DialogReply, PhotoVariant,
    },
    taskling_tasks::{ActionOutcome, TaskAction},
};

use crate::{
    render::{
        self, BTN_MY_TASKS, BTN_NEW_TASK, CB_ATTACH_BACK, CB_ATTACH_CANCEL, CB_ATTACH_LINK,
        CB_ATTACH_MEDIA, CB_ATTACH_SKIP,
    },
    state::BotState,
};

/// Handle one inbound message (called from the polling loop).
pub async fn handle_message(msg: Message, state: &BotState) -> anyhow::Result<()> {
    if !msg.chat.is_private() {
        debug!(chat_id = msg.chat.id.0, "ignoring non-private chat");
        return Ok(());
    }
    let chat_id = msg.chat.id;
    let owner_id = chat_id.0;

    // Media first: a photo/video is dialog input regardless of caption.
    if let Some(payload) = message_payload(&msg) {
        let reply = state
            .dialog
            .handle(owner_id, DialogInput::Payload(payload))
            .await;
        return respond(state, chat_id, reply).await;
    }

    let Some(text) = message_text(&msg) else {
        debug!(owner_id, "ignoring non-text, non-media message");
        return Ok(());
    };

    match route_text(text) {
        TextRoute::Greet => {
            let name = msg
                .from
                .as_ref()
                .map(|u| u.first_name.as_str())
                .unwrap_or("there");
            state
                .outbound
                .send_text(
                    chat_id,
                    &format!(
                        "Hi, {name}! ✨\n\nI'm your personal task assistant. \
                         Use the buttons below to capture tasks and check what's pending."
                    ),
                    Some(ReplyMarkup::Keyboard(render::main_keyboard())),
                )
                .await?;
        },
        TextRoute::Help => {
            state
                .outbound
                .send_text(
                    chat_id,
                    "/new — capture a new task\n\
                     /tasks — list pending tasks\n\
                     /cancel — abandon the current capture\n\
                     /help — this message",
                    Some(ReplyMarkup::Keyboard(render::main_keyboard())),
                )
                .await?;
        },
        TextRoute::NewTask => {
            let reply = state.dialog.handle(owner_id, DialogInput::Start).await;
            respond(state, chat_id, reply).await?;
        },
        TextRoute::ListTasks => {
            send_task_list(state, chat_id).await?;
        },
        TextRoute::Cancel => {
            match state.dialog.handle(owner_id, DialogInput::Cancel).await {
                DialogReply::Cancelled => {
                    state
                        .outbound
                        .send_text(
                            chat_id,
                            "Okay, cancelled.",
                            Some(ReplyMarkup::Keyboard(render::main_keyboard())),
                        )
                        .await?;
                },
                _ => {
                    state
                        .outbound
                        .send_text(chat_id, "Nothing to cancel.", None)
                        .await?;
                },
            }
        },
        TextRoute::UnknownCommand => {
            state
                .outbound
                .send_text(chat_id, "I don't know that command. Try /help.", None)
                .await?;
        },
        TextRoute::Capture(t) => {
            let reply = state.dialog.handle(owner_id, DialogInput::Text(t)).await;
            respond(state, chat_id, reply).await?;
        },
    }

    Ok(())
}

/// Handle an inline button press.
pub async fn handle_callback_query(query: CallbackQuery, state: &BotState) -> anyhow::Result<()> {
    let Some(data) = query.data.as_deref() else {
        state.outbound.answer_callback(&query.id, None).await;
        return Ok(());
    };

    let Some(message) = query.message.as_ref() else {
        // Too old for Telegram to hand us the message; just clear the spinner.
        state.outbound.answer_callback(&query.id, None).await;
        return Ok(());
    };
    let chat_id = message.chat().id;
    let message_id = message.id();
    let owner_id = chat_id.0;

    if let Some(input) = decode_choice(data) {
        let reply = state.dialog.handle(owner_id, input).await;
        state.outbound.answer_callback(&query.id, None).await;
        // Edit the prompt in place so the dialog reads as one thread.
        if let Some((text, keyboard)) = reply_text(&reply) {
            if let Err(e) = state
                .outbound
                .edit_text(chat_id, message_id, &text, keyboard)
                .await
            {
                warn!(owner_id, error = %e, "failed to edit dialog prompt, sending instead");
                state.outbound.send_text(chat_id, &text, None).await?;
            }
        }
        return Ok(());
    }

    match TaskAction::decode(data) {
        Ok(action) => match state.dispatcher.apply(action).await {
            Ok(ActionOutcome::Applied) => {
                let confirmation = match action {
                    TaskAction::Complete(_) => "Task completed! 👍",
                    TaskAction::Delete(_) => "Task deleted. 🗑️",
                };
                state.outbound.answer_callback(&query.id, None).await;
                // Media units carry captions, not text, so the edit can
                // fail; fall back to a fresh message.
                if let Err(e) = state
                    .outbound
                    .edit_text(chat_id, message_id, confirmation, None)
                    .await
                {
                    debug!(owner_id, error = %e, "edit failed, sending confirmation");
                    state.outbound.send_text(chat_id, confirmation, None).await?;
                }
            },
            Ok(ActionOutcome::NoOp) => {
                // Redelivered press or already-resolved task: benign.
                state
                    .outbound
                    .answer_callback(&query.id, Some("Already handled."))
                    .await;
            },
            Err(e) => {
                warn!(owner_id, error = %e, "task action failed");
                state
                    .outbound
                    .answer_callback(&query.id, Some("Something went wrong, please try again."))
                    .await;
            },
        },
        Err(e) => {
            warn!(owner_id, data, error = %e, "unrecognized callback token");
            state
                .outbound
                .answer_callback(&query.id, Some("Unrecognized action."))
                .await;
        },
    }

    Ok(())
}

/// Send the pending task list, one display unit per task.
pub async fn send_task_list(state: &BotState, chat_id: ChatId) -> anyhow::Result<()> {
    let tasks = state.store.list_pending(chat_id.0).await?;
    if tasks.is_empty() {
        state
            .outbound
            .send_text(chat_id, "You're all caught up! Nothing pending. ✨", None)
            .await?;
        return Ok(());
    }

    state
        .outbound
        .send_text(chat_id, "Here are your pending tasks:", None)
        .await?;
    for task in &tasks {
        if let Err(e) = state.outbound.send_unit(chat_id, render::render_task(task)).await {
            warn!(task_id = task.id, error = %e, "failed to send task entry");
        }
    }
    Ok(())
}

/// Deliver a dialog reply as a fresh message.
async fn respond(state: &BotState, chat_id: ChatId, reply: DialogReply) -> anyhow::Result<()> {
    // Terminal replies bring the main menu back.
    let menu = matches!(reply, DialogReply::Saved(_) | DialogReply::Cancelled);
    let Some((text, keyboard)) = reply_text(&reply) else {
        debug!(chat_id = chat_id.0, "no reply for this turn");
        return Ok(());
    };
    let markup = if menu {
        Some(ReplyMarkup::Keyboard(render::main_keyboard()))
    } else {
        keyboard.map(ReplyMarkup::InlineKeyboard)
    };
    state.outbound.send_text(chat_id, &text, markup).await?;
    Ok(())
}

/// The user-facing text (and inline keyboard) for a dialog reply.
/// `None` means stay silent.
fn reply_text(reply: &DialogReply) -> Option<(String, Option<InlineKeyboardMarkup>)> {
    match reply {
        DialogReply::AskTitle => Some(("What's the title of your new task?".into(), None)),
        DialogReply::AskAttachmentChoice => Some((
            "Title set! Want to attach anything to this task?".into(),
            Some(render::attachment_keyboard()),
        )),
        DialogReply::AskMedia => Some((
            "Okay, send me the photo or video.".into(),
            Some(render::back_keyboard()),
        )),
        DialogReply::AskLink => Some((
            "Sure, send me the link (full URL).".into(),
            Some(render::back_keyboard()),
        )),
        DialogReply::Saved(task) => Some((format!("✅ Task saved: {}", task.title), None)),
        DialogReply::Cancelled => Some(("Okay, cancelled.".into(), None)),
        DialogReply::Invalid { message } => Some((message.clone(), None)),
        DialogReply::SaveFailed => Some((
            "I couldn't save your task just now. Please try that again.".into(),
            None,
        )),
        DialogReply::Ignored => None,
    }
}

/// Where a plain text message routes. The main-menu buttons are
/// aliases for their slash commands.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TextRoute {
    Greet,
    Help,
    NewTask,
    ListTasks,
    Cancel,
    UnknownCommand,
    Capture(String),
}

fn route_text(text: &str) -> TextRoute {
    match text.trim() {
        "/start" => TextRoute::Greet,
        "/help" => TextRoute::Help,
        "/new" | BTN_NEW_TASK => TextRoute::NewTask,
        "/tasks" | BTN_MY_TASKS => TextRoute::ListTasks,
        "/cancel" => TextRoute::Cancel,
        t if t.starts_with('/') => TextRoute::UnknownCommand,
        t => TextRoute::Capture(t.to_string()),
    }
}

/// Map attachment-step callback data to dialog input.
fn decode_choice(data: &str) -> Option<DialogInput> {
    match data {
        CB_ATTACH_MEDIA => Some(DialogInput::Choice(AttachmentChoice::Media)),
        CB_ATTACH_LINK => Some(DialogInput::Choice(AttachmentChoice::Link)),
        CB_ATTACH_SKIP => Some(DialogInput::Choice(AttachmentChoice::Skip)),
        CB_ATTACH_BACK => Some(DialogInput::Choice(AttachmentChoice::Back)),
        CB_ATTACH_CANCEL => Some(DialogInput::Cancel),
        _ => None,
    }
}

/// Extract plain text from a message.
fn message_text(msg: &Message) -> Option<&str> {
    match &msg.kind {
        MessageKind::Common(common) => match &common.media_kind {
            MediaKind::Text(t) => Some(&t.text),
            _ => None,
        },
        _ => None,
    }
}

/// Extract attachment material (photo/video) from a message.
fn message_payload(msg: &Message) -> Option<AttachmentPayload> {
    let MessageKind::Common(common) = &msg.kind else {
        return None;
    };
    match &common.media_kind {
        MediaKind::Photo(p) => Some(AttachmentPayload::Photo {
            variants: p
                .photo
                .iter()
                .map(|ps| PhotoVariant {
                    file_id: ps.file.id.clone(),
                    width: ps.width,
                    height: ps.height,
                })
                .collect(),
        }),
        MediaKind::Video(v) => Some(AttachmentPayload::Video {
            file_id: v.video.file.id.clone(),
        }),
        _ => None,
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choice_tokens_decode_to_dialog_input() {
        assert!(matches!(
            decode_choice(CB_ATTACH_MEDIA),
            Some(DialogInput::Choice(AttachmentChoice::Media))
        ));
        assert!(matches!(
            decode_choice(CB_ATTACH_SKIP),
            Some(DialogInput::Choice(AttachmentChoice::Skip))
        ));
        assert!(matches!(
            decode_choice(CB_ATTACH_CANCEL),
            Some(DialogInput::Cancel)
        ));
        // Task action tokens are not choices.
        assert!(decode_choice("done_42").is_none());
        assert!(decode_choice("").is_none());
    }

    #[test]
    fn menu_buttons_route_like_their_slash_commands() {
        assert_eq!(route_text(BTN_NEW_TASK), route_text("/new"));
        assert_eq!(route_text(BTN_MY_TASKS), route_text("/tasks"));
        assert_eq!(route_text("  /tasks "), TextRoute::ListTasks);
        assert_eq!(route_text("/bogus"), TextRoute::UnknownCommand);
        assert_eq!(
            route_text("  buy milk "),
            TextRoute::Capture("buy milk".into())
        );
    }

    #[test]
    fn terminal_replies_have_text() {
        let (text, keyboard) = reply_text(&DialogReply::Cancelled).unwrap();
        assert_eq!(text, "Okay, cancelled.");
        assert!(keyboard.is_none());

        let (_, keyboard) = reply_text(&DialogReply::AskAttachmentChoice).unwrap();
        assert!(keyboard.is_some());

        assert!(reply_text(&DialogReply::Ignored).is_none());
    }

    #[test]
    fn payload_prompts_carry_a_back_keyboard() {
        for reply in [DialogReply::AskMedia, DialogReply::AskLink] {
            let (_, keyboard) = reply_text(&reply).unwrap();
            assert!(keyboard.is_some(), "{reply:?}");
        }
    }
}
