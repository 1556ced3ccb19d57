//! Keyboards, prompts, and the pending-task display units.
//!
//! This is the only place that decides what an inline button's callback
//! data looks like; task buttons carry the dispatcher's action tokens and
//! attachment-step buttons carry the `attach_*` choices decoded in
//! `handlers`.

use {
    teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup},
    tracing::warn,
};

use taskling_tasks::{Attachment, Task, TaskAction};

/// Main menu reply-keyboard labels. The handler treats these exactly like
/// the matching slash commands.
pub const BTN_MY_TASKS: &str = "📝 My tasks";
pub const BTN_NEW_TASK: &str = "➕ New task";

/// Callback data for the attachment choice keyboard.
pub const CB_ATTACH_MEDIA: &str = "attach_media";
pub const CB_ATTACH_LINK: &str = "attach_link";
pub const CB_ATTACH_SKIP: &str = "attach_skip";
pub const CB_ATTACH_BACK: &str = "attach_back";
pub const CB_ATTACH_CANCEL: &str = "attach_cancel";

/// The persistent main menu keyboard.
#[must_use]
pub fn main_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![KeyboardButton::new(BTN_MY_TASKS)],
        vec![KeyboardButton::new(BTN_NEW_TASK)],
    ])
    .resize_keyboard()
}

/// Inline keyboard for the attachment choice step.
#[must_use]
pub fn attachment_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            InlineKeyboardButton::callback("🖼️ Photo/Video", CB_ATTACH_MEDIA),
            InlineKeyboardButton::callback("🔗 Link", CB_ATTACH_LINK),
        ],
        vec![InlineKeyboardButton::callback("➡️ Skip", CB_ATTACH_SKIP)],
        vec![
            InlineKeyboardButton::callback("⬅️ Back", CB_ATTACH_BACK),
            InlineKeyboardButton::callback("✖️ Cancel", CB_ATTACH_CANCEL),
        ],
    ])
}

/// Inline keyboard shown while waiting for attachment material, so the
/// user can step back to the choice or abandon the capture.
#[must_use]
pub fn back_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("⬅️ Back", CB_ATTACH_BACK),
        InlineKeyboardButton::callback("✖️ Cancel", CB_ATTACH_CANCEL),
    ]])
}

/// How one pending task is delivered to the chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskBody {
    Text(String),
    Photo { file_id: String, caption: String },
    Video { file_id: String, caption: String },
}

/// One renderable entry of the pending list.
#[derive(Debug, Clone)]
pub struct DisplayUnit {
    pub body: TaskBody,
    pub keyboard: InlineKeyboardMarkup,
}

/// Render a pending task as a message body plus its action keyboard.
#[must_use]
pub fn render_task(task: &Task) -> DisplayUnit {
    let mut rows = vec![vec![
        InlineKeyboardButton::callback("✅ Done", TaskAction::Complete(task.id).token()),
        InlineKeyboardButton::callback("🗑️ Delete", TaskAction::Delete(task.id).token()),
    ]];

    let body = match &task.attachment {
        Attachment::Photo(file_id) => TaskBody::Photo {
            file_id: file_id.clone(),
            caption: task.title.clone(),
        },
        Attachment::Video(file_id) => TaskBody::Video {
            file_id: file_id.clone(),
            caption: task.title.clone(),
        },
        Attachment::Link(link) => {
            match link.parse::<url::Url>() {
                Ok(parsed) => rows.push(vec![InlineKeyboardButton::url("🔗 Open link", parsed)]),
                Err(e) => {
                    // A stored link always passed the scheme check; anything
                    // unparseable beyond that just loses its button.
                    warn!(task_id = task.id, error = %e, "stored link is not a valid URL");
                },
            }
            TaskBody::Text(format!("📝 {}", task.title))
        },
        Attachment::None => TaskBody::Text(format!("📝 {}", task.title)),
    };

    DisplayUnit {
        body,
        keyboard: InlineKeyboardMarkup::new(rows),
    }
}
