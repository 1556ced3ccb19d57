use {
    teloxide::{
        ApiError, RequestError,
        payloads::{EditMessageTextSetters, SendMessageSetters, SendPhotoSetters, SendVideoSetters},
        prelude::*,
        types::{ChatId, InlineKeyboardMarkup, InputFile, MessageId, ReplyMarkup},
    },
    tracing::warn,
};

use crate::{
    error::Result,
    render::{DisplayUnit, TaskBody},
};

/// Outbound message sender. Best-effort: callers decide whether a failed
/// send is fatal; retries are left to the HTTP layer.
pub struct Outbound {
    bot: Bot,
}

impl Outbound {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        markup: Option<ReplyMarkup>,
    ) -> Result<()> {
        let mut req = self.bot.send_message(chat_id, text);
        if let Some(markup) = markup {
            req = req.reply_markup(markup);
        }
        req.await?;
        Ok(())
    }

    /// Deliver one rendered pending-task entry: media tasks go out as the
    /// attachment itself with the title as caption, everything else as text.
    pub async fn send_unit(&self, chat_id: ChatId, unit: DisplayUnit) -> Result<()> {
        match unit.body {
            TaskBody::Text(text) => {
                self.bot
                    .send_message(chat_id, text)
                    .reply_markup(unit.keyboard)
                    .await?;
            },
            TaskBody::Photo { file_id, caption } => {
                self.bot
                    .send_photo(chat_id, InputFile::file_id(file_id))
                    .caption(caption)
                    .reply_markup(unit.keyboard)
                    .await?;
            },
            TaskBody::Video { file_id, caption } => {
                self.bot
                    .send_video(chat_id, InputFile::file_id(file_id))
                    .caption(caption)
                    .reply_markup(unit.keyboard)
                    .await?;
            },
        }
        Ok(())
    }

    /// Edit a previously sent message in place. "Message is not modified"
    /// is swallowed: redelivered callbacks edit to the same text.
    pub async fn edit_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        markup: Option<InlineKeyboardMarkup>,
    ) -> Result<()> {
        let mut req = self.bot.edit_message_text(chat_id, message_id, text);
        if let Some(markup) = markup {
            req = req.reply_markup(markup);
        }
        match req.await {
            Ok(_) => Ok(()),
            Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Answer a callback query, optionally with a toast. Best-effort: a
    /// failure here only loses the loading spinner.
    pub async fn answer_callback(&self, callback_id: &str, text: Option<&str>) {
        let result = match text {
            Some(text) => self.bot.answer_callback_query(callback_id).text(text).await,
            None => self.bot.answer_callback_query(callback_id).await,
        };
        if let Err(e) = result {
            warn!(error = %e, "failed to answer callback query");
        }
    }
}
