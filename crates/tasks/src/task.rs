use serde::{Deserialize, Serialize};

/// Optional attachment carried by a task.
///
/// The payload is the messaging platform's file id for media, or the URL
/// string for links. The store persists this as a `kind` column plus a
/// nullable `ref` column; the enum keeps the two in lockstep so a kind
/// without a reference (or the reverse) cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "ref", rename_all = "snake_case")]
pub enum Attachment {
    None,
    Photo(String),
    Video(String),
    Link(String),
}

impl Attachment {
    /// Column value for `attachment_kind`.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Photo(_) => "photo",
            Self::Video(_) => "video",
            Self::Link(_) => "link",
        }
    }

    /// Column value for `attachment_ref`. `None` exactly when the
    /// attachment is [`Attachment::None`].
    #[must_use]
    pub fn reference(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Photo(r) | Self::Video(r) | Self::Link(r) => Some(r),
        }
    }

    /// Rebuild an attachment from its two stored columns.
    ///
    /// A kind without a reference, or an unknown kind, normalizes to
    /// [`Attachment::None`] rather than failing the whole row.
    #[must_use]
    pub fn from_columns(kind: &str, reference: Option<String>) -> Self {
        match (kind, reference) {
            ("photo", Some(r)) => Self::Photo(r),
            ("video", Some(r)) => Self::Video(r),
            ("link", Some(r)) => Self::Link(r),
            ("none", _) => Self::None,
            (other, r) => {
                tracing::warn!(
                    kind = other,
                    has_ref = r.is_some(),
                    "inconsistent attachment columns, treating as none"
                );
                Self::None
            },
        }
    }
}

/// A durable to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Assigned by the store on insert; immutable afterwards.
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    pub attachment: Attachment,
    pub completed: bool,
}

/// A task as captured by the dialog, before the store assigns an id.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub owner_id: i64,
    pub title: String,
    pub attachment: Attachment,
}
