//! Attachment classification: maps raw inbound material to a typed
//! [`Attachment`] or rejects it. Pure, no side effects.

use taskling_tasks::Attachment;

use crate::error::{Error, Result};

/// One size variant of a photo as delivered by the gateway.
#[derive(Debug, Clone)]
pub struct PhotoVariant {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
}

/// Raw attachment material extracted from a single inbound message.
#[derive(Debug, Clone)]
pub enum AttachmentPayload {
    /// Photo size variants, in no particular order.
    Photo { variants: Vec<PhotoVariant> },
    Video { file_id: String },
    Text(String),
    Unsupported,
}

/// Classify a payload into an attachment.
///
/// Photos resolve to the highest-resolution variant. Text is accepted only
/// when it starts with `http://` or `https://` (case-sensitive) and is kept
/// verbatim. Everything else is an [`Error::UnsupportedAttachment`].
pub fn classify(payload: &AttachmentPayload) -> Result<Attachment> {
    match payload {
        AttachmentPayload::Photo { variants } => variants
            .iter()
            .max_by_key(|v| u64::from(v.width) * u64::from(v.height))
            .map(|v| Attachment::Photo(v.file_id.clone()))
            .ok_or(Error::UnsupportedAttachment),
        AttachmentPayload::Video { file_id } => Ok(Attachment::Video(file_id.clone())),
        AttachmentPayload::Text(text) if is_link(text) => Ok(Attachment::Link(text.clone())),
        AttachmentPayload::Text(_) | AttachmentPayload::Unsupported => {
            Err(Error::UnsupportedAttachment)
        },
    }
}

/// Whether a text payload qualifies as a link attachment.
#[must_use]
pub fn is_link(text: &str) -> bool {
    text.starts_with("http://") || text.starts_with("https://")
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn variant(file_id: &str, width: u32, height: u32) -> PhotoVariant {
        PhotoVariant {
            file_id: file_id.into(),
            width,
            height,
        }
    }

    #[test]
    fn photo_picks_highest_resolution_variant() {
        let payload = AttachmentPayload::Photo {
            variants: vec![
                variant("thumb", 90, 90),
                variant("full", 1280, 960),
                variant("medium", 320, 240),
            ],
        };
        assert_eq!(
            classify(&payload).unwrap(),
            Attachment::Photo("full".into())
        );
    }

    #[test]
    fn photo_without_variants_is_unsupported() {
        let payload = AttachmentPayload::Photo { variants: vec![] };
        assert!(matches!(
            classify(&payload),
            Err(Error::UnsupportedAttachment)
        ));
    }

    #[test]
    fn video_keeps_its_file_id() {
        let payload = AttachmentPayload::Video {
            file_id: "vid-3".into(),
        };
        assert_eq!(classify(&payload).unwrap(), Attachment::Video("vid-3".into()));
    }

    #[rstest]
    #[case("https://example.com")]
    #[case("http://example.com/path?q=1")]
    #[case("https://docs.example/report")]
    fn valid_links_are_kept_verbatim(#[case] url: &str) {
        let payload = AttachmentPayload::Text(url.into());
        assert_eq!(classify(&payload).unwrap(), Attachment::Link(url.into()));
    }

    #[rstest]
    #[case("ftp://example.com")]
    #[case("example.com")]
    #[case("HTTPS://example.com")] // scheme check is case-sensitive
    #[case("not-a-link")]
    #[case("")]
    fn non_links_are_rejected(#[case] text: &str) {
        let payload = AttachmentPayload::Text(text.into());
        assert!(matches!(
            classify(&payload),
            Err(Error::UnsupportedAttachment)
        ));
    }

    #[test]
    fn unsupported_payload_is_rejected() {
        assert!(matches!(
            classify(&AttachmentPayload::Unsupported),
            Err(Error::UnsupportedAttachment)
        ));
    }
}
