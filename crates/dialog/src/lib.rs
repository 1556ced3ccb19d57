//! Task-capture dialog engine.
//!
//! A per-owner finite state machine walks the user through creating a task
//! (title, then an optional photo/video/link attachment) across multiple
//! message turns, with back/skip/cancel branches. Sessions are transient,
//! one per owner, and expire after an idle TTL.

pub mod classify;
pub mod controller;
pub mod error;
pub mod registry;
pub mod session;

pub use {
    classify::{AttachmentPayload, PhotoVariant, classify},
    controller::{AttachmentChoice, DialogController, DialogInput, DialogReply},
    error::{Error, Result},
    registry::SessionRegistry,
    session::{DialogState, Session},
};
