//! Domain models for indexed mail

mod address;
mod message;
mod tag;
mod thread;

pub use address::EmailAddress;
pub use message::{DocId, Message, MessageId};
pub use tag::{TAG_MAX, validate_tag};
pub use thread::{Thread, ThreadId};
