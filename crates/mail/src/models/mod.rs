//! Domain models for mail entities

mod label;
mod message;

pub use label::{find_by_name, Label, LabelId};
pub use message::{Message, MessageBuilder, MessageHeaders, MessageId};
