//! Entity definitions for the chat store

pub mod chat;
pub mod message;
pub mod participant;
pub mod subscription;

pub use chat::{Chat, ChatStatus, ChatType, NewChat};
pub use message::{
    FileData, Mention, Message, MessageBody, MessageType, NewMessage, Reaction, ReadReceipt,
};
pub use participant::{Participant, ParticipantRole};
pub use subscription::{NewPushSubscription, PushSubscription};
