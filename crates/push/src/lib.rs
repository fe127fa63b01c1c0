//! Dispatch Push Notifier
//!
//! Best-effort out-of-band delivery to chat participants who are not
//! connected to the realtime gateway. Fire-and-forget relative to message
//! send: the gateway queues a dispatch task after the send commits.

pub mod dispatcher;
pub mod provider;

pub use dispatcher::PushDispatcher;
pub use provider::{PushOutcome, PushPayload, PushProvider, WebPushProvider};
