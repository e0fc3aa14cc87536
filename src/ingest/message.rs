//! In-process message channel into the gateway.
//!
//! Messages from a foreign origin, or that are not add requests, are dropped
//! without a reply. Everything else gets exactly one reply frame addressed
//! back to the sender's origin.

use std::{
    sync::{
        Arc,
        mpsc::{self, Receiver, Sender},
    },
    thread::{self, JoinHandle},
};

use log::debug;
use serde_json::Value;

use crate::{
    ingest::{
        ADD_MUSIC_TRACK, ResponseFrame, error::IngestError, frame_type, gateway::Gateway,
        gateway::IngestAck, submit_add_request,
    },
    notify::Origin,
};

pub struct Message {
    pub origin: String,
    pub data: Value,
    pub reply_to: Option<Sender<Reply>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub target_origin: String,
    pub body: Value,
}

pub struct MessageAdapter {
    origin: String,
    gateway: Arc<Gateway>,
}

impl MessageAdapter {
    /// `origin` is the application's own origin, the only one accepted.
    pub fn new(origin: impl Into<String>, gateway: Arc<Gateway>) -> Self {
        Self {
            origin: origin.into(),
            gateway,
        }
    }

    /// `None` when the message was ignored.
    pub fn handle(&self, message: &Message) -> Option<IngestAck> {
        if message.origin != self.origin {
            debug!("Ignoring message from foreign origin {}", message.origin);
            return None;
        }
        if frame_type(&message.data) != Some(ADD_MUSIC_TRACK) {
            debug!("Ignoring message that is not an add request");
            return None;
        }

        let result = submit_add_request(&self.gateway, &message.data, Origin::Message);
        let ack = IngestAck::from(&result);

        if let Some(reply_to) = &message.reply_to {
            let reply = Reply {
                target_origin: message.origin.clone(),
                body: ResponseFrame::new(&ack).to_value(),
            };
            if reply_to.send(reply).is_err() {
                debug!("Reply channel closed before the response was sent");
            }
        }

        Some(ack)
    }
}

/// Runs a [`MessageAdapter`] on its own event thread.
pub struct MessageBus {
    sender: Sender<Message>,
    worker: JoinHandle<()>,
}

impl MessageBus {
    pub fn attach(adapter: MessageAdapter) -> Self {
        let (sender, receiver) = mpsc::channel::<Message>();
        let worker = thread::spawn(move || {
            for message in receiver {
                adapter.handle(&message);
            }
            debug!("Message bus detached");
        });
        Self { sender, worker }
    }

    /// Posts `data` as coming from `origin`, the reply (if any) arrives on the
    /// returned receiver.
    pub fn post(&self, origin: impl Into<String>, data: Value) -> Result<Receiver<Reply>, IngestError> {
        let (reply_to, replies) = mpsc::channel();
        self.sender
            .send(Message {
                origin: origin.into(),
                data,
                reply_to: Some(reply_to),
            })
            .map_err(|_| IngestError::Transport("message bus is detached".into()))?;
        Ok(replies)
    }

    /// Stops accepting messages and waits for queued ones to be handled.
    pub fn detach(self) {
        drop(self.sender);
        if self.worker.join().is_err() {
            log::error!("Message bus worker panicked");
        }
    }
}
