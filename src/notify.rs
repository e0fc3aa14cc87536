//! User facing acknowledgments of ingestion outcomes

use std::fmt::Display;

use log::{info, warn};

/// Transport a submission arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Message,
    Socket,
    Http,
}

impl Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Message => write!(f, "message"),
            Origin::Socket => write!(f, "socket"),
            Origin::Http => write!(f, "http"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    TrackAdded {
        track_id: String,
        title: String,
        origin: Origin,
    },
    Rejected {
        reason: String,
        origin: Origin,
    },
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Reports every outcome to the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification {
            Notification::TrackAdded {
                track_id,
                title,
                origin,
            } => info!("{title} added to the library via {origin} (id {track_id})"),
            Notification::Rejected { reason, origin } => {
                warn!("Track submitted via {origin} rejected: {reason}")
            }
        }
    }
}
