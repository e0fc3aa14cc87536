use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    domain::track::TrackRecord,
    ingest::{error::IngestError, normalize::normalize},
    library::store::SharedStore,
    notify::{Notification, Notifier, Origin},
};

/// The one validation + insert routine every transport goes through.
pub struct Gateway {
    store: SharedStore,
    notifier: Arc<dyn Notifier>,
}

impl Gateway {
    pub fn new(store: SharedStore, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Normalizes `payload` and appends the record to the store exactly once.
    ///
    /// On failure the store is left as it was.
    pub fn submit(&self, payload: &Value, origin: Origin) -> Result<TrackRecord, IngestError> {
        match normalize(payload) {
            Ok(record) => self.accept(record, origin),
            Err(err) => self.reject(origin, err),
        }
    }

    /// Reports a fault that happened before a payload could be submitted.
    pub fn reject(&self, origin: Origin, err: IngestError) -> Result<TrackRecord, IngestError> {
        self.notifier.notify(Notification::Rejected {
            reason: err.to_string(),
            origin,
        });
        Err(err)
    }

    fn accept(&self, record: TrackRecord, origin: Origin) -> Result<TrackRecord, IngestError> {
        {
            let mut store = match self.store.lock() {
                Ok(store) => store,
                Err(e) => {
                    return self.reject(
                        origin,
                        IngestError::Internal(format!("track store unavailable: {e}")),
                    );
                }
            };
            if store.contains(&record.id) {
                debug!("Track id {} is already in the library, keeping both", record.id);
            }
            store.append(record.clone());
        }

        self.notifier.notify(Notification::TrackAdded {
            track_id: record.id.clone(),
            title: record.title.clone(),
            origin,
        });
        Ok(record)
    }
}

/// Outcome reported back through the transport a payload came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestAck {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IngestAck {
    pub fn accepted(track_id: impl Into<String>) -> Self {
        Self {
            success: true,
            track_id: Some(track_id.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            track_id: None,
            error: Some(error.into()),
        }
    }
}

impl From<&Result<TrackRecord, IngestError>> for IngestAck {
    fn from(result: &Result<TrackRecord, IngestError>) -> Self {
        match result {
            Ok(record) => IngestAck::accepted(record.id.clone()),
            Err(err) => IngestAck::failed(err.to_string()),
        }
    }
}
