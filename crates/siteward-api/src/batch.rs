// Batch request abstraction
//
// The site API is driven in "queue, then flush" style: reads and writes are
// appended to a `RequestBatch`, and `SiteClient::execute` sends everything
// pending as one `$batch` round trip. Reads hand back a typed `Loaded<T>`
// slot that is redeemed against the `BatchResponse`.
//
// Wire format (JSON batching):
//   request:  { "requests":  [ { "id", "method", "url", "headers"?, "body"? } ] }
//   response: { "responses": [ { "id", "status", "body"? } ] }

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BatchMethod {
    Get,
    Post,
}

impl fmt::Display for BatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Post => f.write_str("POST"),
        }
    }
}

/// One queued operation. `url` is relative to the site's `_api/` root.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchRequest {
    pub id: String,
    pub method: BatchMethod,
    pub url: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

/// Handle for a queued read. Redeem with [`BatchResponse::take`].
#[must_use = "a queued read is only useful if its result is taken"]
pub struct Loaded<T> {
    id: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Loaded<T> {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl<T> fmt::Debug for Loaded<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loaded").field("id", &self.id).finish()
    }
}

/// Pending operations awaiting the next flush.
#[derive(Debug, Default)]
pub struct RequestBatch {
    next_id: u64,
    pending: Vec<BatchRequest>,
}

impl RequestBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a read whose body deserializes into `T`.
    pub fn queue_get<T: DeserializeOwned>(&mut self, url: impl Into<String>) -> Loaded<T> {
        let id = self.push(BatchMethod::Get, url.into(), None);
        Loaded {
            id,
            _marker: PhantomData,
        }
    }

    /// Queue a write. Returns the request id.
    pub fn queue_post(&mut self, url: impl Into<String>, body: Option<serde_json::Value>) -> String {
        self.push(BatchMethod::Post, url.into(), body)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Operations queued since the last flush, in queue order.
    pub fn pending(&self) -> &[BatchRequest] {
        &self.pending
    }

    /// Drain the queue. Ids keep counting so slots from earlier flushes
    /// never collide with later ones.
    pub(crate) fn take(&mut self) -> Vec<BatchRequest> {
        std::mem::take(&mut self.pending)
    }

    fn push(&mut self, method: BatchMethod, url: String, body: Option<serde_json::Value>) -> String {
        self.next_id += 1;
        let id = self.next_id.to_string();
        let mut headers = BTreeMap::new();
        if body.is_some() {
            headers.insert("Content-Type".to_owned(), "application/json".to_owned());
        }
        self.pending.push(BatchRequest {
            id: id.clone(),
            method,
            url,
            headers,
            body,
        });
        id
    }
}

#[derive(Serialize)]
pub(crate) struct BatchEnvelope<'a> {
    pub requests: &'a [BatchRequest],
}

/// One sub-response of a flush.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchResponseItem {
    pub id: String,
    pub status: u16,
    #[serde(default)]
    pub body: serde_json::Value,
}

impl BatchResponseItem {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Result of a flush.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchResponse {
    #[serde(default)]
    responses: Vec<BatchResponseItem>,
}

impl BatchResponse {
    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    /// Deserialize the body returned for a queued read.
    pub fn take<T: DeserializeOwned>(&mut self, slot: Loaded<T>) -> Result<T, Error> {
        let idx = self
            .responses
            .iter()
            .position(|r| r.id == slot.id)
            .ok_or_else(|| Error::MissingBatchResponse {
                id: slot.id.clone(),
            })?;
        let item = self.responses.swap_remove(idx);

        if !item.is_success() {
            return Err(Error::Remote {
                status: item.status,
                message: remote_message(&item.body)
                    .unwrap_or_else(|| format!("request {} failed", item.id)),
            });
        }

        serde_json::from_value(item.body.clone()).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: item.body.to_string(),
        })
    }

    /// Fail with the first unsuccessful sub-response, described in terms
    /// of the request that produced it, or with the first sent request
    /// that got no answer at all.
    pub(crate) fn check(&self, sent: &[BatchRequest]) -> Result<(), Error> {
        let Some(failed) = self.responses.iter().find(|r| !r.is_success()) else {
            return match sent
                .iter()
                .find(|req| !self.responses.iter().any(|r| r.id == req.id))
            {
                Some(unanswered) => Err(Error::MissingBatchResponse {
                    id: unanswered.id.clone(),
                }),
                None => Ok(()),
            };
        };

        let detail = remote_message(&failed.body).unwrap_or_else(|| "no error detail".into());
        let message = match sent.iter().find(|r| r.id == failed.id) {
            Some(req) => format!("{} {}: {detail}", req.method, req.url),
            None => detail,
        };
        Err(Error::Remote {
            status: failed.status,
            message,
        })
    }
}

/// Pull a human-readable message out of an OData error body.
///
/// Handles both `{"error":{"message":"..."}}` and the verbose
/// `{"odata.error":{"message":{"value":"..."}}}` shapes.
pub(crate) fn remote_message(body: &serde_json::Value) -> Option<String> {
    let error = body.get("error").or_else(|| body.get("odata.error"))?;
    let message = error.get("message")?;
    match message {
        serde_json::Value::String(s) => Some(s.clone()),
        other => other.get("value")?.as_str().map(String::from),
    }
}
