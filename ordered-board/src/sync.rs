//! Boundary to the remote authority that durably records moves.
//!
//! The engine never talks to the network itself. It hands a
//! [`PersistRequest`] to a [`SyncGateway`] and later receives a
//! [`SyncResult`]. Transport, retries and authentication belong to the
//! gateway implementation.

use crate::types::{Attributes, ItemId, PartitionKey, SyncId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use tokio::sync::Mutex;

/// The request sent to the remote authority for one move
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistRequest {
    pub item_id: ItemId,
    pub new_partition_key: PartitionKey,
    pub new_index: usize,
    /// Discriminator attributes the move changed, e.g. `{"status": "review"}`
    #[serde(default)]
    pub derived_attribute_changes: Attributes,
}

/// Identifies one in-flight persistence call so its result can be routed
/// back to the engine
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncTicket {
    pub sync_id: SyncId,
    pub item_id: ItemId,
}

/// Why the remote authority did not record a move
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum RejectReason {
    Network(String),
    Validation(String),
    Permission(String),
    /// No answer within the configured window
    Timeout,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "network failure: {}", msg),
            Self::Validation(msg) => write!(f, "validation failure: {}", msg),
            Self::Permission(msg) => write!(f, "permission denied: {}", msg),
            Self::Timeout => f.write_str("timeout"),
        }
    }
}

/// Answer from the remote authority
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SyncResult {
    /// The move is durable. `canonical` optionally carries the server's
    /// view of the item's attributes, merged back last-writer-wins.
    Confirmed {
        #[serde(default)]
        canonical: Option<Attributes>,
    },
    Rejected { reason: RejectReason },
}

impl SyncResult {
    /// Confirmation without a canonical payload
    pub fn confirmed() -> Self {
        Self::Confirmed { canonical: None }
    }

    /// Rejection with the given reason
    pub fn rejected(reason: RejectReason) -> Self {
        Self::Rejected { reason }
    }

    /// Whether the move was recorded
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }
}

/// The external persistence collaborator.
///
/// Implementations turn every failure (network, validation, permission)
/// into [`SyncResult::Rejected`]; there is no error channel. Timeouts are
/// applied by the caller.
#[async_trait]
pub trait SyncGateway: Send + Sync {
    /// Durably record one move
    async fn persist(&self, request: &PersistRequest) -> SyncResult;
}

/// In-memory gateway that records requests and replies from a script.
///
/// Replies are taken from the front of the script; once it is empty every
/// request is confirmed. Useful for tests and for running a board with no
/// backend attached.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    requests: Mutex<Vec<PersistRequest>>,
    script: Mutex<VecDeque<SyncResult>>,
}

impl RecordingGateway {
    /// Create a gateway that confirms everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a gateway that replies with `results` in order
    pub fn scripted(results: impl IntoIterator<Item = SyncResult>) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            script: Mutex::new(results.into_iter().collect()),
        }
    }

    /// Queue another reply
    pub async fn push_result(&self, result: SyncResult) {
        self.script.lock().await.push_back(result);
    }

    /// Every request received so far
    pub async fn requests(&self) -> Vec<PersistRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl SyncGateway for RecordingGateway {
    async fn persist(&self, request: &PersistRequest) -> SyncResult {
        self.requests.lock().await.push(request.clone());
        self.script
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(SyncResult::confirmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(id: &str) -> PersistRequest {
        PersistRequest {
            item_id: id.into(),
            new_partition_key: "sprint".into(),
            new_index: 0,
            derived_attribute_changes: Attributes::new(),
        }
    }

    #[test]
    fn test_persist_request_wire_shape() {
        let mut req = request("a");
        req.derived_attribute_changes
            .insert("sprintId".into(), json!("s-1"));
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({
                "itemId": "a",
                "newPartitionKey": "sprint",
                "newIndex": 0,
                "derivedAttributeChanges": {"sprintId": "s-1"}
            })
        );
    }

    #[test]
    fn test_reject_reason_display() {
        assert_eq!(RejectReason::Timeout.to_string(), "timeout");
        assert_eq!(
            RejectReason::Permission("not a member".into()).to_string(),
            "permission denied: not a member"
        );
    }

    #[test]
    fn test_sync_result_from_json() {
        let result: SyncResult = serde_json::from_value(json!({
            "result": "rejected",
            "reason": {"kind": "validation", "message": "sprint closed"}
        }))
        .unwrap();
        assert_eq!(
            result,
            SyncResult::rejected(RejectReason::Validation("sprint closed".into()))
        );

        let result: SyncResult = serde_json::from_value(json!({"result": "confirmed"})).unwrap();
        assert!(result.is_confirmed());
    }

    #[tokio::test]
    async fn test_recording_gateway_follows_script() {
        let gateway = RecordingGateway::scripted([SyncResult::rejected(RejectReason::Timeout)]);

        assert!(!gateway.persist(&request("a")).await.is_confirmed());
        assert!(gateway.persist(&request("b")).await.is_confirmed());

        let seen: Vec<String> = gateway
            .requests()
            .await
            .into_iter()
            .map(|r| r.item_id.to_string())
            .collect();
        assert_eq!(seen, vec!["a", "b"]);
    }
}
