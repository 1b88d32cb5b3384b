//! MockTransport - in-memory transport for tests and local runs
//!
//! Records every request and answers with scripted statuses. Clones share
//! state, so a test can keep a handle after moving one into a dispatcher.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use contracts::{ContractError, TransferRequest, TransferResponse, Transport};
use tracing::debug;

#[derive(Debug, Default)]
struct MockState {
    requests: Vec<TransferRequest>,
    table_statuses: HashMap<String, u16>,
    reject_from: Option<(usize, u16)>,
    unreachable: bool,
}

/// Recording transport with scripted answers
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Transport that accepts everything with 200
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every request for `table` with `status`
    pub fn with_table_status(self, table: impl Into<String>, status: u16) -> Self {
        self.lock().table_statuses.insert(table.into(), status);
        self
    }

    /// Answer the `index`-th request (0-based) and all later ones with `status`
    pub fn reject_from(self, index: usize, status: u16) -> Self {
        self.lock().reject_from = Some((index, status));
        self
    }

    /// Fail every request without an answer
    pub fn unreachable(self) -> Self {
        self.lock().unreachable = true;
        self
    }

    /// All requests seen so far, in order
    pub fn requests(&self) -> Vec<TransferRequest> {
        self.lock().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn answer(&self, request: TransferRequest) -> Result<TransferResponse, ContractError> {
        let mut state = self.lock();
        let index = state.requests.len();
        let table = request.table_name.clone();
        state.requests.push(request);

        if state.unreachable {
            return Err(ContractError::transfer_connection(table, "connection refused"));
        }

        let status = match state.reject_from {
            Some((from, status)) if index >= from => status,
            _ => state.table_statuses.get(&table).copied().unwrap_or(200),
        };
        debug!(table = %table, index, status, "MockTransport answered");

        Ok(TransferResponse {
            status,
            body: if status < 300 {
                String::new()
            } else {
                format!("mock rejection for table {table}")
            },
        })
    }
}

impl Transport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn post(&self, request: TransferRequest) -> Result<TransferResponse, ContractError> {
        self.answer(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn request(table: &str) -> TransferRequest {
        TransferRequest {
            client_id: 1,
            table_name: table.to_string(),
            body: Bytes::from_static(b"[]"),
        }
    }

    #[tokio::test]
    async fn test_scripted_statuses() {
        let transport = MockTransport::new()
            .with_table_status("bad", 422)
            .reject_from(3, 503);

        assert_eq!(transport.post(request("good")).await.unwrap().status, 200);
        assert_eq!(transport.post(request("bad")).await.unwrap().status, 422);
        assert_eq!(transport.post(request("good")).await.unwrap().status, 200);
        assert_eq!(transport.post(request("good")).await.unwrap().status, 503);
        assert_eq!(transport.request_count(), 4);
    }

    #[tokio::test]
    async fn test_clones_share_requests() {
        let transport = MockTransport::new();
        let handle = transport.clone();
        transport.post(request("a")).await.unwrap();
        assert_eq!(handle.requests()[0].table_name, "a");
    }

    #[tokio::test]
    async fn test_unreachable() {
        let transport = MockTransport::new().unreachable();
        assert!(transport.post(request("a")).await.is_err());
        assert_eq!(transport.request_count(), 1);
    }
}
