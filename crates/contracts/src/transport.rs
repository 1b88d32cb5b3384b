//! Transport trait - Dispatcher output interface
//!
//! One call is one POST of one table's JSON array.

use bytes::Bytes;

use crate::ContractError;

/// A single transfer request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// Routing (account) identifier
    pub client_id: u64,
    /// Destination table
    pub table_name: String,
    /// JSON array of records
    pub body: Bytes,
}

/// What the endpoint answered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferResponse {
    pub status: u16,
    pub body: String,
}

impl TransferResponse {
    /// Any status below 300 counts as persisted
    pub fn is_success(&self) -> bool {
        self.status < 300
    }
}

/// Network transfer trait
///
/// Implementations report every answered request as `Ok`, whatever the
/// status; `Err` is reserved for requests that got no answer.
#[trait_variant::make(Transport: Send)]
pub trait LocalTransport {
    /// Transport name (used for logging)
    fn name(&self) -> &str;

    /// Send one request and wait for the answer
    async fn post(&self, request: TransferRequest) -> Result<TransferResponse, ContractError>;
}
