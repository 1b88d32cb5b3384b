//! Dispatcher - groups a batch by table and transfers each group

use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use contracts::{
    Batch, BufferEntry, ContractError, TransferRequest, Transport,
    ARRAY_WRAPPER_BYTES, SEPARATOR_BYTES,
};
use tracing::{debug, error, instrument};

use crate::metrics::DispatchMetrics;

/// Entries of one batch bound for the same table, in batch order
#[derive(Debug)]
pub struct TableGroup<'a> {
    client_id: u64,
    table_name: &'a str,
    entries: Vec<&'a BufferEntry>,
}

impl<'a> TableGroup<'a> {
    fn new(entry: &'a BufferEntry) -> Self {
        let payload = entry.payload();
        Self {
            client_id: payload.client_id(),
            table_name: payload.table_name(),
            entries: vec![entry],
        }
    }

    fn accepts(&self, entry: &BufferEntry) -> bool {
        let payload = entry.payload();
        payload.client_id() == self.client_id && payload.table_name() == self.table_name
    }

    pub fn client_id(&self) -> u64 {
        self.client_id
    }

    pub fn table_name(&self) -> &'a str {
        self.table_name
    }

    pub fn entries(&self) -> &[&'a BufferEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The group's records as one JSON array
    pub fn body(&self) -> Bytes {
        let records: usize = self.entries.iter().map(|e| e.serialized_len()).sum();
        let capacity = ARRAY_WRAPPER_BYTES + records + SEPARATOR_BYTES * self.entries.len();
        let mut body = BytesMut::with_capacity(capacity);

        body.put_u8(b'[');
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                body.put_u8(b',');
            }
            body.extend_from_slice(entry.payload().record());
        }
        body.put_u8(b']');

        body.freeze()
    }

    fn to_request(&self) -> TransferRequest {
        TransferRequest {
            client_id: self.client_id,
            table_name: self.table_name.to_string(),
            body: self.body(),
        }
    }
}

/// Stable grouping by destination
///
/// Groups appear in first-seen order and keep their entries in batch order.
pub fn group_by_table(batch: &Batch) -> Vec<TableGroup<'_>> {
    let mut groups: Vec<TableGroup<'_>> = Vec::new();

    for entry in batch.entries() {
        match groups.iter_mut().find(|group| group.accepts(entry)) {
            Some(group) => group.entries.push(entry),
            None => groups.push(TableGroup::new(entry)),
        }
    }

    groups
}

/// Outcome of one persisted table group
#[derive(Debug, Clone, PartialEq)]
pub struct GroupReport {
    pub table_name: String,
    pub record_count: usize,
    pub bytes: usize,
    pub status: u16,
}

/// Outcome of one fully persisted batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    /// One report per table group, in transfer order
    pub groups: Vec<GroupReport>,
}

impl DispatchReport {
    pub fn record_count(&self) -> usize {
        self.groups.iter().map(|g| g.record_count).sum()
    }

    pub fn bytes(&self) -> usize {
        self.groups.iter().map(|g| g.bytes).sum()
    }
}

/// Sends batches through a transport, one request per table
pub struct Dispatcher<T> {
    transport: T,
    metrics: Arc<DispatchMetrics>,
}

impl<T: Transport + Sync> Dispatcher<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            metrics: Arc::new(DispatchMetrics::new()),
        }
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<DispatchMetrics> {
        &self.metrics
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Transfer every table group of `batch`
    ///
    /// Fails fast: the first rejected or unanswered request aborts the
    /// batch. Groups sent before it stay sent.
    #[instrument(
        name = "dispatcher_send",
        skip(self, batch),
        fields(transport = %self.transport.name(), entries = batch.len())
    )]
    pub async fn send(&self, batch: &Batch) -> Result<DispatchReport, ContractError> {
        let groups = group_by_table(batch);
        debug!(groups = groups.len(), "Sending batch");

        let mut report = DispatchReport {
            groups: Vec::with_capacity(groups.len()),
        };

        for group in &groups {
            report.groups.push(self.send_group(group).await?);
        }

        self.metrics.inc_batch_count();
        observability::record_batch_dispatched(report.record_count());
        Ok(report)
    }

    async fn send_group(&self, group: &TableGroup<'_>) -> Result<GroupReport, ContractError> {
        let request = group.to_request();
        let bytes = request.body.len();
        let table_name = group.table_name();

        let response = match self.transport.post(request).await {
            Ok(response) => response,
            Err(e) => {
                self.metrics.inc_failure_count();
                observability::record_transfer_failure(table_name, None);
                error!(table = %table_name, error = %e, "Transfer failed");
                return Err(e);
            }
        };

        if !response.is_success() {
            self.metrics.inc_failure_count();
            observability::record_transfer_failure(table_name, Some(response.status));
            error!(
                table = %table_name,
                status = response.status,
                "Transfer rejected"
            );
            return Err(ContractError::Transfer {
                table: table_name.to_string(),
                status: response.status,
                body: response.body,
            });
        }

        self.metrics.record_request(group.len(), bytes);
        observability::record_request_sent(table_name, group.len(), bytes);
        debug!(
            table = %table_name,
            records = group.len(),
            bytes,
            status = response.status,
            "Table group persisted"
        );

        Ok(GroupReport {
            table_name: table_name.to_string(),
            record_count: group.len(),
            bytes,
            status: response.status,
        })
    }
}
