//! # Integration Tests
//!
//! End-to-end scenarios: Singer lines in, mock transport requests and
//! checkpoint lines out.

#[cfg(test)]
mod support {
    use std::time::Duration;

    use contracts::RecordSink;
    use serde_json::{json, Value};
    use session::{BatchSettings, Session};

    pub fn schema(stream: &str) -> String {
        json!({
            "type": "SCHEMA",
            "stream": stream,
            "schema": {"type": "object"},
            "key_properties": ["id"],
        })
        .to_string()
    }

    pub fn record(stream: &str, id: u64) -> String {
        json!({"type": "RECORD", "stream": stream, "record": {"id": id}}).to_string()
    }

    pub fn state(bookmark: u64) -> String {
        json!({"type": "STATE", "value": {"bookmark": bookmark}}).to_string()
    }

    pub fn bookmark(value: u64) -> Value {
        json!({"bookmark": value})
    }

    /// Thresholds that never trigger on their own
    pub fn relaxed() -> BatchSettings {
        BatchSettings {
            client_id: 99,
            target_bytes: 64 * 1024 * 1024,
            max_age: Duration::from_secs(24 * 3600),
        }
    }

    pub fn emitted<S: RecordSink>(session: &Session<S, Vec<u8>>) -> Vec<Value> {
        String::from_utf8(session.emitter().writer().clone())
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    pub fn body(request: &contracts::TransferRequest) -> Vec<Value> {
        serde_json::from_slice(&request.body).unwrap()
    }
}

#[cfg(test)]
mod e2e_tests {
    use contracts::{ContractError, MAX_BATCH_SIZE_BYTES, MAX_MESSAGES_PER_BATCH};
    use dispatcher::MockTransport;
    use serde_json::json;
    use session::{BatchSettings, BufferedSink, Session};

    use super::support::*;

    fn session(
        settings: BatchSettings,
        transport: &MockTransport,
    ) -> Session<BufferedSink<MockTransport>, Vec<u8>> {
        Session::new(
            BufferedSink::new("e2e", settings, transport.clone()),
            Vec::new(),
        )
    }

    /// Two tables in one batch: one request each, first-seen order
    #[tokio::test]
    async fn test_e2e_multi_table_grouping() {
        let transport = MockTransport::new();
        let mut session = session(relaxed(), &transport);

        let input = [
            schema("orders"),
            schema("customers"),
            state(1),
            record("customers", 10),
            record("orders", 1),
            record("customers", 11),
            record("orders", 2),
        ]
        .join("\n");

        let stats = session.run(input.as_bytes()).await.unwrap();
        assert_eq!(stats.records, 4);
        assert_eq!(stats.batches, 1);

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].table_name, "customers");
        assert_eq!(requests[0].client_id, 99);
        assert_eq!(
            body(&requests[0]),
            vec![json!({"id": 10, "keys": ["id"]}), json!({"id": 11, "keys": ["id"]})]
        );
        assert_eq!(requests[1].table_name, "orders");
        assert_eq!(body(&requests[1]).len(), 2);

        assert_eq!(emitted(&session), vec![bookmark(1)]);
    }

    /// 150 records: the count cap sends 100, the drain sends 50
    #[tokio::test]
    async fn test_e2e_count_cap_then_drain() {
        let transport = MockTransport::new();
        let mut session = session(relaxed(), &transport);

        let mut lines = vec![schema("orders"), state(1)];
        for id in 1..=150 {
            if id == 120 {
                lines.push(state(2));
            }
            lines.push(record("orders", id));
        }

        session.run(lines.join("\n").as_bytes()).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);

        let first = body(&requests[0]);
        assert_eq!(first.len(), MAX_MESSAGES_PER_BATCH);
        let ids: Vec<u64> = first.iter().map(|r| r["id"].as_u64().unwrap()).collect();
        assert_eq!(ids, (1..=100).collect::<Vec<_>>());
        assert_eq!(body(&requests[1]).len(), 50);

        assert_eq!(emitted(&session), vec![bookmark(1), bookmark(2)]);
    }

    /// A later failure stops every later checkpoint
    #[tokio::test]
    async fn test_e2e_failed_transfer_is_fatal() {
        let transport = MockTransport::new().reject_from(1, 500);
        let mut session = session(relaxed(), &transport);

        let mut lines = vec![schema("orders"), state(1)];
        for id in 1..=150 {
            if id == 101 {
                lines.push(state(2));
            }
            lines.push(record("orders", id));
        }
        lines.push(state(3));

        let err = session.run(lines.join("\n").as_bytes()).await.unwrap_err();
        match err {
            ContractError::Transfer { table, status, body } => {
                assert_eq!(table, "orders");
                assert_eq!(status, 500);
                assert!(body.contains("orders"));
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(transport.request_count(), 2);
        assert!(session.emitter().is_fenced());
        assert_eq!(emitted(&session), vec![bookmark(1)]);
    }

    /// A failure while reading still drains; nothing after it is emitted
    #[tokio::test]
    async fn test_e2e_failure_mid_stream_fences_drain() {
        let transport = MockTransport::new().reject_from(0, 502);
        let mut session = session(relaxed(), &transport);

        let mut lines = vec![schema("orders")];
        for id in 1..=120 {
            lines.push(state(id));
            lines.push(record("orders", id));
        }

        assert!(session.run(lines.join("\n").as_bytes()).await.is_err());
        // the first batch failed mid-stream, nothing more was read
        assert_eq!(session.stats().records, 100);
        assert_eq!(transport.request_count(), 1);
        assert!(emitted(&session).is_empty());
    }

    /// One batch over two tables: the second table fails after the first
    /// was sent, and no state from that batch is emitted
    #[tokio::test]
    async fn test_e2e_second_table_failure_withholds_checkpoint() {
        let transport = MockTransport::new().with_table_status("b", 500);
        let mut session = session(relaxed(), &transport);

        let input = [
            schema("a"),
            schema("b"),
            state(1),
            record("a", 1),
            state(2),
            record("b", 2),
            state(3),
            record("a", 3),
            state(4),
        ]
        .join("\n");

        let err = session.run(input.as_bytes()).await.unwrap_err();
        assert!(
            matches!(err, ContractError::Transfer { ref table, status: 500, .. } if table == "b"),
            "got: {err}"
        );

        let tables: Vec<_> = transport
            .requests()
            .into_iter()
            .map(|r| r.table_name)
            .collect();
        assert_eq!(tables, vec!["a", "b"]);
        assert_eq!(body(&transport.requests()[0]).len(), 2);

        assert!(session.emitter().is_fenced());
        assert!(emitted(&session).is_empty());
        assert_eq!(session.stats().checkpoints, 0);
    }

    /// An oversized record is fatal, earlier records are still sent
    #[tokio::test]
    async fn test_e2e_oversized_record() {
        let transport = MockTransport::new();
        let mut session = session(relaxed(), &transport);

        let huge = json!({
            "type": "RECORD",
            "stream": "orders",
            "record": {"blob": "x".repeat(MAX_BATCH_SIZE_BYTES)},
        })
        .to_string();
        let input = [schema("orders"), state(7), record("orders", 1), huge, state(8)].join("\n");

        let err = session.run(input.as_bytes()).await.unwrap_err();
        assert!(matches!(err, ContractError::OversizedRecord { .. }), "got: {err}");

        assert_eq!(transport.request_count(), 1);
        assert_eq!(emitted(&session), vec![bookmark(7)]);
    }

    /// Large records split across transfers under the byte ceiling
    #[tokio::test]
    async fn test_e2e_byte_ceiling_splits_drain() {
        let transport = MockTransport::new();
        let mut session = session(relaxed(), &transport);

        let blob = "y".repeat(MAX_BATCH_SIZE_BYTES * 2 / 5);
        let mut lines = vec![schema("files")];
        for id in 0..3 {
            lines.push(
                json!({"type": "RECORD", "stream": "files", "record": {"id": id, "blob": blob}})
                    .to_string(),
            );
        }

        session.run(lines.join("\n").as_bytes()).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(body(&requests[0]).len(), 2);
        assert_eq!(body(&requests[1]).len(), 1);
        assert!(requests.iter().all(|r| r.body.len() < MAX_BATCH_SIZE_BYTES));
    }

    #[tokio::test]
    async fn test_e2e_unknown_stream_still_drains() {
        let transport = MockTransport::new();
        let mut session = session(relaxed(), &transport);

        let input = [schema("orders"), state(1), record("orders", 1), record("ghost", 2)].join("\n");
        let err = session.run(input.as_bytes()).await.unwrap_err();
        assert!(matches!(err, ContractError::UnknownStream { .. }));

        assert_eq!(transport.request_count(), 1);
        assert_eq!(emitted(&session), vec![bookmark(1)]);
    }

    #[tokio::test]
    async fn test_e2e_trailing_state_emitted_once() {
        let transport = MockTransport::new();
        let mut session = session(relaxed(), &transport);

        let input = [schema("orders"), record("orders", 1), state(5)].join("\n");
        let stats = session.run(input.as_bytes()).await.unwrap();

        assert_eq!(emitted(&session), vec![bookmark(5)]);
        assert_eq!(stats.checkpoints, 1);
        assert!(session.run("".as_bytes()).await.is_err());
        assert_eq!(emitted(&session), vec![bookmark(5)]);
    }

    #[tokio::test]
    async fn test_e2e_state_only_input() {
        let transport = MockTransport::new();
        let mut session = session(relaxed(), &transport);

        let input = [state(1), state(2)].join("\n");
        session.run(input.as_bytes()).await.unwrap();

        assert_eq!(transport.request_count(), 0);
        assert_eq!(emitted(&session), vec![bookmark(2)]);
    }
}

#[cfg(test)]
mod dry_run_tests {
    use session::{DryRunSink, Session, DRY_RUN_BATCH_SIZE};

    use super::support::*;

    #[tokio::test]
    async fn test_dry_run_emits_every_hundred() {
        let mut session = Session::new(DryRunSink::new("dry"), Vec::new());

        let mut lines = vec![schema("orders")];
        for id in 1..=250 {
            lines.push(state(id));
            lines.push(record("orders", id));
        }

        let stats = session.run(lines.join("\n").as_bytes()).await.unwrap();
        assert_eq!(stats.batches, 3);
        assert_eq!(stats.records_persisted, 250);
        assert_eq!(
            emitted(&session),
            vec![
                bookmark(DRY_RUN_BATCH_SIZE as u64),
                bookmark(2 * DRY_RUN_BATCH_SIZE as u64),
                bookmark(250)
            ]
        );
    }
}

#[cfg(test)]
mod config_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use dispatcher::MockTransport;
    use session::{BatchSettings, BufferedSink, Session};

    use super::support::*;

    /// Settings from a TOML config drive the readiness thresholds
    #[tokio::test]
    async fn test_config_drives_batching() {
        let config = ConfigLoader::load_from_str(
            "client_id = 314\napi_key = \"k\"\nbatch_size_bytes = 30\n",
            ConfigFormat::Toml,
        )
        .unwrap();

        let transport = MockTransport::new();
        let sink = BufferedSink::new(
            "e2e",
            BatchSettings::from_target_config(&config),
            transport.clone(),
        );
        let mut session = Session::new(sink, Vec::new());

        // each record serializes to {"id":N,"keys":["id"]}, 22 bytes
        let input = [
            schema("orders"),
            record("orders", 1),
            record("orders", 2),
            record("orders", 3),
        ]
        .join("\n");
        session.run(input.as_bytes()).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.client_id == 314));
        assert_eq!(body(&requests[0]).len(), 2);
        assert_eq!(body(&requests[1]).len(), 1);
    }
}
