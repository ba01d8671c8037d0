//! Retry, backoff and failover behaviour of transaction execution.

use ledgerlink_client::{
    AccountId, Client, ClientConfig, Error, TopicId, TopicMessageSubmitTransaction,
    TransactionError, TransferTransaction,
};
use ledgerlink_network::TransportError;
use ledgerlink_test_helpers::{fixtures, MockTransport, TestSigners};
use ledgerlink_types::Status;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing_test::traced_test;

fn client(transport: &Arc<MockTransport>, nodes: u64) -> Client<MockTransport> {
    let client = Client::with_transport(transport.clone(), &ClientConfig::default()).unwrap();
    client.set_network(&fixtures::node_map(3, nodes)).unwrap();
    client.set_operator(AccountId::from_num(2), TestSigners::new(1, 7).signer(0).clone());
    client
}

fn transfer() -> TransferTransaction {
    TransferTransaction::new()
        .hbar_transfer(AccountId::from_num(2), -100)
        .hbar_transfer(AccountId::from_num(1001), 100)
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn test_busy_twice_then_success() {
    let transport = Arc::new(MockTransport::new());
    let client = client(&transport, 1);
    let node = fixtures::node_address(3);
    transport.push_response(&node, Ok(fixtures::precheck_response(Status::Busy)));
    transport.push_response(&node, Ok(fixtures::precheck_response(Status::Busy)));
    transport.push_response(&node, Ok(fixtures::precheck_response(Status::Ok)));

    let mut tx = transfer()
        .node_account_ids([AccountId::from_num(3)])
        .freeze_with(&client)
        .unwrap();

    let started = Instant::now();
    let response = tx.execute(&client).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(response.node_id, AccountId::from_num(3));
    assert_eq!(response.transaction_id, tx.transaction_id());

    let stats = client.stats();
    assert_eq!(stats.attempts, 3);
    assert_eq!(stats.retries, 2);
    assert_eq!(stats.backoff_sleeps, 2);

    // 250ms doubled to 500ms, then 1000ms, each with up to 10% jitter.
    assert!(elapsed >= Duration::from_millis(1500), "{elapsed:?}");
    assert!(elapsed <= Duration::from_millis(1650), "{elapsed:?}");

    let health = client
        .network()
        .node_for_account(&AccountId::from_num(3))
        .unwrap()
        .health();
    assert_eq!(health.current_backoff, Duration::from_millis(250));
    assert_eq!(health.total_failures, 2);
    assert_eq!(health.total_successes, 1);
    assert!(health.healthy);
}

#[tokio::test(start_paused = true)]
async fn test_terminal_status_not_retried() {
    let transport = Arc::new(MockTransport::new());
    let client = client(&transport, 2);
    transport.push_response(
        &fixtures::node_address(3),
        Ok(fixtures::precheck_response(Status::InvalidSignature)),
    );

    let mut tx = transfer()
        .node_account_ids([AccountId::from_num(3), AccountId::from_num(4)])
        .freeze_with(&client)
        .unwrap();
    let err = tx.execute(&client).await.unwrap_err();

    match err {
        Error::PrecheckStatus {
            node,
            status,
            transaction_id,
        } => {
            assert_eq!(node, AccountId::from_num(3));
            assert_eq!(status, Status::InvalidSignature);
            assert_eq!(transaction_id, Some(tx.transaction_id()));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(transport.calls().len(), 1);
    assert_eq!(client.stats().backoff_sleeps, 0);

    let health = client
        .network()
        .node_for_account(&AccountId::from_num(3))
        .unwrap()
        .health();
    assert!(health.healthy);
    assert_eq!(health.total_failures, 0);
}

#[tokio::test(start_paused = true)]
async fn test_transport_failure_moves_to_next_node() {
    let transport = Arc::new(MockTransport::new());
    let client = client(&transport, 2);
    transport.push_response(
        &fixtures::node_address(3),
        Err(TransportError::Unavailable("connection reset".to_string())),
    );
    transport.push_response(
        &fixtures::node_address(4),
        Ok(fixtures::precheck_response(Status::Ok)),
    );

    let mut tx = transfer()
        .node_account_ids([AccountId::from_num(3), AccountId::from_num(4)])
        .freeze_with(&client)
        .unwrap();
    let response = tx.execute(&client).await.unwrap();

    assert_eq!(response.node_id, AccountId::from_num(4));
    assert_eq!(
        transport.call_addresses(),
        vec![fixtures::node_address(3), fixtures::node_address(4)]
    );

    let failed = client
        .network()
        .node_for_account(&AccountId::from_num(3))
        .unwrap()
        .health();
    assert_eq!(failed.bad_status_count, 1);
    assert_eq!(failed.current_backoff, Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn test_transient_status_rotates_through_nodes() {
    let transport = Arc::new(MockTransport::new());
    let client = client(&transport, 3);
    for num in [3, 4] {
        transport.push_response(
            &fixtures::node_address(num),
            Ok(fixtures::precheck_response(Status::Busy)),
        );
    }
    transport.push_response(
        &fixtures::node_address(5),
        Ok(fixtures::precheck_response(Status::Ok)),
    );

    let mut tx = transfer()
        .node_account_ids([3, 4, 5].map(AccountId::from_num))
        .freeze_with(&client)
        .unwrap();
    let response = tx.execute(&client).await.unwrap();

    assert_eq!(response.node_id, AccountId::from_num(5));
    assert_eq!(
        transport.call_addresses(),
        [3, 4, 5].map(fixtures::node_address).to_vec()
    );
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_reports_last_node_and_status() {
    let transport = Arc::new(MockTransport::new());
    let client = client(&transport, 1);
    client.set_max_attempts(3);
    transport.set_handler(|_, _, _| Ok(fixtures::precheck_response(Status::Busy)));

    let mut tx = transfer()
        .node_account_ids([AccountId::from_num(3)])
        .freeze_with(&client)
        .unwrap();
    let err = tx.execute(&client).await.unwrap_err();

    assert!(
        matches!(
            err,
            Error::Exhausted {
                attempts: 3,
                last_node: Some(node),
                ..
            } if node == AccountId::from_num(3)
        ),
        "{err:?}"
    );
    assert_eq!(err.status(), Some(Status::Busy));
}

#[tokio::test(start_paused = true)]
async fn test_overall_deadline_stops_retrying() {
    let transport = Arc::new(MockTransport::new());
    let client = client(&transport, 1);
    client.set_overall_timeout(Duration::from_secs(1));
    transport.set_handler(|_, _, _| Err(TransportError::Unavailable("down".to_string())));

    let mut tx = transfer()
        .node_account_ids([AccountId::from_num(3)])
        .freeze_with(&client)
        .unwrap();

    let started = Instant::now();
    let err = tx.execute(&client).await.unwrap_err();

    match err {
        Error::TimedOut {
            last_error: Some(last),
        } => assert!(matches!(*last, Error::Transport { .. })),
        other => panic!("unexpected error {other:?}"),
    }
    assert!(started.elapsed() <= Duration::from_secs(1));
}

#[tokio::test]
async fn test_non_retryable_transport_error_surfaces() {
    let transport = Arc::new(MockTransport::new());
    let client = client(&transport, 2);
    transport.push_response(
        &fixtures::node_address(3),
        Err(TransportError::Status {
            code: tonic::Code::InvalidArgument,
            message: "bad request".to_string(),
        }),
    );

    let mut tx = transfer()
        .node_account_ids([AccountId::from_num(3), AccountId::from_num(4)])
        .freeze_with(&client)
        .unwrap();
    let err = tx.execute(&client).await.unwrap_err();

    assert!(matches!(err, Error::Transport { .. }), "{err:?}");
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test]
async fn test_max_chunks_fails_before_connecting() {
    let transport = Arc::new(MockTransport::new());
    let client = client(&transport, 1);

    let result = TopicMessageSubmitTransaction::new()
        .topic_id(TopicId::from_num(1001))
        .message(vec![0u8; 3 * 10 + 1])
        .chunk_size(10)
        .max_chunks(3)
        .freeze_with(&client);

    assert!(matches!(
        result,
        Err(Error::Transaction(TransactionError::MaxChunksExceeded {
            required: 4,
            max: 3
        }))
    ));
    assert_eq!(transport.connect_count(), 0);
}

#[tokio::test]
async fn test_closed_client_rejects_requests() {
    let transport = Arc::new(MockTransport::new());
    let client = client(&transport, 1);
    let mut tx = transfer()
        .node_account_ids([AccountId::from_num(3)])
        .freeze_with(&client)
        .unwrap();

    client.close();
    client.close();
    assert!(client.is_closed());
    assert!(matches!(tx.execute(&client).await, Err(Error::Closed)));
}
