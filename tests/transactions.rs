//! Transaction state machine scenarios over a scripted server.

mod common;

use bolt_driver::{Error, Params, TxStatus, Value};
use common::summary_success;

#[tokio::test]
async fn begin_then_rollback_restores_idle() {
    let (mut conn, mut srv) = common::connect().await;

    let server = async {
        srv.serve_tx_control("BEGIN").await;
        srv.serve_tx_control("ROLLBACK").await;
    };

    let client = async {
        assert_eq!(conn.status(), TxStatus::Idle);
        conn.begin().await.unwrap();
        assert_eq!(conn.status(), TxStatus::InTx);
        conn.rollback().await.unwrap();
        assert_eq!(conn.status(), TxStatus::Idle);
    };

    tokio::join!(client, server);
    assert!(!conn.is_bad());
}

#[tokio::test]
async fn begin_then_commit_restores_idle() {
    let (mut conn, mut srv) = common::connect().await;

    let server = async {
        srv.serve_tx_control("BEGIN").await;
        srv.serve_statement(&["n"], vec![vec![Value::Integer(1)]], summary_success("rw"))
            .await;
        srv.serve_tx_control("COMMIT").await;
    };

    let client = async {
        conn.begin().await.unwrap();
        let mut rows = conn
            .query("CREATE (n) RETURN id(n)", Params::new())
            .await
            .unwrap();
        rows.close().await.unwrap();
        assert_eq!(conn.status(), TxStatus::InTx);
        conn.commit().await.unwrap();
        assert_eq!(conn.status(), TxStatus::Idle);
    };

    tokio::join!(client, server);
}

#[tokio::test]
async fn failing_run_marks_transaction_bad() {
    let (mut conn, mut srv) = common::connect().await;

    let server = async {
        srv.serve_tx_control("BEGIN").await;
        srv.serve_failure("Neo.ClientError.Statement.SyntaxError", "bad query")
            .await;
    };

    let client = async {
        conn.begin().await.unwrap();
        assert_eq!(conn.status(), TxStatus::InTx);
        let err = conn.query("bad query", Params::new()).await.unwrap_err();
        assert!(matches!(err, Error::Server { .. }));
        assert_eq!(conn.status(), TxStatus::InBadTx);
    };

    tokio::join!(client, server);
    assert!(!conn.is_bad());
}

#[tokio::test]
async fn commit_in_failed_transaction_rolls_back() {
    let (mut conn, mut srv) = common::connect().await;

    let server = async {
        srv.serve_tx_control("BEGIN").await;
        srv.serve_failure("Neo.ClientError.Statement.SyntaxError", "bad query")
            .await;
        // COMMIT inside the failed transaction turns into a ROLLBACK.
        srv.serve_tx_control("ROLLBACK").await;
    };

    let client = async {
        conn.begin().await.unwrap();
        let _ = conn.query("bad query", Params::new()).await.unwrap_err();
        assert_eq!(conn.status(), TxStatus::InBadTx);

        let err = conn.commit().await.unwrap_err();
        assert!(matches!(err, Error::InFailedTransaction));
        assert_eq!(conn.status(), TxStatus::Idle);
    };

    tokio::join!(client, server);
    assert!(!conn.is_bad());
}

#[tokio::test]
async fn double_commit_poisons_connection() {
    let (mut conn, mut srv) = common::connect().await;

    let server = async {
        srv.serve_tx_control("BEGIN").await;
        srv.serve_tx_control("COMMIT").await;
    };

    let client = async {
        conn.begin().await.unwrap();
        conn.commit().await.unwrap();
        assert_eq!(conn.status(), TxStatus::Idle);

        // No transaction is open any more; the guard trips and poisons.
        let err = conn.commit().await.unwrap_err();
        assert!(matches!(err, Error::TxState(_)));
        assert!(conn.is_bad());

        let err = conn.begin().await.unwrap_err();
        assert!(matches!(err, Error::BadConnection));
    };

    tokio::join!(client, server);
}

#[tokio::test]
async fn nested_begin_poisons_connection() {
    let (mut conn, mut srv) = common::connect().await;

    let server = async {
        srv.serve_tx_control("BEGIN").await;
    };

    let client = async {
        conn.begin().await.unwrap();
        let err = conn.begin().await.unwrap_err();
        assert!(matches!(err, Error::TxState(_)));
        assert!(conn.is_bad());
    };

    tokio::join!(client, server);
}

#[tokio::test]
async fn rollback_without_transaction_poisons() {
    let (mut conn, _srv) = common::connect().await;
    let err = conn.rollback().await.unwrap_err();
    assert!(matches!(err, Error::TxState(_)));
    assert!(conn.is_bad());
}
