#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use rust_decimal_macros::dec;
use std::io::Write;
use std::process::Command;
use tempfile::tempdir;
use wagerd::application::engine::WageringEngine;
use wagerd::config::EngineConfig;
use wagerd::domain::account::{Amount, Balance};
use wagerd::domain::game::{SessionGame, SessionParams};
use wagerd::infrastructure::in_memory::InMemorySessionStore;
use wagerd::infrastructure::rocksdb::RocksDBLedgerStore;

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: deposit and play a tower round to a 1x cashout
    let mut csv1 = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv1, "op, user, game, amount, arg").unwrap();
    writeln!(csv1, "deposit, 1, , 100,").unwrap();
    writeln!(csv1, "start, 1, tower, 10,").unwrap();
    writeln!(csv1, "cashout, 1, tower, ,").unwrap();

    let mut cmd1 = Command::new(cargo_bin!("wagerd"));
    cmd1.arg(csv1.path()).arg("--db-path").arg(&db_path);

    let output1 = cmd1.output().expect("Failed to execute command");
    assert!(output1.status.success());
    let stdout1 = String::from_utf8_lossy(&output1.stdout);
    assert!(stdout1.contains("1,100,BTC"));

    // 2. Second run: another deposit against the same ledger
    let mut csv2 = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv2, "op, user, game, amount, arg").unwrap();
    writeln!(csv2, "deposit, 1, , 50,").unwrap();

    let mut cmd2 = Command::new(cargo_bin!("wagerd"));
    cmd2.arg(csv2.path()).arg("--db-path").arg(&db_path);

    let output2 = cmd2.output().expect("Failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);
    assert!(stdout2.contains("1,150,BTC"));
}

#[tokio::test]
async fn test_rocksdb_ledger_keeps_history_across_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ledger");

    {
        let store = RocksDBLedgerStore::open(&path).unwrap();
        let engine = WageringEngine::new(
            Box::new(store),
            Box::new(InMemorySessionStore::new()),
            EngineConfig::default(),
        );
        engine
            .deposit(1, Amount::new(dec!(40)).unwrap())
            .await
            .unwrap();
        engine
            .start_session(1, Amount::new(dec!(4)).unwrap(), SessionParams::Tower)
            .await
            .unwrap();
        engine.cashout_session(1, SessionGame::Tower).await.unwrap();
    }

    let store = RocksDBLedgerStore::open(&path).unwrap();
    let engine = WageringEngine::new(
        Box::new(store),
        Box::new(InMemorySessionStore::new()),
        EngineConfig::default(),
    );
    assert_eq!(
        engine.get_balance(1).await.unwrap().amount,
        Balance::new(dec!(40))
    );
    // deposit, stake, 1x return
    assert_eq!(engine.transactions(1).await.unwrap().len(), 3);
    assert_eq!(engine.bets(1).await.unwrap().len(), 1);
}
