use crate::domain::account::{Balance, BalanceRecord, DEFAULT_CURRENCY, UserId};
use crate::domain::ports::LedgerStore;
use crate::domain::transaction::{
    BetEntry, BetRecord, LedgerBatch, Transaction, TransactionEntry,
};
use crate::error::{Result, WagerError};
use async_trait::async_trait;
use chrono::Utc;
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for balance rows, keyed by user id.
pub const CF_BALANCES: &str = "balances";
/// Column Family for transactions, keyed by user id then history sequence.
pub const CF_TRANSACTIONS: &str = "transactions";
/// Column Family for bet records, keyed by user id then history sequence.
pub const CF_BETS: &str = "bets";
/// Next history sequence, stored in the default column family.
const SEQUENCE_KEY: &[u8] = b"history_sequence";

/// A persistent ledger using RocksDB.
///
/// History keys are `user_id (8 bytes BE) ++ sequence (8 bytes BE)`. The
/// sequence is store-wide and only grows, so a prefix scan returns a user's
/// records in insertion order. A `LedgerBatch` maps onto a single RocksDB
/// `WriteBatch` that also persists the advanced sequence.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBLedgerStore {
    db: Arc<DB>,
    currency: String,
    // Serializes the lazy creation of balance rows.
    create_lock: Arc<Mutex<()>>,
    // Next history sequence; held across each history write.
    sequence: Arc<Mutex<u64>>,
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| {
        WagerError::InternalError(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Serialization error: {}", e),
        )))
    })
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| {
        WagerError::InternalError(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Deserialization error: {}", e),
        )))
    })
}

fn history_key(user_id: UserId, sequence: u64) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&user_id.to_be_bytes());
    key[8..].copy_from_slice(&sequence.to_be_bytes());
    key
}

fn read_sequence(db: &DB) -> Result<u64> {
    match db.get(SEQUENCE_KEY)? {
        Some(bytes) => {
            let raw: [u8; 8] = bytes
                .as_slice()
                .try_into()
                .map_err(|_| WagerError::internal("corrupt history sequence"))?;
            Ok(u64::from_be_bytes(raw))
        }
        None => Ok(0),
    }
}

impl RocksDBLedgerStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the "balances", "transactions" and "bets" column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_currency(path, DEFAULT_CURRENCY)
    }

    pub fn open_with_currency<P: AsRef<Path>>(
        path: P,
        currency: impl Into<String>,
    ) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_BALANCES, CF_TRANSACTIONS, CF_BETS]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();
        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;
        let sequence = read_sequence(&db)?;

        Ok(Self {
            db: Arc::new(db),
            currency: currency.into(),
            create_lock: Arc::new(Mutex::new(())),
            sequence: Arc::new(Mutex::new(sequence)),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| WagerError::internal(format!("{} column family not found", name)))
    }

    fn read_balance(&self, user_id: UserId) -> Result<Option<BalanceRecord>> {
        let cf = self.cf(CF_BALANCES)?;
        match self.db.get_cf(cf, user_id.to_be_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan_user<T: DeserializeOwned>(&self, cf_name: &str, user_id: UserId) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let prefix = user_id.to_be_bytes();
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(&prefix, Direction::Forward));

        let mut items = Vec::new();
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            items.push(decode(&value)?);
        }
        Ok(items)
    }

    fn balance_after(&self, user_id: UserId, amount: Balance) -> Result<BalanceRecord> {
        if amount.is_negative() {
            return Err(WagerError::internal(format!(
                "refusing to store negative balance {}",
                amount
            )));
        }
        let mut record = self
            .read_balance(user_id)?
            .unwrap_or_else(|| BalanceRecord::new(user_id, self.currency.clone()));
        record.amount = amount;
        Ok(record)
    }

    /// Writes one atomic batch, assigning history sequences in argument order.
    async fn write_records(
        &self,
        user_id: UserId,
        balance: Option<BalanceRecord>,
        transactions: &[Transaction],
        bet: Option<&BetRecord>,
    ) -> Result<()> {
        let mut next = self.sequence.lock().await;
        let mut sequence = *next;
        let mut write = WriteBatch::default();

        if let Some(record) = balance {
            write.put_cf(self.cf(CF_BALANCES)?, user_id.to_be_bytes(), encode(&record)?);
        }
        for tx in transactions {
            let key = history_key(user_id, sequence);
            write.put_cf(self.cf(CF_TRANSACTIONS)?, key, encode(tx)?);
            sequence += 1;
        }
        if let Some(bet) = bet {
            write.put_cf(self.cf(CF_BETS)?, history_key(user_id, sequence), encode(bet)?);
            sequence += 1;
        }
        write.put(SEQUENCE_KEY, sequence.to_be_bytes());

        self.db.write(write)?;
        *next = sequence;
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for RocksDBLedgerStore {
    async fn get_balance(&self, user_id: UserId) -> Result<BalanceRecord> {
        if let Some(record) = self.read_balance(user_id)? {
            return Ok(record);
        }
        let _guard = self.create_lock.lock().await;
        if let Some(record) = self.read_balance(user_id)? {
            return Ok(record);
        }
        let record = BalanceRecord::new(user_id, self.currency.clone());
        self.db
            .put_cf(self.cf(CF_BALANCES)?, user_id.to_be_bytes(), encode(&record)?)?;
        Ok(record)
    }

    async fn set_balance(&self, user_id: UserId, amount: Balance) -> Result<()> {
        let record = self.balance_after(user_id, amount)?;
        self.db
            .put_cf(self.cf(CF_BALANCES)?, user_id.to_be_bytes(), encode(&record)?)?;
        Ok(())
    }

    async fn record_transaction(
        &self,
        user_id: UserId,
        entry: TransactionEntry,
    ) -> Result<Transaction> {
        let tx = entry.into_record(user_id, Utc::now());
        self.write_records(user_id, None, std::slice::from_ref(&tx), None)
            .await?;
        Ok(tx)
    }

    async fn record_bet(&self, user_id: UserId, entry: BetEntry) -> Result<BetRecord> {
        let bet = entry.into_record(user_id, Utc::now());
        self.write_records(user_id, None, &[], Some(&bet)).await?;
        Ok(bet)
    }

    async fn commit(&self, batch: LedgerBatch) -> Result<()> {
        let user_id = batch.user_id;
        let now = Utc::now();
        let balance = batch
            .balance
            .map(|amount| self.balance_after(user_id, amount))
            .transpose()?;
        let transactions = batch
            .transactions
            .into_iter()
            .map(|entry| entry.into_record(user_id, now))
            .collect::<Vec<_>>();
        let bet = batch.bet.map(|entry| entry.into_record(user_id, now));

        self.write_records(user_id, balance, &transactions, bet.as_ref())
            .await
    }

    async fn transactions(&self, user_id: UserId) -> Result<Vec<Transaction>> {
        self.scan_user(CF_TRANSACTIONS, user_id)
    }

    async fn bets(&self, user_id: UserId) -> Result<Vec<BetRecord>> {
        self.scan_user(CF_BETS, user_id)
    }

    async fn balances(&self) -> Result<Vec<BalanceRecord>> {
        let cf = self.cf(CF_BALANCES)?;
        let mut balances = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            balances.push(decode::<BalanceRecord>(&value)?);
        }
        Ok(balances)
    }
}
