use crate::domain::account::{BalanceRecord, UserId};
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct BalanceRow<'a> {
    user: UserId,
    balance: String,
    currency: &'a str,
}

/// Writes the final balance report as CSV: `user,balance,currency`.
pub struct BalanceWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> BalanceWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_balances(
        &mut self,
        balances: impl IntoIterator<Item = BalanceRecord>,
    ) -> Result<()> {
        for record in balances {
            self.writer.serialize(BalanceRow {
                user: record.user_id,
                balance: record.amount.to_string(),
                currency: &record.currency,
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::Balance;
    use rust_decimal_macros::dec;

    #[test]
    fn test_writes_header_and_normalized_balances() {
        let mut first = BalanceRecord::new(1, "BTC");
        first.amount = Balance::new(dec!(102.50000000));
        let second = BalanceRecord::new(2, "ETH");

        let mut buffer = Vec::new();
        BalanceWriter::new(&mut buffer)
            .write_balances(vec![first, second])
            .unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert_eq!(output, "user,balance,currency\n1,102.5,BTC\n2,0,ETH\n");
    }
}
