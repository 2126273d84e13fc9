//! Read-only client for the account ledger service.

use crate::models::{AccountBalance, Position, PriceBar, Trade};
use crate::resilience::{CallError, ResilientClient};

/// Ledger reads: balance, open positions, trade and price history.
#[derive(Debug)]
pub struct LedgerClient {
    client: ResilientClient,
    account_id: i64,
}

impl LedgerClient {
    /// Wrap a resilient client for one account's ledger.
    #[must_use]
    pub fn new(client: ResilientClient, account_id: i64) -> Self {
        Self {
            client,
            account_id,
        }
    }

    /// The configured account.
    #[must_use]
    pub fn account_id(&self) -> i64 {
        self.account_id
    }

    /// Current cash balance for the configured account.
    pub async fn balance(&self, correlation_id: &str) -> Result<AccountBalance, CallError> {
        let path = format!("/accounts/{}/balance", self.account_id);
        let response = self.client.get(&path, correlation_id).await?;
        response.json(self.client.service())
    }

    /// Open positions for the configured account.
    pub async fn positions(&self, correlation_id: &str) -> Result<Vec<Position>, CallError> {
        let path = format!("/accounts/{}/positions", self.account_id);
        let response = self.client.get(&path, correlation_id).await?;
        response.json(self.client.service())
    }

    /// Recent executed trades, newest first.
    pub async fn trade_history(&self, correlation_id: &str) -> Result<Vec<Trade>, CallError> {
        let path = format!("/accounts/{}/trades", self.account_id);
        let response = self.client.get(&path, correlation_id).await?;
        response.json(self.client.service())
    }

    /// Price bars for one instrument.
    pub async fn price_history(
        &self,
        instrument_id: &str,
        correlation_id: &str,
    ) -> Result<Vec<PriceBar>, CallError> {
        let path = format!("/instruments/{instrument_id}/prices");
        let response = self.client.get(&path, correlation_id).await?;
        response.json(self.client.service())
    }
}
