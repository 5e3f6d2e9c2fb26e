//! Payment history served by the data store's HTTP API.

use anyhow::{Context, Result};
use reqwest::Client;

use crate::models::{Id, PaymentRecord};

use super::PaymentLookup;

/// Fetches `GET {base_url}/repairs/{repairId}/payments`, expecting a JSON array
/// of payment records. A 404 means the repair has no payment history yet.
#[derive(Debug, Clone)]
pub struct HttpPaymentLookup {
    client: Client,
    base_url: String,
}

impl HttpPaymentLookup {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait::async_trait]
impl PaymentLookup for HttpPaymentLookup {
    async fn payments_for_repair(&self, repair_id: &Id) -> Result<Vec<PaymentRecord>> {
        let segment = repair_id.as_path_segment()?;
        let url = format!("{}/repairs/{segment}/payments", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Payment lookup request failed: {url}"))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        response
            .error_for_status()
            .with_context(|| format!("Payment lookup rejected: {url}"))?
            .json::<Vec<PaymentRecord>>()
            .await
            .with_context(|| format!("Invalid payment history from {url}"))
    }
}
