use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use crate::models::FiatExchangeRate;
use super::{check_status, http_client, FetchError, FiatRateSource};

const FX_URL: &str = "https://open.er-api.com/v6/latest/USD";

/// Free USD-based exchange rates.
pub struct ExchangeRateClient {
    client: Client,
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    result: String,
    #[serde(default)]
    time_last_update_unix: i64,
    #[serde(default)]
    rates: HashMap<String, f64>,
}

impl ExchangeRateClient {
    pub fn new(timeout_secs: u64) -> Result<Self, FetchError> {
        Ok(Self {
            client: http_client(timeout_secs)?,
        })
    }
}

#[async_trait]
impl FiatRateSource for ExchangeRateClient {
    fn name(&self) -> &'static str {
        "ExchangeRate-API"
    }

    async fn fetch_rate(&self, currency: &str) -> Result<FiatExchangeRate, FetchError> {
        let resp = self.client.get(FX_URL).send().await?;
        let data: RatesResponse = check_status(resp)?.json().await?;
        to_usd_rate(&data, currency)
    }
}

fn to_usd_rate(data: &RatesResponse, currency: &str) -> Result<FiatExchangeRate, FetchError> {
    if data.result != "success" {
        return Err(FetchError::Parse(format!("rate API returned '{}'", data.result)));
    }
    let code = currency.to_uppercase();
    let per_usd = data
        .rates
        .get(&code)
        .copied()
        .filter(|r| *r > 0.0)
        .ok_or_else(|| FetchError::NotFound(format!("exchange rate for {}", code)))?;

    Ok(FiatExchangeRate {
        fiat_currency: code,
        usd_rate: 1.0 / per_usd,
        timestamp: data.time_last_update_unix,
    })
}
