use crate::config::AppConfig;
use crate::error::AppError;
use crate::market::types::{
    parse_listing_payload, parse_market_chart_payload, MarketChartWire, MarketListingWire,
    Timeframe, LISTING_ORDER, LISTING_PER_PAGE, VS_CURRENCY,
};
use reqwest::Client;

pub const API_HOST_HEADER: &str = "x-rapidapi-host";
pub const API_KEY_HEADER: &str = "x-rapidapi-key";

pub const PRIMARY_SOURCE_LABEL: &str = "primary";
pub const FALLBACK_SOURCE_LABEL: &str = "fallback";

fn markets_endpoint(base_url: &str) -> String {
    format!("{base_url}/coins/markets")
        + &format!(
            "?vs_currency={VS_CURRENCY}&order={LISTING_ORDER}&per_page={LISTING_PER_PAGE}&page=1&sparkline=false"
        )
}

fn market_chart_endpoint(base_url: &str, asset_id: &str, timeframe: Timeframe) -> String {
    format!("{base_url}/coins/{asset_id}/market_chart")
        + &format!("?vs_currency={VS_CURRENCY}&days={}", timeframe.as_days())
}

// One wire contract serves both hops of the fallback chain; only the base
// url and auth headers differ.
pub(crate) trait MarketDataSource {
    fn label(&self) -> &str;
    async fn market_listings(&self) -> Result<Vec<MarketListingWire>, AppError>;
    async fn market_chart(
        &self,
        asset_id: &str,
        timeframe: Timeframe,
    ) -> Result<MarketChartWire, AppError>;
}

#[derive(Debug, Clone)]
pub struct RestMarketSource {
    client: Client,
    label: &'static str,
    base_url: String,
    host_header: Option<String>,
    api_key: Option<String>,
}

impl RestMarketSource {
    pub fn primary(client: Client, base_url: String, host_header: String, api_key: String) -> Self {
        Self {
            client,
            label: PRIMARY_SOURCE_LABEL,
            base_url,
            host_header: Some(host_header),
            api_key: Some(api_key),
        }
    }

    pub fn fallback(client: Client, base_url: String) -> Self {
        Self {
            client,
            label: FALLBACK_SOURCE_LABEL,
            base_url,
            host_header: None,
            api_key: None,
        }
    }

    async fn fetch_bytes(&self, endpoint: String) -> Result<Vec<u8>, AppError> {
        let mut request = self.client.get(endpoint);
        if let Some(host_header) = &self.host_header {
            request = request.header(API_HOST_HEADER, host_header);
        }
        if let Some(api_key) = &self.api_key {
            request = request.header(API_KEY_HEADER, api_key);
        }
        let response = request.send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

impl MarketDataSource for RestMarketSource {
    fn label(&self) -> &str {
        self.label
    }

    async fn market_listings(&self) -> Result<Vec<MarketListingWire>, AppError> {
        let mut payload = self.fetch_bytes(markets_endpoint(&self.base_url)).await?;
        parse_listing_payload(&mut payload)
    }

    async fn market_chart(
        &self,
        asset_id: &str,
        timeframe: Timeframe,
    ) -> Result<MarketChartWire, AppError> {
        let endpoint = market_chart_endpoint(&self.base_url, asset_id, timeframe);
        let mut payload = self.fetch_bytes(endpoint).await?;
        parse_market_chart_payload(&mut payload)
    }
}

pub fn build_market_sources(config: &AppConfig) -> Result<Vec<RestMarketSource>, AppError> {
    let client = Client::builder().timeout(config.request_timeout).build()?;

    let mut sources = Vec::with_capacity(2);
    if let Some(primary) = &config.primary {
        sources.push(RestMarketSource::primary(
            client.clone(),
            primary.base_url.clone(),
            primary.host_header.clone(),
            primary.api_key.clone(),
        ));
    }
    sources.push(RestMarketSource::fallback(
        client,
        config.fallback_base_url.clone(),
    ));
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PrimarySourceConfig, DEFAULT_FALLBACK_API_BASE};
    use std::time::Duration;

    fn test_config(primary: Option<PrimarySourceConfig>) -> AppConfig {
        AppConfig {
            mock_mode: false,
            refresh_interval: Duration::from_secs(30),
            request_timeout: Duration::from_secs(10),
            log_file: None,
            debug: false,
            primary,
            fallback_base_url: DEFAULT_FALLBACK_API_BASE.to_string(),
        }
    }

    #[test]
    fn markets_endpoint_requests_full_listing_page() {
        let endpoint = markets_endpoint("https://api.coingecko.com/api/v3");
        assert!(endpoint.contains("/coins/markets?"));
        assert!(endpoint.contains("vs_currency=usd"));
        assert!(endpoint.contains("order=market_cap_desc"));
        assert!(endpoint.contains("per_page=50"));
        assert!(endpoint.contains("page=1"));
        assert!(endpoint.contains("sparkline=false"));
    }

    #[test]
    fn market_chart_endpoint_uses_asset_id_and_days() {
        let endpoint = market_chart_endpoint(
            "https://api.coingecko.com/api/v3",
            "the-open-network",
            Timeframe::D7,
        );
        assert!(endpoint.contains("/coins/the-open-network/market_chart?"));
        assert!(endpoint.contains("vs_currency=usd"));
        assert!(endpoint.contains("days=7"));
    }

    #[test]
    fn source_chain_leads_with_primary_when_configured() {
        let config = test_config(Some(PrimarySourceConfig {
            base_url: "https://mirror.test/api/v3".to_string(),
            host_header: "mirror.test".to_string(),
            api_key: "key".to_string(),
        }));

        let sources = build_market_sources(&config).expect("sources should build");
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].label(), PRIMARY_SOURCE_LABEL);
        assert_eq!(sources[1].label(), FALLBACK_SOURCE_LABEL);
    }

    #[test]
    fn source_chain_is_fallback_only_without_a_key() {
        let sources = build_market_sources(&test_config(None)).expect("sources should build");
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].label(), FALLBACK_SOURCE_LABEL);
    }
}
