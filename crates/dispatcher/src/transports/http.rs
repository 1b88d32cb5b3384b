//! HttpTransport - POSTs table groups to the Magento BI import API

use std::fmt;
use std::time::Duration;

use contracts::{ContractError, TargetConfig, TransferRequest, TransferResponse, Transport};
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use tracing::{debug, instrument, warn};

use crate::error::DispatcherError;

/// Configuration for HttpTransport
#[derive(Clone)]
pub struct HttpTransportConfig {
    /// Base URL, e.g. `https://connect.rjmetrics.com/v2/`
    pub base_url: Url,
    /// Key appended as the `apikey` query parameter
    pub api_key: String,
    /// Whole-request timeout
    pub timeout: Duration,
    /// TCP connect timeout
    pub connect_timeout: Duration,
}

impl fmt::Debug for HttpTransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransportConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"***")
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl HttpTransportConfig {
    /// Build from a parsed base URL
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DispatcherError> {
        let parsed =
            Url::parse(base_url).map_err(|e| DispatcherError::invalid_url(base_url, e.to_string()))?;

        if parsed.cannot_be_a_base() {
            return Err(DispatcherError::invalid_url(
                base_url,
                "url cannot carry a path",
            ));
        }

        Ok(Self {
            base_url: parsed,
            api_key: api_key.into(),
            timeout,
            connect_timeout: Duration::from_secs(10),
        })
    }

    /// Create config from the connector configuration
    pub fn from_target_config(config: &TargetConfig) -> Result<Self, DispatcherError> {
        Self::new(
            &config.magentobi_url,
            config.api_key.clone(),
            config.request_timeout(),
        )
    }
}

/// Transport that talks HTTP to the import API
pub struct HttpTransport {
    name: String,
    config: HttpTransportConfig,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a new HttpTransport
    #[instrument(name = "http_transport_new", skip(name, config))]
    pub fn new(name: impl Into<String>, config: HttpTransportConfig) -> Result<Self, DispatcherError> {
        let name = name.into();
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .build()
            .map_err(|e| DispatcherError::transport_creation(&name, e.to_string()))?;

        debug!(
            transport = %name,
            base_url = %config.base_url,
            "HttpTransport ready"
        );

        Ok(Self {
            name,
            config,
            client,
        })
    }

    /// Per-table resource: `{base}/client/{client_id}/table/{table}/data?apikey={key}`
    pub fn endpoint(&self, client_id: u64, table_name: &str) -> Result<Url, ContractError> {
        let mut url = self.config.base_url.clone();
        let client_id = client_id.to_string();

        url.path_segments_mut()
            .map_err(|_| ContractError::transfer_connection(table_name, "invalid base url"))?
            .pop_if_empty()
            .extend(["client", client_id.as_str(), "table", table_name, "data"]);
        url.query_pairs_mut()
            .append_pair("apikey", &self.config.api_key);

        Ok(url)
    }
}

impl Transport for HttpTransport {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "http_transport_post",
        skip(self, request),
        fields(transport = %self.name, table = %request.table_name, bytes = request.body.len())
    )]
    async fn post(&self, request: TransferRequest) -> Result<TransferResponse, ContractError> {
        let TransferRequest {
            client_id,
            table_name,
            body,
        } = request;
        let url = self.endpoint(client_id, &table_name)?;

        // reqwest errors print the url, which carries the api key
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| ContractError::transfer_connection(&table_name, e.without_url().to_string()))?;

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(status, error = %e.without_url(), "Failed to read response body");
                String::new()
            }
        };

        debug!(status, "Response received");
        Ok(TransferResponse { status, body })
    }
}
