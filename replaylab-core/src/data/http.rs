//! HTTP market source.
//!
//! Talks to three services: one serving candles and exchange info, one
//! computing indicators and one serving other algorithms' result sets. All
//! responses are JSON. A 404 is a confirmed absence; any other non-success
//! status, transport failure or undecodable body is an error. Nothing is
//! retried here: failures surface to the run.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::cache::CacheMode;
use super::error::DataError;
use super::request::{Payload, Request, RequestKind};
use super::source::MarketSource;
use crate::domain::{CandleSet, ExchangeList, Indicator};
use crate::results::ScenarioResultSet;

/// Base URLs of the upstream services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUrls {
    pub candles: String,
    pub indicators: String,
    pub algorithms: String,
}

impl SourceUrls {
    fn base(&self, kind: RequestKind) -> &str {
        match kind {
            RequestKind::Candles => &self.candles,
            RequestKind::Indicator => &self.indicators,
            RequestKind::Algorithm => &self.algorithms,
        }
    }
}

pub struct HttpSource {
    client: reqwest::blocking::Client,
    urls: SourceUrls,
    mode: CacheMode,
}

impl HttpSource {
    pub fn new(urls: SourceUrls, timeout: Duration, mode: CacheMode) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DataError::Network {
                url: urls.candles.clone(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client, urls, mode })
    }

    /// Absolute URL for `request`. Live mode asks upstream to bypass its own cache.
    pub fn url_for(&self, request: &Request) -> String {
        let mut url = join_url(self.urls.base(request.kind()), &request.path());
        if self.mode == CacheMode::Live {
            url.push_str("&cache=no-cache");
        }
        url
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>, DataError> {
        let resp = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .map_err(|e| DataError::Network {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(DataError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        resp.json::<T>().map(Some).map_err(|e| DataError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

impl MarketSource for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    fn fetch(&self, request: &Request) -> Result<Option<Payload>, DataError> {
        let url = self.url_for(request);
        let payload = match request.kind() {
            RequestKind::Candles => self
                .get_json::<CandleSet>(&url)?
                .map(|c| Payload::Candles(Arc::new(c))),
            RequestKind::Indicator => self
                .get_json::<Indicator>(&url)?
                .map(|i| Payload::Indicator(Arc::new(i))),
            RequestKind::Algorithm => self
                .get_json::<ScenarioResultSet>(&url)?
                .map(|r| Payload::Algorithm(Arc::new(r))),
        };
        Ok(payload)
    }

    fn exchange_info(&self) -> Result<ExchangeList, DataError> {
        let url = join_url(&self.urls.candles, "market/info");
        self.get_json::<ExchangeList>(&url)?
            .ok_or_else(|| DataError::not_found("exchange info"))
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}
