//! Reqwest-backed gateway adapter.
//!
//! Bodies are decoded with simd-json into the DTOs in [`super::dto`] and then
//! validated into domain records in one pass.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::dto::{HistoryDto, SnapshotDto};
use super::{Gateway, GatewayError};
use crate::model::{CounterSnapshot, RegionRecord, Timeline};

const DEFAULT_USER_AGENT: &str = concat!("tui-tracker/", env!("CARGO_PKG_VERSION"));

/// Gateway that performs GET requests against one counter service base URL.
pub struct HttpGateway {
    client: Client,
    base_url: Url,
}

impl HttpGateway {
    /// Build a gateway with an explicit per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                GatewayError::network(format!("base url `{}` cannot carry a path", self.base_url))
            })?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    async fn get(&self, url: Url) -> Result<(StatusCode, Vec<u8>), GatewayError> {
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        debug!(status = status.as_u16(), bytes = body.len(), "response");
        Ok((status, body.to_vec()))
    }

    async fn get_ok(&self, url: Url) -> Result<Vec<u8>, GatewayError> {
        let (status, body) = self.get(url).await?;
        if !status.is_success() {
            return Err(map_status_error(status, &body));
        }
        Ok(body)
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn fetch_global_snapshot(&self) -> Result<CounterSnapshot, GatewayError> {
        let mut body = self.get_ok(self.endpoint(&["all"])?).await?;
        parse_global(&mut body)
    }

    async fn fetch_all_regions(&self) -> Result<Vec<RegionRecord>, GatewayError> {
        let mut body = self.get_ok(self.endpoint(&["countries"])?).await?;
        parse_regions(&mut body)
    }

    async fn fetch_region_snapshot(&self, iso_code: &str) -> Result<CounterSnapshot, GatewayError> {
        let (status, mut body) = self.get(self.endpoint(&["countries", iso_code])?).await?;
        if status == StatusCode::NOT_FOUND {
            return Err(GatewayError::unknown_region(iso_code));
        }
        if !status.is_success() {
            return Err(map_status_error(status, &body));
        }
        parse_region_snapshot(iso_code, &mut body)
    }

    async fn fetch_history(&self, last_days: u32) -> Result<Timeline, GatewayError> {
        let mut url = self.endpoint(&["historical", "all"])?;
        url.query_pairs_mut()
            .append_pair("lastdays", &last_days.to_string());
        let mut body = self.get_ok(url).await?;
        parse_history(&mut body)
    }
}

fn decode<T: DeserializeOwned>(body: &mut [u8], what: &str) -> Result<T, GatewayError> {
    simd_json::serde::from_slice(body)
        .map_err(|e| GatewayError::malformed(format!("invalid {what} JSON payload: {e}")))
}

fn parse_global(body: &mut [u8]) -> Result<CounterSnapshot, GatewayError> {
    decode::<SnapshotDto>(body, "global snapshot")?.into_global_snapshot()
}

/// Decode the all-regions array, keeping service order. Rows without an iso
/// code and repeated iso codes are skipped so codes stay unique.
fn parse_regions(body: &mut [u8]) -> Result<Vec<RegionRecord>, GatewayError> {
    let rows: Vec<SnapshotDto> = decode(body, "regions")?;
    let mut seen = HashSet::with_capacity(rows.len());
    let mut records = Vec::with_capacity(rows.len());

    for (index, row) in rows.into_iter().enumerate() {
        let name = row.country.clone().unwrap_or_default();
        match row.into_region_record(index)? {
            Some(record) if seen.insert(record.iso_code.clone()) => records.push(record),
            Some(record) => warn!(
                iso = %record.iso_code,
                country = %record.country,
                "duplicate iso code, keeping first"
            ),
            None => warn!(country = %name, "region without iso code skipped"),
        }
    }
    Ok(records)
}

fn parse_region_snapshot(code: &str, body: &mut [u8]) -> Result<CounterSnapshot, GatewayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(GatewayError::unknown_region(code));
    }
    let dto: SnapshotDto = decode(body, "region snapshot")?;
    if dto.is_empty() {
        return Err(GatewayError::unknown_region(code));
    }
    dto.into_region_snapshot(code)
}

fn parse_history(body: &mut [u8]) -> Result<Timeline, GatewayError> {
    decode::<HistoryDto>(body, "history")?.into_timeline()
}

fn map_transport_error(error: reqwest::Error) -> GatewayError {
    if error.is_timeout() {
        GatewayError::network(format!("timed out: {error}"))
    } else {
        GatewayError::network(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> GatewayError {
    let preview = body_preview(body);
    if preview.is_empty() {
        GatewayError::network(format!("status {}", status.as_u16()))
    } else {
        GatewayError::network(format!("status {}: {}", status.as_u16(), preview))
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 120;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
