// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Field normalization: one line of the ingest body decodes into a
//! [`RawEvent`] or fails for that line only.
//!
//! The upstream platform transmits several numeric fields as quoted decimal
//! strings; those are parsed into numbers here, and a non-numeric value makes
//! the whole record malformed. Missing fields decode as empty strings or
//! zero. Unknown fields are ignored.

use serde::{Deserialize, Deserializer};

/// One decoded delivery-log record. Lives only for the duration of one
/// line's processing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawEvent {
    /// Event start time, epoch milliseconds as a decimal string.
    pub start: String,
    pub message: Message,
    #[serde(rename = "resHdr")]
    pub response: ResponseHeaders,
    #[serde(rename = "netPerf")]
    pub performance: Performance,
    pub network: Network,
    pub geo: Geo,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Message {
    #[serde(rename = "proto")]
    pub protocol: String,
    #[serde(rename = "protoVer")]
    pub protocol_version: String,
    #[serde(rename = "cliIP")]
    pub client_ip: String,
    #[serde(rename = "reqHost")]
    pub host: String,
    #[serde(rename = "reqMethod")]
    pub method: String,
    #[serde(rename = "reqPath")]
    pub path: String,
    #[serde(rename = "reqQuery")]
    pub query: String,
    pub status: String,
    #[serde(rename = "respCT")]
    pub content_type: String,
    #[serde(rename = "respLen", deserialize_with = "f64_from_string")]
    pub response_length: f64,
    #[serde(rename = "bytes", deserialize_with = "f64_from_string")]
    pub response_bytes: f64,
    #[serde(rename = "UA")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResponseHeaders {
    #[serde(rename = "contEnc")]
    pub content_encoding: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Performance {
    #[serde(rename = "downloadTime", deserialize_with = "f64_from_string")]
    pub download_time_ms: f64,
    #[serde(rename = "netOriginLatency", deserialize_with = "f64_from_string")]
    pub origin_latency_ms: f64,
    #[serde(rename = "originRetry", deserialize_with = "u32_from_string")]
    pub origin_retries: u32,
    #[serde(rename = "cacheStatus", deserialize_with = "i64_from_string")]
    pub cache_status: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Network {
    #[serde(rename = "asnum")]
    pub as_number: String,
    #[serde(rename = "edgeIP")]
    pub edge_ip: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Geo {
    pub country: String,
}

impl RawEvent {
    /// Decode one line of the ingest body.
    pub fn from_line(line: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(line)
    }

    /// Response size in bytes. The platform reports both a header-declared
    /// length and a wire byte count; the larger of the two wins.
    pub fn response_size(&self) -> f64 {
        self.message.response_length.max(self.message.response_bytes)
    }
}

fn f64_from_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse::<f64>()
        .map_err(|_| serde::de::Error::custom(format!("invalid numeric string {raw:?}")))
}

fn u32_from_string<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse::<u32>()
        .map_err(|_| serde::de::Error::custom(format!("invalid numeric string {raw:?}")))
}

fn i64_from_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse::<i64>()
        .map_err(|_| serde::de::Error::custom(format!("invalid numeric string {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    pub const SAMPLE_LINE: &str = r#"{"type":"cloudmonitor","format":"default","version":"1.0","id":"7f3a","start":"1723390200123.5","message":{"proto":"https","protoVer":"1.1","cliIP":"203.0.113.7","reqHost":"static.example.com","reqMethod":"GET","reqPath":"/assets%2Fapp.js","reqQuery":"v%3D3","status":"200","respCT":"application/JavaScript","respLen":"10240","bytes":"10480","UA":"Mozilla/5.0"},"resHdr":{"contEnc":"gzip"},"netPerf":{"downloadTime":"42.5","netOriginLatency":"12","originRetry":"1","cacheStatus":"2","edgeIP":"198.51.100.1"},"network":{"asnum":"64496","edgeIP":"198.51.100.1"},"geo":{"country":"DE"}}"#;

    #[test]
    fn test_decodes_full_record() {
        let event = RawEvent::from_line(SAMPLE_LINE.as_bytes()).unwrap();
        assert_eq!(event.start, "1723390200123.5");
        assert_eq!(event.message.host, "static.example.com");
        assert_eq!(event.message.method, "GET");
        assert_eq!(event.message.status, "200");
        assert_eq!(event.message.protocol, "https");
        assert_eq!(event.message.response_length, 10240.0);
        assert_eq!(event.message.response_bytes, 10480.0);
        assert_eq!(event.response.content_encoding, "gzip");
        assert_eq!(event.performance.download_time_ms, 42.5);
        assert_eq!(event.performance.origin_latency_ms, 12.0);
        assert_eq!(event.performance.origin_retries, 1);
        assert_eq!(event.performance.cache_status, 2);
        assert_eq!(event.network.edge_ip, "198.51.100.1");
        assert_eq!(event.geo.country, "DE");
    }

    #[test]
    fn test_missing_fields_default_to_zero() {
        let event = RawEvent::from_line(br#"{"message":{"reqHost":"a.example"}}"#).unwrap();
        assert_eq!(event.message.host, "a.example");
        assert_eq!(event.message.response_bytes, 0.0);
        assert_eq!(event.performance.cache_status, 0);
        assert_eq!(event.performance.origin_retries, 0);
        assert!(event.geo.country.is_empty());
    }

    #[test]
    fn test_non_numeric_string_is_malformed() {
        let err = RawEvent::from_line(br#"{"netPerf":{"cacheStatus":"lots"}}"#).unwrap_err();
        assert!(err.to_string().contains("invalid numeric string"));

        assert!(RawEvent::from_line(br#"{"message":{"bytes":""}}"#).is_err());
    }

    #[test]
    fn test_unquoted_number_in_string_field_is_malformed() {
        // The upstream always quotes these; an unquoted number means the
        // record does not match the contract.
        assert!(RawEvent::from_line(br#"{"netPerf":{"downloadTime":42.5}}"#).is_err());
    }

    #[test]
    fn test_not_json_is_malformed() {
        assert!(RawEvent::from_line(b"plainly not json").is_err());
        assert!(RawEvent::from_line(b"").is_err());
    }

    #[test]
    fn test_response_size_takes_larger_field() {
        let mut event = RawEvent::default();
        event.message.response_length = 100.0;
        event.message.response_bytes = 175.0;
        assert_eq!(event.response_size(), 175.0);

        event.message.response_bytes = 50.0;
        assert_eq!(event.response_size(), 100.0);
    }
}
