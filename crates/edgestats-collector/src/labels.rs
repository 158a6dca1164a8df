// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Label derivation: pure mappings from raw event fields to closed
//! label vocabularies, plus the timestamp and percent-decoding helpers.
//!
//! Every label dimension is an enum so the cardinality bound is a type-level
//! invariant; raw field values never become label values directly.

use std::borrow::Cow;
use std::net::IpAddr;

use chrono::{DateTime, TimeZone, Utc};

/// Cache outcome derived from the platform's numeric cacheStatus code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    NotCachable,
    Hit,
    Miss,
    Unknown,
}

impl CacheOutcome {
    /// Codes outside the known set collapse to [`CacheOutcome::Unknown`];
    /// the raw integer never propagates.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => CacheOutcome::NotCachable,
            1 | 2 => CacheOutcome::Hit,
            3 => CacheOutcome::Miss,
            _ => CacheOutcome::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CacheOutcome::NotCachable => "notcachable",
            CacheOutcome::Hit => "hit",
            CacheOutcome::Miss => "miss",
            CacheOutcome::Unknown => "-",
        }
    }
}

/// IP address family of the client address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpVersion {
    V4,
    V6,
    Unknown,
}

impl IpVersion {
    /// Unparseable input never raises; it falls into `Unknown`.
    pub fn from_addr(raw: &str) -> Self {
        match raw.parse::<IpAddr>() {
            Ok(IpAddr::V4(_)) => IpVersion::V4,
            Ok(IpAddr::V6(_)) => IpVersion::V6,
            Err(_) => IpVersion::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IpVersion::V4 => "ipv4",
            IpVersion::V6 => "ipv6",
            IpVersion::Unknown => "unknown",
        }
    }
}

/// Event start time: epoch milliseconds as a float string.
///
/// A parse failure substitutes the current wall clock, which silently
/// fabricates a near-zero log latency for that event. This mirrors the
/// historical collector behavior and is deliberately preserved.
pub fn start_time(raw: &str) -> DateTime<Utc> {
    raw.parse::<f64>()
        .ok()
        .and_then(|millis| Utc.timestamp_millis_opt(millis as i64).single())
        .unwrap_or_else(Utc::now)
}

/// Percent-decode for access-log rendering only. A decode failure collapses
/// the field to an empty string rather than passing the raw original along.
pub fn percent_decode(raw: &str) -> String {
    urlencoding::decode(raw).map(Cow::into_owned).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_outcome_known_codes() {
        assert_eq!(CacheOutcome::from_code(0).as_str(), "notcachable");
        assert_eq!(CacheOutcome::from_code(1).as_str(), "hit");
        assert_eq!(CacheOutcome::from_code(2).as_str(), "hit");
        assert_eq!(CacheOutcome::from_code(3).as_str(), "miss");
    }

    #[test]
    fn test_cache_outcome_unknown_codes_collapse() {
        for code in [-1, 4, 7, 9999, i64::MAX, i64::MIN] {
            assert_eq!(CacheOutcome::from_code(code).as_str(), "-");
        }
    }

    #[test]
    fn test_ip_version() {
        assert_eq!(IpVersion::from_addr("203.0.113.7").as_str(), "ipv4");
        assert_eq!(IpVersion::from_addr("2001:db8::1").as_str(), "ipv6");
        assert_eq!(IpVersion::from_addr("::ffff:192.0.2.1").as_str(), "ipv6");
        assert_eq!(IpVersion::from_addr("not-an-ip").as_str(), "unknown");
        assert_eq!(IpVersion::from_addr("256.1.1.1").as_str(), "unknown");
        assert_eq!(IpVersion::from_addr("").as_str(), "unknown");
    }

    #[test]
    fn test_start_time_parses_epoch_millis() {
        let at = start_time("1723390200500.0");
        assert_eq!(at.timestamp(), 1_723_390_200);
        assert_eq!(at.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_start_time_falls_back_to_now() {
        let before = Utc::now();
        let at = start_time("not-a-number");
        assert!(at >= before);
        assert!(at <= Utc::now());
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("/assets%2Fapp.js"), "/assets/app.js");
        assert_eq!(percent_decode("plain"), "plain");
        // Invalid UTF-8 after decoding collapses to empty.
        assert_eq!(percent_decode("%FF%FE"), "");
    }
}
