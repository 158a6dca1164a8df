// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Sampling resolver: an optional trailing `sample-percentage/<n>` path
//! suffix selects the counter scale factor for a whole batch.

use crate::errors::CollectorError;

const SAMPLE_SEGMENT: &str = "sample-percentage";

/// Splits a trailing `sample-percentage/<n>` suffix off `path`, returning
/// the base path and the raw denominator when the suffix is present.
pub fn split_suffix(path: &str) -> Option<(&str, &str)> {
    let (rest, value) = path.rsplit_once('/')?;
    let (base, segment) = rest.rsplit_once('/')?;
    (segment == SAMPLE_SEGMENT).then_some((base, value))
}

/// Parses the sampling denominator into a counter multiplier.
///
/// Integer floor division is load-bearing: upstream consumers calibrated
/// against n=3 scaling by 33, not 33.33.
pub fn multiplier(raw: &str) -> Result<u64, CollectorError> {
    let n = raw
        .parse::<u64>()
        .map_err(|_| CollectorError::InvalidSamplingParameter(raw.to_string()))?;
    if n == 0 {
        return Err(CollectorError::InvalidSamplingParameter(raw.to_string()));
    }
    Ok(100 / n)
}

/// Resolves a request path against the collector endpoint.
///
/// `None` means the path does not target the endpoint at all; `Some(Err)`
/// means it does but carries an invalid sampling suffix, which rejects the
/// whole request before any line is processed.
pub fn resolve(path: &str, collector_path: &str) -> Option<Result<u64, CollectorError>> {
    if path == collector_path {
        return Some(Ok(1));
    }
    match split_suffix(path) {
        Some((base, raw)) if base == collector_path => Some(multiplier(raw)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiplier_floor_division() {
        assert_eq!(multiplier("25").unwrap(), 4);
        assert_eq!(multiplier("3").unwrap(), 33);
        assert_eq!(multiplier("100").unwrap(), 1);
        assert_eq!(multiplier("1").unwrap(), 100);
        // Floor semantics run all the way down to zero.
        assert_eq!(multiplier("200").unwrap(), 0);
    }

    #[test]
    fn test_multiplier_rejects_zero_and_garbage() {
        assert!(multiplier("0").is_err());
        assert!(multiplier("abc").is_err());
        assert!(multiplier("-5").is_err());
        assert!(multiplier("2.5").is_err());
        assert!(multiplier("").is_err());
    }

    #[test]
    fn test_split_suffix() {
        assert_eq!(
            split_suffix("/collector/sample-percentage/25"),
            Some(("/collector", "25"))
        );
        assert_eq!(split_suffix("/collector"), None);
        assert_eq!(split_suffix("/collector/sample/25"), None);
        assert_eq!(split_suffix("no-slashes"), None);
    }

    #[test]
    fn test_resolve() {
        assert_eq!(resolve("/collector", "/collector").unwrap().unwrap(), 1);
        assert_eq!(
            resolve("/collector/sample-percentage/25", "/collector").unwrap().unwrap(),
            4
        );
        assert!(resolve("/collector/sample-percentage/0", "/collector").unwrap().is_err());
        assert!(resolve("/collector/sample-percentage/x", "/collector").unwrap().is_err());

        // Paths that do not target the endpoint resolve to nothing, even
        // with a well-formed suffix.
        assert!(resolve("/elsewhere", "/collector").is_none());
        assert!(resolve("/elsewhere/sample-percentage/25", "/collector").is_none());
        assert!(resolve("/collector/extra/sample-percentage/25", "/collector").is_none());
    }
}
