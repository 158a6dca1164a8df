// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use woothee::parser::Parser;

/// Closed device-class vocabulary attached to the device request counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Desktop,
    Mobile,
    Tablet,
    Tv,
    Console,
    Wearable,
    Unknown,
}

impl DeviceClass {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceClass::Desktop => "desktop",
            DeviceClass::Mobile => "mobile",
            DeviceClass::Tablet => "tablet",
            DeviceClass::Tv => "tv",
            DeviceClass::Console => "console",
            DeviceClass::Wearable => "wearable",
            DeviceClass::Unknown => "unknown",
        }
    }
}

/// External user-agent classification capability.
///
/// The pipeline never depends on a specific heuristic library; anything that
/// can map a user-agent string into the closed vocabulary works.
pub trait DeviceClassifier: Send + Sync {
    fn classify(&self, user_agent: &str) -> DeviceClass;
}

/// Default classifier backed by the woothee user-agent parser.
///
/// Woothee's category vocabulary folds tablets into smartphones and both TVs
/// and game consoles into "appliance", so a few device tokens are checked
/// before delegating. Anything unrecognized maps to `Unknown`.
pub struct UaClassifier {
    parser: Parser,
}

impl UaClassifier {
    pub fn new() -> Self {
        Self { parser: Parser::new() }
    }
}

impl Default for UaClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceClassifier for UaClassifier {
    fn classify(&self, user_agent: &str) -> DeviceClass {
        if user_agent.is_empty() {
            return DeviceClass::Unknown;
        }

        let lower = user_agent.to_ascii_lowercase();
        if lower.contains("ipad") || lower.contains("tablet") || lower.contains("kindle") {
            return DeviceClass::Tablet;
        }
        if lower.contains("smart-tv") || lower.contains("smarttv") || lower.contains("appletv") {
            return DeviceClass::Tv;
        }
        if lower.contains("playstation") || lower.contains("xbox") || lower.contains("nintendo") {
            return DeviceClass::Console;
        }
        if lower.contains("watch") {
            return DeviceClass::Wearable;
        }

        match self.parser.parse(user_agent) {
            Some(result) => match result.category {
                "pc" => DeviceClass::Desktop,
                "smartphone" | "mobilephone" => DeviceClass::Mobile,
                "appliance" => DeviceClass::Tv,
                _ => DeviceClass::Unknown,
            },
            None => DeviceClass::Unknown,
        }
    }
}
