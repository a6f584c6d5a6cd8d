//! Beacon ranging plugin seam and payload parsing
//!
//! The ranging plugin delivers delegate callbacks with JSON payloads; the
//! parser here turns a `didRangeBeaconsInRegion` result into a single
//! [`RangingEvent`]. The plugin identifies beacons by region (uuid + major
//! + minor); handlers key off the minor.

use crate::domain::types::{BeaconMinor, Proximity, RangingEvent};
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};

/// A beacon region registered for monitoring and ranging
#[derive(Debug, Clone, PartialEq)]
pub struct BeaconRegion {
    pub uuid: String,
    pub identifier: String,
    pub major: u16,
    pub minor: u16,
}

impl BeaconRegion {
    pub fn from_spec(spec: &crate::infra::config::BeaconSpec) -> Self {
        Self {
            uuid: spec.uuid.clone(),
            identifier: spec.identifier.clone(),
            major: spec.major,
            minor: spec.minor,
        }
    }
}

/// Opaque beacon-monitoring capability.
///
/// Requires always-on location authorization before monitoring starts.
#[async_trait]
pub trait BeaconRanger: Send + Sync {
    async fn request_always_authorization(&self) -> anyhow::Result<()>;
    async fn start_monitoring(&self, region: &BeaconRegion) -> anyhow::Result<()>;
    async fn start_ranging(&self, region: &BeaconRegion) -> anyhow::Result<()>;
}

#[derive(Debug, Deserialize)]
struct RangingPayload {
    #[serde(default)]
    beacons: Vec<RangedBeaconPayload>,
}

#[derive(Debug, Deserialize)]
struct RangedBeaconPayload {
    /// The plugin reports minor as a string on some platforms and a number
    /// on others
    #[serde(deserialize_with = "deserialize_minor")]
    minor: u16,
    proximity: String,
}

fn deserialize_minor<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct MinorVisitor;

    impl<'de> Visitor<'de> for MinorVisitor {
        type Value = u16;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a string or integer beacon minor")
        }

        fn visit_str<E>(self, value: &str) -> Result<u16, E>
        where
            E: de::Error,
        {
            value.parse::<u16>().map_err(de::Error::custom)
        }

        fn visit_u64<E>(self, value: u64) -> Result<u16, E>
        where
            E: de::Error,
        {
            u16::try_from(value).map_err(de::Error::custom)
        }
    }

    deserializer.deserialize_any(MinorVisitor)
}

/// Parse a `didRangeBeaconsInRegion` payload.
///
/// Ranging results carry a list of beacons ordered by signal strength; the
/// strongest one is the observation. An empty list yields `None`.
pub fn parse_ranging(raw: &serde_json::Value) -> anyhow::Result<Option<RangingEvent>> {
    let payload: RangingPayload =
        serde_json::from_value(raw.clone()).context("malformed ranging payload")?;

    let Some(beacon) = payload.beacons.first() else {
        return Ok(None);
    };

    let proximity: Proximity = beacon.proximity.parse().unwrap_or(Proximity::Unknown);
    Ok(Some(RangingEvent { minor: BeaconMinor(beacon.minor), proximity }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_ranging_strongest_beacon() {
        let raw = json!({
            "beacons": [
                { "uuid": "B9407F30-F5F8-466E-AFF9-25556B57FE6D", "minor": "30708", "proximity": "ProximityImmediate" },
                { "uuid": "B9407F30-F5F8-466E-AFF9-25556B57FE6D", "minor": "20731", "proximity": "ProximityFar" }
            ]
        });
        let event = parse_ranging(&raw).unwrap().unwrap();
        assert_eq!(event.minor, BeaconMinor(30708));
        assert_eq!(event.proximity, Proximity::Immediate);
    }

    #[test]
    fn test_parse_ranging_numeric_minor() {
        let raw = json!({ "beacons": [ { "minor": 64936, "proximity": "ProximityNear" } ] });
        let event = parse_ranging(&raw).unwrap().unwrap();
        assert_eq!(event.minor, BeaconMinor(64936));
        assert_eq!(event.proximity, Proximity::Near);
    }

    #[test]
    fn test_parse_ranging_empty() {
        let raw = json!({ "beacons": [] });
        assert_eq!(parse_ranging(&raw).unwrap(), None);
    }

    #[test]
    fn test_parse_ranging_unknown_proximity() {
        let raw = json!({ "beacons": [ { "minor": 1, "proximity": "ProximityWeird" } ] });
        let event = parse_ranging(&raw).unwrap().unwrap();
        assert_eq!(event.proximity, Proximity::Unknown);
    }

    #[test]
    fn test_parse_ranging_bad_minor_fails() {
        let raw = json!({ "beacons": [ { "minor": "not-a-number", "proximity": "ProximityNear" } ] });
        assert!(parse_ranging(&raw).is_err());
    }
}
