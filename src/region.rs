//! Supported AWS regions
//!
//! The Price List API filters by the human-readable location name
//! ("US East (Ohio)"), not the region code, so every region we can price
//! needs an entry here. Anything else is rejected up front.

use crate::error::ConfigError;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Region {
    ApNortheast1,
    ApNortheast2,
    ApNortheast3,
    ApSouth1,
    ApSoutheast1,
    ApSoutheast2,
    CaCentral1,
    EuCentral1,
    EuNorth1,
    EuWest1,
    EuWest2,
    EuWest3,
    SaEast1,
    UsEast1,
    UsEast2,
    UsWest1,
    UsWest2,
}

impl Region {
    pub const ALL: [Region; 17] = [
        Region::ApNortheast1,
        Region::ApNortheast2,
        Region::ApNortheast3,
        Region::ApSouth1,
        Region::ApSoutheast1,
        Region::ApSoutheast2,
        Region::CaCentral1,
        Region::EuCentral1,
        Region::EuNorth1,
        Region::EuWest1,
        Region::EuWest2,
        Region::EuWest3,
        Region::SaEast1,
        Region::UsEast1,
        Region::UsEast2,
        Region::UsWest1,
        Region::UsWest2,
    ];

    /// Region code as used by the SDK (`us-east-1`)
    pub fn code(self) -> &'static str {
        match self {
            Region::ApNortheast1 => "ap-northeast-1",
            Region::ApNortheast2 => "ap-northeast-2",
            Region::ApNortheast3 => "ap-northeast-3",
            Region::ApSouth1 => "ap-south-1",
            Region::ApSoutheast1 => "ap-southeast-1",
            Region::ApSoutheast2 => "ap-southeast-2",
            Region::CaCentral1 => "ca-central-1",
            Region::EuCentral1 => "eu-central-1",
            Region::EuNorth1 => "eu-north-1",
            Region::EuWest1 => "eu-west-1",
            Region::EuWest2 => "eu-west-2",
            Region::EuWest3 => "eu-west-3",
            Region::SaEast1 => "sa-east-1",
            Region::UsEast1 => "us-east-1",
            Region::UsEast2 => "us-east-2",
            Region::UsWest1 => "us-west-1",
            Region::UsWest2 => "us-west-2",
        }
    }

    /// Location name used by the Price List `location` attribute
    pub fn display_name(self) -> &'static str {
        match self {
            Region::ApNortheast1 => "Asia Pacific (Tokyo)",
            Region::ApNortheast2 => "Asia Pacific (Seoul)",
            Region::ApNortheast3 => "Asia Pacific (Osaka)",
            Region::ApSouth1 => "Asia Pacific (Mumbai)",
            Region::ApSoutheast1 => "Asia Pacific (Singapore)",
            Region::ApSoutheast2 => "Asia Pacific (Sydney)",
            Region::CaCentral1 => "Canada (Central)",
            Region::EuCentral1 => "EU (Frankfurt)",
            Region::EuNorth1 => "EU (Stockholm)",
            Region::EuWest1 => "EU (Ireland)",
            Region::EuWest2 => "EU (London)",
            Region::EuWest3 => "EU (Paris)",
            Region::SaEast1 => "South America (Sao Paulo)",
            Region::UsEast1 => "US East (N. Virginia)",
            Region::UsEast2 => "US East (Ohio)",
            Region::UsWest1 => "US West (N. California)",
            Region::UsWest2 => "US West (Oregon)",
        }
    }
}

impl Serialize for Region {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl FromStr for Region {
    type Err = ConfigError;

    /// Parse a region code, ignoring case and surrounding whitespace
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        Region::ALL
            .iter()
            .copied()
            .find(|r| r.code() == code)
            .ok_or(ConfigError::UnsupportedRegion(s.to_string()))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_regions() {
        assert_eq!("us-east-2".parse::<Region>().unwrap(), Region::UsEast2);
        assert_eq!("EU-WEST-1".parse::<Region>().unwrap(), Region::EuWest1);
        assert_eq!(" sa-east-1 ".parse::<Region>().unwrap(), Region::SaEast1);
    }

    #[test]
    fn test_unsupported_region() {
        let err = "me-south-1".parse::<Region>().unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedRegion(ref r) if r == "me-south-1"));
    }

    #[test]
    fn test_every_region_round_trips_through_code() {
        for region in Region::ALL {
            assert_eq!(region.code().parse::<Region>().unwrap(), region);
            assert!(!region.display_name().is_empty());
        }
    }

    #[test]
    fn test_display_names() {
        assert_eq!(Region::UsEast1.display_name(), "US East (N. Virginia)");
        assert_eq!(Region::ApNortheast3.display_name(), "Asia Pacific (Osaka)");
    }
}
