//! Coordinate reference system identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Geographic (degree based) CRS codes the engine knows about.
const GEOGRAPHIC_EPSG: &[u32] = &[4326, 4019, 4737, 4162, 4166, 4258, 4269];

/// Authority identifier of a coordinate reference system, e.g. `EPSG:5186`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Crs {
    auth_id: String,
}

impl Crs {
    /// Builds a CRS from an EPSG code.
    pub fn epsg(code: u32) -> Self {
        Self {
            auth_id: format!("EPSG:{code}"),
        }
    }

    /// WGS 84 longitude/latitude.
    pub fn wgs84() -> Self {
        Self::epsg(4326)
    }

    /// Parses `EPSG:5186`, `epsg:5186`, OGC URNs (`urn:ogc:def:crs:EPSG::5186`)
    /// and the GeoJSON default `urn:ogc:def:crs:OGC:1.3:CRS84`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let upper = trimmed.to_uppercase();
        if upper.ends_with("CRS84") {
            return Some(Self::wgs84());
        }
        let code = upper
            .rsplit(':')
            .next()
            .filter(|_| upper.contains("EPSG"))
            .and_then(|tail| tail.trim().parse::<u32>().ok());
        match code {
            Some(code) => Some(Self::epsg(code)),
            None => Some(Self {
                auth_id: trimmed.to_string(),
            }),
        }
    }

    pub fn auth_id(&self) -> &str {
        &self.auth_id
    }

    /// EPSG code when the identifier is EPSG based.
    pub fn epsg_code(&self) -> Option<u32> {
        self.auth_id
            .strip_prefix("EPSG:")
            .and_then(|code| code.parse().ok())
    }

    /// True for degree-based CRSs, where map units are not meters.
    pub fn is_geographic(&self) -> bool {
        self.epsg_code()
            .is_some_and(|code| GEOGRAPHIC_EPSG.contains(&code))
    }
}

impl Default for Crs {
    /// Korea 2000 / Central Belt 2010, the usual working CRS for report maps.
    fn default() -> Self {
        Self::epsg(5186)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.auth_id)
    }
}

impl TryFrom<String> for Crs {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| "empty CRS identifier".to_string())
    }
}

impl From<Crs> for String {
    fn from(value: Crs) -> Self {
        value.auth_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_spellings() {
        assert_eq!(Crs::parse("epsg:5186"), Some(Crs::epsg(5186)));
        assert_eq!(
            Crs::parse("urn:ogc:def:crs:EPSG::5179"),
            Some(Crs::epsg(5179))
        );
        assert_eq!(
            Crs::parse("urn:ogc:def:crs:OGC:1.3:CRS84"),
            Some(Crs::wgs84())
        );
        assert_eq!(Crs::parse("  "), None);
    }

    #[test]
    fn geographic_detection() {
        assert!(Crs::wgs84().is_geographic());
        assert!(Crs::epsg(4737).is_geographic());
        assert!(!Crs::epsg(5186).is_geographic());
        assert!(!Crs::parse("LOCAL_CS").unwrap().is_geographic());
    }
}
