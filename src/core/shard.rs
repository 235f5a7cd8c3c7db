use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Geographic shard used to narrow the candidate search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Region {
    NorthAmerica,
    LatinAmerica,
    Europe,
    MiddleEastAfrica,
    SouthAsia,
    EastAsia,
    SoutheastAsia,
    Oceania,
}

impl Region {
    pub const ALL: [Region; 8] = [
        Region::NorthAmerica,
        Region::LatinAmerica,
        Region::Europe,
        Region::MiddleEastAfrica,
        Region::SouthAsia,
        Region::EastAsia,
        Region::SoutheastAsia,
        Region::Oceania,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::NorthAmerica => "NORTH_AMERICA",
            Region::LatinAmerica => "LATIN_AMERICA",
            Region::Europe => "EUROPE",
            Region::MiddleEastAfrica => "MIDDLE_EAST_AFRICA",
            Region::SouthAsia => "SOUTH_ASIA",
            Region::EastAsia => "EAST_ASIA",
            Region::SoutheastAsia => "SOUTHEAST_ASIA",
            Region::Oceania => "OCEANIA",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Region::ALL
            .iter()
            .copied()
            .find(|region| region.as_str() == wanted)
            .ok_or_else(|| format!("unknown region: {}", s))
    }
}

/// ISO 3166-1 alpha-2 code to region
const COUNTRY_REGIONS: &[(&str, Region)] = &[
    // North America
    ("US", Region::NorthAmerica),
    ("CA", Region::NorthAmerica),
    ("PR", Region::NorthAmerica),
    ("GL", Region::NorthAmerica),
    ("BM", Region::NorthAmerica),
    // Latin America and the Caribbean
    ("MX", Region::LatinAmerica),
    ("GT", Region::LatinAmerica),
    ("HN", Region::LatinAmerica),
    ("SV", Region::LatinAmerica),
    ("NI", Region::LatinAmerica),
    ("CR", Region::LatinAmerica),
    ("PA", Region::LatinAmerica),
    ("CU", Region::LatinAmerica),
    ("DO", Region::LatinAmerica),
    ("JM", Region::LatinAmerica),
    ("CO", Region::LatinAmerica),
    ("VE", Region::LatinAmerica),
    ("EC", Region::LatinAmerica),
    ("PE", Region::LatinAmerica),
    ("BO", Region::LatinAmerica),
    ("BR", Region::LatinAmerica),
    ("PY", Region::LatinAmerica),
    ("UY", Region::LatinAmerica),
    ("AR", Region::LatinAmerica),
    ("CL", Region::LatinAmerica),
    // Europe
    ("GB", Region::Europe),
    ("IE", Region::Europe),
    ("FR", Region::Europe),
    ("DE", Region::Europe),
    ("NL", Region::Europe),
    ("BE", Region::Europe),
    ("LU", Region::Europe),
    ("CH", Region::Europe),
    ("AT", Region::Europe),
    ("IT", Region::Europe),
    ("ES", Region::Europe),
    ("PT", Region::Europe),
    ("DK", Region::Europe),
    ("SE", Region::Europe),
    ("NO", Region::Europe),
    ("FI", Region::Europe),
    ("IS", Region::Europe),
    ("PL", Region::Europe),
    ("CZ", Region::Europe),
    ("SK", Region::Europe),
    ("HU", Region::Europe),
    ("RO", Region::Europe),
    ("BG", Region::Europe),
    ("GR", Region::Europe),
    ("HR", Region::Europe),
    ("SI", Region::Europe),
    ("RS", Region::Europe),
    ("EE", Region::Europe),
    ("LV", Region::Europe),
    ("LT", Region::Europe),
    ("UA", Region::Europe),
    ("MT", Region::Europe),
    ("CY", Region::Europe),
    // Middle East and Africa
    ("TR", Region::MiddleEastAfrica),
    ("IL", Region::MiddleEastAfrica),
    ("AE", Region::MiddleEastAfrica),
    ("SA", Region::MiddleEastAfrica),
    ("QA", Region::MiddleEastAfrica),
    ("KW", Region::MiddleEastAfrica),
    ("BH", Region::MiddleEastAfrica),
    ("OM", Region::MiddleEastAfrica),
    ("JO", Region::MiddleEastAfrica),
    ("LB", Region::MiddleEastAfrica),
    ("IR", Region::MiddleEastAfrica),
    ("IQ", Region::MiddleEastAfrica),
    ("EG", Region::MiddleEastAfrica),
    ("MA", Region::MiddleEastAfrica),
    ("DZ", Region::MiddleEastAfrica),
    ("TN", Region::MiddleEastAfrica),
    ("NG", Region::MiddleEastAfrica),
    ("GH", Region::MiddleEastAfrica),
    ("KE", Region::MiddleEastAfrica),
    ("ET", Region::MiddleEastAfrica),
    ("TZ", Region::MiddleEastAfrica),
    ("UG", Region::MiddleEastAfrica),
    ("RW", Region::MiddleEastAfrica),
    ("SN", Region::MiddleEastAfrica),
    ("CI", Region::MiddleEastAfrica),
    ("ZA", Region::MiddleEastAfrica),
    // South Asia
    ("IN", Region::SouthAsia),
    ("PK", Region::SouthAsia),
    ("BD", Region::SouthAsia),
    ("LK", Region::SouthAsia),
    ("NP", Region::SouthAsia),
    ("BT", Region::SouthAsia),
    ("MV", Region::SouthAsia),
    ("AF", Region::SouthAsia),
    // East Asia
    ("CN", Region::EastAsia),
    ("JP", Region::EastAsia),
    ("KR", Region::EastAsia),
    ("TW", Region::EastAsia),
    ("HK", Region::EastAsia),
    ("MO", Region::EastAsia),
    ("MN", Region::EastAsia),
    // Southeast Asia
    ("VN", Region::SoutheastAsia),
    ("TH", Region::SoutheastAsia),
    ("SG", Region::SoutheastAsia),
    ("MY", Region::SoutheastAsia),
    ("ID", Region::SoutheastAsia),
    ("PH", Region::SoutheastAsia),
    ("KH", Region::SoutheastAsia),
    ("LA", Region::SoutheastAsia),
    ("MM", Region::SoutheastAsia),
    ("BN", Region::SoutheastAsia),
    ("TL", Region::SoutheastAsia),
    // Oceania
    ("AU", Region::Oceania),
    ("NZ", Region::Oceania),
    ("FJ", Region::Oceania),
    ("PG", Region::Oceania),
    ("WS", Region::Oceania),
    ("TO", Region::Oceania),
];

/// Deterministic country code to region router
///
/// The lookup table is built once in [`ShardRouter::new`] and never mutated,
/// so a router can be shared freely between consumer tasks.
#[derive(Debug, Clone)]
pub struct ShardRouter {
    table: HashMap<&'static str, Region>,
    default_region: Region,
}

impl ShardRouter {
    pub fn new(default_region: Region) -> Self {
        Self {
            table: COUNTRY_REGIONS.iter().copied().collect(),
            default_region,
        }
    }

    pub fn default_region(&self) -> Region {
        self.default_region
    }

    /// Resolve the region for a country code
    ///
    /// Total: empty, unknown and malformed codes all resolve to the
    /// configured default region.
    #[inline]
    pub fn region_for(&self, country_code: &str) -> Region {
        self.lookup(country_code).unwrap_or(self.default_region)
    }

    /// Whether a move from `old_code` to `new_code` crosses a shard boundary
    pub fn needs_rerouting(&self, old_code: &str, new_code: &str) -> bool {
        self.region_for(old_code) != self.region_for(new_code)
    }

    /// True when the code has an explicit table entry
    pub fn is_mapped(&self, country_code: &str) -> bool {
        self.lookup(country_code).is_some()
    }

    /// All explicitly mapped codes of a region, sorted
    pub fn countries_in(&self, region: Region) -> Vec<&'static str> {
        let mut codes: Vec<&'static str> = self
            .table
            .iter()
            .filter(|(_, r)| **r == region)
            .map(|(code, _)| *code)
            .collect();
        codes.sort_unstable();
        codes
    }

    /// Every explicitly mapped code, sorted
    pub fn mapped_countries(&self) -> Vec<&'static str> {
        let mut codes: Vec<&'static str> = self.table.keys().copied().collect();
        codes.sort_unstable();
        codes
    }

    fn lookup(&self, country_code: &str) -> Option<Region> {
        let normalized = country_code.trim().to_ascii_uppercase();
        self.table.get(normalized.as_str()).copied()
    }
}

impl Default for ShardRouter {
    fn default() -> Self {
        Self::new(Region::SoutheastAsia)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        let router = ShardRouter::default();
        assert_eq!(router.region_for("VN"), Region::SoutheastAsia);
        assert_eq!(router.region_for("de"), Region::Europe);
        assert_eq!(router.region_for(" us "), Region::NorthAmerica);
    }

    #[test]
    fn test_unknown_codes_use_default() {
        let router = ShardRouter::new(Region::Europe);
        assert_eq!(router.region_for(""), Region::Europe);
        assert_eq!(router.region_for("ZZ"), Region::Europe);
        assert_eq!(router.region_for("remote"), Region::Europe);
    }

    #[test]
    fn test_every_two_letter_code_resolves() {
        let router = ShardRouter::new(Region::Oceania);
        for a in b'A'..=b'Z' {
            for b in b'A'..=b'Z' {
                let code = format!("{}{}", a as char, b as char);
                let region = router.region_for(&code);
                if !router.is_mapped(&code) {
                    assert_eq!(region, Region::Oceania, "unmapped {} must use default", code);
                }
            }
        }
    }

    #[test]
    fn test_table_has_no_duplicate_codes() {
        let router = ShardRouter::default();
        assert_eq!(router.mapped_countries().len(), COUNTRY_REGIONS.len());
    }

    #[test]
    fn test_needs_rerouting() {
        let router = ShardRouter::default();
        assert!(!router.needs_rerouting("VN", "TH"));
        assert!(router.needs_rerouting("VN", "DE"));
        assert!(!router.needs_rerouting("XX", "VN")); // XX falls back to SOUTHEAST_ASIA
    }

    #[test]
    fn test_countries_in_region() {
        let router = ShardRouter::default();
        let oceania = router.countries_in(Region::Oceania);
        assert!(oceania.contains(&"AU"));
        assert!(oceania.contains(&"NZ"));
        assert!(!oceania.contains(&"VN"));
    }

    #[test]
    fn test_region_parse() {
        assert_eq!("southeast_asia".parse::<Region>(), Ok(Region::SoutheastAsia));
        assert!("ATLANTIS".parse::<Region>().is_err());
    }
}
