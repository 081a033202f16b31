//! Region data as served by the commerce backend.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Currency given to the synthetic region used when the backend is unreachable.
pub const FALLBACK_CURRENCY: &str = "USD";

/// Identifier of the synthetic fallback region.
pub const FALLBACK_REGION_ID: &str = "local-default";

/// A named grouping of countries sharing a currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub currency_code: String,
    #[serde(default)]
    pub countries: Vec<Country>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    #[serde(default)]
    pub iso_2: Option<String>,
}

impl Region {
    /// The single region substituted when the backend cannot be reached.
    pub fn fallback(default_country: &str) -> Self {
        let code = default_country.to_lowercase();
        Self {
            id: FALLBACK_REGION_ID.to_string(),
            name: code.clone(),
            currency_code: FALLBACK_CURRENCY.to_string(),
            countries: vec![Country { iso_2: Some(code) }],
        }
    }
}

/// Shapes the `/store/regions` endpoint has been seen to answer with.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RegionsPayload {
    Wrapped { regions: Vec<Region> },
    Data { data: Vec<Region> },
    Bare(Vec<Region>),
}

impl RegionsPayload {
    pub fn into_regions(self) -> Vec<Region> {
        match self {
            RegionsPayload::Wrapped { regions } => regions,
            RegionsPayload::Data { data } => data,
            RegionsPayload::Bare(regions) => regions,
        }
    }
}

/// Country code → region lookup.
///
/// Keys are lower-cased ISO 3166-1 alpha-2 codes. Insertion order is kept so
/// the "first country" used as a last-resort default is stable.
#[derive(Debug, Clone, Default)]
pub struct RegionMap {
    by_country: HashMap<String, Arc<Region>>,
    order: Vec<String>,
}

impl RegionMap {
    /// Build the lookup from backend regions. A country listed by several
    /// regions maps to the last one.
    pub fn from_regions(regions: impl IntoIterator<Item = Region>) -> Self {
        let mut map = Self::default();
        for region in regions {
            let region = Arc::new(region);
            for country in &region.countries {
                let Some(code) = country.iso_2.as_deref().map(str::trim) else {
                    continue;
                };
                if code.is_empty() {
                    continue;
                }
                let code = code.to_lowercase();
                if !map.by_country.contains_key(&code) {
                    map.order.push(code.clone());
                }
                map.by_country.insert(code, Arc::clone(&region));
            }
        }
        map
    }

    /// Single-entry map keyed by `default_country`.
    pub fn fallback(default_country: &str) -> Self {
        Self::from_regions([Region::fallback(default_country)])
    }

    pub fn get(&self, country: &str) -> Option<&Arc<Region>> {
        self.by_country.get(&country.to_lowercase())
    }

    pub fn contains(&self, country: &str) -> bool {
        self.get(country).is_some()
    }

    /// First country inserted, if any.
    pub fn first_country(&self) -> Option<&str> {
        self.order.first().map(String::as_str)
    }

    /// Country codes in insertion order.
    pub fn countries(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(id: &str, countries: &[&str]) -> Region {
        Region {
            id: id.to_string(),
            name: id.to_string(),
            currency_code: "eur".to_string(),
            countries: countries
                .iter()
                .map(|c| Country {
                    iso_2: Some(c.to_string()),
                })
                .collect(),
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let map = RegionMap::from_regions([region("reg_eu", &["DE", "fr"])]);
        assert!(map.contains("de"));
        assert!(map.contains("FR"));
        assert_eq!(map.get("De").unwrap().id, "reg_eu");
        assert!(!map.contains("us"));
    }

    #[test]
    fn test_first_country_follows_insertion_order() {
        let map = RegionMap::from_regions([
            region("reg_eu", &["dk", "se"]),
            region("reg_us", &["us"]),
        ]);
        assert_eq!(map.first_country(), Some("dk"));
        assert_eq!(map.countries().collect::<Vec<_>>(), vec!["dk", "se", "us"]);
    }

    #[test]
    fn test_duplicate_country_last_region_wins() {
        let map = RegionMap::from_regions([region("a", &["gb"]), region("b", &["gb"])]);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("gb").unwrap().id, "b");
    }

    #[test]
    fn test_blank_countries_skipped() {
        let mut r = region("a", &["", " "]);
        r.countries.push(Country { iso_2: None });
        let map = RegionMap::from_regions([r]);
        assert!(map.is_empty());
        assert_eq!(map.first_country(), None);
    }

    #[test]
    fn test_fallback_region() {
        let map = RegionMap::fallback("US");
        assert_eq!(map.len(), 1);
        let region = map.get("us").unwrap();
        assert_eq!(region.id, FALLBACK_REGION_ID);
        assert_eq!(region.currency_code, "USD");
    }

    #[test]
    fn test_payload_shapes() {
        let wrapped: RegionsPayload = serde_json::from_str(
            r#"{"regions":[{"id":"reg_1","name":"Europe","currency_code":"eur","countries":[{"iso_2":"de","display_name":"Germany"}]}],"count":1}"#,
        )
        .unwrap();
        assert_eq!(wrapped.into_regions()[0].countries[0].iso_2.as_deref(), Some("de"));

        let data: RegionsPayload =
            serde_json::from_str(r#"{"data":[{"id":"reg_2","countries":[]}]}"#).unwrap();
        assert_eq!(data.into_regions()[0].id, "reg_2");

        let bare: RegionsPayload =
            serde_json::from_str(r#"[{"id":"reg_3","name":"US","currency_code":"usd"}]"#).unwrap();
        assert_eq!(bare.into_regions()[0].currency_code, "usd");
    }
}
