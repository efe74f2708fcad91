use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Developer name to hourly rate. Lookups are case-insensitive and a
/// developer without an entry costs nothing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "HashMap<String, f64>", into = "HashMap<String, f64>")]
pub struct HourlyRates {
    rates: HashMap<String, f64>,
}

impl HourlyRates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, developer: impl Into<String>, rate: f64) -> Self {
        self.insert(developer, rate);
        self
    }

    pub fn insert(&mut self, developer: impl Into<String>, rate: f64) {
        let developer = developer.into();
        self.rates.insert(developer.trim().to_lowercase(), rate);
    }

    /// Rate for `developer`, if one is configured and usable.
    pub fn get(&self, developer: &str) -> Option<f64> {
        self.rates
            .get(&developer.trim().to_lowercase())
            .copied()
            .filter(|rate| rate.is_finite() && *rate >= 0.0)
    }

    /// Rate for `developer`, zero when missing.
    pub fn rate_for(&self, developer: &str) -> f64 {
        self.get(developer).unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for HourlyRates {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut rates = HourlyRates::new();
        for (developer, rate) in iter {
            rates.insert(developer, rate);
        }
        rates
    }
}

impl From<HashMap<String, f64>> for HourlyRates {
    fn from(map: HashMap<String, f64>) -> Self {
        map.into_iter().collect()
    }
}

impl From<HourlyRates> for HashMap<String, f64> {
    fn from(rates: HourlyRates) -> Self {
        rates.rates
    }
}
