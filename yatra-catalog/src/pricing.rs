use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::calendar::{occasion_is_long_weekend, CalendarEntry};

/// Per-seat fare pair for one tour type, in rupees
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TourFare {
    pub base: i64,
    pub advance: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Fares keyed by lowercase tour type
    pub fares: HashMap<String, TourFare>,

    /// Used for tour types missing from `fares`
    pub default_fare: TourFare,

    /// Holiday weekend whose occasion spans a long weekend
    pub long_weekend_multiplier: f64,

    /// Any other occasion
    pub occasion_multiplier: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            fares: {
                let mut m = HashMap::new();
                m.insert("rajasthan".to_string(), TourFare { base: 2000, advance: 500 });
                m.insert("vrindavan".to_string(), TourFare { base: 1500, advance: 400 });
                m.insert("haridwar".to_string(), TourFare { base: 1800, advance: 500 });
                m.insert("ayodhya".to_string(), TourFare { base: 2500, advance: 700 });
                m
            },
            default_fare: TourFare { base: 1500, advance: 500 },
            long_weekend_multiplier: 1.3,
            occasion_multiplier: 1.2,
        }
    }
}

/// Price quote for one seat
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Quote {
    pub base_price: i64,
    pub advance_price: i64,
    pub demand_multiplier: f64,
}

/// Calendar-driven pricing for weekend tours
#[derive(Debug, Clone)]
pub struct PricingPolicy {
    config: PricingConfig,
}

impl PricingPolicy {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    pub fn fare_for(&self, tour_type: &str) -> TourFare {
        self.config
            .fares
            .get(&tour_type.to_ascii_lowercase())
            .copied()
            .unwrap_or(self.config.default_fare)
    }

    pub fn demand_multiplier(&self, entry: &CalendarEntry) -> f64 {
        match &entry.occasion {
            Some(occasion) if entry.is_holiday_weekend && occasion_is_long_weekend(occasion) => {
                self.config.long_weekend_multiplier
            }
            Some(_) => self.config.occasion_multiplier,
            None => 1.0,
        }
    }

    pub fn quote(&self, tour_type: &str, entry: &CalendarEntry) -> Quote {
        let fare = self.fare_for(tour_type);
        let demand_multiplier = self.demand_multiplier(entry);

        Quote {
            base_price: round_price(fare.base, demand_multiplier),
            advance_price: round_price(fare.advance, demand_multiplier),
            demand_multiplier,
        }
    }
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self::new(PricingConfig::default())
    }
}

/// Nearest whole rupee, ties away from zero
fn round_price(amount: i64, multiplier: f64) -> i64 {
    (amount as f64 * multiplier).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn saturday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 8).unwrap()
    }

    #[test]
    fn test_regular_weekend_quote() {
        let policy = PricingPolicy::default();
        let quote = policy.quote("rajasthan", &CalendarEntry::regular(saturday()));

        assert_eq!(
            quote,
            Quote { base_price: 2000, advance_price: 500, demand_multiplier: 1.0 }
        );
    }

    #[test]
    fn test_long_weekend_multiplier() {
        let policy = PricingPolicy::default();
        let quote = policy.quote("rajasthan", &CalendarEntry::holiday(saturday(), "Diwali Weekend"));

        assert_eq!(quote.demand_multiplier, 1.3);
        assert_eq!(quote.base_price, 2600);
        assert_eq!(quote.advance_price, 650);
    }

    #[test]
    fn test_short_occasion_multiplier() {
        let policy = PricingPolicy::default();
        let quote = policy.quote("vrindavan", &CalendarEntry::holiday(saturday(), "Janmashtami"));

        assert_eq!(quote.demand_multiplier, 1.2);
        assert_eq!(quote.base_price, 1800);
        assert_eq!(quote.advance_price, 480);
    }

    #[test]
    fn test_unknown_tour_uses_default_fare() {
        let policy = PricingPolicy::default();
        let quote = policy.quote("kedarnath", &CalendarEntry::regular(saturday()));
        assert_eq!(quote.base_price, 1500);
        assert_eq!(quote.advance_price, 500);
    }

    #[test]
    fn test_tour_type_lookup_ignores_case() {
        let policy = PricingPolicy::default();
        assert_eq!(policy.fare_for("Rajasthan"), TourFare { base: 2000, advance: 500 });
    }

    #[test]
    fn test_rounding_ties_away_from_zero() {
        assert_eq!(round_price(5, 1.5), 8);
        assert_eq!(round_price(1999, 1.3), 2599);
        assert_eq!(round_price(1245, 1.2), 1494);
    }
}
