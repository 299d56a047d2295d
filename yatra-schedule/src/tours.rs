use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use yatra_catalog::{BoardingPoint, TripDetails};

/// A recurring weekend tour the generator schedules every Saturday
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TourDefinition {
    /// Pricing and upsert key, lowercase
    pub tour_type: String,
    pub route_id: String,
    pub destination_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub capacity: i32,
    /// Wall-clock times in India, e.g. `"05:00 AM"`
    pub departure_clock: String,
    pub return_clock: String,
    #[serde(default)]
    pub details: TripDetails,
}

impl TourDefinition {
    pub fn departure_time(&self) -> Option<NaiveTime> {
        parse_clock(&self.departure_clock)
    }

    pub fn return_time(&self) -> Option<NaiveTime> {
        parse_clock(&self.return_clock)
    }
}

/// `"05:00 AM"` style clock strings
pub fn parse_clock(clock: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(clock.trim(), "%I:%M %p").ok()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn point(name: &str, time: &str, landmark: &str) -> BoardingPoint {
    BoardingPoint {
        name: name.to_string(),
        time: time.to_string(),
        landmark: Some(landmark.to_string()),
    }
}

fn standard_policy() -> Vec<String> {
    strings(&[
        "Full refund when cancelled before departure",
        "No refund for no-shows",
    ])
}

/// The tours operated out of Delhi NCR
pub fn default_tours() -> Vec<TourDefinition> {
    vec![
        TourDefinition {
            tour_type: "rajasthan".to_string(),
            route_id: "delhi-rajasthan".to_string(),
            destination_id: "khatu-shyam-salasar".to_string(),
            title: "Khatu Shyam & Salasar Balaji Yatra".to_string(),
            description: Some("Weekend darshan at Khatu Shyam ji and Salasar Balaji".to_string()),
            capacity: 40,
            departure_clock: "05:00 AM".to_string(),
            return_clock: "11:00 PM".to_string(),
            details: TripDetails {
                boarding_points: vec![
                    point("Kashmere Gate", "05:00 AM", "ISBT Gate 2"),
                    point("Dhaula Kuan", "05:45 AM", "Metro Station Pillar 41"),
                ],
                inclusions: strings(&["AC bus", "Breakfast", "Dharamshala stay"]),
                exclusions: strings(&["Lunch", "Personal expenses"]),
                cancellation_policy: standard_policy(),
            },
        },
        TourDefinition {
            tour_type: "vrindavan".to_string(),
            route_id: "delhi-vrindavan".to_string(),
            destination_id: "vrindavan-mathura".to_string(),
            title: "Vrindavan & Mathura Darshan".to_string(),
            description: Some("Banke Bihari, Prem Mandir and Krishna Janmabhoomi".to_string()),
            capacity: 45,
            departure_clock: "06:00 AM".to_string(),
            return_clock: "10:00 PM".to_string(),
            details: TripDetails {
                boarding_points: vec![
                    point("Akshardham", "06:00 AM", "Metro Station Gate 1"),
                    point("Badarpur Border", "06:40 AM", "Petrol Pump"),
                ],
                inclusions: strings(&["AC bus", "Breakfast", "Guide"]),
                exclusions: strings(&["Meals", "Temple offerings"]),
                cancellation_policy: standard_policy(),
            },
        },
        TourDefinition {
            tour_type: "haridwar".to_string(),
            route_id: "delhi-haridwar".to_string(),
            destination_id: "haridwar-rishikesh".to_string(),
            title: "Haridwar & Rishikesh Ganga Aarti".to_string(),
            description: Some("Evening aarti at Har Ki Pauri and Triveni Ghat".to_string()),
            capacity: 40,
            departure_clock: "04:30 AM".to_string(),
            return_clock: "11:30 PM".to_string(),
            details: TripDetails {
                boarding_points: vec![
                    point("Kashmere Gate", "04:30 AM", "ISBT Gate 5"),
                    point("Anand Vihar", "05:10 AM", "Bus Terminal"),
                ],
                inclusions: strings(&["AC bus", "Breakfast", "Hotel stay"]),
                exclusions: strings(&["River rafting", "Personal expenses"]),
                cancellation_policy: standard_policy(),
            },
        },
        TourDefinition {
            tour_type: "ayodhya".to_string(),
            route_id: "delhi-ayodhya".to_string(),
            destination_id: "ram-janmabhoomi".to_string(),
            title: "Ayodhya Ram Mandir Yatra".to_string(),
            description: Some("Shri Ram Janmabhoomi, Hanuman Garhi and Saryu aarti".to_string()),
            capacity: 35,
            departure_clock: "09:00 PM".to_string(),
            return_clock: "06:00 AM".to_string(),
            details: TripDetails {
                boarding_points: vec![point("Anand Vihar", "09:00 PM", "Bus Terminal")],
                inclusions: strings(&["Sleeper AC bus", "Breakfast", "Hotel stay"]),
                exclusions: strings(&["Lunch", "Dinner"]),
                cancellation_policy: standard_policy(),
            },
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tours_are_well_formed() {
        let tours = default_tours();
        assert_eq!(tours.len(), 4);
        for tour in &tours {
            assert!(tour.capacity > 0);
            assert!(tour.departure_time().is_some(), "{}", tour.departure_clock);
            assert!(tour.return_time().is_some(), "{}", tour.return_clock);
            assert_eq!(tour.tour_type, tour.tour_type.to_lowercase());
        }
    }

    #[test]
    fn test_parse_clock() {
        assert_eq!(parse_clock("05:00 AM"), NaiveTime::from_hms_opt(5, 0, 0));
        assert_eq!(parse_clock("11:30 PM"), NaiveTime::from_hms_opt(23, 30, 0));
        assert_eq!(parse_clock("noon"), None);
    }
}
