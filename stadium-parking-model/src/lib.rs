use geo::Coord;
use serde::{de::IgnoredAny, Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};

/// What the routing backend answers to a route-proposal query. The original backend used German
/// keys, so those are accepted as aliases everywhere.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct QueryResponse {
    #[serde(alias = "empfohlener_parkplatz", default)]
    pub recommended: Option<Proposal>,
    #[serde(alias = "alle_parkplaetze", default)]
    pub alternatives: Vec<Proposal>,
}

/// The body of any non-2xx response
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ErrorBody {
    #[serde(alias = "detail", default)]
    pub error_detail: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Proposal {
    #[serde(alias = "parkplatz")]
    pub parking_site: ParkingSite,

    #[serde(alias = "dauer_auto")]
    pub driving_duration_minutes: u32,
    // When present, this supersedes the baseline
    #[serde(alias = "dauer_traffic")]
    pub traffic_driving_duration_minutes: Option<u32>,
    #[serde(alias = "distanz_km")]
    pub distance_km: Option<f64>,

    #[serde(alias = "dauer_walking")]
    pub walking_duration_minutes: Option<u32>,
    #[serde(alias = "dauer_transit")]
    pub transit_duration_minutes: Option<u32>,
    // Kept as a raw string; anything unrecognized counts as absent
    #[serde(alias = "beste_methode")]
    pub recommended_mode: Option<String>,
    #[serde(alias = "gesamtzeit")]
    pub total_duration_minutes: Option<u32>,

    /// 1 (critical) to 5 (excellent). Anything that doesn't fit in a u8 is None.
    #[serde(
        alias = "verkehr_bewertung",
        default,
        deserialize_with = "deserialize_rating"
    )]
    pub traffic_rating: Option<u8>,
    #[serde(alias = "verkehr_kommentar")]
    pub traffic_comment: Option<String>,

    #[serde(alias = "polyline_auto")]
    pub encoded_path_driving: Option<String>,
    pub encoded_path_lastmile: Option<String>,
    #[serde(alias = "polyline_walking")]
    pub encoded_path_walking: Option<String>,
    #[serde(alias = "polyline_transit")]
    pub encoded_path_transit: Option<String>,

    pub navigation_links: Option<NavigationLinks>,
    #[serde(alias = "walking_navigation")]
    pub walking_navigation_link: Option<NavigationLinks>,
    #[serde(alias = "live_parking_data")]
    pub live_availability: Option<LiveAvailability>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ParkingSite {
    pub id: ParkingSiteID,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ParkingSiteID(pub u32);
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct StadiumID(pub u32);

/// How to get from the parking site to the stadium
#[derive(
    Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LastMileMode {
    Walking,
    Transit,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NavigationLinks {
    pub web_link: String,
    #[serde(default)]
    pub mobile_link: Option<String>,
}

/// A snapshot of a parking site's occupancy. Only ever displayed.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LiveAvailability {
    #[serde(alias = "frei", default)]
    pub free_spaces: u32,
    #[serde(default)]
    pub capacity: u32,
    #[serde(default)]
    pub occupancy: Option<Occupancy>,
    #[serde(default)]
    pub last_update: Option<String>,
    #[serde(default)]
    pub freshness: Option<Freshness>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Occupancy {
    #[serde(default)]
    pub occupancy_rate: Option<f64>,
    #[serde(default)]
    pub availability_score: Option<u8>,
    #[serde(default)]
    pub occupancy_text: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Freshness {
    pub status: String,
    #[serde(default)]
    pub age_minutes: Option<i64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Profile {
    pub username: String,
    pub email: String,
    #[serde(alias = "lieblingsverein", default)]
    pub favorite_club: Option<Club>,
    #[serde(alias = "stadion", default)]
    pub home_stadium: Option<Stadium>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Club {
    pub id: u32,
    pub name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Stadium {
    pub id: StadiumID,
    pub name: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// The body of a save-route call. Nothing from the response is used.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SaveRouteRequest {
    pub start_address: String,
    pub start_lat: Option<f64>,
    pub start_lng: Option<f64>,
    pub distance_km: Option<f64>,
    pub duration_min: u32,
    pub mode: LastMileMode,
    pub stadium_id: StadiumID,
    pub parking_site_id: ParkingSiteID,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct NavigationInstructions {
    #[serde(alias = "steps", default)]
    pub instructions: Vec<Instruction>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Instruction {
    #[serde(alias = "instruction")]
    pub text: String,
    #[serde(default)]
    pub distance: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
}

// A bad rating only loses the label, not the whole response
fn deserialize_rating<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u8>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Rating {
        Integer(i64),
        Other(IgnoredAny),
    }

    Ok(match Option::<Rating>::deserialize(d)? {
        Some(Rating::Integer(x)) => u8::try_from(x).ok(),
        Some(Rating::Other(_)) | None => None,
    })
}

impl ParkingSite {
    pub fn coord(&self) -> Coord {
        Coord {
            x: self.longitude,
            y: self.latitude,
        }
    }
}

impl Proposal {
    pub fn id(&self) -> ParkingSiteID {
        self.parking_site.id
    }

    /// None if the backend didn't pick a mode or sent something unknown
    pub fn recommended_mode(&self) -> Option<LastMileMode> {
        self.recommended_mode.as_deref()?.trim().parse().ok()
    }

    pub fn last_mile_duration(&self, mode: LastMileMode) -> Option<u32> {
        match mode {
            LastMileMode::Walking => self.walking_duration_minutes,
            LastMileMode::Transit => self.transit_duration_minutes,
        }
    }

    /// An explicit last-mile path wins; otherwise use the path recorded for this mode
    pub fn encoded_path_last_mile(&self, mode: LastMileMode) -> Option<&str> {
        if let Some(path) = &self.encoded_path_lastmile {
            return Some(path);
        }
        match mode {
            LastMileMode::Walking => self.encoded_path_walking.as_deref(),
            LastMileMode::Transit => self.encoded_path_transit.as_deref(),
        }
    }

    pub fn has_last_mile(&self) -> bool {
        self.walking_duration_minutes.is_some() || self.transit_duration_minutes.is_some()
    }
}

impl LiveAvailability {
    /// Percent occupied, trusting the backend's number if it sent one
    pub fn occupancy_rate(&self) -> f64 {
        if let Some(rate) = self.occupancy.as_ref().and_then(|o| o.occupancy_rate) {
            return rate;
        }
        if self.capacity == 0 {
            return 0.0;
        }
        let taken = self.capacity.saturating_sub(self.free_spaces) as f64;
        (taken / self.capacity as f64 * 1000.0).round() / 10.0
    }
}

impl Stadium {
    pub fn coord(&self) -> Option<Coord> {
        Some(Coord {
            x: self.longitude?,
            y: self.latitude?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_original_backend_keys() {
        let raw = r#"{
            "empfohlener_parkplatz": {
                "parkplatz": {"id": 5, "name": "P5", "latitude": 51.49, "longitude": 7.45},
                "dauer_auto": 20,
                "dauer_traffic": 24,
                "distanz_km": 12.3,
                "polyline_auto": "_p~iF~ps|U",
                "dauer_walking": 12,
                "dauer_transit": null,
                "polyline_walking": "_ulLnnqC",
                "beste_methode": "walking",
                "gesamtzeit": 36,
                "verkehr_bewertung": 4,
                "has_live_data": true,
                "live_parking_data": {"frei": 40, "capacity": 200}
            },
            "alle_parkplaetze": [],
            "meta": {"total_options": 1}
        }"#;
        let response: QueryResponse = serde_json::from_str(raw).unwrap();
        let proposal = response.recommended.unwrap();
        assert_eq!(proposal.id(), ParkingSiteID(5));
        assert_eq!(proposal.traffic_driving_duration_minutes, Some(24));
        assert_eq!(proposal.recommended_mode(), Some(LastMileMode::Walking));
        assert_eq!(
            proposal.encoded_path_last_mile(LastMileMode::Walking),
            Some("_ulLnnqC")
        );
        assert_eq!(proposal.encoded_path_last_mile(LastMileMode::Transit), None);
        assert_eq!(proposal.live_availability.unwrap().occupancy_rate(), 80.0);
        assert!(response.alternatives.is_empty());
    }

    #[test]
    fn odd_traffic_ratings_are_absent() {
        let parse = |rating: &str| {
            let raw = format!(
                r#"{{
                    "parking_site": {{"id": 1, "name": "P1", "latitude": 0.0, "longitude": 0.0}},
                    "driving_duration_minutes": 10,
                    "walking_duration_minutes": 3,
                    "verkehr_bewertung": {rating}
                }}"#
            );
            serde_json::from_str::<Proposal>(&raw).unwrap().traffic_rating
        };
        assert_eq!(parse("4"), Some(4));
        assert_eq!(parse("null"), None);
        assert_eq!(parse("300"), None);
        assert_eq!(parse("-1"), None);
        assert_eq!(parse("3.5"), None);
        assert_eq!(parse(r#""gut""#), None);
    }

    #[test]
    fn unknown_mode_is_absent() {
        let raw = r#"{
            "parking_site": {"id": 1, "name": "P1", "latitude": 0.0, "longitude": 0.0},
            "driving_duration_minutes": 10,
            "walking_duration_minutes": 3,
            "recommended_mode": "bicycling"
        }"#;
        let proposal: Proposal = serde_json::from_str(raw).unwrap();
        assert_eq!(proposal.recommended_mode(), None);
        assert!(proposal.has_last_mile());
    }

    #[test]
    fn navigation_steps_shape() {
        let raw = r#"{"status": "OK", "steps": [
            {"instruction": "Head <b>north</b>", "distance": "0,2 km", "duration": "3 Min."}
        ]}"#;
        let nav: NavigationInstructions = serde_json::from_str(raw).unwrap();
        assert_eq!(nav.instructions.len(), 1);
        assert_eq!(nav.instructions[0].text, "Head <b>north</b>");
    }
}
