use serde::Serialize;
use stadium_parking_model::{
    LastMileMode, LiveAvailability, NavigationInstructions, NavigationLinks,
};
use strum::Display;

use crate::ranking::{effective_driving, RankedProposal};

const MISSING: &str = "—";

/// What the proposal list shows for one entry
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ProposalSummary {
    pub parking_site_id: u32,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub rank: usize,
    pub is_top: bool,
    pub is_active: bool,

    pub total_minutes: u32,
    pub computed_total_minutes: u32,
    pub total_label: String,

    pub driving_minutes: u32,
    pub baseline_driving_minutes: u32,
    pub driving_label: String,
    pub traffic_delay_minutes: Option<u32>,
    pub distance_label: String,

    pub last_mile_mode: LastMileMode,
    pub last_mile_minutes: u32,
    pub last_mile_label: String,
    pub walking_minutes: Option<u32>,
    pub transit_minutes: Option<u32>,

    pub traffic_rating: Option<u8>,
    pub traffic_label: &'static str,
    pub traffic_comment: Option<String>,

    pub navigation_links: Option<NavigationLinks>,
    pub walking_navigation_link: Option<NavigationLinks>,
    pub live: Option<LiveSummary>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct LiveSummary {
    pub free_spaces: u32,
    pub capacity: u32,
    pub occupancy_rate: f64,
    pub band: OccupancyBand,
    pub status_text: Option<String>,
    pub freshness: Option<String>,
    pub last_update: Option<String>,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OccupancyBand {
    Low,
    Moderate,
    High,
    Full,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct NavigationLine {
    pub text: String,
    pub distance: Option<String>,
    pub duration: Option<String>,
}

impl ProposalSummary {
    pub fn new(ranked: &RankedProposal, is_active: bool) -> ProposalSummary {
        let p = &ranked.proposal;
        let d = &ranked.durations;
        ProposalSummary {
            parking_site_id: p.id().0,
            name: p.parking_site.name.clone(),
            latitude: p.parking_site.latitude,
            longitude: p.parking_site.longitude,
            rank: ranked.rank,
            is_top: ranked.is_top(),
            is_active,

            total_minutes: ranked.display_total(),
            computed_total_minutes: d.total,
            total_label: format_minutes(Some(ranked.display_total())),

            driving_minutes: d.driving,
            baseline_driving_minutes: p.driving_duration_minutes,
            driving_label: format_minutes(Some(d.driving)),
            traffic_delay_minutes: traffic_delay(p.driving_duration_minutes, effective_driving(p)),
            distance_label: format_km(p.distance_km),

            last_mile_mode: d.last_mile_mode,
            last_mile_minutes: d.last_mile,
            last_mile_label: format_minutes(Some(d.last_mile)),
            walking_minutes: p.walking_duration_minutes,
            transit_minutes: p.transit_duration_minutes,

            traffic_rating: p.traffic_rating,
            traffic_label: traffic_label(p.traffic_rating),
            traffic_comment: p.traffic_comment.clone(),

            navigation_links: p.navigation_links.clone(),
            // Only useful when we're actually telling people to walk
            walking_navigation_link: if d.last_mile_mode == LastMileMode::Walking {
                p.walking_navigation_link.clone()
            } else {
                None
            },
            live: p.live_availability.as_ref().map(LiveSummary::new),
        }
    }
}

impl LiveSummary {
    fn new(live: &LiveAvailability) -> LiveSummary {
        let occupancy_rate = live.occupancy_rate();
        LiveSummary {
            free_spaces: live.free_spaces,
            capacity: live.capacity,
            occupancy_rate,
            band: occupancy_band(occupancy_rate),
            status_text: live
                .occupancy
                .as_ref()
                .and_then(|o| o.occupancy_text.clone()),
            freshness: live.freshness.as_ref().map(|f| f.status.clone()),
            last_update: live.last_update.clone(),
        }
    }
}

/// "1h 5min" or "45min". Missing and zero durations are both shown as missing.
pub fn format_minutes(minutes: Option<u32>) -> String {
    match minutes {
        None | Some(0) => MISSING.to_string(),
        Some(minutes) => {
            let (h, m) = (minutes / 60, minutes % 60);
            if h > 0 {
                format!("{h}h {m}min")
            } else {
                format!("{m}min")
            }
        }
    }
}

pub fn format_km(km: Option<f64>) -> String {
    match km {
        Some(km) if km > 0.0 => format!("{km:.1} km"),
        _ => MISSING.to_string(),
    }
}

pub fn traffic_label(rating: Option<u8>) -> &'static str {
    match rating {
        Some(5) => "Excellent",
        Some(4) => "Good",
        Some(3) => "Fair",
        Some(2) => "Poor",
        Some(1) => "Critical",
        _ => "Unknown",
    }
}

/// How much longer the drive takes because of traffic, if at all
pub fn traffic_delay(baseline: u32, with_traffic: u32) -> Option<u32> {
    with_traffic.checked_sub(baseline).filter(|delay| *delay > 0)
}

pub fn occupancy_band(rate: f64) -> OccupancyBand {
    if rate <= 30.0 {
        OccupancyBand::Low
    } else if rate <= 60.0 {
        OccupancyBand::Moderate
    } else if rate <= 85.0 {
        OccupancyBand::High
    } else {
        OccupancyBand::Full
    }
}

pub fn navigation_panel(instructions: &NavigationInstructions) -> Vec<NavigationLine> {
    instructions
        .instructions
        .iter()
        .map(|step| NavigationLine {
            text: strip_html(&step.text),
            distance: step.distance.clone(),
            duration: step.duration.clone(),
        })
        .collect()
}

// Directions APIs mark up their instructions, and sometimes glue a <div> onto the end
fn strip_html(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
