use geo::{Coord, LineString};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry};

use crate::display::{format_minutes, occupancy_band, traffic_label};
use crate::planner::RoutePlanner;

/// Everything the map draws, as one FeatureCollection. Features have a "type" property:
///
/// - "driving": the drive to the active parking site, drawn solid
/// - "last_mile": walking or transit from there to the stadium, drawn dashed
/// - "parking": one marker per proposal, with "style" being "active", "top", or "other"
/// - "start", "end", "destination": the endpoints of the active route
///
/// Features come in draw order, so later ones should be drawn on top.
pub fn render_geojson(planner: &RoutePlanner) -> GeoJson {
    let mut features = Vec::new();
    let Some(results) = planner.results() else {
        return to_geojson(features);
    };
    let geometry = &results.geometry;
    let active = results.active();
    let name = &active.proposal.parking_site.name;

    // Draw the active route
    if let Some(mut f) = line_feature(&geometry.driving_path) {
        f.set_property("type", "driving");
        f.set_property("dashed", false);
        f.set_property("label", format!("Drive to {name}"));
        f.set_property("minutes", active.durations.driving);
        features.push(f);
    }
    if let Some(mut f) = line_feature(&geometry.last_mile_path) {
        f.set_property("type", "last_mile");
        f.set_property("dashed", true);
        f.set_property("mode", geometry.last_mile_mode.to_string());
        f.set_property("label", format!("{} to the stadium", geometry.last_mile_mode));
        f.set_property("minutes", active.durations.last_mile);
        features.push(f);
    }

    // Markers covering each other must show the important one, so collect them and sort
    let mut markers = Vec::new();
    for (pt, kind) in [
        (geometry.start_marker, "start"),
        (geometry.end_marker, "end"),
        (geometry.destination_marker, "destination"),
    ] {
        if let Some(pt) = pt {
            let mut f = point_feature(pt);
            f.set_property("type", kind);
            markers.push((0, f));
        }
    }
    for (idx, ranked) in results.proposals.iter().enumerate() {
        let p = &ranked.proposal;
        let (importance, style) = if idx == results.active {
            (3, "active")
        } else if ranked.is_top() {
            (2, "top")
        } else {
            (1, "other")
        };

        let mut f = point_feature(p.parking_site.coord());
        f.set_property("type", "parking");
        f.set_property("style", style);
        f.set_property("parking_site_id", p.id().0);
        f.set_property("name", p.parking_site.name.clone());
        f.set_property("rank", ranked.rank);
        f.set_property("total_label", format_minutes(Some(ranked.display_total())));
        f.set_property("traffic_label", traffic_label(p.traffic_rating));
        if let Some(live) = &p.live_availability {
            f.set_property("free_spaces", live.free_spaces);
            f.set_property(
                "occupancy",
                occupancy_band(live.occupancy_rate()).to_string(),
            );
        }
        markers.push((importance, f));
    }
    // Stable, so equally important markers stay in rank order
    markers.sort_by_key(|(importance, _)| *importance);
    features.extend(markers.into_iter().map(|(_, f)| f));

    to_geojson(features)
}

// Nothing to draw for a leg that couldn't be decoded or is just one point
fn line_feature(line: &LineString) -> Option<Feature> {
    if line.0.len() < 2 {
        return None;
    }
    Some(Feature::from(Geometry::new(geojson::Value::from(line))))
}

fn point_feature(pt: Coord) -> Feature {
    Feature::from(Geometry::new(geojson::Value::Point(vec![pt.x, pt.y])))
}

fn to_geojson(features: Vec<Feature>) -> GeoJson {
    GeoJson::FeatureCollection(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}
