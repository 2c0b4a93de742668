use geo::line_measures::Distance;
use geo::{Coord, Haversine, LineString, Point};
use log::{debug, info, warn};
use rstar::primitives::GeomWithData;
use rstar::RTree;
use serde::Serialize;
use stadium_parking_model::{
    ErrorBody, LastMileMode, ParkingSiteID, Profile, QueryResponse, SaveRouteRequest,
};

use crate::normalize::normalize;
use crate::ranking::{rank, RankedProposal};
use crate::{polyline, Config, QueryError};

// Along a meridian, and along the equator
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Tags a route query, so a late answer to an older query can't overwrite a newer one
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RequestID(pub u32);

/// Owns everything the proposal list and the map show
pub struct RoutePlanner {
    pub(crate) config: Config,
    pub(crate) state: PlannerState,
    next_request: u32,
    start_address: Option<String>,
    profile: Option<Profile>,
    // From the last response, for diagnostics
    dropped: usize,
}

pub enum PlannerState {
    Idle,
    Loading { request: RequestID },
    Ready(Results),
    Error(QueryError),
}

/// The ranked proposals and everything derived from the active one
pub struct Results {
    pub proposals: Vec<RankedProposal>,
    // idx into proposals
    pub active: usize,
    pub geometry: RouteGeometry,
    pub focus: FocusInstruction,
    snap_to_markers: RTree<GeomWithData<[f64; 2], usize>>,
}

/// What to draw for the active proposal. Recalculated from scratch on every selection.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteGeometry {
    pub driving_path: LineString,
    pub last_mile_path: LineString,
    pub last_mile_mode: LastMileMode,
    pub start_marker: Option<Coord>,
    pub end_marker: Option<Coord>,
    pub destination_marker: Option<Coord>,
}

/// Where the map should fly to. Applying the same instruction twice is harmless.
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct FocusInstruction {
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: u8,
}

/// Where the map should be when nothing asked for focus
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct MapView {
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: u8,
}

impl RoutePlanner {
    pub fn new(config: Config) -> RoutePlanner {
        RoutePlanner {
            config,
            state: PlannerState::Idle,
            next_request: 0,
            start_address: None,
            profile: None,
            dropped: 0,
        }
    }

    pub fn set_config(&mut self, config: Config) {
        self.config = config;
        // Focus depends on the zoom
        let config = &self.config;
        if let PlannerState::Ready(results) = &mut self.state {
            results.focus = FocusInstruction::new(&results.proposals[results.active], config);
        }
    }

    pub fn set_profile(&mut self, profile: Profile) {
        self.profile = Some(profile);
        // The home stadium may fill in the destination
        if let PlannerState::Ready(results) = &mut self.state {
            results.geometry = RouteGeometry::new(
                &results.proposals[results.active],
                self.profile.as_ref(),
            );
        }
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    /// Forgets everything from the previous query and waits for the answer to this one
    pub fn begin_query(&mut self, start_address: &str) -> RequestID {
        self.next_request = self.next_request.wrapping_add(1);
        let request = RequestID(self.next_request);
        info!("Querying proposals from {start_address:?} as request {}", request.0);

        self.state = PlannerState::Loading { request };
        self.start_address = Some(start_address.to_string());
        self.dropped = 0;
        request
    }

    /// Applies the backend's answer. Returns false if this isn't the query in flight, in which
    /// case nothing changes.
    pub fn on_response(&mut self, request: RequestID, status: u16, body: &str) -> bool {
        if !self.is_waiting_for(request) {
            debug!("Ignoring stale response to request {}", request.0);
            return false;
        }

        self.state = match self.handle_response(status, body) {
            Ok(results) => {
                info!(
                    "Got {} proposals ({} dropped), top is {:?}",
                    results.proposals.len(),
                    self.dropped,
                    results.proposals[0].proposal.id()
                );
                PlannerState::Ready(results)
            }
            Err(err) => {
                warn!("Route query failed ({}): {err}", err.category());
                PlannerState::Error(err)
            }
        };
        true
    }

    /// The request never got an HTTP response at all
    pub fn on_network_error(&mut self, request: RequestID, message: &str) -> bool {
        if !self.is_waiting_for(request) {
            debug!("Ignoring stale failure of request {}", request.0);
            return false;
        }
        let err = QueryError::Network(message.to_string());
        warn!("Route query failed ({}): {err}", err.category());
        self.state = PlannerState::Error(err);
        true
    }

    fn is_waiting_for(&self, request: RequestID) -> bool {
        matches!(self.state, PlannerState::Loading { request: current } if current == request)
    }

    fn handle_response(&mut self, status: u16, body: &str) -> Result<Results, QueryError> {
        if !(200..300).contains(&status) {
            // The body is only for the message, so don't insist on it parsing
            let detail = serde_json::from_str::<ErrorBody>(body)
                .ok()
                .and_then(|b| b.error_detail);
            return Err(QueryError::from_status(status, detail));
        }

        let response: QueryResponse = serde_json::from_str(body)?;
        let normalized = normalize(response);
        self.dropped = normalized.dropped();
        let proposals = rank(normalized.proposals);
        if proposals.is_empty() {
            return Err(QueryError::NoValidProposals);
        }
        Ok(Results::new(proposals, &self.config, self.profile.as_ref()))
    }

    /// Makes a proposal active. Returns true if the map needs to redraw.
    pub fn select(&mut self, id: ParkingSiteID) -> bool {
        let PlannerState::Ready(results) = &mut self.state else {
            warn!("Can't select {id:?} without any proposals");
            return false;
        };
        let Some(idx) = results.proposals.iter().position(|r| r.proposal.id() == id) else {
            warn!("Can't select unknown {id:?}");
            return false;
        };
        results.activate(idx, &self.config, self.profile.as_ref());
        true
    }

    /// Selects the parking marker closest to a click on the map, if the click was close enough
    pub fn select_near(&mut self, pt: Coord) -> bool {
        let PlannerState::Ready(results) = &mut self.state else {
            return false;
        };
        let radius = self.config.marker_click_radius_meters;
        // The tree is in degrees, and a degree of longitude shrinks away from the equator. A
        // circle this big in degrees holds every marker within the radius on the ground, and
        // haversine picks among those.
        let cos_lat = pt.y.to_radians().cos().abs().max(0.01);
        let search = 1.1 * radius / (METERS_PER_DEGREE * cos_lat);
        let click = Point::from(pt);
        let Some((meters, idx)) = results
            .snap_to_markers
            .locate_within_distance([pt.x, pt.y], search * search)
            .map(|marker| {
                let [x, y] = *marker.geom();
                (Haversine.distance(click, Point::new(x, y)), marker.data)
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
        else {
            return false;
        };
        if meters > radius {
            return false;
        }
        results.activate(idx, &self.config, self.profile.as_ref());
        true
    }

    /// Back to the state before any query
    pub fn clear(&mut self) {
        self.state = PlannerState::Idle;
        self.start_address = None;
        self.dropped = 0;
    }

    pub fn results(&self) -> Option<&Results> {
        match &self.state {
            PlannerState::Ready(results) => Some(results),
            _ => None,
        }
    }

    pub fn proposals(&self) -> &[RankedProposal] {
        self.results()
            .map(|r| r.proposals.as_slice())
            .unwrap_or_default()
    }

    pub fn active(&self) -> Option<&RankedProposal> {
        self.results().map(Results::active)
    }

    pub fn geometry(&self) -> Option<&RouteGeometry> {
        self.results().map(|r| &r.geometry)
    }

    pub fn focus(&self) -> Option<FocusInstruction> {
        self.results().map(|r| r.focus)
    }

    pub fn error(&self) -> Option<&QueryError> {
        match &self.state {
            PlannerState::Error(err) => Some(err),
            _ => None,
        }
    }

    /// How many proposals the last response had that couldn't be shown
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn state_name(&self) -> &'static str {
        match self.state {
            PlannerState::Idle => "idle",
            PlannerState::Loading { .. } => "loading",
            PlannerState::Ready(_) => "ready",
            PlannerState::Error(_) => "error",
        }
    }

    /// Focus if there is one, otherwise the configured default
    pub fn map_view(&self) -> MapView {
        if let Some(focus) = self.focus() {
            return MapView {
                latitude: focus.latitude,
                longitude: focus.longitude,
                zoom: focus.zoom,
            };
        }
        let [latitude, longitude] = self.config.default_center;
        MapView {
            latitude,
            longitude,
            zoom: self.config.default_zoom,
        }
    }

    /// The body to save the active route, if there's an active route and a stadium to save it for
    pub fn save_route_request(&self) -> Option<SaveRouteRequest> {
        let active = self.active()?;
        let geometry = self.geometry()?;
        let stadium = self.profile.as_ref()?.home_stadium.as_ref()?;
        Some(SaveRouteRequest {
            start_address: self.start_address.clone()?,
            start_lat: geometry.start_marker.map(|pt| pt.y),
            start_lng: geometry.start_marker.map(|pt| pt.x),
            distance_km: active.proposal.distance_km,
            duration_min: active.display_total(),
            mode: active.durations.last_mile_mode,
            stadium_id: stadium.id,
            parking_site_id: active.proposal.id(),
        })
    }
}

impl Results {
    fn new(proposals: Vec<RankedProposal>, config: &Config, profile: Option<&Profile>) -> Results {
        let snap_to_markers = RTree::bulk_load(
            proposals
                .iter()
                .enumerate()
                .map(|(idx, r)| {
                    let pt = r.proposal.parking_site.coord();
                    GeomWithData::new([pt.x, pt.y], idx)
                })
                .collect(),
        );
        // The top proposal starts out active
        let geometry = RouteGeometry::new(&proposals[0], profile);
        let focus = FocusInstruction::new(&proposals[0], config);
        Results {
            proposals,
            active: 0,
            geometry,
            focus,
            snap_to_markers,
        }
    }

    fn activate(&mut self, idx: usize, config: &Config, profile: Option<&Profile>) {
        // Re-selecting the active one only repeats the focus
        if idx != self.active {
            self.active = idx;
            self.geometry = RouteGeometry::new(&self.proposals[idx], profile);
            info!("Selected {:?}", self.proposals[idx].proposal.id());
        }
        self.focus = FocusInstruction::new(&self.proposals[idx], config);
    }

    pub fn active(&self) -> &RankedProposal {
        &self.proposals[self.active]
    }
}

impl RouteGeometry {
    fn new(ranked: &RankedProposal, profile: Option<&Profile>) -> RouteGeometry {
        let proposal = &ranked.proposal;
        let mode = ranked.durations.last_mile_mode;
        let driving_path = decode_leg(
            proposal.encoded_path_driving.as_deref(),
            "driving",
            proposal.id(),
        );
        let last_mile_path = decode_leg(
            proposal.encoded_path_last_mile(mode),
            "last-mile",
            proposal.id(),
        );

        let stadium = profile
            .and_then(|p| p.home_stadium.as_ref())
            .and_then(|s| s.coord());
        RouteGeometry {
            start_marker: driving_path.0.first().copied(),
            end_marker: driving_path.0.last().copied(),
            destination_marker: last_mile_path.0.last().copied().or(stadium),
            driving_path,
            last_mile_path,
            last_mile_mode: mode,
        }
    }
}

// A leg that can't be decoded just isn't drawn
fn decode_leg(encoded: Option<&str>, leg: &str, id: ParkingSiteID) -> LineString {
    let Some(encoded) = encoded else {
        return LineString::new(Vec::new());
    };
    match polyline::decode(encoded) {
        Ok(pts) => LineString::new(pts),
        Err(err) => {
            warn!("Not drawing the {leg} leg of {id:?}: {err}");
            LineString::new(Vec::new())
        }
    }
}

impl FocusInstruction {
    fn new(ranked: &RankedProposal, config: &Config) -> FocusInstruction {
        let site = &ranked.proposal.parking_site;
        FocusInstruction {
            latitude: site.latitude,
            longitude: site.longitude,
            zoom: config.focus_zoom,
        }
    }
}
