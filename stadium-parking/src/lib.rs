use std::sync::Once;

use geo::Coord;
use log::warn;
use serde::Deserialize;
use wasm_bindgen::prelude::*;

use stadium_parking_model::{NavigationInstructions, ParkingSiteID, Profile};

pub use auth::AuthContext;
pub use display::{
    format_km, format_minutes, navigation_panel, occupancy_band, traffic_delay, traffic_label,
    LiveSummary, NavigationLine, OccupancyBand, ProposalSummary,
};
pub use error::{DecodeError, InvalidProposal, QueryError};
pub use normalize::{normalize, validate, NormalizedProposals};
pub use planner::{
    FocusInstruction, MapView, PlannerState, RequestID, Results, RouteGeometry, RoutePlanner,
};
pub use ranking::{
    durations, effective_driving, effective_last_mile, rank, Durations, RankedProposal,
};
pub use render::render_geojson;

mod auth;
mod display;
mod error;
mod normalize;
mod planner;
pub mod polyline;
mod ranking;
mod render;

static START: Once = Once::new();

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Zoom level when flying to a parking site
    pub focus_zoom: u8,
    /// [latitude, longitude] of the map before anything is focused
    pub default_center: [f64; 2],
    pub default_zoom: u8,
    /// Clicks further than this from every parking marker don't select anything
    pub marker_click_radius_meters: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            focus_zoom: 15,
            default_center: [53.5511, 9.9937],
            default_zoom: 13,
            marker_click_radius_meters: 50.0,
        }
    }
}

#[wasm_bindgen]
pub struct JsRoutePlanner {
    planner: RoutePlanner,
}

#[wasm_bindgen]
impl JsRoutePlanner {
    #[wasm_bindgen(constructor)]
    pub fn new() -> JsRoutePlanner {
        START.call_once(|| {
            // Panics shouldn't happen, but if they do, console.log them.
            console_error_panic_hook::set_once();
            #[cfg(target_arch = "wasm32")]
            {
                // Somebody else on the page may have installed a logger already
                let _ = console_log::init_with_level(log::Level::Info);
            }
        });

        Self {
            planner: RoutePlanner::new(Config::default()),
        }
    }

    /// Updates configuration. The caller should redraw.
    #[wasm_bindgen(js_name = setConfig)]
    pub fn set_config(&mut self, input: JsValue) {
        match serde_wasm_bindgen::from_value(input) {
            Ok(config) => {
                self.planner.set_config(config);
            }
            Err(err) => {
                warn!("Bad input to setConfig: {err}");
            }
        }
    }

    /// Takes the body of the profile response
    #[wasm_bindgen(js_name = setProfile)]
    pub fn set_profile(&mut self, body: &str) -> Result<(), JsValue> {
        let profile: Profile = serde_json::from_str(body).map_err(err_to_js)?;
        self.planner.set_profile(profile);
        Ok(())
    }

    /// Starts a new query, dropping all previous results. Pass the returned ID to
    /// onQueryResponse or onQueryFailure once the request finishes.
    #[wasm_bindgen(js_name = beginQuery)]
    pub fn begin_query(&mut self, start_address: &str) -> u32 {
        self.planner.begin_query(start_address).0
    }

    // True if something has changed. Answers to anything but the latest query are ignored.
    #[wasm_bindgen(js_name = onQueryResponse)]
    pub fn on_query_response(&mut self, request: u32, status: u16, body: &str) -> bool {
        self.planner.on_response(RequestID(request), status, body)
    }

    // True if something has changed
    #[wasm_bindgen(js_name = onQueryFailure)]
    pub fn on_query_failure(&mut self, request: u32, message: &str) -> bool {
        self.planner.on_network_error(RequestID(request), message)
    }

    // True if the map should redraw and apply the focus
    #[wasm_bindgen(js_name = selectProposal)]
    pub fn select_proposal(&mut self, parking_site_id: u32) -> bool {
        self.planner.select(ParkingSiteID(parking_site_id))
    }

    // True if the click hit a parking marker, which is now selected
    #[wasm_bindgen(js_name = onMapClick)]
    pub fn on_map_click(&mut self, lon: f64, lat: f64) -> bool {
        self.planner.select_near(Coord { x: lon, y: lat })
    }

    #[wasm_bindgen(js_name = clearState)]
    pub fn clear_state(&mut self) {
        self.planner.clear();
    }

    /// One of "idle", "loading", "ready", "error"
    #[wasm_bindgen(js_name = state)]
    pub fn state(&self) -> String {
        self.planner.state_name().to_string()
    }

    #[wasm_bindgen(js_name = errorMessage)]
    pub fn error_message(&self) -> Option<String> {
        self.planner.error().map(|err| err.to_string())
    }

    #[wasm_bindgen(js_name = errorCategory)]
    pub fn error_category(&self) -> Option<String> {
        self.planner.error().map(|err| err.category().to_string())
    }

    #[wasm_bindgen(js_name = droppedProposals)]
    pub fn dropped_proposals(&self) -> usize {
        self.planner.dropped()
    }

    #[wasm_bindgen(js_name = activeProposalId)]
    pub fn active_proposal_id(&self) -> Option<u32> {
        self.planner.active().map(|r| r.proposal.id().0)
    }

    /// The proposal list in display order, as JSON
    #[wasm_bindgen(js_name = rankedProposals)]
    pub fn ranked_proposals(&self) -> Result<String, JsValue> {
        let active = self.planner.results().map(|r| r.active);
        let summaries: Vec<ProposalSummary> = self
            .planner
            .proposals()
            .iter()
            .enumerate()
            .map(|(idx, r)| ProposalSummary::new(r, Some(idx) == active))
            .collect();
        serde_json::to_string(&summaries).map_err(err_to_js)
    }

    /// Where the map should fly, as JSON, if anywhere
    #[wasm_bindgen(js_name = focusInstruction)]
    pub fn focus_instruction(&self) -> Result<Option<String>, JsValue> {
        self.planner
            .focus()
            .map(|focus| serde_json::to_string(&focus).map_err(err_to_js))
            .transpose()
    }

    #[wasm_bindgen(js_name = mapView)]
    pub fn map_view(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.planner.map_view()).map_err(err_to_js)
    }

    #[wasm_bindgen(js_name = renderGeojson)]
    pub fn render_geojson(&self) -> String {
        render_geojson(&self.planner).to_string()
    }

    /// The body for saving the active route, as JSON. Needs a profile with a home stadium.
    #[wasm_bindgen(js_name = saveRouteRequest)]
    pub fn save_route_request(&self) -> Result<Option<String>, JsValue> {
        self.planner
            .save_route_request()
            .map(|req| serde_json::to_string(&req).map_err(err_to_js))
            .transpose()
    }
}

impl Default for JsRoutePlanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Turns the body of a navigation-instructions response into plain-text lines, as JSON
#[wasm_bindgen(js_name = navigationPanel)]
pub fn js_navigation_panel(body: &str) -> Result<String, JsValue> {
    let instructions: NavigationInstructions = serde_json::from_str(body).map_err(err_to_js)?;
    serde_json::to_string(&navigation_panel(&instructions)).map_err(err_to_js)
}

#[wasm_bindgen]
pub struct JsAuthContext {
    auth: AuthContext,
}

#[wasm_bindgen]
impl JsAuthContext {
    #[wasm_bindgen(constructor)]
    pub fn new() -> JsAuthContext {
        Self {
            auth: AuthContext::new(),
        }
    }

    #[wasm_bindgen(js_name = isAuthenticated)]
    pub fn is_authenticated(&self) -> bool {
        self.auth.is_authenticated()
    }

    pub fn login(&mut self, access_token: String, refresh_token: Option<String>) {
        self.auth.login(access_token, refresh_token);
    }

    // Also call this when a query ends with the "unauthorized" category
    pub fn logout(&mut self) {
        self.auth.logout();
    }

    #[wasm_bindgen(js_name = authorizationHeader)]
    pub fn authorization_header(&self) -> Option<String> {
        self.auth.authorization_header()
    }

    #[wasm_bindgen(js_name = refreshToken)]
    pub fn refresh_token(&self) -> Option<String> {
        self.auth.refresh_token().map(|t| t.to_string())
    }
}

impl Default for JsAuthContext {
    fn default() -> Self {
        Self::new()
    }
}

fn err_to_js<E: std::fmt::Display>(err: E) -> JsValue {
    JsValue::from_str(&err.to_string())
}
