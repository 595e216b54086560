//! Pedestrian routing client.
//!
//! Sends start, end and optional waypoints as a form post and returns the
//! upstream GeoJSON route untouched.

use reqwest::Client;
use tracing::{info, warn};

use plogger_core::config::TmapConfig;

use crate::error::TourError;

const PEDESTRIAN_PATH: &str = "/tmap/routes/pedestrian?version=1";

/// A pedestrian route request. Coordinates are `(x, y)` = `(lng, lat)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteQuery {
    pub start: (f64, f64),
    pub end: (f64, f64),
    pub pass_list: Vec<(f64, f64)>,
    pub start_name: String,
    pub end_name: String,
    pub coord_type: String,
    /// 0 = recommended, 10 = shortest, ...
    pub search_option: u32,
}

impl RouteQuery {
    pub fn new(start: (f64, f64), end: (f64, f64)) -> Self {
        Self {
            start,
            end,
            pass_list: Vec::new(),
            start_name: "출발지".to_string(),
            end_name: "도착지".to_string(),
            coord_type: "WGS84GEO".to_string(),
            search_option: 0,
        }
    }

    pub fn with_waypoints(mut self, pass_list: Vec<(f64, f64)>) -> Self {
        self.pass_list = pass_list;
        self
    }

    /// Waypoints as `x1,y1_x2,y2`, or `None` when there are none.
    pub fn pass_list_param(&self) -> Option<String> {
        if self.pass_list.is_empty() {
            return None;
        }
        Some(
            self.pass_list
                .iter()
                .map(|(x, y)| format!("{},{}", x, y))
                .collect::<Vec<_>>()
                .join("_"),
        )
    }

    /// Form fields in upstream order. Names are percent-encoded on top of
    /// the form encoding; the routing API decodes them twice.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("startX", self.start.0.to_string()),
            ("startY", self.start.1.to_string()),
            ("endX", self.end.0.to_string()),
            ("endY", self.end.1.to_string()),
            ("startName", urlencoding::encode(&self.start_name).into_owned()),
            ("endName", urlencoding::encode(&self.end_name).into_owned()),
            ("reqCoordType", self.coord_type.clone()),
            ("resCoordType", self.coord_type.clone()),
            ("searchOption", self.search_option.to_string()),
        ];
        if let Some(pass) = self.pass_list_param() {
            fields.push(("passList", pass));
        }
        fields
    }
}

/// HTTP client for the pedestrian routing API.
#[derive(Debug, Clone)]
pub struct PedestrianRouter {
    client: Client,
    config: TmapConfig,
}

impl PedestrianRouter {
    pub fn new(config: TmapConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn url(&self) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), PEDESTRIAN_PATH)
    }

    /// Request a turn-by-turn route.
    pub async fn route(&self, query: &RouteQuery) -> Result<serde_json::Value, TourError> {
        if self.config.app_key.is_empty() {
            return Err(TourError::MissingCredentials("TMAP_API_KEY"));
        }

        let response = self
            .client
            .post(self.url())
            .header("appKey", &self.config.app_key)
            .header("Accept-Language", "ko")
            .form(&query.form_fields())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Pedestrian route request failed");
            return Err(TourError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let route = response.json::<serde_json::Value>().await?;
        info!(waypoints = query.pass_list.len(), "Pedestrian route received");
        Ok(route)
    }
}
