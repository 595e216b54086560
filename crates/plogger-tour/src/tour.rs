//! Attraction search against the public tourism data API.
//!
//! A search resolves a region name to an area code (fixed table), the
//! sub-region name to a sigungu code (`areaCode2`), then pulls the attraction
//! list for that pair (`areaBasedList2`), keeps the configured content types
//! and samples the result down to a manageable candidate set.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::Client;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Deserializer};
use tracing::{debug, info};

use plogger_core::config::TourConfig;
use plogger_core::types::Place;

use crate::error::TourError;

/// Maximum overview length kept per place, in characters.
const OVERVIEW_MAX_CHARS: usize = 300;

/// Region name to tourism-API area code.
pub const AREA_CODES: &[(&str, &str)] = &[
    ("서울", "1"),
    ("인천", "2"),
    ("대전", "3"),
    ("대구", "4"),
    ("광주", "5"),
    ("부산", "6"),
    ("울산", "7"),
    ("세종특별자치시", "8"),
    ("경기도", "31"),
    ("강원특별자치도", "32"),
    ("충청북도", "33"),
    ("충청남도", "34"),
    ("경상북도", "35"),
    ("경상남도", "36"),
    ("전북특별자치도", "37"),
    ("전라남도", "38"),
    ("제주도", "39"),
];

/// Look up the area code for an exact region name.
pub fn area_code(area_name: &str) -> Option<&'static str> {
    AREA_CODES
        .iter()
        .find(|(name, _)| *name == area_name.trim())
        .map(|(_, code)| *code)
}

// =============================================================================
// PlaceProvider
// =============================================================================

/// Source of candidate places for a region.
#[async_trait]
pub trait PlaceProvider: Send + Sync {
    /// Attractions in `sigungu_name` within `area_name`. An empty list is a
    /// valid answer, not an error.
    async fn search(&self, area_name: &str, sigungu_name: &str) -> Result<Vec<Place>, TourError>;
}

/// In-memory provider returning a fixed list for every region.
///
/// Used by tests and for running the service without tourism credentials.
#[derive(Debug, Clone, Default)]
pub struct StaticPlaceProvider {
    places: Vec<Place>,
}

impl StaticPlaceProvider {
    pub fn new(places: Vec<Place>) -> Self {
        Self { places }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlaceProvider for StaticPlaceProvider {
    async fn search(&self, _area_name: &str, _sigungu_name: &str) -> Result<Vec<Place>, TourError> {
        Ok(self.places.clone())
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    response: EnvelopeResponse<T>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeResponse<T> {
    body: EnvelopeBody<T>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeBody<T> {
    items: ItemsField<T>,
}

/// The API sends `"items": ""` when a query has no rows, and a bare object
/// instead of a one-element array when it has exactly one.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ItemsField<T> {
    Present { item: OneOrMany<T> },
    Absent(IgnoredAny),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Envelope<T> {
    fn into_items(self) -> Vec<T> {
        match self.response.body.items {
            ItemsField::Present {
                item: OneOrMany::Many(items),
            } => items,
            ItemsField::Present {
                item: OneOrMany::One(item),
            } => vec![item],
            ItemsField::Absent(_) => Vec::new(),
        }
    }
}

/// Accepts a JSON string or number, yielding its string form.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[derive(Debug, Clone, Deserialize)]
struct SigunguItem {
    #[serde(default, deserialize_with = "lenient_string")]
    code: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

/// One row of `areaBasedList2`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TourItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub addr1: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub contentid: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub contenttypeid: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub mapx: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub mapy: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetailItem {
    #[serde(default)]
    overview: Option<String>,
}

// =============================================================================
// Pure helpers
// =============================================================================

/// Keep items whose content type is in `content_types`, mapped to [`Place`].
pub fn filter_attractions(items: Vec<TourItem>, content_types: &[String]) -> Vec<Place> {
    items
        .into_iter()
        .filter(|item| {
            item.contenttypeid
                .as_ref()
                .is_some_and(|t| content_types.iter().any(|c| c == t))
        })
        .map(|item| Place {
            title: item.title.unwrap_or_default(),
            address: item.addr1.unwrap_or_default(),
            content_id: item.contentid.unwrap_or_default(),
            overview: item
                .overview
                .unwrap_or_default()
                .chars()
                .take(OVERVIEW_MAX_CHARS)
                .collect(),
            map_x: item.mapx.unwrap_or_default(),
            map_y: item.mapy.unwrap_or_default(),
        })
        .collect()
}

/// Randomly sample `places` down to `limit` entries. Shorter lists pass
/// through untouched, order preserved.
pub fn sample_places(mut places: Vec<Place>, limit: usize) -> Vec<Place> {
    if places.len() <= limit {
        return places;
    }
    places.shuffle(&mut rand::rng());
    places.truncate(limit);
    places
}

// =============================================================================
// TourApiClient
// =============================================================================

/// HTTP client for the tourism data API.
#[derive(Debug, Clone)]
pub struct TourApiClient {
    client: Client,
    config: TourConfig,
}

impl TourApiClient {
    pub fn new(config: TourConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self, operation: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), operation)
    }

    async fn get_items<T: DeserializeOwned>(
        &self,
        operation: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<T>, TourError> {
        if self.config.service_key.is_empty() {
            return Err(TourError::MissingCredentials("TOUR_API_KEY"));
        }

        let response = self
            .client
            .get(self.endpoint(operation))
            .query(&[
                ("serviceKey", self.config.service_key.as_str()),
                ("MobileOS", "WEB"),
                ("MobileApp", "TourWeb"),
                ("_type", "json"),
            ])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TourError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| TourError::Decode(format!("{} response: {}", operation, e)))?;
        Ok(envelope.into_items())
    }

    /// Resolve a sub-region name to its sigungu code within `area_code`.
    ///
    /// The first entry whose name contains `sigungu_name` wins.
    pub async fn sigungu_code(
        &self,
        area_code: &str,
        sigungu_name: &str,
    ) -> Result<String, TourError> {
        let items: Vec<SigunguItem> = self
            .get_items("areaCode2", &[("numOfRows", "100000"), ("areaCode", area_code)])
            .await?;

        items
            .into_iter()
            .find(|item| {
                item.name
                    .as_deref()
                    .is_some_and(|name| name.contains(sigungu_name))
            })
            .and_then(|item| item.code)
            .ok_or_else(|| TourError::UnknownSigungu {
                area: area_code.to_string(),
                sigungu: sigungu_name.to_string(),
            })
    }

    /// Fetch the full overview text of one attraction.
    pub async fn detail(&self, content_id: &str) -> Result<Option<String>, TourError> {
        let items: Vec<DetailItem> = self
            .get_items("detailCommon2", &[("contentId", content_id)])
            .await?;
        Ok(items.into_iter().next().and_then(|item| item.overview))
    }
}

#[async_trait]
impl PlaceProvider for TourApiClient {
    async fn search(&self, area_name: &str, sigungu_name: &str) -> Result<Vec<Place>, TourError> {
        let area = area_code(area_name).ok_or_else(|| TourError::UnknownArea(area_name.to_string()))?;
        let sigungu = self.sigungu_code(area, sigungu_name).await?;
        debug!(area, sigungu = %sigungu, "Resolved region codes");

        let items: Vec<TourItem> = self
            .get_items(
                "areaBasedList2",
                &[
                    ("numOfRows", "50000"),
                    ("areaCode", area),
                    ("sigunguCode", sigungu.as_str()),
                ],
            )
            .await?;
        let total = items.len();

        let places = sample_places(
            filter_attractions(items, &self.config.content_types),
            self.config.sample_size,
        );
        info!(
            area = %area_name,
            sigungu = %sigungu_name,
            total,
            kept = places.len(),
            "Tourism search complete"
        );
        Ok(places)
    }
}
