//! Upstream data providers for plogger.
//!
//! - [`tour`]: attraction search against the public tourism API, behind the
//!   [`PlaceProvider`] trait so flows can run against a static list in tests.
//! - [`routing`]: pedestrian turn-by-turn routing.

pub mod error;
pub mod routing;
pub mod tour;

pub use error::TourError;
pub use routing::{PedestrianRouter, RouteQuery};
pub use tour::{area_code, PlaceProvider, StaticPlaceProvider, TourApiClient, AREA_CODES};
