use config::Config;
use index::ProximityIndex;
use std::sync::Arc;

pub mod cache;
pub mod config;
pub mod error;
pub mod geo;
pub mod index;
pub mod middleware;
pub mod models;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub index: Arc<ProximityIndex>,
}
