use std::sync::Arc;

use axum::routing::{get, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use super::{health, kapacitors, proxy, rules};
use crate::kapacitor::EngineConnector;
use crate::store::{InstanceStore, SourceRegistry};
use crate::API_PREFIX;

#[derive(Clone)]
pub struct AppState {
    pub sources: Arc<dyn SourceRegistry>,
    pub kapacitors: Arc<dyn InstanceStore>,
    pub engines: Arc<dyn EngineConnector>,
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/sources/{id}/kapacitors",
            get(kapacitors::list_kapacitors).post(kapacitors::create_kapacitor),
        )
        .route(
            "/sources/{id}/kapacitors/{kid}",
            get(kapacitors::get_kapacitor)
                .patch(kapacitors::update_kapacitor)
                .delete(kapacitors::delete_kapacitor),
        )
        .route(
            "/sources/{id}/kapacitors/{kid}/rules",
            get(rules::list_rules).post(rules::create_rule),
        )
        .route(
            "/sources/{id}/kapacitors/{kid}/rules/{tid}",
            get(rules::get_rule)
                .put(rules::replace_rule)
                .delete(rules::delete_rule),
        )
        .route(
            "/sources/{id}/kapacitors/{kid}/rules/{tid}/status",
            put(rules::set_rule_status),
        )
        .route(
            "/sources/{id}/kapacitors/{kid}/proxy",
            get(proxy::proxy)
                .post(proxy::proxy)
                .patch(proxy::proxy)
                .delete(proxy::proxy),
        );

    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/ready", get(health::ready))
        .nest(API_PREFIX, api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
