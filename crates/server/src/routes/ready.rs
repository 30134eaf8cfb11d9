//! `GET /ready` — readiness: every configured logical index is open and
//! the indexing background tasks haven't been told to stop. Reported as
//! `{status, checks: {searchEngine, indexerService, indexes}}` (§6).
//! Distinct from `/health`, which only proves the process is alive.

use actix_web::{get, web, HttpResponse};
use indexing_pipeline::is_stopping;

use crate::state::AppState;

#[get("/ready")]
pub async fn ready(state: web::Data<AppState>) -> HttpResponse {
    let open_indexes = state.engine.list_indexes().len();
    let expected = state.indexes.len();
    let indexes_ready = open_indexes == expected;
    let search_engine_ready = true;
    let indexer_service_ready = !is_stopping(&state.stop);

    let ready = indexes_ready && search_engine_ready && indexer_service_ready;
    let body = serde_json::json!({
        "status": if ready { "ready" } else { "not_ready" },
        "checks": {
            "searchEngine": search_engine_ready,
            "indexerService": indexer_service_ready,
            "indexes": indexes_ready,
        },
    });

    if ready {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}
