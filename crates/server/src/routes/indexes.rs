//! The Atlas-dialect HTTP surface of §6: listing indexes, inspecting a
//! single index's sync status and mapping, and running a search against
//! it.

use actix_web::{get, post, web, HttpResponse};
use search_types::{Error as SearchError, SearchRequest, SyncStatus};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IndexListBody {
    indexes: Vec<search_engine::IndexStatus>,
    total: usize,
}

#[get("/indexes")]
pub async fn list_indexes(state: web::Data<AppState>) -> HttpResponse {
    let indexes = state.engine.list_indexes();
    let total = indexes.len();
    HttpResponse::Ok().json(IndexListBody { indexes, total })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IndexStatusBody {
    name: String,
    doc_count: u64,
    sync_status: Option<SyncStatus>,
    progress: Option<String>,
    documents_indexed: Option<u64>,
    total_documents: Option<u64>,
}

#[get("/indexes/{index}/status")]
pub async fn index_status(state: web::Data<AppState>, path: web::Path<String>) -> ApiResult<HttpResponse> {
    let index_name = path.into_inner();
    let cfg = state
        .indexes
        .get(&index_name)
        .ok_or_else(|| ApiError::from(SearchError::IndexNotFound(index_name.clone())))?;

    let doc_count = state.engine.doc_count(&index_name).unwrap_or(0);

    let sync = state.sync_state.get(&cfg.source_collection.key());

    Ok(HttpResponse::Ok().json(IndexStatusBody {
        name: index_name,
        doc_count,
        sync_status: sync.as_ref().map(|s| s.sync_status),
        progress: sync.as_ref().map(|s| s.progress.clone()),
        documents_indexed: sync.as_ref().map(|s| s.documents_indexed),
        total_documents: sync.as_ref().and_then(|s| s.total_documents),
    }))
}

#[get("/indexes/{index}/mapping")]
pub async fn index_mapping(state: web::Data<AppState>, path: web::Path<String>) -> ApiResult<HttpResponse> {
    let index_name = path.into_inner();
    let cfg = state
        .indexes
        .get(&index_name)
        .ok_or_else(|| ApiError::from(SearchError::IndexNotFound(index_name.clone())))?;
    Ok(HttpResponse::Ok().json(&cfg.mappings))
}

#[post("/indexes/{index}/search")]
pub async fn search(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<SearchRequest>,
) -> ApiResult<HttpResponse> {
    let index_name = path.into_inner();
    let mut request = body.into_inner();
    request.index = index_name;

    if !state.indexes.contains_key(&request.index) {
        return Err(ApiError::from(SearchError::IndexNotFound(request.index.clone())));
    }
    request.validate()?;

    let result = state.router.search(&request).map_err(search_types::Error::from)?;
    Ok(HttpResponse::Ok().json(result))
}
