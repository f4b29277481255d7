use actix_web::{HttpResponse, Responder, get, post, web};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use super::models::{AppState, ChainResponse, ValidateResponse, WriteRequest};
use crate::blockchain::CancelToken;
use crate::error::ApiError;

/// Get the full chain.
#[get("/chain/")]
pub async fn get_chain(state: web::Data<AppState>) -> impl Responder {
    let chain = state.ledger.snapshot();
    HttpResponse::Ok().json(ChainResponse {
        length: chain.len(),
        difficulty: state.ledger.difficulty(),
        chain: &chain,
    })
}

/// Append a block carrying the request's payload.
///
/// Mining runs on the blocking pool. If the client disconnects, actix drops
/// this future, the guard fires and the search stops.
#[post("/chain/")]
pub async fn write_block(
    state: web::Data<AppState>,
    body: web::Json<WriteRequest>,
) -> Result<HttpResponse, ApiError> {
    let request_id = Uuid::new_v4();
    let payload = body.into_inner().payload;
    let t0 = Instant::now();
    debug!(
        "POST /chain/ [{}] - received payload ({} bytes)",
        request_id,
        payload.len()
    );

    let cancel = CancelToken::new();
    let _guard = cancel.drop_guard();
    let ledger = Arc::clone(&state.ledger);
    let appended = web::block(move || ledger.append_cancellable(payload, &cancel)).await?;

    let block = appended.map_err(|e| {
        let err = ApiError::from(e);
        match &err {
            ApiError::ValidationFailed(v) => {
                error!("POST /chain/ [{}] - invariant violation: {}", request_id, v);
            }
            other => {
                warn!("POST /chain/ [{}] - rejected: {:?}", request_id, other);
            }
        }
        err
    })?;

    info!(
        "POST /chain/ [{}] - block #{} hash={} OK ({} ms)",
        request_id,
        block.index,
        block.hash,
        t0.elapsed().as_millis()
    );
    Ok(HttpResponse::Ok().json(block))
}

/// Validate the whole chain.
#[get("/validate/")]
pub async fn validate_chain(state: web::Data<AppState>) -> impl Responder {
    let audit = state.ledger.audit();
    if let Err(e) = &audit {
        warn!("GET /validate/ - chain failed audit: {}", e);
    }
    HttpResponse::Ok().json(ValidateResponse {
        valid: audit.is_ok(),
        length: state.ledger.len(),
        difficulty: state.ledger.difficulty(),
        error: audit.err().map(|e| e.to_string()),
    })
}
