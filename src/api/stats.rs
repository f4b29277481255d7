use actix_web::{HttpResponse, Responder, get, web};

use super::models::{AppState, StatsResponse};

#[get("/stats/")]
pub async fn get_stats(state: web::Data<AppState>) -> impl Responder {
    // One snapshot so height and tail agree
    let chain = state.ledger.snapshot();
    let config = state.ledger.config();

    let (tail_index, tail_hash, tail_timestamp) = match chain.last() {
        Some(tail) => (tail.index, tail.hash.clone(), tail.timestamp.clone()),
        None => (0, String::new(), String::new()),
    };

    HttpResponse::Ok().json(StatsResponse {
        height: chain.len(),
        difficulty: config.difficulty,
        attempt_delay_ms: config.attempt_delay.as_millis(),
        tail_index,
        tail_hash,
        tail_timestamp,
    })
}
