mod chain;
mod health;
pub mod models;
mod stats;

use actix_web::web::{self, ServiceConfig};

use crate::error::ApiError;

pub use models::AppState;

pub fn init_routes(cfg: &mut ServiceConfig) {
    // Malformed bodies become a structured 400 instead of actix's plain text.
    let json_config = web::JsonConfig::default()
        .error_handler(|err, _req| ApiError::PayloadInvalid(err.to_string()).into());

    cfg.service(
        web::scope("/api/v1")
            .app_data(json_config)
            .service(health::health_check)
            .service(chain::get_chain)
            .service(chain::write_block)
            .service(chain::validate_chain)
            .service(stats::get_stats),
    );
}
