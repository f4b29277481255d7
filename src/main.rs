use actix_web::{App, HttpServer, web};
use log::info;
use std::io;

use pow_ledger::api::{self, AppState};
use pow_ledger::{Config, Ledger};

#[actix_web::main]
async fn main() -> io::Result<()> {
    let _ = dotenvy::dotenv();
    env_logger::init();
    let config = Config::from_env();

    let ledger = Ledger::new(config.ledger).map_err(io::Error::other)?;
    info!(
        "⛓️ Starting ledger API at http://{}:{} (difficulty={}, mining delay={:?})",
        config.host, config.port, config.ledger.difficulty, config.ledger.attempt_delay
    );

    let state = web::Data::new(AppState::new(ledger));

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::init_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
