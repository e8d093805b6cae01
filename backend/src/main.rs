//! Hardware tier entry-point: relay controller, ledger, and pump API.

use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use ortho_config::OrthoConfig;
use tracing::{error, info};

use hydro_backend::domain::{PumpCommandService, PumpQueryService, RelayController};
use hydro_backend::inbound::http::state::HttpState;
use hydro_backend::outbound::hardware;
use hydro_backend::outbound::persistence::{DbPool, DieselPumpRepository, PoolConfig};
use hydro_backend::server::config::{load_pin_map, PumpdSettings};
use hydro_backend::server::{init_tracing, pumpd_routes, run_migrations};

#[cfg(feature = "hardware")]
fn open_bus(
    settings: &PumpdSettings,
) -> Result<Box<dyn hydro_backend::domain::ports::ExpanderBus>, std::io::Error> {
    hardware::Mcp23017Bus::new(settings.i2c_address)
        .map(|bus| Box::new(bus) as Box<dyn hydro_backend::domain::ports::ExpanderBus>)
        .map_err(|err| std::io::Error::other(format!("expander bus init failed: {err}")))
}

#[cfg(not(feature = "hardware"))]
fn open_bus(
    _settings: &PumpdSettings,
) -> Result<Box<dyn hydro_backend::domain::ports::ExpanderBus>, std::io::Error> {
    info!("hardware feature disabled, using simulated expander bus");
    Ok(Box::new(hardware::SimulatedBus::new()))
}

/// Application bootstrap. Relay setup is fail-closed: if the expander cannot
/// be driven to the all-off state, the process exits.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_tracing();

    let settings = PumpdSettings::load().map_err(std::io::Error::other)?;
    let database_url = settings
        .database_url()
        .map_err(std::io::Error::other)?
        .to_owned();

    let map = load_pin_map(&settings.pump_map_path()).map_err(std::io::Error::other)?;
    let bus = open_bus(&settings)?;
    let relay = Arc::new(
        RelayController::new(bus, map.clone())
            .map_err(|err| std::io::Error::other(format!("relay init failed: {err}")))?,
    );
    info!(pumps = map.len(), "relay controller initialised, all pumps off");

    if settings.run_migrations() {
        run_migrations(&database_url).map_err(std::io::Error::other)?;
    }

    let pool = DbPool::new(PoolConfig::new(&database_url))
        .await
        .map_err(std::io::Error::other)?;
    let repo = Arc::new(DieselPumpRepository::new(pool));

    let commands = Arc::new(PumpCommandService::new(Arc::clone(&relay), Arc::clone(&repo)));
    commands
        .sync_config(&map)
        .await
        .map_err(std::io::Error::other)?;
    let queries = Arc::new(PumpQueryService::new(Arc::clone(&repo)));

    let state = web::Data::new(HttpState { commands, queries });

    let bind_addr = settings.bind_addr().to_owned();
    info!(%bind_addr, "starting pump API");
    let result = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(pumpd_routes)
    })
    .bind(bind_addr)?
    .run()
    .await;

    // Leave the rig safe regardless of how the server stopped.
    relay.shutdown().await;
    if let Err(ref err) = result {
        error!(error = %err, "pump API exited with error");
    }
    result
}
