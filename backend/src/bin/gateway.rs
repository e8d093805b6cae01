//! Front tier entry-point: forwards pump commands to the hardware tier.

use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use ortho_config::OrthoConfig;
use tracing::info;

use hydro_backend::inbound::http::state::GatewayState;
use hydro_backend::outbound::upstream::HttpPumpClient;
use hydro_backend::server::config::GatewaySettings;
use hydro_backend::server::{gateway_routes, init_tracing};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_tracing();

    let settings = GatewaySettings::load().map_err(std::io::Error::other)?;
    let upstream = HttpPumpClient::new(settings.upstream_url(), settings.request_timeout())
        .map_err(|err| std::io::Error::other(format!("upstream client init failed: {err}")))?;
    let state = web::Data::new(GatewayState {
        upstream: Arc::new(upstream),
    });

    let bind_addr = settings.bind_addr().to_owned();
    info!(%bind_addr, upstream = settings.upstream_url(), "starting gateway");
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(gateway_routes)
    })
    .bind(bind_addr)?
    .run()
    .await
}
