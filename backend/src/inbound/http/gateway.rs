//! Front tier HTTP handlers.
//!
//! The gateway validates pump names before spending a downstream call,
//! relays the hardware tier's domain errors verbatim, and reports transport
//! failures as 503 without inventing pump state.

use actix_web::{get, post, web, HttpResponse};
use serde::Serialize;
use serde_json::json;
use tracing::warn;

use crate::domain::ports::UpstreamForwardError;
use crate::domain::{Error, PumpAction};

use super::error::ApiResult;
use super::pumps::PumpStateBody;
use super::state::GatewayState;
use super::validation::parse_pump_name;

/// Combined health payload: the gateway's own liveness plus whatever the
/// hardware tier reported.
#[derive(Debug, Serialize)]
pub struct CombinedHealthBody {
    #[serde(rename = "self")]
    pub own: serde_json::Value,
    pub downstream: serde_json::Value,
}

fn map_forward_error(name: &str, err: UpstreamForwardError) -> Error {
    match err {
        UpstreamForwardError::Downstream(error) => error,
        UpstreamForwardError::Transport(transport) => {
            warn!(pump = name, error = %transport, "forwarding failed");
            Error::service_unavailable(format!(
                "pump service unavailable for '{name}': {transport}"
            ))
        }
    }
}

async fn forward(
    state: &GatewayState,
    raw_name: &str,
    action: PumpAction,
) -> ApiResult<web::Json<PumpStateBody>> {
    let name = parse_pump_name(raw_name)?;
    let change = state
        .upstream
        .set_state(&name, action)
        .await
        .map_err(|err| map_forward_error(name.as_str(), err))?;
    Ok(web::Json(change.into()))
}

/// Forward a turn-on command to the hardware tier.
#[post("/pump/{name}/on")]
pub async fn pump_on(
    state: web::Data<GatewayState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<PumpStateBody>> {
    forward(&state, &path, PumpAction::On).await
}

/// Forward a turn-off command to the hardware tier.
#[post("/pump/{name}/off")]
pub async fn pump_off(
    state: web::Data<GatewayState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<PumpStateBody>> {
    forward(&state, &path, PumpAction::Off).await
}

/// Combined health: always 200, embedding the downstream outcome.
///
/// A dead hardware tier must not make the gateway look dead, so the
/// downstream failure is folded into the body instead of the status code.
#[get("/health-check")]
pub async fn health_check(state: web::Data<GatewayState>) -> HttpResponse {
    let downstream = match state.upstream.health().await {
        Ok(body) => body,
        Err(err) => {
            warn!(error = %err, "downstream health probe failed");
            json!({ "status": "error", "message": err.to_string() })
        }
    };
    HttpResponse::Ok().json(CombinedHealthBody {
        own: json!({ "status": "ok" }),
        downstream,
    })
}

#[cfg(test)]
mod tests {
    //! Forwarding semantics over a mocked upstream port.

    use std::sync::Arc;

    use actix_web::{http::StatusCode, test, App};
    use rstest::rstest;

    use crate::domain::ports::{MockUpstreamPumpService, PumpStateChange, UpstreamError};
    use crate::domain::PumpName;

    use super::*;

    fn state(upstream: MockUpstreamPumpService) -> web::Data<GatewayState> {
        web::Data::new(GatewayState {
            upstream: Arc::new(upstream),
        })
    }

    async fn call(
        state: web::Data<GatewayState>,
        request: test::TestRequest,
    ) -> actix_web::dev::ServiceResponse {
        let app = test::init_service(
            App::new()
                .app_data(state)
                .service(pump_on)
                .service(pump_off)
                .service(health_check),
        )
        .await;
        test::call_service(&app, request.to_request()).await
    }

    #[rstest]
    #[actix_rt::test]
    async fn successful_commands_relay_the_downstream_body() {
        let mut upstream = MockUpstreamPumpService::new();
        upstream
            .expect_set_state()
            .withf(|name: &PumpName, action| {
                name.as_str() == "ph_up" && *action == PumpAction::On
            })
            .returning(|name, action| {
                Ok(PumpStateChange {
                    pump: name.clone(),
                    state: action,
                })
            });

        let response = call(
            state(upstream),
            test::TestRequest::post().uri("/pump/ph_up/on"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: PumpStateBody = test::read_body_json(response).await;
        assert_eq!(body.pump, "ph_up");
        assert_eq!(body.state, PumpAction::On);
    }

    #[rstest]
    #[actix_rt::test]
    async fn downstream_domain_errors_are_relayed_verbatim() {
        let mut upstream = MockUpstreamPumpService::new();
        upstream.expect_set_state().returning(|_, _| {
            Err(UpstreamForwardError::Downstream(Error::not_found(
                "pump 'mystery' not found",
            )))
        });

        let response = call(
            state(upstream),
            test::TestRequest::post().uri("/pump/mystery/off"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = test::read_body_json(response).await;
        assert_eq!(body["code"], "not_found");
        assert_eq!(body["message"], "pump 'mystery' not found");
    }

    #[rstest]
    #[actix_rt::test]
    async fn transport_failures_become_503_naming_the_pump() {
        let mut upstream = MockUpstreamPumpService::new();
        upstream.expect_set_state().returning(|_, _| {
            Err(UpstreamForwardError::Transport(
                UpstreamError::transport("connection refused"),
            ))
        });

        let response = call(
            state(upstream),
            test::TestRequest::post().uri("/pump/flush_1/on"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body: serde_json::Value = test::read_body_json(response).await;
        assert_eq!(body["code"], "service_unavailable");
        let message = body["message"].as_str().unwrap_or("");
        assert!(message.contains("flush_1"));
        assert!(message.contains("connection refused"));
    }

    #[rstest]
    #[actix_rt::test]
    async fn invalid_names_are_rejected_without_a_downstream_call() {
        let mut upstream = MockUpstreamPumpService::new();
        upstream.expect_set_state().times(0);

        let response = call(
            state(upstream),
            test::TestRequest::post().uri("/pump/no%20spaces/on"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[rstest]
    #[actix_rt::test]
    async fn combined_health_embeds_a_healthy_downstream() {
        let mut upstream = MockUpstreamPumpService::new();
        upstream
            .expect_health()
            .returning(|| Ok(json!({ "status": "ok" })));

        let response = call(state(upstream), test::TestRequest::get().uri("/health-check")).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(response).await;
        assert_eq!(body["self"]["status"], "ok");
        assert_eq!(body["downstream"]["status"], "ok");
    }

    #[rstest]
    #[actix_rt::test]
    async fn combined_health_stays_200_when_downstream_is_dead() {
        let mut upstream = MockUpstreamPumpService::new();
        upstream
            .expect_health()
            .returning(|| Err(UpstreamError::transport("connection refused")));

        let response = call(state(upstream), test::TestRequest::get().uri("/health-check")).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(response).await;
        assert_eq!(body["self"]["status"], "ok");
        assert_eq!(body["downstream"]["status"], "error");
        assert!(
            body["downstream"]["message"]
                .as_str()
                .unwrap_or("")
                .contains("connection refused")
        );
    }
}
