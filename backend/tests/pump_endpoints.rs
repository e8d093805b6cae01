//! End-to-end coverage of the hardware tier's HTTP surface.
//!
//! Runs the real command and query services over a simulated expander bus
//! and the in-memory ledger, through the same route table `pumpd` serves.

use std::sync::Arc;

use actix_web::dev::{Service, ServiceResponse};
use actix_web::{http::StatusCode, test, web, App};
use rstest::rstest;

use hydro_backend::domain::ports::{InMemoryPumpRepository, PinLevel};
use hydro_backend::domain::{
    PinMap, PumpCommandService, PumpQueryService, RelayController,
};
use hydro_backend::inbound::http::state::HttpState;
use hydro_backend::outbound::hardware::{SimulatedBus, SimulatedBusHandle};
use hydro_backend::server::pumpd_routes;

const PH_UP_PIN: u8 = 0;
const FLUSH_PIN: u8 = 6;

struct Rig {
    state: web::Data<HttpState>,
    bus: SimulatedBusHandle,
}

async fn rig() -> Rig {
    let map = PinMap::new([
        ("ph_up".to_owned(), u16::from(PH_UP_PIN)),
        ("flush_1".to_owned(), u16::from(FLUSH_PIN)),
    ])
    .expect("valid map");

    let bus = SimulatedBus::new();
    let handle = bus.handle();
    let relay = Arc::new(RelayController::new(Box::new(bus), map.clone()).expect("relay init"));

    let repo = Arc::new(InMemoryPumpRepository::new());
    let commands = Arc::new(PumpCommandService::new(relay, Arc::clone(&repo)));
    commands.sync_config(&map).await.expect("sync config");
    let queries = Arc::new(PumpQueryService::new(repo));

    Rig {
        state: web::Data::new(HttpState { commands, queries }),
        bus: handle,
    }
}

async fn call(rig: &Rig, request: test::TestRequest) -> ServiceResponse {
    let app = test::init_service(
        App::new()
            .app_data(rig.state.clone())
            .configure(pumpd_routes),
    )
    .await;
    app.call(request.to_request()).await.expect("service call")
}

async fn post(rig: &Rig, uri: &str) -> ServiceResponse {
    call(rig, test::TestRequest::post().uri(uri)).await
}

async fn get(rig: &Rig, uri: &str) -> ServiceResponse {
    call(rig, test::TestRequest::get().uri(uri)).await
}

#[rstest]
#[actix_rt::test]
async fn health_reports_ok() {
    let rig = rig().await;
    let response = get(&rig, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[rstest]
#[actix_rt::test]
async fn initialization_drives_every_mapped_pin_high() {
    let rig = rig().await;
    assert_eq!(rig.bus.level(PH_UP_PIN), Some(PinLevel::High));
    assert_eq!(rig.bus.level(FLUSH_PIN), Some(PinLevel::High));
    assert!(rig.bus.is_output(PH_UP_PIN));
    assert!(rig.bus.is_output(FLUSH_PIN));
}

#[rstest]
#[actix_rt::test]
async fn turning_a_pump_on_drives_its_pin_low_and_reports_the_state() {
    let rig = rig().await;

    let response = post(&rig, "/pump/ph_up/on").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(response).await;
    assert_eq!(body["pump"], "ph_up");
    assert_eq!(body["state"], "on");
    assert_eq!(rig.bus.level(PH_UP_PIN), Some(PinLevel::Low));
    // The other pump is untouched.
    assert_eq!(rig.bus.level(FLUSH_PIN), Some(PinLevel::High));
}

#[rstest]
#[actix_rt::test]
async fn duplicate_on_commands_do_not_touch_the_bus_again() {
    let rig = rig().await;

    assert_eq!(post(&rig, "/pump/ph_up/on").await.status(), StatusCode::OK);
    let writes_after_first = rig.bus.write_count();

    let response = post(&rig, "/pump/ph_up/on").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(response).await;
    assert_eq!(body["state"], "on");
    assert_eq!(rig.bus.write_count(), writes_after_first);
}

#[rstest]
#[actix_rt::test]
async fn a_full_cycle_records_a_duration() {
    let rig = rig().await;

    assert_eq!(post(&rig, "/pump/flush_1/on").await.status(), StatusCode::OK);
    assert_eq!(post(&rig, "/pump/flush_1/off").await.status(), StatusCode::OK);
    assert_eq!(rig.bus.level(FLUSH_PIN), Some(PinLevel::High));

    let response = get(&rig, "/activities").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(response).await;
    let newest = &body[0];
    assert_eq!(newest["action"], "off");
    assert!(
        newest["duration"].as_f64().is_some_and(|d| d >= 0.0),
        "off entry should carry a duration, got {newest}"
    );
}

#[rstest]
#[actix_rt::test]
async fn turning_off_an_idle_pump_is_safe_and_records_no_duration() {
    let rig = rig().await;

    let response = post(&rig, "/pump/ph_up/off").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&rig, "/activities").await;
    let body: serde_json::Value = test::read_body_json(response).await;
    let newest = &body[0];
    assert_eq!(newest["action"], "off");
    assert!(newest["duration"].is_null());
}

#[rstest]
#[actix_rt::test]
async fn unknown_pumps_are_rejected_with_the_error_envelope() {
    let rig = rig().await;
    let writes_before = rig.bus.write_count();

    let response = post(&rig, "/pump/mystery/on").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = test::read_body_json(response).await;
    assert_eq!(body["code"], "not_found");
    assert_eq!(rig.bus.write_count(), writes_before);
}

#[rstest]
#[actix_rt::test]
async fn pump_listing_reflects_the_synced_configuration() {
    let rig = rig().await;

    let response = get(&rig, "/pumps").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(response).await;
    let pumps = body.as_array().expect("array body");
    assert_eq!(pumps.len(), 2);

    let flush = pumps
        .iter()
        .find(|pump| pump["name"] == "flush_1")
        .expect("flush_1 present");
    assert_eq!(flush["type"], "high_volume");
    assert_eq!(flush["pin"], i64::from(FLUSH_PIN));
    assert_eq!(flush["is_active"], false);
}

#[rstest]
#[actix_rt::test]
async fn activity_listing_filters_by_pump() {
    let rig = rig().await;

    assert_eq!(post(&rig, "/pump/ph_up/on").await.status(), StatusCode::OK);
    assert_eq!(post(&rig, "/pump/flush_1/on").await.status(), StatusCode::OK);

    let response = get(&rig, "/pumps").await;
    let pumps: serde_json::Value = test::read_body_json(response).await;
    let ph_up_id = pumps
        .as_array()
        .expect("array body")
        .iter()
        .find(|pump| pump["name"] == "ph_up")
        .and_then(|pump| pump["id"].as_i64())
        .expect("ph_up id");

    let response = get(&rig, &format!("/activities?pump_id={ph_up_id}")).await;
    let body: serde_json::Value = test::read_body_json(response).await;
    let activities = body.as_array().expect("array body");
    assert_eq!(activities.len(), 1);
    assert_eq!(activities[0]["pump_id"].as_i64(), Some(ph_up_id));
}

#[rstest]
#[actix_rt::test]
async fn pagination_limits_the_activity_listing() {
    let rig = rig().await;

    for _ in 0..3 {
        assert_eq!(post(&rig, "/pump/ph_up/on").await.status(), StatusCode::OK);
        assert_eq!(post(&rig, "/pump/ph_up/off").await.status(), StatusCode::OK);
    }

    let response = get(&rig, "/activities?limit=2").await;
    let body: serde_json::Value = test::read_body_json(response).await;
    assert_eq!(body.as_array().expect("array body").len(), 2);

    let response = get(&rig, "/activities?skip=-1").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[rstest]
#[actix_rt::test]
async fn persistent_hardware_faults_surface_as_500() {
    let rig = rig().await;
    // First attempt and the single retry both fail.
    rig.bus.fail_next_writes(PH_UP_PIN, 2);

    let response = post(&rig, "/pump/ph_up/on").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = test::read_body_json(response).await;
    assert_eq!(body["code"], "hardware_fault");
}

#[rstest]
#[actix_rt::test]
async fn transient_hardware_faults_are_retried() {
    let rig = rig().await;
    rig.bus.fail_next_writes(PH_UP_PIN, 1);

    let response = post(&rig, "/pump/ph_up/on").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(rig.bus.level(PH_UP_PIN), Some(PinLevel::Low));
}
