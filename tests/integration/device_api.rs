use crate::fake_server::{
    FakeDeviceServer,
    device,
    place,
};
use device_console::{
    ApiError,
    DeviceApi,
    DeviceId,
    PlaceId,
};
use rust_decimal::Decimal;
use serde_json::json;
use std::net::TcpListener;

fn unreachable_base_url() -> String {
    let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{address}/api/v1")
}

#[tokio::test]
async fn list_devices__returns_devices_from_server() {
    // given
    let server = FakeDeviceServer::start(vec![
        device("1", "Lobby", vec![place(1, 10_000)]),
        device("2", "Bar", vec![]),
    ]);
    let api = DeviceApi::new(server.base_url()).unwrap();

    // when
    let devices = api.list_devices().await;

    // then
    let names: Vec<_> = devices.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["Lobby", "Bar"]);
    assert_eq!(devices[0].id, DeviceId::new("1"));
}

#[tokio::test]
async fn list_devices__server_error_yields_empty_list() {
    // given
    let server = FakeDeviceServer::start(vec![device("1", "Lobby", vec![])]);
    server.fail_listing();
    let api = DeviceApi::new(server.base_url()).unwrap();

    // when
    let devices = api.list_devices().await;

    // then
    assert!(devices.is_empty());
}

#[tokio::test]
async fn list_devices__unreachable_server_yields_empty_list() {
    let api = DeviceApi::new(unreachable_base_url()).unwrap();
    assert!(api.list_devices().await.is_empty());
}

#[tokio::test]
async fn get_device__returns_places() {
    // given
    let server = FakeDeviceServer::start(vec![device(
        "7",
        "Terrace",
        vec![place(1, 12_345), place(2, 0)],
    )]);
    let api = DeviceApi::new(server.base_url()).unwrap();

    // when
    let device = api.get_device(&DeviceId::new("7")).await.unwrap();

    // then
    assert_eq!(device.name, "Terrace");
    assert_eq!(device.places.len(), 2);
    assert_eq!(device.places[0].balances, Decimal::new(12_345, 2));
    assert_eq!(server.device_requests(), vec!["7".to_string()]);
}

#[tokio::test]
async fn get_device__unknown_device_is_none() {
    let server = FakeDeviceServer::start(vec![]);
    let api = DeviceApi::new(server.base_url()).unwrap();
    assert_eq!(api.get_device(&DeviceId::new("404")).await, None);
}

#[tokio::test]
async fn get_device__empty_id_makes_no_request() {
    // given
    let server = FakeDeviceServer::start(vec![]);
    let api = DeviceApi::new(server.base_url()).unwrap();

    // when
    let device = api.get_device(&DeviceId::new("")).await;

    // then
    assert_eq!(device, None);
    assert!(server.device_requests().is_empty());
}

#[tokio::test]
async fn update_place_balance__sends_signed_delta_and_returns_new_balance() {
    // given
    let server = FakeDeviceServer::start(vec![device("7", "Terrace", vec![place(2, 10_000)])]);
    let api = DeviceApi::new(server.base_url()).unwrap();

    // when
    let update = api
        .update_place_balance(&DeviceId::new("7"), PlaceId(2), Decimal::new(-1_250, 2))
        .await
        .unwrap();

    // then
    assert_eq!(update.place, PlaceId(2));
    assert_eq!(update.balances, Decimal::new(8_750, 2));
    assert_eq!(update.currency, "EUR");
    let updates = server.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].device_id, "7");
    assert_eq!(updates[0].place, 2);
    assert_eq!(updates[0].body, json!({"delta": -12.5}));
}

#[tokio::test]
async fn update_place_balance__surfaces_server_detail() {
    // given
    let server = FakeDeviceServer::start(vec![device("7", "Terrace", vec![place(1, 500)])]);
    server.reject_updates("7", 1, "Insufficient balance");
    let api = DeviceApi::new(server.base_url()).unwrap();

    // when
    let err = api
        .update_place_balance(&DeviceId::new("7"), PlaceId(1), Decimal::new(-10_000, 2))
        .await
        .unwrap_err();

    // then
    assert!(matches!(err, ApiError::Server { .. }));
    assert_eq!(err.detail(), Some("Insufficient balance"));
    assert_eq!(err.user_message(), "Insufficient balance");
    assert_eq!(server.balance("7", 1), Some(Decimal::new(500, 2)));
}

#[tokio::test]
async fn update_place_balance__transport_failure_is_an_error() {
    // given
    let api = DeviceApi::new(unreachable_base_url()).unwrap();

    // when
    let err = api
        .update_place_balance(&DeviceId::new("7"), PlaceId(1), Decimal::ONE)
        .await
        .unwrap_err();

    // then
    assert!(matches!(err, ApiError::Transport { .. }));
    assert_eq!(err.detail(), None);
    assert!(!err.user_message().is_empty());
}

#[tokio::test]
async fn update_place_balance__requires_device_id() {
    let api = DeviceApi::new(unreachable_base_url()).unwrap();
    let err = api
        .update_place_balance(&DeviceId::new(" "), PlaceId(1), Decimal::ONE)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::MissingDeviceId));
}

#[tokio::test]
async fn update_place_balance__rejects_place_zero_without_request() {
    // given
    let server = FakeDeviceServer::start(vec![device("7", "Terrace", vec![place(1, 500)])]);
    let api = DeviceApi::new(server.base_url()).unwrap();

    // when
    let err = api
        .update_place_balance(&DeviceId::new("7"), PlaceId(0), Decimal::ONE)
        .await
        .unwrap_err();

    // then
    assert!(matches!(err, ApiError::MissingPlaceId));
    assert!(server.updates().is_empty());
}
