//! Reconciliation tests: verification, dashboard projection, and optimistic
//! status updates against scripted and mock HTTP backends.

mod common;

use common::ScriptedBackend;
use parcel_scan::address::AddressRecord;
use parcel_scan::api::{ApiClient, ApiError, DashboardData, RecentAddress};
use parcel_scan::reconcile::{
    derive_verification, fetch_and_reconcile, reconcile, ConfirmOutcome, DeliveryStatus,
    ParcelBoard, ReconcileError, ReferenceSource,
};

fn elm_street() -> AddressRecord {
    AddressRecord {
        street: Some("12 Elm St".to_string()),
        city: Some("Springfield".to_string()),
        state: Some("IL".to_string()),
        pincode: Some("62701".to_string()),
        nodal_delivery_center: "North Hub".to_string(),
    }
}

fn feed() -> DashboardData {
    let addresses = (1..=4)
        .map(|id| RecentAddress {
            id: Some(id),
            street: Some(format!("{} Elm St", id)),
            city: Some("Springfield".to_string()),
            state: Some("IL".to_string()),
            pincode: Some("62701".to_string()),
            nodal_delivery_center: Some("North Hub".to_string()),
            created_at: Some("2024-10-15 10:00:00".to_string()),
            google_maps_city: None,
            google_maps_pincode: Some(if id == 2 { "62702" } else { "62701" }.to_string()),
        })
        .collect();
    DashboardData {
        total_addresses: 40,
        total_wrong_pincodes: 1,
        total_voice_addresses: 0,
        recent_addresses: addresses,
    }
}

// === Verification ===

#[test]
fn test_elm_street_verification() {
    let record = elm_street();
    assert!(derive_verification(&record, Some("62701")));
    assert!(!derive_verification(&record, Some("00000")));
}

#[test]
fn test_verification_is_pure() {
    let record = elm_street();
    let first = derive_verification(&record, Some("62701"));
    let second = derive_verification(&record, Some("62701"));
    assert_eq!(first, second);
    assert_eq!(record, elm_street());
}

// === Projection ===

#[test]
fn test_reconcile_projects_feed() {
    let snapshot = reconcile(&feed(), ReferenceSource::GoogleMaps);

    assert_eq!(snapshot.stats.total_parcels, 40);
    assert_eq!(snapshot.stats.in_transit, 8);
    assert_eq!(snapshot.stats.delivered, 32);
    assert_eq!(snapshot.parcels.len(), 4);

    let verified: Vec<bool> = snapshot.parcels.iter().map(|p| p.pincode_verified).collect();
    assert_eq!(verified, vec![true, false, true, true]);

    let first = &snapshot.parcels[0];
    assert_eq!(first.order_number, "#000001");
    assert_eq!(first.route, "Springfield → North");
    assert_eq!(first.estimated_delivery, "Oct 18, 2024");
}

#[test]
fn test_disabled_reference_verifies_nothing() {
    let snapshot = reconcile(&feed(), ReferenceSource::Disabled);
    assert!(snapshot.parcels.iter().all(|p| !p.pincode_verified));
}

// === Board ===

#[tokio::test]
async fn test_update_status_confirmed() {
    let backend = ScriptedBackend::new().with_dashboard(feed());
    let snapshot = fetch_and_reconcile(&backend, ReferenceSource::GoogleMaps)
        .await
        .unwrap();
    let mut board = ParcelBoard::new();
    board.replace(snapshot.parcels);

    let outcome = board
        .update_status(1, DeliveryStatus::Delivered, &backend)
        .await
        .unwrap();

    assert_eq!(outcome, Some(ConfirmOutcome::Kept));
    assert_eq!(board.get(1).unwrap().delivery_status(), DeliveryStatus::Delivered);
    assert_eq!(backend.confirmed(), vec![(1, DeliveryStatus::Delivered)]);
}

#[tokio::test]
async fn test_update_status_rolls_back_to_exact_prior_value() {
    let backend = ScriptedBackend::new()
        .with_dashboard(feed())
        .confirm_fails_with(ApiError::Status(500));
    let snapshot = fetch_and_reconcile(&backend, ReferenceSource::GoogleMaps)
        .await
        .unwrap();
    let mut board = ParcelBoard::new();
    board.replace(snapshot.parcels);

    let before = board.get(2).unwrap().delivery_status();
    let outcome = board
        .update_status(2, DeliveryStatus::Delivered, &backend)
        .await
        .unwrap();

    assert_eq!(outcome, Some(ConfirmOutcome::RolledBack));
    assert_eq!(board.get(2).unwrap().delivery_status(), before);
    assert_eq!(board.last_error(), Some("HTTP error! status: 500"));
    assert!(backend.confirmed().is_empty());
}

#[tokio::test]
async fn test_update_to_current_status_is_noop() {
    let backend = ScriptedBackend::new().with_dashboard(feed());
    let snapshot = fetch_and_reconcile(&backend, ReferenceSource::GoogleMaps)
        .await
        .unwrap();
    let mut board = ParcelBoard::new();
    board.replace(snapshot.parcels);

    let current = board.get(3).unwrap().delivery_status();
    let outcome = board.update_status(3, current, &backend).await.unwrap();

    assert_eq!(outcome, None);
    assert!(backend.confirmed().is_empty());
}

#[tokio::test]
async fn test_update_unknown_parcel() {
    let backend = ScriptedBackend::new();
    let mut board = ParcelBoard::new();

    let err = board
        .update_status(9, DeliveryStatus::Delivered, &backend)
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::UnknownParcel(9)));
}

#[test]
fn test_refresh_replaces_wholesale() {
    let mut board = ParcelBoard::new();
    board.replace(reconcile(&feed(), ReferenceSource::GoogleMaps).parcels);
    let pending = board
        .apply_status_update(1, DeliveryStatus::Delivered)
        .unwrap()
        .unwrap();

    let mut smaller = feed();
    smaller.recent_addresses.truncate(1);
    board.replace(reconcile(&smaller, ReferenceSource::GoogleMaps).parcels);

    assert_eq!(board.len(), 1);
    assert_eq!(board.get(1).unwrap().delivery_status(), DeliveryStatus::InTransit);
    assert_eq!(board.confirm(pending, Ok(())), ConfirmOutcome::Stale);
}

mod mock_http_tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_http_status_update_rollback() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/dashboard_data"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "total_addresses": 1,
                "recent_addresses": [{
                    "id": 42,
                    "street": "12 Elm St",
                    "city": "Springfield",
                    "state": "IL",
                    "pincode": "62701",
                    "nodal_delivery_center": "North Hub",
                    "created_at": "2024-10-15T10:00:00",
                    "google_maps_pincode": "62701"
                }]
            })))
            .mount(&mock_server)
            .await;

        Mock::given(method("PATCH"))
            .and(path("/api/parcels/42/status"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(serde_json::json!({"error": "database unavailable"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = ApiClient::with_base_url(format!("{}/api", mock_server.uri())).unwrap();
        let snapshot = fetch_and_reconcile(&client, ReferenceSource::GoogleMaps)
            .await
            .unwrap();
        assert!(snapshot.parcels[0].pincode_verified);

        let mut board = ParcelBoard::new();
        board.replace(snapshot.parcels);
        let outcome = board
            .update_status(42, DeliveryStatus::Delivered, &client)
            .await
            .unwrap();

        assert_eq!(outcome, Some(ConfirmOutcome::RolledBack));
        assert_eq!(
            board.get(42).unwrap().delivery_status(),
            DeliveryStatus::InTransit
        );
        assert_eq!(board.last_error(), Some("database unavailable"));
    }
}
