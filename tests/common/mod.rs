//! Scripted backend shared by the integration tests.
//!
//! Answers are queued up front and handed out in order, so sessions and
//! boards can be driven without a server.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use parcel_scan::address::AddressRecord;
use parcel_scan::api::{
    ApiError, DashboardData, DashboardSource, RecognitionBackend, StatusConfirmer,
};
use parcel_scan::camera::EncodedImage;
use parcel_scan::reconcile::DeliveryStatus;

#[derive(Debug, Default)]
struct Script {
    recognitions: VecDeque<Result<AddressRecord, ApiError>>,
    confirmations: VecDeque<Result<(), ApiError>>,
    dashboard: Option<DashboardData>,
    recognize_calls: usize,
    confirmed: Vec<(u64, DeliveryStatus)>,
}

/// A backend that replays queued answers.
///
/// Recognition with an empty queue fails; confirmation with an empty queue
/// succeeds.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    script: Mutex<Script>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recognizes(self, record: AddressRecord) -> Self {
        self.lock().recognitions.push_back(Ok(record));
        self
    }

    pub fn fails_with(self, error: ApiError) -> Self {
        self.lock().recognitions.push_back(Err(error));
        self
    }

    pub fn confirm_fails_with(self, error: ApiError) -> Self {
        self.lock().confirmations.push_back(Err(error));
        self
    }

    pub fn with_dashboard(self, data: DashboardData) -> Self {
        self.lock().dashboard = Some(data);
        self
    }

    /// Number of recognition requests received so far.
    pub fn recognize_calls(&self) -> usize {
        self.lock().recognize_calls
    }

    /// Status changes confirmed so far, in order.
    pub fn confirmed(&self) -> Vec<(u64, DeliveryStatus)> {
        self.lock().confirmed.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        // A poisoned script only happens after a panicking test
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl RecognitionBackend for ScriptedBackend {
    async fn recognize(&self, _image: &EncodedImage) -> Result<AddressRecord, ApiError> {
        let mut script = self.lock();
        script.recognize_calls += 1;
        script
            .recognitions
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::MalformedResponse("no scripted answer".to_string())))
    }
}

impl DashboardSource for ScriptedBackend {
    async fn fetch_dashboard(&self) -> Result<DashboardData, ApiError> {
        Ok(self.lock().dashboard.clone().unwrap_or_default())
    }
}

impl StatusConfirmer for ScriptedBackend {
    async fn confirm_status(&self, parcel_id: u64, status: DeliveryStatus) -> Result<(), ApiError> {
        let mut script = self.lock();
        let result = script.confirmations.pop_front().unwrap_or(Ok(()));
        if result.is_ok() {
            script.confirmed.push((parcel_id, status));
        }
        result
    }
}
