//! Test helpers: an in-memory backend and wiring for the client state

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use coordii_client::app_state::AppState;
use coordii_client::config::ClientConfig;
use coordii_client::models::job::{JobId, JobKind, JobOutput, JobRequest, OwnerKey, StatusReport};
use coordii_client::models::wardrobe::{
    Garment, GarmentDraft, Outfit, UploadTarget, UserProfile, WeatherSnapshot,
};
use coordii_client::services::api::{ApiError, JobBackend, RemoteClient};
use coordii_client::services::clock::FixedClock;
use coordii_client::services::events::{EventBus, EventName, Subscription};
use coordii_client::services::poller::JobCallbacks;
use coordii_client::services::store::MemoryStore;

use crate::fixtures;

#[derive(Default)]
struct BackendState {
    garments: Vec<Garment>,
    next_cloth_id: i64,
    history: Vec<Outfit>,
    profile: UserProfile,
    statuses: HashMap<JobKind, VecDeque<StatusReport>>,
    failing: HashSet<&'static str>,
    calls: HashMap<&'static str, u32>,
}

/// Scriptable stand-in for the Coordii backend.
///
/// Every call is counted by name; calls named in `fail` return a 500.
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<BackendState>,
}

impl FakeBackend {
    pub fn new() -> Self {
        let backend = Self::default();
        {
            let mut state = backend.state.lock().unwrap();
            state.garments = fixtures::starter_closet();
            state.next_cloth_id = 100;
            state.history = vec![fixtures::outfit("20261018090000")];
            state.profile = fixtures::profile(Some(fixtures::HAKATA), false);
        }
        backend
    }

    pub fn calls(&self, name: &str) -> u32 {
        self.state.lock().unwrap().calls.get(name).copied().unwrap_or(0)
    }

    pub fn fail(&self, name: &'static str) {
        self.state.lock().unwrap().failing.insert(name);
    }

    pub fn recover(&self, name: &'static str) {
        self.state.lock().unwrap().failing.remove(name);
    }

    pub fn set_profile(&self, profile: UserProfile) {
        self.state.lock().unwrap().profile = profile;
    }

    pub fn push_history(&self, outfit: Outfit) {
        self.state.lock().unwrap().history.insert(0, outfit);
    }

    /// Queue status responses for `kind`; once drained, jobs report Processing.
    pub fn script(&self, kind: JobKind, reports: Vec<StatusReport>) {
        self.state.lock().unwrap().statuses.entry(kind).or_default().extend(reports);
    }

    fn enter(&self, name: &'static str) -> Result<std::sync::MutexGuard<'_, BackendState>, ApiError> {
        let mut state = self.state.lock().unwrap();
        *state.calls.entry(name).or_default() += 1;
        if state.failing.contains(name) {
            return Err(ApiError::Status {
                status: 500,
                message: format!("{name} unavailable"),
            });
        }
        Ok(state)
    }
}

#[async_trait]
impl RemoteClient for FakeBackend {
    async fn get_user(&self, _owner: &OwnerKey) -> Result<UserProfile, ApiError> {
        Ok(self.enter("get_user")?.profile.clone())
    }

    async fn save_profile(&self, profile: &UserProfile) -> Result<(), ApiError> {
        self.enter("save_profile")?.profile = profile.clone();
        Ok(())
    }

    async fn get_weather(&self, _owner: &OwnerKey, city: &str) -> Result<WeatherSnapshot, ApiError> {
        self.enter("get_weather")?;
        Ok(fixtures::weather_for(city))
    }

    async fn list_garments(&self, _owner: &OwnerKey, category: Option<&str>) -> Result<Vec<Garment>, ApiError> {
        let state = self.enter("list_garments")?;
        Ok(state
            .garments
            .iter()
            .filter(|g| category.map_or(true, |c| g.category == c))
            .cloned()
            .collect())
    }

    async fn register_garment(
        &self,
        _owner: &OwnerKey,
        image_url: &str,
        draft: &GarmentDraft,
    ) -> Result<Garment, ApiError> {
        let mut state = self.enter("register_garment")?;
        state.next_cloth_id += 1;
        let garment = Garment {
            cloth_id: state.next_cloth_id,
            category: draft.category.clone(),
            image_url: image_url.to_string(),
            brand: draft.brand.clone(),
            color: draft.color.clone(),
            description: draft.description.clone(),
        };
        state.garments.push(garment.clone());
        Ok(garment)
    }

    async fn update_garment(&self, _owner: &OwnerKey, cloth_id: i64, draft: &GarmentDraft) -> Result<(), ApiError> {
        let mut state = self.enter("update_garment")?;
        if let Some(garment) = state.garments.iter_mut().find(|g| g.cloth_id == cloth_id) {
            garment.category = draft.category.clone();
            garment.brand = draft.brand.clone();
            garment.color = draft.color.clone();
        }
        Ok(())
    }

    async fn delete_garment(&self, _owner: &OwnerKey, cloth_id: i64) -> Result<(), ApiError> {
        self.enter("delete_garment")?.garments.retain(|g| g.cloth_id != cloth_id);
        Ok(())
    }

    async fn request_upload_url(&self, file_type: &str) -> Result<UploadTarget, ApiError> {
        self.enter("request_upload_url")?;
        Ok(UploadTarget {
            upload_url: format!("https://upload.example.test/put?type={file_type}"),
            image_url: "s3://coordii/clothes/new.jpg".to_string(),
            download_url: Some("https://cdn.example.test/clothes/new.jpg".to_string()),
        })
    }

    async fn upload_image(&self, _target: &UploadTarget, bytes: Vec<u8>) -> Result<(), ApiError> {
        self.enter("upload_image")?;
        image::guess_format(&bytes).map_err(|_| ApiError::UnsupportedImage)?;
        Ok(())
    }

    async fn analyze_garment(&self, _owner: &OwnerKey, _image_url: &str) -> Result<GarmentDraft, ApiError> {
        self.enter("analyze_garment")?;
        Ok(fixtures::draft("アウター"))
    }

    async fn list_history(&self, _owner: &OwnerKey) -> Result<Vec<Outfit>, ApiError> {
        let history = self.enter("list_history")?.history.clone();
        // Let concurrent callers interleave with the round-trip.
        tokio::task::yield_now().await;
        Ok(history)
    }
}

#[async_trait]
impl JobBackend for FakeBackend {
    async fn begin(&self, _owner: &OwnerKey, request: &JobRequest) -> Result<JobId, ApiError> {
        self.enter("begin")?;
        Ok(match request {
            JobRequest::Outfit { .. } => JobId("20261019120000".to_string()),
            JobRequest::TryOn { coordinate_id } => JobId(coordinate_id.clone()),
        })
    }

    async fn status(&self, _owner: &OwnerKey, kind: JobKind, _job_id: &JobId) -> Result<StatusReport, ApiError> {
        let mut state = self.enter("status")?;
        Ok(state
            .statuses
            .get_mut(&kind)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(StatusReport::processing))
    }
}

/// Client state wired to a fake backend, an in-memory store and a fixed clock.
pub struct TestApp {
    pub state: AppState,
    pub backend: Arc<FakeBackend>,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<FixedClock>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::at_hour(14)
    }

    pub fn at_hour(hour: u32) -> Self {
        let backend = Arc::new(FakeBackend::new());
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::at(hour));
        let state = AppState::new(
            ClientConfig::with_base_url("http://backend.test"),
            store.clone(),
            backend.clone(),
            backend.clone(),
            clock.clone(),
        )
        .unwrap();
        Self { state, backend, store, clock }
    }

    pub fn bus(&self) -> &EventBus {
        &self.state.events
    }
}

/// Count deliveries of `name` for as long as the subscription lives.
pub fn count_events(bus: &EventBus, name: EventName) -> (Subscription, Arc<AtomicU32>) {
    let count = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&count);
    let subscription = bus.subscribe(name, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    (subscription, count)
}

/// Callbacks reporting the terminal outcome through a oneshot channel.
pub fn outcome_channel() -> (JobCallbacks, oneshot::Receiver<Result<JobOutput, String>>) {
    let (tx, rx) = oneshot::channel();
    let tx = Arc::new(Mutex::new(Some(tx)));
    let failed_tx = Arc::clone(&tx);
    let callbacks = JobCallbacks::new(
        move |output| {
            if let Some(tx) = tx.lock().unwrap().take() {
                let _ = tx.send(Ok(output));
            }
        },
        move |reason| {
            if let Some(tx) = failed_tx.lock().unwrap().take() {
                let _ = tx.send(Err(reason));
            }
        },
    );
    (callbacks, rx)
}
