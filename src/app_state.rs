use std::sync::Arc;

use crate::config::ClientConfig;
use crate::controllers::closet::Closet;
use crate::controllers::home::HomeFeed;
use crate::controllers::outfits::Outfits;
use crate::controllers::profile::Profile;
use crate::controllers::FlowError;
use crate::models::job::OwnerKey;
use crate::services::api::{ApiError, HttpApiClient, JobBackend, RemoteClient};
use crate::services::cache::CacheStore;
use crate::services::clock::{Clock, SystemClock};
use crate::services::events::{EventBus, EventSink};
use crate::services::guides::GuideSequencer;
use crate::services::identity;
use crate::services::poller::JobRunner;
use crate::services::store::{FileStore, FlagStore, KeyValueStore, StoreError};

/// Shared client state handed to every screen.
#[derive(Clone)]
pub struct AppState {
    pub owner: OwnerKey,
    pub store: Arc<dyn KeyValueStore>,
    pub cache: CacheStore,
    pub events: EventBus,
    pub guides: GuideSequencer,
    pub remote: Arc<dyn RemoteClient>,
    pub jobs: JobRunner,
    pub clock: Arc<dyn Clock>,
    pub config: ClientConfig,
}

impl AppState {
    pub fn new(
        config: ClientConfig,
        store: Arc<dyn KeyValueStore>,
        remote: Arc<dyn RemoteClient>,
        backend: Arc<dyn JobBackend>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StoreError> {
        let owner = identity::load_or_create(store.as_ref())?;

        Ok(Self {
            owner,
            cache: CacheStore::new(Arc::clone(&store)),
            guides: GuideSequencer::new(FlagStore::new(Arc::clone(&store))),
            events: EventBus::new(),
            jobs: JobRunner::new(backend, config.job_settings()),
            store,
            remote,
            clock,
            config,
        })
    }

    /// Production wiring: file-backed store, HTTP backend, system clock.
    pub fn from_config(config: &ClientConfig) -> Result<Self, InitError> {
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&config.store_path)?);
        let client = Arc::new(HttpApiClient::new(&config.api_base_url, config.http_timeout())?);

        tracing::info!(
            api_base_url = %config.api_base_url,
            store_path = %config.store_path.display(),
            "Client state initialised"
        );

        Ok(Self::new(
            config.clone(),
            store,
            Arc::clone(&client) as Arc<dyn RemoteClient>,
            client,
            Arc::new(SystemClock),
        )?)
    }

    fn sink(&self) -> Arc<dyn EventSink> {
        Arc::new(self.events.clone())
    }

    pub fn closet(&self) -> Closet {
        Closet::new(
            Arc::clone(&self.remote),
            self.cache.clone(),
            self.sink(),
            self.guides.clone(),
            self.owner.clone(),
        )
    }

    pub fn home_feed(&self) -> HomeFeed {
        HomeFeed::new(
            Arc::clone(&self.remote),
            self.cache.clone(),
            Arc::clone(&self.clock),
            self.owner.clone(),
            self.config.evening_cutoff_hour,
        )
    }

    pub fn profile(&self) -> Profile {
        Profile::new(Arc::clone(&self.remote), self.cache.clone(), self.sink(), self.owner.clone())
    }

    /// Clear all local state and give up this instance.
    ///
    /// The owner key, guide requests and mounted views all belong to the
    /// discarded install; rebuild with [`AppState::new`] or
    /// [`AppState::from_config`] afterwards.
    pub fn reset_all(self) -> Result<(), FlowError> {
        self.profile().reset_all()
    }

    pub fn outfits(&self) -> Outfits {
        Outfits::new(Arc::clone(&self.remote), self.jobs.clone(), self.sink(), self.owner.clone())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("Local store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("HTTP client setup failed: {0}")]
    Api(#[from] ApiError),
}
