//! Screen-level readers.
//!
//! Each view owns its subscriptions for as long as it is mounted. An
//! invalidation event only marks the view stale; the next `render`
//! force-refreshes the affected snapshot. Renders of one view run one at a
//! time, so a second render waits for a forced refresh already in flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::controllers::closet::Closet;
use crate::controllers::home::HomeFeed;
use crate::models::wardrobe::{Inventory, Outfit, WeatherSnapshot};
use crate::services::cache::CacheError;
use crate::services::events::{AppEvent, EventBus, EventName, Subscription};
use crate::services::guides::{GuideId, GuideSequencer};
use crate::services::store::StoreError;

fn mark_on(bus: &EventBus, name: EventName, flag: &Arc<AtomicBool>) -> Subscription {
    let flag = Arc::clone(flag);
    bus.subscribe(name, move |_| flag.store(true, Ordering::SeqCst))
}

/// Clears the flag, returning whether the next read must force a refresh.
fn take_stale(stale: &AtomicBool) -> bool {
    stale.swap(false, Ordering::SeqCst)
}

/// A failed forced refresh leaves the view stale.
fn settle<T>(stale: &AtomicBool, forced: bool, result: Result<T, CacheError>) -> Result<T, CacheError> {
    if result.is_err() && forced {
        stale.store(true, Ordering::SeqCst);
    }
    result
}

pub struct InventoryView {
    closet: Arc<Closet>,
    stale: Arc<AtomicBool>,
    rendering: tokio::sync::Mutex<()>,
    _subscription: Subscription,
}

impl InventoryView {
    pub fn mount(closet: Arc<Closet>, bus: &EventBus) -> Self {
        let stale = Arc::new(AtomicBool::new(false));
        let subscription = mark_on(bus, EventName::InventoryChanged, &stale);
        Self {
            closet,
            stale,
            rendering: tokio::sync::Mutex::new(()),
            _subscription: subscription,
        }
    }

    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }

    pub async fn render(&self) -> Result<Inventory, CacheError> {
        let _rendering = self.rendering.lock().await;
        let force = take_stale(&self.stale);
        settle(&self.stale, force, self.closet.inventory(force).await)
    }
}

/// What the home screen shows.
#[derive(Debug, Clone, PartialEq)]
pub struct HomeScreen {
    pub day_label: &'static str,
    pub region: String,
    pub weather: WeatherSnapshot,
    pub history: Vec<Outfit>,
}

pub struct HomeView {
    feed: Arc<HomeFeed>,
    region: Arc<Mutex<String>>,
    weather_stale: Arc<AtomicBool>,
    history_stale: Arc<AtomicBool>,
    rendering: tokio::sync::Mutex<()>,
    _subscriptions: Vec<Subscription>,
}

impl HomeView {
    pub fn mount(feed: Arc<HomeFeed>, bus: &EventBus, region: impl Into<String>) -> Self {
        let region = Arc::new(Mutex::new(region.into()));
        let weather_stale = Arc::new(AtomicBool::new(false));
        let history_stale = Arc::new(AtomicBool::new(false));

        let on_region = {
            let region = Arc::clone(&region);
            let weather_stale = Arc::clone(&weather_stale);
            bus.subscribe(EventName::RegionChanged, move |event| {
                if let AppEvent::RegionChanged(new_region) = event {
                    *lock(&region) = new_region.clone();
                    weather_stale.store(true, Ordering::SeqCst);
                }
            })
        };

        Self {
            feed,
            region,
            _subscriptions: vec![mark_on(bus, EventName::HomeRefresh, &history_stale), on_region],
            weather_stale,
            history_stale,
            rendering: tokio::sync::Mutex::new(()),
        }
    }

    pub fn region(&self) -> String {
        lock(&self.region).clone()
    }

    pub fn is_stale(&self) -> bool {
        self.weather_stale.load(Ordering::SeqCst) || self.history_stale.load(Ordering::SeqCst)
    }

    pub async fn render(&self) -> Result<HomeScreen, CacheError> {
        let _rendering = self.rendering.lock().await;
        let region = self.region();
        let force = take_stale(&self.weather_stale);
        let weather = settle(&self.weather_stale, force, self.feed.weather(&region, force).await)?;
        let force = take_stale(&self.history_stale);
        let history = settle(&self.history_stale, force, self.feed.history(force).await)?;

        Ok(HomeScreen {
            day_label: self.feed.day_label(),
            region,
            weather,
            history,
        })
    }
}

/// Routes screen activity into the guide sequencer.
pub struct GuideView {
    guides: GuideSequencer,
    _subscription: Subscription,
}

impl GuideView {
    /// Mounting the home screen offers the closet-registration tip.
    pub fn mount(guides: GuideSequencer, bus: &EventBus) -> Self {
        guides.request(GuideId::ClosetRegistration);

        let sequencer = guides.clone();
        let subscription = bus.subscribe(EventName::FirstUploadDone, move |_| {
            sequencer.request(GuideId::CoordinationStart);
        });

        Self {
            guides,
            _subscription: subscription,
        }
    }

    pub fn on_closet_opened(&self) {
        self.guides.request(GuideId::CameraEntry);
    }

    pub fn current(&self) -> Option<GuideId> {
        self.guides.current()
    }

    pub fn dismiss(&self, guide: GuideId) -> Result<(), StoreError> {
        self.guides.dismiss(guide)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
