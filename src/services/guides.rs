use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use strum::{AsRefStr, Display, EnumIter, IntoEnumIterator};

use crate::services::store::{FlagStore, StoreError};

/// One-time contextual tips, declared in precedence order (highest first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, AsRefStr, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum GuideId {
    ClosetRegistration,
    CameraEntry,
    CoordinationStart,
}

impl GuideId {
    /// Durable "seen" flag backing this guide.
    pub fn flag(self) -> &'static str {
        match self {
            GuideId::ClosetRegistration => "HAS_SEEN_CLOSET_GUIDE",
            GuideId::CameraEntry => "HAS_SEEN_CAMERA_GUIDE",
            GuideId::CoordinationStart => "HAS_SEEN_COORD_GUIDE",
        }
    }
}

/// Decides which onboarding tip, if any, is on screen.
///
/// A guide becomes a candidate once some screen `request`s it; among the
/// candidates whose flag is unset only the highest-precedence one is shown.
/// The rest stay pending until it is dismissed.
#[derive(Clone)]
pub struct GuideSequencer {
    flags: FlagStore,
    requested: Arc<Mutex<BTreeSet<GuideId>>>,
}

impl GuideSequencer {
    pub fn new(flags: FlagStore) -> Self {
        Self {
            flags,
            requested: Arc::new(Mutex::new(BTreeSet::new())),
        }
    }

    /// True iff the durable flag for `guide` is unset.
    pub fn should_show(&self, guide: GuideId) -> bool {
        !self.flags.is_set(guide.flag())
    }

    /// Mark `guide` as wanting to be shown.
    pub fn request(&self, guide: GuideId) {
        if self.should_show(guide) {
            self.requested_set().insert(guide);
        }
    }

    /// The guide to display right now.
    pub fn current(&self) -> Option<GuideId> {
        let requested = self.requested_set();
        GuideId::iter().find(|g| requested.contains(g) && self.should_show(*g))
    }

    /// Guides waiting behind the current one.
    pub fn pending(&self) -> Vec<GuideId> {
        let current = self.current();
        let requested = self.requested_set();
        GuideId::iter()
            .filter(|g| requested.contains(g) && self.should_show(*g) && Some(*g) != current)
            .collect()
    }

    /// Set the guide's flag durably; it is never shown again.
    pub fn dismiss(&self, guide: GuideId) -> Result<(), StoreError> {
        self.requested_set().remove(&guide);
        self.flags.set(guide.flag())?;
        tracing::info!(guide = %guide, "Onboarding guide dismissed");
        Ok(())
    }

    fn requested_set(&self) -> std::sync::MutexGuard<'_, BTreeSet<GuideId>> {
        match self.requested.lock() {
            Ok(set) => set,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
