use uuid::Uuid;

use crate::models::job::OwnerKey;
use crate::services::store::{KeyValueStore, StoreError};

const USER_ID_KEY: &str = "COORDII_USER_ID";

/// Return the stored per-installation identifier, issuing one if absent.
pub fn load_or_create(store: &dyn KeyValueStore) -> Result<OwnerKey, StoreError> {
    if let Some(existing) = load(store) {
        return Ok(existing);
    }

    let owner = OwnerKey(Uuid::new_v4().to_string());
    store.set(USER_ID_KEY, owner.0.clone())?;
    tracing::info!(owner = %owner, "Issued new user identifier");
    Ok(owner)
}

/// The stored identifier, if any. Read failures count as absent.
pub fn load(store: &dyn KeyValueStore) -> Option<OwnerKey> {
    match store.get(USER_ID_KEY) {
        Ok(value) => value.filter(|v| !v.is_empty()).map(OwnerKey),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load user identifier");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::store::MemoryStore;

    #[test]
    fn test_identifier_is_issued_once() {
        let store = MemoryStore::new();
        assert!(load(&store).is_none());

        let first = load_or_create(&store).unwrap();
        let second = load_or_create(&store).unwrap();
        assert_eq!(first, second);
        assert!(Uuid::parse_str(&first.0).is_ok());
    }

    #[test]
    fn test_reset_issues_new_identifier() {
        let store = MemoryStore::new();
        let first = load_or_create(&store).unwrap();
        store.clear().unwrap();
        let second = load_or_create(&store).unwrap();
        assert_ne!(first, second);
    }
}
