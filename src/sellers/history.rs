use crate::marketplace::{sanitize_key, SellerProfile};
use crate::storage::{get_json, put_json, put_json_new, KeyValueStore, StorageResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Key prefix for all seller snapshots
pub const SELLERS_PREFIX: &str = "sellers";

/// File name of the per-seller latest pointer
pub const LATEST_FILE: &str = "latest.json";

/// All stored snapshots for one (marketplace, seller) key, newest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellerHistory {
    pub marketplace: String,
    pub seller_key: String,
    pub snapshots: Vec<SellerProfile>,
}

impl SellerHistory {
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }
}

/// Append-only store of seller profile snapshots
///
/// Each snapshot is written once under a timestamped key and never touched
/// again. The `latest.json` pointer next to them is overwritten on every
/// append. Writers for different sellers may run concurrently.
#[derive(Clone)]
pub struct SellerHistoryStore {
    store: Arc<dyn KeyValueStore>,
}

impl SellerHistoryStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn seller_dir(marketplace: &str, seller_key: &str) -> String {
        format!(
            "{}/{}/{}",
            SELLERS_PREFIX,
            sanitize_key(marketplace),
            sanitize_key(seller_key)
        )
    }

    /// Key a snapshot is stored under
    pub fn snapshot_key(profile: &SellerProfile) -> String {
        format!(
            "{}/{}_{}.json",
            Self::seller_dir(&profile.marketplace, &profile.seller_key()),
            profile.timestamp.format("%Y%m%dT%H%M%S%6fZ"),
            profile.profile_id
        )
    }

    /// Writes an immutable snapshot and moves the latest pointer to it
    ///
    /// Returns the snapshot key.
    pub fn append(&self, profile: &SellerProfile) -> StorageResult<String> {
        let key = Self::snapshot_key(profile);
        put_json_new(self.store.as_ref(), &key, profile)?;

        let latest = format!(
            "{}/{}",
            Self::seller_dir(&profile.marketplace, &profile.seller_key()),
            LATEST_FILE
        );
        put_json(self.store.as_ref(), &latest, profile)?;

        tracing::info!(
            "Stored snapshot {} for {}/{}",
            profile.profile_id,
            profile.marketplace,
            profile.seller_key()
        );
        Ok(key)
    }

    /// Reads every snapshot for a seller, newest first
    ///
    /// Snapshots that fail to deserialize are logged and skipped.
    pub fn history(&self, marketplace: &str, seller_key: &str) -> StorageResult<SellerHistory> {
        let prefix = format!("{}/", Self::seller_dir(marketplace, seller_key));

        let mut snapshots = Vec::new();
        for key in self.store.list_keys(&prefix)? {
            if key.ends_with(LATEST_FILE) {
                continue;
            }

            match get_json::<SellerProfile>(self.store.as_ref(), &key) {
                Ok(Some(profile)) => snapshots.push(profile),
                Ok(None) => {}
                Err(e) => tracing::warn!("Skipping unreadable snapshot {}: {}", key, e),
            }
        }

        snapshots.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| b.profile_id.cmp(&a.profile_id))
        });

        Ok(SellerHistory {
            marketplace: marketplace.to_string(),
            seller_key: seller_key.to_string(),
            snapshots,
        })
    }

    /// Reads the most recent snapshot through the latest pointer
    pub fn latest(&self, marketplace: &str, seller_key: &str) -> StorageResult<Option<SellerProfile>> {
        let key = format!("{}/{}", Self::seller_dir(marketplace, seller_key), LATEST_FILE);
        get_json(self.store.as_ref(), &key)
    }
}
