use async_trait::async_trait;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::fs;
use tokio::sync::RwLock;

/// Time to live of cached package metadata and search results.
pub const PACKAGE_TTL: u64 = 3600;
/// Time to live of cached package interfaces.
pub const INTERFACE_TTL: u64 = 86400;

pub fn package_key(name: &str) -> String {
    format!("pkg:{name}")
}

pub fn search_key(query: &str) -> String {
    format!("search:{query}")
}

pub fn interface_key(name: &str) -> String {
    format!("interface:{name}")
}

/// Seconds since the Unix epoch.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache is full ({0} entries)")]
    Full(usize),
}

/// Trait for a cache implementation. Values are opaque text that expire
/// `ttl` seconds after they were set.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str, now: u64) -> Option<String>;
    async fn set(&self, key: &str, value: String, now: u64, ttl: u64) -> Result<(), CacheError>;
    async fn clear(&self);
    /// Save cache state to its configured directory.
    async fn save(&self) -> Result<(), io::Error>;
    /// Load cache state from its configured directory.
    async fn load(&self) -> Result<(), io::Error>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct Entry {
    value: String,
    expires_at: u64,
}

impl Entry {
    fn is_live(&self, now: u64) -> bool {
        now < self.expires_at
    }
}

/// Represents the data stored per namespace file, keyed by the full cache key.
type NamespaceData = HashMap<String, Entry>;

/// The part of a key before the first `:`, used to pick its file.
fn namespace(key: &str) -> &str {
    match key.split_once(':') {
        Some((namespace, _)) if is_file_safe(namespace) => namespace,
        _ => "misc",
    }
}

fn is_file_safe(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[derive(Debug, Clone)]
pub struct InMemoryCache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    cache_dir: PathBuf,
    max_entries: Option<usize>,
}

impl InMemoryCache {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            cache_dir,
            max_entries: None,
        }
    }

    /// Limits the number of live entries; writes of new keys beyond the
    /// limit fail. Expired entries are dropped on every write either way.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str, now: u64) -> Option<String> {
        self.entries
            .read()
            .await
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone())
    }

    async fn set(&self, key: &str, value: String, now: u64, ttl: u64) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.is_live(now));

        if let Some(limit) = self.max_entries {
            if !entries.contains_key(key) && entries.len() >= limit {
                return Err(CacheError::Full(limit));
            }
        }

        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now.saturating_add(ttl),
            },
        );
        Ok(())
    }

    async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Saves the cache content to one JSON file per key namespace within the
    /// configured directory. Expired entries are not written.
    async fn save(&self) -> Result<(), io::Error> {
        let dir_path = &self.cache_dir;
        let now = unix_now();
        // Prepare data before any .await on the filesystem so the lock is not held across it
        let data_to_save: HashMap<String, NamespaceData> = {
            let entries = self.entries.read().await;

            entries
                .iter()
                .filter(|(_, entry)| entry.is_live(now))
                .sorted_by(|(a, _), (b, _)| namespace(a).cmp(namespace(b)))
                .chunk_by(|(key, _)| namespace(*key))
                .into_iter()
                .map(|(name, group)| {
                    let namespace_data: NamespaceData = group
                        .map(|(key, entry)| (key.clone(), entry.clone()))
                        .collect();
                    (name.to_string(), namespace_data)
                })
                .collect()
        };

        fs::create_dir_all(dir_path).await?;

        let mut saved_files = HashSet::new();

        for (namespace, namespace_data) in &data_to_save {
            let file_path = dir_path.join(format!("{namespace}.json"));

            let serialized =
                serde_json::to_string_pretty(namespace_data).map_err(io::Error::other)?;

            fs::write(&file_path, serialized).await?;
            saved_files.insert(file_path);
            tracing::debug!(
                "Saved {} cache entries for namespace '{}'",
                namespace_data.len(),
                namespace
            );
        }

        // Clean up stale files
        let mut dir_entries = fs::read_dir(dir_path).await?;
        while let Some(dir_entry) = dir_entries.next_entry().await? {
            let path = dir_entry.path();
            if path.is_file()
                && path.extension().is_some_and(|ext| ext == "json")
                && !saved_files.contains(&path)
            {
                match fs::remove_file(&path).await {
                    Ok(_) => tracing::info!("Removed stale cache file: {:?}", path),
                    Err(e) => tracing::warn!("Failed to remove stale cache file {:?}: {}", path, e),
                }
            }
        }

        if data_to_save.is_empty() {
            tracing::info!("Cache is empty. Ensured cache directory {:?} is empty.", dir_path);
        }

        Ok(())
    }

    /// Loads cache content from the JSON files within the configured
    /// directory. Unreadable files are skipped.
    async fn load(&self) -> Result<(), io::Error> {
        let dir_path = &self.cache_dir;
        if !dir_path.exists() {
            tracing::info!("Cache directory {:?} not found, starting with empty cache.", dir_path);
            self.entries.write().await.clear();
            return Ok(());
        }
        if !dir_path.is_dir() {
            tracing::error!(
                "Cache path {:?} is not a directory. Starting with empty cache.",
                dir_path
            );
            self.entries.write().await.clear();
            return Ok(());
        }

        let mut loaded = HashMap::new();
        let mut dir_entries = fs::read_dir(dir_path).await?;
        let mut file_count = 0;

        while let Some(dir_entry) = dir_entries.next_entry().await? {
            let path = dir_entry.path();
            if !path.is_file() || !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }

            let content = match fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) => {
                    tracing::error!("Failed to read cache file {:?}: {}. Skipping file.", path, e);
                    continue;
                }
            };
            if content.trim().is_empty() {
                tracing::warn!("Cache file {:?} is empty, skipping.", path);
                continue;
            }

            match serde_json::from_str::<NamespaceData>(&content) {
                Ok(namespace_data) => {
                    file_count += 1;
                    loaded.extend(namespace_data);
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to deserialize cache file {:?}: {}. Skipping file.",
                        path,
                        e
                    );
                }
            }
        }

        let item_count = loaded.len();
        *self.entries.write().await = loaded;

        tracing::info!(
            "Cache loaded from directory {:?} - {} files, {} items.",
            dir_path,
            file_count,
            item_count
        );

        Ok(())
    }
}
