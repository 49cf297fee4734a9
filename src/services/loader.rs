//! Dataset loading.
//!
//! Every dataset is fetched and parsed independently. A failed or timed-out
//! dataset never affects the others. [`LoadBarrier`] collects outcomes in
//! whatever order they arrive and only yields a [`LoadReport`] once every
//! expected dataset has settled, which is the single "all layers ready"
//! signal the view waits for before building the layer control.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use geojson::{FeatureCollection, GeoJson};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::LoadingConfig;
use crate::models::{DatasetId, DatasetSpec};

/// Why a dataset could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// The source reported a failure (network error, missing object...).
    #[error("source unavailable: {0}")]
    Unavailable(String),
    /// The content is not valid GeoJSON.
    #[error("invalid GeoJSON: {0}")]
    Parse(#[from] geojson::Error),
    /// Valid GeoJSON, but not a FeatureCollection.
    #[error("expected a FeatureCollection, found a {0}")]
    NotFeatureCollection(&'static str),
    /// No attempt finished within the per-attempt timeout.
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    /// The load never reported an outcome.
    #[error("load did not complete")]
    Unsettled,
}

impl LoadError {
    /// Whether another attempt could succeed. Malformed content never will.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::Unavailable(_) | Self::Timeout(_)
        )
    }
}

/// Where dataset content comes from.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// Returns the raw GeoJSON text of a dataset.
    async fn fetch(&self, spec: &DatasetSpec) -> Result<String, LoadError>;
}

/// Reads datasets from a directory on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    /// Creates a source rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolved path of a dataset file.
    pub fn path_for(&self, spec: &DatasetSpec) -> PathBuf {
        self.root.join(&spec.file)
    }
}

#[async_trait]
impl DatasetSource for FileSource {
    async fn fetch(&self, spec: &DatasetSpec) -> Result<String, LoadError> {
        let path = self.path_for(spec);
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| LoadError::Io { path, source })
    }
}

/// Most retries a single dataset gets, whatever the policy asks for.
pub const MAX_RETRIES: u32 = 10;

/// Longest delay between two attempts.
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Timeout and retry settings applied to each dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadPolicy {
    /// Upper bound for a single fetch; parsing runs after the fetch returns
    pub timeout: Duration,
    /// Additional attempts after the first failure, capped at [`MAX_RETRIES`]
    pub retries: u32,
    /// Delay before the first retry; doubles on each further retry up to
    /// [`MAX_BACKOFF`]
    pub backoff: Duration,
}

impl LoadPolicy {
    /// Delay before retry number `attempt` (0-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff
            .saturating_mul(2_u32.saturating_pow(attempt))
            .min(MAX_BACKOFF)
    }

    /// Retries actually attempted.
    pub fn effective_retries(&self) -> u32 {
        self.retries.min(MAX_RETRIES)
    }
}

impl Default for LoadPolicy {
    fn default() -> Self {
        Self::from(&LoadingConfig::default())
    }
}

impl From<&LoadingConfig> for LoadPolicy {
    fn from(config: &LoadingConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.timeout_ms),
            retries: config.retries,
            backoff: Duration::from_millis(config.backoff_ms),
        }
    }
}

/// Parses GeoJSON text that must hold a FeatureCollection.
pub fn parse_collection(text: &str) -> Result<FeatureCollection, LoadError> {
    match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => Ok(collection),
        GeoJson::Feature(_) => Err(LoadError::NotFeatureCollection("Feature")),
        GeoJson::Geometry(_) => Err(LoadError::NotFeatureCollection("Geometry")),
    }
}

/// Loads one dataset, retrying transient failures with exponential backoff.
pub async fn load_dataset<S: DatasetSource + ?Sized>(
    source: &S,
    spec: &DatasetSpec,
    policy: &LoadPolicy,
) -> Result<FeatureCollection, LoadError> {
    let retries = policy.effective_retries();
    let mut attempt = 0;
    loop {
        let result = match tokio::time::timeout(policy.timeout, source.fetch(spec)).await {
            Ok(Ok(text)) => parse_collection(&text),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(LoadError::Timeout(policy.timeout)),
        };

        match result {
            Ok(collection) => return Ok(collection),
            Err(err) if attempt < retries && err.is_retryable() => {
                let delay = policy.backoff_for(attempt);
                attempt += 1;
                warn!(
                    dataset = %spec.id,
                    attempt,
                    error = %err,
                    "dataset load failed, retrying in {}ms",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// A dataset that loaded successfully.
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    /// Dataset id
    pub id: DatasetId,
    /// Parsed features
    pub collection: FeatureCollection,
}

/// A dataset that failed for good.
#[derive(Debug)]
pub struct FailedDataset {
    /// Dataset id
    pub id: DatasetId,
    /// Final error
    pub error: LoadError,
}

/// Outcome of loading every expected dataset.
#[derive(Debug)]
pub struct LoadReport {
    /// Loaded datasets, in expected order
    pub loaded: Vec<LoadedDataset>,
    /// Failed datasets, in expected order
    pub failed: Vec<FailedDataset>,
    /// When the last dataset settled
    pub finished_at: DateTime<Utc>,
}

impl LoadReport {
    /// Parsed features of a loaded dataset.
    pub fn collection(&self, id: &DatasetId) -> Option<&FeatureCollection> {
        self.loaded
            .iter()
            .find(|d| &d.id == id)
            .map(|d| &d.collection)
    }

    /// Error of a failed dataset.
    pub fn failure(&self, id: &DatasetId) -> Option<&LoadError> {
        self.failed.iter().find(|d| &d.id == id).map(|d| &d.error)
    }
}

/// Collects dataset outcomes keyed by dataset id.
#[derive(Debug)]
pub struct LoadBarrier {
    expected: Vec<DatasetId>,
    settled: BTreeMap<DatasetId, Result<FeatureCollection, LoadError>>,
}

impl LoadBarrier {
    /// Creates a barrier waiting for `expected` (duplicates are ignored).
    pub fn new(expected: impl IntoIterator<Item = DatasetId>) -> Self {
        let mut ids: Vec<DatasetId> = Vec::new();
        for id in expected {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Self {
            expected: ids,
            settled: BTreeMap::new(),
        }
    }

    /// Records an outcome. Returns false when the id is not expected or has
    /// already settled; the first outcome wins.
    pub fn complete(
        &mut self,
        id: &DatasetId,
        outcome: Result<FeatureCollection, LoadError>,
    ) -> bool {
        if !self.expected.contains(id) {
            warn!(dataset = %id, "ignoring outcome for unexpected dataset");
            return false;
        }
        if self.settled.contains_key(id) {
            debug!(dataset = %id, "ignoring repeated outcome");
            return false;
        }
        self.settled.insert(id.clone(), outcome);
        true
    }

    /// Whether every expected dataset has settled.
    pub fn is_ready(&self) -> bool {
        self.expected.iter().all(|id| self.settled.contains_key(id))
    }

    /// Datasets still waiting for an outcome.
    pub fn pending(&self) -> Vec<&DatasetId> {
        self.expected
            .iter()
            .filter(|id| !self.settled.contains_key(*id))
            .collect()
    }

    /// Builds the report if every dataset has settled.
    pub fn try_finish(self) -> Result<LoadReport, Self> {
        if self.is_ready() {
            Ok(self.finish())
        } else {
            Err(self)
        }
    }

    /// Builds the report; datasets still pending are reported as
    /// [`LoadError::Unsettled`].
    pub fn finish(mut self) -> LoadReport {
        let mut loaded = Vec::new();
        let mut failed = Vec::new();

        for id in self.expected {
            match self.settled.remove(&id) {
                Some(Ok(collection)) => loaded.push(LoadedDataset { id, collection }),
                Some(Err(error)) => failed.push(FailedDataset { id, error }),
                None => failed.push(FailedDataset {
                    id,
                    error: LoadError::Unsettled,
                }),
            }
        }

        LoadReport {
            loaded,
            failed,
            finished_at: Utc::now(),
        }
    }
}

/// Loads every dataset concurrently and returns once all have settled.
pub async fn load_all<S: DatasetSource + ?Sized>(
    source: &S,
    specs: &[DatasetSpec],
    policy: &LoadPolicy,
) -> LoadReport {
    let mut barrier = LoadBarrier::new(specs.iter().map(|spec| spec.id.clone()));

    let mut pending: FuturesUnordered<_> = specs
        .iter()
        .map(|spec| async move { (&spec.id, load_dataset(source, spec, policy).await) })
        .collect();

    while let Some((id, outcome)) = pending.next().await {
        match &outcome {
            Ok(collection) => info!(
                dataset = %id,
                features = collection.features.len(),
                "dataset loaded"
            ),
            Err(err) => warn!(dataset = %id, error = %err, "dataset failed to load"),
        }
        barrier.complete(id, outcome);
    }

    let report = barrier.finish();
    info!(
        loaded = report.loaded.len(),
        failed = report.failed.len(),
        "all datasets settled"
    );
    report
}
