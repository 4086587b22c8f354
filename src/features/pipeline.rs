use super::aggregate::FeatureAggregator;
use super::record::{AlbumRecord, ResultTable, RunStats};
use crate::client::CatalogApi;
use crate::models::AlbumIdentity;
use tracing::{info, warn};

pub const DEFAULT_PROGRESS_EVERY: usize = 50;

/// Enriches albums one at a time from the catalog
pub struct Pipeline<C: CatalogApi> {
    catalog: C,
    progress_every: usize,
}

impl<C: CatalogApi> Pipeline<C> {
    pub fn new(catalog: C) -> Self {
        Self {
            catalog,
            progress_every: DEFAULT_PROGRESS_EVERY,
        }
    }

    /// Log progress every `n` albums, `0` disables progress logging
    pub fn with_progress_every(mut self, n: usize) -> Self {
        self.progress_every = n;
        self
    }

    /// Build one record per album whose metadata is available, in input order.
    ///
    /// Albums without metadata are skipped. When only the feature lookup fails
    /// the album is kept without an aggregate.
    pub fn run(&self, albums: &[AlbumIdentity]) -> ResultTable {
        let mut records = Vec::with_capacity(albums.len());
        let mut stats = RunStats::default();

        for (i, album) in albums.iter().enumerate() {
            if self.progress_every > 0 && i % self.progress_every == 0 {
                info!("parsed {}/{}", i, albums.len());
            }

            match self.process(album) {
                Some(record) => {
                    if record.aggregate.is_some() {
                        stats.processed += 1;
                    } else {
                        stats.degraded += 1;
                    }
                    records.push(record);
                }
                None => stats.skipped += 1,
            }
        }

        info!(
            "Finished {} albums: {} complete, {} without features, {} skipped",
            albums.len(),
            stats.processed,
            stats.degraded,
            stats.skipped
        );
        ResultTable::new(records, stats)
    }

    fn process(&self, album: &AlbumIdentity) -> Option<AlbumRecord> {
        let album_id = album.catalog_id.as_str();

        let metadata = match self.catalog.album_metadata(album_id) {
            Ok(Some(metadata)) => metadata,
            Ok(None) => {
                warn!("No catalog metadata for album {album_id} ({}), skipping", album.title);
                return None;
            }
            Err(e) => {
                warn!("Failed to get album info for album {album_id}: {e:#}");
                return None;
            }
        };

        let aggregate = match self.catalog.tracks_and_features(album_id) {
            Ok(tracks) => Some(FeatureAggregator::aggregate(&tracks)),
            Err(e) => {
                warn!("Failed to get album features for album {album_id}: {e:#}");
                None
            }
        };

        Some(AlbumRecord {
            identity: album.clone(),
            metadata,
            aggregate,
        })
    }
}
