use crate::models::{AlbumIdentity, AlbumMetadata, RawTrackFeature};

/// Continuous audio features that are averaged across an album
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinuousFeature {
    Danceability,
    Energy,
    Loudness,
    Speechiness,
    Acousticness,
    Instrumentalness,
    Liveness,
    Valence,
    Tempo,
}

impl ContinuousFeature {
    pub const ALL: [ContinuousFeature; 9] = [
        ContinuousFeature::Danceability,
        ContinuousFeature::Energy,
        ContinuousFeature::Loudness,
        ContinuousFeature::Speechiness,
        ContinuousFeature::Acousticness,
        ContinuousFeature::Instrumentalness,
        ContinuousFeature::Liveness,
        ContinuousFeature::Valence,
        ContinuousFeature::Tempo,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ContinuousFeature::Danceability => "danceability",
            ContinuousFeature::Energy => "energy",
            ContinuousFeature::Loudness => "loudness",
            ContinuousFeature::Speechiness => "speechiness",
            ContinuousFeature::Acousticness => "acousticness",
            ContinuousFeature::Instrumentalness => "instrumentalness",
            ContinuousFeature::Liveness => "liveness",
            ContinuousFeature::Valence => "valence",
            ContinuousFeature::Tempo => "tempo",
        }
    }

    pub fn value(self, track: &RawTrackFeature) -> f64 {
        match self {
            ContinuousFeature::Danceability => track.danceability,
            ContinuousFeature::Energy => track.energy,
            ContinuousFeature::Loudness => track.loudness,
            ContinuousFeature::Speechiness => track.speechiness,
            ContinuousFeature::Acousticness => track.acousticness,
            ContinuousFeature::Instrumentalness => track.instrumentalness,
            ContinuousFeature::Liveness => track.liveness,
            ContinuousFeature::Valence => track.valence,
            ContinuousFeature::Tempo => track.tempo,
        }
    }
}

/// Duration-weighted mean and relative spread of one continuous feature.
/// `None` marks an undefined value (no tracks, zero duration, zero mean).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FeatureSummary {
    pub weighted_mean: Option<f64>,
    pub dispersion: Option<f64>,
}

/// Most frequent value of a categorical feature and the share of tracks using it
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CategoricalSummary {
    pub value: Option<i32>,
    pub share: Option<f64>,
}

/// Fixed-shape summary of an album's tracks
#[derive(Debug, Clone, PartialEq)]
pub struct AlbumAggregate {
    pub(super) continuous: [FeatureSummary; 9],
    pub mode_0_fraction: Option<f64>,
    pub mode_1_fraction: Option<f64>,
    pub key: CategoricalSummary,
    pub time_signature: CategoricalSummary,
    pub total_duration_ms: u64,
    pub track_count: usize,
    pub unresolved_tracks: usize,
}

impl AlbumAggregate {
    pub fn feature(&self, feature: ContinuousFeature) -> &FeatureSummary {
        &self.continuous[feature as usize]
    }
}

/// One output row: history fields, catalog metadata and the aggregate.
///
/// The three parts never share a column name. Identity columns come first,
/// then metadata, then aggregate columns.
#[derive(Debug, Clone, PartialEq)]
pub struct AlbumRecord {
    pub identity: AlbumIdentity,
    pub metadata: AlbumMetadata,
    /// `None` when the track features could not be fetched
    pub aggregate: Option<AlbumAggregate>,
}

const IDENTITY_COLUMNS: [&str; 8] = [
    "spotify_id",
    "artist",
    "name",
    "artist_origin",
    "genres",
    "sub_genres",
    "release_year",
    "global_rating",
];

const METADATA_COLUMNS: [&str; 3] = ["release_date", "release_date_precision", "popularity"];

const TRAILING_AGGREGATE_COLUMNS: [&str; 9] = [
    "mode_0",
    "mode_1",
    "pop_key",
    "pop_key_used",
    "pop_time_signature",
    "pop_time_signature_used",
    "duration",
    "track_amount",
    "unresolved_tracks",
];

impl AlbumRecord {
    /// Column names in output order
    pub fn header() -> Vec<String> {
        let mut columns: Vec<String> = IDENTITY_COLUMNS
            .iter()
            .chain(METADATA_COLUMNS.iter())
            .map(|c| c.to_string())
            .collect();
        columns.extend(
            ContinuousFeature::ALL
                .iter()
                .map(|f| format!("{}_weighted_avg", f.name())),
        );
        columns.extend(
            ContinuousFeature::ALL
                .iter()
                .map(|f| format!("{}_difference", f.name())),
        );
        columns.extend(TRAILING_AGGREGATE_COLUMNS.iter().map(|c| c.to_string()));
        columns
    }

    /// Cell values aligned with [`AlbumRecord::header`]; undefined values are empty
    pub fn to_row(&self) -> Vec<String> {
        let identity = &self.identity;
        let mut row = vec![
            identity.catalog_id.clone(),
            identity.artist.clone(),
            identity.title.clone(),
            identity.origin.clone(),
            cell(identity.genres.as_deref().map(json_list)),
            cell(identity.sub_genres.as_deref().map(json_list)),
            identity.release_year.to_string(),
            cell(identity.rating),
            self.metadata.release_date.clone(),
            self.metadata.release_date_precision.as_str().to_string(),
            self.metadata.popularity.to_string(),
        ];

        match &self.aggregate {
            Some(aggregate) => {
                row.extend(
                    ContinuousFeature::ALL
                        .iter()
                        .map(|f| cell(aggregate.feature(*f).weighted_mean)),
                );
                row.extend(
                    ContinuousFeature::ALL
                        .iter()
                        .map(|f| cell(aggregate.feature(*f).dispersion)),
                );
                row.extend([
                    cell(aggregate.mode_0_fraction),
                    cell(aggregate.mode_1_fraction),
                    cell(aggregate.key.value),
                    cell(aggregate.key.share),
                    cell(aggregate.time_signature.value),
                    cell(aggregate.time_signature.share),
                    aggregate.total_duration_ms.to_string(),
                    aggregate.track_count.to_string(),
                    aggregate.unresolved_tracks.to_string(),
                ]);
            }
            None => {
                let width = 2 * ContinuousFeature::ALL.len() + TRAILING_AGGREGATE_COLUMNS.len();
                row.extend(std::iter::repeat_n(String::new(), width));
            }
        }

        row
    }
}

fn cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn json_list(values: &[String]) -> String {
    serde_json::to_string(values).unwrap_or_default()
}

/// Counters describing how a run treated its input albums
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Albums written with a full aggregate
    pub processed: usize,
    /// Albums written without an aggregate after the feature lookup failed
    pub degraded: usize,
    /// Albums left out because their metadata was unavailable
    pub skipped: usize,
}

/// Records in input order, ready for the sink
#[derive(Debug, Default)]
pub struct ResultTable {
    records: Vec<AlbumRecord>,
    stats: RunStats,
}

impl ResultTable {
    pub(crate) fn new(records: Vec<AlbumRecord>, stats: RunStats) -> Self {
        Self { records, stats }
    }

    pub fn records(&self) -> &[AlbumRecord] {
        &self.records
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
