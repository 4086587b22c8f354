use serde::{Deserialize, Deserializer};

/// An album taken from the listening history, identified by its catalog id
#[derive(Debug, Clone, PartialEq)]
pub struct AlbumIdentity {
    pub catalog_id: String,
    pub artist: String,
    pub title: String,
    pub origin: String,
    /// `None` when the service sent `null`
    pub genres: Option<Vec<String>>,
    pub sub_genres: Option<Vec<String>>,
    pub release_year: i32,
    /// `None` for albums the community has not rated
    pub rating: Option<f64>,
}

/// Response structure for the history project endpoint
#[derive(Debug, Deserialize)]
pub struct ProjectResponse {
    /// Entries are kept raw so that one malformed album cannot fail the whole list
    pub history: Vec<serde_json::Value>,
}

/// One entry of the project history as returned by the history service
#[derive(Debug, Deserialize)]
pub struct HistoryEntry {
    pub album: HistoryAlbum,
    #[serde(rename = "globalRating", deserialize_with = "nullable")]
    pub global_rating: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryAlbum {
    #[serde(rename = "spotifyId")]
    pub spotify_id: String,
    pub artist: String,
    pub name: String,
    #[serde(rename = "artistOrigin")]
    pub artist_origin: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub genres: Option<Vec<String>>,
    #[serde(rename = "subGenres", deserialize_with = "nullable")]
    pub sub_genres: Option<Vec<String>>,
    /// Sent as a string by the service, occasionally as a number
    #[serde(rename = "releaseDate")]
    pub release_date: serde_json::Value,
}

/// The key must be present but may hold `null`.
/// Unlike a plain `Option` field, a missing key is still an error.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer)
}

/// Album-level metadata selected from the catalog
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AlbumMetadata {
    pub release_date: String,
    pub release_date_precision: ReleaseDatePrecision,
    pub popularity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseDatePrecision {
    Year,
    Month,
    Day,
}

impl ReleaseDatePrecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseDatePrecision::Year => "year",
            ReleaseDatePrecision::Month => "month",
            ReleaseDatePrecision::Day => "day",
        }
    }
}

/// Musical mode of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u8")]
pub enum Mode {
    Minor = 0,
    Major = 1,
}

impl TryFrom<u8> for Mode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Mode::Minor),
            1 => Ok(Mode::Major),
            other => Err(format!("mode must be 0 or 1, got {other}")),
        }
    }
}

/// Audio features of a single track as reported by the catalog
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawTrackFeature {
    pub duration_ms: u64,
    pub danceability: f64,
    pub energy: f64,
    pub loudness: f64,
    pub speechiness: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
    pub liveness: f64,
    pub valence: f64,
    pub tempo: f64,
    pub key: i32,
    pub time_signature: i32,
    pub mode: Mode,
}

/// Page of the album tracks endpoint
#[derive(Debug, Deserialize)]
pub struct AlbumTracksPage {
    pub items: Vec<SimplifiedTrack>,
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SimplifiedTrack {
    /// Local files have no catalog id
    pub id: Option<String>,
}

/// Response structure for the audio-features endpoint
#[derive(Debug, Deserialize)]
pub struct AudioFeaturesResponse {
    pub audio_features: Vec<Option<serde_json::Value>>,
}

/// Response structure for the client-credentials token call
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}
