use crate::models::{AlbumIdentity, HistoryEntry, ProjectResponse};
use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use tracing::{debug, warn};
use ureq::Agent;
use urlencoding::encode;

/// Used when the history service has no origin for an artist
pub const UNKNOWN_ORIGIN: &str = "Not_Found";

/// Client for the 1001 Albums Generator project API
pub struct HistoryClient {
    agent: Agent,
    base_url: String,
}

impl HistoryClient {
    pub fn new(base_url: &str) -> Self {
        HistoryClient {
            agent: Agent::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch the rated history of a project, dropping entries that cannot be mapped
    pub fn fetch_albums(&self, project_id: &str) -> Result<Vec<AlbumIdentity>> {
        let url = format!("{}/api/v1/projects/{}", self.base_url, encode(project_id));
        debug!("Fetching project history from {url}");

        let response = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| anyhow!("Failed to fetch project '{}': {}", project_id, e))?;

        let project: ProjectResponse = response
            .into_json()
            .context("Failed to parse project history response")?;

        Ok(parse_history(project.history))
    }
}

/// Map raw history entries to album identities, logging and skipping malformed ones
pub fn parse_history(entries: Vec<serde_json::Value>) -> Vec<AlbumIdentity> {
    let total = entries.len();
    let albums: Vec<AlbumIdentity> = entries
        .into_iter()
        .filter_map(|raw| match to_identity(&raw) {
            Ok(album) => Some(album),
            Err(e) => {
                warn!("Failed to get album info for {}: {e}", raw["album"]);
                None
            }
        })
        .collect();

    if albums.len() < total {
        warn!("Dropped {} of {} history entries", total - albums.len(), total);
    }
    albums
}

fn to_identity(raw: &serde_json::Value) -> Result<AlbumIdentity> {
    let entry = HistoryEntry::deserialize(raw)?;
    let album = entry.album;

    let release_year = match &album.release_date {
        serde_json::Value::String(s) => s
            .trim()
            .parse::<i32>()
            .with_context(|| format!("releaseDate '{s}' is not a year"))?,
        serde_json::Value::Number(n) => n
            .as_i64()
            .and_then(|y| i32::try_from(y).ok())
            .ok_or_else(|| anyhow!("releaseDate {n} is not a year"))?,
        other => return Err(anyhow!("releaseDate has unexpected value {other}")),
    };

    Ok(AlbumIdentity {
        catalog_id: album.spotify_id,
        artist: album.artist,
        title: album.name,
        origin: album
            .artist_origin
            .unwrap_or_else(|| UNKNOWN_ORIGIN.to_string()),
        genres: album.genres,
        sub_genres: album.sub_genres,
        release_year,
        rating: entry.global_rating,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(album: serde_json::Value) -> serde_json::Value {
        json!({ "album": album, "globalRating": 3.42 })
    }

    fn complete_album() -> serde_json::Value {
        json!({
            "spotifyId": "1klALx0u4AavZNEvC4LrTL",
            "artist": "The Beatles",
            "name": "Abbey Road",
            "artistOrigin": "uk",
            "genres": ["rock"],
            "subGenres": ["pop rock", "psychedelic rock"],
            "releaseDate": "1969"
        })
    }

    #[test]
    fn test_maps_complete_entry() {
        let albums = parse_history(vec![entry(complete_album())]);

        assert_eq!(albums.len(), 1);
        let album = &albums[0];
        assert_eq!(album.catalog_id, "1klALx0u4AavZNEvC4LrTL");
        assert_eq!(album.title, "Abbey Road");
        assert_eq!(album.origin, "uk");
        assert_eq!(
            album.sub_genres.as_deref(),
            Some(&["pop rock".to_string(), "psychedelic rock".to_string()][..])
        );
        assert_eq!(album.release_year, 1969);
        assert_eq!(album.rating, Some(3.42));
    }

    #[test]
    fn test_missing_release_date_drops_entry() {
        let mut album = complete_album();
        album.as_object_mut().unwrap().remove("releaseDate");

        assert!(parse_history(vec![entry(album)]).is_empty());
    }

    #[test]
    fn test_missing_origin_uses_placeholder() {
        let mut album = complete_album();
        album.as_object_mut().unwrap().remove("artistOrigin");

        let albums = parse_history(vec![entry(album)]);
        assert_eq!(albums[0].origin, UNKNOWN_ORIGIN);
    }

    #[test]
    fn test_unrated_album_is_kept_without_rating() {
        let albums = parse_history(vec![json!({
            "album": complete_album(),
            "globalRating": null
        })]);

        assert_eq!(albums.len(), 1);
        assert_eq!(albums[0].rating, None);
    }

    #[test]
    fn test_null_genre_lists_are_kept() {
        let mut album = complete_album();
        album["genres"] = serde_json::Value::Null;
        album["subGenres"] = serde_json::Value::Null;

        let albums = parse_history(vec![entry(album)]);

        assert_eq!(albums.len(), 1);
        assert_eq!(albums[0].genres, None);
        assert_eq!(albums[0].sub_genres, None);
    }

    #[test]
    fn test_missing_rating_key_drops_entry() {
        assert!(parse_history(vec![json!({ "album": complete_album() })]).is_empty());
    }

    #[test]
    fn test_numeric_release_date_is_accepted() {
        let mut album = complete_album();
        album["releaseDate"] = json!(1971);

        let albums = parse_history(vec![entry(album)]);
        assert_eq!(albums[0].release_year, 1971);
    }

    #[test]
    fn test_malformed_entries_do_not_affect_neighbours() {
        let mut no_catalog_id = complete_album();
        no_catalog_id["spotifyId"] = serde_json::Value::Null;
        let mut second = complete_album();
        second["name"] = json!("Let It Be");

        let albums = parse_history(vec![
            entry(complete_album()),
            entry(no_catalog_id),
            json!({ "album": complete_album() }),
            entry(second),
        ]);

        let titles: Vec<&str> = albums.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Abbey Road", "Let It Be"]);
    }
}
