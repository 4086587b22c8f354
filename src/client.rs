use crate::config::Config;
use crate::models::{
    AlbumMetadata, AlbumTracksPage, AudioFeaturesResponse, RawTrackFeature, TokenResponse,
};
use crate::rate_limit::BlockingRateLimiter;
use anyhow::{Context, Result, anyhow};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, warn};
use ureq::Agent;
use urlencoding::encode;

/// The audio-features endpoint accepts at most this many ids per call
const MAX_FEATURE_IDS: usize = 100;
const TRACKS_PAGE_SIZE: u32 = 50;

/// Album lookups the feature pipeline needs from the music catalog
#[cfg_attr(test, mockall::automock)]
pub trait CatalogApi {
    /// Album-level metadata, `Ok(None)` when the catalog has no such album
    fn album_metadata(&self, album_id: &str) -> Result<Option<AlbumMetadata>>;

    /// Audio features for every track of the album in track order.
    /// Tracks the catalog cannot resolve are `None`.
    fn tracks_and_features(&self, album_id: &str) -> Result<Vec<Option<RawTrackFeature>>>;
}

/// Spotify Web API client authenticated with the client-credentials flow
pub struct SpotifyClient {
    agent: Agent,
    api_url: String,
    market: String,
    auth_header: String,
    limiter: BlockingRateLimiter,
    max_retries: u32,
}

impl SpotifyClient {
    /// Acquire an access token and build a client around it
    pub fn connect(config: &Config) -> Result<Self> {
        let agent = Agent::new();
        let token = request_token(&agent, config)?;

        Ok(SpotifyClient {
            agent,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            market: config.market.clone(),
            auth_header: format!("Bearer {token}"),
            limiter: BlockingRateLimiter::new(config.rate_limit)?,
            max_retries: config.max_retries,
        })
    }

    /// Rate-limited GET returning `Ok(None)` on 404.
    /// 429 responses are retried after the server's `Retry-After` delay.
    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        let mut attempt = 0;
        loop {
            self.limiter.wait();
            debug!("GET {url}");

            match self
                .agent
                .get(url)
                .set("Authorization", &self.auth_header)
                .call()
            {
                Ok(response) => {
                    let parsed = response
                        .into_json()
                        .with_context(|| format!("Failed to parse response from {url}"))?;
                    return Ok(Some(parsed));
                }
                Err(ureq::Error::Status(code, response)) => {
                    match classify_status(code, attempt, self.max_retries) {
                        StatusAction::NoData => return Ok(None),
                        StatusAction::Retry => {
                            attempt += 1;
                            let delay = retry_after(response.header("Retry-After"));
                            warn!(
                                "Rate limited by catalog, retrying in {:?} (attempt {}/{})",
                                delay, attempt, self.max_retries
                            );
                            std::thread::sleep(delay);
                        }
                        StatusAction::Fail => {
                            let body = response.into_string().unwrap_or_default();
                            error!("Failed request to {url}: {code} - {body}");
                            return Err(anyhow!("Catalog returned status {} for {}", code, url));
                        }
                    }
                }
                Err(e) => return Err(anyhow!("HTTP request to {} failed: {}", url, e)),
            }
        }
    }

    /// Collect the ids of every track on the album, following pagination
    fn track_ids(&self, album_id: &str) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let mut next = Some(format!(
            "{}/v1/albums/{}/tracks?market={}&limit={}",
            self.api_url,
            encode(album_id),
            encode(&self.market),
            TRACKS_PAGE_SIZE
        ));

        while let Some(url) = next {
            let page: AlbumTracksPage = self
                .get_json(&url)?
                .ok_or_else(|| anyhow!("Album {} has no track listing", album_id))?;
            ids.extend(page.items.into_iter().filter_map(|track| track.id));
            next = page.next.map(|link| rebase_onto(&self.api_url, &link));
        }

        Ok(ids)
    }
}

impl CatalogApi for SpotifyClient {
    fn album_metadata(&self, album_id: &str) -> Result<Option<AlbumMetadata>> {
        let url = format!(
            "{}/v1/albums/{}?market={}",
            self.api_url,
            encode(album_id),
            encode(&self.market)
        );
        self.get_json(&url)
    }

    fn tracks_and_features(&self, album_id: &str) -> Result<Vec<Option<RawTrackFeature>>> {
        let ids = self.track_ids(album_id)?;
        let mut features = Vec::with_capacity(ids.len());

        for chunk in ids.chunks(MAX_FEATURE_IDS) {
            let url = format!(
                "{}/v1/audio-features?ids={}",
                self.api_url,
                encode(&chunk.join(","))
            );
            let response: AudioFeaturesResponse = self
                .get_json(&url)?
                .ok_or_else(|| anyhow!("No audio features returned for album {}", album_id))?;
            features.extend(decode_features(album_id, response.audio_features));
        }

        Ok(features)
    }
}

/// Decode each entry on its own so one malformed track does not hide the others
pub fn decode_features(
    album_id: &str,
    entries: Vec<Option<serde_json::Value>>,
) -> Vec<Option<RawTrackFeature>> {
    entries
        .into_iter()
        .map(|entry| {
            let value = entry?;
            match serde_json::from_value::<RawTrackFeature>(value) {
                Ok(track) => Some(track),
                Err(e) => {
                    warn!("Discarding malformed audio features on album {album_id}: {e}");
                    None
                }
            }
        })
        .collect()
}

fn request_token(agent: &Agent, config: &Config) -> Result<String> {
    let url = format!("{}/api/token", config.accounts_url.trim_end_matches('/'));
    let response = agent
        .post(&url)
        .set("Authorization", &basic_auth(&config.client_id, &config.client_secret))
        .send_form(&[("grant_type", "client_credentials")])
        .map_err(|e| anyhow!("Token request failed: {}", e))?;

    let token: TokenResponse = response
        .into_json()
        .context("Failed to parse token response")?;
    Ok(token.access_token)
}

fn basic_auth(client_id: &str, client_secret: &str) -> String {
    format!(
        "Basic {}",
        STANDARD.encode(format!("{client_id}:{client_secret}"))
    )
}

/// How `get_json` reacts to an error status from the catalog
#[derive(Debug, PartialEq, Eq)]
enum StatusAction {
    /// The resource does not exist, a valid empty answer
    NoData,
    Retry,
    Fail,
}

fn classify_status(status: u16, attempt: u32, max_retries: u32) -> StatusAction {
    match status {
        404 => StatusAction::NoData,
        429 if attempt < max_retries => StatusAction::Retry,
        _ => StatusAction::Fail,
    }
}

/// Pagination links are absolute; keep them on the configured API host
fn rebase_onto(api_url: &str, link: &str) -> String {
    match link.find("/v1/") {
        Some(start) => format!("{}{}", api_url, &link[start..]),
        None => link.to_string(),
    }
}

fn retry_after(header: Option<&str>) -> Duration {
    header
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(1))
}
