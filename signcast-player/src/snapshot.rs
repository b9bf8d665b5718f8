use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::playback::MIN_SLIDE_DURATION;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("content request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("server returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed content payload: {0}")]
    Shape(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct DisplayProfile {
    pub id: i32,
    pub name: String,
    pub width: i32,
    pub height: i32,
    pub orientation: String,
}

#[derive(Debug, Clone)]
pub struct SlideItem {
    pub id: i32,
    pub source_url: String,
    pub duration: Duration,
}

/// In-memory mirror of this display's server-side assignment. Replaced
/// wholesale on every refresh; never merged.
#[derive(Debug, Clone, Default)]
pub enum Snapshot {
    /// Nothing fetched yet
    #[default]
    Unsynced,
    /// The server has no record of this display
    Missing,
    /// Latest known assignment; `slides` is empty when nothing is assigned
    Ready {
        display: DisplayProfile,
        slides: Vec<SlideItem>,
    },
}

// Wire types for /api/displays/:id/content. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct ContentResponse {
    display: WireDisplay,
    playlist: Option<WirePlaylist>,
}

#[derive(Debug, Deserialize)]
struct WireDisplay {
    id: i32,
    name: String,
    width: i32,
    height: i32,
    orientation: String,
}

#[derive(Debug, Deserialize)]
struct WirePlaylist {
    slides: Vec<WireSlide>,
}

#[derive(Debug, Deserialize)]
struct WireSlide {
    id: i32,
    kind: String,
    source_url: String,
    duration_secs: i32,
    position: i32,
}

pub struct SnapshotStore {
    config: Arc<Config>,
    client: reqwest::Client,
    inner: RwLock<Snapshot>,
}

impl SnapshotStore {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            inner: RwLock::new(Snapshot::Unsynced),
        }
    }

    pub async fn current(&self) -> Snapshot {
        self.inner.read().await.clone()
    }

    /// Fetches the full assignment and swaps it in. On transport or server
    /// errors the previous snapshot stays in place; only a successful fetch
    /// (including a definitive 404) overwrites it.
    pub async fn refresh(&self) -> Result<(), SnapshotError> {
        let url = format!(
            "{}/api/displays/{}/content",
            api_base_url(&self.config.server_url),
            self.config.display_id
        );

        let response = self
            .client
            .get(&url)
            .header("X-Display-Secret", &self.config.secret_key)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::warn!("Display {} is unknown to the server", self.config.display_id);
            *self.inner.write().await = Snapshot::Missing;
            return Ok(());
        }

        if !response.status().is_success() {
            return Err(SnapshotError::Status(response.status()));
        }

        let body = response.text().await?;
        let (profile, slides) = parse_content(&body)?;

        tracing::info!(
            "Content sync: display '{}' ({}x{} {}), {} slide(s)",
            profile.name,
            profile.width,
            profile.height,
            profile.orientation,
            slides.len()
        );

        *self.inner.write().await = Snapshot::Ready { display: profile, slides };
        Ok(())
    }
}

/// Boundary mapping from the wire payload into domain types. Shape mismatches
/// fail loudly instead of propagating missing fields.
fn parse_content(body: &str) -> Result<(DisplayProfile, Vec<SlideItem>), serde_json::Error> {
    let parsed: ContentResponse = serde_json::from_str(body)?;

    let display = DisplayProfile {
        id: parsed.display.id,
        name: parsed.display.name,
        width: parsed.display.width,
        height: parsed.display.height,
        orientation: parsed.display.orientation,
    };

    let slides = parsed
        .playlist
        .map(|p| map_slides(p.slides))
        .unwrap_or_default();

    Ok((display, slides))
}

fn map_slides(mut wire: Vec<WireSlide>) -> Vec<SlideItem> {
    // Position is a sort key only; duplicates and gaps are tolerated
    wire.sort_by_key(|s| s.position);

    wire.into_iter()
        .filter_map(|s| {
            if s.kind != "image" {
                tracing::warn!("Skipping slide {} with unsupported kind '{}'", s.id, s.kind);
                return None;
            }

            let duration = if s.duration_secs < 1 {
                tracing::warn!(
                    "Slide {} has invalid duration {}s, clamping to {}s",
                    s.id,
                    s.duration_secs,
                    MIN_SLIDE_DURATION.as_secs()
                );
                MIN_SLIDE_DURATION
            } else {
                Duration::from_secs(s.duration_secs as u64)
            };

            Some(SlideItem {
                id: s.id,
                source_url: s.source_url,
                duration,
            })
        })
        .collect()
}

/// Derive the HTTP API base from the configured WebSocket URL.
pub fn api_base_url(server_url: &str) -> String {
    let base = server_url
        .replace("ws://", "http://")
        .replace("wss://", "https://");
    base.split("/ws").next().unwrap_or(&base).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_base_from_ws_url() {
        assert_eq!(
            api_base_url("ws://127.0.0.1:8080/ws"),
            "http://127.0.0.1:8080"
        );
        assert_eq!(
            api_base_url("wss://signage.example.com/ws"),
            "https://signage.example.com"
        );
    }

    #[test]
    fn parses_full_payload() {
        let body = r#"{
            "display": {"id": 3, "name": "Lobby", "location": "Entrance",
                        "width": 1920, "height": 1080, "orientation": "landscape",
                        "assigned_playlist_id": 1, "status": "online"},
            "playlist": {"id": 1, "name": "Welcome Loop", "slides": [
                {"id": 11, "playlist_id": 1, "kind": "image",
                 "source_url": "https://cdn.example.com/a.jpg",
                 "duration_secs": 10, "position": 0},
                {"id": 12, "playlist_id": 1, "kind": "image",
                 "source_url": "https://cdn.example.com/b.jpg",
                 "duration_secs": 8, "position": 1}
            ]}
        }"#;

        let (display, slides) = parse_content(body).unwrap();
        assert_eq!(display.id, 3);
        assert_eq!(display.orientation, "landscape");
        assert_eq!(slides.len(), 2);
        assert_eq!(slides[0].id, 11);
        assert_eq!(slides[0].duration, Duration::from_secs(10));
    }

    #[test]
    fn unassigned_display_yields_no_slides() {
        let body = r#"{
            "display": {"id": 3, "name": "Lobby", "width": 1080, "height": 1920,
                        "orientation": "portrait"},
            "playlist": null
        }"#;

        let (_, slides) = parse_content(body).unwrap();
        assert!(slides.is_empty());
    }

    #[test]
    fn malformed_payload_is_rejected() {
        assert!(parse_content(r#"{"playlist": null}"#).is_err());
        assert!(parse_content("not json").is_err());
    }

    fn wire_slide(id: i32, kind: &str, duration_secs: i32, position: i32) -> WireSlide {
        WireSlide {
            id,
            kind: kind.to_string(),
            source_url: format!("https://cdn.example.com/{}.jpg", id),
            duration_secs,
            position,
        }
    }

    #[test]
    fn slides_sort_by_position_with_gaps_and_duplicates() {
        let slides = map_slides(vec![
            wire_slide(1, "image", 5, 40),
            wire_slide(2, "image", 5, 0),
            wire_slide(3, "image", 5, 40),
            wire_slide(4, "image", 5, 7),
        ]);

        let order: Vec<i32> = slides.iter().map(|s| s.id).collect();
        assert_eq!(order[0], 2);
        assert_eq!(order[1], 4);
        // Duplicate positions keep their relative order
        assert_eq!(&order[2..], &[1, 3]);
    }

    #[test]
    fn invalid_durations_are_clamped() {
        let slides = map_slides(vec![
            wire_slide(1, "image", 0, 0),
            wire_slide(2, "image", -5, 1),
        ]);

        assert_eq!(slides[0].duration, MIN_SLIDE_DURATION);
        assert_eq!(slides[1].duration, MIN_SLIDE_DURATION);
    }

    #[test]
    fn unsupported_kinds_are_skipped() {
        let slides = map_slides(vec![
            wire_slide(1, "video", 5, 0),
            wire_slide(2, "image", 5, 1),
        ]);

        assert_eq!(slides.len(), 1);
        assert_eq!(slides[0].id, 2);
    }
}
