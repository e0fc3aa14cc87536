use log::info;
use rouille::{Request, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::{Arc, MutexGuard};

use crate::{
    config::HttpConfig,
    domain::{track::TrackRecord, youtube},
    http::error::ApiError,
    ingest::{
        error::IngestError,
        gateway::{Gateway, IngestAck},
    },
    library::{
        filter::TrackFilter,
        playlist::{AddOutcome, Playlist, PlaylistStore, PlaylistSummary, SharedPlaylists},
        stats::LibraryStats,
        store::{SharedStore, TrackStore},
    },
    notify::Origin,
};

pub struct HttpServer {
    gateway: Arc<Gateway>,
    store: SharedStore,
    playlists: SharedPlaylists,
    pub config: HttpConfig,
}

impl HttpServer {
    pub fn new(
        gateway: Arc<Gateway>,
        store: SharedStore,
        playlists: SharedPlaylists,
        config: HttpConfig,
    ) -> Self {
        Self {
            gateway,
            store,
            playlists,
            config,
        }
    }

    pub fn run(self) {
        let addr = format!("{}:{}", self.config.bind_addr, self.config.port);
        rouille::start_server(addr, move |request| self.handle_request(request));
    }

    pub(crate) fn handle_request(&self, request: &Request) -> Response {
        Self::log_request(request);

        let response = rouille::router!(request,
            (POST) (/addMusic) => {
                self.handle_add_music(request)
            },
            (GET) (/tracks) => {
                Self::respond(self.list_tracks(request))
            },
            (GET) (/tracks/{id: String}) => {
                Self::respond(self.get_track(&id))
            },
            (DELETE) (/tracks/{id: String}) => {
                Self::respond(self.delete_track(&id))
            },
            (GET) (/stats) => {
                Self::respond(self.stats())
            },
            (GET) (/playlists) => {
                Self::respond(self.list_playlists())
            },
            (POST) (/playlists) => {
                Self::respond(self.create_playlist(request))
            },
            (GET) (/playlists/{id: u64}) => {
                Self::respond(self.get_playlist(id))
            },
            (DELETE) (/playlists/{id: u64}) => {
                Self::respond(self.delete_playlist(id))
            },
            (POST) (/playlists/{id: u64}/tracks/{track_id: String}) => {
                Self::respond(self.add_playlist_track(id, &track_id))
            },
            (DELETE) (/playlists/{id: u64}/tracks/{track_id: String}) => {
                Self::respond(self.remove_playlist_track(id, &track_id))
            },
            _ => Response::empty_404()
        );

        info!("Response: {} {}", request.method(), response.status_code);
        response
    }

    fn log_request(request: &Request) {
        info!("{} {}", request.method(), request.url());
    }

    fn respond(result: Result<Response, ApiError>) -> Response {
        result.unwrap_or_else(ApiError::into_response)
    }

    fn lock_store(&self) -> Result<MutexGuard<'_, TrackStore>, ApiError> {
        self.store
            .lock()
            .map_err(|e| ApiError::Internal(format!("Could not access track store under lock: {e}")))
    }

    fn lock_playlists(&self) -> Result<MutexGuard<'_, PlaylistStore>, ApiError> {
        self.playlists
            .lock()
            .map_err(|e| ApiError::Internal(format!("Could not access playlists under lock: {e}")))
    }

    /// 200 with the ack on success, 400 (500 for internal faults) with the ack otherwise
    fn handle_add_music(&self, request: &Request) -> Response {
        let result = match rouille::input::json_input::<Value>(request) {
            Ok(payload) => self.gateway.submit(&payload, Origin::Http),
            Err(e) => self.gateway.reject(
                Origin::Http,
                IngestError::MalformedPayload(format!("invalid JSON body: {e}")),
            ),
        };

        let status = match &result {
            Ok(_) => 200,
            Err(e) => ApiError::from(e).status_code(),
        };
        Response::json(&IngestAck::from(&result)).with_status_code(status)
    }

    fn list_tracks(&self, request: &Request) -> Result<Response, ApiError> {
        let filter = filter_from_request(request)?;
        let store = self.lock_store()?;
        let tracks: Vec<&TrackRecord> = store.filter(&filter);
        Ok(Response::json(&tracks))
    }

    fn get_track(&self, id: &str) -> Result<Response, ApiError> {
        let store = self.lock_store()?;
        let track = store
            .find(id)
            .ok_or_else(|| ApiError::NotFound(format!("track {id} not found")))?;
        Ok(Response::json(&TrackResponse::from_domain(track)))
    }

    fn delete_track(&self, id: &str) -> Result<Response, ApiError> {
        let removed = self.lock_store()?.remove(id);
        if removed == 0 {
            return Err(ApiError::NotFound(format!("track {id} not found")));
        }
        info!("Removed {removed} track(s) with id {id}");
        Ok(Response::json(&json!({ "removed": removed })))
    }

    fn stats(&self) -> Result<Response, ApiError> {
        let store = self.lock_store()?;
        Ok(Response::json(&LibraryStats::compute(store.tracks())))
    }

    fn list_playlists(&self) -> Result<Response, ApiError> {
        let playlists = self.lock_playlists()?;
        let summaries: Vec<PlaylistSummary> =
            playlists.playlists().iter().map(Playlist::summary).collect();
        Ok(Response::json(&summaries))
    }

    fn create_playlist(&self, request: &Request) -> Result<Response, ApiError> {
        let body: CreatePlaylistRequest = rouille::input::json_input(request)
            .map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {e}")))?;

        let tracks = {
            let store = self.lock_store()?;
            body.track_ids
                .iter()
                .map(|id| {
                    store
                        .find(id)
                        .cloned()
                        .ok_or_else(|| ApiError::BadRequest(format!("unknown track id {id}")))
                })
                .collect::<Result<Vec<_>, _>>()?
        };
        let playlist = Playlist::create(
            &body.name,
            body.description.as_deref(),
            body.cover_image.as_deref(),
            tracks,
        )?;

        let mut playlists = self.lock_playlists()?;
        let playlist = playlists.insert(playlist);
        info!(
            "Created playlist {} ({}) with {} tracks",
            playlist.id,
            playlist.name,
            playlist.tracks.len()
        );
        Ok(Response::json(playlist))
    }

    fn get_playlist(&self, id: u64) -> Result<Response, ApiError> {
        let playlists = self.lock_playlists()?;
        let playlist = playlists
            .get(id)
            .ok_or_else(|| ApiError::NotFound(format!("playlist {id} not found")))?;
        Ok(Response::json(playlist))
    }

    fn delete_playlist(&self, id: u64) -> Result<Response, ApiError> {
        if !self.lock_playlists()?.delete(id) {
            return Err(ApiError::NotFound(format!("playlist {id} not found")));
        }
        info!("Deleted playlist {id}");
        Ok(Response::json(&json!({ "removed": true })))
    }

    /// `{added: false}` when the track was already in the playlist
    fn add_playlist_track(&self, id: u64, track_id: &str) -> Result<Response, ApiError> {
        let track = self
            .lock_store()?
            .find(track_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("track {track_id} not found")))?;

        let mut playlists = self.lock_playlists()?;
        let playlist = playlists
            .get_mut(id)
            .ok_or_else(|| ApiError::NotFound(format!("playlist {id} not found")))?;
        let added = playlist.add(track) == AddOutcome::Added;
        if !added {
            info!("Track {track_id} is already in playlist {id}");
        }
        Ok(Response::json(&json!({ "added": added })))
    }

    fn remove_playlist_track(&self, id: u64, track_id: &str) -> Result<Response, ApiError> {
        let mut playlists = self.lock_playlists()?;
        let playlist = playlists
            .get_mut(id)
            .ok_or_else(|| ApiError::NotFound(format!("playlist {id} not found")))?;
        if !playlist.remove(track_id) {
            return Err(ApiError::NotFound(format!(
                "track {track_id} is not in playlist {id}"
            )));
        }
        Ok(Response::json(&json!({ "removed": true })))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePlaylistRequest {
    #[serde(default)]
    name: String,
    description: Option<String>,
    cover_image: Option<String>,
    #[serde(default)]
    track_ids: Vec<String>,
}

/// Reads `q`, comma separated `genre`/`mood`/`instrument` lists and the
/// `bpm_min`/`bpm_max`/`energy_min`/`energy_max` bounds.
fn filter_from_request(request: &Request) -> Result<TrackFilter, ApiError> {
    let defaults = TrackFilter::default();
    Ok(TrackFilter {
        search: request.get_param("q"),
        genres: list_param(request, "genre"),
        moods: list_param(request, "mood"),
        instruments: list_param(request, "instrument"),
        bpm_range: (
            number_param(request, "bpm_min")?.unwrap_or(defaults.bpm_range.0),
            number_param(request, "bpm_max")?.unwrap_or(defaults.bpm_range.1),
        ),
        energy_range: (
            number_param(request, "energy_min")?.unwrap_or(defaults.energy_range.0),
            number_param(request, "energy_max")?.unwrap_or(defaults.energy_range.1),
        ),
    })
}

fn list_param(request: &Request, name: &str) -> Vec<String> {
    request
        .get_param(name)
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn number_param(request: &Request, name: &str) -> Result<Option<f64>, ApiError> {
    request
        .get_param(name)
        .map(|v| {
            v.trim()
                .parse::<f64>()
                .map_err(|_| ApiError::BadRequest(format!("{name} must be a number, got {v:?}")))
        })
        .transpose()
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackResponse {
    #[serde(flatten)]
    track: TrackRecord,
    watch_url: Option<String>,
}

impl TrackResponse {
    fn from_domain(track: &TrackRecord) -> Self {
        Self {
            track: track.clone(),
            watch_url: track.youtube_id.as_deref().map(youtube::watch_url),
        }
    }
}

#[cfg(test)]
pub fn parse_json_response<T: serde::de::DeserializeOwned>(
    response: rouille::Response,
) -> anyhow::Result<T> {
    Ok(serde_json::from_reader(
        response.data.into_reader_and_size().0,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ingest::{
            message::{Message, MessageAdapter},
            socket::SocketFeed,
        },
        config::SocketConfig,
        library::sample::sample_tracks,
        notify::{Notification, testing::RecordingNotifier},
    };

    use rouille::Request;

    struct Fixture {
        server: HttpServer,
        store: SharedStore,
        notifier: Arc<RecordingNotifier>,
    }

    fn create_server(tracks: Vec<TrackRecord>) -> Fixture {
        let store = TrackStore::with_tracks(tracks).shared();
        let notifier = Arc::new(RecordingNotifier::default());
        let gateway = Arc::new(Gateway::new(store.clone(), notifier.clone()));
        let server = HttpServer::new(
            gateway,
            store.clone(),
            PlaylistStore::new().shared(),
            HttpConfig {
                bind_addr: "0.0.0.0".to_string(),
                port: 8080,
            },
        );
        Fixture {
            server,
            store,
            notifier,
        }
    }

    fn create_empty_server() -> Fixture {
        create_server(vec![])
    }

    fn create_sample_server() -> Fixture {
        create_server(sample_tracks().expect("sample catalogue"))
    }

    fn post_json(url: &str, body: &str) -> Request {
        Request::fake_http(
            "POST",
            url,
            vec![("Content-Type".to_owned(), "application/json".to_owned())],
            body.as_bytes().to_vec(),
        )
    }

    fn get(url: &str) -> Request {
        Request::fake_http("GET", url, vec![], vec![])
    }

    fn titles(tracks: &[TrackRecord]) -> Vec<&str> {
        tracks.iter().map(|t| t.title.as_str()).collect()
    }

    // --------------------------------------------------
    // POST /addMusic
    // --------------------------------------------------

    #[test]
    fn test_add_music_success() -> anyhow::Result<()> {
        let fx = create_empty_server();

        let response = fx.server.handle_request(&post_json(
            "/addMusic",
            r#"{"id":"h1","title":"Nights","artist":"Frank Ocean"}"#,
        ));

        assert_eq!(response.status_code, 200);
        let ack: IngestAck = parse_json_response(response)?;
        assert_eq!(ack, IngestAck::accepted("h1"));

        let store = fx.store.lock().unwrap();
        let track = store.find("h1").expect("stored track");
        assert_eq!(track.bpm, 120.0);
        assert_eq!(track.energy, 0.5);
        assert_eq!(track.loudness, -7.0);
        assert_eq!(track.duration_seconds, 180.0);
        assert!(matches!(
            fx.notifier.take().as_slice(),
            [Notification::TrackAdded { origin: Origin::Http, .. }]
        ));

        Ok(())
    }

    #[test]
    fn test_add_music_missing_fields() -> anyhow::Result<()> {
        let fx = create_empty_server();

        let response = fx.server.handle_request(&post_json("/addMusic", "{}"));

        assert_eq!(response.status_code, 400);
        let ack: IngestAck = parse_json_response(response)?;
        assert!(!ack.success);
        assert_eq!(
            ack.error.as_deref(),
            Some("missing required field(s): title, artist")
        );
        assert!(fx.store.lock().unwrap().is_empty());

        Ok(())
    }

    #[test]
    fn test_add_music_malformed_body() -> anyhow::Result<()> {
        let fx = create_empty_server();

        let response = fx.server.handle_request(&post_json("/addMusic", "{title:"));

        assert_eq!(response.status_code, 400);
        let ack: IngestAck = parse_json_response(response)?;
        assert!(ack.error.unwrap().starts_with("malformed payload: invalid JSON body"));
        assert!(fx.store.lock().unwrap().is_empty());

        Ok(())
    }

    #[test]
    fn test_add_music_without_json_content_type() {
        let fx = create_empty_server();

        let request = Request::fake_http(
            "POST",
            "/addMusic",
            vec![("Content-Type".to_owned(), "text/plain".to_owned())],
            br#"{"title":"t","artist":"a"}"#.to_vec(),
        );

        assert_eq!(fx.server.handle_request(&request).status_code, 400);
        assert!(fx.store.lock().unwrap().is_empty());
    }

    #[test]
    fn test_add_music_non_object_body() {
        let fx = create_empty_server();

        let response = fx.server.handle_request(&post_json("/addMusic", "[1,2,3]"));

        assert_eq!(response.status_code, 400);
    }

    #[test]
    fn test_add_music_requires_post() {
        let fx = create_empty_server();

        assert_eq!(fx.server.handle_request(&get("/addMusic")).status_code, 404);
    }

    // --------------------------------------------------
    // browsing
    // --------------------------------------------------

    #[test]
    fn test_list_all_tracks() -> anyhow::Result<()> {
        let fx = create_sample_server();

        let response = fx.server.handle_request(&get("/tracks"));

        assert_eq!(response.status_code, 200);
        let tracks: Vec<TrackRecord> = parse_json_response(response)?;
        assert_eq!(tracks.len(), 5);

        Ok(())
    }

    #[test]
    fn test_list_tracks_filtered() -> anyhow::Result<()> {
        let fx = create_sample_server();

        let response = fx
            .server
            .handle_request(&get("/tracks?genre=Electronic,Funk&bpm_min=100"));

        assert_eq!(response.status_code, 200);
        let tracks: Vec<TrackRecord> = parse_json_response(response)?;
        assert_eq!(titles(&tracks), vec!["Flashing Lights", "Midnight City"]);

        Ok(())
    }

    #[test]
    fn test_list_tracks_search() -> anyhow::Result<()> {
        let fx = create_sample_server();

        let response = fx.server.handle_request(&get("/tracks?q=ocean&energy_max=0.6"));

        let tracks: Vec<TrackRecord> = parse_json_response(response)?;
        assert_eq!(titles(&tracks), vec!["Thinkin Bout You"]);

        Ok(())
    }

    #[test]
    fn test_list_tracks_bad_bound() {
        let fx = create_sample_server();

        let response = fx.server.handle_request(&get("/tracks?bpm_min=fast"));

        assert_eq!(response.status_code, 400);
    }

    #[test]
    fn test_get_track_with_watch_url() -> anyhow::Result<()> {
        let fx = create_sample_server();

        let response = fx.server.handle_request(&get("/tracks/3"));

        assert_eq!(response.status_code, 200);
        let body: Value = parse_json_response(response)?;
        assert_eq!(body["title"], "Flashing Lights");
        assert_eq!(body["watchUrl"], "https://youtu.be/ZAz3aWT1wg4");

        Ok(())
    }

    #[test]
    fn test_get_track_not_found() {
        let fx = create_sample_server();

        assert_eq!(fx.server.handle_request(&get("/tracks/404")).status_code, 404);
    }

    #[test]
    fn test_delete_track() -> anyhow::Result<()> {
        let fx = create_sample_server();

        let request = Request::fake_http("DELETE", "/tracks/2", vec![], vec![]);
        let response = fx.server.handle_request(&request);

        assert_eq!(response.status_code, 200);
        let body: Value = parse_json_response(response)?;
        assert_eq!(body["removed"], 1);
        assert_eq!(fx.store.lock().unwrap().len(), 4);

        let again = fx.server.handle_request(&request);
        assert_eq!(again.status_code, 404);

        Ok(())
    }

    #[test]
    fn test_stats() -> anyhow::Result<()> {
        let fx = create_sample_server();

        let response = fx.server.handle_request(&get("/stats"));

        assert_eq!(response.status_code, 200);
        let stats: LibraryStats = parse_json_response(response)?;
        assert_eq!(stats.track_count, 5);
        assert_eq!(stats.genre_distribution[0].name, "R&B");

        Ok(())
    }

    #[test]
    fn test_unknown_route() {
        let fx = create_empty_server();

        assert_eq!(fx.server.handle_request(&get("/nope")).status_code, 404);
    }

    // --------------------------------------------------
    // /playlists
    // --------------------------------------------------

    fn request(method: &str, url: &str) -> Request {
        Request::fake_http(method, url, vec![], vec![])
    }

    #[test]
    fn test_create_and_list_playlists() -> anyhow::Result<()> {
        let fx = create_sample_server();

        let response = fx.server.handle_request(&post_json(
            "/playlists",
            r#"{"name":"Late night","coverImage":"cover.png","trackIds":["1","5","1"]}"#,
        ));
        assert_eq!(response.status_code, 200);
        let playlist: Playlist = parse_json_response(response)?;
        assert_eq!(playlist.id, 1);
        assert_eq!(titles(&playlist.tracks), vec!["Nights", "Thinkin Bout You"]);

        let response = fx.server.handle_request(&get("/playlists"));
        assert_eq!(response.status_code, 200);
        let summaries: Vec<PlaylistSummary> = parse_json_response(response)?;
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].name, "Late night");
        assert_eq!(summaries[0].track_count, 2);
        assert_eq!(summaries[0].primary_genre, "R&B");
        assert_eq!(summaries[0].cover_image.as_deref(), Some("cover.png"));

        Ok(())
    }

    #[test]
    fn test_create_empty_playlist_rejected() -> anyhow::Result<()> {
        let fx = create_sample_server();

        let response = fx
            .server
            .handle_request(&post_json("/playlists", r#"{"name":"Empty","trackIds":[]}"#));
        assert_eq!(response.status_code, 400);
        let body: Value = parse_json_response(response)?;
        assert_eq!(body["error"], "add at least one track to the playlist");

        let response = fx
            .server
            .handle_request(&post_json("/playlists", r#"{"trackIds":["1"]}"#));
        assert_eq!(response.status_code, 400);
        let body: Value = parse_json_response(response)?;
        assert_eq!(body["error"], "playlist name is required");

        let response = fx.server.handle_request(&get("/playlists"));
        let summaries: Vec<PlaylistSummary> = parse_json_response(response)?;
        assert!(summaries.is_empty());

        Ok(())
    }

    #[test]
    fn test_create_playlist_unknown_track() -> anyhow::Result<()> {
        let fx = create_sample_server();

        let response = fx
            .server
            .handle_request(&post_json("/playlists", r#"{"name":"Mix","trackIds":["1","42"]}"#));

        assert_eq!(response.status_code, 400);
        let body: Value = parse_json_response(response)?;
        assert_eq!(body["error"], "unknown track id 42");

        Ok(())
    }

    #[test]
    fn test_playlist_add_and_remove_tracks() -> anyhow::Result<()> {
        let fx = create_sample_server();
        fx.server
            .handle_request(&post_json("/playlists", r#"{"name":"Mix","trackIds":["1"]}"#));

        let response = fx.server.handle_request(&request("POST", "/playlists/1/tracks/2"));
        assert_eq!(response.status_code, 200);
        let body: Value = parse_json_response(response)?;
        assert_eq!(body, json!({"added": true}));

        let response = fx.server.handle_request(&request("POST", "/playlists/1/tracks/2"));
        let body: Value = parse_json_response(response)?;
        assert_eq!(body, json!({"added": false}));

        let response = fx.server.handle_request(&request("DELETE", "/playlists/1/tracks/1"));
        assert_eq!(response.status_code, 200);
        let response = fx.server.handle_request(&request("DELETE", "/playlists/1/tracks/1"));
        assert_eq!(response.status_code, 404);

        let response = fx.server.handle_request(&get("/playlists/1"));
        let playlist: Playlist = parse_json_response(response)?;
        assert_eq!(titles(&playlist.tracks), vec!["Redbone"]);

        let response = fx.server.handle_request(&request("POST", "/playlists/1/tracks/42"));
        assert_eq!(response.status_code, 404);
        let response = fx.server.handle_request(&request("POST", "/playlists/9/tracks/1"));
        assert_eq!(response.status_code, 404);

        Ok(())
    }

    #[test]
    fn test_delete_playlist() {
        let fx = create_sample_server();
        fx.server
            .handle_request(&post_json("/playlists", r#"{"name":"Mix","trackIds":["3"]}"#));

        assert_eq!(
            fx.server.handle_request(&request("DELETE", "/playlists/1")).status_code,
            200
        );
        assert_eq!(fx.server.handle_request(&get("/playlists/1")).status_code, 404);
        assert_eq!(
            fx.server.handle_request(&request("DELETE", "/playlists/1")).status_code,
            404
        );
        // the library keeps the track
        assert!(fx.store.lock().unwrap().contains("3"));
    }

    // --------------------------------------------------
    // every transport stores the same record
    // --------------------------------------------------

    #[test]
    fn test_cross_transport_equivalence() -> anyhow::Result<()> {
        let payload = json!({
            "title": "Midnight City",
            "artist": "M83",
            "bpm": "fast",
            "energy": 0.9,
            "p_genre": [{"genre": "Electronic", "score": 0.9}],
            "youtubeId": "dX3k_QDnzHE"
        });

        let fx = create_empty_server();
        let gateway = Arc::clone(&fx.server.gateway);

        let via_http = fx
            .server
            .handle_request(&post_json("/addMusic", &payload.to_string()));
        assert_eq!(via_http.status_code, 200);

        let adapter = MessageAdapter::new("app://musicdeck", Arc::clone(&gateway));
        let ack = adapter.handle(&Message {
            origin: "app://musicdeck".into(),
            data: json!({"type": "ADD_MUSIC_TRACK", "track": payload.clone()}),
            reply_to: None,
        });
        assert!(ack.map(|a| a.success).unwrap_or(false));

        let feed = SocketFeed::new(
            SocketConfig {
                addr: "unused".into(),
                reconnect_delay_ms: 10,
            },
            gateway,
        );
        let frame = json!({"type": "ADD_MUSIC_TRACK", "track": payload}).to_string();
        let response: Value = serde_json::from_str(&feed.handle_frame(frame.as_bytes()))?;
        assert_eq!(response["success"], true);

        let store = fx.store.lock().unwrap();
        let records: Vec<TrackRecord> = store
            .tracks()
            .iter()
            .map(|t| TrackRecord {
                id: String::new(),
                ..t.clone()
            })
            .collect();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0], records[1]);
        assert_eq!(records[1], records[2]);
        assert_eq!(records[0].bpm, 120.0);

        Ok(())
    }
}
