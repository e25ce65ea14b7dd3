//! In-process Subsonic server used by the provider tests.
#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use provider_subsonic::client::token;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Mutex;
use url::Url;

pub const SERVER: &str = "https://music.example.com";
pub const USERNAME: &str = "alice";
pub const PASSWORD: &str = "sesame";

const CREATED: &str = "2024-03-01T12:00:00.000Z";

#[derive(Debug, Clone)]
pub struct Call {
    pub method: String,
    pub params: Vec<(String, String)>,
}

impl Call {
    pub fn values(&self, key: &str) -> Vec<&str> {
        self.params
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

#[derive(Default)]
struct State {
    albums: Vec<Value>,
    album_songs: BTreeMap<String, Vec<Value>>,
    songs: BTreeMap<String, Value>,
    playlists: BTreeMap<String, (String, Vec<String>)>,
    next_playlist_id: u32,
    http_status: Option<u16>,
    offline: bool,
    calls: Vec<Call>,
}

#[derive(Default)]
pub struct FakeServer {
    state: Mutex<State>,
}

fn ok(result: Value) -> Value {
    let mut body = json!({"status": "ok", "version": "1.16.1"});
    if let (Some(body), Some(result)) = (body.as_object_mut(), result.as_object()) {
        body.extend(result.clone());
    }
    json!({ "subsonic-response": body })
}

fn failed(code: i32, message: &str) -> Value {
    json!({"subsonic-response": {
        "status": "failed",
        "version": "1.16.1",
        "error": {"code": code, "message": message}
    }})
}

impl FakeServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_album(&self, id: &str, name: &str, artist_id: &str) {
        let mut state = self.state.lock().unwrap();
        state.albums.push(json!({
            "id": id, "name": name, "artist": "Artist", "artistId": artist_id,
            "coverArt": id, "songCount": 1, "duration": 200, "created": CREATED
        }));
    }

    pub fn add_song(&self, id: &str, title: &str, album_id: &str) {
        self.add_song_value(json!({
            "id": id, "title": title, "album": "Album", "albumId": album_id,
            "artist": "Artist", "artistId": "ar-1", "duration": 200,
            "contentType": "audio/mpeg", "type": "music"
        }), album_id);
    }

    pub fn add_song_in_genre(&self, id: &str, title: &str, album_id: &str, genre: &str) {
        self.add_song_value(json!({
            "id": id, "title": title, "album": "Album", "albumId": album_id,
            "artist": "Artist", "artistId": "ar-1", "duration": 200, "genre": genre,
            "contentType": "audio/mpeg", "type": "music"
        }), album_id);
    }

    pub fn add_video(&self, id: &str, album_id: &str) {
        self.add_song_value(
            json!({"id": id, "title": "Clip", "albumId": album_id, "type": "video"}),
            album_id,
        );
    }

    fn add_song_value(&self, song: Value, album_id: &str) {
        let mut state = self.state.lock().unwrap();
        let id = song["id"].as_str().unwrap_or_default().to_string();
        state
            .album_songs
            .entry(album_id.to_string())
            .or_default()
            .push(song.clone());
        state.songs.insert(id, song);
    }

    pub fn add_playlist(&self, id: &str, name: &str, song_ids: &[&str]) {
        let mut state = self.state.lock().unwrap();
        state.playlists.insert(
            id.to_string(),
            (name.to_string(), song_ids.iter().map(|s| s.to_string()).collect()),
        );
    }

    pub fn playlist_songs(&self, id: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .playlists
            .get(id)
            .map(|(_, songs)| songs.clone())
            .unwrap_or_default()
    }

    pub fn playlist_names(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.playlists.values().map(|(name, _)| name.clone()).collect()
    }

    pub fn fail_with_http_status(&self, status: u16) {
        self.state.lock().unwrap().http_status = Some(status);
    }

    pub fn go_offline(&self) {
        self.state.lock().unwrap().offline = true;
    }

    pub fn calls(&self, method: &str) -> Vec<Call> {
        let state = self.state.lock().unwrap();
        state
            .calls
            .iter()
            .filter(|call| call.method == method)
            .cloned()
            .collect()
    }

    fn playlist_json(id: &str, name: &str, songs: &[String], state: &State) -> Value {
        json!({
            "id": id, "name": name, "owner": USERNAME, "public": false,
            "songCount": songs.len(), "created": CREATED, "changed": CREATED,
            "entry": songs.iter().filter_map(|s| state.songs.get(s).cloned()).collect::<Vec<_>>()
        })
    }

    fn handle(&self, call: &Call) -> Value {
        let mut state = self.state.lock().unwrap();
        let first = |key: &str| call.values(key).first().map(|v| v.to_string());

        let authenticated = match (first("t"), first("s"), first("p")) {
            (Some(t), Some(s), None) => t == token(PASSWORD, &s),
            (None, None, Some(p)) => p == PASSWORD,
            _ => false,
        };
        if first("u").as_deref() != Some(USERNAME) || !authenticated {
            return failed(40, "Wrong username or password");
        }

        match call.method.as_str() {
            "ping" => ok(json!({})),
            "getAlbumList2" => ok(json!({"albumList2": {"album": state.albums}})),
            "getAlbum" => {
                let id = first("id").unwrap_or_default();
                match state.albums.iter().find(|a| a["id"] == id.as_str()) {
                    Some(album) => {
                        let mut album = album.clone();
                        album["song"] = json!(state.album_songs.get(&id).cloned().unwrap_or_default());
                        ok(json!({ "album": album }))
                    }
                    None => failed(70, "Album not found"),
                }
            }
            "getGenres" => {
                let mut counts: BTreeMap<String, u32> = BTreeMap::new();
                for genre in state.songs.values().filter_map(|song| song["genre"].as_str()) {
                    *counts.entry(genre.to_string()).or_default() += 1;
                }
                let genres: Vec<Value> = counts
                    .into_iter()
                    .map(|(value, songs)| json!({"value": value, "songCount": songs, "albumCount": 1}))
                    .collect();
                ok(json!({"genres": {"genre": genres}}))
            }
            "getSongsByGenre" => {
                let genre = first("genre").unwrap_or_default();
                let songs: Vec<Value> = state
                    .songs
                    .values()
                    .filter(|song| song["genre"].as_str() == Some(genre.as_str()))
                    .cloned()
                    .collect();
                ok(json!({"songsByGenre": {"song": songs}}))
            }
            "getPlaylists" => {
                let playlists: Vec<Value> = state
                    .playlists
                    .iter()
                    .map(|(id, (name, songs))| {
                        let mut value = Self::playlist_json(id, name, songs, &state);
                        if let Some(object) = value.as_object_mut() {
                            object.remove("entry");
                        }
                        value
                    })
                    .collect();
                ok(json!({"playlists": {"playlist": playlists}}))
            }
            "getPlaylist" => {
                let id = first("id").unwrap_or_default();
                match state.playlists.get(&id) {
                    Some((name, songs)) => {
                        ok(json!({"playlist": Self::playlist_json(&id, name, songs, &state)}))
                    }
                    None => failed(70, "Playlist not found"),
                }
            }
            "createPlaylist" => {
                state.next_playlist_id += 1;
                let id = format!("new-{}", state.next_playlist_id);
                let name = first("name").unwrap_or_default();
                state.playlists.insert(id, (name, Vec::new()));
                ok(json!({}))
            }
            "updatePlaylist" => {
                let id = first("playlistId").unwrap_or_default();
                let Some((name, songs)) = state.playlists.get_mut(&id) else {
                    return failed(70, "Playlist not found");
                };
                if let Some(new_name) = call.values("name").first() {
                    *name = new_name.to_string();
                }
                let mut removals: Vec<usize> = call
                    .values("songIndexToRemove")
                    .iter()
                    .filter_map(|v| v.parse().ok())
                    .collect();
                removals.sort_unstable_by(|a, b| b.cmp(a));
                for index in removals {
                    if index < songs.len() {
                        songs.remove(index);
                    }
                }
                songs.extend(call.values("songIdToAdd").iter().map(|s| s.to_string()));
                ok(json!({}))
            }
            "deletePlaylist" => {
                let id = first("id").unwrap_or_default();
                match state.playlists.remove(&id) {
                    Some(_) => ok(json!({})),
                    None => failed(70, "Playlist not found"),
                }
            }
            _ => failed(0, "Unknown method"),
        }
    }
}

#[async_trait]
impl HttpClient for FakeServer {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let url = Url::parse(&request.url)
            .map_err(|e| BridgeError::OperationFailed(e.to_string()))?;
        let call = Call {
            method: url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .unwrap_or_default()
                .to_string(),
            params: url.query_pairs().into_owned().collect(),
        };

        {
            let mut state = self.state.lock().unwrap();
            if state.offline {
                return Err(BridgeError::Network("connection refused".into()));
            }
            state.calls.push(call.clone());
            if let Some(status) = state.http_status {
                return Ok(HttpResponse::new(status, "Service Unavailable"));
            }
        }

        Ok(HttpResponse::new(200, self.handle(&call).to_string()))
    }
}
