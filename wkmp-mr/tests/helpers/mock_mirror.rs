//! wiremock-backed mirror

use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const SEARCH_PATH: &str = "/search/";

pub struct MockMirror {
    server: MockServer,
}

impl MockMirror {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn server(&self) -> &MockServer {
        &self.server
    }

    /// Answer `GET /search/?{param}={query}` with `body`, expecting `times` calls
    pub async fn search_json(&self, param: &str, query: &str, body: Value, times: u64) {
        Mock::given(method("GET"))
            .and(path(SEARCH_PATH))
            .and(query_param(param, query))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Answer `GET /search/?{param}={query}` with a raw status and body
    pub async fn search_raw(&self, param: &str, query: &str, status: u16, body: &str, times: u64) {
        Mock::given(method("GET"))
            .and(path(SEARCH_PATH))
            .and(query_param(param, query))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Every request gets `status`
    pub async fn fail_everything(&self, status: u16) {
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Every request hangs for `delay` before answering 200
    pub async fn stall_everything(&self, delay: Duration) {
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(200).set_body_string("{}").set_delay(delay))
            .mount(&self.server)
            .await;
    }

    /// Answer `{method} {path}?id={id}` with `status`
    pub async fn resource(&self, verb: &str, route: &str, id: &str, status: u16, times: u64) {
        Mock::given(method(verb))
            .and(path(route))
            .and(query_param("id", id))
            .respond_with(ResponseTemplate::new(status))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    pub async fn requests(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }
}

/// `{"items": [...]}` track payload from `(id, title, artist)` triples
pub fn track_page(tracks: &[(&str, &str, &str)]) -> Value {
    let items: Vec<Value> = tracks
        .iter()
        .map(|(id, title, artist)| {
            json!({
                "id": id,
                "title": title,
                "artist": { "name": artist },
                "audioQuality": "LOSSLESS",
            })
        })
        .collect();
    json!({ "items": items })
}

/// Album payload from `(id, title, artist)` triples
pub fn album_page(albums: &[(&str, &str, &str)]) -> Value {
    let items: Vec<Value> = albums
        .iter()
        .map(|(id, title, artist)| {
            json!({
                "id": id,
                "title": title,
                "artists": [{ "name": artist }],
            })
        })
        .collect();
    json!({ "albums": { "items": items } })
}

/// Artist payload from `(id, name)` pairs
pub fn artist_page(artists: &[(&str, &str)]) -> Value {
    let items: Vec<Value> = artists
        .iter()
        .map(|(id, name)| json!({ "id": id, "name": name }))
        .collect();
    json!({ "artists": { "items": items } })
}
