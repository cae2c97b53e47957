use crate::models::Note;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ApiErrorKind {
    /// Transport unreachable (DNS, refused, CORS, offline).
    Network,
    /// Non-2xx response without a more specific meaning.
    Remote,
    /// The addressed note does not exist remotely.
    NotFound,
    /// The service rejected the submitted content.
    Validation,
    /// 2xx response whose body did not match the contract.
    Parse,
}

#[derive(Clone, Debug)]
pub(crate) struct ApiError {
    pub kind: ApiErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ApiError {
    fn network(e: reqwest::Error) -> Self {
        Self {
            kind: ApiErrorKind::Network,
            status: None,
            message: e.to_string(),
        }
    }

    fn parse(e: impl std::fmt::Display) -> Self {
        Self {
            kind: ApiErrorKind::Parse,
            status: None,
            message: e.to_string(),
        }
    }

    fn remote(status: reqwest::StatusCode, body: String, ctx: &str) -> Self {
        Self {
            kind: classify_status(status.as_u16()),
            status: Some(status.as_u16()),
            message: format!("{ctx} ({status}): {body}"),
        }
    }
}

/// Map a non-2xx status onto the error taxonomy. The client only
/// distinguishes NotFound and Validation; everything else is generic.
pub(crate) fn classify_status(status: u16) -> ApiErrorKind {
    match status {
        404 => ApiErrorKind::NotFound,
        400 | 422 => ApiErrorKind::Validation,
        _ => ApiErrorKind::Remote,
    }
}

pub(crate) type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct EnvConfig {
    pub api_url: String,
}

impl EnvConfig {
    pub fn new() -> Self {
        let default_api_url = "http://localhost:8080".to_string();

        // We support BOTH `window.ENV.API_URL` (documented in README) and
        // `window.ENV.api_url` (legacy/implementation detail) for compatibility.
        if let Some(window) = web_sys::window() {
            if let Some(env) = window.get("ENV") {
                if !env.is_undefined() && env.is_object() {
                    // 1) Prefer README style: API_URL
                    if let Ok(api_url) = js_sys::Reflect::get(&env, &"API_URL".into()) {
                        if let Some(url_str) = api_url.as_string() {
                            return Self { api_url: url_str };
                        }
                    }

                    // 2) Fallback: api_url
                    if let Ok(api_url) = js_sys::Reflect::get(&env, &"api_url".into()) {
                        if let Some(url_str) = api_url.as_string() {
                            return Self { api_url: url_str };
                        }
                    }
                }
            }
        }

        Self {
            api_url: default_api_url,
        }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn get_api_url() -> String {
    EnvConfig::new().api_url
}

/// Body for both create (POST) and update (PUT). The service derives the
/// title from the content; a full-content replace is the only write shape.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct SaveNoteRequest {
    pub content: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct CreatedNote {
    pub id: String,
}

#[derive(Clone)]
pub(crate) struct ApiClient {
    pub(crate) base_url: String,
}

impl ApiClient {
    #[allow(dead_code)]
    pub fn new(base_url: String) -> Self {
        Self { base_url }
    }

    pub fn from_env() -> Self {
        Self {
            base_url: get_api_url(),
        }
    }

    pub(crate) fn notes_url(&self) -> String {
        format!("{}/api/notes", self.base_url)
    }

    pub(crate) fn note_url(&self, id: &str) -> String {
        format!("{}/api/notes/{}", self.base_url, urlencoding::encode(id))
    }

    pub(crate) fn search_url(&self, query: &str) -> String {
        format!("{}/api/search?q={}", self.base_url, urlencoding::encode(query))
    }

    async fn execute(
        &self,
        method: reqwest::Method,
        url: String,
        body: Option<&SaveNoteRequest>,
        ctx: &str,
    ) -> ApiResult<reqwest::Response> {
        let client = reqwest::Client::new();
        let mut req = client.request(method, url);

        if let Some(b) = body {
            req = req.json(b);
        }

        let res = req.send().await.map_err(ApiError::network)?;

        if res.status().is_success() {
            Ok(res)
        } else {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            Err(ApiError::remote(status, body, ctx))
        }
    }

    /// Full collection, content omitted. Ordering is the sidebar's concern.
    pub async fn list(&self) -> ApiResult<Vec<Note>> {
        let res = self
            .execute(reqwest::Method::GET, self.notes_url(), None, "List failed")
            .await?;
        res.json().await.map_err(ApiError::parse)
    }

    pub async fn get(&self, id: &str) -> ApiResult<Note> {
        let res = self
            .execute(reqwest::Method::GET, self.note_url(id), None, "Get failed")
            .await?;
        res.json().await.map_err(ApiError::parse)
    }

    pub async fn create(&self, content: &str) -> ApiResult<CreatedNote> {
        let res = self
            .execute(
                reqwest::Method::POST,
                self.notes_url(),
                Some(&SaveNoteRequest {
                    content: content.to_string(),
                }),
                "Create failed",
            )
            .await?;
        res.json().await.map_err(ApiError::parse)
    }

    /// Full-content replace; there is no patch shape.
    pub async fn update(&self, id: &str, content: &str) -> ApiResult<()> {
        self.execute(
            reqwest::Method::PUT,
            self.note_url(id),
            Some(&SaveNoteRequest {
                content: content.to_string(),
            }),
            "Update failed",
        )
        .await?;
        Ok(())
    }

    /// Idempotent from the caller's point of view: deleting an id that is
    /// already gone reports success, so delete flows never branch on 404.
    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        match self
            .execute(
                reqwest::Method::DELETE,
                self.note_url(id),
                None,
                "Delete failed",
            )
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.kind == ApiErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Ranked results; `content` carries a pre-highlighted excerpt which the
    /// caller must sanitize before trusting. Empty queries are the caller's
    /// job to suppress, but a stray one short-circuits here instead of
    /// hitting the service with a request it would reject.
    pub async fn search(&self, query: &str) -> ApiResult<Vec<Note>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(vec![]);
        }

        let res = self
            .execute(
                reqwest::Method::GET,
                self.search_url(query),
                None,
                "Search failed",
            )
            .await?;
        res.json().await.map_err(ApiError::parse)
    }
}
