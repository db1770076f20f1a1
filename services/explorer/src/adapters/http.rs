//! services/explorer/src/adapters/http.rs
//!
//! This module contains the HTTP adapter, the concrete implementation of the
//! `ExplorerBackend` port. It talks JSON over HTTP to the report backend using
//! `reqwest` and maps the backend's wire records onto the core domain types.

use crate::adapters::sse;
use async_trait::async_trait;
use explorer_core::ports::{
    ExplorerBackend, GenerationStream, PortError, PortResult, SuggestionQuery,
};
use explorer_core::text::summarize_report;
use explorer_core::{
    Collection, CollectionUpdate, GenerateRequest, GenerationEvent, NewCollection, ReportPayload,
    SavedReport, SavedTopic, UserProfile, DEFAULT_REPORT_TITLE,
};
use reqwest::{header, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An HTTP adapter that implements the `ExplorerBackend` port.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    api_base: String,
}

impl HttpBackend {
    /// Creates a new `HttpBackend` for the given API base (e.g. `http://host/api`).
    pub fn new(api_base: impl Into<String>, connect_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn url(&self, path: &str, params: &[(&str, String)]) -> PortResult<Url> {
        let raw = format!("{}{}", self.api_base, path);
        Url::parse_with_params(&raw, params)
            .map_err(|e| PortError::Unexpected(format!("Invalid API URL '{}': {}", raw, e)))
    }

    /// Builds a user-scoped URL. Fails before any network call when the user has no email.
    fn user_url(&self, path: &str, user: &UserProfile, extra: &[(&str, String)]) -> PortResult<Url> {
        let mut params = user_params(user)?;
        params.extend(extra.iter().cloned());
        self.url(path, &params)
    }

    /// A user-scoped URL for one item. The id is appended as an encoded path segment.
    fn item_url(&self, path: &str, id: &str, user: &UserProfile) -> PortResult<Url> {
        let mut url = self.user_url(path, user, &[])?;
        url.path_segments_mut()
            .map_err(|()| {
                PortError::Unexpected(format!("API base '{}' cannot take a path", self.api_base))
            })?
            .push(id);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> PortResult<Response> {
        request
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(%method, %url, "Backend request");
        self.client.request(method, url)
    }
}

/// Query parameters identifying the user.
fn user_params(user: &UserProfile) -> PortResult<Vec<(&'static str, String)>> {
    let email = user.email().ok_or(PortError::MissingIdentity)?;
    let mut params = vec![("user_email", email.to_string())];
    if let Some(username) = user.username() {
        params.push(("username", username.to_string()));
    }
    Ok(params)
}

/// Maps a non-success status to `PortError::Http` with a message like
/// "Failed to load saved topics (404)."
async fn ensure_success(response: Response, action: &str) -> PortResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(PortError::Http {
        status: status.as_u16(),
        message: format!("Failed to {} ({}).", action, status.as_u16()),
    })
}

/// Like `ensure_success`, but prefers the backend's `detail` message when present.
async fn ensure_success_with_detail(response: Response, action: &str) -> PortResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let detail = response
        .json::<Value>()
        .await
        .ok()
        .and_then(|body| body.get("detail").and_then(Value::as_str).map(str::to_string))
        .filter(|detail| !detail.trim().is_empty());
    Err(PortError::Http {
        status: status.as_u16(),
        message: detail.unwrap_or_else(|| format!("Failed to {} ({}).", action, status.as_u16())),
    })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> PortResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| PortError::Unexpected(format!("Invalid response body: {}", e)))
}

/// Reads a JSON list of records; a non-list body is treated as an empty list.
async fn read_records<T: DeserializeOwned>(response: Response) -> PortResult<Vec<T>> {
    let body: Value = read_json(response).await?;
    if !body.is_array() {
        return Ok(Vec::new());
    }
    serde_json::from_value(body).map_err(|e| PortError::Unexpected(format!("Invalid record: {}", e)))
}

//=========================================================================================
// "Impure" Wire Record Structs
//=========================================================================================

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

#[derive(Deserialize)]
struct TopicRecord {
    id: String,
    title: String,
    #[serde(default)]
    collection_id: Option<String>,
}
impl TopicRecord {
    fn to_domain(self) -> SavedTopic {
        SavedTopic {
            id: self.id,
            prompt: self.title,
            collection_id: non_empty(self.collection_id),
        }
    }
}

#[derive(Deserialize)]
struct ReportRecord {
    id: String,
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    outline: Option<Value>,
}
impl ReportRecord {
    fn to_domain(self) -> SavedReport {
        let topic = non_empty(self.topic).unwrap_or_default();
        let title = non_empty(self.title)
            .or_else(|| non_empty(Some(topic.clone())))
            .unwrap_or_else(|| DEFAULT_REPORT_TITLE.to_string());
        let content = self.content.unwrap_or_default();
        let preview = non_empty(self.summary).unwrap_or_else(|| {
            let source = [content.as_str(), title.as_str(), topic.as_str()]
                .into_iter()
                .find(|text| !text.is_empty())
                .unwrap_or("");
            summarize_report(source)
        });
        SavedReport {
            id: self.id,
            topic,
            title,
            content,
            outline: self.outline.filter(|outline| !outline.is_null()),
            preview,
        }
    }
}

#[derive(Deserialize)]
struct CollectionRecord {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    icon: Option<String>,
    #[serde(default)]
    position: Option<i64>,
    #[serde(default)]
    topic_count: Option<u32>,
}
impl CollectionRecord {
    fn to_domain(self) -> Collection {
        Collection {
            id: self.id,
            name: self.name,
            description: non_empty(self.description),
            color: non_empty(self.color),
            icon: non_empty(self.icon),
            position: self.position.unwrap_or(0),
            topic_count: self.topic_count.unwrap_or(0),
        }
    }
}

#[derive(Serialize)]
struct ModelChoice<'a> {
    model: &'a str,
}

#[derive(Serialize)]
struct SuggestionsBody<'a> {
    topic: &'a str,
    seeds: &'a [String],
    include_report_headings: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<ModelChoice<'a>>,
}

#[derive(Deserialize)]
struct SuggestionsResponse {
    #[serde(default)]
    suggestions: Value,
}

/// Suggestions arrive either as strings or as `{title}` / `{topic}` objects.
fn suggestion_titles(suggestions: &Value) -> Vec<String> {
    let Some(entries) = suggestions.as_array() else {
        return Vec::new();
    };
    entries
        .iter()
        .map(|entry| match entry {
            Value::String(title) => title.trim().to_string(),
            Value::Object(fields) => ["title", "topic"]
                .into_iter()
                .filter_map(|key| fields.get(key).and_then(Value::as_str))
                .find(|value| !value.is_empty())
                .unwrap_or("")
                .trim()
                .to_string(),
            _ => String::new(),
        })
        .filter(|title| !title.is_empty())
        .collect()
}

#[derive(Serialize)]
struct TopicBody<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    collection_id: Option<&'a str>,
}

#[derive(Serialize)]
struct TopicMoveBody<'a> {
    collection_id: Option<&'a str>,
}

#[derive(Serialize)]
struct CollectionBody<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon: Option<&'a str>,
}

fn trimmed_field(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

//=========================================================================================
// `ExplorerBackend` Trait Implementation
//=========================================================================================

#[async_trait]
impl ExplorerBackend for HttpBackend {
    async fn fetch_suggestions(&self, query: &SuggestionQuery) -> PortResult<Vec<String>> {
        let body = SuggestionsBody {
            topic: &query.topic,
            seeds: &query.seeds,
            include_report_headings: query.include_report_headings,
            model: query.model.as_deref().map(|model| ModelChoice { model }),
        };
        let url = self.url("/suggestions", &[])?;
        let response = self
            .send(self.request(Method::POST, url).json(&body))
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PortError::Http {
                status: status.as_u16(),
                message: format!("Suggestion request failed: {}", status.as_u16()),
            });
        }
        let data: SuggestionsResponse = read_json(response).await?;
        Ok(suggestion_titles(&data.suggestions))
    }

    async fn list_saved_topics(&self, user: &UserProfile) -> PortResult<Vec<SavedTopic>> {
        let url = self.user_url("/saved_topics", user, &[])?;
        let response = self.send(self.request(Method::GET, url)).await?;
        let response = ensure_success(response, "load saved topics").await?;
        let records: Vec<TopicRecord> = read_records(response).await?;
        Ok(records.into_iter().map(TopicRecord::to_domain).collect())
    }

    async fn create_saved_topic(
        &self,
        user: &UserProfile,
        title: &str,
        collection_id: Option<&str>,
    ) -> PortResult<SavedTopic> {
        let url = self.user_url("/saved_topics", user, &[])?;
        let title = title.trim();
        if title.is_empty() {
            return Err(PortError::Invalid(
                "Title is required to save a topic.".to_string(),
            ));
        }
        let body = TopicBody {
            title,
            collection_id: collection_id.filter(|id| !id.is_empty()),
        };
        let response = self
            .send(self.request(Method::POST, url).json(&body))
            .await?;
        let response = ensure_success(response, "save topic").await?;
        let record: TopicRecord = read_json(response).await?;
        Ok(record.to_domain())
    }

    async fn update_saved_topic(
        &self,
        user: &UserProfile,
        topic_id: &str,
        collection_id: Option<&str>,
    ) -> PortResult<SavedTopic> {
        let url = self.item_url("/saved_topics", topic_id, user)?;
        let body = TopicMoveBody { collection_id };
        let response = self
            .send(self.request(Method::PATCH, url).json(&body))
            .await?;
        let response = ensure_success(response, "update topic").await?;
        let record: TopicRecord = read_json(response).await?;
        Ok(record.to_domain())
    }

    async fn delete_saved_topic(&self, user: &UserProfile, topic_id: &str) -> PortResult<()> {
        let url = self.item_url("/saved_topics", topic_id, user)?;
        let response = self.send(self.request(Method::DELETE, url)).await?;
        ensure_success(response, "delete topic").await?;
        Ok(())
    }

    async fn list_reports(
        &self,
        user: &UserProfile,
        include_content: bool,
    ) -> PortResult<Vec<SavedReport>> {
        let extra = if include_content {
            vec![("include_content", "1".to_string())]
        } else {
            Vec::new()
        };
        let url = self.user_url("/reports", user, &extra)?;
        let response = self.send(self.request(Method::GET, url)).await?;
        let response = ensure_success(response, "load reports").await?;
        let records: Vec<ReportRecord> = read_records(response).await?;
        Ok(records.into_iter().map(ReportRecord::to_domain).collect())
    }

    async fn delete_report(&self, user: &UserProfile, report_id: &str) -> PortResult<()> {
        let url = self.item_url("/reports", report_id, user)?;
        let response = self.send(self.request(Method::DELETE, url)).await?;
        ensure_success(response, "delete report").await?;
        Ok(())
    }

    async fn list_collections(&self, user: &UserProfile) -> PortResult<Vec<Collection>> {
        let url = self.user_url("/collections", user, &[])?;
        let response = self.send(self.request(Method::GET, url)).await?;
        let response = ensure_success(response, "load collections").await?;
        let records: Vec<CollectionRecord> = read_records(response).await?;
        Ok(records.into_iter().map(CollectionRecord::to_domain).collect())
    }

    async fn create_collection(
        &self,
        user: &UserProfile,
        collection: &NewCollection,
    ) -> PortResult<Collection> {
        let url = self.user_url("/collections", user, &[])?;
        let name = collection.name.trim();
        if name.is_empty() {
            return Err(PortError::Invalid("Collection name is required.".to_string()));
        }
        let body = CollectionBody {
            name,
            description: trimmed_field(&collection.description),
            color: trimmed_field(&collection.color),
            icon: trimmed_field(&collection.icon),
        };
        let response = self
            .send(self.request(Method::POST, url).json(&body))
            .await?;
        let response = ensure_success_with_detail(response, "create collection").await?;
        let record: CollectionRecord = read_json(response).await?;
        Ok(record.to_domain())
    }

    async fn update_collection(
        &self,
        user: &UserProfile,
        collection_id: &str,
        update: &CollectionUpdate,
    ) -> PortResult<Collection> {
        let url = self.item_url("/collections", collection_id, user)?;
        let response = self
            .send(self.request(Method::PATCH, url).json(update))
            .await?;
        let response = ensure_success_with_detail(response, "update collection").await?;
        let record: CollectionRecord = read_json(response).await?;
        Ok(record.to_domain())
    }

    async fn delete_collection(&self, user: &UserProfile, collection_id: &str) -> PortResult<()> {
        let url = self.item_url("/collections", collection_id, user)?;
        let response = self.send(self.request(Method::DELETE, url)).await?;
        ensure_success(response, "delete collection").await?;
        Ok(())
    }

    async fn generate_report(&self, request: &GenerateRequest) -> PortResult<GenerationStream> {
        let url = self.url("/reports/generate", &[])?;
        let response = self
            .send(
                self.request(Method::POST, url)
                    .header(header::ACCEPT, "text/event-stream, application/json")
                    .json(request),
            )
            .await?;
        let response = ensure_success_with_detail(response, "generate report").await?;

        let is_json = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/json"));
        if is_json {
            warn!("Backend returned a non-streaming report; delivering it as a single event");
            let report: ReportPayload = read_json(response).await?;
            let event = GenerationEvent::Complete { report };
            return Ok(Box::pin(futures::stream::once(async move { Ok(event) })));
        }
        Ok(sse::generation_events(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer) -> HttpBackend {
        HttpBackend::new(format!("{}/api/", server.uri()), Duration::from_secs(5)).unwrap()
    }

    fn user() -> UserProfile {
        UserProfile::new("reader@example.com", "reader")
    }

    #[tokio::test]
    async fn user_scoped_calls_fail_fast_without_email() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let err = backend(&server)
            .list_saved_topics(&UserProfile::default())
            .await
            .unwrap_err();
        assert_eq!(err, PortError::MissingIdentity);
    }

    #[tokio::test]
    async fn saved_topics_are_mapped_from_wire_records() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/saved_topics"))
            .and(query_param("user_email", "reader@example.com"))
            .and(query_param("username", "reader"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "t1", "title": "Tides", "collection_id": "c1"},
                {"id": "t2", "title": "Harbors", "collection_id": null},
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let topics = backend(&server).list_saved_topics(&user()).await.unwrap();
        assert_eq!(
            topics,
            vec![
                SavedTopic {
                    id: "t1".into(),
                    prompt: "Tides".into(),
                    collection_id: Some("c1".into()),
                },
                SavedTopic {
                    id: "t2".into(),
                    prompt: "Harbors".into(),
                    collection_id: None,
                },
            ]
        );
    }

    #[tokio::test]
    async fn error_status_becomes_a_readable_message() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/reports/r9"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = backend(&server).delete_report(&user(), "r9").await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to delete report (500).");
    }

    #[tokio::test]
    async fn item_ids_are_encoded_as_one_path_segment() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/saved_topics/a%2Fb%20c"))
            .and(query_param("user_email", "reader@example.com"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        backend(&server)
            .delete_saved_topic(&user(), "a/b c")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn reports_request_content_and_derive_previews() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/reports"))
            .and(query_param("include_content", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "r1", "topic": "Tides", "content": "Short body."},
                {"id": "r2", "title": "Given", "summary": "Server summary"},
            ])))
            .mount(&server)
            .await;

        let reports = backend(&server).list_reports(&user(), true).await.unwrap();
        assert_eq!(reports[0].title, "Tides");
        assert_eq!(reports[0].preview, "Short body.");
        assert_eq!(reports[1].topic, "");
        assert_eq!(reports[1].preview, "Server summary");
    }

    #[tokio::test]
    async fn suggestions_accept_strings_and_objects() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/suggestions"))
            .and(body_json(json!({
                "topic": "Tides",
                "seeds": [],
                "include_report_headings": false,
                "model": {"model": "gpt-4o"},
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "suggestions": ["Moon", {"title": " Currents "}, {"topic": "Estuaries"}, 7, {"title": ""}]
            })))
            .mount(&server)
            .await;

        let query = SuggestionQuery {
            topic: "Tides".into(),
            seeds: Vec::new(),
            include_report_headings: false,
            model: Some("gpt-4o".into()),
        };
        let suggestions = backend(&server).fetch_suggestions(&query).await.unwrap();
        assert_eq!(suggestions, vec!["Moon", "Currents", "Estuaries"]);
    }

    #[tokio::test]
    async fn collection_errors_prefer_the_backend_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/collections"))
            .respond_with(
                ResponseTemplate::new(409)
                    .set_body_json(json!({"detail": "Collection already exists."})),
            )
            .mount(&server)
            .await;

        let err = backend(&server)
            .create_collection(&user(), &NewCollection::named("Ports"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            PortError::Http {
                status: 409,
                message: "Collection already exists.".into(),
            }
        );
    }

    #[tokio::test]
    async fn generation_stream_yields_decoded_events() {
        let server = MockServer::start().await;
        let body = concat!(
            "data: {\"type\":\"status\",\"stage\":\"outline\",\"message\":\"Planning\"}\n\n",
            "data: {\"type\":\"delta\",\"text\":\"Part one. \"}\n\n",
            "data: {\"type\":\"complete\",\"report\":{\"content\":\"Part one. \",\"title\":\"Tides\"}}\n\n",
            "data: [DONE]\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/api/reports/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        let stream = backend(&server)
            .generate_report(&GenerateRequest::for_topic("Tides", 3))
            .await
            .unwrap();
        let events: Vec<GenerationEvent> = stream.map(|event| event.unwrap()).collect().await;
        assert_eq!(events.len(), 3);
        assert_eq!(events[1], GenerationEvent::Delta { text: "Part one. ".into() });
        assert!(matches!(events[2], GenerationEvent::Complete { .. }));
    }

    #[tokio::test]
    async fn non_streaming_generation_is_a_single_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/reports/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": "Whole report.",
                "title": "Tides",
                "topic": "Tides",
            })))
            .mount(&server)
            .await;

        let stream = backend(&server)
            .generate_report(&GenerateRequest::for_topic("Tides", 3))
            .await
            .unwrap();
        let events: Vec<GenerationEvent> = stream.map(|event| event.unwrap()).collect().await;
        match &events[..] {
            [GenerationEvent::Complete { report }] => {
                assert_eq!(report.content.as_deref(), Some("Whole report."))
            }
            other => panic!("unexpected events: {:?}", other),
        }
    }
}
