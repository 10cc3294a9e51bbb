use crate::acquirer::LocationAcquirer;
use crate::domain::Coordinate;
use async_trait::async_trait;
use http::Extensions;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderValue};
use reqwest::{Body, Request, Response};
use reqwest_middleware::{Middleware, Next};
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::{debug, instrument, warn};

pub const LOCATION_FIELD: &str = "location";

/// Stamps every outgoing JSON object body with `"location": {"lat": "..", "long": ".."}`.
///
/// Requests without a body, with a non-JSON content type or with a body that is not a JSON object pass through
/// untouched. The coordinate comes from the acquirer's last-known chain so a request never waits on a fix.
#[derive(Debug)]
pub struct RequestLocationInjector {
    acquirer: LocationAcquirer,
}

impl RequestLocationInjector {
    pub fn new(acquirer: LocationAcquirer) -> Self {
        RequestLocationInjector { acquirer }
    }
}

#[async_trait]
impl Middleware for RequestLocationInjector {
    #[instrument(skip_all, fields(method = %req.method(), url = %req.url()))]
    async fn handle(&self, mut req: Request, extensions: &mut Extensions, next: Next<'_>) -> reqwest_middleware::Result<Response> {
        match json_object_body(&req) {
            Ok(Some(body)) => {
                let position = self.acquirer.last_known_position().await;
                replace_body(&mut req, with_location(body, &position.coordinate));
                debug!(source = %position.source, "📨 Injected location {}", position.coordinate);
            }
            Ok(None) => {}
            Err(e) => warn!("⚠️ Not injecting a location: {}", e),
        }

        next.run(req, extensions).await
    }
}

/// The parsed body when the request carries a JSON object, `Ok(None)` when it does not carry JSON at all.
fn json_object_body(req: &Request) -> Result<Option<Map<String, Value>>, InjectError> {
    if !has_json_content_type(req) {
        return Ok(None);
    }

    // Streaming bodies cannot be inspected without consuming them
    let Some(bytes) = req.body().and_then(Body::as_bytes) else {
        return Ok(None);
    };

    match serde_json::from_slice::<Value>(bytes)? {
        Value::Object(map) => Ok(Some(map)),
        _ => Err(InjectError::NotAnObject),
    }
}

fn has_json_content_type(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

fn with_location(mut body: Map<String, Value>, coordinate: &Coordinate) -> Map<String, Value> {
    body.insert(
        LOCATION_FIELD.to_string(),
        json!({
            "lat": coordinate.latitude_string(),
            "long": coordinate.longitude_string(),
        }),
    );
    body
}

fn replace_body(req: &mut Request, body: Map<String, Value>) {
    let bytes = Value::Object(body).to_string().into_bytes();
    if req.headers().contains_key(CONTENT_LENGTH) {
        req.headers_mut().insert(CONTENT_LENGTH, HeaderValue::from(bytes.len()));
    }
    *req.body_mut() = Some(Body::from(bytes));
}

#[derive(Error, Debug)]
pub enum InjectError {
    #[error("malformed JSON payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
    #[error("JSON payload is not an object")]
    NotAnObject,
}
