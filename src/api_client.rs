use crate::acquirer::LocationAcquirer;
use crate::app_config::AppConfig;
use crate::injector::RequestLocationInjector;
use reqwest::header::HeaderValue;
use reqwest::{Client, header};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use thiserror::Error;

pub const API_KEY_HEADER: &str = "x-api-key";

/// The marketplace client. Every JSON object body it sends carries the device location.
pub fn new_client(config: &AppConfig, acquirer: LocationAcquirer) -> Result<ClientWithMiddleware, ApiClientError> {
    let mut headers = header::HeaderMap::new();
    let mut api_key_value = HeaderValue::from_str(config.api().key())?;
    api_key_value.set_sensitive(true);
    headers.insert(API_KEY_HEADER, api_key_value);

    let client = Client::builder().default_headers(headers).build()?;
    Ok(ClientBuilder::new(client).with(RequestLocationInjector::new(acquirer)).build())
}

#[derive(Error, Debug)]
pub enum ApiClientError {
    #[error("request error: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("API client set an invalid header value: {0}")]
    InvalidHeaderValue(#[from] header::InvalidHeaderValue),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::AppConfigBuilder;
    use crate::domain::{Coordinate, Fix};
    use crate::platform::StaticPermissionChecker;
    use crate::platform::fakes::{FakeLocationService, FixedClock, MemoryKvStore};
    use crate::position_cache::PositionCache;
    use mockito::Matcher;
    use serde_json::json;
    use std::sync::Arc;

    fn acquirer() -> LocationAcquirer {
        let cache = PositionCache::new(Arc::new(MemoryKvStore::new()), Arc::new(FixedClock::default()));
        LocationAcquirer::new(
            Arc::new(StaticPermissionChecker::new(true)),
            Arc::new(FakeLocationService::new().with_provider("gps", Some(Fix::new(10.0, 20.0, Some(5.0))))),
            cache,
            Coordinate::new(51.8615899, 4.3580323).unwrap(),
        )
    }

    #[tokio::test]
    async fn new_client_sets_the_api_key_header_and_stamps_the_location() -> Result<(), Box<dyn std::error::Error>> {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("POST", "/v1/listings")
            .with_status(201)
            .match_header(API_KEY_HEADER, "key")
            .match_body(Matcher::Json(json!({
                "title": "Plumber",
                "location": { "lat": "10.0", "long": "20.0" }
            })))
            .create_async()
            .await;

        let config = AppConfigBuilder::new().api_url(server.url()).build();
        let client = new_client(&config, acquirer())?;

        client
            .post(format!("{}{}", config.api().url(), "/v1/listings"))
            .json(&json!({ "title": "Plumber" }))
            .send()
            .await?;

        mock.assert_async().await;
        Ok(())
    }

    #[test]
    fn rejects_an_api_key_that_is_not_a_header_value() {
        let config = AppConfigBuilder::new().api_key("line\nbreak".to_string()).build();

        assert!(matches!(new_client(&config, acquirer()), Err(ApiClientError::InvalidHeaderValue(_))));
    }
}
