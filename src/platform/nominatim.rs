use crate::domain::{AddressRecord, Coordinate};
use crate::platform::{GeocodeError, Geocoder};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::USER_AGENT;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// Reverse geocoding against a Nominatim `/reverse` endpoint.
#[derive(Debug)]
pub struct NominatimGeocoder {
    client: Client,
    url: String,
    user_agent: String,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    error: Option<String>,
    name: Option<String>,
    display_name: Option<String>,
    address: Option<ReverseAddress>,
}

#[derive(Debug, Default, Deserialize)]
struct ReverseAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    hamlet: Option<String>,
    suburb: Option<String>,
    neighbourhood: Option<String>,
    quarter: Option<String>,
    county: Option<String>,
    state_district: Option<String>,
    state: Option<String>,
}

impl From<ReverseResponse> for AddressRecord {
    fn from(response: ReverseResponse) -> Self {
        let address = response.address.unwrap_or_default();
        AddressRecord {
            locality: address.city.or(address.town).or(address.village).or(address.hamlet),
            sub_locality: address.suburb.or(address.neighbourhood).or(address.quarter),
            sub_admin_area: address.county.or(address.state_district),
            feature_name: response.name,
            admin_area: address.state,
            address_line: response.display_name,
        }
    }
}

impl NominatimGeocoder {
    pub fn new(client: Client, url: impl Into<String>, user_agent: impl Into<String>) -> Self {
        NominatimGeocoder {
            client,
            url: url.into(),
            user_agent: user_agent.into(),
        }
    }

    async fn reverse(&self, coordinate: Coordinate) -> Result<Option<AddressRecord>, GeocodeError> {
        let response = self
            .client
            .get(format!("{}/reverse", self.url.trim_end_matches('/')))
            .header(USER_AGENT, self.user_agent.as_str())
            .query(&[
                ("format", "jsonv2".to_string()),
                ("addressdetails", "1".to_string()),
                ("lat", coordinate.latitude_string()),
                ("lon", coordinate.longitude_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeocodeError::Unavailable(format!("status {}", response.status())));
        }

        let reverse = response.json::<ReverseResponse>().await?;
        if let Some(error) = &reverse.error {
            debug!("🗺️ Geocoder has no address: {}", error);
            return Ok(None);
        }

        Ok(Some(reverse.into()))
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    #[instrument(skip(self, cancel), fields(coordinate = %coordinate))]
    async fn reverse_geocode(&self, coordinate: Coordinate, cancel: CancellationToken) -> Result<Option<AddressRecord>, GeocodeError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(GeocodeError::Cancelled),
            result = self.reverse(coordinate) => result,
        }
    }
}
