//! Finding where the user is.
//!
//! A [`Geolocator`] starts a one-shot lookup and hands back a [`LocationRequest`] that is
//! polled from the UI loop. There is no retry and no cancellation; dropping the request
//! simply discards its result.

use log::debug;
use poll_promise::Promise;
use serde::Deserialize;
use std::time::Duration;

use crate::MapError;
use crate::projection::GeoPos;

/// A source of the user's current position.
pub trait Geolocator {
    /// Starts a lookup.
    fn locate(&self) -> LocationRequest;
}

/// A pending position lookup.
pub struct LocationRequest {
    promise: Option<Promise<Result<GeoPos, MapError>>>,
}

impl LocationRequest {
    /// Wraps a promise that resolves to a position.
    pub fn new(promise: Promise<Result<GeoPos, MapError>>) -> Self {
        Self {
            promise: Some(promise),
        }
    }

    /// A request that is already resolved.
    pub fn ready(result: Result<GeoPos, MapError>) -> Self {
        Self::new(Promise::from_ready(result))
    }

    /// Returns the result the first time it is available, and `None` before and after.
    pub fn poll(&mut self) -> Option<Result<GeoPos, MapError>> {
        let promise = self.promise.take()?;
        match promise.try_take() {
            Ok(result) => Some(result),
            Err(promise) => {
                self.promise = Some(promise);
                None
            }
        }
    }
}

/// Always reports the same position.
#[derive(Clone, Copy, Debug)]
pub struct FixedLocator {
    position: GeoPos,
}

impl FixedLocator {
    /// Creates a locator for `position`.
    pub fn new(position: GeoPos) -> Self {
        Self { position }
    }
}

impl Geolocator for FixedLocator {
    fn locate(&self) -> LocationRequest {
        LocationRequest::ready(Ok(self.position))
    }
}

/// Looks the position up from the public IP address over HTTP.
///
/// The service must answer with a JSON object carrying `lat`/`lon` or
/// `latitude`/`longitude` numbers.
#[derive(Clone, Debug)]
pub struct IpLocator {
    url: String,
    timeout: Duration,
}

impl IpLocator {
    /// Creates a locator for the given service URL.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }
}

#[derive(Deserialize)]
struct IpPosition {
    #[serde(alias = "latitude")]
    lat: Option<f64>,
    #[serde(alias = "longitude")]
    lon: Option<f64>,
}

/// Extracts a position from an IP lookup response body.
pub fn parse_ip_position(body: &[u8]) -> Result<GeoPos, MapError> {
    let position: IpPosition = serde_json::from_slice(body)?;
    match (position.lat, position.lon) {
        (Some(lat), Some(lon)) => Ok(GeoPos::from_lat_lon(lat, lon)),
        _ => Err(MapError::Geolocation(
            "response has no latitude/longitude".to_string(),
        )),
    }
}

impl Geolocator for IpLocator {
    fn locate(&self) -> LocationRequest {
        let url = self.url.clone();
        let timeout = self.timeout;
        LocationRequest::new(Promise::spawn_thread("ip_locate", move || -> Result<GeoPos, MapError> {
            debug!("Requesting position from {}", url);
            let client = reqwest::blocking::Client::builder()
                .user_agent(crate::USER_AGENT)
                .timeout(timeout)
                .build()?;
            let response = client.get(&url).send()?;
            if !response.status().is_success() {
                return Err(MapError::Geolocation(format!(
                    "HTTP status {}",
                    response.status()
                )));
            }
            parse_ip_position(&response.bytes()?)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_locator_resolves_once() {
        let home = GeoPos::from_lat_lon(43.6405289, -79.4244113);
        let mut request = FixedLocator::new(home).locate();
        assert_eq!(request.poll().unwrap().unwrap(), home);
        assert!(request.poll().is_none());
    }

    #[test]
    fn failed_request_reports_error() {
        let mut request =
            LocationRequest::ready(Err(MapError::Geolocation("permission denied".to_string())));
        assert!(matches!(request.poll(), Some(Err(MapError::Geolocation(_)))));
    }

    #[test]
    fn ip_position_field_spellings() {
        let short = parse_ip_position(br#"{"status":"success","lat":43.65,"lon":-79.38}"#).unwrap();
        assert_eq!(short, GeoPos::from_lat_lon(43.65, -79.38));

        let long = parse_ip_position(br#"{"latitude":43.65,"longitude":-79.38}"#).unwrap();
        assert_eq!(long, GeoPos::from_lat_lon(43.65, -79.38));

        assert!(matches!(
            parse_ip_position(br#"{"status":"fail"}"#),
            Err(MapError::Geolocation(_))
        ));
        assert!(matches!(parse_ip_position(b"<html>"), Err(MapError::Json(_))));
    }
}
