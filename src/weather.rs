//! Hourly weather and air quality series from the Open-Meteo HTTP API.
//!
//! The API answers a query such as
//! `?latitude=40.71&longitude=-74.01&hourly=temperature_2m,rain&timeformat=unixtime`
//! with a JSON document holding a `hourly.time` column and one column per
//! requested variable. Values the provider does not have are `null`.

use std::{collections::BTreeMap, future::Future, time::Duration};

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{FetchError, Result};

pub const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const AIR_QUALITY_URL: &str = "https://air-quality-api.open-meteo.com/v1/air-quality";

pub const NYC: Coordinates = Coordinates {
    latitude: 40.7128,
    longitude: -74.0060,
};

pub const WEATHER_VARIABLES: [&str; 13] = [
    "temperature_2m",
    "apparent_temperature",
    "precipitation",
    "rain",
    "snowfall",
    "wind_speed_10m",
    "wind_direction_10m",
    "relative_humidity_2m",
    "visibility",
    "cloud_cover",
    "weather_code",
    "pressure_msl",
    "shortwave_radiation",
];

pub const AIR_QUALITY_VARIABLES: [&str; 12] = [
    "pm10",
    "pm2_5",
    "carbon_monoxide",
    "nitrogen_dioxide",
    "sulphur_dioxide",
    "ozone",
    "ammonia",
    "aerosol_optical_depth",
    "dust",
    "european_aqi",
    "european_aqi_pm2_5",
    "european_aqi_pm10",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// The span of hours requested, relative to today in `timezone`.
pub struct Window {
    pub timezone: String,
    pub past_days: u32,
    pub forecast_days: u32,
}

impl Default for Window {
    fn default() -> Self {
        Window {
            timezone: "America/New_York".to_string(),
            past_days: 2,
            forecast_days: 7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// Exponential backoff: attempt `n` waits `backoff_factor * 2^n` seconds.
pub struct RetryPolicy {
    pub retries: u32,
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            retries: 5,
            backoff_factor: 0.2,
        }
    }
}

impl RetryPolicy {
    pub fn delay(&self, attempt: u32) -> Duration {
        Duration::from_secs_f64(self.backoff_factor * 2f64.powi(attempt as i32))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HourlyObservation {
    pub time: DateTime<Utc>,
    pub values: BTreeMap<String, Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HourlySeries {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: Option<f64>,
    pub utc_offset_seconds: i64,
    /// Variables in the order they were requested.
    pub variables: Vec<String>,
    pub rows: Vec<HourlyObservation>,
}

impl HourlySeries {
    pub fn time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        Some((self.rows.first()?.time, self.rows.last()?.time))
    }

    /// Number of timestamps present in both series.
    pub fn common_timestamps(&self, other: &HourlySeries) -> usize {
        let mine: std::collections::BTreeSet<_> = self.rows.iter().map(|r| r.time).collect();
        other.rows.iter().filter(|r| mine.contains(&r.time)).count()
    }
}

#[derive(Deserialize)]
struct ApiResponse {
    latitude: f64,
    longitude: f64,
    elevation: Option<f64>,
    #[serde(default)]
    utc_offset_seconds: i64,
    hourly: Option<HourlyBlock>,
}

#[derive(Deserialize)]
struct HourlyBlock {
    time: Vec<i64>,
    #[serde(flatten)]
    columns: BTreeMap<String, Vec<Option<f64>>>,
}

#[derive(Deserialize)]
struct ApiError {
    reason: String,
}

/// Fetches one hourly series, retrying transport errors, 429 and 5xx answers.
pub async fn fetch_hourly_series(
    client: &reqwest::Client,
    provider_url: &str,
    coordinates: Coordinates,
    variables: &[&str],
    window: &Window,
    retry: RetryPolicy,
) -> Result<HourlySeries> {
    let query = build_query(coordinates, variables, window);
    let query = query.as_slice();

    let body = with_retry(retry, provider_url, || request(client, provider_url, query)).await?;

    parse_hourly(&body, variables)
}

/// Runs `attempt` until it succeeds, fails for good, or `retry.retries` extra
/// attempts have been spent.
async fn with_retry<T, F, Fut>(retry: RetryPolicy, url: &str, mut attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut retries = 0;

    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) if retries < retry.retries && is_retryable(&e) => {
                let delay = retry.delay(retries);
                warn!(url, attempt = retries, error = %e, "retrying in {:?}", delay);
                tokio::time::sleep(delay).await;
                retries += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn build_query(
    coordinates: Coordinates,
    variables: &[&str],
    window: &Window,
) -> Vec<(&'static str, String)> {
    vec![
        ("latitude", coordinates.latitude.to_string()),
        ("longitude", coordinates.longitude.to_string()),
        ("hourly", variables.join(",")),
        ("timezone", window.timezone.clone()),
        ("past_days", window.past_days.to_string()),
        ("forecast_days", window.forecast_days.to_string()),
        ("timeformat", "unixtime".to_string()),
    ]
}

async fn request(client: &reqwest::Client, url: &str, query: &[(&str, String)]) -> Result<String> {
    let response = client.get(url).query(query).send().await?;
    let status = response.status();
    let body = response.text().await?;
    debug!(url, status = status.as_u16(), bytes = body.len(), "provider answered");

    check_response(status, url, body)
}

/// A client error carrying `{"error": true, "reason": ..}` is the provider
/// rejecting the query. Anything else unsuccessful is reported by status.
fn check_response(status: StatusCode, url: &str, body: String) -> Result<String> {
    if status.is_success() {
        return Ok(body);
    }

    match serde_json::from_str::<ApiError>(&body) {
        Ok(api_error) if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS => {
            Err(FetchError::Api(api_error.reason))
        }
        _ => Err(FetchError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        }),
    }
}

fn is_retryable(error: &FetchError) -> bool {
    match error {
        FetchError::Transport(_) => true,
        FetchError::Status { status, .. } => *status == 429 || *status >= 500,
        _ => false,
    }
}

/// Turns a provider answer into rows, one per timestamp.
pub fn parse_hourly(body: &str, variables: &[&str]) -> Result<HourlySeries> {
    let response: ApiResponse = serde_json::from_str(body)?;
    let mut hourly = response
        .hourly
        .ok_or_else(|| FetchError::Api("response has no hourly data".to_string()))?;

    let mut columns = Vec::with_capacity(variables.len());
    for &variable in variables {
        let column = hourly
            .columns
            .remove(variable)
            .ok_or_else(|| FetchError::Api(format!("response is missing `{}`", variable)))?;
        if column.len() != hourly.time.len() {
            return Err(FetchError::Api(format!(
                "`{}` has {} values for {} timestamps",
                variable,
                column.len(),
                hourly.time.len()
            )));
        }
        columns.push((variable, column));
    }

    let mut rows = Vec::with_capacity(hourly.time.len());
    for (i, &seconds) in hourly.time.iter().enumerate() {
        let time = DateTime::from_timestamp(seconds, 0)
            .ok_or_else(|| FetchError::Api(format!("timestamp {} out of range", seconds)))?;
        let values = columns
            .iter()
            .map(|(variable, column)| (variable.to_string(), column[i]))
            .collect();
        rows.push(HourlyObservation { time, values });
    }

    Ok(HourlySeries {
        latitude: response.latitude,
        longitude: response.longitude,
        elevation: response.elevation,
        utc_offset_seconds: response.utc_offset_seconds,
        variables: variables.iter().map(|v| v.to_string()).collect(),
        rows,
    })
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "latitude": 40.710335,
        "longitude": -73.99307,
        "generationtime_ms": 0.05,
        "utc_offset_seconds": -14400,
        "timezone": "America/New_York",
        "elevation": 32.0,
        "hourly_units": {"time": "unixtime", "temperature_2m": "°C", "rain": "mm"},
        "hourly": {
            "time": [1717200000, 1717203600, 1717207200],
            "temperature_2m": [21.5, 20.9, null],
            "rain": [0.0, 0.2, 0.0]
        }
    }"#;

    #[test]
    fn should_parse_rows() {
        let series = parse_hourly(BODY, &["temperature_2m", "rain"]).unwrap();

        assert_eq!(series.rows.len(), 3);
        assert_eq!(series.utc_offset_seconds, -14400);
        assert_eq!(series.elevation, Some(32.0));
        assert_eq!(series.variables, vec!["temperature_2m", "rain"]);
        assert_eq!(series.rows[0].time.timestamp(), 1717200000);
        assert_eq!(series.rows[1].values["rain"], Some(0.2));
        assert_eq!(series.rows[2].values["temperature_2m"], None);
    }

    #[test]
    fn should_fail_on_missing_variable() {
        let err = parse_hourly(BODY, &["temperature_2m", "snowfall"]).unwrap_err();

        assert!(matches!(err, FetchError::Api(reason) if reason.contains("snowfall")));
    }

    #[test]
    fn should_fail_on_ragged_columns() {
        let body = r#"{"latitude": 1.0, "longitude": 2.0,
            "hourly": {"time": [0, 3600], "pm10": [1.0]}}"#;
        let err = parse_hourly(body, &["pm10"]).unwrap_err();

        assert!(matches!(err, FetchError::Api(_)));
    }

    #[test]
    fn should_fail_without_hourly_block() {
        let body = r#"{"latitude": 1.0, "longitude": 2.0}"#;

        assert!(parse_hourly(body, &["pm10"]).is_err());
    }

    #[test]
    fn should_count_common_timestamps() {
        let weather = parse_hourly(BODY, &["rain"]).unwrap();
        let air = parse_hourly(
            r#"{"latitude": 1.0, "longitude": 2.0, "hourly": {
                "time": [1717203600, 1717207200, 1717210800],
                "pm10": [1.0, 2.0, 3.0]
            }}"#,
            &["pm10"],
        )
        .unwrap();

        assert_eq!(weather.common_timestamps(&air), 2);
        assert_eq!(
            air.time_range().map(|(start, end)| (start.timestamp(), end.timestamp())),
            Some((1717203600, 1717210800))
        );
    }

    #[test]
    fn should_build_query() {
        let query = build_query(NYC, &["pm10", "pm2_5"], &Window::default());

        assert!(query.contains(&("hourly", "pm10,pm2_5".to_string())));
        assert!(query.contains(&("latitude", "40.7128".to_string())));
        assert!(query.contains(&("longitude", "-74.006".to_string())));
        assert!(query.contains(&("past_days", "2".to_string())));
        assert!(query.contains(&("timeformat", "unixtime".to_string())));
    }

    #[test]
    fn should_back_off_exponentially() {
        let retry = RetryPolicy::default();

        assert_eq!(retry.delay(0), Duration::from_millis(200));
        assert_eq!(retry.delay(2), Duration::from_millis(800));
    }

    #[test]
    fn should_map_provider_rejection_to_api_error() {
        let body = r#"{"error":true,"reason":"Invalid String value tempeture_2m"}"#;

        let err = check_response(StatusCode::BAD_REQUEST, FORECAST_URL, body.to_string())
            .unwrap_err();

        assert!(matches!(err, FetchError::Api(ref reason) if reason.contains("tempeture_2m")));
        assert!(!is_retryable(&err));
    }

    #[test]
    fn should_keep_rate_limit_retryable() {
        let body = r#"{"error":true,"reason":"Too many concurrent requests"}"#;

        let err = check_response(StatusCode::TOO_MANY_REQUESTS, FORECAST_URL, body.to_string())
            .unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 429, .. }));
        assert!(is_retryable(&err));
    }

    #[test]
    fn should_report_server_error_by_status() {
        let err = check_response(
            StatusCode::BAD_GATEWAY,
            AIR_QUALITY_URL,
            "<html>bad gateway</html>".to_string(),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            FetchError::Status { status: 502, ref url } if url == AIR_QUALITY_URL
        ));
        assert_eq!(
            check_response(StatusCode::OK, FORECAST_URL, "{}".to_string()).unwrap(),
            "{}"
        );
    }

    #[tokio::test]
    async fn should_stop_after_configured_retries() {
        let retry = RetryPolicy {
            retries: 3,
            backoff_factor: 0.0,
        };
        let mut calls = 0;

        let result: Result<()> = with_retry(retry, FORECAST_URL, || {
            calls += 1;
            async {
                Err(FetchError::Status {
                    status: 503,
                    url: FORECAST_URL.to_string(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(FetchError::Status { status: 503, .. })));
        assert_eq!(calls, 4);
    }

    #[tokio::test]
    async fn should_not_retry_provider_rejection() {
        let mut calls = 0;

        let result: Result<()> = with_retry(RetryPolicy::default(), FORECAST_URL, || {
            calls += 1;
            async { Err(FetchError::Api("invalid variable".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(FetchError::Api(_))));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn should_succeed_after_transient_failure() {
        let retry = RetryPolicy {
            retries: 5,
            backoff_factor: 0.0,
        };
        let mut calls = 0;

        let result = with_retry(retry, FORECAST_URL, || {
            calls += 1;
            let outcome = if calls < 3 {
                Err(FetchError::Status {
                    status: 500,
                    url: FORECAST_URL.to_string(),
                })
            } else {
                Ok(calls)
            };
            async move { outcome }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn should_retry_only_transient_errors() {
        let status = |status| FetchError::Status {
            status,
            url: String::new(),
        };

        assert!(is_retryable(&status(503)));
        assert!(is_retryable(&status(429)));
        assert!(!is_retryable(&status(404)));
        assert!(!is_retryable(&FetchError::Api("bad variable".to_string())));
    }
}
