//! Fetch hourly weather and air quality series and save them to disk.

use std::{fs, path::Path};

use anyhow::{anyhow, Result};

use crate::{
    cli::create_spinner,
    parquet,
    weather::{
        fetch_hourly_series, Coordinates, HourlySeries, RetryPolicy, Window, AIR_QUALITY_URL,
        AIR_QUALITY_VARIABLES, FORECAST_URL, WEATHER_VARIABLES,
    },
};

use super::{http_client, make_dated_file_name};

/// Directory under the data dir holding the saved series.
pub const WEATHER_DIR: &str = "weather";

struct Provider {
    name: &'static str,
    url: &'static str,
    variables: &'static [&'static str],
}

const PROVIDERS: [Provider; 2] = [
    Provider {
        name: "weather",
        url: FORECAST_URL,
        variables: &WEATHER_VARIABLES,
    },
    Provider {
        name: "air-quality",
        url: AIR_QUALITY_URL,
        variables: &AIR_QUALITY_VARIABLES,
    },
];

/// Returns the saved file paths. Fails only if no series could be fetched.
pub async fn weather(
    data_dir: &Path,
    coordinates: Coordinates,
    window: Window,
) -> Result<Vec<String>> {
    let client = http_client()?;
    let out_dir = data_dir.join(WEATHER_DIR);
    fs::create_dir_all(&out_dir)?;

    let mut fetched: Vec<HourlySeries> = Vec::new();
    let mut saved = Vec::new();

    for provider in &PROVIDERS {
        let bar = create_spinner(format!("Fetching {} data...", provider.name));
        let series = fetch_hourly_series(
            &client,
            provider.url,
            coordinates,
            provider.variables,
            &window,
            RetryPolicy::default(),
        )
        .await;

        match series {
            Ok(series) => {
                bar.finish_with_message(format!("{} data fetched", provider.name));
                describe(provider.name, &series);

                let stem = format!("open-meteo-{}", provider.name);
                let file_name = make_dated_file_name(&stem, "parquet");
                let path = out_dir.join(file_name);
                parquet::save_hourly(&series, &path)?;
                saved.push(path.to_string_lossy().to_string());
                fetched.push(series);
            }
            Err(e) => {
                bar.abandon_with_message(format!("{} data not available", provider.name));
                eprintln!("{} API error: {}", provider.name, e);
            }
        }
    }

    if let [weather, air_quality] = fetched.as_slice() {
        let common = weather.common_timestamps(air_quality);
        let largest = weather.rows.len().max(air_quality.rows.len()).max(1);
        println!("Time alignment check:");
        println!("   Weather data points: {}", weather.rows.len());
        println!("   Air quality data points: {}", air_quality.rows.len());
        println!("   Common timestamps: {}", common);
        println!(
            "   Overlap percentage: {:.1}%",
            common as f64 / largest as f64 * 100.0
        );
    }

    if saved.is_empty() {
        return Err(anyhow!("no series could be fetched"));
    }

    Ok(saved)
}

fn describe(name: &str, series: &HourlySeries) {
    println!("{} response:", name);
    println!("   Coordinates: {}°N {}°E", series.latitude, series.longitude);
    if let Some(elevation) = series.elevation {
        println!("   Elevation: {} m", elevation);
    }
    println!(
        "   Timezone: {}s offset from UTC",
        series.utc_offset_seconds
    );
    println!(
        "   Rows: {}, variables: {}",
        series.rows.len(),
        series.variables.len()
    );
    if let Some((start, end)) = series.time_range() {
        println!("   Time range: {} to {}", start, end);
    }
}
