mod archive;
mod catalog;
mod cli;
mod download;
mod error;
mod parquet;
mod plan;
mod run;
mod summary;
mod verify;
mod weather;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use catalog::Catalog;
use cli::{
    command::{self, trips::TripRequest},
    mode::ModeFlags,
    Cli, Commands,
};

/// `RUST_LOG` filters events, `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tlcfetch=info"));

    if json_format {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let catalog = Catalog::with_base_urls(&cli.trip_base_url, &cli.misc_base_url);
    let data_dir = cli.data_dir;

    let result = match cli.command {
        Commands::Trips {
            types,
            years,
            months,
            list,
            estimate,
            verify,
            yes,
            transfer,
        } => {
            let request = TripRequest {
                types,
                years,
                months,
                flags: ModeFlags {
                    list,
                    estimate,
                    verify,
                    yes,
                    ..ModeFlags::default()
                },
                options: transfer.run_options(),
            };
            command::trips(&catalog, &data_dir, request)
                .await
                .map(|summary| summary.is_success())
        }
        Commands::Zones {
            essential_only,
            all,
            list,
            estimate,
            verify,
            yes,
            files,
            transfer,
        } => {
            let flags = ModeFlags {
                list,
                estimate,
                verify,
                essential_only,
                all,
                yes,
                ..ModeFlags::default()
            };
            command::zones(&catalog, &data_dir, flags, &files, transfer.run_options())
                .await
                .map(|summary| summary.is_success())
        }
        Commands::Weather {
            latitude,
            longitude,
            timezone,
            past_days,
            forecast_days,
        } => {
            let coordinates = weather::Coordinates {
                latitude,
                longitude,
            };
            let window = weather::Window {
                timezone,
                past_days,
                forecast_days,
            };
            command::weather(&data_dir, coordinates, window)
                .await
                .map(|files| {
                    for file in files {
                        println!("File saved to `{}`", file);
                    }
                    true
                })
        }
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
