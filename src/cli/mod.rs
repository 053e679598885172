//! Command line interface.

pub mod command;
pub mod mode;

use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    time::Duration,
};

use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    catalog::{MISC_BASE_URL, TRIP_BASE_URL},
    download::WritePolicy,
    plan::{FetchTarget, Scope},
    run::RunOptions,
    weather::NYC,
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Downloads NYC TLC trip records, taxi zone files and weather observations
pub struct Cli {
    /// Base directory for data storage
    #[arg(long, global = true, default_value = "data")]
    pub data_dir: PathBuf,

    /// Endpoint serving the monthly trip files
    #[arg(long, global = true, default_value = TRIP_BASE_URL)]
    pub trip_base_url: String,

    /// Endpoint serving the zone lookup, shapefile and maps
    #[arg(long, global = true, default_value = MISC_BASE_URL)]
    pub misc_base_url: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Get monthly trip record files
    Trips {
        /// Data types to download
        #[arg(
            long,
            num_args = 1..,
            default_values = ["yellow"],
            value_parser = ["yellow", "green", "fhv", "fhvhv", "all"]
        )]
        types: Vec<String>,

        /// Years to download
        #[arg(long, num_args = 1.., default_values_t = [2023, 2024, 2025])]
        years: Vec<i32>,

        /// Months to download
        #[arg(long, num_args = 1.., default_values_t = 1..=12u32)]
        months: Vec<u32>,

        /// List available data types and exit
        #[arg(long)]
        list: bool,

        /// Estimate download size and exit
        #[arg(long)]
        estimate: bool,

        /// Report which of the selected files are already on disk
        #[arg(long)]
        verify: bool,

        /// Do not ask for confirmation
        #[arg(long, short)]
        yes: bool,

        #[command(flatten)]
        transfer: TransferArgs,
    },
    /// Get taxi zone lookup table, shapefile and zone maps
    Zones {
        /// Download only the lookup CSV and the shapefile
        #[arg(long)]
        essential_only: bool,

        /// Download all files, including the borough maps
        #[arg(long)]
        all: bool,

        /// List available files and exit
        #[arg(long)]
        list: bool,

        /// Count the files that would be downloaded and exit
        #[arg(long)]
        estimate: bool,

        /// Verify existing downloads
        #[arg(long)]
        verify: bool,

        /// Do not ask which files to download; defaults to the essential files
        #[arg(long, short)]
        yes: bool,

        /// Download only the named files, e.g. `zone_lookup zone_map_queens`
        #[arg(long = "file", num_args = 1..)]
        files: Vec<String>,

        #[command(flatten)]
        transfer: TransferArgs,
    },
    /// Get hourly weather and air quality observations
    Weather {
        #[arg(long, default_value_t = NYC.latitude, allow_negative_numbers = true)]
        latitude: f64,

        #[arg(long, default_value_t = NYC.longitude, allow_negative_numbers = true)]
        longitude: f64,

        #[arg(long, default_value = "America/New_York")]
        timezone: String,

        /// Days of history to include
        #[arg(long, default_value_t = 2)]
        past_days: u32,

        /// Days of forecast to include
        #[arg(long, default_value_t = 7)]
        forecast_days: u32,
    },
}

#[derive(Args, Debug, Clone, Copy)]
pub struct TransferArgs {
    /// Number of files to transfer at once
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    pub jobs: u16,

    /// Write straight to the destination instead of renaming a finished temp file
    #[arg(long)]
    pub in_place: bool,
}

impl TransferArgs {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            policy: if self.in_place {
                WritePolicy::InPlace
            } else {
                WritePolicy::Atomic
            },
            jobs: self.jobs as usize,
            show_progress: true,
        }
    }
}

/// Creates a spinner.
pub fn create_spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner().with_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));

    bar
}

/// Creates the bar a single transfer reports into. It becomes a byte bar once
/// the response announces its length.
pub fn create_transfer_bar(target: &FetchTarget) -> ProgressBar {
    let name = target
        .local_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| target.url.clone());

    ProgressBar::new_spinner().with_message(name).with_style(
        ProgressStyle::with_template("{spinner} {msg} {bytes}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    )
}

/// Asks a yes/no question; anything but `y` means no.
pub fn confirm(question: &str) -> io::Result<bool> {
    confirm_from(question, &mut io::stdin().lock(), &mut io::stdout())
}

fn confirm_from(
    question: &str,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> io::Result<bool> {
    write!(output, "{} (y/N): ", question)?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;

    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

/// Asks which zone files to download until the answer is 1 or 2.
pub fn choose_scope() -> io::Result<Scope> {
    choose_scope_from(&mut io::stdin().lock(), &mut io::stdout())
}

fn choose_scope_from(input: &mut impl BufRead, output: &mut impl Write) -> io::Result<Scope> {
    writeln!(output, "What would you like to download?")?;
    writeln!(output, "1. Essential files only (lookup CSV + shapefile) - Recommended")?;
    writeln!(output, "2. All files (lookup + shapefiles + zone maps)")?;

    loop {
        write!(output, "Choose option (1 or 2): ")?;
        output.flush()?;

        let mut answer = String::new();
        if input.read_line(&mut answer)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "no download option chosen",
            ));
        }

        match answer.trim() {
            "1" => return Ok(Scope::Essential),
            "2" => return Ok(Scope::All),
            _ => writeln!(output, "Please enter 1 or 2")?,
        }
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn should_parse_trip_defaults() {
        let cli = Cli::try_parse_from(["tlcfetch", "trips"]).unwrap();

        assert_eq!(cli.data_dir, PathBuf::from("data"));
        match cli.command {
            Commands::Trips {
                types,
                years,
                months,
                transfer,
                ..
            } => {
                assert_eq!(types, vec!["yellow"]);
                assert_eq!(years, vec![2023, 2024, 2025]);
                assert_eq!(months, (1..=12).collect::<Vec<u32>>());
                assert_eq!(transfer.jobs, 1);
                assert!(!transfer.in_place);
            }
            _ => panic!("expected trips command"),
        }
    }

    #[test]
    fn should_parse_trip_selection() {
        let cli = Cli::try_parse_from([
            "tlcfetch",
            "trips",
            "--types",
            "fhvhv",
            "green",
            "--years",
            "2015",
            "2019",
            "--months",
            "1",
            "--data-dir",
            "/tmp/tlc",
            "--jobs",
            "3",
        ])
        .unwrap();

        assert_eq!(cli.data_dir, PathBuf::from("/tmp/tlc"));
        match cli.command {
            Commands::Trips {
                types,
                years,
                months,
                transfer,
                ..
            } => {
                assert_eq!(types, vec!["fhvhv", "green"]);
                assert_eq!(years, vec![2015, 2019]);
                assert_eq!(months, vec![1]);
                assert_eq!(transfer.run_options().jobs, 3);
            }
            _ => panic!("expected trips command"),
        }
    }

    #[test]
    fn should_reject_unknown_type() {
        assert!(Cli::try_parse_from(["tlcfetch", "trips", "--types", "purple"]).is_err());
    }

    #[test]
    fn should_reject_zero_jobs() {
        assert!(Cli::try_parse_from(["tlcfetch", "zones", "--jobs", "0"]).is_err());
    }

    #[test]
    fn should_parse_named_zone_files() {
        let cli = Cli::try_parse_from([
            "tlcfetch",
            "zones",
            "--file",
            "zone_lookup",
            "zone_map_bronx",
            "--yes",
        ])
        .unwrap();

        match cli.command {
            Commands::Zones { files, yes, .. } => {
                assert_eq!(files, vec!["zone_lookup", "zone_map_bronx"]);
                assert!(yes);
            }
            _ => panic!("expected zones command"),
        }
    }

    #[test]
    fn should_parse_zone_estimate() {
        let cli = Cli::try_parse_from(["tlcfetch", "zones", "--estimate", "--all"]).unwrap();

        match cli.command {
            Commands::Zones { estimate, all, .. } => assert!(estimate && all),
            _ => panic!("expected zones command"),
        }
    }

    #[test]
    fn should_accept_negative_longitude() {
        let cli = Cli::try_parse_from(["tlcfetch", "weather", "--longitude", "-73.9"]).unwrap();

        match cli.command {
            Commands::Weather { longitude, .. } => assert_eq!(longitude, -73.9),
            _ => panic!("expected weather command"),
        }
    }

    #[test]
    fn should_confirm_only_on_y() {
        let mut out = Vec::new();

        assert!(confirm_from("Continue?", &mut Cursor::new("y\n"), &mut out).unwrap());
        assert!(confirm_from("Continue?", &mut Cursor::new("Y\n"), &mut out).unwrap());
        assert!(!confirm_from("Continue?", &mut Cursor::new("yes\n"), &mut out).unwrap());
        assert!(!confirm_from("Continue?", &mut Cursor::new("\n"), &mut out).unwrap());
    }

    #[test]
    fn should_ask_again_until_valid_choice() {
        let mut out = Vec::new();
        let scope = choose_scope_from(&mut Cursor::new("3\nfoo\n2\n"), &mut out).unwrap();

        assert_eq!(scope, Scope::All);
        assert_eq!(
            String::from_utf8(out)
                .unwrap()
                .matches("Please enter 1 or 2")
                .count(),
            2
        );
    }

    #[test]
    fn should_fail_when_input_ends() {
        let mut out = Vec::new();

        assert!(choose_scope_from(&mut Cursor::new(""), &mut out).is_err());
    }
}
