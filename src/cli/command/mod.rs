pub mod trips;
pub mod weather;
pub mod zones;

use chrono::{Datelike, Local};
pub use trips::trips;
pub use weather::weather;
pub use zones::zones;

use crate::verify::VerifyReport;

/// HTTP client shared by every transfer of a command.
pub fn http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("tlcfetch/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Dated name for a file written by this run, e.g. `open-meteo-weather-2025-06-01.parquet`.
pub fn make_dated_file_name(stem: &str, extension: &str) -> String {
    let today = Local::now();
    format!(
        "{}-{}-{:02}-{:02}.{}",
        stem,
        today.year(),
        today.month(),
        today.day(),
        extension
    )
}

pub fn print_report(report: &VerifyReport) {
    for (path, size) in &report.present {
        println!("✓ {} ({:.1} KB)", path.display(), *size as f64 / 1024.0);
    }
    for path in &report.missing {
        println!("✗ {} - Missing or empty", path.display());
    }
    match &report.expanded {
        Some((dir, Some(count))) => println!("✓ {}/ ({} files)", dir.display(), count),
        Some((dir, None)) => println!("✗ {}/ - Missing directory", dir.display()),
        None => {}
    }
    for path in &report.partial {
        println!("! {} - Left by an interrupted download, safe to delete", path.display());
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_make_dated_file_name() {
        let name = make_dated_file_name("open-meteo-weather", "parquet");

        assert!(name.starts_with("open-meteo-weather-20"));
        assert!(name.ends_with(".parquet"));
        assert_eq!(name.len(), "open-meteo-weather-YYYY-MM-DD.parquet".len());
    }
}
