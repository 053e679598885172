//! Download monthly trip record files.

use std::path::Path;

use anyhow::Result;

use crate::{
    catalog::Catalog,
    cli::{
        confirm,
        mode::{resolve_mode, Mode, ModeFlags},
    },
    download::HttpSource,
    plan::{estimate, plan_trips, resolve_datasets, SelectionCriteria},
    run::{run_targets, RunOptions},
    summary::Summary,
    verify::verify_targets,
};

use super::{http_client, print_report};

pub struct TripRequest {
    pub types: Vec<String>,
    pub years: Vec<i32>,
    pub months: Vec<u32>,
    pub flags: ModeFlags,
    pub options: RunOptions,
}

pub async fn trips(catalog: &Catalog, data_dir: &Path, request: TripRequest) -> Result<Summary> {
    let criteria = SelectionCriteria {
        datasets: expand_types(catalog, &request.types),
        years: request.years,
        months: request.months,
    };

    match resolve_mode(&request.flags) {
        Mode::List => list_datasets(catalog),
        Mode::Estimate => print_estimate(catalog, &criteria)?,
        Mode::Verify => {
            let targets: Vec<_> = plan_trips(catalog, &criteria, data_dir)?.collect();
            let report = verify_targets(&targets);
            print_report(&report);
            println!(
                "{} of {} files present",
                report.present.len(),
                targets.len()
            );
        }
        Mode::Fetch { confirm: ask, .. } => {
            // Every key must resolve before the first transfer.
            resolve_datasets(catalog, &criteria)?;

            println!("NYC TLC Data Downloader - Monthly Files Only");
            println!("Data types: {}", criteria.datasets.join(", "));
            println!("Years: {:?}", criteria.years);
            println!("Months: {:?}", criteria.months);
            println!("Base directory: {}", data_dir.display());
            print_estimate(catalog, &criteria)?;

            if ask && !confirm("\nContinue with download?")? {
                println!("Download cancelled.");
                return Ok(Summary::default());
            }

            return download(catalog, &criteria, data_dir, request.options).await;
        }
    }

    Ok(Summary::default())
}

async fn download(
    catalog: &Catalog,
    criteria: &SelectionCriteria,
    data_dir: &Path,
    options: RunOptions,
) -> Result<Summary> {
    let source = HttpSource::new(http_client()?);
    let mut total = Summary::default();

    for key in &criteria.datasets {
        let dataset = catalog.resolve(key)?;
        println!("Downloading {} data...", dataset.description);
        println!("Directory: {}", data_dir.join(dataset.directory()).display());

        let single = SelectionCriteria {
            datasets: vec![key.clone()],
            years: criteria.years.clone(),
            months: criteria.months.clone(),
        };
        let targets = plan_trips(catalog, &single, data_dir)?;
        let summary = run_targets(&source, targets, options).await;

        println!("{} Summary:\n{}", key.to_uppercase(), summary);
        total.merge(summary);
    }

    println!("All downloads complete!");

    Ok(total)
}

/// `all` stands for every dataset in the catalog.
fn expand_types(catalog: &Catalog, types: &[String]) -> Vec<String> {
    if types.iter().any(|t| t == "all") {
        catalog.dataset_keys()
    } else {
        types.to_vec()
    }
}

fn list_datasets(catalog: &Catalog) {
    println!("Available NYC TLC Data Types:");
    println!("{}", "-".repeat(50));

    for dataset in catalog.datasets() {
        println!("{}:", dataset.key.to_uppercase());
        println!("  Description: {}", dataset.description);
        println!("  Available from: {}", dataset.earliest_year);
        println!("  File pattern: {}", dataset.file_pattern());
        println!();
    }
}

fn print_estimate(catalog: &Catalog, criteria: &SelectionCriteria) -> Result<()> {
    let estimate = estimate(catalog, criteria)?;

    println!("Estimated download:");
    println!("  Files: {}", estimate.files);
    println!("  Size: ~{:.1} GB", estimate.gibibytes());

    Ok(())
}

// -- Tests -------------------------------------------------------------------
