//! Download the taxi zone lookup table, boundaries shapefile and zone maps.

use std::path::Path;

use anyhow::Result;

use crate::{
    catalog::Catalog,
    cli::{
        choose_scope,
        mode::{resolve_mode, Mode, ModeFlags},
    },
    download::HttpSource,
    plan::{plan_named_zones, plan_zones, zone_dir, FetchTarget, Scope},
    run::{run_targets, RunOptions},
    summary::Summary,
    verify::{verify_targets, verify_zones},
};

use super::{http_client, print_report};

pub async fn zones(
    catalog: &Catalog,
    data_dir: &Path,
    flags: ModeFlags,
    files: &[String],
    options: RunOptions,
) -> Result<Summary> {
    match resolve_mode(&flags) {
        Mode::List => list_files(catalog),
        Mode::Estimate => print_estimate(catalog, data_dir, &flags, files)?,
        Mode::Verify => {
            verify(catalog, data_dir);
        }
        Mode::Fetch { scope, .. } => {
            println!("NYC Taxi Zone Mapping Downloader");
            println!("Download directory: {}", zone_dir(data_dir).display());

            let named = !files.is_empty();
            let targets = if named {
                println!("Mode: Download {}", files.join(", "));
                plan_named_zones(catalog, data_dir, files)?
            } else {
                let scope = match scope {
                    Some(scope) => scope,
                    None => choose_scope()?,
                };
                match scope {
                    Scope::Essential => println!("Mode: Download essential files only"),
                    Scope::All => println!("Mode: Download all files"),
                }
                plan_zones(catalog, data_dir, scope)
            };

            let source = HttpSource::new(http_client()?);
            let summary = run_targets(&source, targets.clone(), options).await;

            println!("Download summary:\n{}", summary);
            if !summary.is_success() {
                println!(
                    "\nSome downloads failed. Please check your internet connection and try again."
                );
            } else if named {
                println!("\nDownload completed successfully!");
                verify_named(&targets);
            } else {
                println!("\nDownload completed successfully!");
                verify(catalog, data_dir);
            }

            return Ok(summary);
        }
    }

    Ok(Summary::default())
}

/// Counts the files a download with the same flags would fetch.
fn print_estimate(
    catalog: &Catalog,
    data_dir: &Path,
    flags: &ModeFlags,
    files: &[String],
) -> Result<()> {
    let count = if !files.is_empty() {
        plan_named_zones(catalog, data_dir, files)?.len()
    } else if flags.essential_only && !flags.all {
        plan_zones(catalog, data_dir, Scope::Essential).len()
    } else {
        plan_zones(catalog, data_dir, Scope::All).len()
    };

    println!("Estimated download:");
    println!("  Files: {}", count);

    Ok(())
}

fn verify(catalog: &Catalog, data_dir: &Path) -> bool {
    println!("Verifying downloaded files...");

    let targets = plan_zones(catalog, data_dir, Scope::Essential);
    let report = verify_zones(&targets, &zone_dir(data_dir));
    print_report(&report);

    if report.is_complete() {
        println!("\nAll essential files downloaded successfully!");
    } else {
        println!("\nSome files are missing. Please re-run the download.");
    }

    report.is_complete()
}

/// Checks only the files that were asked for by name.
fn verify_named(targets: &[FetchTarget]) -> bool {
    println!("Verifying downloaded files...");

    let report = verify_targets(targets);
    print_report(&report);

    if report.is_complete() {
        println!("\nAll requested files downloaded successfully!");
    } else {
        println!("\nSome files are missing. Please re-run the download.");
    }

    report.is_complete()
}

fn list_files(catalog: &Catalog) {
    println!("Available NYC Taxi Zone Mapping Files:");
    println!("{}", "-".repeat(60));

    println!("ESSENTIAL FILES (recommended for coordinate mapping):");
    for file in catalog.essential_zone_files() {
        println!("  {}", file.filename);
        println!("    Description: {}", file.description);
        println!("    URL: {}", catalog.zone_url(file));
        println!();
    }

    println!("EXTENDED FILES (zone maps):");
    for file in catalog.zone_files().iter().filter(|f| !f.essential) {
        println!("  {}", file.filename);
        println!("    Description: {}", file.description);
        println!("    URL: {}", catalog.zone_url(file));
        println!();
    }
}

// -- Tests -------------------------------------------------------------------
