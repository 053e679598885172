//! Expands a selection into the ordered list of files to fetch.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::{
    catalog::{Catalog, DatasetDescriptor, ZoneFile, AVERAGE_MONTHLY_FILE_BYTES},
    error::Result,
};

/// Directory under the data dir holding the zone-mapping files.
pub const ZONE_DIR: &str = "nyc_taxi_mapping";

#[derive(Debug, Clone, PartialEq, Eq)]
/// One concrete remote file and where it is stored.
pub struct FetchTarget {
    pub key: String,
    pub url: String,
    pub local_path: PathBuf,
    pub description: String,
    pub is_archive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Which trip files the caller asked for.
pub struct SelectionCriteria {
    pub datasets: Vec<String>,
    pub years: Vec<i32>,
    pub months: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Which zone-mapping files to fetch.
pub enum Scope {
    Essential,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Estimate {
    pub files: u64,
    pub bytes: u64,
}

impl Estimate {
    pub fn gibibytes(&self) -> f64 {
        self.bytes as f64 / (1024.0 * 1024.0 * 1024.0)
    }
}

/// Lazily expands the criteria into trip targets, dataset by year by month.
///
/// Every dataset key is resolved up front, so an unknown key fails before a
/// single target is produced. Years before a dataset's first published year
/// are dropped. Months are not validated.
pub fn plan_trips<'a>(
    catalog: &'a Catalog,
    criteria: &'a SelectionCriteria,
    data_dir: &'a Path,
) -> Result<impl Iterator<Item = FetchTarget> + 'a> {
    let datasets = resolve_datasets(catalog, criteria)?;

    let targets = datasets.into_iter().flat_map(move |dataset| {
        criteria
            .years
            .iter()
            .copied()
            .filter(move |&year| is_available(dataset, year))
            .flat_map(move |year| {
                criteria
                    .months
                    .iter()
                    .map(move |&month| trip_target(catalog, dataset, year, month, data_dir))
            })
    });

    Ok(targets)
}

/// Looks up every selected dataset, failing on the first unknown key.
pub fn resolve_datasets<'a>(
    catalog: &'a Catalog,
    criteria: &SelectionCriteria,
) -> Result<Vec<&'a DatasetDescriptor>> {
    criteria
        .datasets
        .iter()
        .map(|key| catalog.resolve(key))
        .collect()
}

fn is_available(dataset: &DatasetDescriptor, year: i32) -> bool {
    if year < dataset.earliest_year {
        info!(
            dataset = dataset.key,
            year,
            earliest = dataset.earliest_year,
            "skipping {} - {} data starts from {}",
            year,
            dataset.key,
            dataset.earliest_year
        );
        return false;
    }

    true
}

fn trip_target(
    catalog: &Catalog,
    dataset: &DatasetDescriptor,
    year: i32,
    month: u32,
    data_dir: &Path,
) -> FetchTarget {
    let file_name = dataset.file_name(year, month);

    FetchTarget {
        key: dataset.key.to_string(),
        url: catalog.trip_url(dataset, year, month),
        local_path: data_dir.join(dataset.directory()).join(file_name),
        description: format!("{} {:04}-{:02}", dataset.description, year, month),
        is_archive: false,
    }
}

pub fn plan_zones(catalog: &Catalog, data_dir: &Path, scope: Scope) -> Vec<FetchTarget> {
    let zone_dir = zone_dir(data_dir);

    catalog
        .zone_files()
        .iter()
        .filter(|file| scope == Scope::All || file.essential)
        .map(|file| zone_target(catalog, file, &zone_dir))
        .collect()
}

/// Targets for the named zone files, in the order given.
pub fn plan_named_zones(
    catalog: &Catalog,
    data_dir: &Path,
    keys: &[String],
) -> Result<Vec<FetchTarget>> {
    let zone_dir = zone_dir(data_dir);

    keys.iter()
        .map(|key| Ok(zone_target(catalog, catalog.zone_file(key)?, &zone_dir)))
        .collect()
}

fn zone_target(catalog: &Catalog, file: &ZoneFile, zone_dir: &Path) -> FetchTarget {
    FetchTarget {
        key: file.key.to_string(),
        url: catalog.zone_url(file),
        local_path: zone_dir.join(file.filename),
        description: file.description.to_string(),
        is_archive: file.is_archive,
    }
}

pub fn zone_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(ZONE_DIR)
}

/// Counts the monthly files the criteria resolve to, without planning them.
pub fn estimate(catalog: &Catalog, criteria: &SelectionCriteria) -> Result<Estimate> {
    let months = criteria.months.len() as u64;
    let files = resolve_datasets(catalog, criteria)?
        .into_iter()
        .map(|dataset| {
            let years = criteria
                .years
                .iter()
                .filter(|&&year| year >= dataset.earliest_year)
                .count() as u64;
            years * months
        })
        .sum();

    Ok(Estimate {
        files,
        bytes: files * AVERAGE_MONTHLY_FILE_BYTES,
    })
}

// -- Tests -------------------------------------------------------------------
