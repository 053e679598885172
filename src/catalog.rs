//! The static table of datasets and files that can be fetched.
//!
//! Trip records are published as one parquet file per dataset and month under
//! the trip-data endpoint. Zone metadata is a fixed set of named files under the
//! misc endpoint.

use crate::error::{FetchError, Result};

pub const TRIP_BASE_URL: &str = "https://d37ci6vzurychx.cloudfront.net/trip-data";
pub const MISC_BASE_URL: &str = "https://d37ci6vzurychx.cloudfront.net/misc";

/// Average size of one monthly trip file, used for estimates.
pub const AVERAGE_MONTHLY_FILE_BYTES: u64 = 60 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
/// One family of monthly trip files.
pub struct DatasetDescriptor {
    pub key: &'static str,
    pub prefix: &'static str,
    pub extension: &'static str,
    pub description: &'static str,
    pub earliest_year: i32,
}

impl DatasetDescriptor {
    pub fn file_name(&self, year: i32, month: u32) -> String {
        format!("{}_{:04}-{:02}.{}", self.prefix, year, month, self.extension)
    }

    /// File name with placeholders, for listings.
    pub fn file_pattern(&self) -> String {
        format!("{}_YYYY-MM.{}", self.prefix, self.extension)
    }

    /// Name of the directory the files of this dataset are stored in.
    pub fn directory(&self) -> String {
        format!("{}_trip", self.key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A named zone-mapping file.
pub struct ZoneFile {
    pub key: &'static str,
    pub filename: &'static str,
    pub description: &'static str,
    pub is_archive: bool,
    pub essential: bool,
}

const TRIP_DATASETS: [DatasetDescriptor; 4] = [
    DatasetDescriptor {
        key: "yellow",
        prefix: "yellow_tripdata",
        extension: "parquet",
        description: "Yellow Taxi (Manhattan pickups)",
        earliest_year: 2009,
    },
    DatasetDescriptor {
        key: "green",
        prefix: "green_tripdata",
        extension: "parquet",
        description: "Green Taxi (Outer boroughs)",
        earliest_year: 2013,
    },
    DatasetDescriptor {
        key: "fhv",
        prefix: "fhv_tripdata",
        extension: "parquet",
        description: "For-Hire Vehicles",
        earliest_year: 2015,
    },
    DatasetDescriptor {
        key: "fhvhv",
        prefix: "fhvhv_tripdata",
        extension: "parquet",
        description: "High Volume FHV (Uber/Lyft)",
        earliest_year: 2019,
    },
];

const ZONE_FILES: [ZoneFile; 7] = [
    ZoneFile {
        key: "zone_lookup",
        filename: "taxi_zone_lookup.csv",
        description: "Taxi Zone ID to Borough/Zone name mapping",
        is_archive: false,
        essential: true,
    },
    ZoneFile {
        key: "zone_shapefile",
        filename: "taxi_zones.zip",
        description: "Taxi Zone boundaries shapefile (ZIP archive)",
        is_archive: true,
        essential: true,
    },
    ZoneFile {
        key: "zone_map_manhattan",
        filename: "taxi_zone_map_manhattan.jpg",
        description: "Manhattan taxi zones map",
        is_archive: false,
        essential: false,
    },
    ZoneFile {
        key: "zone_map_brooklyn",
        filename: "taxi_zone_map_brooklyn.jpg",
        description: "Brooklyn taxi zones map",
        is_archive: false,
        essential: false,
    },
    ZoneFile {
        key: "zone_map_queens",
        filename: "taxi_zone_map_queens.jpg",
        description: "Queens taxi zones map",
        is_archive: false,
        essential: false,
    },
    ZoneFile {
        key: "zone_map_bronx",
        filename: "taxi_zone_map_bronx.jpg",
        description: "Bronx taxi zones map",
        is_archive: false,
        essential: false,
    },
    ZoneFile {
        key: "zone_map_staten_island",
        filename: "taxi_zone_map_staten_island.jpg",
        description: "Staten Island taxi zones map",
        is_archive: false,
        essential: false,
    },
];

#[derive(Debug, Clone)]
/// Immutable lookup table built once at startup and passed around by reference.
pub struct Catalog {
    trip_base_url: String,
    misc_base_url: String,
    datasets: Vec<DatasetDescriptor>,
    zone_files: Vec<ZoneFile>,
}

impl Catalog {
    pub fn standard() -> Self {
        Self::with_base_urls(TRIP_BASE_URL, MISC_BASE_URL)
    }

    pub fn with_base_urls(trip_base_url: &str, misc_base_url: &str) -> Self {
        Catalog {
            trip_base_url: trip_base_url.trim_end_matches('/').to_string(),
            misc_base_url: misc_base_url.trim_end_matches('/').to_string(),
            datasets: TRIP_DATASETS.to_vec(),
            zone_files: ZONE_FILES.to_vec(),
        }
    }

    pub fn resolve(&self, key: &str) -> Result<&DatasetDescriptor> {
        self.datasets
            .iter()
            .find(|d| d.key == key)
            .ok_or_else(|| FetchError::UnknownKey(key.to_string()))
    }

    pub fn zone_file(&self, key: &str) -> Result<&ZoneFile> {
        self.zone_files
            .iter()
            .find(|z| z.key == key)
            .ok_or_else(|| FetchError::UnknownKey(key.to_string()))
    }

    pub fn datasets(&self) -> &[DatasetDescriptor] {
        &self.datasets
    }

    pub fn dataset_keys(&self) -> Vec<String> {
        self.datasets.iter().map(|d| d.key.to_string()).collect()
    }

    pub fn zone_files(&self) -> &[ZoneFile] {
        &self.zone_files
    }

    pub fn essential_zone_files(&self) -> impl Iterator<Item = &ZoneFile> {
        self.zone_files.iter().filter(|z| z.essential)
    }

    pub fn trip_url(&self, dataset: &DatasetDescriptor, year: i32, month: u32) -> String {
        format!("{}/{}", self.trip_base_url, dataset.file_name(year, month))
    }

    pub fn zone_url(&self, file: &ZoneFile) -> String {
        format!("{}/{}", self.misc_base_url, file.filename)
    }
}

// -- Tests -------------------------------------------------------------------
