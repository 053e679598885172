//! Handles serialising and saving data to disk in the _parquet_ file format.

pub mod weather;

pub use weather::save_hourly;
