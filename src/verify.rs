//! Checks which planned files are already on disk.

use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use crate::{
    archive::EXPANSION_DIR,
    download::{is_partial, should_fetch},
    plan::FetchTarget,
};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub present: Vec<(PathBuf, u64)>,
    pub missing: Vec<PathBuf>,
    /// Expanded archive directory and the number of entries in it, if checked.
    pub expanded: Option<(PathBuf, Option<usize>)>,
    /// Leftovers of interrupted atomic writes next to the targets.
    pub partial: Vec<PathBuf>,
}

impl VerifyReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && !matches!(self.expanded, Some((_, None)))
    }
}

/// Non-empty files count as present, exactly as the download gate sees them.
pub fn verify_targets<'a>(targets: impl IntoIterator<Item = &'a FetchTarget>) -> VerifyReport {
    let mut report = VerifyReport::default();
    let mut dirs = BTreeSet::new();

    for target in targets {
        if let Some(parent) = target.local_path.parent() {
            dirs.insert(parent.to_path_buf());
        }
        if should_fetch(&target.local_path) {
            report.missing.push(target.local_path.clone());
        } else {
            let size = fs::metadata(&target.local_path)
                .map(|m| m.len())
                .unwrap_or_default();
            report.present.push((target.local_path.clone(), size));
        }
    }

    for dir in dirs {
        if let Ok(entries) = fs::read_dir(&dir) {
            report.partial.extend(
                entries
                    .filter_map(|entry| entry.ok())
                    .map(|entry| entry.path())
                    .filter(|path| is_partial(path)),
            );
        }
    }
    report.partial.sort();

    report
}

/// Verifies the essential zone files and the expanded shapefile directory.
pub fn verify_zones(targets: &[FetchTarget], zone_dir: &Path) -> VerifyReport {
    let mut report = verify_targets(targets);

    let expanded = zone_dir.join(EXPANSION_DIR);
    let count = fs::read_dir(&expanded)
        .ok()
        .filter(|_| expanded.is_dir())
        .map(|entries| entries.count());
    report.expanded = Some((expanded, count));

    report
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::{
        catalog::Catalog,
        plan::{plan_zones, zone_dir, Scope},
    };

    #[test]
    fn should_split_present_and_missing() {
        let temp_dir = TempDir::new().unwrap();
        let targets = plan_zones(&Catalog::standard(), temp_dir.path(), Scope::Essential);
        fs::create_dir_all(targets[0].local_path.parent().unwrap()).unwrap();
        fs::write(&targets[0].local_path, vec![b'x'; 2048]).unwrap();
        fs::write(&targets[1].local_path, b"").unwrap();

        let report = verify_targets(&targets);

        assert_eq!(report.present, vec![(targets[0].local_path.clone(), 2048)]);
        assert_eq!(report.missing, vec![targets[1].local_path.clone()]);
        assert!(!report.is_complete());
    }

    #[test]
    fn should_find_leftover_partial_files() {
        let temp_dir = TempDir::new().unwrap();
        let targets = plan_zones(&Catalog::standard(), temp_dir.path(), Scope::Essential);
        let zone_dir = zone_dir(temp_dir.path());
        fs::create_dir_all(&zone_dir).unwrap();
        fs::write(zone_dir.join(".tlcfetch-Ab12Cd.part"), b"half a zip").unwrap();
        fs::write(zone_dir.join("notes.txt"), b"unrelated").unwrap();

        let report = verify_targets(&targets);

        assert_eq!(report.partial, vec![zone_dir.join(".tlcfetch-Ab12Cd.part")]);
        assert_eq!(report.missing.len(), 2);
    }

    #[test]
    fn should_report_missing_shapefile_directory() {
        let temp_dir = TempDir::new().unwrap();
        let targets = plan_zones(&Catalog::standard(), temp_dir.path(), Scope::Essential);
        let zone_dir = zone_dir(temp_dir.path());
        fs::create_dir_all(&zone_dir).unwrap();
        for target in &targets {
            fs::write(&target.local_path, b"data").unwrap();
        }

        let report = verify_zones(&targets, &zone_dir);

        assert!(report.missing.is_empty());
        assert_eq!(report.expanded, Some((zone_dir.join("shapefiles"), None)));
        assert!(!report.is_complete());

        fs::create_dir_all(zone_dir.join("shapefiles")).unwrap();
        fs::write(zone_dir.join("shapefiles/taxi_zones.shp"), b"shp").unwrap();

        let report = verify_zones(&targets, &zone_dir);

        assert_eq!(report.expanded, Some((zone_dir.join("shapefiles"), Some(1))));
        assert!(report.is_complete());
    }
}
