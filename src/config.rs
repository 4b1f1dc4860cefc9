//! Paths and knobs for one comparison run.

use chrono::Duration;
use std::path::PathBuf;

pub const DEFAULT_ENDPOINT: &str =
    "https://apim.carvana.io/vehicle-details-api/api/v1/vehicledetails";
pub const DEFAULT_LISTING_BASE: &str = "https://www.carvana.com/vehicle/";
pub const DEFAULT_EXPIRE_AFTER_SECS: i64 = 3600;

/// Everything [`crate::pipeline::run`] needs to know about its environment.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Vehicle IDs to compare, one per line.
    pub ids_path: PathBuf,
    /// Feature and highlight titles never worth a column.
    pub uninteresting_path: PathBuf,
    /// Feature columns that come first, in file order.
    pub priority_path: PathBuf,
    pub output_path: PathBuf,
    pub snapshot_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub expire_after: Duration,
    pub endpoint: String,
    pub listing_base: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            ids_path: "carvana_ids.txt".into(),
            uninteresting_path: "uninteresting_features.txt".into(),
            priority_path: "feature_priority.txt".into(),
            output_path: "carvana_result.csv".into(),
            snapshot_dir: "json".into(),
            cache_dir: "web_cache".into(),
            expire_after: Duration::seconds(DEFAULT_EXPIRE_AFTER_SECS),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            listing_base: DEFAULT_LISTING_BASE.to_string(),
        }
    }
}

impl RunConfig {
    /// Public listing page for a vehicle, used as the `url` column.
    pub fn listing_url(&self, vehicle_id: &str) -> String {
        format!("{}{}", self.listing_base, vehicle_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_fixed_filenames() {
        let config = RunConfig::default();
        assert_eq!(config.ids_path, PathBuf::from("carvana_ids.txt"));
        assert_eq!(config.output_path, PathBuf::from("carvana_result.csv"));
        assert_eq!(config.snapshot_dir, PathBuf::from("json"));
        assert_eq!(config.expire_after.num_seconds(), 3600);
    }

    #[test]
    fn test_listing_url() {
        let config = RunConfig::default();
        assert_eq!(
            config.listing_url("3141592"),
            "https://www.carvana.com/vehicle/3141592"
        );
    }
}
