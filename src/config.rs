use std::path::{Path, PathBuf};

pub const FARMER_FILE: &str = "farmer_survey_cleaned_2026.csv";
pub const REGIONAL_FILE: &str = "regional_kpis.csv";
pub const AGENT_FILE: &str = "agent_kpis.csv";

pub const FILTERED_EXPORT_FILE: &str = "filtered_farmer_survey.csv";
pub const REGIONAL_EXPORT_FILE: &str = "regional_kpis.csv";
pub const SUMMARY_EXPORT_FILE: &str = "dashboard_summary.json";

/// Kept apart from the data directory: the regional export shares its file
/// name with the regional source table.
pub const DEFAULT_EXPORT_DIR: &str = "exports";

/// Locations of the three source tables. The file names are fixed; only
/// the directory they live in can change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub farmers: PathBuf,
    pub regional: PathBuf,
    pub agents: PathBuf,
}

impl DataPaths {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            farmers: dir.join(FARMER_FILE),
            regional: dir.join(REGIONAL_FILE),
            agents: dir.join(AGENT_FILE),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        [&self.farmers, &self.regional, &self.agents]
            .into_iter()
            .map(PathBuf::as_path)
    }
}

impl Default for DataPaths {
    fn default() -> Self {
        Self::in_dir(".")
    }
}
