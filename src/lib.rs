//! Filter-and-aggregate pipeline behind the farmer survey & insurance impact
//! dashboard.
//!
//! Three CSV tables are loaded once per process ([`loader`]). Each
//! interaction builds a [`FilterSpec`], narrows the farmer table with it
//! ([`filter`]), recomputes the headline [`Metrics`] ([`metrics`]), flags
//! regions with data quality problems across the whole table ([`alerts`]),
//! and passes the regional and agent KPI tables through ([`reference`]).
//! [`Dashboard`] bundles one such pass; [`output`] turns it into CSV/JSON.
pub mod alerts;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod filter;
pub mod loader;
pub mod metrics;
pub mod output;
pub mod reference;
pub mod types;
pub mod util;

pub use config::DataPaths;
pub use dashboard::Dashboard;
pub use error::{ExportError, LoadError};
pub use filter::{apply, Choice, DateSelection, FilterOptions, FilterSpec, InsuredFilter};
pub use loader::{load, load_cached, Dataset};
pub use metrics::summarize;
pub use types::{
    AgentKpiRow, FarmerRecord, FarmerTable, Metrics, ReferenceTable, RegionIssueCount, RegionalKpiRow,
    TableView, YesNo,
};
