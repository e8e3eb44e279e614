//! Aggregation layer: turns raw GitHub and Jira data into lifecycle
//! metrics, daily timeseries and sprint burn-down reports.

pub mod lifecycle;
pub mod linker;
pub mod phase;
pub mod report;
pub mod scope;
pub mod sprint;
pub mod stats;
pub mod timeseries;

pub use crate::phase::StatusGroups;
pub use crate::report::{
    build_daily_report, build_lifecycle_report, build_sprint_report, DailyView, LifecycleView,
    SprintReport,
};
