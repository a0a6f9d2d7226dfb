//! Report mode strategies.

use serde::Serialize;

use crate::models::ReportMode;

/// Which cumulative records are classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Population {
    /// Every record of the day
    All,
    /// Only titles new in the latest capture
    NewOnly,
    /// Only titles present in the latest capture
    Latest,
}

/// Mode behaviour consumed uniformly by [`crate::pipeline::analyze`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModeStrategy {
    pub population: Population,

    /// Mark every classified title as new
    pub all_new: bool,

    /// Report new titles in their own section
    pub show_new_section: bool,

    /// Signal the caller not to notify when nothing matched
    pub suppress_when_empty: bool,
}

impl ModeStrategy {
    pub fn for_mode(mode: ReportMode, is_first_capture: bool) -> Self {
        match mode {
            ReportMode::Daily => Self {
                population: Population::All,
                all_new: false,
                show_new_section: true,
                suppress_when_empty: false,
            },
            ReportMode::Incremental => Self {
                population: if is_first_capture {
                    Population::All
                } else {
                    Population::NewOnly
                },
                all_new: true,
                show_new_section: false,
                suppress_when_empty: true,
            },
            ReportMode::Current => Self {
                population: Population::Latest,
                all_new: false,
                show_new_section: true,
                suppress_when_empty: true,
            },
        }
    }
}
