//! Pipeline entry points and the analysis core.
//!
//! - `run_crawler`: Fetch every platform and persist one snapshot
//! - `run_report`: Merge, diff, classify and rank the day's snapshots
//! - `run_pipeline`: Crawl, report and deliver in one go

pub mod batch;
pub mod crawl;
pub mod diff;
pub mod matcher;
pub mod merge;
pub mod mode;
#[allow(clippy::module_inception)]
pub mod pipeline;
pub mod report;
pub mod score;

pub use batch::{BatchPlanner, MessageFormat};
pub use crawl::run_crawler;
pub use diff::{NewItemDetector, NewItems, detect_new_items};
pub use matcher::{Classification, Matcher};
pub use merge::MergedHistory;
pub use mode::{ModeStrategy, Population};
pub use pipeline::{RunSummary, run_pipeline, run_report};
pub use report::{Analysis, PASS_THROUGH_KEY, analyze};
pub use score::RankScorer;
