pub mod audio;
pub mod config;
pub mod cost;
pub mod error;
pub mod gate;
pub mod pipeline;
pub mod transcribe;
pub mod transcript;

pub use config::Config;
pub use error::{HearscribeError, Result};
pub use pipeline::{plan, print_summary, Pipeline, RunPlan, RunSummary};
