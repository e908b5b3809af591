pub mod config;
pub mod error;
pub mod outcome;
pub mod poller;
pub mod runner;

pub use config::PipelineConfig;
pub use error::{CycleError, PipelineError};
pub use outcome::{CycleOutcome, CycleReport, MessageOutcome};
pub use poller::{run, shutdown_channel};
pub use runner::{Ingestor, ResolvedFolders};
