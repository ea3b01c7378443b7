//! # Sketch Analysis
//!
//! Debounced scheduling for sketch analysis builds.
//!
//! Editor tooling wants the IntelliSense configuration rebuilt whenever
//! build-relevant settings change, but never mid-keystroke-burst, never
//! twice at once, and never while the primary verify/upload build holds the
//! toolchain. This crate sequences those rebuilds; running them belongs to
//! the embedding tool behind the [`AnalysisHost`] seam.
//!
//! ## Flow
//!
//! ```text
//! request ──> [quiescence window] ──> primary build busy? ──poll──┐
//!                  ▲     │                     │                  │
//!                  │  restart on          no: run analysis <──────┘
//!                  │  new request              │
//!                  │                      settled (ok or err)
//!                  └── request mid-build ──────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use sketch_analysis::{AnalysisHost, AnalysisScheduler, SchedulerConfig};
//! use std::sync::Arc;
//!
//! struct Toolchain;
//!
//! #[async_trait::async_trait]
//! impl AnalysisHost for Toolchain {
//!     fn build_in_progress(&self) -> bool {
//!         false
//!     }
//!
//!     async fn run_analysis(&self) -> anyhow::Result<()> {
//!         // compile the sketch, parse compiler output, emit c_cpp_properties
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let scheduler = AnalysisScheduler::start(Arc::new(Toolchain), SchedulerConfig::default())?;
//!     scheduler.request_analysis_with_reason("board_changed").await?;
//!     Ok(())
//! }
//! ```

mod error;
mod host;
mod machine;
mod scheduler;
mod status;

pub use error::{Result, SchedulerError};
pub use host::AnalysisHost;
pub use scheduler::{AnalysisScheduler, SchedulerConfig};
pub use status::{AnalysisUpdate, SchedulerHealth};
