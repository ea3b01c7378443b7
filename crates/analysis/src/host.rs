use async_trait::async_trait;

/// Build-environment collaborator supplied by the embedding tool.
///
/// The scheduler only decides *when* an analysis runs; everything about
/// running one (compiler invocation, output parsing, IntelliSense
/// configuration emission) lives behind this seam.
#[async_trait]
pub trait AnalysisHost: Send + Sync + 'static {
    /// Whether the primary build (verify/upload) currently holds the
    /// toolchain. Queried once each time the quiescence deadline fires;
    /// must be cheap and side-effect free.
    fn build_in_progress(&self) -> bool;

    /// Runs one analysis build to completion. An `Err` is reported through
    /// the scheduler's update stream and health snapshot, then treated the
    /// same as success for scheduling purposes.
    async fn run_analysis(&self) -> anyhow::Result<()>;
}
