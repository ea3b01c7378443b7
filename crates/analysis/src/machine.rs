//! Pure transition logic for the analysis scheduler.
//!
//! The driver loop in [`crate::scheduler`] owns the timers, channels, and
//! build task; everything it decides goes through [`apply`], which maps the
//! current [`State`] and an incoming [`Event`] to the next state plus the
//! [`Effect`] the driver must execute.

/// Scheduler disposition. Exactly one value is active at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    /// Nothing pending.
    Idle,
    /// A request is pending and the quiescence window is open.
    Waiting,
    /// An analysis build is executing.
    Analyzing,
    /// An analysis build is executing and a new request already arrived,
    /// so one follow-up window must open once the build settles.
    AnalyzingWaiting,
}

impl State {
    pub(crate) const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Waiting => "waiting",
            Self::Analyzing => "analyzing",
            Self::AnalyzingWaiting => "analyzing_waiting",
        }
    }

    pub(crate) const fn analyzing(self) -> bool {
        matches!(self, Self::Analyzing | Self::AnalyzingWaiting)
    }
}

/// Input token fed into [`apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Event {
    /// External: an analysis was requested.
    AnalysisRequest,
    /// Internal: the armed deadline fired. Carries the primary-build
    /// predicate sampled at that moment, the only moment it is queried.
    WaitTimeout { building: bool },
    /// Internal: the analysis build settled. Success and failure are not
    /// distinguished here.
    BuildDone,
}

/// What the driver must do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Effect {
    None,
    /// Arm (or re-arm, superseding any armed deadline) the quiescence
    /// window.
    StartDebounce,
    /// Arm the shorter re-poll deadline while the primary build holds the
    /// toolchain.
    StartPoll,
    /// Spawn the analysis build.
    StartBuild,
}

/// Applies one event to the current state.
///
/// Pairs outside the transition table leave the state untouched and ask
/// for no effect; the caller logs them and moves on.
pub(crate) fn apply(state: State, event: Event) -> (State, Effect) {
    match (state, event) {
        (State::Idle, Event::AnalysisRequest) => (State::Waiting, Effect::StartDebounce),
        (State::Waiting, Event::AnalysisRequest) => (State::Waiting, Effect::StartDebounce),
        (State::Waiting, Event::WaitTimeout { building: true }) => {
            (State::Waiting, Effect::StartPoll)
        }
        (State::Waiting, Event::WaitTimeout { building: false }) => {
            (State::Analyzing, Effect::StartBuild)
        }
        (State::Analyzing, Event::BuildDone) => (State::Idle, Effect::None),
        (State::Analyzing, Event::AnalysisRequest) => (State::AnalyzingWaiting, Effect::None),
        // A request that arrived mid-build gets exactly one follow-up
        // window, opened atomically; no transient Idle is observable.
        (State::AnalyzingWaiting, Event::BuildDone) => (State::Waiting, Effect::StartDebounce),
        (state, _) => (state, Effect::None),
    }
}
