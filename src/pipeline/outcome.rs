use serde::Serialize;

// ============================================================================
// Stage Outcome
// ============================================================================
//
// Every stage returns exactly one of these. A failure is terminal: the
// chain stops at the first one and hands it back unchanged.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageFailure {
    reason: String,
    stage: Option<String>,
}

impl StageFailure {
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Name of the stage that produced the failure. Filled in by the chain
    /// as the failure leaves the stage; `None` only for hand-built outcomes.
    pub fn stage(&self) -> Option<&str> {
        self.stage.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Success,
    Failure(StageFailure),
}

impl StageOutcome {
    pub fn success() -> Self {
        StageOutcome::Success
    }

    /// # Panics
    ///
    /// Panics if `reason` is empty or whitespace. A failure without a reason
    /// is a bug in the stage that produced it.
    pub fn failure(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        assert!(
            !reason.trim().is_empty(),
            "StageOutcome::failure requires a non-empty reason"
        );
        StageOutcome::Failure(StageFailure {
            reason,
            stage: None,
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StageOutcome::Success)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, StageOutcome::Failure(_))
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            StageOutcome::Success => None,
            StageOutcome::Failure(failure) => Some(failure.reason()),
        }
    }

    pub fn failed_stage(&self) -> Option<&str> {
        match self {
            StageOutcome::Success => None,
            StageOutcome::Failure(failure) => failure.stage(),
        }
    }

    /// Tag an unattributed failure with `stage`. Failures that already name
    /// a stage come from further down the chain and are left alone.
    pub(crate) fn attributed_to(self, stage: &str) -> Self {
        match self {
            StageOutcome::Failure(StageFailure {
                reason,
                stage: None,
            }) => StageOutcome::Failure(StageFailure {
                reason,
                stage: Some(stage.to_string()),
            }),
            other => other,
        }
    }
}
