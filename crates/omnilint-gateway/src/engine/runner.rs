use std::sync::Arc;

use super::{EngineOutcome, EngineResult, EngineTag, PolicyEngine};
use crate::config::EngineSection;
use crate::engine::ProcessEngine;

/// When the secondary engine may stand in for the primary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Retry once on the secondary after an infrastructure failure.
    OnInfrastructureFailure,
    /// Report primary failures as-is.
    Disabled,
}

impl FallbackPolicy {
    pub fn from_flag(disable_fallback: bool) -> Self {
        if disable_fallback {
            FallbackPolicy::Disabled
        } else {
            FallbackPolicy::OnInfrastructureFailure
        }
    }
}

/// Runs a policy on the primary engine with at most one fallback attempt.
#[derive(Clone)]
pub struct EngineRunner {
    primary: Arc<dyn PolicyEngine>,
    secondary: Option<Arc<dyn PolicyEngine>>,
    fallback: FallbackPolicy,
}

impl EngineRunner {
    pub fn new(
        primary: Arc<dyn PolicyEngine>,
        secondary: Option<Arc<dyn PolicyEngine>>,
        fallback: FallbackPolicy,
    ) -> Self {
        Self {
            primary,
            secondary,
            fallback,
        }
    }

    /// Build process engines from config.
    pub fn from_config(section: &EngineSection) -> Self {
        let primary: Arc<dyn PolicyEngine> =
            Arc::new(ProcessEngine::from_config(&section.primary, section));
        let secondary = section.secondary.as_ref().map(|cmd| {
            Arc::new(ProcessEngine::from_config(cmd, section)) as Arc<dyn PolicyEngine>
        });
        Self::new(primary, secondary, FallbackPolicy::from_flag(section.disable_fallback))
    }

    pub fn fallback(&self) -> FallbackPolicy {
        self.fallback
    }

    pub async fn run(&self, code: &str, context: Option<&str>) -> EngineResult {
        let primary = self.primary.run(code, context).await;
        let Some(failure) = primary.failure.clone() else {
            return EngineResult::from_outcome(primary, EngineTag::Primary);
        };

        if !failure.is_infrastructure() {
            tracing::debug!(engine = self.primary.name(), reason = failure.label(), "policy rejected by engine");
            return EngineResult::from_outcome(primary, EngineTag::Primary);
        }

        match (&self.secondary, self.fallback) {
            (Some(secondary), FallbackPolicy::OnInfrastructureFailure) => {
                tracing::warn!(
                    primary = self.primary.name(),
                    secondary = secondary.name(),
                    reason = failure.label(),
                    error = %failure,
                    "primary engine failed, falling back"
                );
                let outcome: EngineOutcome = secondary.run(code, context).await;
                if let Some(f) = &outcome.failure {
                    tracing::warn!(engine = secondary.name(), reason = f.label(), error = %f, "secondary engine failed");
                }
                EngineResult::from_outcome(outcome, EngineTag::Secondary)
            }
            _ => {
                tracing::warn!(
                    engine = self.primary.name(),
                    reason = failure.label(),
                    error = %failure,
                    "primary engine failed, fallback unavailable"
                );
                EngineResult::from_outcome(primary, EngineTag::None)
            }
        }
    }
}
