use std::fmt;

use serde::Serialize;

use crate::config::Config;
use crate::models::domain::{GuestUsage, Identity};

pub const MAX_GUEST_SUMMARIES: u32 = 2;
pub const MAX_GUEST_QUESTIONS: u32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationKind {
    Summary,
    Quiz,
}

/// Which guest limit blocked a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "limit", rename_all = "camelCase")]
pub enum QuotaLimit {
    Summaries { used: u32, max: u32 },
    Questions { used: u32, requested: u32, max: u32 },
}

impl fmt::Display for QuotaLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuotaLimit::Summaries { used, max } => {
                write!(f, "{} of {} guest summaries used", used, max)
            }
            QuotaLimit::Questions {
                used,
                requested,
                max,
            } => write!(
                f,
                "{} more questions requested with {} of {} guest questions used",
                requested, used, max
            ),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Admission {
    Allowed,
    Denied(QuotaLimit),
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuotaLimits {
    pub max_summaries: u32,
    pub max_questions: u32,
}

impl Default for QuotaLimits {
    fn default() -> Self {
        QuotaLimits {
            max_summaries: MAX_GUEST_SUMMARIES,
            max_questions: MAX_GUEST_QUESTIONS,
        }
    }
}

impl From<&Config> for QuotaLimits {
    fn from(config: &Config) -> Self {
        QuotaLimits {
            max_summaries: config.max_guest_summaries,
            max_questions: config.max_guest_questions,
        }
    }
}

/// Admission control for guest generation requests. Members bypass it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GuestQuotaGate {
    limits: QuotaLimits,
    usage: GuestUsage,
}

impl GuestQuotaGate {
    pub fn new(limits: QuotaLimits, usage: GuestUsage) -> Self {
        Self { limits, usage }
    }

    /// A quiz batch of `cost` questions is admitted whole or not at all.
    pub fn check_allowed(&self, identity: &Identity, kind: GenerationKind, cost: u32) -> Admission {
        if !identity.is_guest {
            return Admission::Allowed;
        }
        let admission = match kind {
            GenerationKind::Summary if self.usage.summaries_count >= self.limits.max_summaries => {
                Admission::Denied(QuotaLimit::Summaries {
                    used: self.usage.summaries_count,
                    max: self.limits.max_summaries,
                })
            }
            GenerationKind::Quiz
                if self.usage.questions_count.saturating_add(cost) > self.limits.max_questions =>
            {
                Admission::Denied(QuotaLimit::Questions {
                    used: self.usage.questions_count,
                    requested: cost,
                    max: self.limits.max_questions,
                })
            }
            _ => Admission::Allowed,
        };
        if let Admission::Denied(limit) = admission {
            log::info!("Guest request denied: {}", limit);
        }
        admission
    }

    /// Call only after the generation succeeded.
    pub fn record(&mut self, identity: &Identity, kind: GenerationKind, cost: u32) {
        if !identity.is_guest {
            return;
        }
        match kind {
            GenerationKind::Summary => {
                self.usage.summaries_count = self.usage.summaries_count.saturating_add(1)
            }
            GenerationKind::Quiz => {
                self.usage.questions_count = self.usage.questions_count.saturating_add(cost)
            }
        }
    }

    /// Starts a fresh guest identity.
    pub fn reset(&mut self) {
        self.usage = GuestUsage::default();
    }

    pub fn usage(&self) -> GuestUsage {
        self.usage
    }

    pub fn limits(&self) -> QuotaLimits {
        self.limits
    }
}
