// =============================================================================
// Shared types used across the quoteflow pipeline
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A raw quote fetched from the quote source: one per successful fetch.
///
/// Immutable once created. The timestamp is the moment the fetch succeeded,
/// not any exchange-side event time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub symbol: String,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

/// A [`PricePoint`] augmented with its converted secondary-currency value.
///
/// Only ever produced by the transform stage from a well-formed input;
/// `secondary_price = price * conversion_rate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedPricePoint {
    pub symbol: String,
    pub price: f64,
    pub secondary_price: f64,
    pub timestamp: DateTime<Utc>,
}

/// The three pipeline stages, in data-flow order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Acquisition,
    Transform,
    Storage,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Acquisition => write!(f, "acquisition"),
            Self::Transform => write!(f, "transform"),
            Self::Storage => write!(f, "storage"),
        }
    }
}

/// Lifecycle of a single stage within one pipeline run.
///
/// Transitions are one-directional: `Init → Running → Draining → Terminated`.
/// A stage may skip `Draining` (acquisition and storage have no drain work),
/// but no stage ever moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StageState {
    Init,
    Running,
    Draining,
    Terminated,
}

impl Default for StageState {
    fn default() -> Self {
        Self::Init
    }
}

impl std::fmt::Display for StageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Init => write!(f, "Init"),
            Self::Running => write!(f, "Running"),
            Self::Draining => write!(f, "Draining"),
            Self::Terminated => write!(f, "Terminated"),
        }
    }
}
