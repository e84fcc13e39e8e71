//! Health domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reachability of one component
///
/// Ordered from best to worst so the overall status is the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reachability {
    Healthy,
    Degraded,
    Unreachable,
}

impl std::fmt::Display for Reachability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reachability::Healthy => write!(f, "healthy"),
            Reachability::Degraded => write!(f, "degraded"),
            Reachability::Unreachable => write!(f, "unreachable"),
        }
    }
}

/// Probe result for one adapter or datastore
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: Reachability,
    pub detail: Option<String>,
}

impl ComponentHealth {
    pub fn healthy(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: Reachability::Healthy,
            detail: None,
        }
    }

    pub fn degraded(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: Reachability::Degraded,
            detail: Some(detail.into()),
        }
    }

    pub fn unreachable(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: Reachability::Unreachable,
            detail: Some(detail.into()),
        }
    }
}

/// Aggregated health of the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub overall: Reachability,
    pub components: Vec<ComponentHealth>,
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    /// Builds a report whose overall status is derived from the components.
    ///
    /// Any unhealthy component degrades the service; it is only reported
    /// unreachable when every component is.
    pub fn from_components(components: Vec<ComponentHealth>) -> Self {
        let overall = if components.is_empty()
            || components.iter().all(|c| c.status == Reachability::Healthy)
        {
            Reachability::Healthy
        } else if components
            .iter()
            .all(|c| c.status == Reachability::Unreachable)
        {
            Reachability::Unreachable
        } else {
            Reachability::Degraded
        };

        Self {
            overall,
            components,
            checked_at: Utc::now(),
        }
    }

    pub fn component(&self, name: &str) -> Option<&ComponentHealth> {
        self.components.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_healthy() {
        let report = HealthReport::from_components(vec![
            ComponentHealth::healthy("speech"),
            ComponentHealth::healthy("llm"),
        ]);
        assert_eq!(report.overall, Reachability::Healthy);
    }

    #[test]
    fn test_one_unreachable_degrades() {
        let report = HealthReport::from_components(vec![
            ComponentHealth::healthy("speech"),
            ComponentHealth::unreachable("upload", "credential not configured"),
        ]);
        assert_eq!(report.overall, Reachability::Degraded);
        assert_eq!(
            report.component("upload").map(|c| c.status),
            Some(Reachability::Unreachable)
        );
    }

    #[test]
    fn test_all_unreachable() {
        let report = HealthReport::from_components(vec![
            ComponentHealth::unreachable("speech", "down"),
            ComponentHealth::unreachable("llm", "down"),
        ]);
        assert_eq!(report.overall, Reachability::Unreachable);
    }

    #[test]
    fn test_reachability_ordering() {
        assert!(Reachability::Healthy < Reachability::Degraded);
        assert!(Reachability::Degraded < Reachability::Unreachable);
    }
}
