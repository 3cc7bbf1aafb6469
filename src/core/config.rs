//! Game configuration.
//!
//! Games configure the kernel at startup by naming their phase cycle and
//! tuning name resolution. Everything else (event types, action kinds)
//! is registered against the live [`Game`] after construction.
//!
//! [`Game`]: crate::core::Game

use serde::{Deserialize, Serialize};

/// Opaque phase identifier, an index into the configured phase cycle.
///
/// The kernel only advances and compares phases; games assign meaning
/// ("day", "night", "dusk") via [`GameConfig`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhaseId(pub u32);

impl PhaseId {
    /// Create a phase ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw index value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for PhaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Phase({})", self.0)
    }
}

/// Complete game configuration.
///
/// ## Defaults
///
/// - Phases: `day`, `night`
/// - Fuzzy match cutoff: 0.8
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameConfig {
    /// Phase names, in cycle order. Advancing past the last phase wraps
    /// to the first and increments the day counter.
    pub phases: Vec<String>,

    /// Minimum similarity score for fuzzy name resolution.
    pub match_cutoff: f64,
}

impl GameConfig {
    /// Create a configuration with the default day/night cycle.
    #[must_use]
    pub fn new() -> Self {
        Self {
            phases: vec!["day".to_string(), "night".to_string()],
            match_cutoff: 0.8,
        }
    }

    /// Replace the phase cycle.
    #[must_use]
    pub fn with_phases(mut self, phases: Vec<String>) -> Self {
        self.phases = phases;
        self
    }

    /// Append a phase to the cycle.
    #[must_use]
    pub fn with_phase(mut self, name: impl Into<String>) -> Self {
        self.phases.push(name.into());
        self
    }

    /// Set the fuzzy match cutoff.
    #[must_use]
    pub fn with_match_cutoff(mut self, cutoff: f64) -> Self {
        self.match_cutoff = cutoff;
        self
    }

    /// Get a phase name by ID.
    #[must_use]
    pub fn phase_name(&self, phase: PhaseId) -> Option<&str> {
        self.phases.get(phase.0 as usize).map(String::as_str)
    }

    /// Number of phases in the cycle.
    #[must_use]
    pub fn phase_count(&self) -> usize {
        self.phases.len()
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_id() {
        let phase = PhaseId::new(1);
        assert_eq!(phase.raw(), 1);
        assert_eq!(format!("{}", phase), "Phase(1)");
        assert_eq!(PhaseId::default(), PhaseId::new(0));
    }

    #[test]
    fn test_default_config() {
        let config = GameConfig::new();

        assert_eq!(config.phase_count(), 2);
        assert_eq!(config.phase_name(PhaseId::new(0)), Some("day"));
        assert_eq!(config.phase_name(PhaseId::new(1)), Some("night"));
        assert_eq!(config.phase_name(PhaseId::new(2)), None);
    }

    #[test]
    fn test_config_builder() {
        let config = GameConfig::new()
            .with_phases(vec!["dawn".to_string()])
            .with_phase("dusk")
            .with_match_cutoff(0.9);

        assert_eq!(config.phase_count(), 2);
        assert_eq!(config.phase_name(PhaseId::new(1)), Some("dusk"));
        assert!((config.match_cutoff - 0.9).abs() < f64::EPSILON);
    }
}
