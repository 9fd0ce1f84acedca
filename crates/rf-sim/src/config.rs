//! Simulator configuration surface.
//!
//! All keys are optional in YAML; missing keys take the defaults below. Step
//! sizes are given in days and converted to seconds by [`crate::StepControl`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Write snapshots at report steps.
    pub output: bool,
    /// Write every n-th report step (the last one always).
    pub output_interval: usize,
    /// Emit progress logging (only honoured on the coordinating process).
    pub output_terminal: bool,
    /// Take step-control parameters from schedule tuning.
    #[serde(rename = "use_TUNING")]
    pub use_tuning: bool,
    pub timestep: TimeStepConfig,
    pub nonlinear: NonlinearConfig,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            output: true,
            output_interval: 1,
            output_terminal: true,
            use_tuning: false,
            timestep: TimeStepConfig::default(),
            nonlinear: NonlinearConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeStepConfig {
    /// Subdivide report steps; when false each report step is one attempt.
    pub adaptive: bool,
    pub initial_step_days: f64,
    pub min_step_days: f64,
    pub max_step_days: f64,
    pub growth_factor: f64,
    pub shrink_factor: f64,
    /// Consecutive failed attempts allowed for one sub-step.
    pub max_restarts: usize,
    /// Step size imposed at the start of a report step with well events.
    pub step_after_event_days: Option<f64>,
    /// Attempt the whole first report step before any cut.
    pub full_step_initially: bool,
    /// Log every sub-step.
    pub verbose: bool,
}

impl Default for TimeStepConfig {
    fn default() -> Self {
        Self {
            adaptive: true,
            initial_step_days: 1.0,
            min_step_days: 1.0e-12,
            max_step_days: 365.0,
            growth_factor: 2.0,
            shrink_factor: 0.33,
            max_restarts: 10,
            step_after_event_days: None,
            full_step_initially: false,
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NonlinearConfig {
    pub nl_maxiter: usize,
    pub nl_tolerance: f64,
}

impl Default for NonlinearConfig {
    fn default() -> Self {
        Self {
            nl_maxiter: 30,
            nl_tolerance: 1e-9,
        }
    }
}

fn invalid(what: impl Into<String>) -> SimError {
    SimError::Config { what: what.into() }
}

impl SimulatorConfig {
    pub fn from_yaml_str(content: &str) -> SimResult<Self> {
        let config: SimulatorConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_yaml(path: &Path) -> SimResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.output_interval == 0 {
            return Err(invalid("output_interval must be at least 1"));
        }
        self.timestep.validate()?;
        self.nonlinear.validate()
    }
}

impl TimeStepConfig {
    pub fn validate(&self) -> SimResult<()> {
        for (value, what) in [
            (self.initial_step_days, "timestep.initial_step_days"),
            (self.min_step_days, "timestep.min_step_days"),
            (self.max_step_days, "timestep.max_step_days"),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(format!("{what} must be positive, got {value}")));
            }
        }
        if self.min_step_days > self.max_step_days {
            return Err(invalid(format!(
                "timestep.min_step_days ({}) exceeds timestep.max_step_days ({})",
                self.min_step_days, self.max_step_days
            )));
        }
        if !(self.growth_factor.is_finite() && self.growth_factor >= 1.0) {
            return Err(invalid("timestep.growth_factor must be >= 1"));
        }
        if !(self.shrink_factor > 0.0 && self.shrink_factor < 1.0) {
            return Err(invalid("timestep.shrink_factor must be in (0, 1)"));
        }
        if let Some(after) = self.step_after_event_days {
            if !(after.is_finite() && after > 0.0) {
                return Err(invalid("timestep.step_after_event_days must be positive"));
            }
        }
        Ok(())
    }
}

impl NonlinearConfig {
    pub fn validate(&self) -> SimResult<()> {
        if self.nl_maxiter == 0 {
            return Err(invalid("nonlinear.nl_maxiter must be at least 1"));
        }
        if !(self.nl_tolerance.is_finite() && self.nl_tolerance > 0.0) {
            return Err(invalid("nonlinear.nl_tolerance must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = SimulatorConfig::default();
        assert!(config.output);
        assert_eq!(config.output_interval, 1);
        assert!(config.timestep.adaptive);
        assert!(!config.use_tuning);
        assert_eq!(config.nonlinear.nl_maxiter, 30);
        assert_eq!(config.timestep.shrink_factor, 0.33);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_yaml_gives_defaults() {
        let config = SimulatorConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, SimulatorConfig::default());
    }

    #[test]
    fn partial_yaml_overrides_keys() {
        let config = SimulatorConfig::from_yaml_str(
            "output: false\nuse_TUNING: true\ntimestep:\n  adaptive: false\n  growth_factor: 1.5\nnonlinear:\n  nl_maxiter: 12\n",
        )
        .unwrap();
        assert!(!config.output);
        assert!(config.use_tuning);
        assert!(!config.timestep.adaptive);
        assert_eq!(config.timestep.growth_factor, 1.5);
        assert_eq!(config.timestep.max_step_days, 365.0);
        assert_eq!(config.nonlinear.nl_maxiter, 12);
        assert_eq!(config.nonlinear.nl_tolerance, 1e-9);
    }

    #[test]
    fn rejects_bad_factors_and_bounds() {
        let mut config = SimulatorConfig::default();
        config.timestep.shrink_factor = 1.0;
        assert!(config.validate().is_err());

        let mut config = SimulatorConfig::default();
        config.timestep.growth_factor = 0.9;
        assert!(config.validate().is_err());

        let mut config = SimulatorConfig::default();
        config.timestep.min_step_days = 10.0;
        config.timestep.max_step_days = 1.0;
        assert!(config.validate().is_err());

        let mut config = SimulatorConfig::default();
        config.output_interval = 0;
        assert!(config.validate().is_err());
    }
}
