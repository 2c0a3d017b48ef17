//! Configuration loading from files (std only).

use std::fs;
use std::path::Path;

use crate::error::{ConfigError, Error, Result};

use super::PlannerConfig;

/// Load configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed or validated.
///
/// # Example
///
/// ```rust,ignore
/// use stepper_planner::load_config;
///
/// let config = load_config("planner.toml")?;
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PlannerConfig> {
    let content = fs::read_to_string(path.as_ref()).map_err(|e| {
        let msg = truncated(&e.to_string());
        Error::Config(ConfigError::IoError(msg))
    })?;

    parse_config(&content)
}

/// Parse configuration from a TOML string.
///
/// # Errors
///
/// Returns an error if the TOML is invalid or fails validation.
pub fn parse_config(content: &str) -> Result<PlannerConfig> {
    let config: PlannerConfig = toml::from_str(content).map_err(|e| {
        let msg = truncated(e.message());
        Error::Config(ConfigError::ParseError(msg))
    })?;

    super::validation::validate_config(&config)?;

    Ok(config)
}

/// Copy as much of `msg` as fits, cutting on a character boundary.
fn truncated(msg: &str) -> heapless::String<128> {
    let mut out = heapless::String::new();
    for c in msg.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const AXES: &str = r#"
[axes.x]
steps_per_mm = 100.0
max_feedrate_mm_per_sec = 200.0
max_acceleration_mm_per_sec2 = 1000.0

[axes.y]
steps_per_mm = 100.0
max_feedrate_mm_per_sec = 200.0
max_acceleration_mm_per_sec2 = 1000.0

[axes.z]
steps_per_mm = 400.0
max_feedrate_mm_per_sec = 5.0
max_acceleration_mm_per_sec2 = 100.0

[axes.e]
steps_per_mm = 95.0
max_feedrate_mm_per_sec = 25.0
max_acceleration_mm_per_sec2 = 5000.0
"#;

    #[test]
    fn test_parse_minimal_config() {
        let config = parse_config(AXES).unwrap();
        assert_eq!(config.axes.z.steps_per_mm.value(), 400.0);
        assert!(config.advance.is_none());
    }

    #[test]
    fn test_parse_with_motion_and_advance() {
        let toml = format!(
            "{AXES}\n[motion]\nacceleration_mm_per_sec2 = 500.0\nmax_xy_jerk_mm_per_sec = 10.0\nmin_segment_time_us = 20000\n\n[advance]\nk = 0.05\nfilament_diameter_mm = 1.75\n"
        );

        let config = parse_config(&toml).unwrap();
        assert_eq!(config.motion.acceleration.value(), 500.0);
        assert_eq!(config.motion.max_xy_jerk.value(), 10.0);
        assert_eq!(config.motion.min_segment_time_us, 20000);
        // Unset fields keep their defaults
        assert!((config.motion.max_z_jerk.value() - 0.4).abs() < 1e-6);

        let advance = config.advance.unwrap();
        assert!((advance.filament_diameter - 1.75).abs() < 1e-6);
    }

    #[test]
    fn test_missing_axis_is_parse_error() {
        let toml = r#"
[axes.x]
steps_per_mm = 100.0
max_feedrate_mm_per_sec = 200.0
max_acceleration_mm_per_sec2 = 1000.0
"#;
        assert!(matches!(
            parse_config(toml),
            Err(Error::Config(ConfigError::ParseError(_)))
        ));
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let toml = AXES.replacen("steps_per_mm = 400.0", "steps_per_mm = 0.0", 1);
        assert!(matches!(
            parse_config(&toml),
            Err(Error::Config(ConfigError::InvalidStepsPerUnit { .. }))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            load_config("/nonexistent/planner.toml"),
            Err(Error::Config(ConfigError::IoError(_)))
        ));
    }
}
