//! Effect configuration.
//!
//! Keys keep the SCREAMING_SNAKE_CASE names the effect has always been
//! configured with, so existing JSON presets load unchanged. Every field has
//! a default; a partial document only overrides what it names.

use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::error::{FluidError, Result};
use crate::field::Resolution;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct Config {
    /// Width of the velocity/pressure grids. Height is half of it.
    pub sim_resolution: u32,
    /// Width of the dye grid. Height is half of it.
    pub dye_resolution: u32,
    pub capture_resolution: u32,
    pub density_dissipation: f32,
    pub velocity_dissipation: f32,
    /// Fraction of last frame's pressure kept as the Jacobi starting guess.
    pub pressure: f32,
    pub pressure_iterations: u32,
    /// Vorticity confinement strength.
    pub curl: f32,
    /// Splat radius in percent of the domain.
    pub splat_radius: f32,
    /// Multiplier from pointer delta to splat velocity.
    pub splat_force: f32,
    pub shading: bool,
    pub colorful: bool,
    pub color_update_speed: f32,
    pub paused: bool,
    /// Pointer events are dropped unless this is set.
    pub event_permission: bool,

    // Consumed by the display layer only.
    pub back_color: Rgb,
    pub transparent: bool,
    pub bloom: bool,
    pub bloom_iterations: u32,
    pub bloom_resolution: u32,
    pub bloom_intensity: f32,
    pub bloom_threshold: f32,
    pub bloom_soft_knee: f32,
    pub sunrays: bool,
    pub sunrays_resolution: u32,
    pub sunrays_weight: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sim_resolution: 256,
            dye_resolution: 1024,
            capture_resolution: 512,
            density_dissipation: 1.0,
            velocity_dissipation: 0.2,
            pressure: 0.8,
            pressure_iterations: 20,
            curl: 30.0,
            splat_radius: 0.5,
            splat_force: 6000.0,
            shading: true,
            colorful: true,
            color_update_speed: 10.0,
            paused: false,
            event_permission: false,
            back_color: Rgb::new(0.0, 0.0, 0.0),
            transparent: false,
            bloom: true,
            bloom_iterations: 8,
            bloom_resolution: 256,
            bloom_intensity: 0.8,
            bloom_threshold: 0.6,
            bloom_soft_knee: 0.7,
            sunrays: true,
            sunrays_resolution: 196,
            sunrays_weight: 1.0,
        }
    }
}

impl Config {
    /// Parse a (possibly partial) JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| FluidError::InvalidConfig(e.to_string()))
    }

    pub fn sim_size(&self) -> Resolution {
        Resolution::half_height(self.sim_resolution)
    }

    pub fn dye_size(&self) -> Resolution {
        Resolution::half_height(self.dye_resolution)
    }

    /// Splat radius as used by the splat kernel.
    pub fn splat_radius_uv(&self) -> f32 {
        self.splat_radius / 100.0
    }

    /// Whether switching from `self` to `other` needs new fields.
    pub fn needs_reallocation(&self, other: &Config) -> bool {
        self.sim_size() != other.sim_size() || self.dye_size() != other.dye_size()
    }

    pub fn validate(&self) -> Result<()> {
        self.sim_size().ensure_non_zero()?;
        self.dye_size().ensure_non_zero()?;

        if !(self.splat_radius.is_finite() && self.splat_radius > 0.0) {
            return Err(FluidError::InvalidConfig(format!(
                "SPLAT_RADIUS must be positive, got {}",
                self.splat_radius
            )));
        }

        let numeric = [
            ("DENSITY_DISSIPATION", self.density_dissipation),
            ("VELOCITY_DISSIPATION", self.velocity_dissipation),
            ("PRESSURE", self.pressure),
            ("CURL", self.curl),
            ("SPLAT_FORCE", self.splat_force),
            ("COLOR_UPDATE_SPEED", self.color_update_speed),
        ];
        for (name, value) in numeric {
            if !value.is_finite() {
                return Err(FluidError::InvalidConfig(format!("{name} must be finite")));
            }
        }

        // Advection divides by `1 + dissipation * dt`.
        let dissipation = [
            ("DENSITY_DISSIPATION", self.density_dissipation),
            ("VELOCITY_DISSIPATION", self.velocity_dissipation),
        ];
        for (name, value) in dissipation {
            if value < 0.0 {
                return Err(FluidError::InvalidConfig(format!(
                    "{name} must not be negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.sim_size(), Resolution::new(256, 128));
        assert_eq!(config.dye_size(), Resolution::new(1024, 512));
        assert_eq!(config.splat_radius_uv(), 0.005);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = Config::from_json(r#"{"SIM_RESOLUTION": 64, "PAUSED": true}"#).unwrap();
        assert_eq!(config.sim_resolution, 64);
        assert!(config.paused);
        assert_eq!(config.dye_resolution, 1024);
        assert_eq!(config.pressure_iterations, 20);
    }

    #[test]
    fn test_json_round_trip_uses_original_keys() {
        let json = serde_json::to_value(Config::default()).unwrap();
        assert_eq!(json["PRESSURE_ITERATIONS"], 20);
        assert_eq!(json["BACK_COLOR"]["r"], 0.0);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            Config::from_json("{\"CURL\": \"lots\"}"),
            Err(FluidError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_degenerate_grids() {
        let config = Config {
            sim_resolution: 1,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(FluidError::ZeroResolution { .. })));
    }

    #[test]
    fn test_validate_rejects_bad_radius() {
        let config = Config {
            splat_radius: 0.0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_negative_dissipation() {
        let config = Config {
            velocity_dissipation: -100.0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(FluidError::InvalidConfig(_))));

        let config = Config {
            density_dissipation: 0.0,
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_needs_reallocation() {
        let a = Config::default();
        let b = Config {
            curl: 5.0,
            ..a.clone()
        };
        let c = Config {
            dye_resolution: 512,
            ..a.clone()
        };
        assert!(!a.needs_reallocation(&b));
        assert!(a.needs_reallocation(&c));
    }
}
