use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LandscapeConfig {
    /// Deterministic seed for the auto-perturbation random walk.
    pub seed: u64,
    /// Number of mesh segments per side. The mesh has `(n + 1)^2` vertices.
    pub grid_segments: usize,
    /// Width/height of the square mesh in world units, centered at the origin.
    pub extent: f64,
    /// World coordinates are divided by this before entering the network.
    pub input_scale: f64,
    /// Network output (0, 1) is multiplied by this to get a height.
    pub height_scale: f64,
    /// Subtracted from the scaled output so the surface is centered on z = 0.
    pub height_offset: f64,
    /// Absolute clamp for every weight and bias. At most `nn::WEIGHT_LIMIT`.
    pub weight_limit: f64,
    /// Wall-clock period of the auto-perturbation timer.
    pub perturb_interval_ms: u64,
    /// Magnitude bound for each uniform perturbation delta.
    pub perturb_step: f64,
    /// Maximum number of overdue timer ticks replayed by a single poll.
    pub max_catch_up_ticks: u32,
    /// Suspend the perturbation timer while the view is hidden.
    pub pause_when_hidden: bool,
}

impl Default for LandscapeConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            grid_segments: 50,
            extent: 12.0,
            input_scale: 3.0,
            height_scale: 5.0,
            height_offset: 2.5,
            weight_limit: crate::nn::WEIGHT_LIMIT,
            perturb_interval_ms: 100,
            perturb_step: 0.05,
            max_catch_up_ticks: 10,
            pause_when_hidden: false,
        }
    }
}

macro_rules! define_landscape_config_error {
    (
        $(
            $variant:ident $( { $($field:ident : $type:ty),* } )? => $fmt:literal $(, $arg:expr)*
        );* $(;)?
    ) => {
        #[derive(Debug, Clone, PartialEq)]
        pub enum LandscapeConfigError {
            $(
                $variant $( { $($field : $type),* } )?,
            )*
        }

        impl std::fmt::Display for LandscapeConfigError {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        Self::$variant $( { $($field),* } )? => write!(f, $fmt $(, $arg)*),
                    )*
                }
            }
        }
    };
}

define_landscape_config_error! {
    InvalidGridSegments => "grid_segments must be greater than 0";
    GridTooLarge { max: usize, actual: usize } => "grid_segments ({actual}) exceeds supported maximum ({max})";
    InvalidExtent => "extent must be positive and finite";
    InvalidInputScale => "input_scale must be positive and finite";
    InvalidHeightScale => "height_scale must be finite";
    InvalidHeightOffset => "height_offset must be finite";
    InvalidWeightLimit => "weight_limit must be positive and finite";
    WeightLimitTooLarge { max: f64, actual: f64 } => "weight_limit ({actual}) exceeds supported maximum ({max})";
    InvalidPerturbInterval => "perturb_interval_ms must be greater than 0";
    InvalidPerturbStep => "perturb_step must be finite and non-negative";
    InvalidMaxCatchUpTicks => "max_catch_up_ticks must be greater than 0";
}

impl std::error::Error for LandscapeConfigError {}

impl LandscapeConfig {
    pub const MAX_GRID_SEGMENTS: usize = 1024;

    pub fn validate(&self) -> Result<(), LandscapeConfigError> {
        self.validate_mesh()?;
        self.validate_weights()?;
        self.validate_timer()?;
        Ok(())
    }

    fn validate_mesh(&self) -> Result<(), LandscapeConfigError> {
        if self.grid_segments == 0 {
            return Err(LandscapeConfigError::InvalidGridSegments);
        }
        if self.grid_segments > Self::MAX_GRID_SEGMENTS {
            return Err(LandscapeConfigError::GridTooLarge {
                max: Self::MAX_GRID_SEGMENTS,
                actual: self.grid_segments,
            });
        }
        if !(self.extent.is_finite() && self.extent > 0.0) {
            return Err(LandscapeConfigError::InvalidExtent);
        }
        if !(self.input_scale.is_finite() && self.input_scale > 0.0) {
            return Err(LandscapeConfigError::InvalidInputScale);
        }
        if !self.height_scale.is_finite() {
            return Err(LandscapeConfigError::InvalidHeightScale);
        }
        if !self.height_offset.is_finite() {
            return Err(LandscapeConfigError::InvalidHeightOffset);
        }
        Ok(())
    }

    fn validate_weights(&self) -> Result<(), LandscapeConfigError> {
        if !(self.weight_limit.is_finite() && self.weight_limit > 0.0) {
            return Err(LandscapeConfigError::InvalidWeightLimit);
        }
        if self.weight_limit > crate::nn::WEIGHT_LIMIT {
            return Err(LandscapeConfigError::WeightLimitTooLarge {
                max: crate::nn::WEIGHT_LIMIT,
                actual: self.weight_limit,
            });
        }
        if !(self.perturb_step.is_finite() && self.perturb_step >= 0.0) {
            return Err(LandscapeConfigError::InvalidPerturbStep);
        }
        Ok(())
    }

    fn validate_timer(&self) -> Result<(), LandscapeConfigError> {
        if self.perturb_interval_ms == 0 {
            return Err(LandscapeConfigError::InvalidPerturbInterval);
        }
        if self.max_catch_up_ticks == 0 {
            return Err(LandscapeConfigError::InvalidMaxCatchUpTicks);
        }
        Ok(())
    }

    pub fn perturb_interval(&self) -> Duration {
        Duration::from_millis(self.perturb_interval_ms)
    }

    /// Vertices per mesh side.
    pub fn grid_resolution(&self) -> usize {
        self.grid_segments + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = LandscapeConfig::default();
        assert_eq!(cfg.validate(), Ok(()));
        assert_eq!(cfg.grid_resolution(), 51);
        assert_eq!(cfg.perturb_interval(), Duration::from_millis(100));
    }

    #[test]
    fn partial_config_json_deserializes_with_defaults() {
        let json = r#"{ "seed": 7, "grid_segments": 20 }"#;
        let cfg: LandscapeConfig = serde_json::from_str(json).expect("partial config should parse");
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.grid_segments, 20);
        assert_eq!(cfg.extent, 12.0);
        assert_eq!(cfg.perturb_interval_ms, 100);
        assert!(!cfg.pause_when_hidden);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let cases = [
            (
                LandscapeConfig {
                    grid_segments: 0,
                    ..LandscapeConfig::default()
                },
                LandscapeConfigError::InvalidGridSegments,
            ),
            (
                LandscapeConfig {
                    extent: f64::NAN,
                    ..LandscapeConfig::default()
                },
                LandscapeConfigError::InvalidExtent,
            ),
            (
                LandscapeConfig {
                    weight_limit: -1.0,
                    ..LandscapeConfig::default()
                },
                LandscapeConfigError::InvalidWeightLimit,
            ),
            (
                LandscapeConfig {
                    weight_limit: 50.0,
                    ..LandscapeConfig::default()
                },
                LandscapeConfigError::WeightLimitTooLarge {
                    max: 3.0,
                    actual: 50.0,
                },
            ),
            (
                LandscapeConfig {
                    perturb_interval_ms: 0,
                    ..LandscapeConfig::default()
                },
                LandscapeConfigError::InvalidPerturbInterval,
            ),
            (
                LandscapeConfig {
                    perturb_step: f64::INFINITY,
                    ..LandscapeConfig::default()
                },
                LandscapeConfigError::InvalidPerturbStep,
            ),
        ];
        for (cfg, expected) in cases {
            assert_eq!(cfg.validate(), Err(expected));
        }
    }

    #[test]
    fn oversized_grid_reports_limits() {
        let cfg = LandscapeConfig {
            grid_segments: 5000,
            ..LandscapeConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "grid_segments (5000) exceeds supported maximum (1024)"
        );
    }
}
