use rand::Rng;
use serde::Serialize;

use crate::error::{Result, TunerError};
use crate::tuner::constants::{
    DEFAULT_LIVES, DEFAULT_SCALE, DEFAULT_ZSCORE, FLOOR_MARGIN, SKIP_PENALTY,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionKind {
    Integer,
    Real,
}

/// A tunable dimension with closed bounds `[lower, upper]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    pub name: &'static str,
    pub kind: DimensionKind,
    pub lower: f64,
    pub upper: f64,
}

impl Dimension {
    pub fn integer(name: &'static str, lower: i64, upper: i64) -> Result<Self> {
        Self::new(name, DimensionKind::Integer, lower as f64, upper as f64)
    }

    pub fn real(name: &'static str, lower: f64, upper: f64) -> Result<Self> {
        Self::new(name, DimensionKind::Real, lower, upper)
    }

    fn new(name: &'static str, kind: DimensionKind, lower: f64, upper: f64) -> Result<Self> {
        if !lower.is_finite() || !upper.is_finite() || lower > upper {
            return Err(TunerError::InvalidDimension {
                name: name.to_string(),
                lower,
                upper,
            });
        }
        Ok(Self {
            name,
            kind,
            lower,
            upper,
        })
    }

    fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Bring a raw value inside the bounds, rounding integer dimensions.
    pub fn clamp(&self, value: f64) -> f64 {
        let value = match self.kind {
            DimensionKind::Integer => value.round(),
            DimensionKind::Real => value,
        };
        value.clamp(self.lower, self.upper)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }

    /// Map a value to `[0, 1]`. Degenerate dimensions map to 0.
    pub fn to_unit(&self, value: f64) -> f64 {
        let width = self.width();
        if width > 0.0 {
            (value - self.lower) / width
        } else {
            0.0
        }
    }

    pub fn from_unit(&self, unit: f64) -> f64 {
        self.clamp(self.lower + unit.clamp(0.0, 1.0) * self.width())
    }

    fn sample(&self, rng: &mut impl Rng) -> f64 {
        match self.kind {
            DimensionKind::Integer => {
                rng.gen_range(self.lower as i64..=self.upper as i64) as f64
            }
            DimensionKind::Real => rng.gen_range(self.lower..=self.upper),
        }
    }
}

/// Candidate assignment of the tuned parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchPoint {
    pub lives: i64,
    pub scale: f64,
    pub zscore: f64,
}

impl SearchPoint {
    pub fn new(lives: i64, scale: f64, zscore: f64) -> Self {
        Self {
            lives,
            scale,
            zscore,
        }
    }

    /// Format the point as a compact string for display.
    pub fn display(&self) -> String {
        format!(
            "lives={} scale={:.4} zscore={:.3}",
            self.lives, self.scale, self.zscore
        )
    }
}

/// The three tuned dimensions: `lives` (integer), `scale` and `zscore` (real).
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSpace {
    pub lives: Dimension,
    pub scale: Dimension,
    pub zscore: Dimension,
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self {
            lives: Dimension {
                name: "lives",
                kind: DimensionKind::Integer,
                lower: DEFAULT_LIVES.0 as f64,
                upper: DEFAULT_LIVES.1 as f64,
            },
            scale: Dimension {
                name: "scale",
                kind: DimensionKind::Real,
                lower: DEFAULT_SCALE.0,
                upper: DEFAULT_SCALE.1,
            },
            zscore: Dimension {
                name: "zscore",
                kind: DimensionKind::Real,
                lower: DEFAULT_ZSCORE.0,
                upper: DEFAULT_ZSCORE.1,
            },
        }
    }
}

impl SearchSpace {
    /// Build the space, rejecting any dimension with `lower > upper`.
    ///
    /// `lives` must stay positive since it divides the base window size.
    pub fn new(lives: (i64, i64), scale: (f64, f64), zscore: (f64, f64)) -> Result<Self> {
        if lives.0 < 1 {
            return Err(TunerError::InvalidDimension {
                name: "lives".to_string(),
                lower: lives.0 as f64,
                upper: lives.1 as f64,
            });
        }
        Ok(Self {
            lives: Dimension::integer("lives", lives.0, lives.1)?,
            scale: Dimension::real("scale", scale.0, scale.1)?,
            zscore: Dimension::real("zscore", zscore.0, zscore.1)?,
        })
    }

    pub fn contains(&self, point: &SearchPoint) -> bool {
        self.lives.contains(point.lives as f64)
            && self.scale.contains(point.scale)
            && self.zscore.contains(point.zscore)
    }

    pub fn clamp(&self, point: &SearchPoint) -> SearchPoint {
        SearchPoint {
            lives: self.lives.clamp(point.lives as f64) as i64,
            scale: self.scale.clamp(point.scale),
            zscore: self.zscore.clamp(point.zscore),
        }
    }

    /// Draw a point uniformly inside the bounds.
    pub fn sample(&self, rng: &mut impl Rng) -> SearchPoint {
        SearchPoint {
            lives: self.lives.sample(rng) as i64,
            scale: self.scale.sample(rng),
            zscore: self.zscore.sample(rng),
        }
    }

    pub fn to_unit(&self, point: &SearchPoint) -> [f64; 3] {
        [
            self.lives.to_unit(point.lives as f64),
            self.scale.to_unit(point.scale),
            self.zscore.to_unit(point.zscore),
        ]
    }

    pub fn from_unit(&self, unit: &[f64; 3]) -> SearchPoint {
        SearchPoint {
            lives: self.lives.from_unit(unit[0]) as i64,
            scale: self.scale.from_unit(unit[1]),
            zscore: self.zscore.from_unit(unit[2]),
        }
    }
}

/// Engine window size for a point: `(base_size / lives) * scale`, truncated
/// to the integer size the engine reads.
pub fn derive_size(base_size: f64, lives: i64, scale: f64) -> i64 {
    ((base_size / lives as f64) * scale) as i64
}

/// What to do with a derived size that does not clear the slide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizePolicy {
    /// Score the point as infeasible without running the engine.
    Skip { penalty: f64 },
    /// Raise the size to `slide + margin` and always run the engine.
    Floor { margin: i64 },
}

impl SizePolicy {
    pub fn skip() -> Self {
        SizePolicy::Skip {
            penalty: SKIP_PENALTY,
        }
    }

    pub fn floor() -> Self {
        SizePolicy::Floor {
            margin: FLOOR_MARGIN,
        }
    }

    pub fn apply(&self, derived: i64, slide: i64) -> SizeDecision {
        match *self {
            SizePolicy::Skip { penalty } if derived <= slide => SizeDecision::Skip {
                size: derived,
                penalty,
            },
            SizePolicy::Skip { .. } => SizeDecision::Run { size: derived },
            SizePolicy::Floor { margin } => SizeDecision::Run {
                size: derived.max(slide + margin),
            },
        }
    }
}

impl Default for SizePolicy {
    fn default() -> Self {
        SizePolicy::skip()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeDecision {
    Run { size: i64 },
    Skip { size: i64, penalty: f64 },
}
