//! Count policies deciding how many items a list element produces.

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::error::CompositionError;

/// Rule selecting the length of a generated list.
///
/// Policies are drawn once per list production. [`CountPolicy::draw`] returns
/// the raw policy value; [`CountPolicy::count`] maps it to a usable length.
///
/// # Example
///
/// ```
/// use rand::SeedableRng;
/// use rand_chacha::ChaCha8Rng;
/// use record_synth::CountPolicy;
///
/// let policy = CountPolicy::uniform_range(1, 5).expect("valid range");
/// let mut rng = ChaCha8Rng::seed_from_u64(7);
///
/// let count = policy.count(&mut rng);
/// assert!((1..5).contains(&count));
/// ```
#[derive(Debug, Clone)]
pub enum CountPolicy {
    /// Always the same count.
    Constant(u32),
    /// `floor(min + (max - min) * u)` for a fresh uniform draw, so the upper
    /// bound is exclusive.
    UniformRange {
        /// Inclusive lower bound.
        min: u32,
        /// Exclusive upper bound.
        max: u32,
    },
    /// A normally distributed count, optionally truncated toward zero.
    Normal {
        /// The sampling distribution.
        distribution: Normal<f64>,
        /// Truncate each draw to an integer.
        truncate: bool,
    },
}

impl CountPolicy {
    /// Creates a policy that always yields `count`.
    #[must_use]
    pub const fn constant(count: u32) -> Self {
        Self::Constant(count)
    }

    /// Creates a uniform policy over `min..max`.
    ///
    /// # Errors
    ///
    /// Returns [`CompositionError::InvalidRange`] if `max <= min`.
    pub const fn uniform_range(min: u32, max: u32) -> Result<Self, CompositionError> {
        if max <= min {
            return Err(CompositionError::InvalidRange { min, max });
        }
        Ok(Self::UniformRange { min, max })
    }

    /// Creates a normal policy with the given mean and standard deviation.
    ///
    /// Without `truncate` the raw, possibly fractional or negative, draw is
    /// kept; [`Self::count`] clamps it when a length is needed.
    ///
    /// # Errors
    ///
    /// Returns [`CompositionError::InvalidStdDev`] if `stdev` is negative or
    /// not finite.
    pub fn normal(mean: f64, stdev: f64, truncate: bool) -> Result<Self, CompositionError> {
        if !stdev.is_finite() || stdev < 0.0 {
            return Err(CompositionError::InvalidStdDev { stdev });
        }
        let distribution =
            Normal::new(mean, stdev).map_err(|_| CompositionError::InvalidStdDev { stdev })?;
        Ok(Self::Normal {
            distribution,
            truncate,
        })
    }

    /// Draws the raw policy value.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            Self::Constant(count) => f64::from(*count),
            Self::UniformRange { min, max } => {
                let span = f64::from(max - min);
                let offset = (span * rng.random::<f64>()).floor();
                // Rounding must never reach the exclusive upper bound.
                f64::from(*min) + offset.min(span - 1.0)
            }
            Self::Normal {
                distribution,
                truncate,
            } => {
                let raw = distribution.sample(rng);
                if *truncate { raw.trunc() } else { raw }
            }
        }
    }

    /// Draws a list length.
    ///
    /// Negative draws clamp to zero. A fractional positive draw rounds up, as
    /// a list keeps producing while its remaining count is positive.
    pub fn count<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        to_count(self.draw(rng))
    }
}

impl From<u32> for CountPolicy {
    fn from(count: u32) -> Self {
        Self::constant(count)
    }
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "value is clamped to the u32 range before the cast"
)]
fn to_count(raw: f64) -> u32 {
    if raw.is_nan() || raw <= 0.0 {
        return 0;
    }
    raw.ceil().min(f64::from(u32::MAX)) as u32
}
