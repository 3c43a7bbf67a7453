//! Score modifiers: pure `f64 -> f64` transforms applied to raw oracle scores

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
enum Kind {
    Linear { slope: f64 },
    Squared { target: f64, coefficient: f64 },
    Absolute { target: f64 },
    Gaussian { mu: f64, sigma: f64 },
    MinMaxGaussian { mu: f64, sigma: f64, minimize: bool },
    Clipped { slope: f64, intercept: f64, high: f64, low: f64 },
    SmoothClipped { k: f64, middle: f64, high: f64, low: f64 },
    ThresholdedLinear { threshold: f64 },
    Chained(Vec<Modifier>),
}

/// A validated score modifier.
///
/// ```rust
/// use tdc_bench::oracle::Modifier;
///
/// let clipped = Modifier::clipped(1.0, 0.0, 1.0, 0.0)?;
/// assert_eq!(clipped.apply(0.5), 0.5);
/// assert_eq!(clipped.apply(2.0), 1.0);
/// # Ok::<(), tdc_bench::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Modifier(Kind);

fn check_finite(name: &str, values: &[f64]) -> Result<()> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("{name} modifier parameters must be finite")))
    }
}

fn check_positive(name: &str, what: &str, value: f64) -> Result<()> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "{name} modifier needs a positive {what}, got {value}"
        )))
    }
}

fn check_range(name: &str, upper_x: f64, lower_x: f64, high: f64, low: f64) -> Result<()> {
    check_finite(name, &[upper_x, lower_x, high, low])?;
    if low >= high {
        return Err(Error::InvalidInput(format!(
            "{name} modifier needs low < high, got low={low} high={high}"
        )));
    }
    if upper_x == lower_x {
        return Err(Error::InvalidInput(format!(
            "{name} modifier needs upper_x != lower_x, both are {upper_x}"
        )));
    }
    Ok(())
}

impl Modifier {
    /// Identity.
    #[must_use]
    pub const fn identity() -> Self {
        Self(Kind::Linear { slope: 1.0 })
    }

    /// `slope · x`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a non-finite slope.
    pub fn linear(slope: f64) -> Result<Self> {
        check_finite("linear", &[slope])?;
        Ok(Self(Kind::Linear { slope }))
    }

    /// `1 − coefficient · (target − x)²`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for non-finite parameters.
    pub fn squared(target: f64, coefficient: f64) -> Result<Self> {
        check_finite("squared", &[target, coefficient])?;
        Ok(Self(Kind::Squared {
            target,
            coefficient,
        }))
    }

    /// `1 − |target − x|`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a non-finite target.
    pub fn absolute(target: f64) -> Result<Self> {
        check_finite("absolute", &[target])?;
        Ok(Self(Kind::Absolute { target }))
    }

    /// Gaussian bell `exp(−½((x − mu)/sigma)²)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `sigma <= 0` or parameters are not
    /// finite.
    pub fn gaussian(mu: f64, sigma: f64) -> Result<Self> {
        check_finite("gaussian", &[mu, sigma])?;
        check_positive("gaussian", "sigma", sigma)?;
        Ok(Self(Kind::Gaussian { mu, sigma }))
    }

    /// Half Gaussian: flat 1.0 for `x <= mu` when minimizing, for `x >= mu`
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Same as [`Modifier::gaussian`].
    pub fn min_max_gaussian(mu: f64, sigma: f64, minimize: bool) -> Result<Self> {
        check_finite("min_max_gaussian", &[mu, sigma])?;
        check_positive("min_max_gaussian", "sigma", sigma)?;
        Ok(Self(Kind::MinMaxGaussian {
            mu,
            sigma,
            minimize,
        }))
    }

    /// Linear interpolation from (`lower_x`, `low`) to (`upper_x`, `high`),
    /// clipped to `[low, high]`. `upper_x < lower_x` gives a decreasing ramp.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `low >= high` or `upper_x == lower_x`.
    pub fn clipped(upper_x: f64, lower_x: f64, high: f64, low: f64) -> Result<Self> {
        check_range("clipped", upper_x, lower_x, high, low)?;
        let slope = (high - low) / (upper_x - lower_x);
        Ok(Self(Kind::Clipped {
            slope,
            intercept: high - slope * upper_x,
            high,
            low,
        }))
    }

    /// Logistic curve between `low` and `high` with the same central slope as
    /// [`Modifier::clipped`].
    ///
    /// # Errors
    ///
    /// Same as [`Modifier::clipped`].
    pub fn smooth_clipped(upper_x: f64, lower_x: f64, high: f64, low: f64) -> Result<Self> {
        check_range("smooth_clipped", upper_x, lower_x, high, low)?;
        // A standard logistic has slope 1/4 at its midpoint.
        Ok(Self(Kind::SmoothClipped {
            k: 4.0 / (upper_x - lower_x),
            middle: (upper_x + lower_x) / 2.0,
            high,
            low,
        }))
    }

    /// `min(x, threshold) / threshold`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `threshold <= 0`.
    pub fn thresholded_linear(threshold: f64) -> Result<Self> {
        check_finite("thresholded_linear", &[threshold])?;
        check_positive("thresholded_linear", "threshold", threshold)?;
        Ok(Self(Kind::ThresholdedLinear { threshold }))
    }

    /// Apply `modifiers` in order; the last one produces the final score.
    #[must_use]
    pub fn chained(modifiers: Vec<Self>) -> Self {
        Self(Kind::Chained(modifiers))
    }

    /// Transform a raw score.
    #[must_use]
    pub fn apply(&self, x: f64) -> f64 {
        match &self.0 {
            Kind::Linear { slope } => slope * x,
            Kind::Squared {
                target,
                coefficient,
            } => coefficient.mul_add(-(target - x).powi(2), 1.0),
            Kind::Absolute { target } => 1.0 - (target - x).abs(),
            Kind::Gaussian { mu, sigma } => gaussian(x, *mu, *sigma),
            Kind::MinMaxGaussian {
                mu,
                sigma,
                minimize,
            } => {
                let clamped = if *minimize { x.max(*mu) } else { x.min(*mu) };
                gaussian(clamped, *mu, *sigma)
            }
            Kind::Clipped {
                slope,
                intercept,
                high,
                low,
            } => slope.mul_add(x, *intercept).clamp(*low, *high),
            Kind::SmoothClipped { k, middle, high, low } => {
                low + (high - low) / (1.0 + (-k * (x - middle)).exp())
            }
            Kind::ThresholdedLinear { threshold } => x.min(*threshold) / threshold,
            Kind::Chained(modifiers) => modifiers.iter().fold(x, |score, modifier| modifier.apply(score)),
        }
    }
}

impl Default for Modifier {
    fn default() -> Self {
        Self::identity()
    }
}

fn gaussian(x: f64, mu: f64, sigma: f64) -> f64 {
    (-0.5 * ((x - mu) / sigma).powi(2)).exp()
}
