//! quanta::distributions — scalar kernels used by the splitting block.
//!
//! Purpose
//! -------
//! Provide the discrete and continuous probability kernels the marginalization
//! needs, as plain `f64` functions that can be evaluated on any grid:
//! continuity-corrected Normal masses, Binomial masses, and the skew-Gaussian
//! family (density, CDF via Owen's T, and a continuity-corrected version
//! truncated to `[0, limit]`).
//!
//! Key behaviors
//! -------------
//! - [`normal_cc`]: `Φ((x + ½ − μ)/σ) − Φ((x − ½ − μ)/σ)`, the mass a Normal
//!   puts on the integer `x`.
//! - [`binomial_pmf`]: zero outside `0 ≤ k ≤ n` and for non-integer counts.
//! - [`owens_t`]: `T(h, a)` by composite Gauss–Legendre quadrature over
//!   `[0, min(|a|, 1/|a|)]`, using `T(h, a) = ½Φ(h) + ½Φ(ah) − Φ(h)Φ(ah) −
//!   T(ah, 1/a)` for `|a| > 1`. The number of panels is the precision knob.
//! - [`TruncatedSkewGaussianCC`]: mass on integers `0..=limit`; everything
//!   below ½ is assigned to 0 and everything above `limit − ½` to `limit`,
//!   so the masses sum to one.
//!
//! Invariants & assumptions
//! ------------------------
//! - Invalid parameters (negative scale, probabilities outside `[0, 1]`)
//!   produce NaN rather than errors; the block zeroes NaN entries before
//!   accumulating, which matches how points outside physical support are
//!   treated.
//! - A zero scale is a point mass at `loc`.
//!
//! Testing notes
//! -------------
//! - Owen's T is checked against its closed forms `T(0, a) = atan(a)/2π` and
//!   `T(h, 1) = ½Φ(h)(1 − Φ(h))`; masses are checked to sum to one.
use std::f64::consts::{PI, SQRT_2};

use statrs::{
    distribution::{Binomial, Discrete},
    function::erf::erfc,
};

/// Guard added to Normal widths so a zero variance stays finite.
pub const SCALE_FLOOR: f64 = 1e-10;

/// Default number of quadrature panels for Owen's T; absolute error stays
/// below 1e-10.
pub const DEFAULT_OWENS_T_TERMS: usize = 5;

// 10-point Gauss–Legendre rule on [-1, 1], positive half.
const GL_NODES: [f64; 5] = [
    0.148_874_338_981_631_2,
    0.433_395_394_129_247_2,
    0.679_409_568_299_024_4,
    0.865_063_366_688_984_5,
    0.973_906_528_517_171_7,
];
const GL_WEIGHTS: [f64; 5] = [
    0.295_524_224_714_752_9,
    0.269_266_719_309_996_3,
    0.219_086_362_515_982_0,
    0.149_451_349_150_580_6,
    0.066_671_344_308_688_1,
];

pub fn std_normal_pdf(z: f64) -> f64 {
    (-0.5 * z * z).exp() / (2.0 * PI).sqrt()
}

pub fn std_normal_cdf(z: f64) -> f64 {
    0.5 * erfc(-z / SQRT_2)
}

pub fn normal_pdf(x: f64, loc: f64, scale: f64) -> f64 {
    std_normal_pdf((x - loc) / scale) / scale
}

pub fn normal_cdf(x: f64, loc: f64, scale: f64) -> f64 {
    std_normal_cdf((x - loc) / scale)
}

/// Continuity-corrected Normal mass on the integer `x`.
pub fn normal_cc(x: f64, loc: f64, scale: f64) -> f64 {
    normal_cdf(x + 0.5, loc, scale) - normal_cdf(x - 0.5, loc, scale)
}

/// `P(K = k)` for `K ~ Binomial(total, p)`.
///
/// Returns 0 when `total` or `k` is negative or fractional, or `k > total`;
/// NaN when `p` lies outside `[0, 1]`.
pub fn binomial_pmf(total: f64, p: f64, k: f64) -> f64 {
    if total < 0.0 || k < 0.0 || k > total || total.fract() != 0.0 || k.fract() != 0.0 {
        return 0.0;
    }
    match Binomial::new(p, total as u64) {
        Ok(dist) => dist.pmf(k as u64),
        Err(_) => f64::NAN,
    }
}

/// Owen's T function `T(h, a) = (1/2π) ∫₀ᵃ exp(−h²(1 + x²)/2) / (1 + x²) dx`.
///
/// `panels` is the number of 10-point Gauss–Legendre panels (at least one).
pub fn owens_t(h: f64, a: f64, panels: usize) -> f64 {
    if h.is_nan() || a.is_nan() {
        return f64::NAN;
    }
    if a == 0.0 {
        return 0.0;
    }
    if a < 0.0 {
        return -owens_t(h, -a, panels);
    }
    let h = h.abs();
    if a <= 1.0 {
        return owens_t_quadrature(h, a, panels);
    }
    let ah = a * h;
    let (ph, pah) = (std_normal_cdf(h), std_normal_cdf(ah));
    0.5 * ph + 0.5 * pah - ph * pah - owens_t_quadrature(ah, 1.0 / a, panels)
}

fn owens_t_quadrature(h: f64, a: f64, panels: usize) -> f64 {
    let panels = panels.max(1);
    let width = a / panels as f64;
    let half_h2 = 0.5 * h * h;
    let integrand = |x: f64| {
        let one_x2 = 1.0 + x * x;
        (-half_h2 * one_x2).exp() / one_x2
    };
    let mut total = 0.0;
    for p in 0..panels {
        let mid = (p as f64 + 0.5) * width;
        let half = 0.5 * width;
        for (node, weight) in GL_NODES.iter().zip(GL_WEIGHTS.iter()) {
            total += weight * half * (integrand(mid - half * node) + integrand(mid + half * node));
        }
    }
    total / (2.0 * PI)
}

/// Skew-Gaussian with location `loc`, scale `scale` and shape `skewness`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkewGaussian {
    pub loc: f64,
    pub scale: f64,
    pub skewness: f64,
    pub owens_t_terms: usize,
}

impl SkewGaussian {
    /// `2/σ · φ(z) · Φ(αz)`.
    pub fn pdf(&self, x: f64) -> f64 {
        if !(self.scale > 0.0) {
            return f64::NAN;
        }
        let z = (x - self.loc) / self.scale;
        2.0 / self.scale * std_normal_pdf(z) * std_normal_cdf(self.skewness * z)
    }

    /// `Φ(z) − 2·T(z, α)`, clipped to `[0, 1]`.
    pub fn cdf(&self, x: f64) -> f64 {
        if self.scale == 0.0 {
            return if x >= self.loc { 1.0 } else { 0.0 };
        }
        if !(self.scale > 0.0) {
            return f64::NAN;
        }
        let z = (x - self.loc) / self.scale;
        (std_normal_cdf(z) - 2.0 * owens_t(z, self.skewness, self.owens_t_terms)).clamp(0.0, 1.0)
    }
}

/// Continuity-corrected skew-Gaussian restricted to the integers `0..=limit`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruncatedSkewGaussianCC {
    pub inner: SkewGaussian,
    pub limit: f64,
}

impl TruncatedSkewGaussianCC {
    pub fn prob(&self, x: f64) -> f64 {
        let limit = self.limit;
        if limit < 0.0 || x < 0.0 || x > limit {
            return 0.0;
        }
        if limit == 0.0 {
            return 1.0;
        }
        let upper = if x == limit { 1.0 } else { self.inner.cdf(x + 0.5) };
        let lower = if x == 0.0 { 0.0 } else { self.inner.cdf(x - 0.5) };
        (upper - lower).max(0.0)
    }
}
