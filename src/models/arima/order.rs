//! SARIMA orders and coefficient masks.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::{ForecastError, Result};

/// A named ARMA coefficient. Lags are 1-based; seasonal lags count seasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Coefficient {
    Ar(usize),
    Ma(usize),
    SeasonalAr(usize),
    SeasonalMa(usize),
}

impl fmt::Display for Coefficient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coefficient::Ar(i) => write!(f, "ar{i}"),
            Coefficient::Ma(i) => write!(f, "ma{i}"),
            Coefficient::SeasonalAr(i) => write!(f, "sar{i}"),
            Coefficient::SeasonalMa(i) => write!(f, "sma{i}"),
        }
    }
}

/// Coefficients fixed to exactly zero during estimation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CoefficientMask {
    fixed: BTreeSet<Coefficient>,
}

impl CoefficientMask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fixed(mut self, coefficient: Coefficient) -> Self {
        self.fixed.insert(coefficient);
        self
    }

    pub fn is_fixed(&self, coefficient: Coefficient) -> bool {
        self.fixed.contains(&coefficient)
    }

    pub fn is_empty(&self) -> bool {
        self.fixed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fixed.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Coefficient> {
        self.fixed.iter()
    }
}

impl FromIterator<Coefficient> for CoefficientMask {
    fn from_iter<I: IntoIterator<Item = Coefficient>>(iter: I) -> Self {
        Self {
            fixed: iter.into_iter().collect(),
        }
    }
}

/// SARIMA order `(p, d, q) x (P, D, Q, s)` with an optional coefficient mask.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SarimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub cap_p: usize,
    pub cap_d: usize,
    pub cap_q: usize,
    pub s: usize,
    pub mask: CoefficientMask,
}

impl SarimaOrder {
    /// Non-seasonal ARIMA(p, d, q).
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self {
            p,
            d,
            q,
            cap_p: 0,
            cap_d: 0,
            cap_q: 0,
            s: 0,
            mask: CoefficientMask::new(),
        }
    }

    /// Seasonal SARIMA(p, d, q)(P, D, Q)[s].
    pub fn seasonal(
        (p, d, q): (usize, usize, usize),
        (cap_p, cap_d, cap_q, s): (usize, usize, usize, usize),
    ) -> Self {
        Self {
            p,
            d,
            q,
            cap_p,
            cap_d,
            cap_q,
            s,
            mask: CoefficientMask::new(),
        }
    }

    pub fn with_mask(mut self, mask: CoefficientMask) -> Self {
        self.mask = mask;
        self
    }

    pub fn is_seasonal(&self) -> bool {
        self.s > 1 && (self.cap_p > 0 || self.cap_d > 0 || self.cap_q > 0)
    }

    /// Check the order is internally consistent.
    pub fn validate(&self) -> Result<()> {
        if (self.cap_p > 0 || self.cap_d > 0 || self.cap_q > 0) && self.s < 2 {
            return Err(ForecastError::InvalidParameter(format!(
                "seasonal terms in {self} need a seasonal period of at least 2"
            )));
        }
        for c in self.mask.iter() {
            if !self.coefficients().any(|x| x == *c) {
                return Err(ForecastError::InvalidParameter(format!(
                    "mask names {c}, which is not a coefficient of {self}"
                )));
            }
        }
        Ok(())
    }

    /// Observations consumed by differencing.
    pub fn differencing_lag(&self) -> usize {
        self.d + self.s * self.cap_d
    }

    /// Whether a mean term is estimated (only without differencing).
    pub fn has_mean(&self) -> bool {
        self.d + self.cap_d == 0
    }

    /// Degree of the expanded AR polynomial `φ(B)Φ(Bˢ)`.
    pub fn ar_degree(&self) -> usize {
        self.p + self.s * self.cap_p
    }

    /// Degree of the expanded MA polynomial `θ(B)Θ(Bˢ)`.
    pub fn ma_degree(&self) -> usize {
        self.q + self.s * self.cap_q
    }

    /// All ARMA coefficients in canonical order: ar, ma, sar, sma.
    pub fn coefficients(&self) -> impl Iterator<Item = Coefficient> {
        let (p, q, cap_p, cap_q) = (self.p, self.q, self.cap_p, self.cap_q);
        (1..=p)
            .map(Coefficient::Ar)
            .chain((1..=q).map(Coefficient::Ma))
            .chain((1..=cap_p).map(Coefficient::SeasonalAr))
            .chain((1..=cap_q).map(Coefficient::SeasonalMa))
    }

    /// Coefficients that are estimated.
    pub fn free_coefficients(&self) -> Vec<Coefficient> {
        self.coefficients()
            .filter(|c| !self.mask.is_fixed(*c))
            .collect()
    }

    /// Number of estimated ARMA coefficients (excludes the mean and σ²).
    pub fn n_free_arma(&self) -> usize {
        self.coefficients()
            .filter(|c| !self.mask.is_fixed(*c))
            .count()
    }
}

impl fmt::Display for SarimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SARIMA({},{},{})", self.p, self.d, self.q)?;
        if self.cap_p + self.cap_d + self.cap_q > 0 {
            write!(f, "({},{},{})[{}]", self.cap_p, self.cap_d, self.cap_q, self.s)?;
        }
        if !self.mask.is_empty() {
            let fixed: Vec<String> = self.mask.iter().map(|c| c.to_string()).collect();
            write!(f, " fixed[{}]", fixed.join(","))?;
        }
        Ok(())
    }
}
