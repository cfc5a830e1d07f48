//! RateLaw trait for pluggable right-hand sides.

use thy_model::RateModel;

/// A continuous-time system `dx/dt = f(t, x)` over a flat state slice.
///
/// Implementations must be pure: the same `(t, x)` always yields the same
/// derivative. `Sync` lets batch runs share one law across threads.
pub trait RateLaw: Sync {
    /// Length of the state vector.
    fn dimension(&self) -> usize;

    /// Write `f(t, x)` into `dxdt`. Both slices have length
    /// [`RateLaw::dimension`].
    fn rhs(&self, t: f64, x: &[f64], dxdt: &mut [f64]);
}

impl RateLaw for RateModel {
    #[inline]
    fn dimension(&self) -> usize {
        RateModel::dimension(self)
    }

    #[inline]
    fn rhs(&self, t: f64, x: &[f64], dxdt: &mut [f64]) {
        self.derivative_into(t, x, dxdt);
    }
}
