//! Typed 2D points.

use std::marker::PhantomData;

/// A point tagged with its coordinate space ([`Pixel`](super::Pixel) or
/// [`Normalized`](super::Normalized)).
#[derive(Clone, Copy, PartialEq)]
pub struct Coord<TSpace> {
    pub x: f64,
    pub y: f64,
    _space: PhantomData<TSpace>,
}

impl<TSpace> Coord<TSpace> {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            _space: PhantomData,
        }
    }

    /// Returns true if neither component is NaN or infinite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl<TSpace> std::fmt::Debug for Coord<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Coord").field(&self.x).field(&self.y).finish()
    }
}

impl<TSpace> Default for Coord<TSpace> {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Pixel;

    #[test]
    fn finite_check_rejects_nan_and_inf() {
        assert!(Coord::<Pixel>::new(1.0, 2.0).is_finite());
        assert!(!Coord::<Pixel>::new(f64::NAN, 2.0).is_finite());
        assert!(!Coord::<Pixel>::new(1.0, f64::NEG_INFINITY).is_finite());
    }
}
