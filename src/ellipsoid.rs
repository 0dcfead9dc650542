//! The reference ellipsoid that all geodetic conversions in this crate are relative to.

use uom::si::angle::radian;
use uom::si::f64::{Angle, Length};
use uom::si::length::meter;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// Parameters required for WGS84 ellipsoid
// https://nsgreg.nga.mil/doc/view?i=4085 table 3.1
#[doc(alias = "equatorial radius")]
#[doc(alias = "a")]
const SEMI_MAJOR_AXIS: f64 = 6_378_137.0;
#[doc(alias = "1/f")]
const FLATTENING_FACTOR: f64 = 298.257_223_563;
#[doc(alias = "f")]
const FLATTENING: f64 = 1.0 / FLATTENING_FACTOR;
// e^2 = 1 - b^2/a^2
//     = 1 - (a - af)^2 / a^2
//     = 2 * f - f^2
#[doc(alias = "e^2")]
const ECCENTRICITY_SQ: f64 = 2.0 * FLATTENING - FLATTENING * FLATTENING;
// b/a = 1 - f
#[doc(alias = "polar radius")]
#[doc(alias = "b")]
const SEMI_MINOR_AXIS: f64 = SEMI_MAJOR_AXIS * (1.0 - FLATTENING);

/// The parameters of a reference ellipsoid.
///
/// Only [`Ellipsoid::WGS84`] is used by the conversions in this crate. All values are derived
/// once, at compile time, and never change.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ellipsoid {
    semi_major_axis: f64,
    flattening: f64,
    eccentricity_sq: f64,
    semi_minor_axis: f64,
}

impl Ellipsoid {
    /// The [World Geodetic System '84](https://en.wikipedia.org/wiki/World_Geodetic_System#WGS_84)
    /// ellipsoid.
    pub const WGS84: Ellipsoid = Ellipsoid {
        semi_major_axis: SEMI_MAJOR_AXIS,
        flattening: FLATTENING,
        eccentricity_sq: ECCENTRICITY_SQ,
        semi_minor_axis: SEMI_MINOR_AXIS,
    };

    /// Equatorial radius `a`, in meters.
    #[must_use]
    pub const fn a(&self) -> f64 {
        self.semi_major_axis
    }

    /// Polar radius `b = a(1 - f)`, in meters.
    #[must_use]
    pub const fn b(&self) -> f64 {
        self.semi_minor_axis
    }

    /// Flattening `f = 1 - b/a`.
    #[must_use]
    pub const fn f(&self) -> f64 {
        self.flattening
    }

    /// First eccentricity squared, `e² = 2f - f²`.
    #[must_use]
    pub const fn e2(&self) -> f64 {
        self.eccentricity_sq
    }

    /// First eccentricity squared computed from the axes, `(a² - b²) / a²`.
    ///
    /// Equal to [`Ellipsoid::e2`] up to rounding.
    #[must_use]
    pub fn ea(&self) -> f64 {
        let a2 = self.semi_major_axis.powi(2);
        (a2 - self.semi_minor_axis.powi(2)) / a2
    }

    /// Second eccentricity squared, `(a² - b²) / b²`.
    #[must_use]
    pub fn eb(&self) -> f64 {
        let b2 = self.semi_minor_axis.powi(2);
        (self.semi_major_axis.powi(2) - b2) / b2
    }

    /// Equatorial radius as a [`Length`].
    #[must_use]
    pub fn semi_major_axis(&self) -> Length {
        Length::new::<meter>(self.semi_major_axis)
    }

    /// Polar radius as a [`Length`].
    #[must_use]
    pub fn semi_minor_axis(&self) -> Length {
        Length::new::<meter>(self.semi_minor_axis)
    }

    /// The [prime vertical radius of curvature][pv] `N(φ) = a / sqrt(1 - e² sin² φ)`, in meters.
    ///
    /// [pv]: https://en.wikipedia.org/wiki/Earth_radius#Prime_vertical
    #[must_use]
    pub fn prime_vertical_radius(&self, latitude: impl Into<Angle>) -> f64 {
        self.prime_vertical_radius_rad(latitude.into().get::<radian>())
    }

    pub(crate) fn prime_vertical_radius_rad(&self, phi: f64) -> f64 {
        self.semi_major_axis / (1.0 - self.eccentricity_sq * phi.sin().powi(2)).sqrt()
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::WGS84
    }
}
