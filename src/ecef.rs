use crate::error::{Error, Result};
use crate::Vector3;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::ops::{Add, Sub};
use uom::si::f64::Length;
use uom::si::length::meter;

#[cfg(any(test, feature = "approx"))]
use approx::{AbsDiffEq, RelativeEq};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A point in the Earth-Centered, Earth-Fixed cartesian frame.
///
/// The frame is right-handed with its origin at the center of the earth, positive Z towards the
/// north pole, and positive X through the intersection of the equator and the prime meridian
/// (ie, 0°N 0°E).
///
/// See <https://en.wikipedia.org/wiki/Earth-centered,_Earth-fixed_coordinate_system>.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
// no need for the "point": indirection
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Ecef {
    /// X, Y, Z in meters
    pub(crate) point: Vector3,
}

/// Components of an [`Ecef`] point, for use with [`Ecef::build`].
#[derive(Debug, Clone, Copy)]
#[must_use]
pub struct EcefComponents {
    pub x: Length,
    pub y: Length,
    pub z: Length,
}

impl Ecef {
    pub(crate) fn from_nalgebra_vector(point: Vector3) -> Self {
        Self { point }
    }

    /// Constructs an ECEF point from its named components.
    pub fn build(EcefComponents { x, y, z }: EcefComponents) -> Self {
        Self::from_nalgebra_vector(Vector3::new(
            x.get::<meter>(),
            y.get::<meter>(),
            z.get::<meter>(),
        ))
    }

    /// The center of the earth.
    #[must_use]
    pub fn origin() -> Self {
        Self::from_nalgebra_vector(Vector3::zeros())
    }

    /// Distance along the ECEF X axis (through 0°N 0°E).
    #[must_use]
    pub fn x(&self) -> Length {
        Length::new::<meter>(self.point.x)
    }

    /// Distance along the ECEF Y axis (through 0°N 90°E).
    #[must_use]
    pub fn y(&self) -> Length {
        Length::new::<meter>(self.point.y)
    }

    /// Distance along the ECEF Z axis (through the north pole).
    #[must_use]
    pub fn z(&self) -> Length {
        Length::new::<meter>(self.point.z)
    }

    /// Returns the components of this point in meters as a nalgebra vector.
    #[must_use]
    pub fn to_nalgebra_vector(&self) -> Vector3 {
        self.point
    }
}

impl Display for Ecef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ECEF({:.3}m, {:.3}m, {:.3}m)",
            self.point.x, self.point.y, self.point.z
        )
    }
}

impl TryFrom<&[f64]> for Ecef {
    type Error = Error;

    /// Interprets exactly three values as X, Y, Z in meters.
    fn try_from(components: &[f64]) -> Result<Self> {
        match *components {
            [x, y, z] => Ok(Self::from_nalgebra_vector(Vector3::new(x, y, z))),
            _ => Err(Error::DimensionMismatch {
                expected: 3,
                actual: components.len(),
            }),
        }
    }
}

impl Sub<Ecef> for Ecef {
    type Output = Vector3;

    /// Displacement from `rhs` to `self`, in meters along the ECEF axes.
    fn sub(self, rhs: Ecef) -> Self::Output {
        self.point - rhs.point
    }
}

impl Add<Vector3> for Ecef {
    type Output = Ecef;

    fn add(self, rhs: Vector3) -> Self::Output {
        Self::from_nalgebra_vector(self.point + rhs)
    }
}

#[cfg(any(test, feature = "approx"))]
impl AbsDiffEq<Self> for Ecef {
    type Epsilon = Length;

    fn default_epsilon() -> Self::Epsilon {
        Length::new::<meter>(0.001)
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        // NOTE: per component, not the magnitude of the difference.
        self.point.abs_diff_eq(&other.point, epsilon.get::<meter>())
    }
}

#[cfg(any(test, feature = "approx"))]
impl RelativeEq for Ecef {
    fn default_max_relative() -> Self::Epsilon {
        Length::new::<meter>(Vector3::default_max_relative())
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        self.point.relative_eq(
            &other.point,
            epsilon.get::<meter>(),
            max_relative.get::<meter>(),
        )
    }
}

/// Constructs an [`Ecef`] point from components given as `uom` lengths.
#[macro_export]
macro_rules! ecef {
    (x = $x:expr, y = $y:expr, z = $z:expr $(,)?) => {
        $crate::Ecef::build($crate::EcefComponents {
            x: $x.into(),
            y: $y.into(),
            z: $z.into(),
        })
    };
}
