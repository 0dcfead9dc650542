//! Local East-North-Up tangent planes anchored at a geodetic origin.
//!
//! An [`Enu`] vector only has meaning relative to the [`GeodeticCoordinate`] it was computed
//! against; that origin is passed explicitly to every operation here rather than being stored on
//! the vector.
//!
//! See also
//! <https://en.wikipedia.org/wiki/Local_tangent_plane_coordinates#Local_east,_north,_up_(ENU)_coordinates>.

use crate::error::{Error, Result};
use crate::{Ecef, GeodeticCoordinate, Matrix3, UnitQuaternion, Vector3};
use nalgebra::Rotation3;
use std::fmt;
use std::fmt::{Display, Formatter};
use uom::si::angle::radian;
use uom::si::f64::{Angle, Length};
use uom::si::length::meter;

#[cfg(any(test, feature = "approx"))]
use approx::{AbsDiffEq, RelativeEq};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A displacement along the East, North, and Up axes of some local tangent plane.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Enu {
    /// East, North, Up in meters
    pub(crate) vector: Vector3,
}

/// Components of an [`Enu`] vector, for use with [`Enu::build`].
#[derive(Debug, Clone, Copy)]
#[must_use]
pub struct EnuComponents {
    pub east: Length,
    pub north: Length,
    pub up: Length,
}

impl Enu {
    pub(crate) fn from_nalgebra_vector(vector: Vector3) -> Self {
        Self { vector }
    }

    /// Constructs an ENU vector from its named components.
    pub fn build(EnuComponents { east, north, up }: EnuComponents) -> Self {
        Self::from_nalgebra_vector(Vector3::new(
            east.get::<meter>(),
            north.get::<meter>(),
            up.get::<meter>(),
        ))
    }

    /// The zero displacement, ie the origin of the tangent plane.
    #[must_use]
    pub fn zero() -> Self {
        Self::from_nalgebra_vector(Vector3::zeros())
    }

    #[must_use]
    pub fn east(&self) -> Length {
        Length::new::<meter>(self.vector.x)
    }

    #[must_use]
    pub fn north(&self) -> Length {
        Length::new::<meter>(self.vector.y)
    }

    #[must_use]
    pub fn up(&self) -> Length {
        Length::new::<meter>(self.vector.z)
    }

    /// The angle counter-clockwise from East to this vector's projection onto the horizontal
    /// plane, ie `atan2(north, east)`.
    ///
    /// Note that this is _not_ a compass bearing, which would be measured clockwise from North.
    #[must_use]
    pub fn horizontal_bearing(&self) -> Angle {
        Angle::new::<radian>(self.vector.y.atan2(self.vector.x))
    }

    /// Returns East, North, Up in meters as a nalgebra vector.
    #[must_use]
    pub fn to_nalgebra_vector(&self) -> Vector3 {
        self.vector
    }
}

impl Display for Enu {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ENU(east: {:.3}m, north: {:.3}m, up: {:.3}m)",
            self.vector.x, self.vector.y, self.vector.z
        )
    }
}

impl TryFrom<&[f64]> for Enu {
    type Error = Error;

    /// Interprets exactly three values as East, North, Up in meters.
    fn try_from(components: &[f64]) -> Result<Self> {
        match *components {
            [east, north, up] => Ok(Self::from_nalgebra_vector(Vector3::new(east, north, up))),
            _ => Err(Error::DimensionMismatch {
                expected: 3,
                actual: components.len(),
            }),
        }
    }
}

#[cfg(any(test, feature = "approx"))]
impl AbsDiffEq<Self> for Enu {
    type Epsilon = Length;

    fn default_epsilon() -> Self::Epsilon {
        Length::new::<meter>(0.001)
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.vector.abs_diff_eq(&other.vector, epsilon.get::<meter>())
    }
}

#[cfg(any(test, feature = "approx"))]
impl RelativeEq for Enu {
    fn default_max_relative() -> Self::Epsilon {
        Length::new::<meter>(Vector3::default_max_relative())
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        self.vector.relative_eq(
            &other.vector,
            epsilon.get::<meter>(),
            max_relative.get::<meter>(),
        )
    }
}

/// Constructs an [`Enu`] vector from components given as `uom` lengths.
#[macro_export]
macro_rules! enu {
    (east = $e:expr, north = $n:expr, up = $u:expr $(,)?) => {
        $crate::Enu::build($crate::EnuComponents {
            east: $e.into(),
            north: $n.into(),
            up: $u.into(),
        })
    };
}

/// Constructs the rotation matrix from ECEF into the ENU frame at the given longitude and
/// latitude.
///
/// The rows are the East, North, and Up unit vectors expressed in ECEF.
#[must_use]
pub fn ecef_to_enu_matrix(longitude: impl Into<Angle>, latitude: impl Into<Angle>) -> Matrix3 {
    let lambda = longitude.into().get::<radian>();
    let phi = latitude.into().get::<radian>();

    let sin_phi = phi.sin();
    let cos_phi = phi.cos();
    let sin_lambda = lambda.sin();
    let cos_lambda = lambda.cos();

    Matrix3::new(
        -sin_lambda,
        cos_lambda,
        0.,
        -sin_phi * cos_lambda,
        -sin_phi * sin_lambda,
        cos_phi,
        cos_phi * cos_lambda,
        cos_phi * sin_lambda,
        sin_phi,
    )
}

/// Constructs the rotation matrix from the ENU frame at the given longitude and latitude into
/// ECEF.
///
/// This is the transpose (and thus the inverse) of [`ecef_to_enu_matrix`]; its columns are the
/// East, North, and Up unit vectors expressed in ECEF.
#[must_use]
pub fn enu_to_ecef_matrix(longitude: impl Into<Angle>, latitude: impl Into<Angle>) -> Matrix3 {
    ecef_to_enu_matrix(longitude, latitude).transpose()
}

/// Computes the ECEF location of the point displaced by `enu` from `origin`.
#[must_use]
pub fn enu_to_ecef(origin: &GeodeticCoordinate, enu: &Enu) -> Ecef {
    let origin_ecef = Ecef::from_geodetic(origin);
    let rotation = enu_to_ecef_matrix(origin.longitude, origin.latitude);
    origin_ecef + rotation * enu.vector
}

/// Computes the geodetic location of the point displaced by `enu` from `origin`.
///
/// This is position-only: the rotation of the result is the identity.
#[must_use]
pub fn enu_to_geodetic(origin: &GeodeticCoordinate, enu: &Enu) -> GeodeticCoordinate {
    enu_to_ecef(origin, enu).to_geodetic()
}

/// Like [`enu_to_geodetic`], but carries `rotation` over onto the result.
///
/// `rotation` is interpreted relative to the ENU axes, and is stored as-is: over the short
/// distances a local tangent plane is used for, the ENU axes at the result coincide with those at
/// `origin`.
#[must_use]
pub fn enu_pose_to_geodetic(
    origin: &GeodeticCoordinate,
    enu: &Enu,
    rotation: UnitQuaternion,
) -> GeodeticCoordinate {
    enu_to_geodetic(origin, enu).with_rotation(rotation)
}

/// Computes the displacement of `target` relative to `origin` along `origin`'s East, North, and
/// Up axes.
#[must_use]
pub fn enu_position_of(origin: &GeodeticCoordinate, target: &GeodeticCoordinate) -> Enu {
    let origin_ecef = Ecef::from_geodetic(origin);
    let target_ecef = Ecef::from_geodetic(target);
    let rotation = ecef_to_enu_matrix(origin.longitude, origin.latitude);
    Enu::from_nalgebra_vector(rotation * (target_ecef - origin_ecef))
}

fn enu_to_ecef_rotation(origin: &GeodeticCoordinate) -> UnitQuaternion {
    let matrix = enu_to_ecef_matrix(origin.longitude, origin.latitude);
    // the matrix is orthonormal by construction
    UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(matrix))
}

/// Re-expresses an orientation given relative to the ENU axes at `origin` as one relative to the
/// ECEF axes.
#[must_use]
pub fn enu_orientation_to_ecef(
    origin: &GeodeticCoordinate,
    orientation: UnitQuaternion,
) -> UnitQuaternion {
    enu_to_ecef_rotation(origin) * orientation
}

/// Re-expresses an orientation given relative to the ECEF axes as one relative to the ENU axes
/// at `origin`.
#[must_use]
pub fn ecef_orientation_to_enu(
    origin: &GeodeticCoordinate,
    orientation: UnitQuaternion,
) -> UnitQuaternion {
    enu_to_ecef_rotation(origin).inverse() * orientation
}
