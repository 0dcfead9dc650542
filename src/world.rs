//! The boundary between ENU/ECEF math and an external "world" coordinate space.
//!
//! A world (for example, a game engine's scene) has its own idea of which axis is up and whether
//! it is left- or right-handed. Nothing in the geodetic math assumes either; instead, the world's
//! convention is supplied through [`WorldAxes`], which says which world axes play the roles of
//! East, North, and Up when the world happens to be aligned with the local tangent plane.
//!
//! Two conventions are provided: [`YUpLeftHanded`] for engines like Unity, and
//! [`ZUpRightHanded`], which is identical to ENU.

use crate::{Matrix3, UnitQuaternion, Vector3};
use nalgebra::{Quaternion, Rotation3, Unit};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(doc)]
use crate::anchored::LocalFrame;

/// Defines the axis convention of a world coordinate space.
///
/// The three required methods return the world-space unit vectors that correspond to East
/// ([`WorldAxes::right`]), North ([`WorldAxes::forward`]), and Up ([`WorldAxes::up`]) when the
/// world is aligned with ENU. They must be mutually orthogonal unit vectors. Everything else is
/// derived from them, but may be overridden if the world has a cheaper way of doing it.
pub trait WorldAxes {
    /// The world axis that corresponds to East.
    fn right() -> Vector3;
    /// The world axis that corresponds to Up.
    fn up() -> Vector3;
    /// The world axis that corresponds to North.
    fn forward() -> Vector3;

    /// Returns `1.` if the world is right-handed (like ENU) and `-1.` if it is left-handed.
    fn handedness() -> f64 {
        Self::right().cross(&Self::forward()).dot(&Self::up()).signum()
    }

    /// Matrix whose columns are the world vectors for East, North, and Up.
    ///
    /// Multiplying an ENU vector by this gives the same vector in world axes. Its determinant is
    /// [`WorldAxes::handedness`].
    fn enu_axes() -> Matrix3 {
        Matrix3::from_columns(&[Self::right(), Self::forward(), Self::up()])
    }

    /// Re-expresses a vector given in ENU components in world components.
    fn enu_to_world_vector(enu: &Vector3) -> Vector3 {
        Self::enu_axes() * enu
    }

    /// Re-expresses a vector given in world components in ENU components.
    fn world_to_enu_vector(world: &Vector3) -> Vector3 {
        Self::enu_axes().transpose() * world
    }

    /// Re-expresses an orientation given relative to ENU axes as one relative to world axes.
    ///
    /// This is the rotation `P R Pᵀ` where `P` is [`WorldAxes::enu_axes`]. When `P` flips
    /// handedness, the rotation axis flips along with it, so the sense of rotation is preserved
    /// as seen in the world.
    fn enu_to_world_orientation(enu: &UnitQuaternion) -> UnitQuaternion {
        conjugate_by(&Self::enu_axes(), Self::handedness(), enu)
    }

    /// Inverse of [`WorldAxes::enu_to_world_orientation`].
    fn world_to_enu_orientation(world: &UnitQuaternion) -> UnitQuaternion {
        conjugate_by(&Self::enu_axes().transpose(), Self::handedness(), world)
    }

    /// Rotation about the world's up axis by `angle` radians, counter-clockwise as seen from
    /// above.
    fn rotation_about_up(angle: f64) -> UnitQuaternion {
        UnitQuaternion::from_axis_angle(&Unit::new_normalize(Self::up()), Self::handedness() * angle)
    }

    /// The rotation that turns [`WorldAxes::forward`] onto `forward` and [`WorldAxes::up`] as
    /// close to `up` as is possible while staying orthogonal to `forward`.
    ///
    /// Returns `None` if either direction is zero or they are parallel.
    fn look_rotation(forward: &Vector3, up: &Vector3) -> Option<UnitQuaternion> {
        let sign = Self::handedness();
        let forward = forward.try_normalize(f64::EPSILON)?;
        // forward x up is right in a right-handed world and left in a left-handed one
        let right = (forward.cross(up) * sign).try_normalize(f64::EPSILON)?;
        let up = right.cross(&forward) * sign;

        let target = Matrix3::from_columns(&[right, up, forward]);
        let canonical = Matrix3::from_columns(&[Self::right(), Self::up(), Self::forward()]);
        // both bases have the same handedness, so this is a proper rotation
        let rotation = Rotation3::from_matrix_unchecked(target * canonical.transpose());
        Some(UnitQuaternion::from_rotation_matrix(&rotation))
    }
}

/// Computes `P R Pᵀ` for an orthonormal `P` directly on the quaternion: the angle is kept, and the
/// axis is mapped through `P` and flipped if `P` is a reflection.
fn conjugate_by(p: &Matrix3, determinant: f64, rotation: &UnitQuaternion) -> UnitQuaternion {
    let axis = p * rotation.vector() * determinant;
    UnitQuaternion::new_unchecked(Quaternion::from_parts(rotation.scalar(), axis))
}

/// Left-handed, Y-up worlds such as Unity's: +X is East, +Y is Up, +Z is North.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct YUpLeftHanded;

impl WorldAxes for YUpLeftHanded {
    fn right() -> Vector3 {
        Vector3::x()
    }

    fn up() -> Vector3 {
        Vector3::y()
    }

    fn forward() -> Vector3 {
        Vector3::z()
    }
}

/// Right-handed, Z-up worlds laid out exactly like ENU: +X is East, +Y is North, +Z is Up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZUpRightHanded;

impl WorldAxes for ZUpRightHanded {
    fn right() -> Vector3 {
        Vector3::x()
    }

    fn up() -> Vector3 {
        Vector3::z()
    }

    fn forward() -> Vector3 {
        Vector3::y()
    }
}

/// A position and orientation in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WorldPose {
    pub position: Vector3,
    pub orientation: UnitQuaternion,
}

impl WorldPose {
    #[must_use]
    pub fn new(position: Vector3, orientation: UnitQuaternion) -> Self {
        Self {
            position,
            orientation,
        }
    }
}

/// An object in world space whose geodetic location and orientation are known, used to calibrate
/// a [`LocalFrame`].
///
/// The axes are the object's own right, forward, and up directions expressed in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WorldAnchor {
    pub position: Vector3,
    pub right: Vector3,
    pub forward: Vector3,
    pub up: Vector3,
}

impl WorldAnchor {
    /// Derives the anchor's axes by rotating the world's canonical axes by `orientation`.
    #[must_use]
    pub fn from_pose<W: WorldAxes>(pose: &WorldPose) -> Self {
        Self {
            position: pose.position,
            right: pose.orientation * W::right(),
            forward: pose.orientation * W::forward(),
            up: pose.orientation * W::up(),
        }
    }
}
