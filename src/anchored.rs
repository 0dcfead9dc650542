//! Mapping between an external world coordinate space and geodetic coordinates.
//!
//! A [`LocalFrame`] records where the East, North, and Up axes of a geodetic origin point in a
//! world whose axis convention is given by a [`WorldAxes`] type. It is calibrated once, from
//! either two known point pairs or a single anchor whose pose is known in both spaces, and is
//! then used to convert positions and poses in both directions.
//!
//! [`AnchoredLocalFrame`] is the mutable holder for callers that need to create the frame before
//! calibration data is available.

use crate::enu::{enu_pose_to_geodetic, enu_position_of, enu_to_geodetic};
use crate::error::{Error, Result};
use crate::world::{WorldAnchor, WorldAxes, WorldPose};
use crate::{Enu, GeodeticCoordinate, UnitQuaternion, Vector3};
use std::f64::consts::FRAC_PI_2;
use std::fmt;
use std::marker::PhantomData;
use tracing::{debug, warn};
use uom::si::angle::radian;

/// A geodetic origin bound to a location and set of axes in a world coordinate space.
///
/// `east`, `north`, and `up` are unit vectors in world space. They are mutually orthogonal and
/// have the handedness of the world convention `W`.
pub struct LocalFrame<W> {
    origin: GeodeticCoordinate,
    origin_position: Vector3,
    east: Vector3,
    north: Vector3,
    up: Vector3,
    /// Maps the world's canonical axes onto `east`, `north`, and `up`.
    basis_rotation: UnitQuaternion,
    convention: PhantomData<fn() -> W>,
}

// manual impls so that `W` need not implement these traits itself
impl<W> Clone for LocalFrame<W> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<W> Copy for LocalFrame<W> {}

impl<W> PartialEq for LocalFrame<W> {
    fn eq(&self, other: &Self) -> bool {
        self.origin == other.origin
            && self.origin_position == other.origin_position
            && self.east == other.east
            && self.north == other.north
            && self.up == other.up
    }
}

impl<W> fmt::Debug for LocalFrame<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalFrame")
            .field("origin", &self.origin)
            .field("origin_position", &self.origin_position)
            .field("east", &self.east)
            .field("north", &self.north)
            .field("up", &self.up)
            .finish()
    }
}

fn unit(v: Vector3) -> Result<Vector3> {
    v.try_normalize(f64::EPSILON)
        .filter(|v| v.iter().all(|c| c.is_finite()))
        .ok_or_else(|| {
            warn!(vector = ?v, "cannot derive a basis axis");
            Error::DegenerateBasis
        })
}

/// Removes the component of `v` along the world's up axis and normalizes what remains.
fn horizontal<W: WorldAxes>(v: Vector3) -> Result<Vector3> {
    let up = W::up();
    unit(v - up * (v.dot(&up) / up.norm_squared()))
}

impl<W: WorldAxes> LocalFrame<W> {
    /// Calibrates from two locations known both geodetically and in world space.
    ///
    /// Only the rotation about the vertical is recovered: the world's up axis is assumed to
    /// already coincide with Up at `origin`. The heading is taken from the bearing between the
    /// two geodetic locations, so they should be far enough apart for that bearing to be
    /// meaningful.
    ///
    /// Returns [`Error::DegenerateBasis`] if the two world positions coincide or are separated
    /// only vertically.
    pub fn from_two_points(
        origin: GeodeticCoordinate,
        origin_position: Vector3,
        secondary: &GeodeticCoordinate,
        secondary_position: Vector3,
    ) -> Result<Self> {
        let bearing = enu_position_of(&origin, secondary)
            .horizontal_bearing()
            .get::<radian>();
        let towards = horizontal::<W>(secondary_position - origin_position)?;

        // towards points along `bearing` (counter-clockwise from East), so turning it back by
        // that much gives East, and a further quarter turn gives North
        let east = horizontal::<W>(W::rotation_about_up(-bearing) * towards)?;
        let north = horizontal::<W>(W::rotation_about_up(FRAC_PI_2 - bearing) * towards)?;
        let up = unit(W::up())?;

        Self::from_basis(origin, origin_position, east, north, up)
    }

    /// Calibrates from a single anchor whose world axes and geodetic orientation are both known.
    ///
    /// `origin` is the anchor's geodetic location, and its [rotation] is the anchor's
    /// orientation relative to the local ENU axes.
    ///
    /// Returns [`Error::DegenerateBasis`] if the anchor's axes are zero or parallel.
    ///
    /// [rotation]: GeodeticCoordinate::rotation
    pub fn from_anchor(origin: GeodeticCoordinate, anchor: &WorldAnchor) -> Result<Self> {
        let to_enu = W::enu_to_world_orientation(&origin.rotation()).inverse();
        let east = unit(to_enu * anchor.right)?;
        let north = unit(to_enu * anchor.forward)?;
        let up = unit(to_enu * anchor.up)?;

        Self::from_basis(origin, anchor.position, east, north, up)
    }

    fn from_basis(
        origin: GeodeticCoordinate,
        origin_position: Vector3,
        east: Vector3,
        north: Vector3,
        up: Vector3,
    ) -> Result<Self> {
        let basis_rotation = W::look_rotation(&north, &up).ok_or_else(|| {
            warn!(?north, ?up, "north and up axes are parallel");
            Error::DegenerateBasis
        })?;

        debug!(
            %origin,
            ?origin_position,
            ?east,
            ?north,
            ?up,
            "calibrated local frame"
        );

        Ok(Self {
            origin,
            origin_position,
            east,
            north,
            up,
            basis_rotation,
            convention: PhantomData,
        })
    }

    /// Converts a world position into geodetic coordinates.
    ///
    /// The rotation of the result is the identity.
    #[must_use]
    pub fn world_position_to_geodetic(&self, position: &Vector3) -> GeodeticCoordinate {
        enu_to_geodetic(&self.origin, &self.world_to_enu(position))
    }

    /// Converts a world pose into geodetic coordinates, carrying the orientation over relative to
    /// the local ENU axes.
    #[must_use]
    pub fn world_pose_to_geodetic(&self, pose: &WorldPose) -> GeodeticCoordinate {
        let rotation =
            W::world_to_enu_orientation(&(pose.orientation * self.basis_rotation.inverse()));
        enu_pose_to_geodetic(&self.origin, &self.world_to_enu(&pose.position), rotation)
    }

    /// Converts a geodetic location and orientation into a world pose.
    #[must_use]
    pub fn geodetic_to_world_pose(&self, target: &GeodeticCoordinate) -> WorldPose {
        let position = self.enu_to_world(&enu_position_of(&self.origin, target));
        let orientation = W::enu_to_world_orientation(&target.rotation()) * self.basis_rotation;
        WorldPose::new(position, orientation)
    }

    /// Projects a world position onto this frame's ENU axes.
    #[must_use]
    pub fn world_to_enu(&self, position: &Vector3) -> Enu {
        let offset = position - self.origin_position;
        Enu::from_nalgebra_vector(Vector3::new(
            self.east.dot(&offset),
            self.north.dot(&offset),
            self.up.dot(&offset),
        ))
    }

    /// Places an ENU displacement from the origin in world space.
    #[must_use]
    pub fn enu_to_world(&self, enu: &Enu) -> Vector3 {
        let enu = enu.to_nalgebra_vector();
        self.origin_position + self.east * enu.x + self.north * enu.y + self.up * enu.z
    }
}

impl<W> LocalFrame<W> {
    #[must_use]
    pub fn origin(&self) -> GeodeticCoordinate {
        self.origin
    }

    /// The world position of [`LocalFrame::origin`].
    #[must_use]
    pub fn origin_position(&self) -> Vector3 {
        self.origin_position
    }

    #[must_use]
    pub fn east(&self) -> Vector3 {
        self.east
    }

    #[must_use]
    pub fn north(&self) -> Vector3 {
        self.north
    }

    #[must_use]
    pub fn up(&self) -> Vector3 {
        self.up
    }
}

type Listener<W> = Box<dyn FnMut(&LocalFrame<W>) + Send>;

/// A [`LocalFrame`] that may not have been calibrated yet.
///
/// Conversions return [`Error::UninitializedFrame`] until one of the `calibrate_*` methods has
/// succeeded. Recalibrating replaces the frame; a failed calibration leaves the previous one in
/// place.
///
/// ```
/// use geoframe::world::YUpLeftHanded;
/// use geoframe::{AnchoredLocalFrame, Error, GeodeticCoordinate, Vector3};
///
/// let mut frame = AnchoredLocalFrame::<YUpLeftHanded>::new();
/// assert_eq!(
///     frame.world_position_to_geodetic(&Vector3::zeros()),
///     Err(Error::UninitializedFrame)
/// );
///
/// let origin = GeodeticCoordinate::from_degrees_and_meters(35., 135., 0.)?;
/// let secondary = GeodeticCoordinate::from_degrees_and_meters(35.0009, 135.0011, 0.)?;
/// frame.calibrate_from_two_points(
///     origin,
///     Vector3::zeros(),
///     &secondary,
///     Vector3::new(100., 0., 100.),
/// )?;
///
/// let pose = frame.geodetic_to_world_pose(&origin)?;
/// assert!(pose.position.norm() < 1e-6);
/// # Ok::<(), Error>(())
/// ```
pub struct AnchoredLocalFrame<W> {
    frame: Option<LocalFrame<W>>,
    listeners: Vec<Listener<W>>,
}

impl<W> Default for AnchoredLocalFrame<W> {
    fn default() -> Self {
        Self {
            frame: None,
            listeners: Vec::new(),
        }
    }
}

impl<W> fmt::Debug for AnchoredLocalFrame<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnchoredLocalFrame")
            .field("frame", &self.frame)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<W: WorldAxes> AnchoredLocalFrame<W> {
    /// Constructs an uncalibrated frame.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.frame.is_some()
    }

    /// The current calibration, if any.
    #[must_use]
    pub fn frame(&self) -> Option<&LocalFrame<W>> {
        self.frame.as_ref()
    }

    /// Registers a callback to run after every successful calibration.
    pub fn on_calibrated(&mut self, listener: impl FnMut(&LocalFrame<W>) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// See [`LocalFrame::from_two_points`].
    pub fn calibrate_from_two_points(
        &mut self,
        origin: GeodeticCoordinate,
        origin_position: Vector3,
        secondary: &GeodeticCoordinate,
        secondary_position: Vector3,
    ) -> Result<&LocalFrame<W>> {
        let frame =
            LocalFrame::from_two_points(origin, origin_position, secondary, secondary_position)?;
        Ok(self.install(frame))
    }

    /// See [`LocalFrame::from_anchor`].
    pub fn calibrate_from_anchor(
        &mut self,
        origin: GeodeticCoordinate,
        anchor: &WorldAnchor,
    ) -> Result<&LocalFrame<W>> {
        let frame = LocalFrame::from_anchor(origin, anchor)?;
        Ok(self.install(frame))
    }

    fn install(&mut self, frame: LocalFrame<W>) -> &LocalFrame<W> {
        for listener in &mut self.listeners {
            listener(&frame);
        }
        self.frame.insert(frame)
    }

    fn calibrated(&self) -> Result<&LocalFrame<W>> {
        self.frame.as_ref().ok_or_else(|| {
            warn!("conversion requested before the local frame was calibrated");
            Error::UninitializedFrame
        })
    }

    /// See [`LocalFrame::world_position_to_geodetic`].
    pub fn world_position_to_geodetic(&self, position: &Vector3) -> Result<GeodeticCoordinate> {
        Ok(self.calibrated()?.world_position_to_geodetic(position))
    }

    /// See [`LocalFrame::world_pose_to_geodetic`].
    pub fn world_pose_to_geodetic(&self, pose: &WorldPose) -> Result<GeodeticCoordinate> {
        Ok(self.calibrated()?.world_pose_to_geodetic(pose))
    }

    /// See [`LocalFrame::geodetic_to_world_pose`].
    pub fn geodetic_to_world_pose(&self, target: &GeodeticCoordinate) -> Result<WorldPose> {
        Ok(self.calibrated()?.geodetic_to_world_pose(target))
    }
}
