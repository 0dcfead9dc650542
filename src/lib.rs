//! This library converts between Earth-bound coordinate representations on the WGS84 ellipsoid,
//! and ties them to the coordinate space of some external "world" (eg, a game engine's scene).
//!
//! There are three representations of a location:
//!
//! - [`GeodeticCoordinate`]: latitude, longitude, and altitude above the ellipsoid, optionally
//!   with an orientation relative to the local East-North-Up axes.
//! - [`Ecef`]: a cartesian point in the Earth-Centered, Earth-Fixed frame.
//! - [`Enu`]: a displacement along the East, North, and Up axes of the tangent plane at some
//!   geodetic origin. The origin is never stored on the vector; it is passed to each operation
//!   in the [`enu`] module instead.
//!
//! The ellipsoid itself is described by [`Ellipsoid::WGS84`].
//!
//! On top of those, [`LocalFrame`] (and its lazily-calibrated holder, [`AnchoredLocalFrame`])
//! binds an ENU origin to a world coordinate space whose axis convention is given by a
//! [`WorldAxes`](world::WorldAxes) type, so that world positions and poses can be converted to
//! and from geodetic ones. Separately, [`HelmertTransform2D`] fits a planar similarity transform
//! between two 2D systems from a handful of known point pairs.
//!
//! # Examples
//!
//! Say a surveyor has marked two spots in a Y-up, left-handed game world with GPS fixes, and
//! we want to know where some other spot in the world is on the globe:
//!
//! ```
//! use geoframe::world::YUpLeftHanded;
//! use geoframe::{GeodeticCoordinate, LocalFrame, Vector3};
//! use uom::si::{angle::degree, length::meter};
//!
//! let origin = GeodeticCoordinate::from_degrees_and_meters(35., 135., 0.)?;
//! let secondary = GeodeticCoordinate::from_degrees_and_meters(35.0009, 135.0011, 0.)?;
//!
//! // the world's X axis points east, and the second fix is north-east of the first
//! let frame = LocalFrame::<YUpLeftHanded>::from_two_points(
//!     origin,
//!     Vector3::new(0., 0., 0.),
//!     &secondary,
//!     Vector3::new(100.4, 0., 99.8),
//! )?;
//!
//! // a spot 50 world units above the origin is 50m up
//! let above = frame.world_position_to_geodetic(&Vector3::new(0., 50., 0.));
//! assert!((above.altitude().get::<meter>() - 50.).abs() < 0.001);
//! assert!((above.latitude().get::<degree>() - 35.).abs() < 1e-9);
//!
//! // and going the other way recovers where the second fix was placed
//! let pose = frame.geodetic_to_world_pose(&secondary);
//! assert!((pose.position - Vector3::new(100.4, 0., 99.8)).norm() < 0.5);
//! # Ok::<(), geoframe::Error>(())
//! ```
//!
//! The plain conversions are available without any world in the picture:
//!
//! ```
//! use geoframe::enu::{enu_position_of, enu_to_geodetic};
//! use geoframe::{Ecef, GeodeticCoordinate};
//! use uom::si::{angle::degree, length::meter};
//!
//! let tokyo = GeodeticCoordinate::from_degrees_and_meters(35., 135., 10.)?;
//! let ecef = Ecef::from_geodetic(&tokyo);
//! assert!((ecef.x().get::<meter>() - -3_698_476.08).abs() < 0.01);
//!
//! let offset = enu_position_of(
//!     &tokyo,
//!     &GeodeticCoordinate::from_degrees_and_meters(35.0009, 135.0011, 10.)?,
//! );
//! assert!((offset.horizontal_bearing().get::<degree>() - 45.).abs() < 0.5);
//! assert_eq!(enu_to_geodetic(&tokyo, &offset).altitude().get::<meter>().round(), 10.);
//! # Ok::<(), geoframe::Error>(())
//! ```

mod ecef;
mod ellipsoid;
mod error;
mod util;

pub mod anchored;
pub mod enu;
pub mod geodetic;
pub mod helmert;
pub mod world;

pub type Vector3 = nalgebra::Vector3<f64>;
pub type Vector2 = nalgebra::Vector2<f64>;
pub type Point2 = nalgebra::Point2<f64>;
pub type Matrix3 = nalgebra::Matrix3<f64>;
pub type UnitQuaternion = nalgebra::UnitQuaternion<f64>;

pub use anchored::{AnchoredLocalFrame, LocalFrame};
pub use ecef::{Ecef, EcefComponents};
pub use ellipsoid::Ellipsoid;
pub use enu::{Enu, EnuComponents};
pub use error::{Error, Result};
pub use geodetic::GeodeticCoordinate;
pub use helmert::HelmertTransform2D;
