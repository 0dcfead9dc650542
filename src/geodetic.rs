use crate::ellipsoid::Ellipsoid;
use crate::error::{Error, Result};
use crate::util::BoundedAngle;
use crate::{Ecef, UnitQuaternion, Vector3};
use std::fmt;
use std::fmt::Display;
use std::marker::PhantomData;
use uom::si::f64::{Angle, Length};
use uom::si::{
    angle::{degree, radian},
    length::meter,
};
use uom::ConstZero;

#[cfg(any(test, feature = "approx"))]
use approx::{AbsDiffEq, RelativeEq};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of fixed-point refinements applied to the latitude when inverting ECEF.
///
/// This is a fixed budget, not a convergence test, so that outputs are reproducible.
const LATITUDE_REFINEMENTS: usize = 4;

/// An Earth-bound location (and optionally an orientation) on the WGS84 ellipsoid.
///
/// The orientation is expressed relative to the local East-North-Up axes at this location. It
/// is the identity for coordinates produced by position-only conversions.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeodeticCoordinate {
    pub(crate) latitude: Angle,
    pub(crate) longitude: Angle,
    pub(crate) altitude: Length,
    pub(crate) rotation: UnitQuaternion,
}

impl GeodeticCoordinate {
    /// Constructs a location from latitude, longitude, and altitude with an identity rotation.
    ///
    /// Returns [`Error::LatitudeOutOfRange`] if the latitude is not in [-90°, 90°]; latitudes
    /// are never clamped or wrapped.
    ///
    /// The altitude is measured as distance above the WGS84 reference ellipsoid.
    pub fn build(
        Components {
            latitude,
            longitude,
            altitude,
        }: Components,
    ) -> Result<Self> {
        Ok(Self::builder()
            .latitude(latitude)?
            .longitude(longitude)
            .altitude(altitude)
            .build())
    }

    /// Provides a constructor for a [`GeodeticCoordinate`].
    pub fn builder() -> Builder<MissingLatitude, MissingLongitude, MissingAltitude> {
        Builder {
            under_construction: GeodeticCoordinate {
                latitude: Angle::ZERO,
                longitude: Angle::ZERO,
                altitude: Length::ZERO,
                rotation: UnitQuaternion::identity(),
            },
            has: (PhantomData, PhantomData, PhantomData),
        }
    }

    /// Shorthand for [`GeodeticCoordinate::build`] with values in degrees and meters.
    pub fn from_degrees_and_meters(latitude: f64, longitude: f64, altitude: f64) -> Result<Self> {
        Self::build(Components {
            latitude: Angle::new::<degree>(latitude),
            longitude: Angle::new::<degree>(longitude),
            altitude: Length::new::<meter>(altitude),
        })
    }

    /// Returns the same location with the given orientation relative to its local ENU axes.
    #[must_use]
    pub fn with_rotation(mut self, rotation: UnitQuaternion) -> Self {
        self.rotation = rotation;
        self
    }

    /// Returns the angle north of the equator ("northing"), in [-90°, 90°].
    #[must_use]
    pub fn latitude(&self) -> Angle {
        self.latitude
    }

    /// Returns the angle east of the [IERS Reference Meridian] ("easting"), in (-180°, 180°].
    ///
    /// [IERS Reference Meridian]: https://en.wikipedia.org/wiki/IERS_Reference_Meridian
    #[must_use]
    pub fn longitude(&self) -> Angle {
        Angle::new::<radian>(BoundedAngle::new(self.longitude).to_signed_range())
    }

    /// Returns the distance above the WGS84 ellipsoid.
    ///
    /// Note that the ellipsoid does not follow the geoid, so this is neither height above mean
    /// sea level nor above ground.
    #[must_use]
    pub fn altitude(&self) -> Length {
        self.altitude
    }

    /// Returns the orientation relative to the local East-North-Up axes at this location.
    #[must_use]
    pub fn rotation(&self) -> UnitQuaternion {
        self.rotation
    }

    /// Computes the [great-circle distance] between the two locations on the surface of
    /// the earth.
    ///
    /// Note that this is an approximation as the earth is not a perfect sphere.
    ///
    /// [great-circle distance]: https://en.wikipedia.org/wiki/Great-circle_distance
    #[doc(alias = "great_circle_distance")]
    #[must_use]
    pub fn haversine_distance_on_surface(&self, other: &GeodeticCoordinate) -> Length {
        let haversine = central_angle_by_inverse_haversine(
            self.latitude,
            other.latitude,
            self.longitude,
            other.longitude,
        );

        haversine * Ellipsoid::WGS84.semi_major_axis()
    }

    /// Converts this location to the Earth-Centered, Earth-Fixed frame.
    ///
    /// Equivalent to [`Ecef::from_geodetic`].
    #[must_use]
    pub fn to_ecef(&self) -> Ecef {
        Ecef::from_geodetic(self)
    }
}

impl Display for GeodeticCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lat = self.latitude();
        let lat_is_positive = lat.is_sign_positive();
        let lat = lat.abs().get::<degree>();
        let lon = self.longitude();
        let lon_is_positive = lon.is_sign_positive();
        let lon = lon.abs().get::<degree>();
        let alt = self.altitude.get::<meter>();
        let ns = if lat_is_positive { 'N' } else { 'S' };
        let ew = if lon_is_positive { 'E' } else { 'W' };
        write!(f, "{lat:.7}°{ns}, {lon:.7}°{ew}, {alt:.3}m")
    }
}

/// Converts degrees of longitude, latitude, and meters of altitude straight to ECEF.
///
/// This is the forward projection underlying [`Ecef::from_geodetic`]; it is total for all finite
/// inputs and does not validate the latitude range.
#[must_use]
pub fn to_ecef(
    longitude: impl Into<Angle>,
    latitude: impl Into<Angle>,
    altitude: impl Into<Length>,
) -> Ecef {
    let wgs84 = Ellipsoid::WGS84;
    let height_h = altitude.into().get::<meter>();
    let lon_lambda = longitude.into().get::<radian>();
    let lat_phi = latitude.into().get::<radian>();

    let n_phi = wgs84.prime_vertical_radius_rad(lat_phi);

    let x = (n_phi + height_h) * lat_phi.cos() * lon_lambda.cos();
    let y = (n_phi + height_h) * lat_phi.cos() * lon_lambda.sin();
    let z = (n_phi * (1. - wgs84.e2()) + height_h) * lat_phi.sin();

    Ecef::from_nalgebra_vector(Vector3::new(x, y, z))
}

impl Ecef {
    /// Converts latitude, longitude, and altitude to the Earth-Centered, Earth-Fixed coordinate
    /// system. The rotation of `geodetic` plays no part.
    ///
    /// See:
    /// <https://en.wikipedia.org/wiki/Geographic_coordinate_conversion#From_geodetic_to_ECEF_coordinates>
    #[must_use]
    pub fn from_geodetic(geodetic: &GeodeticCoordinate) -> Self {
        to_ecef(geodetic.longitude, geodetic.latitude, geodetic.altitude)
    }

    /// Converts an Earth-Centered, Earth-Fixed point into latitude, longitude, and altitude.
    ///
    /// The latitude is seeded with Bowring's closed-form estimate from the reduced latitude and
    /// then refined with a fixed number of fixed-point iterations of
    /// `φ = atan2(z + N(φ) e² sin φ, p)`; there is no convergence check. The rotation of the
    /// result is the identity.
    ///
    /// This is not defined at the poles (where the distance to the polar axis is zero).
    #[must_use]
    pub fn to_geodetic(&self) -> GeodeticCoordinate {
        let wgs84 = Ellipsoid::WGS84;
        let (a, b, e2) = (wgs84.a(), wgs84.b(), wgs84.e2());
        let (x, y, z) = (self.point.x, self.point.y, self.point.z);

        let lon = y.atan2(x);
        let p = (x * x + y * y).sqrt();

        // reduced latitude of the point, used to seed the geodetic latitude
        let theta = (z * a).atan2(p * b);
        let mut phi =
            ((z + e2 * b * theta.sin().powi(3)) / (p - e2 * a * theta.cos().powi(3))).atan();

        for _ in 0..LATITUDE_REFINEMENTS {
            let n = wgs84.prime_vertical_radius_rad(phi);
            phi = (z + n * e2 * phi.sin()).atan2(p);
        }

        let altitude = p / phi.cos() - wgs84.prime_vertical_radius_rad(phi);

        GeodeticCoordinate {
            latitude: Angle::new::<radian>(phi),
            longitude: Angle::new::<radian>(lon),
            altitude: Length::new::<meter>(altitude),
            rotation: UnitQuaternion::identity(),
        }
    }
}

impl From<Ecef> for GeodeticCoordinate {
    fn from(ecef: Ecef) -> Self {
        ecef.to_geodetic()
    }
}

impl From<GeodeticCoordinate> for Ecef {
    fn from(geodetic: GeodeticCoordinate) -> Self {
        Self::from_geodetic(&geodetic)
    }
}

/// Computes the central angle between the given lat/lon points.
///
/// To turn this angle into [great-circle distance], multiply this value by the radius of the
/// sphere (ie, of the earth).
///
/// The current implementation computes this [using the archaversine] (inverse haversine).
///
/// [great-circle distance]: https://en.wikipedia.org/wiki/Great-circle_distance
/// [using the archaversine]: https://en.wikipedia.org/wiki/Haversine_formula#Formulation
pub(crate) fn central_angle_by_inverse_haversine(
    lat_a: Angle,
    lat_b: Angle,
    lon_a: Angle,
    lon_b: Angle,
) -> Angle {
    let lat_a = lat_a.get::<radian>(); // φ1
    let lat_b = lat_b.get::<radian>(); // φ2
    let lon_a = lon_a.get::<radian>(); // λ1
    let lon_b = lon_b.get::<radian>(); // λ2
    let delta_lat = lat_b - lat_a;
    let delta_lon = lon_b - lon_a;

    let inner = 1. - delta_lat.cos() + lat_a.cos() * lat_b.cos() * (1. - delta_lon.cos());
    Angle::new::<radian>(2. * (inner / 2.).sqrt().asin())
}

#[cfg(any(test, feature = "approx"))]
impl AbsDiffEq<Self> for GeodeticCoordinate {
    type Epsilon = Length;

    fn default_epsilon() -> Self::Epsilon {
        // NOTE: in meters. The ECEF inversion is good to well below a millimeter, so this only
        // needs to absorb f64 noise in the haversine.
        Length::new::<meter>(0.001)
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.haversine_distance_on_surface(other) < epsilon
            && self
                .altitude
                .get::<meter>()
                .abs_diff_eq(&other.altitude.get::<meter>(), epsilon.get::<meter>())
    }
}

#[cfg(any(test, feature = "approx"))]
impl RelativeEq for GeodeticCoordinate {
    fn default_max_relative() -> Self::Epsilon {
        Length::new::<meter>(f64::default_max_relative())
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        self.haversine_distance_on_surface(other)
            .get::<meter>()
            .abs_diff_eq(&0., epsilon.get::<meter>())
            && self.altitude.get::<meter>().relative_eq(
                &other.altitude.get::<meter>(),
                epsilon.get::<meter>(),
                max_relative.get::<meter>(),
            )
    }
}

/// Argument type for [`GeodeticCoordinate::build`].
#[derive(Debug, Default)]
#[must_use]
pub struct Components {
    /// Must be in [-90°, 90°].
    pub latitude: Angle,
    pub longitude: Angle,
    /// Measured as distance above the WGS84 reference ellipsoid.
    pub altitude: Length,
}

/// Used to indicate that a partially-constructed [`GeodeticCoordinate`] is missing the latitude.
pub struct MissingLatitude;
/// Used to indicate that a partially-constructed [`GeodeticCoordinate`] has the latitude set.
pub struct HasLatitude;
/// Used to indicate that a partially-constructed [`GeodeticCoordinate`] is missing the longitude.
pub struct MissingLongitude;
/// Used to indicate that a partially-constructed [`GeodeticCoordinate`] has the longitude set.
pub struct HasLongitude;
/// Used to indicate that a partially-constructed [`GeodeticCoordinate`] is missing the altitude.
pub struct MissingAltitude;
/// Used to indicate that a partially-constructed [`GeodeticCoordinate`] has the altitude set.
pub struct HasAltitude;

/// [Builder] for a [`GeodeticCoordinate`].
///
/// Construct one through [`GeodeticCoordinate::builder`], and finalize with [`Builder::build`].
///
/// [Builder]: https://rust-unofficial.github.io/patterns/patterns/creational/builder.html
#[derive(Debug)]
#[must_use]
pub struct Builder<Latitude, Longitude, Altitude> {
    under_construction: GeodeticCoordinate,
    has: (
        PhantomData<Latitude>,
        PhantomData<Longitude>,
        PhantomData<Altitude>,
    ),
}

// manual impls of Clone and Copy to avoid requiring the markers to be Copy + Clone
impl<L1, L2, A> Clone for Builder<L1, L2, A> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<L1, L2, A> Copy for Builder<L1, L2, A> {}

impl<L1, L2, A> Builder<L1, L2, A> {
    /// Sets the latitude of the [`GeodeticCoordinate`]-to-be.
    ///
    /// Fails with [`Error::LatitudeOutOfRange`] unless the latitude is in [-90°, 90°].
    pub fn latitude(mut self, latitude: impl Into<Angle>) -> Result<Builder<HasLatitude, L2, A>> {
        let latitude = latitude.into();
        if !(-std::f64::consts::FRAC_PI_2..=std::f64::consts::FRAC_PI_2)
            .contains(&latitude.get::<radian>())
        {
            return Err(Error::LatitudeOutOfRange(latitude.get::<degree>()));
        }
        self.under_construction.latitude = latitude;
        Ok(Builder {
            under_construction: self.under_construction,
            has: (PhantomData::<HasLatitude>, self.has.1, self.has.2),
        })
    }

    /// Sets the longitude of the [`GeodeticCoordinate`]-to-be.
    pub fn longitude(mut self, longitude: impl Into<Angle>) -> Builder<L1, HasLongitude, A> {
        self.under_construction.longitude = longitude.into();
        Builder {
            under_construction: self.under_construction,
            has: (self.has.0, PhantomData::<HasLongitude>, self.has.2),
        }
    }

    /// Sets the altitude of the [`GeodeticCoordinate`]-to-be.
    pub fn altitude(mut self, altitude: impl Into<Length>) -> Builder<L1, L2, HasAltitude> {
        self.under_construction.altitude = altitude.into();
        Builder {
            under_construction: self.under_construction,
            has: (self.has.0, self.has.1, PhantomData::<HasAltitude>),
        }
    }

    /// Sets the orientation relative to local ENU; defaults to the identity.
    pub fn rotation(mut self, rotation: UnitQuaternion) -> Self {
        self.under_construction.rotation = rotation;
        self
    }
}

impl Builder<HasLatitude, HasLongitude, HasAltitude> {
    #[must_use]
    pub fn build(self) -> GeodeticCoordinate {
        self.under_construction
    }
}

#[cfg(test)]
mod tests {
    use super::{to_ecef, Components, GeodeticCoordinate};
    use crate::error::Error;
    use crate::util::BoundedAngle;
    use crate::{ecef, Ecef, UnitQuaternion};
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use quickcheck::quickcheck;
    use rstest::rstest;
    use uom::si::f64::{Angle, Length};
    use uom::si::{
        angle::{degree, radian},
        length::meter,
    };

    fn m(meters: f64) -> Length {
        Length::new::<meter>(meters)
    }
    fn d(degrees: f64) -> Angle {
        Angle::new::<degree>(degrees)
    }

    // quickcheck will give us awkward f64 values -- we ignore those
    fn normal_f64(g: &mut quickcheck::Gen) -> f64 {
        loop {
            match <f64 as quickcheck::Arbitrary>::arbitrary(g) {
                0. => break 0.,
                f if f.is_normal() => break f,
                _ => {}
            }
        }
    }

    impl quickcheck::Arbitrary for GeodeticCoordinate {
        fn arbitrary(g: &mut quickcheck::Gen) -> Self {
            let latitude = normal_f64(g);
            let longitude = normal_f64(g);
            let altitude = normal_f64(g);
            // keep clear of the poles, where the inversion is undefined
            Self {
                latitude: Angle::new::<degree>(latitude.rem_euclid(179.8) - 89.9),
                longitude: Angle::new::<degree>(longitude.rem_euclid(360.) - 180.),
                altitude: Length::new::<meter>(altitude.rem_euclid(50000.) - 10000.),
                rotation: UnitQuaternion::identity(),
            }
        }

        fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
            let Self {
                latitude,
                longitude,
                altitude,
                rotation,
            } = *self;
            if altitude.get::<meter>() == 0. {
                if longitude.get::<radian>() == 0. {
                    Box::new(latitude.get::<radian>().shrink().map(move |lat| Self {
                        latitude: Angle::new::<radian>(lat),
                        longitude,
                        altitude,
                        rotation,
                    }))
                } else {
                    Box::new(longitude.get::<radian>().shrink().map(move |lon| Self {
                        latitude,
                        longitude: Angle::new::<radian>(lon),
                        altitude,
                        rotation,
                    }))
                }
            } else {
                Box::new(altitude.get::<meter>().shrink().map(move |alt| Self {
                    latitude,
                    longitude,
                    altitude: Length::new::<meter>(alt),
                    rotation,
                }))
            }
        }
    }

    #[rstest]
    #[case(d(90.9948211), d(7.8211606), m(1000.))]
    #[case(d(-90.5), d(19.880389), m(0.))]
    #[case(d(190.112282), d(19.880389), m(0.))]
    fn fails_with_bad_lat(#[case] latitude: Angle, #[case] longitude: Angle, #[case] altitude: Length) {
        assert!(matches!(
            GeodeticCoordinate::build(Components {
                latitude,
                longitude,
                altitude
            }),
            Err(Error::LatitudeOutOfRange(_))
        ));
    }

    #[test]
    fn builder_defaults_to_identity_rotation() {
        let location = GeodeticCoordinate::builder()
            .latitude(d(35.))
            .expect("latitude is in-range")
            .longitude(d(135.))
            .altitude(m(10.))
            .build();
        assert_eq!(location.rotation(), UnitQuaternion::identity());
        assert_eq!(location.altitude(), m(10.));
    }

    #[test]
    fn longitude_is_normalized() {
        let location = GeodeticCoordinate::from_degrees_and_meters(10., 190., 0.).unwrap();
        assert_relative_eq!(location.longitude().get::<degree>(), -170., epsilon = 1e-9);
    }

    #[test]
    fn display() {
        for (lat, lon, alt) in [
            (0., 0., 0.),
            // Mt. Fuji
            (35.3619, 138.7280, 2294.0),
            (-35.3619, 138.7280, 2294.0),
            (35.3619, -138.7280, 2294.0),
            (-35.3619, -138.7280, 2294.0),
        ] {
            let location = GeodeticCoordinate::from_degrees_and_meters(lat, lon, alt).unwrap();
            let expected = format!(
                "{:.7}°{}, {:.7}°{}, {:.3}m",
                f64::abs(lat),
                if lat >= 0. { 'N' } else { 'S' },
                f64::abs(lon),
                if lon >= 0. { 'E' } else { 'W' },
                alt
            );
            assert_eq!(location.to_string(), expected);
        }
        insta::assert_snapshot!(
            GeodeticCoordinate::from_degrees_and_meters(35.3619, 138.7280, 2294.0).unwrap(),
            @"35.3619000°N, 138.7280000°E, 2294.000m"
        );
    }

    #[test]
    fn known_to_ecef() {
        // 135°E 35°N 10m
        assert_relative_eq!(
            to_ecef(d(135.), d(35.), m(10.)),
            ecef!(x = m(-3_698_476.0795), y = m(3_698_476.0795), z = m(3_637_872.6451)),
            epsilon = m(0.001)
        );

        for (wgs, ecef) in [
            ((0., 0., 0.), (6378137., 0., 0.)),
            (
                // Mt. Fuji
                (35.3619, 138.7280, 2294.0),
                (-3915138.118709466, 3436144.354064903, 3672011.028417511),
            ),
            (
                (-27.270950, 19.880389, 3000.),
                (5337604.33, 1930119.71, -2906308.35),
            ),
        ] {
            let (lat, lon, alt) = wgs;
            let (x, y, z) = ecef;
            let location = GeodeticCoordinate::from_degrees_and_meters(lat, lon, alt).unwrap();
            assert_relative_eq!(
                Ecef::from_geodetic(&location),
                ecef!(x = m(x), y = m(y), z = m(z)),
                epsilon = m(0.01)
            );
        }
    }

    #[rstest]
    #[case(d(47.9948211), d(7.8211606), m(1000.))]
    #[case(d(67.112282), d(19.880389), m(0.))]
    #[case(d(84.883074), d(-29.160550), m(2000.))]
    #[case(d(-27.270950), d(143.722880), m(100.))]
    #[case(d(35.), d(135.), m(10.))]
    fn to_ecef_matches_nav_types(#[case] lat: Angle, #[case] lon: Angle, #[case] alt: Length) {
        let location = nav_types::WGS84::from_degrees_and_meters(
            lat.get::<degree>(),
            lon.get::<degree>(),
            alt.get::<meter>(),
        );
        let expected = nav_types::ECEF::from(location);

        let ecef = to_ecef(lon, lat, alt);
        assert_relative_eq!(
            ecef,
            ecef!(x = m(expected.x()), y = m(expected.y()), z = m(expected.z())),
            epsilon = m(0.001)
        );
    }

    fn try_geodetic_ecef_roundtrip(location: GeodeticCoordinate) {
        let back = Ecef::from_geodetic(&location).to_geodetic();

        assert_abs_diff_eq!(
            back.latitude().get::<degree>(),
            location.latitude().get::<degree>(),
            epsilon = 1e-6
        );
        // longitudes may legitimately land on either side of the antimeridian
        let delta_lon = BoundedAngle::new(back.longitude() - location.longitude())
            .to_signed_range()
            .to_degrees();
        assert_abs_diff_eq!(delta_lon, 0., epsilon = 1e-6);
        assert_abs_diff_eq!(
            back.altitude().get::<meter>(),
            location.altitude().get::<meter>(),
            epsilon = 1e-3
        );
        assert_relative_eq!(back, location);
    }

    quickcheck! {
        fn geodetic_ecef_roundtrip(location: GeodeticCoordinate) -> () {
            try_geodetic_ecef_roundtrip(location);
        }
    }

    // also, stress test known problematic things
    #[rstest]
    #[case(0., 0., 1000.)]
    #[case(89.9, 0., 1000.)]
    #[case(-89.9, 0., 1000.)]
    #[case(89.9, 180., 1000.)]
    #[case(-89.9, -179.99999, 1000.)]
    #[case(60., -70., -500.)]
    #[case(-60., -70., -500.)]
    #[case(0.1, 179.9, 100_000.)]
    #[case(80., 10., 9000.)]
    fn hard_geodetic_roundtrip(#[case] lat: f64, #[case] lon: f64, #[case] alt: f64) {
        try_geodetic_ecef_roundtrip(
            GeodeticCoordinate::from_degrees_and_meters(lat, lon, alt).expect("lat in [-90,90]"),
        );
    }

    #[test]
    fn to_geodetic_resets_rotation() {
        let rotated = GeodeticCoordinate::from_degrees_and_meters(35., 135., 0.)
            .unwrap()
            .with_rotation(UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3));
        let back = GeodeticCoordinate::from(Ecef::from(rotated));
        assert_eq!(back.rotation(), UnitQuaternion::identity());
    }

    #[test]
    fn haversine_distance() {
        let a = GeodeticCoordinate::from_degrees_and_meters(0., 0., 0.).unwrap();
        let b = GeodeticCoordinate::from_degrees_and_meters(0., 1., 0.).unwrap();
        // one degree of arc along the equator
        assert_relative_eq!(
            a.haversine_distance_on_surface(&b).get::<meter>(),
            111_319.490_793,
            epsilon = 1e-3
        );
    }
}
