//! Planar registration by a 2D Helmert (similarity) transform.
//!
//! Given points whose coordinates are known in two planar systems, for example a world's
//! horizontal plane and a projected map grid, [`HelmertTransform2D::fit`] finds the rotation,
//! uniform scale, and translation that best map one onto the other in the least-squares sense.

use crate::error::{Error, Result};
use crate::{Point2, Vector2};
use nalgebra::{DMatrix, DVector, Matrix4, Vector4};
use tracing::{debug, trace, warn};
use uom::si::angle::{degree, radian};
use uom::si::f64::Angle;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A point known in both the source system (`x`, `y`) and the projected system (`proj_x`,
/// `proj_y`).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Correspondence {
    pub x: f64,
    pub y: f64,
    pub proj_x: f64,
    pub proj_y: f64,
}

impl Correspondence {
    #[must_use]
    pub fn new(source: Point2, projected: Point2) -> Self {
        Self {
            x: source.x,
            y: source.y,
            proj_x: projected.x,
            proj_y: projected.y,
        }
    }
}

/// How the fitted scale is used when resolving a [`HelmertSystem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ScaleMode {
    /// Keep the least-squares scale.
    #[default]
    Fitted,
    /// Discard the fitted scale and keep only rotation and translation.
    Unit,
}

/// The linear least-squares system for a 2D Helmert transform, before it is solved.
///
/// Each correspondence contributes two rows to the design matrix `A` and the observation
/// vector `L`:
///
/// ```text
/// [ x   y  1  0 ]  ->  proj_x
/// [ y  -x  0  1 ]  ->  proj_y
/// ```
///
/// The unknowns are the two rotation-and-scale coefficients followed by the X and Y
/// translations.
#[derive(Debug, Clone, PartialEq)]
pub struct HelmertSystem {
    design: DMatrix<f64>,
    observations: DVector<f64>,
}

impl HelmertSystem {
    /// Four unknowns need at least two point pairs.
    pub const MIN_CORRESPONDENCES: usize = 2;

    /// Assembles the system from `correspondences`.
    ///
    /// Returns [`Error::InsufficientData`] if there are fewer than
    /// [`HelmertSystem::MIN_CORRESPONDENCES`] of them.
    pub fn initialize(correspondences: &[Correspondence]) -> Result<Self> {
        let have = correspondences.len();
        if have < Self::MIN_CORRESPONDENCES {
            warn!(have, "too few correspondences for a helmert fit");
            return Err(Error::InsufficientData {
                need: Self::MIN_CORRESPONDENCES,
                have,
            });
        }
        trace!(correspondences = have, "assembling helmert system");

        let mut design = Vec::with_capacity(8 * have);
        let mut observations = Vec::with_capacity(2 * have);
        for c in correspondences {
            design.extend_from_slice(&[c.x, c.y, 1., 0.]);
            observations.push(c.proj_x);
            design.extend_from_slice(&[c.y, -c.x, 0., 1.]);
            observations.push(c.proj_y);
        }

        Ok(Self {
            design: DMatrix::from_row_slice(2 * have, 4, &design),
            observations: DVector::from_vec(observations),
        })
    }

    /// The `2n × 4` design matrix `A`.
    #[must_use]
    pub fn design_matrix(&self) -> &DMatrix<f64> {
        &self.design
    }

    /// The `2n` observations `L`.
    #[must_use]
    pub fn observations(&self) -> &DVector<f64> {
        &self.observations
    }

    /// Solves the normal equations `(AᵀA) x = AᵀL`.
    ///
    /// Returns [`Error::SingularSystem`] if every correspondence has the same source point (up to
    /// rounding), if `AᵀA` cannot otherwise be inverted, or if the fit collapses to zero scale.
    pub fn resolve(&self, mode: ScaleMode) -> Result<HelmertTransform2D> {
        // AᵀA is singular exactly when the source points coincide, but rounding rarely leaves
        // its determinant at zero, so that case is caught here rather than by the inverse
        if self.sources_coincide() {
            warn!("helmert source points coincide");
            return Err(Error::SingularSystem);
        }

        let transposed = self.design.transpose();
        let normal = Matrix4::from_column_slice((&transposed * &self.design).as_slice());
        let rhs = Vector4::from_column_slice((&transposed * &self.observations).as_slice());

        let solution = normal
            .try_inverse()
            .map(|inverse| inverse * rhs)
            .filter(|solution| solution.iter().all(|c| c.is_finite()))
            .ok_or_else(|| {
                warn!("helmert normal equations are singular");
                Error::SingularSystem
            })?;

        let (a, b) = (solution[0], solution[1]);
        let fitted_scale = a.hypot(b);
        if fitted_scale == 0. {
            warn!("helmert fit has zero scale");
            return Err(Error::SingularSystem);
        }

        let (scale, k_a, k_b) = match mode {
            ScaleMode::Fitted => (fitted_scale, a, b),
            ScaleMode::Unit => (1., a / fitted_scale, b / fitted_scale),
        };
        let transform = HelmertTransform2D {
            rotation: Angle::new::<radian>((-b).atan2(a)),
            scale,
            translation: Vector2::new(solution[2], solution[3]),
            k_a,
            k_b,
        };

        debug!(
            rotation = transform.rotation.get::<degree>(),
            scale,
            fitted_scale,
            translation_x = solution[2],
            translation_y = solution[3],
            "resolved helmert transform"
        );
        Ok(transform)
    }

    /// Whether every source point is the same, up to rounding relative to their magnitude.
    fn sources_coincide(&self) -> bool {
        // the source point of each correspondence is the start of its first row
        let sources: Vec<Vector2> = self
            .design
            .row_iter()
            .step_by(2)
            .map(|row| Vector2::new(row[0], row[1]))
            .collect();
        let count = sources.len() as f64;
        let centroid = sources.iter().fold(Vector2::zeros(), |sum, p| sum + p) / count;

        let spread = sources
            .iter()
            .map(|p| (p - centroid).norm())
            .fold(0., f64::max);
        let magnitude = sources.iter().map(|p| p.amax()).fold(0., f64::max);
        spread <= magnitude * COINCIDENCE_TOLERANCE
    }
}

/// Relative spread below which source points are treated as a single point.
const COINCIDENCE_TOLERANCE: f64 = 1e-12;

/// A resolved 2D similarity transform:
///
/// ```text
/// x' =  k_a·x + k_b·y + Tx
/// y' = -k_b·x + k_a·y + Ty
/// ```
///
/// ```
/// use geoframe::helmert::{Correspondence, ScaleMode};
/// use geoframe::{HelmertTransform2D, Point2};
///
/// let transform = HelmertTransform2D::fit(
///     &[
///         Correspondence::new(Point2::new(316.578, 301.545), Point2::new(-37548.103, -21027.030)),
///         Correspondence::new(Point2::new(318.129, 314.027), Point2::new(-37541.115, -21016.568)),
///         Correspondence::new(Point2::new(311.536, 314.648), Point2::new(-37546.728, -21013.058)),
///     ],
///     ScaleMode::Fitted,
/// )?;
///
/// let projected = transform.transform(&Point2::new(303.011, 304.983));
/// assert!((projected.x - -37558.685).abs() < 0.001);
/// assert!((projected.y - -21017.870).abs() < 0.001);
/// # Ok::<(), geoframe::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HelmertTransform2D {
    rotation: Angle,
    scale: f64,
    translation: Vector2,
    k_a: f64,
    k_b: f64,
}

impl HelmertTransform2D {
    /// Assembles and solves the system for `correspondences` in one go.
    pub fn fit(correspondences: &[Correspondence], mode: ScaleMode) -> Result<Self> {
        HelmertSystem::initialize(correspondences)?.resolve(mode)
    }

    /// The fitted rotation, `atan2(-k_b, k_a)`.
    #[must_use]
    pub fn rotation(&self) -> Angle {
        self.rotation
    }

    /// The fitted scale, or exactly `1` under [`ScaleMode::Unit`].
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// `(Tx, Ty)`.
    #[must_use]
    pub fn translation(&self) -> Vector2 {
        self.translation
    }

    /// `(k_a, k_b)`.
    #[must_use]
    pub fn coefficients(&self) -> (f64, f64) {
        (self.k_a, self.k_b)
    }

    #[must_use]
    pub fn transform(&self, point: &Point2) -> Point2 {
        Point2::new(
            self.k_a * point.x + self.k_b * point.y + self.translation.x,
            -self.k_b * point.x + self.k_a * point.y + self.translation.y,
        )
    }

    /// Maps a projected point back into the source system.
    ///
    /// This divides by the scale once rather than by its square, so it is exact under
    /// [`ScaleMode::Unit`] but overshoots by a factor of [`HelmertTransform2D::scale`] under
    /// [`ScaleMode::Fitted`]. For registrations whose scale is close to one the difference is
    /// below the fit's own residuals.
    #[must_use]
    pub fn transform_inverse(&self, point: &Point2) -> Point2 {
        let dx = point.x - self.translation.x;
        let dy = point.y - self.translation.y;
        Point2::new(
            (self.k_a * dx - self.k_b * dy) / self.scale,
            (self.k_b * dx + self.k_a * dy) / self.scale,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{Correspondence, HelmertSystem, HelmertTransform2D, ScaleMode};
    use crate::error::Error;
    use crate::Point2;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use rstest::rstest;
    use uom::si::angle::degree;

    fn surveyed() -> [Correspondence; 3] {
        [
            Correspondence::new(
                Point2::new(316.578, 301.545),
                Point2::new(-37548.103, -21027.030),
            ),
            Correspondence::new(
                Point2::new(318.129, 314.027),
                Point2::new(-37541.115, -21016.568),
            ),
            Correspondence::new(
                Point2::new(311.536, 314.648),
                Point2::new(-37546.728, -21013.058),
            ),
        ]
    }

    /// Correspondences generated from an exactly known transform.
    fn synthetic(rotation_degrees: f64, scale: f64, tx: f64, ty: f64) -> Vec<Correspondence> {
        let (sin, cos) = rotation_degrees.to_radians().sin_cos();
        let (k_a, k_b) = (scale * cos, -scale * sin);
        [(0., 0.), (10., 0.), (0., 10.), (7., -3.)]
            .into_iter()
            .map(|(x, y)| {
                Correspondence::new(
                    Point2::new(x, y),
                    Point2::new(k_a * x + k_b * y + tx, -k_b * x + k_a * y + ty),
                )
            })
            .collect()
    }

    #[test]
    fn surveyed_fit() {
        let transform = HelmertTransform2D::fit(&surveyed(), ScaleMode::Fitted).unwrap();

        assert_abs_diff_eq!(
            transform.rotation().get::<degree>(),
            -26.660_053,
            epsilon = 1e-5
        );
        assert_abs_diff_eq!(transform.scale(), 1.000_061_7, epsilon = 1e-6);

        let projected = transform.transform(&Point2::new(303.011, 304.983));
        assert_abs_diff_eq!(projected, Point2::new(-37558.685, -21017.870), epsilon = 0.001);

        let source = transform.transform_inverse(&projected);
        assert_abs_diff_eq!(source, Point2::new(303.011, 304.983), epsilon = 0.05);
    }

    #[rstest]
    #[case(Point2::new(303.011, 304.983))]
    #[case(Point2::new(316.578, 301.545))]
    #[case(Point2::new(320., 320.))]
    #[case(Point2::new(290., 310.))]
    fn fitted_round_trip_is_close(#[case] point: Point2) {
        let transform = HelmertTransform2D::fit(&surveyed(), ScaleMode::Fitted).unwrap();
        let back = transform.transform_inverse(&transform.transform(&point));
        assert_abs_diff_eq!(back, point, epsilon = 0.1);
    }

    #[rstest]
    #[case(Point2::new(303.011, 304.983))]
    #[case(Point2::new(0., 0.))]
    #[case(Point2::new(-1500., 2750.))]
    fn unit_scale_round_trip_is_exact(#[case] point: Point2) {
        let transform = HelmertTransform2D::fit(&surveyed(), ScaleMode::Unit).unwrap();
        assert_eq!(transform.scale(), 1.);

        let (k_a, k_b) = transform.coefficients();
        assert_relative_eq!(k_a.hypot(k_b), 1., epsilon = 1e-12);

        let back = transform.transform_inverse(&transform.transform(&point));
        assert_abs_diff_eq!(back, point, epsilon = 1e-9);
    }

    #[test]
    fn unit_scale_keeps_rotation_and_translation() {
        let fitted = HelmertTransform2D::fit(&surveyed(), ScaleMode::Fitted).unwrap();
        let unit = HelmertTransform2D::fit(&surveyed(), ScaleMode::Unit).unwrap();
        assert_eq!(unit.rotation(), fitted.rotation());
        assert_eq!(unit.translation(), fitted.translation());
    }

    #[rstest]
    #[case(30., 2., 10., -5.)]
    #[case(-135., 0.5, -1000., 250.)]
    #[case(0., 1., 0., 0.)]
    fn recovers_exact_parameters(
        #[case] rotation: f64,
        #[case] scale: f64,
        #[case] tx: f64,
        #[case] ty: f64,
    ) {
        let transform =
            HelmertTransform2D::fit(&synthetic(rotation, scale, tx, ty), ScaleMode::Fitted)
                .unwrap();

        assert_abs_diff_eq!(transform.rotation().get::<degree>(), rotation, epsilon = 1e-9);
        assert_relative_eq!(transform.scale(), scale, epsilon = 1e-9);
        assert_abs_diff_eq!(transform.translation().x, tx, epsilon = 1e-7);
        assert_abs_diff_eq!(transform.translation().y, ty, epsilon = 1e-7);
    }

    #[test]
    fn design_matrix_layout() {
        let system = HelmertSystem::initialize(&surveyed()[..2]).unwrap();
        let design = system.design_matrix();

        assert_eq!(design.shape(), (4, 4));
        assert_eq!(design.row(0).iter().copied().collect::<Vec<_>>(), [316.578, 301.545, 1., 0.]);
        assert_eq!(
            design.row(1).iter().copied().collect::<Vec<_>>(),
            [301.545, -316.578, 0., 1.]
        );
        assert_eq!(
            system.observations().iter().copied().collect::<Vec<_>>(),
            [-37548.103, -21027.030, -37541.115, -21016.568]
        );
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    fn too_few_correspondences(#[case] have: usize) {
        assert_eq!(
            HelmertSystem::initialize(&surveyed()[..have]),
            Err(Error::InsufficientData { need: 2, have })
        );
    }

    #[test]
    fn coincident_source_points_are_singular() {
        let duplicate = Correspondence::new(Point2::new(1., 2.), Point2::new(5., 6.));
        assert_eq!(
            HelmertTransform2D::fit(&[duplicate, duplicate], ScaleMode::Fitted),
            Err(Error::SingularSystem)
        );
        let origin = Correspondence::default();
        assert_eq!(
            HelmertTransform2D::fit(&[origin, origin, origin], ScaleMode::Unit),
            Err(Error::SingularSystem)
        );
    }

    #[rstest]
    #[case(Point2::new(316.578, 301.545), Point2::new(-37548.103, -21027.030), 2, ScaleMode::Fitted)]
    #[case(Point2::new(316.578, 301.545), Point2::new(-37548.103, -21027.030), 3, ScaleMode::Fitted)]
    #[case(Point2::new(0.1, 0.7), Point2::new(4.2, -1.3), 3, ScaleMode::Fitted)]
    #[case(Point2::new(123456.789, 654321.123), Point2::new(-5.5, 8.25), 2, ScaleMode::Unit)]
    fn repeated_surveyed_point_is_singular(
        #[case] source: Point2,
        #[case] target: Point2,
        #[case] copies: usize,
        #[case] mode: ScaleMode,
    ) {
        let correspondences = vec![Correspondence::new(source, target); copies];
        assert_eq!(
            HelmertTransform2D::fit(&correspondences, mode),
            Err(Error::SingularSystem)
        );
    }

    #[test]
    fn nearby_distinct_points_still_resolve() {
        let mut correspondences = surveyed();
        correspondences[1].x = 316.579;
        correspondences[1].y = 301.545;
        correspondences[2].x = 316.578;
        correspondences[2].y = 301.546;
        assert!(HelmertTransform2D::fit(&correspondences, ScaleMode::Fitted).is_ok());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_round_trip() {
        let transform = HelmertTransform2D::fit(&surveyed(), ScaleMode::Fitted).unwrap();
        let yaml = serde_yaml::to_string(&transform).unwrap();
        let back: HelmertTransform2D = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, transform);
    }
}
