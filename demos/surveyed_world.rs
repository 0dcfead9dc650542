use geoframe::helmert::{Correspondence, ScaleMode};
use geoframe::world::{WorldAnchor, WorldPose, YUpLeftHanded};
use geoframe::{
    AnchoredLocalFrame, GeodeticCoordinate, HelmertTransform2D, Point2, UnitQuaternion, Vector3,
};
use uom::si::angle::degree;
use uom::si::length::meter;

fn main() -> Result<(), geoframe::Error> {
    let mut frame = AnchoredLocalFrame::<YUpLeftHanded>::new();
    frame.on_calibrated(|calibrated| {
        println!(
            "calibrated at {}: east = {:?}, north = {:?}",
            calibrated.origin(),
            calibrated.east(),
            calibrated.north()
        );
    });

    // a marker in the scene, placed at a known spot and facing 30° west of North
    let marker = GeodeticCoordinate::from_degrees_and_meters(35.3619, 138.728, 2294.)?
        .with_rotation(UnitQuaternion::from_axis_angle(
            &Vector3::z_axis(),
            30f64.to_radians(),
        ));
    let marker_in_world = WorldPose::new(
        Vector3::new(12., 0., -8.),
        UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.),
    );
    frame.calibrate_from_anchor(
        marker,
        &WorldAnchor::from_pose::<YUpLeftHanded>(&marker_in_world),
    )?;

    // a camera 200 units in front of the marker and 15 units up
    let camera = WorldPose::new(
        Vector3::new(12., 15., 192.),
        UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 90f64.to_radians()),
    );
    let camera = frame.world_pose_to_geodetic(&camera)?;
    println!("camera is at {camera}");
    assert!((camera.altitude().get::<meter>() - 2309.).abs() < 0.01);

    // the marker's own pose survives the round trip
    let back = frame.geodetic_to_world_pose(&marker)?;
    assert!((back.position - marker_in_world.position).norm() < 1e-6);

    // register the scene's ground plane against a projected map grid
    let grid = HelmertTransform2D::fit(
        &[
            Correspondence::new(Point2::new(316.578, 301.545), Point2::new(-37548.103, -21027.030)),
            Correspondence::new(Point2::new(318.129, 314.027), Point2::new(-37541.115, -21016.568)),
            Correspondence::new(Point2::new(311.536, 314.648), Point2::new(-37546.728, -21013.058)),
        ],
        ScaleMode::Unit,
    )?;
    println!(
        "grid is rotated {:.3}° from the scene",
        grid.rotation().get::<degree>()
    );
    let on_grid = grid.transform(&Point2::new(303.011, 304.983));
    let in_scene = grid.transform_inverse(&on_grid);
    assert!((in_scene - Point2::new(303.011, 304.983)).norm() < 1e-9);

    Ok(())
}
