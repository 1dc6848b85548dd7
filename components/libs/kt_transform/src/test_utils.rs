use crate::trace::NullSink;
use crate::TransformGraph;
use kt_rigid_payloads::{RigidTransform, IDENTITY};
use std::f64::consts::PI;

/// Two-branch arm: link1 and link2 hang off the base, link3 hangs upside
/// down under link1 and carries link4 and link5. The first entry names the
/// base origin but has no frames, so it stays out of the graph.
pub fn robot_arm_edges() -> Vec<RigidTransform> {
    vec![
        RigidTransform::identity().with_name("base_link"),
        RigidTransform::new(0.1, 0.5, 0.0, 0.0, 0.0, 0.0)
            .with_frames("base_link", "link1")
            .with_name("bTo1"),
        RigidTransform::new(0.0, 0.0, 0.5, 0.0, 0.0, 0.0)
            .with_frames("base_link", "link2")
            .with_name("bTo2"),
        RigidTransform::new(0.0, 0.0, -0.2, PI, 0.0, 0.0)
            .with_frames("link1", "link3")
            .with_name("3To1"),
        RigidTransform::identity()
            .with_frames("link3", "link4")
            .with_name("4To3"),
        RigidTransform::identity()
            .with_frames("link3", "link5")
            .with_name("5To3"),
    ]
}

pub fn robot_arm() -> TransformGraph {
    TransformGraph::builder()
        .edges(robot_arm_edges())
        .root("base_link")
        .sink(NullSink)
        .build()
        .unwrap()
}

pub fn assert_identity(transform: &RigidTransform) {
    assert!(
        transform.matrix_approx_eq(&IDENTITY, 1e-9),
        "not an identity:\n{transform}"
    );
}
