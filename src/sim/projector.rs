use crate::{
    kinect::JointProjector,
    types::{CameraSpacePoint, FrameSize, JOINT_COUNT, Joint, Point2},
};

pub const DEPTH_FRAME_SIZE: FrameSize = FrameSize {
    width: 512,
    height: 424,
};

/// Pinhole model of the depth camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PinholeProjector {
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
}

impl PinholeProjector {
    pub const fn kinect_depth() -> Self {
        Self {
            fx: 365.5,
            fy: 365.5,
            cx: 256.0,
            cy: 212.0,
        }
    }

    /// `None` for points at or behind the camera plane.
    pub fn project(&self, point: CameraSpacePoint) -> Option<Point2> {
        if point.z <= 0.0 {
            return None;
        }
        Some(Point2::new(
            self.cx + self.fx * point.x / point.z,
            self.cy - self.fy * point.y / point.z,
        ))
    }
}

impl JointProjector for PinholeProjector {
    fn process_joint_locations(
        &self,
        joints: &[Joint; JOINT_COUNT],
        points: &mut [Point2; JOINT_COUNT],
    ) -> bool {
        for (joint, point) in joints.iter().zip(points.iter_mut()) {
            match self.project(joint.position) {
                Some(projected) => *point = projected,
                None => return false,
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optical_axis_hits_principal_point() {
        let projector = PinholeProjector::kinect_depth();
        let point = projector
            .project(CameraSpacePoint {
                x: 0.0,
                y: 0.0,
                z: 2.0,
            })
            .unwrap();
        assert_eq!(point, Point2::new(256.0, 212.0));
    }

    #[test]
    fn test_up_is_towards_top_of_image() {
        let projector = PinholeProjector::kinect_depth();
        let point = projector
            .project(CameraSpacePoint {
                x: 1.0,
                y: 1.0,
                z: 1.0,
            })
            .unwrap();
        assert!(point.x > 256.0);
        assert!(point.y < 212.0);
    }

    #[test]
    fn test_joint_behind_camera_fails_projection() {
        let projector = PinholeProjector::kinect_depth();
        let mut joints = [Joint::default(); JOINT_COUNT];
        for joint in joints.iter_mut() {
            joint.position.z = 2.0;
        }
        let mut points = [Point2::default(); JOINT_COUNT];
        assert!(projector.process_joint_locations(&joints, &mut points));

        joints[7].position.z = 0.0;
        assert!(!projector.process_joint_locations(&joints, &mut points));
    }
}
