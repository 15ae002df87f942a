use crate::{
    config::{BodyViewStyle, UntrackedBonePolicy},
    kinect::{JointProjector, KinectError, Result, Sensor},
    types::{
        Body, FrameEdges, FrameSize, HandState, JOINT_COUNT, Joint, JointType, Point2,
        TrackingState,
    },
};

use super::canvas::{Canvas, Color};

/// Pairs of joints joined by a drawn line.
pub const BONES: [(JointType, JointType); 24] = [
    // Torso
    (JointType::Head, JointType::Neck),
    (JointType::Neck, JointType::SpineShoulder),
    (JointType::SpineShoulder, JointType::SpineMid),
    (JointType::SpineMid, JointType::SpineBase),
    (JointType::SpineShoulder, JointType::ShoulderRight),
    (JointType::SpineShoulder, JointType::ShoulderLeft),
    (JointType::SpineBase, JointType::HipRight),
    (JointType::SpineBase, JointType::HipLeft),
    // Right arm
    (JointType::ShoulderRight, JointType::ElbowRight),
    (JointType::ElbowRight, JointType::WristRight),
    (JointType::WristRight, JointType::HandRight),
    (JointType::HandRight, JointType::HandTipRight),
    (JointType::WristRight, JointType::ThumbRight),
    // Left arm
    (JointType::ShoulderLeft, JointType::ElbowLeft),
    (JointType::ElbowLeft, JointType::WristLeft),
    (JointType::WristLeft, JointType::HandLeft),
    (JointType::HandLeft, JointType::HandTipLeft),
    (JointType::WristLeft, JointType::ThumbLeft),
    // Right leg
    (JointType::HipRight, JointType::KneeRight),
    (JointType::KneeRight, JointType::AnkleRight),
    (JointType::AnkleRight, JointType::FootRight),
    // Left leg
    (JointType::HipLeft, JointType::KneeLeft),
    (JointType::KneeLeft, JointType::AnkleLeft),
    (JointType::AnkleLeft, JointType::FootLeft),
];

/// Draws every tracked body of the latest body frame onto a canvas.
pub struct BodyView<C: Canvas> {
    bodies: Vec<Body>,
    canvas: C,
    projector: Box<dyn JointProjector>,
    style: BodyViewStyle,
    frames_rendered: u64,
}

impl<C: Canvas> BodyView<C> {
    /// `make_canvas` receives the depth frame size, which is the canvas size.
    pub fn new<F>(
        sensor: Option<&dyn Sensor>,
        make_canvas: F,
        projector: Box<dyn JointProjector>,
        style: BodyViewStyle,
    ) -> Result<Self>
    where
        F: FnOnce(FrameSize) -> C,
    {
        let sensor = sensor.ok_or(KinectError::MissingSensor)?;

        Ok(Self {
            bodies: vec![Body::default(); sensor.body_count()],
            canvas: make_canvas(sensor.depth_frame_size()),
            projector,
            style,
            frames_rendered: 0,
        })
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    /// Slots the next body frame is copied into.
    pub fn bodies_mut(&mut self) -> &mut [Body] {
        &mut self.bodies
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    #[cfg(test)]
    pub fn canvas_mut(&mut self) -> &mut C {
        &mut self.canvas
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Redraws the canvas from the current body slots.
    pub fn update_body_frame(&mut self, sensor: Option<&dyn Sensor>) -> Result<()> {
        sensor.ok_or(KinectError::MissingSensor)?;

        let (width, height) = (self.canvas.width() as f32, self.canvas.height() as f32);
        self.canvas.clear_rect(0.0, 0.0, width, height);

        let mut joint_points = [Point2::default(); JOINT_COUNT];
        for (index, body) in self.bodies.iter().enumerate() {
            if !body.is_tracked {
                continue;
            }

            joint_points.fill(Point2::default());
            if !self
                .projector
                .process_joint_locations(&body.joints, &mut joint_points)
            {
                log::trace!("joint projection failed for body slot {index}");
                continue;
            }

            draw_body(
                &mut self.canvas,
                &self.style,
                &body.joints,
                &joint_points,
                self.style.body_color(index),
            );
            draw_hand_state(
                &mut self.canvas,
                &self.style,
                body.hand_left_state,
                joint_points[JointType::HandLeft.index()],
            );
            draw_hand_state(
                &mut self.canvas,
                &self.style,
                body.hand_right_state,
                joint_points[JointType::HandRight.index()],
            );
            draw_clipped_edges(&mut self.canvas, &self.style, body.clipped_edges);
        }

        self.frames_rendered += 1;
        Ok(())
    }
}

fn draw_body(
    canvas: &mut impl Canvas,
    style: &BodyViewStyle,
    joints: &[Joint; JOINT_COUNT],
    points: &[Point2; JOINT_COUNT],
    body_color: Color,
) {
    for &(start, end) in &BONES {
        let state0 = joints[start.index()].tracking_state;
        let state1 = joints[end.index()].tracking_state;

        if state0 == TrackingState::NotTracked || state1 == TrackingState::NotTracked {
            match style.untracked_bone_policy {
                UntrackedBonePolicy::AbortBody => return,
                UntrackedBonePolicy::SkipBone => continue,
            }
        }

        let thickness = if state0 == TrackingState::Tracked && state1 == TrackingState::Tracked {
            style.tracked_bone_thickness
        } else {
            style.inferred_bone_thickness
        };

        canvas.stroke_line(points[start.index()], points[end.index()], thickness, body_color);
    }

    for (joint, point) in joints.iter().zip(points) {
        let color = match joint.tracking_state {
            TrackingState::Tracked => style.tracked_joint_color,
            TrackingState::Inferred => style.inferred_joint_color,
            TrackingState::NotTracked => continue,
        };
        canvas.fill_circle(*point, style.joint_thickness, color);
    }
}

/// Marker color for a hand state; `None` means no marker.
pub fn hand_color(style: &BodyViewStyle, state: HandState) -> Option<Color> {
    match state {
        HandState::Closed => Some(style.hand_closed_color),
        HandState::Open => Some(style.hand_open_color),
        HandState::Lasso => Some(style.hand_lasso_color),
        HandState::Unknown | HandState::NotTracked => None,
    }
}

fn draw_hand_state(canvas: &mut impl Canvas, style: &BodyViewStyle, state: HandState, at: Point2) {
    let Some(color) = hand_color(style, state) else {
        return;
    };

    canvas.set_global_alpha(style.hand_alpha);
    canvas.fill_circle(at, style.hand_size, color);
    canvas.set_global_alpha(1.0);
}

fn draw_clipped_edges(canvas: &mut impl Canvas, style: &BodyViewStyle, edges: FrameEdges) {
    let (width, height) = (canvas.width() as f32, canvas.height() as f32);
    let thickness = style.clip_bounds_thickness;
    let color = style.clip_bounds_color;

    if edges.contains(FrameEdges::BOTTOM) {
        canvas.fill_rect(0.0, height - thickness, width, thickness, color);
    }
    if edges.contains(FrameEdges::TOP) {
        canvas.fill_rect(0.0, 0.0, width, thickness, color);
    }
    if edges.contains(FrameEdges::LEFT) {
        canvas.fill_rect(0.0, 0.0, thickness, height, color);
    }
    if edges.contains(FrameEdges::RIGHT) {
        canvas.fill_rect(width - thickness, 0.0, thickness, height, color);
    }
}
