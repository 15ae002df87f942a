use crate::types::{
    Body, CameraSpacePoint, DiscreteGestureResult, FrameEdges, FrameSize, HandState, JOINT_COUNT,
    JointType, TrackingId, TrackingState,
};

use super::projector::PinholeProjector;

/// Height of the spine base above the camera's optical axis, in meters.
const SPINE_BASE_HEIGHT: f32 = -0.1;
const SEAT_DROP: f32 = 0.42;

// Offsets from the spine base of a standing body, indexed by joint type.
const STANDING_POSE: [[f32; 3]; JOINT_COUNT] = [
    [0.0, 0.0, 0.0],      // SpineBase
    [0.0, 0.30, 0.0],     // SpineMid
    [0.0, 0.58, 0.0],     // Neck
    [0.0, 0.72, 0.0],     // Head
    [-0.18, 0.52, 0.0],   // ShoulderLeft
    [-0.24, 0.26, 0.0],   // ElbowLeft
    [-0.26, 0.04, 0.0],   // WristLeft
    [-0.26, -0.04, 0.0],  // HandLeft
    [0.18, 0.52, 0.0],    // ShoulderRight
    [0.24, 0.26, 0.0],    // ElbowRight
    [0.26, 0.04, 0.0],    // WristRight
    [0.26, -0.04, 0.0],   // HandRight
    [-0.09, -0.02, 0.0],  // HipLeft
    [-0.10, -0.45, 0.0],  // KneeLeft
    [-0.10, -0.85, 0.0],  // AnkleLeft
    [-0.10, -0.90, -0.10], // FootLeft
    [0.09, -0.02, 0.0],   // HipRight
    [0.10, -0.45, 0.0],   // KneeRight
    [0.10, -0.85, 0.0],   // AnkleRight
    [0.10, -0.90, -0.10], // FootRight
    [0.0, 0.50, 0.0],     // SpineShoulder
    [-0.26, -0.12, 0.0],  // HandTipLeft
    [-0.23, -0.06, -0.03], // ThumbLeft
    [0.26, -0.12, 0.0],   // HandTipRight
    [0.23, -0.06, -0.03], // ThumbRight
];

const HAND_CYCLE: [HandState; 4] = [
    HandState::Open,
    HandState::Closed,
    HandState::Lasso,
    HandState::Unknown,
];

/// One scripted person occupying a body slot.
#[derive(Clone, Debug, PartialEq)]
pub struct Actor {
    pub slot: usize,
    pub tracking_id: TrackingId,
    /// Active for `enter <= t < leave`, with `t` the tick within the script cycle.
    pub enter: u64,
    pub leave: Option<u64>,
    /// Lateral position and distance from the sensor, in meters.
    pub x: f32,
    pub z: f32,
    pub sway: f32,
    pub sway_period: u64,
    /// Ticks spent standing, then seated, alternately. Zero never sits.
    pub sit_period: u64,
    pub hand_period: u64,
    /// Joint that drops out of tracking for one quarter of every 200 ticks.
    pub flicker_joint: Option<JointType>,
}

impl Actor {
    pub fn new(slot: usize, tracking_id: TrackingId) -> Self {
        Self {
            slot,
            tracking_id,
            enter: 0,
            leave: None,
            x: 0.0,
            z: 2.5,
            sway: 0.0,
            sway_period: 0,
            sit_period: 0,
            hand_period: 0,
            flicker_joint: None,
        }
    }

    fn is_active(&self, t: u64) -> bool {
        t >= self.enter && self.leave.is_none_or(|leave| t < leave)
    }

    pub fn is_seated(&self, t: u64) -> bool {
        self.sit_period > 0 && (t.saturating_sub(self.enter) / self.sit_period) % 2 == 1
    }

    fn seated_result(&self, t: u64) -> DiscreteGestureResult {
        if !self.is_seated(t) {
            return DiscreteGestureResult {
                detected: false,
                confidence: 0.05,
            };
        }

        let into_phase = t.saturating_sub(self.enter) % self.sit_period;
        let progress = into_phase as f32 / self.sit_period as f32;
        DiscreteGestureResult {
            detected: true,
            confidence: ((0.6 + 0.35 * progress) * 100.0).round() / 100.0,
        }
    }

    fn hand_state(&self, t: u64, offset: usize) -> HandState {
        if self.hand_period == 0 {
            return HandState::Unknown;
        }
        HAND_CYCLE[((t / self.hand_period) as usize + offset) % HAND_CYCLE.len()]
    }

    fn body_at(&self, t: u64, projector: &PinholeProjector, frame: FrameSize) -> Body {
        let seated = self.is_seated(t);
        let sway = if self.sway_period > 0 {
            let phase = (t % self.sway_period) as f32 / self.sway_period as f32;
            self.sway * (phase * std::f32::consts::TAU).sin()
        } else {
            0.0
        };
        let origin_x = self.x + sway;

        let mut body = Body {
            tracking_id: self.tracking_id,
            is_tracked: true,
            hand_left_state: self.hand_state(t, 0),
            hand_right_state: self.hand_state(t, 2),
            ..Body::default()
        };

        for (joint_type, joint) in JointType::ALL.iter().zip(body.joints.iter_mut()) {
            let [dx, mut dy, mut dz] = STANDING_POSE[joint_type.index()];
            if seated {
                apply_seated_offset(*joint_type, &mut dy, &mut dz);
            }
            joint.position = CameraSpacePoint {
                x: origin_x + dx,
                y: SPINE_BASE_HEIGHT + dy,
                z: self.z + dz,
            };
            joint.tracking_state = match joint_type {
                JointType::HandTipLeft
                | JointType::ThumbLeft
                | JointType::HandTipRight
                | JointType::ThumbRight => TrackingState::Inferred,
                _ => TrackingState::Tracked,
            };
        }

        if let Some(flicker) = self.flicker_joint {
            if (t % 200) >= 150 {
                body.joints[flicker.index()].tracking_state = TrackingState::NotTracked;
            }
        }

        body.clipped_edges = clipped_edges(&body, projector, frame);
        body
    }
}

fn apply_seated_offset(joint: JointType, dy: &mut f32, dz: &mut f32) {
    match joint {
        JointType::KneeLeft | JointType::KneeRight => {
            *dy = -SEAT_DROP;
            *dz = -0.42;
        }
        JointType::AnkleLeft | JointType::AnkleRight => {
            *dy = -0.85;
            *dz = -0.42;
        }
        JointType::FootLeft | JointType::FootRight => {
            *dy = -0.90;
            *dz = -0.52;
        }
        _ => *dy -= SEAT_DROP,
    }
}

fn clipped_edges(body: &Body, projector: &PinholeProjector, frame: FrameSize) -> FrameEdges {
    let mut edges = FrameEdges::NONE;
    for joint in &body.joints {
        let Some(point) = projector.project(joint.position) else {
            continue;
        };
        if point.x < 0.0 {
            edges.insert(FrameEdges::LEFT);
        }
        if point.x >= frame.width as f32 {
            edges.insert(FrameEdges::RIGHT);
        }
        if point.y < 0.0 {
            edges.insert(FrameEdges::TOP);
        }
        if point.y >= frame.height as f32 {
            edges.insert(FrameEdges::BOTTOM);
        }
    }
    edges
}

/// Scripted scene played back by the simulated sensor.
#[derive(Clone, Debug, PartialEq)]
pub struct SimScript {
    pub body_count: usize,
    /// Length of the repeating cycle in ticks; zero plays the script once.
    pub cycle: u64,
    pub actors: Vec<Actor>,
}

impl SimScript {
    pub fn empty() -> Self {
        Self {
            body_count: crate::types::DEFAULT_BODY_COUNT,
            cycle: 0,
            actors: Vec::new(),
        }
    }

    pub fn with_actor(mut self, actor: Actor) -> Self {
        self.actors.push(actor);
        self
    }

    /// A seated/standing person, a swaying person who leaves the frame and
    /// loses a wrist now and then, and a late arrival.
    pub fn demo() -> Self {
        Self {
            body_count: crate::types::DEFAULT_BODY_COUNT,
            cycle: 1_800,
            actors: vec![
                Actor {
                    x: -0.6,
                    z: 2.6,
                    sway: 0.1,
                    sway_period: 240,
                    sit_period: 150,
                    hand_period: 45,
                    ..Actor::new(0, 72_057_594_037_928_001)
                },
                Actor {
                    enter: 60,
                    x: 0.5,
                    z: 2.2,
                    sway: 0.9,
                    sway_period: 300,
                    hand_period: 30,
                    flicker_joint: Some(JointType::WristLeft),
                    ..Actor::new(3, 72_057_594_037_928_002)
                },
                Actor {
                    enter: 600,
                    leave: Some(1_500),
                    x: 0.1,
                    z: 3.4,
                    sit_period: 220,
                    hand_period: 60,
                    ..Actor::new(5, 72_057_594_037_928_003)
                },
            ],
        }
    }

    fn local_tick(&self, tick: u64) -> u64 {
        if self.cycle == 0 {
            tick
        } else {
            tick % self.cycle
        }
    }

    fn active_actor(&self, tick: u64, tracking_id: TrackingId) -> Option<&Actor> {
        let t = self.local_tick(tick);
        self.actors
            .iter()
            .find(|a| a.tracking_id == tracking_id && a.slot < self.body_count && a.is_active(t))
    }

    pub fn bodies_at(
        &self,
        tick: u64,
        projector: &PinholeProjector,
        frame: FrameSize,
    ) -> Vec<Body> {
        let t = self.local_tick(tick);
        let mut bodies = vec![Body::default(); self.body_count];
        for actor in &self.actors {
            if actor.slot < self.body_count && actor.is_active(t) {
                bodies[actor.slot] = actor.body_at(t, projector, frame);
            }
        }
        bodies
    }

    /// Seated result for the body with `tracking_id`, if it is in view.
    pub fn seated_result(
        &self,
        tick: u64,
        tracking_id: TrackingId,
    ) -> Option<DiscreteGestureResult> {
        let t = self.local_tick(tick);
        self.active_actor(tick, tracking_id)
            .map(|actor| actor.seated_result(t))
    }
}
