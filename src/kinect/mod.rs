//! Boundary to the sensor runtime, the gesture runtime and the joint
//! projection helper. Nothing here tracks bodies or classifies gestures; the
//! traits describe what the application consumes from those services.

mod frame;

use std::{collections::HashMap, path::Path};

use crossbeam_channel::Receiver;
use thiserror::Error;

use crate::types::{
    Body, DiscreteGestureResult, FrameSize, Gesture, JOINT_COUNT, Joint, Point2, TrackingId,
};

pub use frame::{FramePool, FrameReference};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KinectError {
    #[error("kinect sensor cannot be null")]
    MissingSensor,
}

pub type Result<T> = std::result::Result<T, KinectError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AvailabilityChangedEventArgs {
    pub is_available: bool,
}

#[derive(Debug)]
pub struct BodyFrameArrivedEventArgs {
    pub frame_reference: FrameReference<BodyFrame>,
}

#[derive(Debug)]
pub struct GestureFrameArrivedEventArgs {
    pub frame_reference: FrameReference<GestureFrame>,
}

#[derive(Clone, Debug, Default)]
pub struct BodyFrame {
    pub bodies: Vec<Body>,
}

impl BodyFrame {
    /// Copies the frame's bodies into the caller's slots without reallocating
    /// them. Slots the frame does not describe are reset to untracked.
    pub fn get_and_refresh_body_data(&self, bodies: &mut [Body]) {
        for (index, slot) in bodies.iter_mut().enumerate() {
            match self.bodies.get(index) {
                Some(body) => slot.clone_from(body),
                None => *slot = Body::default(),
            }
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct GestureFrame {
    pub tracking_id: TrackingId,
    /// Gestures registered on the producing source, in registration order.
    pub source_gestures: Vec<Gesture>,
    pub discrete_gesture_results: Option<HashMap<String, DiscreteGestureResult>>,
}

impl GestureFrame {
    pub fn discrete_result(&self, gesture: &Gesture) -> Option<DiscreteGestureResult> {
        self.discrete_gesture_results
            .as_ref()?
            .get(&gesture.name)
            .copied()
    }
}

/// The depth sensor. One instance exists per process.
pub trait Sensor {
    fn is_available(&self) -> bool;
    fn open(&mut self);
    fn close(&mut self);
    /// Maximum number of bodies tracked at once.
    fn body_count(&self) -> usize;
    fn depth_frame_size(&self) -> FrameSize;
    fn availability_changed(&self) -> Receiver<AvailabilityChangedEventArgs>;
    fn open_body_reader(&mut self) -> Box<dyn BodyFrameReader>;
}

pub trait BodyFrameReader {
    fn frame_arrived(&self) -> Receiver<BodyFrameArrivedEventArgs>;
    fn close(&mut self);
}

pub trait GestureRuntime {
    fn create_source(
        &self,
        sensor: &dyn Sensor,
        initial_tracking_id: TrackingId,
    ) -> Box<dyn GestureFrameSource>;

    /// Returns `None` when no database exists at `path`.
    fn load_database(&self, path: &Path) -> Option<Box<dyn GestureDatabase>>;
}

pub trait GestureDatabase {
    fn available_gestures(&self) -> Vec<Gesture>;
    fn close(&mut self);
}

pub trait GestureFrameSource {
    fn tracking_id(&self) -> TrackingId;
    fn set_tracking_id(&mut self, tracking_id: TrackingId);
    fn add_gesture(&mut self, gesture: Gesture);
    fn gestures(&self) -> Vec<Gesture>;
    fn open_reader(&mut self) -> Box<dyn GestureFrameReader>;
    fn close(&mut self);
}

pub trait GestureFrameReader {
    fn is_paused(&self) -> bool;
    fn set_paused(&mut self, paused: bool);
    fn frame_arrived(&self) -> Receiver<GestureFrameArrivedEventArgs>;
    fn close(&mut self);
}

/// Maps a body's joints onto the depth image.
pub trait JointProjector {
    /// Writes one point per joint. Returns `false` when the joints could not
    /// be mapped; `points` is unspecified in that case.
    fn process_joint_locations(
        &self,
        joints: &[Joint; JOINT_COUNT],
        points: &mut [Point2; JOINT_COUNT],
    ) -> bool;
}

/// Entry point to the runtime services the application needs.
pub trait Platform {
    /// The process-wide sensor, if one is installed.
    fn default_sensor(&mut self) -> Option<Box<dyn Sensor>>;
    fn gesture_runtime(&self) -> Box<dyn GestureRuntime>;
    fn joint_projector(&self) -> Box<dyn JointProjector>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TrackingState;

    #[test]
    fn test_refresh_overwrites_slots_in_place() {
        let mut tracked = Body::default();
        tracked.tracking_id = 42;
        tracked.is_tracked = true;
        tracked.joints[0].tracking_state = TrackingState::Tracked;
        let frame = BodyFrame {
            bodies: vec![Body::default(), tracked.clone()],
        };

        let mut slots = vec![Body::default(); 3];
        slots[2].is_tracked = true;
        let before = slots.as_ptr();
        frame.get_and_refresh_body_data(&mut slots);

        assert_eq!(slots.as_ptr(), before);
        assert!(!slots[0].is_tracked);
        assert_eq!(slots[1], tracked);
        assert!(!slots[2].is_tracked);
    }

    #[test]
    fn test_discrete_result_lookup() {
        let seated = Gesture::discrete("Seated");
        let mut results = HashMap::new();
        results.insert(
            "Seated".to_string(),
            DiscreteGestureResult {
                detected: true,
                confidence: 0.5,
            },
        );
        let frame = GestureFrame {
            tracking_id: 1,
            source_gestures: vec![seated.clone()],
            discrete_gesture_results: Some(results),
        };

        assert!(frame.discrete_result(&seated).unwrap().detected);
        assert!(frame.discrete_result(&Gesture::discrete("Standing")).is_none());
        assert!(GestureFrame::default().discrete_result(&seated).is_none());
    }

    #[test]
    fn test_missing_sensor_message() {
        assert_eq!(
            KinectError::MissingSensor.to_string(),
            "kinect sensor cannot be null"
        );
    }
}
