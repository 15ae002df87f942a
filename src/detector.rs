use crossbeam_channel::Receiver;

use crate::{
    config::DetectorConfig,
    kinect::{
        GestureFrameArrivedEventArgs, GestureFrameReader, GestureFrameSource, GestureRuntime,
        KinectError, Result, Sensor,
    },
    types::{DiscreteGestureResult, INVALID_TRACKING_ID, TextElement, TrackingId},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectorState {
    Unbound,
    Bound(TrackingId),
}

/// Text shown for one body slot.
pub fn gesture_result_text(tracking_id: TrackingId, is_seated: bool, confidence: f32) -> String {
    if tracking_id == INVALID_TRACKING_ID {
        "(Not Tracked)".to_string()
    } else if is_seated {
        format!("Seated: True Confidence: {confidence}")
    } else {
        "Seated: False".to_string()
    }
}

/// Follows one body slot and keeps the latest seated result for the body
/// bound to it.
pub struct GestureDetector {
    source: Box<dyn GestureFrameSource>,
    reader: Box<dyn GestureFrameReader>,
    frames: Receiver<GestureFrameArrivedEventArgs>,
    is_seated: bool,
    confidence: f32,
    closed: bool,
}

impl GestureDetector {
    pub fn new(
        sensor: Option<&dyn Sensor>,
        runtime: &dyn GestureRuntime,
        config: &DetectorConfig,
    ) -> Result<Self> {
        let sensor = sensor.ok_or(KinectError::MissingSensor)?;

        let mut source = runtime.create_source(sensor, INVALID_TRACKING_ID);
        let mut reader = source.open_reader();
        reader.set_paused(true);
        let frames = reader.frame_arrived();

        match runtime.load_database(&config.gesture_database) {
            Some(mut database) => {
                for gesture in database.available_gestures() {
                    if gesture.name == config.gesture_name {
                        source.add_gesture(gesture);
                    }
                }
                database.close();
            }
            None => log::warn!(
                "gesture database {} not found; detector stays idle",
                config.gesture_database.display()
            ),
        }

        if source.gestures().is_empty() {
            log::warn!(
                "gesture {:?} not available; detector stays idle",
                config.gesture_name
            );
        }

        Ok(Self {
            source,
            reader,
            frames,
            is_seated: false,
            confidence: 0.0,
            closed: false,
        })
    }

    pub fn tracking_id(&self) -> TrackingId {
        self.source.tracking_id()
    }

    /// The tracking id changes whenever a body enters or leaves the slot.
    pub fn set_tracking_id(&mut self, tracking_id: TrackingId) {
        if self.source.tracking_id() != tracking_id {
            log::debug!("gesture detector tracking id -> {tracking_id}");
            self.source.set_tracking_id(tracking_id);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.reader.is_paused()
    }

    /// Should be paused whenever the tracking id is invalid.
    pub fn set_paused(&mut self, paused: bool) {
        if self.reader.is_paused() != paused {
            self.reader.set_paused(paused);
        }
    }

    pub fn is_seated(&self) -> bool {
        self.is_seated
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn state(&self) -> DetectorState {
        match self.tracking_id() {
            INVALID_TRACKING_ID => DetectorState::Unbound,
            id => DetectorState::Bound(id),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Stream of gesture frames for this detector.
    pub fn frame_arrived(&self) -> &Receiver<GestureFrameArrivedEventArgs> {
        &self.frames
    }

    /// Stores the seated result carried by the frame, if any.
    pub fn on_gesture_frame_arrived(
        &mut self,
        args: GestureFrameArrivedEventArgs,
    ) -> Option<DiscreteGestureResult> {
        let frame = args.frame_reference.acquire_frame()?;
        log::trace!("gesture frame for body {}", frame.tracking_id);
        let gesture = frame.source_gestures.first()?;
        let result = frame.discrete_result(gesture)?;

        self.is_seated = result.detected;
        self.confidence = result.confidence;
        Some(result)
    }

    pub fn result_text(&self) -> String {
        gesture_result_text(self.tracking_id(), self.is_seated, self.confidence)
    }

    pub fn update_result_view(&self, view: &mut TextElement) {
        view.set_text(self.result_text());
    }

    /// Releases the reader and the source. Later calls do nothing.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.reader.close();
        self.source.close();
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        kinect::{FramePool, FrameReference, GestureFrame, Platform},
        sim::{Actor, SimPlatform, SimScript},
        types::Gesture,
    };
    use proptest::prelude::*;
    use std::{collections::HashMap, path::Path};

    fn detector_on(platform: &mut SimPlatform, config: &DetectorConfig) -> GestureDetector {
        let sensor = platform.default_sensor().unwrap();
        let runtime = platform.gesture_runtime();
        GestureDetector::new(Some(sensor.as_ref()), runtime.as_ref(), config).unwrap()
    }

    fn seated_frame(detected: bool, confidence: f32) -> GestureFrameArrivedEventArgs {
        let mut results = HashMap::new();
        results.insert(
            "Seated".to_string(),
            DiscreteGestureResult {
                detected,
                confidence,
            },
        );
        GestureFrameArrivedEventArgs {
            frame_reference: FrameReference::new(
                GestureFrame {
                    tracking_id: 1,
                    source_gestures: vec![Gesture::discrete("Seated")],
                    discrete_gesture_results: Some(results),
                },
                FramePool::new(1),
            ),
        }
    }

    #[test]
    fn test_text_not_tracked() {
        assert_eq!(gesture_result_text(0, true, 0.9), "(Not Tracked)");
    }

    #[test]
    fn test_text_seated_with_confidence() {
        assert_eq!(
            gesture_result_text(5, true, 0.82),
            "Seated: True Confidence: 0.82"
        );
    }

    #[test]
    fn test_text_not_seated() {
        assert_eq!(gesture_result_text(5, false, 0.82), "Seated: False");
    }

    #[test]
    fn test_missing_sensor_rejected() {
        let platform = SimPlatform::new(SimScript::empty());
        let runtime = platform.gesture_runtime();
        let result = GestureDetector::new(None, runtime.as_ref(), &DetectorConfig::default());
        assert_eq!(
            result.err().map(|e| e.to_string()),
            Some("kinect sensor cannot be null".to_string())
        );
    }

    #[test]
    fn test_new_detector_is_unbound_and_paused() {
        let mut platform = SimPlatform::new(SimScript::empty());
        let detector = detector_on(&mut platform, &DetectorConfig::default());

        assert_eq!(detector.state(), DetectorState::Unbound);
        assert!(detector.is_paused());
        assert!(!detector.is_seated());
        assert_eq!(detector.confidence(), 0.0);
        assert_eq!(detector.result_text(), "(Not Tracked)");

        let counters = platform.counters();
        assert_eq!(counters.databases_loaded, 1);
        assert_eq!(counters.databases_closed, 1);
    }

    #[test]
    fn test_bind_and_unbind() {
        let mut platform = SimPlatform::new(SimScript::empty());
        let mut detector = detector_on(&mut platform, &DetectorConfig::default());

        detector.set_tracking_id(42);
        detector.set_paused(false);
        assert_eq!(detector.state(), DetectorState::Bound(42));
        assert!(!detector.is_paused());
        assert_eq!(platform.gesture_source_tracking_ids(), vec![42]);

        detector.set_tracking_id(0);
        detector.set_paused(true);
        assert_eq!(detector.state(), DetectorState::Unbound);
        assert!(detector.is_paused());
    }

    #[test]
    fn test_gesture_frame_updates_state() {
        let mut platform = SimPlatform::new(SimScript::empty());
        let mut detector = detector_on(&mut platform, &DetectorConfig::default());
        detector.set_tracking_id(3);

        let result = detector.on_gesture_frame_arrived(seated_frame(true, 0.82));
        assert_eq!(
            result,
            Some(DiscreteGestureResult {
                detected: true,
                confidence: 0.82
            })
        );
        assert_eq!(detector.result_text(), "Seated: True Confidence: 0.82");

        detector.on_gesture_frame_arrived(seated_frame(false, 0.1));
        assert_eq!(detector.result_text(), "Seated: False");
    }

    #[test]
    fn test_frame_without_results_keeps_state() {
        let mut platform = SimPlatform::new(SimScript::empty());
        let mut detector = detector_on(&mut platform, &DetectorConfig::default());
        detector.on_gesture_frame_arrived(seated_frame(true, 0.7));

        let pool = FramePool::new(1);
        let empty = GestureFrameArrivedEventArgs {
            frame_reference: FrameReference::new(GestureFrame::default(), pool.clone()),
        };
        assert!(detector.on_gesture_frame_arrived(empty).is_none());
        assert_eq!(pool.outstanding(), 0);

        let expired = GestureFrameArrivedEventArgs {
            frame_reference: FrameReference::expired(pool.clone()),
        };
        assert!(detector.on_gesture_frame_arrived(expired).is_none());

        assert!(detector.is_seated());
        assert_eq!(detector.confidence(), 0.7);
    }

    #[test]
    fn test_missing_database_leaves_detector_idle() {
        let mut platform = SimPlatform::new(SimScript::empty().with_actor(Actor {
            sit_period: 1,
            ..Actor::new(0, 8)
        }));
        platform.remove_database(Path::new(crate::sim::DEFAULT_DATABASE_PATH));
        let mut detector = detector_on(&mut platform, &DetectorConfig::default());

        let mut sensor = platform.default_sensor().unwrap();
        sensor.open();
        detector.set_tracking_id(8);
        detector.set_paused(false);
        platform.step();
        platform.step();

        let frames: Vec<_> = detector.frame_arrived().try_iter().collect();
        assert!(!frames.is_empty());
        for args in frames {
            assert!(detector.on_gesture_frame_arrived(args).is_none());
        }
        assert!(!detector.is_seated());
        assert_eq!(platform.counters().databases_loaded, 0);
    }

    #[test]
    fn test_only_named_gesture_registered() {
        let mut platform = SimPlatform::new(SimScript::empty());
        platform.register_database(
            crate::sim::DEFAULT_DATABASE_PATH,
            &["Standing", "SeatedLeaning", "Seated"],
        );
        let detector = detector_on(&mut platform, &DetectorConfig::default());
        assert_eq!(detector.source.gestures(), vec![Gesture::discrete("Seated")]);
    }

    #[test]
    fn test_close_releases_once() {
        let mut platform = SimPlatform::new(SimScript::empty());
        let mut detector = detector_on(&mut platform, &DetectorConfig::default());
        detector.close();
        detector.close();

        assert!(detector.is_closed());
        let counters = platform.counters();
        assert_eq!(counters.gesture_readers_closed, 1);
        assert_eq!(counters.gesture_sources_closed, 1);
    }

    proptest! {
        #[test]
        fn prop_untracked_text_ignores_gesture(
            seated in any::<bool>(),
            confidence in 0.0f32..=1.0,
        ) {
            prop_assert_eq!(gesture_result_text(0, seated, confidence), "(Not Tracked)");
        }

        #[test]
        fn prop_tracked_text(id in 1u64.., seated in any::<bool>(), confidence in 0.0f32..=1.0) {
            let text = gesture_result_text(id, seated, confidence);
            if seated {
                prop_assert_eq!(text, format!("Seated: True Confidence: {confidence}"));
            } else {
                prop_assert_eq!(text, "Seated: False");
            }
        }
    }
}
