use crossbeam_channel::Receiver;

use crate::{
    config::AppConfig,
    detector::GestureDetector,
    kinect::{
        AvailabilityChangedEventArgs, BodyFrameArrivedEventArgs, BodyFrameReader,
        GestureFrameArrivedEventArgs, KinectError, Platform, Result, Sensor,
    },
    pipeline::{canvas::Canvas, skeleton::BodyView},
    types::{FrameSize, INVALID_TRACKING_ID, TextElement},
};

pub const STATUS_RUNNING: &str = "Running";
pub const STATUS_NOT_AVAILABLE: &str = "Kinect not available!";
pub const STATUS_ELEMENT_ID: &str = "statustext";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivationKind {
    Launch,
    Other,
}

/// State the previous instance was left in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionState {
    NotRunning,
    Suspended,
    /// Only hosts that restore killed instances report this.
    #[allow(dead_code)]
    Terminated,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActivationArgs {
    pub kind: ActivationKind,
    pub previous_execution_state: ExecutionState,
}

impl ActivationArgs {
    pub fn launch() -> Self {
        Self {
            kind: ActivationKind::Launch,
            previous_execution_state: ExecutionState::NotRunning,
        }
    }

    /// Returning to a suspended instance.
    pub fn resumed() -> Self {
        Self {
            kind: ActivationKind::Other,
            previous_execution_state: ExecutionState::Suspended,
        }
    }
}

/// One event from any of the streams the application listens to.
#[derive(Debug)]
pub enum AppEvent {
    AvailabilityChanged(AvailabilityChangedEventArgs),
    BodyFrameArrived(BodyFrameArrivedEventArgs),
    GestureFrameArrived {
        slot: usize,
        args: GestureFrameArrivedEventArgs,
    },
}

pub fn result_view_id(slot: usize) -> String {
    format!("seatedResult_{slot}")
}

/// Owns the sensor, the body view and one gesture detector per body slot, and
/// routes sensor events to them.
pub struct KinectApp<C: Canvas> {
    config: AppConfig,
    platform: Box<dyn Platform>,
    make_canvas: Option<Box<dyn FnOnce(FrameSize) -> C>>,
    sensor: Option<Box<dyn Sensor>>,
    body_reader: Option<Box<dyn BodyFrameReader>>,
    availability: Option<Receiver<AvailabilityChangedEventArgs>>,
    body_frames: Option<Receiver<BodyFrameArrivedEventArgs>>,
    body_view: Option<BodyView<C>>,
    detectors: Vec<GestureDetector>,
    result_views: Vec<TextElement>,
    status_text: TextElement,
    activated: bool,
    unloaded: bool,
}

impl<C: Canvas> KinectApp<C> {
    pub fn new<F>(config: AppConfig, platform: Box<dyn Platform>, make_canvas: F) -> Self
    where
        F: FnOnce(FrameSize) -> C + 'static,
    {
        Self {
            config,
            platform,
            make_canvas: Some(Box::new(make_canvas)),
            sensor: None,
            body_reader: None,
            availability: None,
            body_frames: None,
            body_view: None,
            detectors: Vec::new(),
            result_views: Vec::new(),
            status_text: TextElement::new(STATUS_ELEMENT_ID),
            activated: false,
            unloaded: false,
        }
    }

    /// Sets everything up on a fresh launch. Resuming a terminated instance
    /// and activating twice do nothing.
    pub fn activate(&mut self, args: ActivationArgs) -> Result<()> {
        if args.kind != ActivationKind::Launch {
            return Ok(());
        }
        if args.previous_execution_state == ExecutionState::Terminated {
            log::info!("reactivated after termination; nothing to restore");
            return Ok(());
        }
        if self.activated || self.unloaded {
            return Ok(());
        }

        let mut sensor = self
            .platform
            .default_sensor()
            .ok_or(KinectError::MissingSensor)?;

        self.availability = Some(sensor.availability_changed());
        let body_reader = sensor.open_body_reader();
        self.body_frames = Some(body_reader.frame_arrived());
        self.body_reader = Some(body_reader);

        let body_count = sensor.body_count();
        let Some(make_canvas) = self.make_canvas.take() else {
            log::warn!("body view canvas already consumed; skipping activation");
            return Ok(());
        };
        self.body_view = Some(BodyView::new(
            Some(sensor.as_ref()),
            make_canvas,
            self.platform.joint_projector(),
            self.config.style.clone(),
        )?);

        let runtime = self.platform.gesture_runtime();
        let detector_config = &self.config.detector;
        self.detectors = (0..body_count)
            .map(|_| GestureDetector::new(Some(sensor.as_ref()), runtime.as_ref(), detector_config))
            .collect::<Result<_>>()?;
        self.result_views = self
            .detectors
            .iter()
            .enumerate()
            .map(|(slot, detector)| {
                let mut view = TextElement::new(result_view_id(slot));
                detector.update_result_view(&mut view);
                view
            })
            .collect();

        sensor.open();
        log::info!("sensor opened with capacity for {body_count} bodies");
        self.sensor = Some(sensor);
        self.activated = true;
        Ok(())
    }

    /// No state survives suspension.
    pub fn suspend(&mut self) {
        log::debug!("suspending; nothing to save");
    }

    /// Releases the frame reader, every detector and the sensor, once.
    pub fn unload(&mut self) {
        if self.unloaded {
            return;
        }
        self.unloaded = true;

        if let Some(mut reader) = self.body_reader.take() {
            reader.close();
        }
        for detector in &mut self.detectors {
            detector.close();
        }
        if let Some(mut sensor) = self.sensor.take() {
            sensor.close();
        }
        self.availability = None;
        self.body_frames = None;
        log::info!("sensor resources released");
    }

    /// Collects every event that is ready, without blocking.
    pub fn pending_events(&self) -> Vec<AppEvent> {
        let mut events = Vec::new();
        if let Some(rx) = &self.availability {
            events.extend(rx.try_iter().map(AppEvent::AvailabilityChanged));
        }
        if let Some(rx) = &self.body_frames {
            events.extend(rx.try_iter().map(AppEvent::BodyFrameArrived));
        }
        for (slot, detector) in self.detectors.iter().enumerate() {
            if detector.is_closed() {
                continue;
            }
            events.extend(
                detector
                    .frame_arrived()
                    .try_iter()
                    .map(|args| AppEvent::GestureFrameArrived { slot, args }),
            );
        }
        events
    }

    /// Handles every ready event in turn. Returns how many were handled.
    pub fn pump(&mut self) -> usize {
        let events = self.pending_events();
        let handled = events.len();
        for event in events {
            self.dispatch(event);
        }
        handled
    }

    pub fn dispatch(&mut self, event: AppEvent) {
        match event {
            AppEvent::AvailabilityChanged(args) => self.on_availability_changed(args),
            AppEvent::BodyFrameArrived(args) => self.on_body_frame_arrived(args),
            AppEvent::GestureFrameArrived { slot, args } => {
                if let Some(detector) = self.detectors.get_mut(slot) {
                    detector.on_gesture_frame_arrived(args);
                }
            }
        }
    }

    fn on_availability_changed(&mut self, args: AvailabilityChangedEventArgs) {
        let text = if args.is_available {
            STATUS_RUNNING
        } else {
            STATUS_NOT_AVAILABLE
        };
        self.status_text.set_text(text);
    }

    fn on_body_frame_arrived(&mut self, args: BodyFrameArrivedEventArgs) {
        let Some(body_view) = self.body_view.as_mut() else {
            return;
        };

        let data_received = match args.frame_reference.acquire_frame() {
            Some(frame) => {
                frame.get_and_refresh_body_data(body_view.bodies_mut());
                true
            }
            None => false,
        };
        if !data_received {
            log::trace!("body frame expired before it could be acquired");
            return;
        }

        if let Err(err) = body_view.update_body_frame(self.sensor.as_deref()) {
            log::error!("failed to draw body frame: {err}");
            return;
        }

        for (index, detector) in self.detectors.iter_mut().enumerate() {
            let Some(body) = body_view.bodies().get(index) else {
                break;
            };

            if body.is_tracked {
                detector.set_tracking_id(body.tracking_id);
                detector.set_paused(false);
            } else {
                detector.set_tracking_id(INVALID_TRACKING_ID);
                detector.set_paused(true);
            }

            if let Some(view) = self.result_views.get_mut(index) {
                detector.update_result_view(view);
            }
        }
    }

    pub fn is_activated(&self) -> bool {
        self.activated
    }

    pub fn status_text(&self) -> &TextElement {
        &self.status_text
    }

    pub fn result_views(&self) -> &[TextElement] {
        &self.result_views
    }

    pub fn detectors(&self) -> &[GestureDetector] {
        &self.detectors
    }

    pub fn body_view(&self) -> Option<&BodyView<C>> {
        self.body_view.as_ref()
    }
}

impl<C: Canvas> Drop for KinectApp<C> {
    fn drop(&mut self) {
        if self.activated {
            self.unload();
        }
    }
}
