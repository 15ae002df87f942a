//! Scripted stand-in for the sensor and gesture runtimes. It plays back a
//! [`SimScript`] through the same traits a hardware backend implements.

mod projector;
mod script;

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use crossbeam_channel::{Receiver, Sender, bounded};

use crate::{
    kinect::{
        AvailabilityChangedEventArgs, BodyFrame, BodyFrameArrivedEventArgs, BodyFrameReader,
        FramePool, FrameReference, GestureDatabase, GestureFrame, GestureFrameArrivedEventArgs,
        GestureFrameReader, GestureFrameSource, GestureRuntime, JointProjector, Platform, Sensor,
    },
    types::{FrameSize, Gesture, INVALID_TRACKING_ID, TrackingId},
};

pub use projector::{DEPTH_FRAME_SIZE, PinholeProjector};
pub use script::SimScript;
#[cfg(test)]
pub use script::Actor;

pub const DEFAULT_DATABASE_PATH: &str = "Database/Seated.gbd";

const SENSOR_FPS: u64 = 30;
const FRAME_INTERVAL: Duration = Duration::from_millis(1_000 / SENSOR_FPS);
const BODY_FRAME_POOL: usize = 2;
const GESTURE_FRAME_POOL: usize = 8;
const FRAME_QUEUE_DEPTH: usize = 2;

/// How often each resource was opened or closed.
#[cfg(test)]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SimCounters {
    pub sensor_opens: usize,
    pub sensor_closes: usize,
    pub body_readers_opened: usize,
    pub body_readers_closed: usize,
    pub gesture_sources_created: usize,
    pub gesture_sources_closed: usize,
    pub gesture_readers_closed: usize,
    pub databases_loaded: usize,
    pub databases_closed: usize,
    pub body_frames_sent: usize,
    pub gesture_frames_sent: usize,
}

struct BodyReaderEntry {
    sender: Sender<BodyFrameArrivedEventArgs>,
    closed: bool,
}

struct GestureReaderEntry {
    sender: Sender<GestureFrameArrivedEventArgs>,
    paused: bool,
    closed: bool,
}

struct GestureSourceEntry {
    tracking_id: TrackingId,
    gestures: Vec<Gesture>,
    reader: Option<GestureReaderEntry>,
    closed: bool,
}

struct SimState {
    script: SimScript,
    projector: PinholeProjector,
    tick: u64,
    has_sensor: bool,
    connected: bool,
    open: bool,
    body_pool: Arc<FramePool>,
    gesture_pool: Arc<FramePool>,
    availability_subscribers: Vec<Sender<AvailabilityChangedEventArgs>>,
    body_readers: Vec<BodyReaderEntry>,
    gesture_sources: Vec<GestureSourceEntry>,
    databases: HashMap<PathBuf, Vec<Gesture>>,
    #[cfg(test)]
    counters: SimCounters,
}

impl SimState {
    fn is_available(&self) -> bool {
        self.open && self.connected
    }

    fn notify_availability(&mut self, was_available: bool) {
        let is_available = self.is_available();
        if was_available == is_available {
            return;
        }
        log::info!("simulated sensor availability changed: {is_available}");
        self.availability_subscribers
            .retain(|tx| tx.send(AvailabilityChangedEventArgs { is_available }).is_ok());
    }

    fn publish_body_frames(&mut self) {
        let bodies = self
            .script
            .bodies_at(self.tick, &self.projector, DEPTH_FRAME_SIZE);
        let pool = self.body_pool.clone();
        let mut sent = 0;

        for reader in self.body_readers.iter().filter(|r| !r.closed) {
            let args = BodyFrameArrivedEventArgs {
                frame_reference: FrameReference::new(
                    BodyFrame {
                        bodies: bodies.clone(),
                    },
                    pool.clone(),
                ),
            };
            // Frames expire when the consumer falls behind.
            if reader.sender.try_send(args).is_ok() {
                sent += 1;
            }
        }
        log::trace!("published {sent} body frames");
        #[cfg(test)]
        {
            self.counters.body_frames_sent += sent;
        }
    }

    fn publish_gesture_frames(&mut self) {
        let pool = self.gesture_pool.clone();
        let mut sent = 0;

        for source in self.gesture_sources.iter().filter(|s| !s.closed) {
            if source.tracking_id == INVALID_TRACKING_ID {
                continue;
            }
            let Some(reader) = source.reader.as_ref().filter(|r| !r.closed && !r.paused) else {
                continue;
            };
            let Some(result) = self.script.seated_result(self.tick, source.tracking_id) else {
                continue;
            };

            let results = source
                .gestures
                .iter()
                .map(|gesture| (gesture.name.clone(), result))
                .collect::<HashMap<_, _>>();
            let frame = GestureFrame {
                tracking_id: source.tracking_id,
                source_gestures: source.gestures.clone(),
                discrete_gesture_results: Some(results),
            };
            let args = GestureFrameArrivedEventArgs {
                frame_reference: FrameReference::new(frame, pool.clone()),
            };
            if reader.sender.try_send(args).is_ok() {
                sent += 1;
            }
        }
        log::trace!("published {sent} gesture frames");
        #[cfg(test)]
        {
            self.counters.gesture_frames_sent += sent;
        }
    }
}

#[derive(Clone)]
pub struct SimPlatform {
    shared: Arc<Mutex<SimState>>,
}

impl SimPlatform {
    /// A connected sensor playing `script`, with the seated gesture database
    /// registered at [`DEFAULT_DATABASE_PATH`].
    pub fn new(script: SimScript) -> Self {
        let platform = Self {
            shared: Arc::new(Mutex::new(SimState {
                script,
                projector: PinholeProjector::kinect_depth(),
                tick: 0,
                has_sensor: true,
                connected: true,
                open: false,
                body_pool: FramePool::new(BODY_FRAME_POOL),
                gesture_pool: FramePool::new(GESTURE_FRAME_POOL),
                availability_subscribers: Vec::new(),
                body_readers: Vec::new(),
                gesture_sources: Vec::new(),
                databases: HashMap::new(),
                #[cfg(test)]
                counters: SimCounters::default(),
            })),
        };
        platform.register_database(DEFAULT_DATABASE_PATH, &["Seated"]);
        platform
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register_database(&self, path: impl Into<PathBuf>, gesture_names: &[&str]) {
        let gestures = gesture_names
            .iter()
            .map(|name| Gesture::discrete(*name))
            .collect();
        self.lock().databases.insert(path.into(), gestures);
    }

    /// Advances the script by one frame and publishes the resulting frames.
    pub fn step(&self) {
        let mut state = self.lock();
        if !state.open {
            return;
        }
        state.tick += 1;
        state.publish_body_frames();
        state.publish_gesture_frames();
    }

    pub fn start_driver(&self) -> SimDriver {
        SimDriver::start(self.clone())
    }
}

#[cfg(test)]
impl SimPlatform {
    /// A platform where no sensor is installed.
    pub fn without_sensor() -> Self {
        let platform = Self::new(SimScript::empty());
        platform.lock().has_sensor = false;
        platform
    }

    pub fn remove_database(&self, path: &Path) {
        self.lock().databases.remove(path);
    }

    /// Plugs or unplugs the simulated device.
    pub fn set_connected(&self, connected: bool) {
        let mut state = self.lock();
        let was_available = state.is_available();
        state.connected = connected;
        state.notify_availability(was_available);
    }

    /// Publishes a body frame that has already expired.
    pub fn publish_expired_body_frame(&self) {
        let state = self.lock();
        for reader in state.body_readers.iter().filter(|r| !r.closed) {
            let _ = reader.sender.try_send(BodyFrameArrivedEventArgs {
                frame_reference: FrameReference::expired(state.body_pool.clone()),
            });
        }
    }

    pub fn tick(&self) -> u64 {
        self.lock().tick
    }

    pub fn counters(&self) -> SimCounters {
        self.lock().counters.clone()
    }

    /// Frames acquired by consumers and not yet released.
    pub fn outstanding_frames(&self) -> usize {
        let state = self.lock();
        state.body_pool.outstanding() + state.gesture_pool.outstanding()
    }

    /// Tracking ids currently bound to the gesture sources, in creation order.
    pub fn gesture_source_tracking_ids(&self) -> Vec<TrackingId> {
        self.lock()
            .gesture_sources
            .iter()
            .map(|s| s.tracking_id)
            .collect()
    }
}

impl Platform for SimPlatform {
    fn default_sensor(&mut self) -> Option<Box<dyn Sensor>> {
        if !self.lock().has_sensor {
            return None;
        }
        Some(Box::new(SimSensor {
            shared: self.clone(),
        }))
    }

    fn gesture_runtime(&self) -> Box<dyn GestureRuntime> {
        Box::new(SimGestureRuntime {
            shared: self.clone(),
        })
    }

    fn joint_projector(&self) -> Box<dyn JointProjector> {
        Box::new(self.lock().projector)
    }
}

pub struct SimSensor {
    shared: SimPlatform,
}

impl Sensor for SimSensor {
    fn is_available(&self) -> bool {
        self.shared.lock().is_available()
    }

    fn open(&mut self) {
        let mut state = self.shared.lock();
        #[cfg(test)]
        {
            state.counters.sensor_opens += 1;
        }
        let was_available = state.is_available();
        state.open = true;
        state.notify_availability(was_available);
    }

    fn close(&mut self) {
        let mut state = self.shared.lock();
        #[cfg(test)]
        {
            state.counters.sensor_closes += 1;
        }
        let was_available = state.is_available();
        state.open = false;
        state.notify_availability(was_available);
    }

    fn body_count(&self) -> usize {
        self.shared.lock().script.body_count
    }

    fn depth_frame_size(&self) -> FrameSize {
        DEPTH_FRAME_SIZE
    }

    fn availability_changed(&self) -> Receiver<AvailabilityChangedEventArgs> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.shared.lock().availability_subscribers.push(tx);
        rx
    }

    fn open_body_reader(&mut self) -> Box<dyn BodyFrameReader> {
        let (tx, rx) = bounded(FRAME_QUEUE_DEPTH);
        let mut state = self.shared.lock();
        state.body_readers.push(BodyReaderEntry {
            sender: tx,
            closed: false,
        });
        #[cfg(test)]
        {
            state.counters.body_readers_opened += 1;
        }
        Box::new(SimBodyFrameReader {
            shared: self.shared.clone(),
            index: state.body_readers.len() - 1,
            frames: rx,
        })
    }
}

pub struct SimBodyFrameReader {
    shared: SimPlatform,
    index: usize,
    frames: Receiver<BodyFrameArrivedEventArgs>,
}

impl BodyFrameReader for SimBodyFrameReader {
    fn frame_arrived(&self) -> Receiver<BodyFrameArrivedEventArgs> {
        self.frames.clone()
    }

    fn close(&mut self) {
        let mut state = self.shared.lock();
        #[cfg(test)]
        {
            state.counters.body_readers_closed += 1;
        }
        if let Some(entry) = state.body_readers.get_mut(self.index) {
            entry.closed = true;
        }
    }
}

pub struct SimGestureRuntime {
    shared: SimPlatform,
}

impl GestureRuntime for SimGestureRuntime {
    fn create_source(
        &self,
        _sensor: &dyn Sensor,
        initial_tracking_id: TrackingId,
    ) -> Box<dyn GestureFrameSource> {
        let mut state = self.shared.lock();
        state.gesture_sources.push(GestureSourceEntry {
            tracking_id: initial_tracking_id,
            gestures: Vec::new(),
            reader: None,
            closed: false,
        });
        #[cfg(test)]
        {
            state.counters.gesture_sources_created += 1;
        }
        Box::new(SimGestureFrameSource {
            shared: self.shared.clone(),
            index: state.gesture_sources.len() - 1,
        })
    }

    fn load_database(&self, path: &Path) -> Option<Box<dyn GestureDatabase>> {
        let gestures = self.shared.lock().databases.get(path)?.clone();
        log::debug!("loaded gesture database {}", path.display());
        #[cfg(test)]
        {
            self.shared.lock().counters.databases_loaded += 1;
        }
        Some(Box::new(SimGestureDatabase {
            #[cfg(test)]
            shared: self.shared.clone(),
            gestures,
        }))
    }
}

pub struct SimGestureDatabase {
    #[cfg(test)]
    shared: SimPlatform,
    gestures: Vec<Gesture>,
}

impl GestureDatabase for SimGestureDatabase {
    fn available_gestures(&self) -> Vec<Gesture> {
        self.gestures.clone()
    }

    fn close(&mut self) {
        log::trace!("gesture database closed");
        #[cfg(test)]
        {
            self.shared.lock().counters.databases_closed += 1;
        }
    }
}

pub struct SimGestureFrameSource {
    shared: SimPlatform,
    index: usize,
}

impl SimGestureFrameSource {
    fn with_entry<R>(&self, f: impl FnOnce(&mut GestureSourceEntry) -> R) -> Option<R> {
        self.shared.lock().gesture_sources.get_mut(self.index).map(f)
    }
}

impl GestureFrameSource for SimGestureFrameSource {
    fn tracking_id(&self) -> TrackingId {
        self.with_entry(|e| e.tracking_id)
            .unwrap_or(INVALID_TRACKING_ID)
    }

    fn set_tracking_id(&mut self, tracking_id: TrackingId) {
        self.with_entry(|e| e.tracking_id = tracking_id);
    }

    fn add_gesture(&mut self, gesture: Gesture) {
        self.with_entry(|e| e.gestures.push(gesture));
    }

    fn gestures(&self) -> Vec<Gesture> {
        self.with_entry(|e| e.gestures.clone()).unwrap_or_default()
    }

    fn open_reader(&mut self) -> Box<dyn GestureFrameReader> {
        let (tx, rx) = bounded(FRAME_QUEUE_DEPTH);
        self.with_entry(|e| {
            e.reader = Some(GestureReaderEntry {
                sender: tx,
                paused: false,
                closed: false,
            })
        });
        Box::new(SimGestureFrameReader {
            shared: self.shared.clone(),
            index: self.index,
            frames: rx,
        })
    }

    fn close(&mut self) {
        let mut state = self.shared.lock();
        #[cfg(test)]
        {
            state.counters.gesture_sources_closed += 1;
        }
        if let Some(entry) = state.gesture_sources.get_mut(self.index) {
            entry.closed = true;
        }
    }
}

pub struct SimGestureFrameReader {
    shared: SimPlatform,
    index: usize,
    frames: Receiver<GestureFrameArrivedEventArgs>,
}

impl SimGestureFrameReader {
    fn with_reader<R>(&self, f: impl FnOnce(&mut GestureReaderEntry) -> R) -> Option<R> {
        self.shared
            .lock()
            .gesture_sources
            .get_mut(self.index)
            .and_then(|e| e.reader.as_mut())
            .map(f)
    }
}

impl GestureFrameReader for SimGestureFrameReader {
    fn is_paused(&self) -> bool {
        self.with_reader(|r| r.paused).unwrap_or(true)
    }

    fn set_paused(&mut self, paused: bool) {
        self.with_reader(|r| r.paused = paused);
    }

    fn frame_arrived(&self) -> Receiver<GestureFrameArrivedEventArgs> {
        self.frames.clone()
    }

    fn close(&mut self) {
        #[cfg(test)]
        {
            self.shared.lock().counters.gesture_readers_closed += 1;
        }
        self.with_reader(|r| r.closed = true);
    }
}

/// Background thread ticking the simulated sensor at its frame rate.
#[derive(Debug)]
pub struct SimDriver {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl SimDriver {
    fn start(platform: SimPlatform) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();

        let handle = thread::spawn(move || {
            log::info!("simulated sensor driver running at {SENSOR_FPS} fps");
            while !stop_flag.load(Ordering::Relaxed) {
                platform.step();
                thread::sleep(FRAME_INTERVAL);
            }
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    pub fn stop(mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SimDriver {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
