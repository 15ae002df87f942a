/// Body tracking id handed out by the sensor. Zero never identifies a body.
pub type TrackingId = u64;

pub const INVALID_TRACKING_ID: TrackingId = 0;

pub const JOINT_COUNT: usize = 25;

/// Sensor capacity used when nothing better is known.
pub const DEFAULT_BODY_COUNT: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JointType {
    SpineBase,
    SpineMid,
    Neck,
    Head,
    ShoulderLeft,
    ElbowLeft,
    WristLeft,
    HandLeft,
    ShoulderRight,
    ElbowRight,
    WristRight,
    HandRight,
    HipLeft,
    KneeLeft,
    AnkleLeft,
    FootLeft,
    HipRight,
    KneeRight,
    AnkleRight,
    FootRight,
    SpineShoulder,
    HandTipLeft,
    ThumbLeft,
    HandTipRight,
    ThumbRight,
}

impl JointType {
    pub const ALL: [JointType; JOINT_COUNT] = [
        JointType::SpineBase,
        JointType::SpineMid,
        JointType::Neck,
        JointType::Head,
        JointType::ShoulderLeft,
        JointType::ElbowLeft,
        JointType::WristLeft,
        JointType::HandLeft,
        JointType::ShoulderRight,
        JointType::ElbowRight,
        JointType::WristRight,
        JointType::HandRight,
        JointType::HipLeft,
        JointType::KneeLeft,
        JointType::AnkleLeft,
        JointType::FootLeft,
        JointType::HipRight,
        JointType::KneeRight,
        JointType::AnkleRight,
        JointType::FootRight,
        JointType::SpineShoulder,
        JointType::HandTipLeft,
        JointType::ThumbLeft,
        JointType::HandTipRight,
        JointType::ThumbRight,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TrackingState {
    #[default]
    NotTracked,
    Inferred,
    Tracked,
}

/// Position in camera space, in meters.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CameraSpacePoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Position on the depth image, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Joint {
    pub position: CameraSpacePoint,
    pub tracking_state: TrackingState,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HandState {
    #[default]
    Unknown,
    NotTracked,
    Open,
    Closed,
    Lasso,
}

/// Bitmask of the frame edges a body extends past.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameEdges(u8);

impl FrameEdges {
    pub const NONE: FrameEdges = FrameEdges(0);
    pub const RIGHT: FrameEdges = FrameEdges(1);
    pub const LEFT: FrameEdges = FrameEdges(2);
    pub const TOP: FrameEdges = FrameEdges(4);
    pub const BOTTOM: FrameEdges = FrameEdges(8);

    pub const fn from_bits(bits: u8) -> Self {
        FrameEdges(bits & 0x0f)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, edge: FrameEdges) -> bool {
        self.0 & edge.0 != 0
    }

    pub fn insert(&mut self, edge: FrameEdges) {
        self.0 |= edge.0;
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for FrameEdges {
    type Output = FrameEdges;

    fn bitor(self, rhs: FrameEdges) -> FrameEdges {
        FrameEdges(self.0 | rhs.0)
    }
}

/// One body slot as reported by the sensor. Slots are reused frame after frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Body {
    pub tracking_id: TrackingId,
    pub is_tracked: bool,
    pub joints: [Joint; JOINT_COUNT],
    pub hand_left_state: HandState,
    pub hand_right_state: HandState,
    pub clipped_edges: FrameEdges,
}

impl Default for Body {
    fn default() -> Self {
        Self {
            tracking_id: INVALID_TRACKING_ID,
            is_tracked: false,
            joints: [Joint::default(); JOINT_COUNT],
            hand_left_state: HandState::Unknown,
            hand_right_state: HandState::Unknown,
            clipped_edges: FrameEdges::NONE,
        }
    }
}

impl Body {
    pub fn joint(&self, joint: JointType) -> &Joint {
        &self.joints[joint.index()]
    }
}

/// Depth frame description; the canvas takes its size from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

/// Handle to a discrete gesture stored in a gesture database.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Gesture {
    pub name: String,
}

impl Gesture {
    pub fn discrete(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DiscreteGestureResult {
    pub detected: bool,
    pub confidence: f32,
}

/// Named text region on screen (status line or per-body result).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextElement {
    pub id: String,
    pub text: String,
}

impl TextElement {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: String::new(),
        }
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }
}
