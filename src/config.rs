use std::{env, path::PathBuf};

use crate::pipeline::canvas::Color;

pub const GESTURE_DATABASE_ENV: &str = "SEATED_GESTURE_DATABASE";
pub const GESTURE_NAME_ENV: &str = "SEATED_GESTURE_NAME";

const DEFAULT_GESTURE_DATABASE: &str = "Database/Seated.gbd";
const DEFAULT_GESTURE_NAME: &str = "Seated";

/// What to do with the rest of a body once a bone touches an untracked joint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UntrackedBonePolicy {
    /// Stop drawing that body's bones and joints for the frame.
    #[default]
    AbortBody,
    /// Leave out the offending bone only.
    SkipBone,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BodyViewStyle {
    pub hand_size: f32,
    pub hand_alpha: f32,
    pub tracked_bone_thickness: f32,
    pub inferred_bone_thickness: f32,
    pub joint_thickness: f32,
    pub clip_bounds_thickness: f32,
    pub hand_closed_color: Color,
    pub hand_open_color: Color,
    pub hand_lasso_color: Color,
    pub tracked_joint_color: Color,
    pub inferred_joint_color: Color,
    pub clip_bounds_color: Color,
    /// One color per body slot, reused when there are more slots than colors.
    pub body_colors: Vec<Color>,
    pub untracked_bone_policy: UntrackedBonePolicy,
}

impl Default for BodyViewStyle {
    fn default() -> Self {
        Self {
            hand_size: 20.0,
            hand_alpha: 0.75,
            tracked_bone_thickness: 4.0,
            inferred_bone_thickness: 1.0,
            joint_thickness: 3.0,
            clip_bounds_thickness: 5.0,
            hand_closed_color: Color::RED,
            hand_open_color: Color::GREEN,
            hand_lasso_color: Color::BLUE,
            tracked_joint_color: Color::GREEN,
            inferred_joint_color: Color::YELLOW,
            clip_bounds_color: Color::RED,
            body_colors: vec![
                Color::RED,
                Color::ORANGE,
                Color::GREEN,
                Color::BLUE,
                Color::INDIGO,
                Color::VIOLET,
            ],
            untracked_bone_policy: UntrackedBonePolicy::AbortBody,
        }
    }
}

impl BodyViewStyle {
    pub fn body_color(&self, slot: usize) -> Color {
        if self.body_colors.is_empty() {
            return self.tracked_joint_color;
        }
        self.body_colors[slot % self.body_colors.len()]
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DetectorConfig {
    pub gesture_database: PathBuf,
    pub gesture_name: String,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            gesture_database: PathBuf::from(DEFAULT_GESTURE_DATABASE),
            gesture_name: DEFAULT_GESTURE_NAME.to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppConfig {
    pub style: BodyViewStyle,
    pub detector: DetectorConfig,
}

impl AppConfig {
    /// Defaults, with the gesture database and gesture name overridable from
    /// the environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(path) = lookup(GESTURE_DATABASE_ENV).filter(|v| !v.trim().is_empty()) {
            config.detector.gesture_database = PathBuf::from(path);
        }
        if let Some(name) = lookup(GESTURE_NAME_ENV).filter(|v| !v.trim().is_empty()) {
            config.detector.gesture_name = name;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_style() {
        let style = BodyViewStyle::default();
        assert_eq!(style.hand_size, 20.0);
        assert_eq!(style.hand_alpha, 0.75);
        assert_eq!(style.tracked_bone_thickness, 4.0);
        assert_eq!(style.inferred_bone_thickness, 1.0);
        assert_eq!(style.clip_bounds_thickness, 5.0);
        assert_eq!(style.untracked_bone_policy, UntrackedBonePolicy::AbortBody);
    }

    #[test]
    fn test_body_color_wraps() {
        let style = BodyViewStyle::default();
        assert_eq!(style.body_color(0), Color::RED);
        assert_eq!(style.body_color(5), Color::VIOLET);
        assert_eq!(style.body_color(6), Color::RED);
    }

    #[test]
    fn test_detector_defaults() {
        let config = AppConfig::default();
        assert_eq!(
            config.detector.gesture_database,
            PathBuf::from("Database/Seated.gbd")
        );
        assert_eq!(config.detector.gesture_name, "Seated");
    }

    #[test]
    fn test_lookup_overrides() {
        let config = AppConfig::from_lookup(|key| match key {
            GESTURE_DATABASE_ENV => Some("/opt/gestures/sitting.gbd".to_string()),
            GESTURE_NAME_ENV => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(
            config.detector.gesture_database,
            PathBuf::from("/opt/gestures/sitting.gbd")
        );
        assert_eq!(config.detector.gesture_name, "Seated");
    }
}
