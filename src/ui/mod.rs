use std::sync::Arc;

use gpui::{
    AnyElement, App, AppContext, Context, IntoElement, ObjectFit, ParentElement, Render,
    RenderImage, Styled, StyledImage, Subscription, TitlebarOptions, Window, WindowOptions, div,
    img, px,
};
use gpui_component::{ActiveTheme, Root, h_flex, v_flex};
use image::{Frame as ImageFrame, ImageBuffer, Rgba};

use crate::{
    app::{ActivationArgs, KinectApp},
    config::AppConfig,
    pipeline::canvas::{Canvas, RasterCanvas},
    sim::{SimDriver, SimPlatform},
};

mod main_view;
mod render_util;

const RESULT_PANEL_WIDTH: f32 = 280.0;

pub fn launch_ui(app: &mut App, config: AppConfig, platform: SimPlatform) -> gpui::Result<()> {
    let window_options = WindowOptions {
        titlebar: Some(TitlebarOptions {
            title: Some("Seated Gesture Body Viewer".into()),
            appears_transparent: false,
            traffic_light_position: None,
        }),
        ..Default::default()
    };

    app.open_window(window_options, move |window, app| {
        let view = app.new(|cx| AppView::new(config, platform, window, cx));
        app.new(|cx| Root::new(view, window, cx))
    })?;

    Ok(())
}

/// Stops the sensor driver, then releases the reader, the detectors and the
/// sensor.
fn shutdown<C: Canvas>(driver: &mut Option<SimDriver>, kinect: &mut KinectApp<C>) {
    if let Some(driver) = driver.take() {
        driver.stop();
    }
    kinect.unload();
}

struct AppView {
    driver: Option<SimDriver>,
    kinect: KinectApp<RasterCanvas>,
    activation_error: Option<String>,
    latest_image: Option<Arc<RenderImage>>,
    rendered_frames: u64,
    _subscriptions: Vec<Subscription>,
}

impl AppView {
    fn new(
        config: AppConfig,
        platform: SimPlatform,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) -> Self {
        let driver = platform.start_driver();
        let mut kinect = KinectApp::new(config, Box::new(platform), |size| {
            RasterCanvas::new(size.width, size.height)
        });

        let activation_error = match kinect.activate(ActivationArgs::launch()) {
            Ok(()) => None,
            Err(err) => {
                log::error!("failed to activate: {err}");
                Some(err.to_string())
            }
        };

        let subscriptions = vec![
            cx.observe_window_activation(window, |this, window, _| {
                if !window.is_window_active() {
                    this.kinect.suspend();
                } else if let Err(err) = this.kinect.activate(ActivationArgs::resumed()) {
                    log::error!("failed to resume: {err}");
                }
            }),
            cx.on_app_quit(|this, _| {
                log::info!("quitting; releasing sensor resources");
                shutdown(&mut this.driver, &mut this.kinect);
                async {}
            }),
        ];

        Self {
            driver: Some(driver),
            kinect,
            activation_error,
            latest_image: None,
            rendered_frames: 0,
            _subscriptions: subscriptions,
        }
    }
}

impl Render for AppView {
    fn render(
        &mut self,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) -> impl gpui::IntoElement {
        cx.defer_in(window, |_, _, cx| {
            cx.notify();
        });

        self.kinect.pump();
        self.render_main(window, cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        pipeline::canvas::RecordingCanvas,
        sim::{Actor, SimScript},
    };

    #[test]
    fn test_shutdown_stops_driver_then_releases_once() {
        let platform = SimPlatform::new(SimScript::empty().with_actor(Actor::new(0, 5)));
        let mut driver = Some(platform.start_driver());
        let mut kinect = KinectApp::new(AppConfig::default(), Box::new(platform.clone()), |size| {
            RecordingCanvas::new(size.width, size.height)
        });
        kinect.activate(ActivationArgs::launch()).unwrap();

        shutdown(&mut driver, &mut kinect);
        assert!(driver.is_none());
        let ticks = platform.tick();
        std::thread::sleep(std::time::Duration::from_millis(100));
        assert_eq!(platform.tick(), ticks);

        let counters = platform.counters();
        assert_eq!(counters.body_readers_closed, 1);
        assert_eq!(counters.gesture_readers_closed, 6);
        assert_eq!(counters.gesture_sources_closed, 6);
        assert_eq!(counters.sensor_closes, 1);

        shutdown(&mut driver, &mut kinect);
        drop(kinect);
        assert_eq!(platform.counters().sensor_closes, 1);
        assert_eq!(platform.counters().body_readers_closed, 1);
    }
}
