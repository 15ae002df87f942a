use super::render_util::canvas_to_image;
use super::{
    ActiveTheme, AnyElement, AppView, Arc, Context, IntoElement, ObjectFit, ParentElement,
    RESULT_PANEL_WIDTH, RenderImage, Styled, StyledImage, Window, div, h_flex, img, px, v_flex,
};
use crate::{app::STATUS_RUNNING, pipeline::canvas::Canvas};

impl AppView {
    pub(super) fn render_main(
        &mut self,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) -> AnyElement {
        let (canvas_width, canvas_height, fresh_image) = match self.kinect.body_view() {
            Some(view) => {
                let fresh = if view.frames_rendered() != self.rendered_frames {
                    self.rendered_frames = view.frames_rendered();
                    canvas_to_image(view.canvas())
                } else {
                    None
                };
                (view.canvas().width() as f32, view.canvas().height() as f32, fresh)
            }
            None => (512.0, 424.0, None),
        };
        if let Some(image) = fresh_image {
            self.replace_latest_image(image, window, cx);
        }

        let theme = cx.theme();
        let status = self.kinect.status_text().text.clone();
        let (status_icon, status_text, status_color) = if let Some(err) = &self.activation_error
        {
            ("✗", err.clone(), theme.muted_foreground)
        } else if status == STATUS_RUNNING {
            ("●", status, theme.success)
        } else if status.is_empty() {
            ("○", "Waiting for sensor...".to_string(), theme.muted_foreground)
        } else {
            ("○", status, theme.muted_foreground)
        };

        let header = h_flex()
            .justify_between()
            .items_center()
            .px_4()
            .py_2()
            .child(
                div()
                    .text_base()
                    .text_color(gpui::rgb(0xe2e8f0))
                    .child("Seated Gesture Detection"),
            )
            .child(
                div()
                    .px_2()
                    .py_0p5()
                    .rounded_md()
                    .bg(gpui::rgba(0x00000033))
                    .text_xs()
                    .text_color(status_color)
                    .child(format!("{status_icon} {status_text}")),
            );

        let frame_view: AnyElement = if let Some(image) = &self.latest_image {
            img(image.clone())
                .size_full()
                .object_fit(ObjectFit::Contain)
                .into_any_element()
        } else {
            div()
                .size_full()
                .flex()
                .items_center()
                .justify_center()
                .text_sm()
                .text_color(gpui::rgb(0x8b95a5))
                .child("Waiting for body frames...")
                .into_any_element()
        };

        let canvas_card = div()
            .w(px(canvas_width))
            .h(px(canvas_height))
            .overflow_hidden()
            .rounded_lg()
            .bg(gpui::rgb(0x000000))
            .child(frame_view);

        let mut results = v_flex()
            .gap_2()
            .p_3()
            .w(px(RESULT_PANEL_WIDTH))
            .rounded_lg()
            .bg(gpui::rgb(0x0f1419));
        for (slot, view) in self.kinect.result_views().iter().enumerate() {
            let text = view.text.clone();
            results = results.child(
                v_flex()
                    .gap_0p5()
                    .child(
                        div()
                            .text_xs()
                            .text_color(gpui::rgb(0x8b95a5))
                            .child(format!("Body {slot}")),
                    )
                    .child(
                        div()
                            .text_sm()
                            .text_color(gpui::rgb(0xe2e8f0))
                            .child(text),
                    ),
            );
        }

        v_flex()
            .size_full()
            .bg(gpui::rgb(0x1a2332))
            .child(header)
            .child(
                h_flex()
                    .flex_1()
                    .gap_3()
                    .p_4()
                    .items_start()
                    .child(canvas_card)
                    .child(results),
            )
            .into_any_element()
    }

    fn replace_latest_image(
        &mut self,
        new_image: Arc<RenderImage>,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) {
        if let Some(old_image) = self.latest_image.replace(new_image) {
            // Explicitly drop the previous GPU texture; otherwise the sprite atlas keeps
            // every frame and memory will climb while the sensor is running.
            cx.drop_image(old_image, Some(window));
        }
    }
}
