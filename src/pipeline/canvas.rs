use image::{Rgba, RgbaImage};

use crate::types::Point2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    // CSS named colors.
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const ORANGE: Color = Color::rgb(255, 165, 0);
    pub const GREEN: Color = Color::rgb(0, 128, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const INDIGO: Color = Color::rgb(75, 0, 130);
    pub const VIOLET: Color = Color::rgb(238, 130, 238);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
}

/// 2D drawing surface. Alpha set through `set_global_alpha` applies to every
/// later fill and stroke until changed.
pub trait Canvas {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn clear_rect(&mut self, x: f32, y: f32, width: f32, height: f32);
    fn fill_circle(&mut self, center: Point2, radius: f32, color: Color);
    fn stroke_line(&mut self, from: Point2, to: Point2, thickness: f32, color: Color);
    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color);
    fn set_global_alpha(&mut self, alpha: f32);
}

/// Lines are clipped to at most this many pixels outside the canvas.
const LINE_CLIP_MARGIN: f32 = 64.0;

/// Canvas rasterizing into an RGBA buffer. Cleared pixels are fully
/// transparent.
#[derive(Clone, Debug)]
pub struct RasterCanvas {
    image: RgbaImage,
    alpha: f32,
}

impl RasterCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
            alpha: 1.0,
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    #[cfg(test)]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        (x < self.image.width() && y < self.image.height()).then(|| self.image.get_pixel(x, y).0)
    }

    fn blend_pixel(&mut self, x: i32, y: i32, color: Color) {
        if x < 0 || y < 0 {
            return;
        }
        let (ux, uy) = (x as u32, y as u32);
        if ux >= self.image.width() || uy >= self.image.height() {
            return;
        }

        let a = self.alpha;
        let dst = self.image.get_pixel_mut(ux, uy);
        let mix = |src: u8, dst: u8| (src as f32 * a + dst as f32 * (1.0 - a)).round() as u8;
        let out_alpha = (255.0 * a + dst.0[3] as f32 * (1.0 - a)).round() as u8;
        *dst = Rgba([
            mix(color.r, dst.0[0]),
            mix(color.g, dst.0[1]),
            mix(color.b, dst.0[2]),
            out_alpha,
        ]);
    }

    /// Clips a segment to the canvas grown by `margin` on every side
    /// (Liang-Barsky). `None` when nothing of it is left or a point is not
    /// finite.
    fn clip_segment(&self, from: Point2, to: Point2, margin: f32) -> Option<(Point2, Point2)> {
        if ![from.x, from.y, to.x, to.y].iter().all(|v| v.is_finite()) {
            return None;
        }
        // f64 keeps the canvas-sized remainder of far-away endpoints.
        let margin = margin as f64;
        let (x0, y0) = (from.x as f64, from.y as f64);
        let (dx, dy) = (to.x as f64 - x0, to.y as f64 - y0);
        let (min_x, min_y) = (-margin, -margin);
        let max_x = self.image.width() as f64 + margin;
        let max_y = self.image.height() as f64 + margin;

        let (mut t0, mut t1) = (0.0f64, 1.0f64);
        for (p, q) in [
            (-dx, x0 - min_x),
            (dx, max_x - x0),
            (-dy, y0 - min_y),
            (dy, max_y - y0),
        ] {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                t0 = t0.max(r);
            } else {
                t1 = t1.min(r);
            }
            if t0 > t1 {
                return None;
            }
        }

        let at = |t: f64| {
            Point2::new(
                (x0 + t * dx).clamp(min_x, max_x) as f32,
                (y0 + t * dy).clamp(min_y, max_y) as f32,
            )
        };
        Some((at(t0), at(t1)))
    }

    fn span(start: f32, length: f32, limit: u32) -> (u32, u32) {
        let from = start.max(0.0).floor() as u32;
        let to = (start + length).max(0.0).ceil() as u32;
        (from.min(limit), to.min(limit))
    }
}

impl Canvas for RasterCanvas {
    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }

    fn clear_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        let (x0, x1) = Self::span(x, width, self.image.width());
        let (y0, y1) = Self::span(y, height, self.image.height());
        for py in y0..y1 {
            for px in x0..x1 {
                self.image.put_pixel(px, py, Rgba([0, 0, 0, 0]));
            }
        }
    }

    fn fill_circle(&mut self, center: Point2, radius: f32, color: Color) {
        let finite = center.x.is_finite() && center.y.is_finite() && radius.is_finite();
        if !finite || radius < 0.0 {
            return;
        }
        let (width, height) = (self.image.width() as f32, self.image.height() as f32);
        if center.x < -radius
            || center.y < -radius
            || center.x > width + radius
            || center.y > height + radius
        {
            return;
        }

        let (cx, cy) = (center.x.round() as i32, center.y.round() as i32);
        let radius = radius.round() as i32;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= radius * radius {
                    self.blend_pixel(cx + dx, cy + dy, color);
                }
            }
        }
    }

    fn stroke_line(&mut self, from: Point2, to: Point2, thickness: f32, color: Color) {
        let margin = thickness.max(1.0).min(LINE_CLIP_MARGIN);
        let Some((from, to)) = self.clip_segment(from, to, margin) else {
            return;
        };

        let (mut x0, mut y0) = (from.x as i32, from.y as i32);
        let (x1, y1) = (to.x as i32, to.y as i32);
        let dx = (x1 - x0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let dy = -(y1 - y0).abs();
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let radius = ((thickness.round() as i32).max(1) - 1) / 2;

        loop {
            for ox in -radius..=radius {
                for oy in -radius..=radius {
                    if ox.abs() + oy.abs() <= radius {
                        self.blend_pixel(x0 + ox, y0 + oy, color);
                    }
                }
            }
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        let (x0, x1) = Self::span(x, width, self.image.width());
        let (y0, y1) = Self::span(y, height, self.image.height());
        for py in y0..y1 {
            for px in x0..x1 {
                self.blend_pixel(px as i32, py as i32, color);
            }
        }
    }

    fn set_global_alpha(&mut self, alpha: f32) {
        self.alpha = alpha.clamp(0.0, 1.0);
    }
}

#[cfg(test)]
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    ClearRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    FillCircle {
        center: Point2,
        radius: f32,
        color: Color,
        alpha: f32,
    },
    StrokeLine {
        from: Point2,
        to: Point2,
        thickness: f32,
        color: Color,
        alpha: f32,
    },
    FillRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Color,
        alpha: f32,
    },
}

/// Canvas that keeps the draw calls instead of pixels.
#[cfg(test)]
#[derive(Clone, Debug)]
pub struct RecordingCanvas {
    width: u32,
    height: u32,
    alpha: f32,
    commands: Vec<DrawCommand>,
}

#[cfg(test)]
impl RecordingCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            alpha: 1.0,
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }
}

#[cfg(test)]
impl Canvas for RecordingCanvas {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn clear_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.commands.push(DrawCommand::ClearRect {
            x,
            y,
            width,
            height,
        });
    }

    fn fill_circle(&mut self, center: Point2, radius: f32, color: Color) {
        self.commands.push(DrawCommand::FillCircle {
            center,
            radius,
            color,
            alpha: self.alpha,
        });
    }

    fn stroke_line(&mut self, from: Point2, to: Point2, thickness: f32, color: Color) {
        self.commands.push(DrawCommand::StrokeLine {
            from,
            to,
            thickness,
            color,
            alpha: self.alpha,
        });
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        self.commands.push(DrawCommand::FillRect {
            x,
            y,
            width,
            height,
            color,
            alpha: self.alpha,
        });
    }

    fn set_global_alpha(&mut self, alpha: f32) {
        self.alpha = alpha;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_rect_is_clipped_to_canvas() {
        let mut canvas = RasterCanvas::new(10, 8);
        canvas.fill_rect(5.0, -3.0, 20.0, 5.0, Color::RED);

        assert_eq!(canvas.pixel(9, 0), Some([255, 0, 0, 255]));
        assert_eq!(canvas.pixel(9, 1), Some([255, 0, 0, 255]));
        assert_eq!(canvas.pixel(9, 2), Some([0, 0, 0, 0]));
        assert_eq!(canvas.pixel(4, 0), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_clear_rect_resets_pixels() {
        let mut canvas = RasterCanvas::new(4, 4);
        canvas.fill_rect(0.0, 0.0, 4.0, 4.0, Color::BLUE);
        canvas.clear_rect(0.0, 0.0, 4.0, 4.0);
        assert!(canvas.image().pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }

    #[test]
    fn test_global_alpha_blends_over_background() {
        let mut canvas = RasterCanvas::new(50, 50);
        canvas.fill_rect(0.0, 0.0, 50.0, 50.0, Color::BLUE);
        canvas.set_global_alpha(0.75);
        canvas.fill_circle(Point2::new(25.0, 25.0), 20.0, Color::RED);
        canvas.set_global_alpha(1.0);

        let [r, g, b, a] = canvas.pixel(25, 25).unwrap();
        assert_eq!((r, g, b, a), (191, 0, 64, 255));
        // Outside the circle the background is untouched.
        assert_eq!(canvas.pixel(0, 0), Some([0, 0, 255, 255]));
    }

    #[test]
    fn test_stroke_line_covers_endpoints() {
        let mut canvas = RasterCanvas::new(20, 20);
        canvas.stroke_line(Point2::new(2.0, 3.0), Point2::new(15.0, 12.0), 1.0, Color::GREEN);
        assert_eq!(canvas.pixel(2, 3), Some([0, 128, 0, 255]));
        assert_eq!(canvas.pixel(15, 12), Some([0, 128, 0, 255]));
        assert_eq!(canvas.pixel(15, 3), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_far_off_canvas_points_are_clipped() {
        let mut canvas = RasterCanvas::new(512, 424);
        let left = Point2::new(-3.6e11, 212.0);
        let right = Point2::new(3.6e11, 212.0);

        canvas.stroke_line(left, right, 1.0, Color::RED);
        assert_eq!(canvas.pixel(0, 212), Some([255, 0, 0, 255]));
        assert_eq!(canvas.pixel(511, 212), Some([255, 0, 0, 255]));
        assert_eq!(canvas.pixel(256, 211), Some([0, 0, 0, 0]));

        canvas.fill_circle(right, 20.0, Color::BLUE);
        canvas.fill_circle(Point2::new(3.0e9, 10.0), 20.0, Color::BLUE);
        canvas.stroke_line(
            Point2::new(-3.6e11, -5.0e11),
            Point2::new(-1.0e11, -3.0e11),
            4.0,
            Color::BLUE,
        );
        assert!(canvas.image().pixels().all(|p| p.0 != [0, 0, 255, 255]));
    }

    #[test]
    fn test_non_finite_points_draw_nothing() {
        let mut canvas = RasterCanvas::new(16, 16);
        let red = Color::RED;
        canvas.stroke_line(Point2::new(f32::NAN, 3.0), Point2::new(8.0, 8.0), 1.0, red);
        canvas.stroke_line(Point2::new(2.0, 2.0), Point2::new(f32::INFINITY, 8.0), 1.0, red);
        canvas.fill_circle(Point2::new(8.0, f32::NEG_INFINITY), 3.0, Color::RED);
        assert!(canvas.image().pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }

    #[test]
    fn test_circle_overlapping_edge_is_drawn() {
        let mut canvas = RasterCanvas::new(16, 16);
        canvas.fill_circle(Point2::new(-2.0, 8.0), 4.0, Color::GREEN);
        assert_eq!(canvas.pixel(0, 8), Some([0, 128, 0, 255]));
    }

    #[test]
    fn test_recording_canvas_captures_alpha() {
        let mut canvas = RecordingCanvas::new(8, 8);
        canvas.set_global_alpha(0.5);
        canvas.fill_circle(Point2::new(1.0, 1.0), 2.0, Color::YELLOW);
        canvas.set_global_alpha(1.0);
        canvas.fill_rect(0.0, 0.0, 1.0, 1.0, Color::RED);

        let commands = canvas.take_commands();
        assert_eq!(commands.len(), 2);
        assert!(matches!(commands[0], DrawCommand::FillCircle { alpha, .. } if alpha == 0.5));
        assert!(matches!(commands[1], DrawCommand::FillRect { alpha, .. } if alpha == 1.0));
        assert!(canvas.commands().is_empty());
    }
}
