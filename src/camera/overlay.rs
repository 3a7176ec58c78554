use crate::errors::AppError;
use opencv::core::{self as opencv_core, Point, Rect, Scalar};
use opencv::prelude::*;
use opencv::{highgui, imgproc};

pub const RETICLE_SIZE: i32 = 260;
const STROKE_WIDTH: i32 = 3;
const CROSSHAIR_ARM: i32 = 18;
const PANEL_ORIGIN: (i32, i32) = (14, 14);
const PANEL_SIZE: (i32, i32) = (560, 92);
const BADGE_MAX_WIDTH: i32 = 340;
const BADGE_HEIGHT: i32 = 26;

/// Fixed-size guide rectangle, centered on the live frame, expressed in the
/// frame's native pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reticle {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Reticle {
    pub fn centered(width: i32, height: i32) -> Self {
        let x1 = (width as f64 / 2.0 - RETICLE_SIZE as f64 / 2.0).round() as i32;
        let y1 = (height as f64 / 2.0 - RETICLE_SIZE as f64 / 2.0).round() as i32;
        Reticle { x1, y1, x2: x1 + RETICLE_SIZE, y2: y1 + RETICLE_SIZE }
    }

    pub fn center(&self) -> (i32, i32) {
        ((self.x1 + self.x2) / 2, (self.y1 + self.y2) / 2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeColor {
    Success,
    Warning,
    Info,
}

impl BadgeColor {
    // Colors are BGR, matching the guide/box strokes below.
    fn scalar(self) -> Scalar {
        match self {
            BadgeColor::Success => Scalar::new(120.0, 255.0, 0.0, 0.0),
            BadgeColor::Warning => Scalar::new(0.0, 200.0, 255.0, 0.0),
            BadgeColor::Info => Scalar::new(255.0, 200.0, 0.0, 0.0),
        }
    }
}

/// Caption block drawn over the live frame. Purely display state,
/// last-write-wins.
#[derive(Debug, Clone)]
pub struct OverlayAnnotation {
    pub title: String,
    pub subtitle: String,
    pub badge: Option<String>,
    pub badge_color: BadgeColor,
}

/// Paints the live frame plus reticle, detection box and caption panel.
/// When `preview` is set the composited frame is also shown in a highgui
/// window.
pub struct OverlayRenderer {
    preview: bool,
    window_name: &'static str,
}

impl OverlayRenderer {
    pub fn new(preview: bool) -> Self {
        OverlayRenderer { preview, window_name: "invcam" }
    }

    pub fn render(
        &self,
        frame: &opencv_core::Mat,
        reticle: Option<&Reticle>,
        bbox: Option<&[f64; 4]>,
        annotation: Option<&OverlayAnnotation>,
    ) -> Result<opencv_core::Mat, AppError> {
        let mut canvas = frame.clone();

        if let Some(reticle) = reticle {
            let guide = Scalar::new(120.0, 255.0, 0.0, 0.0); // green
            let rect = Rect::new(reticle.x1, reticle.y1, reticle.x2 - reticle.x1, reticle.y2 - reticle.y1);
            imgproc::rectangle(&mut canvas, rect, guide, STROKE_WIDTH, imgproc::LINE_8, 0)?;
            let (cx, cy) = reticle.center();
            imgproc::line(&mut canvas, Point::new(cx - CROSSHAIR_ARM, cy), Point::new(cx + CROSSHAIR_ARM, cy), guide, STROKE_WIDTH, imgproc::LINE_8, 0)?;
            imgproc::line(&mut canvas, Point::new(cx, cy - CROSSHAIR_ARM), Point::new(cx, cy + CROSSHAIR_ARM), guide, STROKE_WIDTH, imgproc::LINE_8, 0)?;
        }

        if let Some(b) = bbox {
            let detected = Scalar::new(255.0, 200.0, 0.0, 0.0); // cyan, distinct from the guide
            let rect = Rect::new(b[0] as i32, b[1] as i32, (b[2] - b[0]) as i32, (b[3] - b[1]) as i32);
            imgproc::rectangle(&mut canvas, rect, detected, STROKE_WIDTH, imgproc::LINE_8, 0)?;
        }

        if let Some(annotation) = annotation {
            self.draw_caption(&mut canvas, annotation)?;
        }

        Ok(canvas)
    }

    fn draw_caption(&self, canvas: &mut opencv_core::Mat, annotation: &OverlayAnnotation) -> Result<(), AppError> {
        let (px, py) = PANEL_ORIGIN;
        let (pw, ph) = PANEL_SIZE;
        let panel = Rect::new(px, py, pw, ph);
        imgproc::rectangle(canvas, panel, Scalar::new(20.0, 20.0, 20.0, 0.0), imgproc::FILLED, imgproc::LINE_8, 0)?;

        let white = Scalar::new(255.0, 255.0, 255.0, 0.0);
        imgproc::put_text(canvas, &annotation.title, Point::new(px + 10, py + 30),
            imgproc::FONT_HERSHEY_SIMPLEX, 0.62, white, 2, imgproc::LINE_AA, false)?;
        imgproc::put_text(canvas, &annotation.subtitle, Point::new(px + 10, py + 56),
            imgproc::FONT_HERSHEY_SIMPLEX, 0.48, white, 1, imgproc::LINE_AA, false)?;

        if let Some(badge) = &annotation.badge {
            let chip_width = badge_chip_width(badge);
            let chip = Rect::new(px + 10, py + 64, chip_width, BADGE_HEIGHT);
            imgproc::rectangle(canvas, chip, annotation.badge_color.scalar(), imgproc::FILLED, imgproc::LINE_8, 0)?;
            imgproc::put_text(canvas, badge, Point::new(px + 18, py + 83),
                imgproc::FONT_HERSHEY_SIMPLEX, 0.48, Scalar::new(0.0, 0.0, 0.0, 0.0), 1, imgproc::LINE_AA, false)?;
        }
        Ok(())
    }

    pub fn present(&self, canvas: &opencv_core::Mat) -> Result<(), AppError> {
        if !self.preview {
            return Ok(());
        }
        highgui::imshow(self.window_name, canvas)?;
        highgui::wait_key(1)?;
        Ok(())
    }

    pub fn close(&self) {
        if self.preview {
            let _ = highgui::destroy_window(self.window_name);
        }
    }
}

/// Badge chips are sized to their text, capped at a maximum width.
pub fn badge_chip_width(badge: &str) -> i32 {
    let text_len = badge.chars().count() as i32;
    (12 * text_len + 26).min(BADGE_MAX_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reticle_is_centered_for_720p() {
        let r = Reticle::centered(1280, 720);
        assert_eq!((r.x1, r.y1, r.x2, r.y2), (510, 190, 770, 450));
        assert_eq!(r.center(), (640, 320));
    }

    #[test]
    fn reticle_rounds_on_odd_dimensions() {
        let r = Reticle::centered(641, 481);
        // 641/2 - 130 = 190.5 rounds to 191; 481/2 - 130 = 110.5 rounds to 111
        assert_eq!((r.x1, r.y1), (191, 111));
        assert_eq!(r.x2 - r.x1, RETICLE_SIZE);
        assert_eq!(r.y2 - r.y1, RETICLE_SIZE);
    }

    #[test]
    fn badge_chips_are_capped() {
        assert_eq!(badge_chip_width("OK"), 50);
        assert_eq!(badge_chip_width(&"x".repeat(100)), 340);
    }
}
