//! Coordinate transforms between screen space and canvas space.
//!
//! All functions are pure and operate on a given [`Viewport`] value. Screen points are relative
//! to the canvas widget's top-left corner.

use crate::constants::{MAX_ZOOM, MIN_ZOOM};
use crate::types::{EditorSettings, Viewport};
use eframe::egui;

/// Clamps a zoom factor into `[MIN_ZOOM, MAX_ZOOM]`.
pub fn clamp_zoom(zoom: f32) -> f32 {
    zoom.clamp(MIN_ZOOM, MAX_ZOOM)
}

/// Converts a screen-space point to canvas space.
pub fn screen_to_canvas(screen_point: egui::Pos2, viewport: &Viewport) -> egui::Pos2 {
    ((screen_point - viewport.offset()).to_vec2() / viewport.zoom).to_pos2()
}

/// Converts a canvas-space point to screen space.
pub fn canvas_to_screen(canvas_point: egui::Pos2, viewport: &Viewport) -> egui::Pos2 {
    (canvas_point.to_vec2() * viewport.zoom + viewport.offset()).to_pos2()
}

/// Zooms by `zoom_delta` while keeping the canvas point under `screen_anchor` fixed on screen.
///
/// # Arguments
///
/// * `viewport` - The viewport before zooming
/// * `screen_anchor` - Screen point that must keep showing the same canvas point
/// * `zoom_delta` - Amount added to the current zoom before clamping
///
/// # Returns
///
/// The new viewport. Unchanged if the clamped zoom equals the current zoom.
pub fn zoom_at(viewport: &Viewport, screen_anchor: egui::Pos2, zoom_delta: f32) -> Viewport {
    let new_zoom = clamp_zoom(viewport.zoom + zoom_delta);
    if new_zoom == viewport.zoom {
        return *viewport;
    }

    let canvas_anchor = screen_to_canvas(screen_anchor, viewport);
    Viewport {
        x: screen_anchor.x - canvas_anchor.x * new_zoom,
        y: screen_anchor.y - canvas_anchor.y * new_zoom,
        zoom: new_zoom,
    }
}

/// Rounds each coordinate to the nearest multiple of `grid_size`.
///
/// Identity when `grid_size` is not positive.
pub fn snap(point: egui::Pos2, grid_size: f32) -> egui::Pos2 {
    if !(grid_size > 0.0) {
        return point;
    }
    egui::pos2(
        (point.x / grid_size).round() * grid_size,
        (point.y / grid_size).round() * grid_size,
    )
}

/// Applies [`snap`] only when the editor settings ask for it.
pub fn snap_with(point: egui::Pos2, settings: &EditorSettings) -> egui::Pos2 {
    if settings.snap_to_grid {
        snap(point, settings.grid_size as f32)
    } else {
        point
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: egui::Pos2, b: egui::Pos2) -> bool {
        (a.x - b.x).abs() < 1e-3 && (a.y - b.y).abs() < 1e-3
    }

    #[test]
    fn test_screen_canvas_inverse() {
        let viewport = Viewport {
            x: 40.0,
            y: -25.0,
            zoom: 1.5,
        };
        let canvas = egui::pos2(120.0, 80.0);

        let screen = canvas_to_screen(canvas, &viewport);
        assert_eq!(screen, egui::pos2(220.0, 95.0));
        assert!(approx_eq(screen_to_canvas(screen, &viewport), canvas));
    }

    #[test]
    fn test_zoom_at_preserves_anchor() {
        let anchors = [
            egui::pos2(0.0, 0.0),
            egui::pos2(300.0, 200.0),
            egui::pos2(-50.0, 410.0),
        ];
        let deltas = [0.05, -0.3, 1.0, -5.0, 10.0];
        let before = Viewport {
            x: 17.0,
            y: -33.0,
            zoom: 1.2,
        };

        for anchor in anchors {
            for delta in deltas {
                let after = zoom_at(&before, anchor, delta);
                assert!(
                    approx_eq(
                        screen_to_canvas(anchor, &before),
                        screen_to_canvas(anchor, &after)
                    ),
                    "anchor {anchor:?} moved for delta {delta}"
                );
                assert!(after.zoom >= MIN_ZOOM && after.zoom <= MAX_ZOOM);
            }
        }
    }

    #[test]
    fn test_zoom_at_clamps() {
        let viewport = Viewport::default();
        assert_eq!(zoom_at(&viewport, egui::Pos2::ZERO, 10.0).zoom, MAX_ZOOM);
        assert_eq!(zoom_at(&viewport, egui::Pos2::ZERO, -10.0).zoom, MIN_ZOOM);
    }

    #[test]
    fn test_snap_rounds_to_nearest_multiple() {
        assert_eq!(snap(egui::pos2(13.0, 27.0), 20.0), egui::pos2(20.0, 20.0));
        assert_eq!(snap(egui::pos2(-9.0, 31.0), 20.0), egui::pos2(0.0, 40.0));
    }

    #[test]
    fn test_snap_is_idempotent() {
        let points = [
            egui::pos2(13.0, 27.0),
            egui::pos2(-47.3, 0.2),
            egui::pos2(999.9, -1234.5),
        ];
        for grid in [1.0, 7.0, 20.0, 64.0] {
            for p in points {
                let once = snap(p, grid);
                assert_eq!(snap(once, grid), once);
            }
        }
    }

    #[test]
    fn test_snap_identity_for_non_positive_grid() {
        let p = egui::pos2(13.0, 27.0);
        assert_eq!(snap(p, 0.0), p);
        assert_eq!(snap(p, -5.0), p);
    }

    #[test]
    fn test_snap_with_respects_settings() {
        let p = egui::pos2(13.0, 27.0);
        let mut settings = EditorSettings::default();
        assert_eq!(snap_with(p, &settings), p);

        settings.snap_to_grid = true;
        settings.grid_size = 20;
        assert_eq!(snap_with(p, &settings), egui::pos2(20.0, 20.0));

        settings.grid_size = 0;
        assert_eq!(snap_with(p, &settings), p);
    }
}
