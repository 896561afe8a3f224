//! Canvas painting: grid, edges, the edge preview, and nodes with their anchors.
//!
//! Geometry comes from the frame's [`HitMap`] in canvas space and is projected through the
//! flow viewport, then offset by the canvas widget's screen position.

use super::canvas::{HitMap, NodeHit};
use super::state::FlowEditorApp;
use crate::constants::{ANCHOR_RADIUS, NODE_TITLE_SIZE};
use crate::types::{Edge, LineType, Node, Viewport};
use crate::viewport::canvas_to_screen;
use eframe::egui;
use eframe::epaint::{CubicBezierShape, StrokeKind};

const SELECTED: egui::Color32 = egui::Color32::from_rgb(100, 150, 255);

/// Maps canvas points to absolute screen points for one frame.
#[derive(Clone, Copy)]
struct Projection {
    viewport: Viewport,
    origin: egui::Vec2,
}

impl Projection {
    fn point(&self, canvas_point: egui::Pos2) -> egui::Pos2 {
        canvas_to_screen(canvas_point, &self.viewport) + self.origin
    }

    fn rect(&self, canvas_rect: egui::Rect) -> egui::Rect {
        egui::Rect::from_min_max(self.point(canvas_rect.min), self.point(canvas_rect.max))
    }

    fn scale(&self, length: f32) -> f32 {
        length * self.viewport.zoom
    }
}

impl FlowEditorApp {
    /// Paints the whole canvas in layers: grid, edges, edge preview, nodes.
    pub fn render_canvas(&self, painter: &egui::Painter, canvas_rect: egui::Rect, hits: &HitMap) {
        let projection = Projection {
            viewport: *self.store.viewport(),
            origin: canvas_rect.min.to_vec2(),
        };
        let painter = painter.with_clip_rect(canvas_rect);

        if self.store.editor_settings().show_grid {
            draw_grid(&painter, canvas_rect, projection, self.store.editor_settings().grid_size);
        }

        let selected_edge = self.store.state().selected_edge_id;
        for edge in self.store.edges() {
            if let Some((start, end)) = hits.edge_endpoints(self.store.state(), edge.id) {
                draw_edge(
                    &painter,
                    projection,
                    edge,
                    projection.point(start),
                    projection.point(end),
                    selected_edge == Some(edge.id),
                );
            }
        }

        if let Some(preview) = self.nodes.preview_line() {
            let start = projection.point(preview.start);
            let end = projection.point(preview.end);
            painter.line_segment([start, end], egui::Stroke::new(2.0, SELECTED));
            painter.circle_filled(end, 4.0, SELECTED);
        }

        let selected_node = self.store.state().selected_node_id;
        let dragging = self.nodes.dragging_node();
        for (node, hit) in self.store.nodes().iter().zip(hits.nodes()) {
            let highlight = if dragging == Some(node.id) {
                Some(egui::Color32::from_rgb(255, 165, 0))
            } else if selected_node == Some(node.id) {
                Some(egui::Color32::YELLOW)
            } else {
                None
            };
            self.draw_node(&painter, projection, node, hit, highlight);
        }
    }

    fn draw_node(
        &self,
        painter: &egui::Painter,
        projection: Projection,
        node: &Node,
        hit: &NodeHit,
        highlight: Option<egui::Color32>,
    ) {
        let rect = projection.rect(hit.rect);
        let radius = projection.scale(5.0);
        let definition = self.store.registry().get(&node.node_type);
        let is_container = definition.is_some_and(|def| def.is_container);

        let fill = category_color(definition.map(|def| def.category.as_str()).unwrap_or_default());
        painter.rect_filled(rect, radius, fill);
        let (stroke_color, stroke_width) = match highlight {
            Some(color) => (color, 3.0),
            None => (egui::Color32::BLACK, 1.5),
        };
        let stroke = egui::Stroke::new(stroke_width, stroke_color);
        painter.rect_stroke(rect, radius, stroke, StrokeKind::Outside);
        // Flows get a second, inner frame
        if is_container {
            painter.rect_stroke(
                rect.shrink(projection.scale(4.0)),
                radius,
                egui::Stroke::new(1.0, stroke_color),
                StrokeKind::Inside,
            );
        }

        let font_size = projection.scale(NODE_TITLE_SIZE).clamp(6.0, 32.0);
        painter.text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            &node.label,
            egui::FontId::proportional(font_size),
            egui::Color32::BLACK,
        );

        let anchor_radius = projection.scale(ANCHOR_RADIUS);
        for anchor in &hit.inputs {
            painter.circle_filled(projection.point(anchor.center), anchor_radius, egui::Color32::DARK_GRAY);
        }
        for anchor in &hit.outputs {
            let center = projection.point(anchor.center);
            painter.circle_filled(center, anchor_radius, egui::Color32::DARK_GREEN);
            if projection.viewport.zoom >= 0.6 {
                painter.text(
                    center + egui::vec2(anchor_radius + 2.0, 0.0),
                    egui::Align2::LEFT_CENTER,
                    &anchor.label,
                    egui::FontId::proportional(projection.scale(10.0)),
                    egui::Color32::GRAY,
                );
            }
        }
    }
}

fn category_color(category: &str) -> egui::Color32 {
    match category {
        "Core" => egui::Color32::from_rgb(165, 214, 167),
        "Flow Control" => egui::Color32::from_rgb(144, 202, 249),
        _ => egui::Color32::LIGHT_GRAY,
    }
}

fn draw_grid(painter: &egui::Painter, canvas_rect: egui::Rect, projection: Projection, grid_size: u32) {
    let spacing = projection.scale(grid_size as f32);
    // Too dense to read
    if spacing < 4.0 {
        return;
    }
    let stroke = egui::Stroke::new(1.0, egui::Color32::from_rgba_unmultiplied(128, 128, 128, 32));
    let origin = projection.point(egui::Pos2::ZERO);

    let mut x = canvas_rect.min.x + (origin.x - canvas_rect.min.x).rem_euclid(spacing);
    while x <= canvas_rect.max.x {
        painter.line_segment(
            [egui::pos2(x, canvas_rect.min.y), egui::pos2(x, canvas_rect.max.y)],
            stroke,
        );
        x += spacing;
    }
    let mut y = canvas_rect.min.y + (origin.y - canvas_rect.min.y).rem_euclid(spacing);
    while y <= canvas_rect.max.y {
        painter.line_segment(
            [egui::pos2(canvas_rect.min.x, y), egui::pos2(canvas_rect.max.x, y)],
            stroke,
        );
        y += spacing;
    }
}

fn draw_edge(
    painter: &egui::Painter,
    projection: Projection,
    edge: &Edge,
    start: egui::Pos2,
    end: egui::Pos2,
    is_selected: bool,
) {
    let (color, width) = if is_selected {
        (SELECTED, 3.0)
    } else {
        (egui::Color32::DARK_GRAY, 2.0)
    };
    let stroke = egui::Stroke::new(width, color);

    match edge.line_type {
        LineType::Straight => {
            painter.line_segment([start, end], stroke);
        }
        LineType::Step => {
            let mid_x = (start.x + end.x) / 2.0;
            painter.add(egui::Shape::line(
                vec![start, egui::pos2(mid_x, start.y), egui::pos2(mid_x, end.y), end],
                stroke,
            ));
        }
        LineType::Bezier => {
            let pull = ((end.x - start.x).abs() / 2.0).max(projection.scale(40.0));
            painter.add(CubicBezierShape::from_points_stroke(
                [start, start + egui::vec2(pull, 0.0), end - egui::vec2(pull, 0.0), end],
                false,
                egui::Color32::TRANSPARENT,
                stroke,
            ));
        }
    }

    if edge.animated {
        let time = painter.ctx().input(|i| i.time);
        let t = (time * 0.5).fract() as f32;
        painter.circle_filled(start + (end - start) * t, projection.scale(3.0), color);
        painter.ctx().request_repaint();
    }

    if !edge.label.is_empty() {
        let middle = start + (end - start) * 0.5;
        painter.text(
            middle - egui::vec2(0.0, 4.0),
            egui::Align2::CENTER_BOTTOM,
            &edge.label,
            egui::FontId::proportional(projection.scale(11.0).clamp(6.0, 24.0)),
            color,
        );
    }
}
