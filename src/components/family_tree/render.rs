use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::state::TreeCanvasState;
use crate::engine::{EdgeKind, EdgeRoute, Gender, LayoutConfig, LayoutResult, NodePlacement, PersonNode};

const CORNER_RADIUS: f64 = 8.0;
const PHOTO_RADIUS: f64 = 20.0;

fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

fn gender_fill(gender: Gender) -> &'static str {
	match gender {
		Gender::Male => "#1f3b5c",
		Gender::Female => "#5c1f45",
		Gender::Unknown => "#33334d",
	}
}

pub fn render(state: &TreeCanvasState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str("#1a1a2e");
	ctx.fill_rect(0.0, 0.0, state.width, state.height);

	let Some(layout) = state.controller.layout() else {
		return;
	};
	let view = state.controller.view();
	ctx.save();
	let _ = ctx.translate(view.pan.x, view.pan.y);
	let _ = ctx.scale(view.zoom(), view.zoom());
	draw_edges(state, layout, ctx);
	draw_nodes(state, layout, ctx);
	ctx.restore();
}

fn draw_edges(state: &TreeCanvasState, layout: &LayoutResult, ctx: &CanvasRenderingContext2d) {
	let k = state.controller.view().zoom();
	let line_width = 1.5 / k;
	let (has_highlight, t) = (
		state.has_active_highlight(),
		ease_out_cubic(state.hover.highlight_t),
	);

	for route in &layout.edges {
		let is_highlighted = state.is_highlighted(&route.source) && state.is_highlighted(&route.target);

		// t=0: every edge at base alpha; t=1: highlighted edges brighten, others dim
		let (alpha, width) = if !has_highlight {
			(0.6, line_width)
		} else if is_highlighted {
			(0.6 + 0.3 * t, line_width * (1.0 + 0.3 * t))
		} else {
			(0.6 - 0.45 * t, line_width * (1.0 - 0.3 * t))
		};

		let color = match route.kind {
			EdgeKind::Parent { .. } => format!("rgba(100, 180, 255, {alpha})"),
			EdgeKind::Spouse { .. } => format!("rgba(255, 190, 120, {alpha})"),
		};
		ctx.set_stroke_style_str(&color);
		ctx.set_line_width(width);
		if route.bends_around_unit {
			let _ = ctx.set_line_dash(&js_sys::Array::of2(
				&JsValue::from_f64(6.0 / k),
				&JsValue::from_f64(4.0 / k),
			));
		}
		trace_route(route, ctx);
		ctx.stroke();
		let _ = ctx.set_line_dash(&js_sys::Array::new());
	}
}

fn trace_route(route: &EdgeRoute, ctx: &CanvasRenderingContext2d) {
	let (start, end) = (route.start, route.end);
	ctx.begin_path();
	ctx.move_to(start.x, start.y);
	// Parent links always take the elbow through the channel; spouses only when blocked
	if route.bends_around_unit || matches!(route.kind, EdgeKind::Parent { .. }) {
		ctx.line_to(start.x, route.channel_y);
		ctx.line_to(end.x, route.channel_y);
	}
	ctx.line_to(end.x, end.y);
}

fn draw_nodes(state: &TreeCanvasState, layout: &LayoutResult, ctx: &CanvasRenderingContext2d) {
	let Some(graph) = state.controller.graph() else {
		return;
	};
	let view = state.controller.view();
	let config = state.controller.config();
	let (has_highlight, t) = (
		state.has_active_highlight(),
		ease_out_cubic(state.hover.highlight_t),
	);

	for (id, placement) in &layout.nodes {
		let Some(node) = graph.node_by_id(id) else {
			continue;
		};
		let alpha = if has_highlight && !state.is_highlighted(id) {
			1.0 - 0.7 * t
		} else {
			1.0
		};
		let selected = view.selected.as_deref() == Some(id.as_str());

		ctx.set_global_alpha(alpha);
		draw_box(ctx, placement, config, node, selected, state.is_hovered(id) && t > 0.01);
		if view.show_photos {
			draw_photo_badge(ctx, placement, config, node);
		}
		draw_label(ctx, placement, config, node, view.show_photos);
		ctx.set_global_alpha(1.0);
	}
}

fn draw_box(
	ctx: &CanvasRenderingContext2d,
	p: &NodePlacement,
	config: &LayoutConfig,
	node: &PersonNode,
	selected: bool,
	hovered: bool,
) {
	let (w, h) = (config.node_width, config.node_height);
	let (x, y) = (p.x - w / 2.0, p.y - h / 2.0);
	let r = CORNER_RADIUS;

	ctx.begin_path();
	ctx.move_to(x + r, y);
	let _ = ctx.arc_to(x + w, y, x + w, y + h, r);
	let _ = ctx.arc_to(x + w, y + h, x, y + h, r);
	let _ = ctx.arc_to(x, y + h, x, y, r);
	let _ = ctx.arc_to(x, y, x + w, y, r);
	ctx.close_path();
	ctx.set_fill_style_str(gender_fill(node.person.gender));
	ctx.fill();

	let (stroke, width) = if selected {
		("rgba(255, 215, 90, 0.95)", 3.0)
	} else if hovered {
		("rgba(255, 255, 255, 0.8)", 2.0)
	} else {
		("rgba(160, 170, 200, 0.5)", 1.0)
	};
	ctx.set_stroke_style_str(stroke);
	ctx.set_line_width(width);
	ctx.stroke();
}

fn draw_photo_badge(
	ctx: &CanvasRenderingContext2d,
	p: &NodePlacement,
	config: &LayoutConfig,
	node: &PersonNode,
) {
	let cx = p.x - config.node_width / 2.0 + PHOTO_RADIUS + 8.0;
	ctx.begin_path();
	let _ = ctx.arc(cx, p.y, PHOTO_RADIUS, 0.0, 2.0 * PI);
	ctx.set_fill_style_str(if node.has_photo { "#6c7fa8" } else { "#4a4a66" });
	ctx.fill();

	ctx.set_fill_style_str("white");
	ctx.set_font("bold 13px sans-serif");
	ctx.set_text_align("center");
	ctx.set_text_baseline("middle");
	let _ = ctx.fill_text(&node.initials(), cx, p.y);
}

fn draw_label(
	ctx: &CanvasRenderingContext2d,
	p: &NodePlacement,
	config: &LayoutConfig,
	node: &PersonNode,
	photo_shown: bool,
) {
	let left = p.x - config.node_width / 2.0;
	let text_x = if photo_shown {
		left + 2.0 * PHOTO_RADIUS + 16.0
	} else {
		left + 12.0
	};
	let max_width = p.x + config.node_width / 2.0 - text_x - 6.0;

	ctx.set_text_align("left");
	ctx.set_text_baseline("middle");
	ctx.set_fill_style_str("white");
	ctx.set_font("13px sans-serif");
	let _ = ctx.fill_text_with_max_width(&node.display_name, text_x, p.y - 9.0, max_width);

	if let Some(lifespan) = node.lifespan() {
		ctx.set_fill_style_str("rgba(255, 255, 255, 0.65)");
		ctx.set_font("11px sans-serif");
		let _ = ctx.fill_text_with_max_width(&lifespan, text_x, p.y + 10.0, max_width);
	}
}
