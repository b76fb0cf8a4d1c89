use std::collections::HashSet;

use crate::engine::{FamilyGraph, LayoutConfig, ViewController};

pub const FIT_PADDING: f64 = 40.0;
/// Pointer travel below which a press counts as a click, not a pan.
pub const CLICK_SLOP: f64 = 3.0;

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub moved: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub pan_start_x: f64,
	pub pan_start_y: f64,
}

#[derive(Clone, Debug, Default)]
pub struct HoverState {
	pub neighbors: HashSet<String>,
	pub highlight_t: f64,
	pub prev_node: Option<String>,
	pub prev_neighbors: HashSet<String>,
	delay_t: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewCommand {
	ZoomIn,
	ZoomOut,
	Reset,
	Fit,
	TogglePhotos,
}

/// What the toolbar and detail card show; refreshed after each interaction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CanvasStatus {
	pub zoom_percent: u32,
	pub show_photos: bool,
	pub selected_name: Option<String>,
	pub selected_details: Option<String>,
	pub error: Option<String>,
}

pub struct TreeCanvasState {
	pub controller: ViewController,
	pub pan: PanState,
	pub hover: HoverState,
	pub width: f64,
	pub height: f64,
}

impl TreeCanvasState {
	pub fn new(graph: FamilyGraph, width: f64, height: f64) -> Self {
		let mut state = Self {
			controller: ViewController::new(LayoutConfig::default()),
			pan: PanState::default(),
			hover: HoverState::default(),
			width,
			height,
		};
		state.load(graph);
		state
	}

	/// Swap in a new graph; the camera is refitted only if it was accepted.
	pub fn load(&mut self, graph: FamilyGraph) {
		self.controller.set_graph(graph);
		if self.controller.error().is_none() {
			self.hover = HoverState::default();
			self.controller.fit_to_view(self.width, self.height, FIT_PADDING);
		}
	}

	pub fn screen_to_layout(&self, sx: f64, sy: f64) -> (f64, f64) {
		let view = self.controller.view();
		(
			(sx - view.pan.x) / view.zoom(),
			(sy - view.pan.y) / view.zoom(),
		)
	}

	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<String> {
		let layout = self.controller.layout()?;
		let config = self.controller.config();
		let (lx, ly) = self.screen_to_layout(sx, sy);
		layout
			.nodes
			.iter()
			.find(|(_, p)| {
				(p.x - lx).abs() <= config.node_width / 2.0
					&& (p.y - ly).abs() <= config.node_height / 2.0
			})
			.map(|(id, _)| id.clone())
	}

	pub fn set_hover(&mut self, node: Option<String>) {
		let current = self.controller.view().hovered.clone();
		if current == node {
			return;
		}
		let was_hovering = current.is_some();

		// Keep the old highlight around so it can fade out
		if was_hovering && node.is_none() {
			self.hover.prev_node = current;
			self.hover.prev_neighbors = std::mem::take(&mut self.hover.neighbors);
		} else {
			self.hover.prev_node = None;
			self.hover.prev_neighbors.clear();
		}

		self.controller.hover_node(node.as_deref());
		self.hover.neighbors.clear();

		if let Some(id) = node {
			if !was_hovering {
				self.hover.delay_t = 0.0;
			}
			if let Some(graph) = self.controller.graph() {
				self.hover
					.neighbors
					.extend(graph.relatives_of(&id).into_iter().map(String::from));
			}
		}
	}

	pub fn is_hovered(&self, id: &str) -> bool {
		self.controller.view().hovered.as_deref() == Some(id)
			|| self.hover.prev_node.as_deref() == Some(id)
	}

	pub fn is_highlighted(&self, id: &str) -> bool {
		self.is_hovered(id)
			|| self.hover.neighbors.contains(id)
			|| self.hover.prev_neighbors.contains(id)
	}

	pub fn has_active_highlight(&self) -> bool {
		self.controller.view().hovered.is_some() || self.hover.prev_node.is_some()
	}

	pub fn begin_pan(&mut self, x: f64, y: f64) {
		let pan = self.controller.view().pan;
		self.pan = PanState {
			active: true,
			moved: false,
			start_x: x,
			start_y: y,
			pan_start_x: pan.x,
			pan_start_y: pan.y,
		};
	}

	pub fn drag_to(&mut self, x: f64, y: f64) {
		if !self.pan.active {
			return;
		}
		let (dx, dy) = (x - self.pan.start_x, y - self.pan.start_y);
		if dx.hypot(dy) > CLICK_SLOP {
			self.pan.moved = true;
		}
		if self.pan.moved {
			self.controller
				.set_pan(self.pan.pan_start_x + dx, self.pan.pan_start_y + dy);
		}
	}

	/// Ends a pan gesture; true when the pointer never really moved.
	pub fn end_pan(&mut self) -> bool {
		let was_click = self.pan.active && !self.pan.moved;
		self.pan = PanState::default();
		was_click
	}

	/// Select the person under the pointer, or clear the selection.
	pub fn click(&mut self, sx: f64, sy: f64) {
		let hit = self.node_at_position(sx, sy);
		self.controller.select_node(hit.as_deref());
	}

	pub fn wheel(&mut self, delta_y: f64, sx: f64, sy: f64) {
		self.controller.zoom_at(delta_y < 0.0, sx, sy);
	}

	pub fn apply(&mut self, command: ViewCommand) {
		match command {
			ViewCommand::ZoomIn => self.controller.zoom_in(),
			ViewCommand::ZoomOut => self.controller.zoom_out(),
			ViewCommand::Reset => self.controller.reset_view(),
			ViewCommand::Fit => self.controller.fit_to_view(self.width, self.height, FIT_PADDING),
			ViewCommand::TogglePhotos => self.controller.toggle_photos(),
		}
	}

	pub fn status(&self) -> CanvasStatus {
		let view = self.controller.view();
		let selected = self.controller.get_selected_node();
		CanvasStatus {
			zoom_percent: (view.zoom() * 100.0).round() as u32,
			show_photos: view.show_photos,
			selected_name: selected.map(|n| n.display_name.clone()),
			selected_details: selected.map(|n| {
				let mut parts: Vec<String> = n.lifespan().into_iter().collect();
				if let Some(age) = n.age {
					parts.push(format!("age {age}"));
				}
				parts.join(", ")
			}),
			error: self.controller.error().map(ToString::to_string),
		}
	}

	pub fn tick(&mut self, dt: f64) {
		let hovering = self.controller.view().hovered.is_some();
		let (target, delay, speed) = if hovering {
			(1.0, 0.08, 1.8)
		} else {
			(0.0, 0.0, 1.26)
		};

		if hovering {
			self.hover.delay_t = (self.hover.delay_t + dt).min(delay);
			if self.hover.delay_t >= delay {
				self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt;
			}
		} else {
			self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt;
			if self.hover.highlight_t < 0.01 {
				self.hover.highlight_t = 0.0;
				self.hover.prev_node = None;
				self.hover.prev_neighbors.clear();
			}
		}
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}
}
