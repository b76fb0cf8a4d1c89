use serde::{Deserialize, Serialize};

pub const MIN_ZOOM: f64 = 0.25;
pub const MAX_ZOOM: f64 = 2.0;
pub const ZOOM_STEP: f64 = 0.25;
pub const DEFAULT_ZOOM: f64 = 1.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pan {
	pub x: f64,
	pub y: f64,
}

/// Camera and selection context of one diagram.
///
/// Coordinates handed to a renderer are layout-space; the renderer maps them
/// to the screen as `layout * zoom + pan`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
	zoom: f64,
	pub pan: Pan,
	pub selected: Option<String>,
	pub hovered: Option<String>,
	pub show_photos: bool,
}

impl Default for ViewState {
	fn default() -> Self {
		Self {
			zoom: DEFAULT_ZOOM,
			pan: Pan::default(),
			selected: None,
			hovered: None,
			show_photos: true,
		}
	}
}

impl ViewState {
	pub fn zoom(&self) -> f64 {
		self.zoom
	}

	/// Clamped to `[MIN_ZOOM, MAX_ZOOM]`; NaN leaves the zoom unchanged.
	pub fn set_zoom(&mut self, zoom: f64) {
		if zoom.is_nan() {
			return;
		}
		self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
	}

	pub fn zoom_in(&mut self) {
		self.set_zoom(self.zoom + ZOOM_STEP);
	}

	pub fn zoom_out(&mut self) {
		self.set_zoom(self.zoom - ZOOM_STEP);
	}

	pub fn set_pan(&mut self, x: f64, y: f64) {
		self.pan = Pan { x, y };
	}

	pub fn select(&mut self, id: Option<&str>) {
		self.selected = id.map(str::to_string);
	}

	pub fn hover(&mut self, id: Option<&str>) {
		self.hovered = id.map(str::to_string);
	}

	pub fn clear_selection(&mut self) {
		self.selected = None;
		self.hovered = None;
	}

	/// Back to default camera with nothing selected; keeps the photo toggle.
	pub fn reset(&mut self) {
		*self = Self {
			show_photos: self.show_photos,
			..Self::default()
		};
	}

	pub fn toggle_photos(&mut self) {
		self.show_photos = !self.show_photos;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn zoom_is_clamped() {
		let mut view = ViewState::default();
		for (input, expected) in [
			(5.0, MAX_ZOOM),
			(-3.0, MIN_ZOOM),
			(0.0, MIN_ZOOM),
			(1.5, 1.5),
			(f64::INFINITY, MAX_ZOOM),
			(f64::NEG_INFINITY, MIN_ZOOM),
		] {
			view.set_zoom(input);
			assert_eq!(view.zoom(), expected, "input {input}");
		}
		view.set_zoom(f64::NAN);
		assert_eq!(view.zoom(), MIN_ZOOM);
	}

	#[test]
	fn zoom_steps_converge_to_limits() {
		let mut view = ViewState::default();
		view.set_zoom(0.3);
		for _ in 0..20 {
			view.zoom_in();
			assert!(view.zoom() <= MAX_ZOOM);
		}
		assert_eq!(view.zoom(), MAX_ZOOM);
		for _ in 0..20 {
			view.zoom_out();
			assert!(view.zoom() >= MIN_ZOOM);
		}
		assert_eq!(view.zoom(), MIN_ZOOM);
	}

	#[test]
	fn reset_keeps_photo_toggle() {
		let mut view = ViewState::default();
		view.toggle_photos();
		view.set_zoom(1.75);
		view.set_pan(-40.0, 12.5);
		view.select(Some("a"));
		view.hover(Some("b"));

		view.reset();

		assert_eq!(
			view,
			ViewState {
				show_photos: false,
				..ViewState::default()
			}
		);
	}
}
