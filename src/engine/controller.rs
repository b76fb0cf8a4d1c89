//! Command surface shared by the canvas and its toolbar.
//!
//! A [`ViewController`] owns everything one diagram needs: the current graph
//! snapshot, its layout, the camera/selection state and the last load error.
//! Commands never fail; a rejected graph is kept in [`ViewController::error`]
//! while the previous layout stays on screen.

use log::{info, warn};

use super::error::GraphIntegrityError;
use super::layout::{LayoutConfig, LayoutResult, layout};
use super::model::{GraphModel, PersonNode};
use super::types::FamilyGraph;
use super::view::ViewState;

#[derive(Debug, Default)]
pub struct ViewController {
	config: LayoutConfig,
	graph: Option<GraphModel>,
	layout: Option<LayoutResult>,
	view: ViewState,
	error: Option<GraphIntegrityError>,
	is_loading: bool,
}

impl ViewController {
	pub fn new(config: LayoutConfig) -> Self {
		Self {
			config,
			..Default::default()
		}
	}

	/// Replace the graph and recompute its layout.
	///
	/// Selection and hover are cleared on success; zoom, pan and the photo
	/// toggle carry over. On an integrity error the previous graph, layout and
	/// selection are left untouched.
	pub fn set_graph(&mut self, graph: FamilyGraph) {
		self.is_loading = true;
		self.error = None;

		match GraphModel::build(graph) {
			Ok(model) => {
				let result = layout(&model, &self.config);
				info!(
					"loaded family graph: {} persons, {} relationships",
					model.len(),
					model.edges().len()
				);
				self.graph = Some(model);
				self.layout = Some(result);
				self.view.clear_selection();
			}
			Err(err) => {
				warn!("rejected family graph: {err}");
				self.error = Some(err);
			}
		}

		self.is_loading = false;
	}

	/// Flag an in-flight fetch; cleared by the next [`Self::set_graph`].
	pub fn mark_loading(&mut self) {
		self.is_loading = true;
	}

	pub fn select_node(&mut self, id: Option<&str>) {
		self.view.select(id);
	}

	pub fn hover_node(&mut self, id: Option<&str>) {
		self.view.hover(id);
	}

	pub fn set_zoom(&mut self, zoom: f64) {
		self.view.set_zoom(zoom);
	}

	pub fn zoom_in(&mut self) {
		self.view.zoom_in();
	}

	pub fn zoom_out(&mut self) {
		self.view.zoom_out();
	}

	/// One zoom step in or out, keeping the screen point `(ax, ay)` still.
	pub fn zoom_at(&mut self, zoom_in: bool, ax: f64, ay: f64) {
		let before = self.view.zoom();
		if zoom_in {
			self.view.zoom_in();
		} else {
			self.view.zoom_out();
		}
		let ratio = self.view.zoom() / before;
		let pan = self.view.pan;
		self.view
			.set_pan(ax - (ax - pan.x) * ratio, ay - (ay - pan.y) * ratio);
	}

	pub fn set_pan(&mut self, x: f64, y: f64) {
		self.view.set_pan(x, y);
	}

	pub fn reset_view(&mut self) {
		self.view.reset();
	}

	/// Zoom and pan so the whole layout fits a `width` x `height` viewport.
	/// Does nothing while there is no laid-out graph.
	pub fn fit_to_view(&mut self, width: f64, height: f64, padding: f64) {
		let Some(bounds) = self.layout.as_ref().map(|l| l.bounds) else {
			return;
		};
		if bounds.is_empty() {
			return;
		}
		let zoom_x = (width - 2.0 * padding).max(1.0) / bounds.width();
		let zoom_y = (height - 2.0 * padding).max(1.0) / bounds.height();
		self.view.set_zoom(zoom_x.min(zoom_y));

		let zoom = self.view.zoom();
		let center = bounds.center();
		self.view
			.set_pan(width / 2.0 - center.x * zoom, height / 2.0 - center.y * zoom);
	}

	pub fn toggle_photos(&mut self) {
		self.view.toggle_photos();
	}

	pub fn get_selected_node(&self) -> Option<&PersonNode> {
		self.resolve(self.view.selected.as_deref()?)
	}

	pub fn get_hovered_node(&self) -> Option<&PersonNode> {
		self.resolve(self.view.hovered.as_deref()?)
	}

	fn resolve(&self, id: &str) -> Option<&PersonNode> {
		self.graph.as_ref()?.node_by_id(id)
	}

	pub fn view(&self) -> &ViewState {
		&self.view
	}

	pub fn snapshot(&self) -> ViewState {
		self.view.clone()
	}

	pub fn graph(&self) -> Option<&GraphModel> {
		self.graph.as_ref()
	}

	pub fn layout(&self) -> Option<&LayoutResult> {
		self.layout.as_ref()
	}

	pub fn error(&self) -> Option<&GraphIntegrityError> {
		self.error.as_ref()
	}

	pub fn is_loading(&self) -> bool {
		self.is_loading
	}

	pub fn config(&self) -> &LayoutConfig {
		&self.config
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::engine::types::{ParentRole, Person, Relationship};
	use crate::engine::view::{MAX_ZOOM, Pan};
	use pretty_assertions::assert_eq;

	fn couple_with_child() -> FamilyGraph {
		FamilyGraph {
			persons: vec![
				Person::new("a", "Arne", "Vik"),
				Person::new("b", "Berit", "Vik"),
				Person::new("c", "Cato", "Vik"),
			],
			relationships: vec![
				Relationship::parent("a", "c", ParentRole::Father),
				Relationship::parent("b", "c", ParentRole::Mother),
				Relationship::spouse("a", "b", Some(0)),
			],
		}
	}

	fn cycle() -> FamilyGraph {
		FamilyGraph {
			persons: vec![Person::new("x", "X", "X"), Person::new("y", "Y", "Y")],
			relationships: vec![
				Relationship::parent("x", "y", ParentRole::Father),
				Relationship::parent("y", "x", ParentRole::Father),
			],
		}
	}

	#[test]
	fn set_graph_lays_out_and_resolves_selection() {
		let mut ctrl = ViewController::default();
		ctrl.set_graph(couple_with_child());

		assert!(ctrl.error().is_none());
		assert!(!ctrl.is_loading());
		assert_eq!(ctrl.layout().map(LayoutResult::len), Some(3));

		ctrl.select_node(Some("c"));
		assert_eq!(
			ctrl.get_selected_node().map(|n| n.display_name.as_str()),
			Some("Cato Vik")
		);
	}

	#[test]
	fn cycle_is_reported_and_previous_layout_kept() {
		let mut ctrl = ViewController::default();
		ctrl.set_graph(couple_with_child());
		ctrl.select_node(Some("a"));
		let before = ctrl.layout().cloned();

		ctrl.set_graph(cycle());

		assert!(matches!(
			ctrl.error(),
			Some(GraphIntegrityError::ParentCycle(_))
		));
		assert_eq!(ctrl.layout().cloned(), before);
		assert_eq!(ctrl.get_selected_node().map(PersonNode::id), Some("a"));
		assert!(!ctrl.is_loading());

		ctrl.set_graph(couple_with_child());
		assert!(ctrl.error().is_none());
	}

	#[test]
	fn cycle_on_fresh_controller_leaves_no_layout() {
		let mut ctrl = ViewController::default();
		ctrl.set_graph(cycle());
		assert!(ctrl.error().is_some());
		assert!(ctrl.layout().is_none());
		assert!(ctrl.get_selected_node().is_none());
	}

	#[test]
	fn new_graph_clears_selection_but_keeps_camera() {
		let mut ctrl = ViewController::default();
		ctrl.set_graph(couple_with_child());
		ctrl.set_zoom(1.5);
		ctrl.set_pan(30.0, -20.0);
		ctrl.toggle_photos();
		ctrl.select_node(Some("a"));
		ctrl.hover_node(Some("b"));

		ctrl.set_graph(couple_with_child());

		let view = ctrl.snapshot();
		assert_eq!(view.zoom(), 1.5);
		assert_eq!(view.pan, Pan { x: 30.0, y: -20.0 });
		assert!(!view.show_photos);
		assert_eq!(view.selected, None);
		assert_eq!(view.hovered, None);
	}

	#[test]
	fn empty_graph_and_stale_ids_resolve_to_nothing() {
		let mut ctrl = ViewController::default();
		ctrl.select_node(Some("a"));
		assert!(ctrl.get_selected_node().is_none());

		ctrl.set_graph(FamilyGraph::default());
		assert!(ctrl.layout().is_some_and(LayoutResult::is_empty));
		assert!(ctrl.get_selected_node().is_none());

		ctrl.set_graph(couple_with_child());
		ctrl.select_node(Some("ghost-id"));
		ctrl.hover_node(Some("ghost-id"));
		assert!(ctrl.get_selected_node().is_none());
		assert!(ctrl.get_hovered_node().is_none());
	}

	#[test]
	fn zoom_at_keeps_anchor_fixed() {
		let mut ctrl = ViewController::default();
		ctrl.set_pan(100.0, 50.0);
		// layout point under the anchor before zooming
		let (ax, ay) = (300.0, 250.0);
		let (lx, ly) = ((ax - 100.0) / 1.0, (ay - 50.0) / 1.0);

		ctrl.zoom_at(true, ax, ay);

		let view = ctrl.view();
		assert_eq!(view.zoom(), 1.25);
		assert_eq!(lx * view.zoom() + view.pan.x, ax);
		assert_eq!(ly * view.zoom() + view.pan.y, ay);
	}

	#[test]
	fn fit_to_view_centers_layout() {
		let mut ctrl = ViewController::default();
		ctrl.fit_to_view(800.0, 600.0, 20.0);
		assert_eq!(ctrl.view().zoom(), 1.0);

		ctrl.set_graph(couple_with_child());
		ctrl.fit_to_view(10_000.0, 10_000.0, 0.0);
		let view = ctrl.snapshot();
		assert_eq!(view.zoom(), MAX_ZOOM);

		let bounds = ctrl.layout().unwrap().bounds;
		let center = bounds.center();
		assert!((center.x * view.zoom() + view.pan.x - 5_000.0).abs() < 1e-9);
		assert!((center.y * view.zoom() + view.pan.y - 5_000.0).abs() < 1e-9);
	}

	#[test]
	fn reset_view_restores_camera_only() {
		let mut ctrl = ViewController::default();
		ctrl.toggle_photos();
		ctrl.zoom_in();
		ctrl.set_pan(5.0, 5.0);
		ctrl.select_node(Some("a"));

		ctrl.reset_view();

		let view = ctrl.view();
		assert_eq!(view.zoom(), 1.0);
		assert_eq!(view.pan, Pan::default());
		assert_eq!(view.selected, None);
		assert!(!view.show_photos);
	}
}
