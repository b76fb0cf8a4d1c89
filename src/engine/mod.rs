//! Layout and view-state engine for family graphs.
//!
//! [`GraphModel`] indexes a [`FamilyGraph`], [`layout`] positions it, and
//! [`ViewController`] ties both to the interactive [`ViewState`].

mod controller;
mod error;
mod layout;
mod model;
mod types;
mod view;

pub use controller::ViewController;
pub use error::GraphIntegrityError;
pub use layout::{
	EdgeKind, EdgeRoute, HORIZONTAL_GAP, LayoutBounds, LayoutConfig, LayoutResult, NODE_HEIGHT,
	NODE_WIDTH, NodePlacement, Point, SPOUSE_GAP, SpouseUnit, VERTICAL_GAP, assign_generations,
	layout, layout_graph,
};
pub use model::{GraphModel, ModelEdge, NodeIdx, PersonNode};
pub use types::{FamilyGraph, Gender, ParentRole, PartialDate, Person, Relationship};
pub use view::{DEFAULT_ZOOM, MAX_ZOOM, MIN_ZOOM, Pan, ViewState, ZOOM_STEP};
