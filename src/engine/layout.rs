//! Generation-first, spouse-aware layout for family graphs.
//!
//! The pass runs in four stages over an already validated [`GraphModel`]:
//!
//! 1. **Generations:** longest ancestor chain over parent edges, so a child
//!    always sits below every parent. Parentless persons who married into a
//!    deeper line can be lifted to their spouse's row.
//! 2. **Spouse units:** spouse-connected persons of one generation become a
//!    single horizontal block, earliest marriage leftmost.
//! 3. **Unit forest:** each unit picks one primary parent unit, turning the
//!    DAG into a forest that can be laid out by subtree width.
//! 4. **Placement:** subtrees are packed bottom-up with per-generation
//!    contours, parents are centered over their children, and connected
//!    components are stacked left to right.
//!
//! Positions are always recomputed from scratch; equal inputs yield equal
//! results.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet, VecDeque};

use log::debug;
use serde::{Deserialize, Serialize};

use super::error::GraphIntegrityError;
use super::model::{GraphModel, ModelEdge, NodeIdx};
use super::types::{FamilyGraph, ParentRole};

pub const NODE_WIDTH: f64 = 160.0;
pub const NODE_HEIGHT: f64 = 70.0;
pub const HORIZONTAL_GAP: f64 = 40.0;
pub const VERTICAL_GAP: f64 = 120.0;
pub const SPOUSE_GAP: f64 = 20.0;

/// Box sizes and spacing used by [`layout`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
	pub node_width: f64,
	pub node_height: f64,
	/// Minimum space between boxes of different units on one row.
	pub horizontal_gap: f64,
	pub vertical_gap: f64,
	/// Exact space between neighbouring members of a spouse unit.
	pub spouse_gap: f64,
	/// Lift parentless persons to the generation of the spouse they married.
	pub align_spouses: bool,
	/// Keep each marriage's children together before applying the sibling order.
	pub group_half_siblings: bool,
}

impl Default for LayoutConfig {
	fn default() -> Self {
		Self {
			node_width: NODE_WIDTH,
			node_height: NODE_HEIGHT,
			horizontal_gap: HORIZONTAL_GAP,
			vertical_gap: VERTICAL_GAP,
			spouse_gap: SPOUSE_GAP,
			align_spouses: true,
			group_half_siblings: false,
		}
	}
}

impl LayoutConfig {
	pub fn row_height(&self) -> f64 {
		self.node_height + self.vertical_gap
	}

	pub fn unit_width(&self, members: usize) -> f64 {
		let n = members.max(1) as f64;
		n * self.node_width + (n - 1.0) * self.spouse_gap
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
	pub x: f64,
	pub y: f64,
}

impl Point {
	pub fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}
}

/// Center of a person's box in layout space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodePlacement {
	pub x: f64,
	pub y: f64,
	pub generation: u32,
	/// Index into [`LayoutResult::units`].
	pub unit: usize,
	/// Position inside the unit, left to right.
	pub slot: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpouseUnit {
	pub members: Vec<String>,
	pub generation: u32,
	pub center_x: f64,
	pub y: f64,
	pub width: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
	Parent { role: ParentRole },
	Spouse { sequence: Option<u32> },
}

/// Enough geometry for a renderer to draw a connector between two boxes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeRoute {
	pub kind: EdgeKind,
	pub source: String,
	pub target: String,
	pub start: Point,
	pub end: Point,
	/// Row for the horizontal leg of an orthogonal connector.
	pub channel_y: f64,
	/// The straight line would cross other boxes; route through `channel_y`.
	pub bends_around_unit: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutBounds {
	pub min_x: f64,
	pub min_y: f64,
	pub max_x: f64,
	pub max_y: f64,
}

impl LayoutBounds {
	pub fn width(&self) -> f64 {
		self.max_x - self.min_x
	}

	pub fn height(&self) -> f64 {
		self.max_y - self.min_y
	}

	pub fn center(&self) -> Point {
		Point::new(
			(self.min_x + self.max_x) / 2.0,
			(self.min_y + self.max_y) / 2.0,
		)
	}

	pub fn is_empty(&self) -> bool {
		self.width() <= 0.0 || self.height() <= 0.0
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutResult {
	pub nodes: BTreeMap<String, NodePlacement>,
	pub units: Vec<SpouseUnit>,
	pub edges: Vec<EdgeRoute>,
	pub bounds: LayoutBounds,
}

impl LayoutResult {
	pub fn position(&self, id: &str) -> Option<&NodePlacement> {
		self.nodes.get(id)
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}
}

/// Validate `graph` and lay it out; no partial result on error.
pub fn layout_graph(
	graph: FamilyGraph,
	config: &LayoutConfig,
) -> Result<LayoutResult, GraphIntegrityError> {
	let model = GraphModel::build(graph)?;
	Ok(layout(&model, config))
}

pub fn layout(model: &GraphModel, config: &LayoutConfig) -> LayoutResult {
	if model.is_empty() {
		return LayoutResult::default();
	}

	let generations = assign_generations(model, config.align_spouses);
	let forest = UnitForest::new(model, &generations, config);
	let centers = forest.place(config);
	let result = forest.into_result(model, config, &centers);

	debug!(
		"laid out {} persons in {} units over {} generations",
		result.nodes.len(),
		result.units.len(),
		generations.iter().max().map_or(0, |g| g + 1)
	);
	result
}

/// Generation per person, in insertion order.
///
/// With `align_spouses == false` this is exactly the longest ancestor chain:
/// every parentless person is generation 0. With it set (the
/// [`LayoutConfig`] default) a parentless person married to someone deeper
/// takes that spouse's generation instead, and their descendants move down
/// with them. Children stay strictly below all parents either way.
pub fn assign_generations(model: &GraphModel, align_spouses: bool) -> Vec<u32> {
	let mut generations = vec![0u32; model.len()];
	let propagate = |generations: &mut [u32]| {
		for &v in model.topological_order() {
			if let Some(deepest) = model.parents(v).iter().map(|p| generations[p.index()]).max() {
				generations[v.index()] = deepest + 1;
			}
		}
	};
	propagate(&mut generations);
	if !align_spouses {
		return generations;
	}

	// A person marrying their own descendant would lift forever; cap the passes.
	// Lifts are computed from the previous pass only, so person order never matters.
	for _ in 0..model.len() {
		let lifts: Vec<(usize, u32)> = model
			.nodes()
			.filter(|(v, _)| model.parents(*v).is_empty())
			.filter_map(|(v, _)| {
				let target = model.spouses(v).iter().map(|s| generations[s.index()]).max()?;
				(target > generations[v.index()]).then_some((v.index(), target))
			})
			.collect();
		if lifts.is_empty() {
			break;
		}
		for (v, target) in lifts {
			generations[v] = target;
		}
		propagate(&mut generations);
	}
	generations
}

struct Unit {
	members: Vec<NodeIdx>,
	generation: u32,
	component: usize,
}

/// Spouse units linked to one primary parent unit each.
struct UnitForest {
	units: Vec<Unit>,
	unit_of: Vec<usize>,
	slot_of: Vec<usize>,
	generations: Vec<u32>,
	tree_children: Vec<Vec<usize>>,
	/// Tree roots grouped by connected component, components in order.
	roots: Vec<Vec<usize>>,
}

impl UnitForest {
	fn new(model: &GraphModel, generations: &[u32], config: &LayoutConfig) -> Self {
		let n = model.len();
		let component_of = connected_components(model);

		// Marriage count and earliest marriage per person, same-row spouses only.
		// The earliest key ends in "is the second-named side" so a couple has one hub.
		let mut marriages = vec![0usize; n];
		let mut earliest: Vec<Option<(bool, u32, usize, bool)>> = vec![None; n];
		for (ordinal, edge) in model.edges().iter().enumerate() {
			let ModelEdge::Spouse { a, b, sequence } = *edge else {
				continue;
			};
			if generations[a.index()] != generations[b.index()] {
				continue;
			}
			for (v, second) in [(a, false), (b, true)] {
				let key = (sequence.is_none(), sequence.unwrap_or(0), ordinal, second);
				marriages[v.index()] += 1;
				let current = &mut earliest[v.index()];
				if current.is_none_or(|c| key < c) {
					*current = Some(key);
				}
			}
		}

		let mut units: Vec<Unit> = Vec::new();
		let mut unit_of = vec![usize::MAX; n];
		let mut slot_of = vec![0; n];
		for (start, _) in model.nodes() {
			if unit_of[start.index()] != usize::MAX {
				continue;
			}
			let id = units.len();
			let generation = generations[start.index()];
			let same_row = move |v: NodeIdx| {
				model
					.spouses(v)
					.iter()
					.copied()
					.filter(move |s| generations[s.index()] == generation)
			};

			let mut found = vec![start];
			unit_of[start.index()] = id;
			let mut next = 0;
			while next < found.len() {
				for s in same_row(found[next]) {
					if unit_of[s.index()] == usize::MAX {
						unit_of[s.index()] = id;
						found.push(s);
					}
				}
				next += 1;
			}

			// Preorder from the most-married member, earliest marriage leftmost.
			let hub = found
				.iter()
				.copied()
				.min_by_key(|v| (Reverse(marriages[v.index()]), earliest[v.index()]))
				.unwrap_or(start);
			let mut members = Vec::with_capacity(found.len());
			let mut walked = HashSet::new();
			let mut stack = vec![hub];
			while let Some(v) = stack.pop() {
				if !walked.insert(v) {
					continue;
				}
				slot_of[v.index()] = members.len();
				members.push(v);
				stack.extend(same_row(v).rev().filter(|s| !walked.contains(s)));
			}
			units.push(Unit {
				members,
				generation,
				component: component_of[start.index()],
			});
		}

		let tree_parent: Vec<Option<usize>> = units
			.iter()
			.map(|unit| {
				let first = unit
					.members
					.iter()
					.find(|&&m| !model.parents(m).is_empty())?;
				model
					.parents(*first)
					.iter()
					.map(|p| unit_of[p.index()])
					.max_by_key(|&pu| (units[pu].generation, Reverse(pu)))
			})
			.collect();

		let mut tree_children = vec![Vec::new(); units.len()];
		for (u, unit) in units.iter().enumerate() {
			let mut seen = HashSet::new();
			let mut kids: Vec<_> = unit
				.members
				.iter()
				.flat_map(|&m| model.children(m).iter().copied())
				.filter(|c| seen.insert(*c))
				.map(|c| {
					let marriage = if config.group_half_siblings {
						model
							.parents(c)
							.iter()
							.filter(|p| unit_of[p.index()] == u)
							.map(|p| slot_of[p.index()])
							.max()
							.unwrap_or(0)
					} else {
						0
					};
					((marriage, model.sibling_key(c)), c)
				})
				.collect();
			kids.sort();

			for (_, c) in kids {
				let child_unit = unit_of[c.index()];
				if tree_parent[child_unit] == Some(u) && !tree_children[u].contains(&child_unit) {
					tree_children[u].push(child_unit);
				}
			}
		}

		let component_count = units.iter().map(|u| u.component + 1).max().unwrap_or(0);
		let mut roots = vec![Vec::new(); component_count];
		for (u, unit) in units.iter().enumerate() {
			if tree_parent[u].is_none() {
				roots[unit.component].push(u);
			}
		}

		Self {
			units,
			unit_of,
			slot_of,
			generations: generations.to_vec(),
			tree_children,
			roots,
		}
	}

	/// Center x of every unit, before normalization.
	fn place(&self, config: &LayoutConfig) -> Vec<f64> {
		let mut placed: Vec<Option<Subtree>> = self.units.iter().map(|_| None).collect();
		let components: Vec<Subtree> = self
			.roots
			.iter()
			.map(|roots| {
				let trees = roots
					.iter()
					.map(|&r| self.place_subtree(r, config, &mut placed))
					.collect();
				pack(trees, config.horizontal_gap, Packing::Contour).0
			})
			.collect();
		let (all, _) = pack(components, config.horizontal_gap, Packing::BoundingBox);

		let mut centers = vec![0.0; self.units.len()];
		for (u, x) in all.centers {
			centers[u] = x;
		}
		centers
	}

	/// Post-order over the tree under `root` with an explicit stack.
	fn place_subtree(
		&self,
		root: usize,
		config: &LayoutConfig,
		placed: &mut [Option<Subtree>],
	) -> Subtree {
		let mut stack = vec![(root, false)];
		while let Some((u, expanded)) = stack.pop() {
			if !expanded {
				stack.push((u, true));
				stack.extend(self.tree_children[u].iter().rev().map(|&c| (c, false)));
				continue;
			}
			let kids = self.tree_children[u]
				.iter()
				.filter_map(|&c| placed[c].take())
				.collect();
			placed[u] = Some(self.center_over(u, kids, config));
		}
		placed[root].take().unwrap_or_default()
	}

	/// Pack `kids` and put unit `u` on top, centered over them.
	fn center_over(&self, u: usize, kids: Vec<Subtree>, config: &LayoutConfig) -> Subtree {
		let unit = &self.units[u];
		let half = config.unit_width(unit.members.len()) / 2.0;

		let mut tree = Subtree::default();
		if !kids.is_empty() {
			let (packed, shifts) = pack(kids, config.horizontal_gap, Packing::Contour);
			let mean = shifts.iter().sum::<f64>() / shifts.len() as f64;
			tree = packed;
			tree.shift(-mean);
		}
		tree.contour.insert(unit.generation, (-half, half));
		tree.centers.push((u, 0.0));
		tree
	}

	fn into_result(self, model: &GraphModel, config: &LayoutConfig, centers: &[f64]) -> LayoutResult {
		let widths: Vec<f64> = self
			.units
			.iter()
			.map(|u| config.unit_width(u.members.len()))
			.collect();
		let offset = -centers
			.iter()
			.zip(&widths)
			.map(|(c, w)| c - w / 2.0)
			.fold(f64::INFINITY, f64::min);
		let y_of = |generation: u32| generation as f64 * config.row_height();

		let mut nodes = BTreeMap::new();
		let mut units = Vec::with_capacity(self.units.len());
		for (u, unit) in self.units.iter().enumerate() {
			let center_x = centers[u] + offset;
			let left = center_x - widths[u] / 2.0;
			let y = y_of(unit.generation);
			for (slot, &m) in unit.members.iter().enumerate() {
				let x = left
					+ config.node_width / 2.0
					+ slot as f64 * (config.node_width + config.spouse_gap);
				nodes.insert(
					model.node(m).id().to_string(),
					NodePlacement {
						x,
						y,
						generation: self.generations[m.index()],
						unit: u,
						slot,
					},
				);
			}
			units.push(SpouseUnit {
				members: unit
					.members
					.iter()
					.map(|&m| model.node(m).id().to_string())
					.collect(),
				generation: unit.generation,
				center_x,
				y,
				width: widths[u],
			});
		}

		let edges = model
			.edges()
			.iter()
			.map(|edge| self.route(model, config, &nodes, edge))
			.collect();
		let bounds = bounds_of(nodes.values(), config);

		LayoutResult {
			nodes,
			units,
			edges,
			bounds,
		}
	}

	fn route(
		&self,
		model: &GraphModel,
		config: &LayoutConfig,
		nodes: &BTreeMap<String, NodePlacement>,
		edge: &ModelEdge,
	) -> EdgeRoute {
		let (half_w, half_h) = (config.node_width / 2.0, config.node_height / 2.0);
		let at = |idx: NodeIdx| nodes[model.node(idx).id()];

		match *edge {
			ModelEdge::Parent {
				parent,
				child,
				role,
			} => {
				let (p, c) = (at(parent), at(child));
				EdgeRoute {
					kind: EdgeKind::Parent { role },
					source: model.node(parent).id().to_string(),
					target: model.node(child).id().to_string(),
					start: Point::new(p.x, p.y + half_h),
					end: Point::new(c.x, c.y - half_h),
					channel_y: c.y - half_h - config.vertical_gap / 2.0,
					bends_around_unit: c.generation - p.generation > 1,
				}
			}
			ModelEdge::Spouse { a, b, sequence } => {
				let (pa, pb) = (at(a), at(b));
				let adjacent = self.unit_of[a.index()] == self.unit_of[b.index()]
					&& self.slot_of[a.index()].abs_diff(self.slot_of[b.index()]) == 1;
				let dir = if pb.x >= pa.x { 1.0 } else { -1.0 };
				EdgeRoute {
					kind: EdgeKind::Spouse { sequence },
					source: model.node(a).id().to_string(),
					target: model.node(b).id().to_string(),
					start: Point::new(pa.x + dir * half_w, pa.y),
					end: Point::new(pb.x - dir * half_w, pb.y),
					channel_y: pa.y.min(pb.y) - half_h - config.vertical_gap / 4.0,
					bends_around_unit: !adjacent,
				}
			}
		}
	}
}

/// Component index per person, numbered by earliest-inserted member.
fn connected_components(model: &GraphModel) -> Vec<usize> {
	let mut component = vec![usize::MAX; model.len()];
	let mut next = 0;
	for (start, _) in model.nodes() {
		if component[start.index()] != usize::MAX {
			continue;
		}
		component[start.index()] = next;
		let mut queue = VecDeque::from([start]);
		while let Some(v) = queue.pop_front() {
			let neighbours = model
				.parents(v)
				.iter()
				.chain(model.children(v))
				.chain(model.spouses(v));
			for &w in neighbours {
				if component[w.index()] == usize::MAX {
					component[w.index()] = next;
					queue.push_back(w);
				}
			}
		}
		next += 1;
	}
	component
}

fn bounds_of<'a>(
	nodes: impl Iterator<Item = &'a NodePlacement>,
	config: &LayoutConfig,
) -> LayoutBounds {
	let (half_w, half_h) = (config.node_width / 2.0, config.node_height / 2.0);
	let mut bounds: Option<LayoutBounds> = None;
	for n in nodes {
		let b = bounds.get_or_insert(LayoutBounds {
			min_x: n.x - half_w,
			min_y: n.y - half_h,
			max_x: n.x + half_w,
			max_y: n.y + half_h,
		});
		b.min_x = b.min_x.min(n.x - half_w);
		b.min_y = b.min_y.min(n.y - half_h);
		b.max_x = b.max_x.max(n.x + half_w);
		b.max_y = b.max_y.max(n.y + half_h);
	}
	bounds.unwrap_or_default()
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Packing {
	/// Only rows both sides occupy must be `gap` apart.
	Contour,
	/// Whole extents must be `gap` apart.
	BoundingBox,
}

/// Horizontal extent per generation plus unit centers, relative to the root.
#[derive(Default)]
struct Subtree {
	contour: BTreeMap<u32, (f64, f64)>,
	centers: Vec<(usize, f64)>,
}

impl Subtree {
	fn is_empty(&self) -> bool {
		self.contour.is_empty()
	}

	fn shift(&mut self, dx: f64) {
		for (left, right) in self.contour.values_mut() {
			*left += dx;
			*right += dx;
		}
		for (_, x) in &mut self.centers {
			*x += dx;
		}
	}

	fn extent(&self) -> (f64, f64) {
		self.contour
			.values()
			.fold((f64::INFINITY, f64::NEG_INFINITY), |(l, r), &(cl, cr)| {
				(l.min(cl), r.max(cr))
			})
	}

	/// Shift that puts `next` at least `gap` to the right of `self`.
	fn clearance(&self, next: &Subtree, gap: f64, packing: Packing) -> f64 {
		if packing == Packing::Contour {
			let shared = next
				.contour
				.iter()
				.filter_map(|(g, &(left, _))| self.contour.get(g).map(|&(_, right)| right - left + gap))
				.fold(f64::NEG_INFINITY, f64::max);
			if shared.is_finite() {
				return shared;
			}
		}
		self.extent().1 - next.extent().0 + gap
	}

	fn absorb(&mut self, other: Subtree) {
		for (g, (left, right)) in other.contour {
			self.contour
				.entry(g)
				.and_modify(|(l, r)| {
					*l = l.min(left);
					*r = r.max(right);
				})
				.or_insert((left, right));
		}
		self.centers.extend(other.centers);
	}
}

/// Lay `parts` out left to right; returns the merged tree and each shift.
fn pack(parts: Vec<Subtree>, gap: f64, packing: Packing) -> (Subtree, Vec<f64>) {
	let mut acc = Subtree::default();
	let mut shifts = Vec::with_capacity(parts.len());
	for mut part in parts {
		if acc.is_empty() {
			acc = part;
			shifts.push(0.0);
			continue;
		}
		let dx = acc.clearance(&part, gap, packing);
		part.shift(dx);
		shifts.push(dx);
		acc.absorb(part);
	}
	(acc, shifts)
}
