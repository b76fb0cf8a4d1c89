//! Arena-indexed snapshot of a family graph.
//!
//! Persons are stored densely in insertion order and addressed by [`NodeIdx`].
//! Adjacency lists, sibling ordering and a topological order of the parent
//! relation are all computed once in [`GraphModel::build`]; lookups afterwards
//! never rescan the relationship list.

use std::collections::{HashMap, HashSet, VecDeque};

use log::debug;

use super::error::GraphIntegrityError;
use super::types::{FamilyGraph, ParentRole, PartialDate, Person, Relationship};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIdx(usize);

impl NodeIdx {
	pub fn index(self) -> usize {
		self.0
	}
}

/// A person plus the display fields derived from it at build time.
#[derive(Clone, Debug, PartialEq)]
pub struct PersonNode {
	pub person: Person,
	pub display_name: String,
	pub age: Option<u32>,
	pub has_photo: bool,
}

impl PersonNode {
	fn resolve(person: Person) -> Self {
		let display_name = [
			Some(person.first_name.as_str()),
			person.middle_name.as_deref(),
			Some(person.last_name.as_str()),
		]
		.into_iter()
		.flatten()
		.map(str::trim)
		.filter(|part| !part.is_empty())
		.collect::<Vec<_>>()
		.join(" ");

		let age = person.age.or_else(|| match (person.birth, person.death) {
			(Some(birth), Some(death)) => u32::try_from(death.year() - birth.year()).ok(),
			_ => None,
		});
		let has_photo = person
			.photo_url
			.as_deref()
			.is_some_and(|url| !url.trim().is_empty());

		Self {
			person,
			display_name,
			age,
			has_photo,
		}
	}

	pub fn id(&self) -> &str {
		&self.person.id
	}

	/// "1901 – 1980", "b. 1901", "d. 1980" or nothing.
	pub fn lifespan(&self) -> Option<String> {
		match (self.person.birth, self.person.death) {
			(Some(b), Some(d)) => Some(format!("{} – {}", b.year(), d.year())),
			(Some(b), None) => Some(format!("b. {}", b.year())),
			(None, Some(d)) => Some(format!("d. {}", d.year())),
			(None, None) => None,
		}
	}

	pub fn initials(&self) -> String {
		[&self.person.first_name, &self.person.last_name]
			.iter()
			.filter_map(|part| part.trim().chars().next())
			.flat_map(char::to_uppercase)
			.collect()
	}
}

/// A validated relationship with both endpoints resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelEdge {
	Parent {
		parent: NodeIdx,
		child: NodeIdx,
		role: ParentRole,
	},
	Spouse {
		a: NodeIdx,
		b: NodeIdx,
		sequence: Option<u32>,
	},
}

#[derive(Clone, Debug, Default)]
pub struct GraphModel {
	nodes: Vec<PersonNode>,
	index: HashMap<String, NodeIdx>,
	parents: Vec<Vec<NodeIdx>>,
	children: Vec<Vec<NodeIdx>>,
	spouses: Vec<Vec<NodeIdx>>,
	edges: Vec<ModelEdge>,
	topo_order: Vec<NodeIdx>,
}

/// `(no hint, hint, no birth date, birth date, insertion index)`; sorts ascending.
pub(crate) type SiblingKey = (bool, i32, bool, Option<PartialDate>, usize);

impl GraphModel {
	pub fn build(graph: FamilyGraph) -> Result<Self, GraphIntegrityError> {
		let FamilyGraph {
			persons,
			relationships,
		} = graph;

		let mut nodes = Vec::with_capacity(persons.len());
		let mut index = HashMap::with_capacity(persons.len());
		for person in persons {
			if index.contains_key(&person.id) {
				return Err(GraphIntegrityError::DuplicatePerson(person.id));
			}
			index.insert(person.id.clone(), NodeIdx(nodes.len()));
			nodes.push(PersonNode::resolve(person));
		}

		let n = nodes.len();
		let lookup = |id: &str| {
			index
				.get(id)
				.copied()
				.ok_or_else(|| GraphIntegrityError::UnknownPerson(id.to_string()))
		};

		let mut parent_links: Vec<Vec<(ParentRole, NodeIdx)>> = vec![Vec::new(); n];
		let mut children: Vec<Vec<NodeIdx>> = vec![Vec::new(); n];
		// (unsequenced, sequence, edge ordinal, spouse)
		let mut spouse_links: Vec<Vec<(bool, u32, usize, NodeIdx)>> = vec![Vec::new(); n];
		let mut spouse_pairs = HashSet::new();
		let mut edges = Vec::with_capacity(relationships.len());

		for (ordinal, relationship) in relationships.into_iter().enumerate() {
			match relationship {
				Relationship::Parent {
					parent,
					child,
					role,
				} => {
					let (p, c) = (lookup(parent.as_str())?, lookup(child.as_str())?);
					let links = &mut parent_links[c.0];
					if links.iter().any(|&(_, existing)| existing == p) {
						return Err(GraphIntegrityError::DuplicateParent { child, parent });
					}
					if links.iter().any(|&(existing, _)| existing == role) {
						return Err(GraphIntegrityError::DuplicateParentRole {
							child,
							parent,
							role,
						});
					}
					links.push((role, p));
					children[p.0].push(c);
					edges.push(ModelEdge::Parent {
						parent: p,
						child: c,
						role,
					});
				}
				Relationship::Spouse { a, b, sequence } => {
					let (x, y) = (lookup(a.as_str())?, lookup(b.as_str())?);
					if x == y {
						return Err(GraphIntegrityError::SelfSpouse(a));
					}
					if !spouse_pairs.insert((x.min(y), x.max(y))) {
						debug!("ignoring repeated spouse relationship {a} <-> {b}");
						continue;
					}
					let key = (sequence.is_none(), sequence.unwrap_or(0), ordinal);
					spouse_links[x.0].push((key.0, key.1, key.2, y));
					spouse_links[y.0].push((key.0, key.1, key.2, x));
					edges.push(ModelEdge::Spouse { a: x, b: y, sequence });
				}
			}
		}

		let parents = parent_links
			.into_iter()
			.map(|mut links| {
				links.sort();
				links.into_iter().map(|(_, p)| p).collect()
			})
			.collect();
		let spouses = spouse_links
			.into_iter()
			.map(|mut links| {
				links.sort();
				links.into_iter().map(|(.., s)| s).collect()
			})
			.collect();

		let mut model = Self {
			nodes,
			index,
			parents,
			children,
			spouses,
			edges,
			topo_order: Vec::new(),
		};
		for i in 0..n {
			let mut kids = std::mem::take(&mut model.children[i]);
			kids.sort_by_cached_key(|&c| model.sibling_key(c));
			model.children[i] = kids;
		}
		model.topo_order = model.topological_sort()?;
		Ok(model)
	}

	/// Kahn's algorithm over parent → child edges, seeded in insertion order.
	fn topological_sort(&self) -> Result<Vec<NodeIdx>, GraphIntegrityError> {
		let mut in_degree: Vec<usize> = self.parents.iter().map(Vec::len).collect();
		let mut queue: VecDeque<NodeIdx> = (0..self.nodes.len())
			.filter(|&i| in_degree[i] == 0)
			.map(NodeIdx)
			.collect();
		let mut order = Vec::with_capacity(self.nodes.len());

		while let Some(v) = queue.pop_front() {
			order.push(v);
			for &c in &self.children[v.0] {
				in_degree[c.0] -= 1;
				if in_degree[c.0] == 0 {
					queue.push_back(c);
				}
			}
		}

		if order.len() < self.nodes.len() {
			let stuck = in_degree
				.iter()
				.position(|&d| d > 0)
				.map(|i| self.nodes[i].id().to_string())
				.unwrap_or_default();
			return Err(GraphIntegrityError::ParentCycle(stuck));
		}
		Ok(order)
	}

	/// Explicit hint, then birth date, then insertion order.
	pub(crate) fn sibling_key(&self, idx: NodeIdx) -> SiblingKey {
		let person = &self.nodes[idx.0].person;
		(
			person.order_hint.is_none(),
			person.order_hint.unwrap_or(0),
			person.birth.is_none(),
			person.birth,
			idx.0,
		)
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn idx_of(&self, id: &str) -> Option<NodeIdx> {
		self.index.get(id).copied()
	}

	pub fn node(&self, idx: NodeIdx) -> &PersonNode {
		&self.nodes[idx.0]
	}

	pub fn node_by_id(&self, id: &str) -> Option<&PersonNode> {
		self.idx_of(id).map(|idx| self.node(idx))
	}

	pub fn nodes(&self) -> impl Iterator<Item = (NodeIdx, &PersonNode)> {
		self.nodes.iter().enumerate().map(|(i, n)| (NodeIdx(i), n))
	}

	pub fn edges(&self) -> &[ModelEdge] {
		&self.edges
	}

	pub fn parents(&self, idx: NodeIdx) -> &[NodeIdx] {
		&self.parents[idx.0]
	}

	pub fn children(&self, idx: NodeIdx) -> &[NodeIdx] {
		&self.children[idx.0]
	}

	pub fn spouses(&self, idx: NodeIdx) -> &[NodeIdx] {
		&self.spouses[idx.0]
	}

	/// Every person appears after all of their parents.
	pub fn topological_order(&self) -> &[NodeIdx] {
		&self.topo_order
	}

	pub fn parents_of(&self, id: &str) -> impl Iterator<Item = &str> {
		self.ids(self.idx_of(id).map(|i| self.parents(i)))
	}

	pub fn children_of(&self, id: &str) -> impl Iterator<Item = &str> {
		self.ids(self.idx_of(id).map(|i| self.children(i)))
	}

	pub fn spouses_of(&self, id: &str) -> impl Iterator<Item = &str> {
		self.ids(self.idx_of(id).map(|i| self.spouses(i)))
	}

	/// Parents, spouses and children of `id`, each listed once.
	pub fn relatives_of(&self, id: &str) -> Vec<&str> {
		let Some(idx) = self.idx_of(id) else {
			return Vec::new();
		};
		let mut seen = HashSet::new();
		self.parents(idx)
			.iter()
			.chain(self.spouses(idx))
			.chain(self.children(idx))
			.filter(|r| seen.insert(**r))
			.map(|&r| self.node(r).id())
			.collect()
	}

	fn ids<'a>(&'a self, list: Option<&'a [NodeIdx]>) -> impl Iterator<Item = &'a str> + 'a {
		list.unwrap_or_default()
			.iter()
			.map(move |&i| self.nodes[i.0].id())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::engine::types::Gender;
	use pretty_assertions::assert_eq;

	fn family() -> FamilyGraph {
		FamilyGraph {
			persons: vec![
				Person::new("dad", "Olaf", "Berg").with_gender(Gender::Male),
				Person::new("mum", "Siri", "Berg").with_gender(Gender::Female),
				Person::new("young", "Kai", "Berg").born(PartialDate::Year(1990)),
				Person::new("old", "Liv", "Berg").born(PartialDate::Year(1985)),
				Person::new("hinted", "Ola", "Berg")
					.born(PartialDate::Year(2000))
					.with_order_hint(0),
			],
			relationships: vec![
				Relationship::parent("mum", "young", ParentRole::Mother),
				Relationship::parent("dad", "young", ParentRole::Father),
				Relationship::parent("dad", "old", ParentRole::Father),
				Relationship::parent("dad", "hinted", ParentRole::Father),
				Relationship::spouse("dad", "mum", Some(0)),
			],
		}
	}

	#[test]
	fn indexes_parents_children_and_spouses() {
		let model = GraphModel::build(family()).unwrap();

		assert_eq!(model.len(), 5);
		assert_eq!(model.node_by_id("old").unwrap().display_name, "Liv Berg");
		assert!(model.node_by_id("ghost").is_none());
		assert_eq!(model.parents_of("young").collect::<Vec<_>>(), ["dad", "mum"]);
		assert_eq!(model.spouses_of("mum").collect::<Vec<_>>(), ["dad"]);
		assert_eq!(model.children_of("ghost").count(), 0);
	}

	#[test]
	fn children_follow_hint_then_birth_then_insertion() {
		let model = GraphModel::build(family()).unwrap();
		assert_eq!(
			model.children_of("dad").collect::<Vec<_>>(),
			["hinted", "old", "young"]
		);
	}

	#[test]
	fn relatives_are_listed_once() {
		let model = GraphModel::build(family()).unwrap();
		assert_eq!(
			model.relatives_of("dad"),
			vec!["mum", "hinted", "old", "young"]
		);
		assert!(model.relatives_of("ghost").is_empty());
	}

	#[test]
	fn spouses_are_ordered_by_marriage_sequence() {
		let graph = FamilyGraph {
			persons: vec![
				Person::new("p", "P", "X"),
				Person::new("late", "L", "X"),
				Person::new("early", "E", "X"),
				Person::new("unknown", "U", "X"),
			],
			relationships: vec![
				Relationship::spouse("unknown", "p", None),
				Relationship::spouse("p", "late", Some(2)),
				Relationship::spouse("early", "p", Some(1)),
				Relationship::spouse("p", "early", Some(1)),
			],
		};
		let model = GraphModel::build(graph).unwrap();
		assert_eq!(
			model.spouses_of("p").collect::<Vec<_>>(),
			["early", "late", "unknown"]
		);
		assert_eq!(model.edges().len(), 3);
	}

	#[test]
	fn rejects_unknown_endpoint() {
		let mut graph = family();
		graph
			.relationships
			.push(Relationship::parent("ghost", "old", ParentRole::Mother));
		assert_eq!(
			GraphModel::build(graph).unwrap_err(),
			GraphIntegrityError::UnknownPerson("ghost".into())
		);
	}

	#[test]
	fn rejects_parent_cycle() {
		let graph = FamilyGraph {
			persons: vec![Person::new("x", "X", "X"), Person::new("y", "Y", "Y")],
			relationships: vec![
				Relationship::parent("x", "y", ParentRole::Father),
				Relationship::parent("y", "x", ParentRole::Father),
			],
		};
		assert!(matches!(
			GraphModel::build(graph),
			Err(GraphIntegrityError::ParentCycle(_))
		));
	}

	#[test]
	fn rejects_self_parent_as_cycle() {
		let graph = FamilyGraph {
			persons: vec![Person::new("x", "X", "X")],
			relationships: vec![Relationship::parent("x", "x", ParentRole::Mother)],
		};
		assert_eq!(
			GraphModel::build(graph).unwrap_err(),
			GraphIntegrityError::ParentCycle("x".into())
		);
	}

	#[test]
	fn rejects_duplicate_parent_role() {
		let mut graph = family();
		graph.persons.push(Person::new("other", "Ulf", "Dahl"));
		graph
			.relationships
			.push(Relationship::parent("other", "young", ParentRole::Father));
		assert_eq!(
			GraphModel::build(graph).unwrap_err(),
			GraphIntegrityError::DuplicateParentRole {
				child: "young".into(),
				parent: "other".into(),
				role: ParentRole::Father,
			}
		);
	}

	#[test]
	fn rejects_same_parent_twice() {
		let mut graph = family();
		graph
			.relationships
			.push(Relationship::parent("dad", "old", ParentRole::Mother));
		assert!(matches!(
			GraphModel::build(graph),
			Err(GraphIntegrityError::DuplicateParent { .. })
		));
	}

	#[test]
	fn rejects_duplicate_person_and_self_spouse() {
		let mut graph = family();
		graph.persons.push(Person::new("dad", "Again", "Berg"));
		assert_eq!(
			GraphModel::build(graph).unwrap_err(),
			GraphIntegrityError::DuplicatePerson("dad".into())
		);

		let mut graph = family();
		graph
			.relationships
			.push(Relationship::spouse("old", "old", None));
		assert_eq!(
			GraphModel::build(graph).unwrap_err(),
			GraphIntegrityError::SelfSpouse("old".into())
		);
	}

	#[test]
	fn resolves_age_and_display_fields_once() {
		let mut person = Person::new("a", " Ann ", "Holm")
			.born(PartialDate::Year(1900))
			.died(PartialDate::Year(1971));
		person.middle_name = Some("Marie".into());
		person.photo_url = Some("  ".into());
		let mut given = Person::new("b", "Bo", "");
		given.age = Some(42);

		let model = GraphModel::build(FamilyGraph {
			persons: vec![person, given],
			relationships: Vec::new(),
		})
		.unwrap();

		let a = model.node_by_id("a").unwrap();
		assert_eq!(a.display_name, "Ann Marie Holm");
		assert_eq!(a.age, Some(71));
		assert!(!a.has_photo);
		assert_eq!(a.lifespan().as_deref(), Some("1900 – 1971"));
		assert_eq!(a.initials(), "AH");

		let b = model.node_by_id("b").unwrap();
		assert_eq!(b.age, Some(42));
		assert_eq!(b.lifespan(), None);
	}
}
