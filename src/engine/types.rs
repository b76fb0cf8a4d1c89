//! Input shape of a family graph as supplied by the data layer.

use std::cmp::Ordering;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
	Male,
	Female,
	#[default]
	Unknown,
}

/// A birth or death date that may only be known to the year.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PartialDate {
	Date(NaiveDate),
	Year(i32),
}

impl PartialDate {
	pub fn year(&self) -> i32 {
		match self {
			PartialDate::Date(d) => d.year(),
			PartialDate::Year(y) => *y,
		}
	}

	/// Year-only dates sort before any full date in the same year.
	fn sort_key(&self) -> (i32, u32) {
		match self {
			PartialDate::Date(d) => (d.year(), d.ordinal()),
			PartialDate::Year(y) => (*y, 0),
		}
	}
}

impl Ord for PartialDate {
	fn cmp(&self, other: &Self) -> Ordering {
		self.sort_key().cmp(&other.sort_key())
	}
}

impl PartialOrd for PartialDate {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Person {
	pub id: String,
	#[serde(default)]
	pub first_name: String,
	#[serde(default)]
	pub middle_name: Option<String>,
	#[serde(default)]
	pub last_name: String,
	#[serde(default)]
	pub gender: Gender,
	#[serde(default)]
	pub birth: Option<PartialDate>,
	#[serde(default)]
	pub death: Option<PartialDate>,
	#[serde(default)]
	pub photo_url: Option<String>,
	/// Age as computed by the data layer, if it sent one.
	#[serde(default)]
	pub age: Option<u32>,
	/// Explicit position among siblings; lower sorts first.
	#[serde(default)]
	pub order_hint: Option<i32>,
}

impl Person {
	pub fn new(id: impl Into<String>, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			first_name: first_name.into(),
			last_name: last_name.into(),
			..Default::default()
		}
	}

	pub fn born(mut self, birth: PartialDate) -> Self {
		self.birth = Some(birth);
		self
	}

	pub fn died(mut self, death: PartialDate) -> Self {
		self.death = Some(death);
		self
	}

	pub fn with_gender(mut self, gender: Gender) -> Self {
		self.gender = gender;
		self
	}

	pub fn with_order_hint(mut self, hint: i32) -> Self {
		self.order_hint = Some(hint);
		self
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParentRole {
	Father,
	Mother,
}

impl fmt::Display for ParentRole {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ParentRole::Father => f.write_str("father"),
			ParentRole::Mother => f.write_str("mother"),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relationship {
	Parent {
		parent: String,
		child: String,
		role: ParentRole,
	},
	Spouse {
		a: String,
		b: String,
		#[serde(default)]
		sequence: Option<u32>,
	},
}

impl Relationship {
	pub fn parent(parent: impl Into<String>, child: impl Into<String>, role: ParentRole) -> Self {
		Relationship::Parent {
			parent: parent.into(),
			child: child.into(),
			role,
		}
	}

	pub fn spouse(a: impl Into<String>, b: impl Into<String>, sequence: Option<u32>) -> Self {
		Relationship::Spouse {
			a: a.into(),
			b: b.into(),
			sequence,
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FamilyGraph {
	#[serde(default)]
	pub persons: Vec<Person>,
	#[serde(default)]
	pub relationships: Vec<Relationship>,
}

impl FamilyGraph {
	pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(json)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn year_only_dates_sort_before_full_dates_of_same_year() {
		let year = PartialDate::Year(1950);
		let date = PartialDate::Date(NaiveDate::from_ymd_opt(1950, 1, 1).unwrap());
		assert!(year < date);
		assert!(PartialDate::Year(1949) < year);
	}

	#[test]
	fn decodes_tagged_relationships_from_json() {
		let graph = FamilyGraph::from_json(
			r#"{
				"persons": [
					{ "id": "a", "first_name": "Ada", "last_name": "Lind", "gender": "FEMALE", "birth": "1901-04-02" },
					{ "id": "b", "first_name": "Bo", "last_name": "Lind", "birth": 1899 }
				],
				"relationships": [
					{ "type": "SPOUSE", "a": "a", "b": "b", "sequence": 0 },
					{ "type": "PARENT", "parent": "a", "child": "b", "role": "MOTHER" }
				]
			}"#,
		)
		.unwrap();

		assert_eq!(graph.persons.len(), 2);
		assert_eq!(graph.persons[0].gender, Gender::Female);
		assert_eq!(
			graph.persons[0].birth,
			Some(PartialDate::Date(NaiveDate::from_ymd_opt(1901, 4, 2).unwrap()))
		);
		assert_eq!(graph.persons[1].birth, Some(PartialDate::Year(1899)));
		assert_eq!(graph.relationships[0], Relationship::spouse("a", "b", Some(0)));
		assert_eq!(
			graph.relationships[1],
			Relationship::parent("a", "b", ParentRole::Mother)
		);
	}
}
