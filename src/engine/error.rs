use thiserror::Error;

use super::types::ParentRole;

/// Reasons a family graph cannot be indexed or laid out.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GraphIntegrityError {
	#[error("person `{0}` appears more than once")]
	DuplicatePerson(String),

	#[error("relationship references unknown person `{0}`")]
	UnknownPerson(String),

	#[error("parent relationships form a cycle through `{0}`")]
	ParentCycle(String),

	#[error("`{child}` already has a {role}, cannot also add `{parent}`")]
	DuplicateParentRole {
		child: String,
		parent: String,
		role: ParentRole,
	},

	#[error("`{parent}` is attached to `{child}` as a parent more than once")]
	DuplicateParent { child: String, parent: String },

	#[error("`{0}` cannot be their own spouse")]
	SelfSpouse(String),
}
