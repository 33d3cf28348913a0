use std::fmt;

use crate::{LinkId, NodeId};

pub type Result<T, E> = std::result::Result<T, Error<E>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
	Input,
	Output,
}

impl fmt::Display for Direction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Direction::Input => f.write_str("input"),
			Direction::Output => f.write_str("output"),
		}
	}
}

/// A link record in a serialized document that names a node
/// the document does not contain.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("link {link} references missing node {node}")]
pub struct MalformedLink {
	pub link: LinkId,
	pub node: NodeId,
}

/// Everything that can go wrong while editing or evaluating a pipeline.
///
/// `E` is the error type reported by compute functions.
#[derive(thiserror::Error, Debug)]
pub enum Error<E> {
	#[error("template \"{0}\" does not exist")]
	TemplateNotFound(String),

	#[error("node {0} does not exist")]
	NodeNotFound(NodeId),

	#[error("link {0} does not exist")]
	LinkNotFound(LinkId),

	#[error("node {node} has no {direction} slot {index}")]
	SlotOutOfRange {
		node: NodeId,
		direction: Direction,
		index: usize,
	},

	#[error("output {from_index} of node {from} is not connected to input {to_index} of node {to}")]
	NotConnected {
		from: NodeId,
		from_index: usize,
		to: NodeId,
		to_index: usize,
	},

	/// The compute function broke its template's contract.
	#[error("template \"{template}\" declares {expected} outputs but its compute function returned {actual}")]
	ArityMismatch {
		template: String,
		expected: usize,
		actual: usize,
	},

	#[error("compute function failed: {0}")]
	Compute(E),

	#[error("output node {0:?} does not exist")]
	OutputNodeNotFound(Option<NodeId>),

	#[error("cannot connect a \"{from}\" output to a \"{to}\" input")]
	IncompatibleLink { from: String, to: String },

	#[error("linking node {from} into node {to} would create a cycle")]
	Cycle { from: NodeId, to: NodeId },

	#[error(transparent)]
	Malformed(#[from] MalformedLink),

	#[error("malformed pipeline document: {0}")]
	Json(#[from] serde_json::Error),
}
