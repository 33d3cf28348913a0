use std::ops::Index;

use smallvec::SmallVec;

use crate::NodeId;

/// Hydrated input values handed to a compute function.
///
/// Every value has already been pulled through its producer, and
/// converted when the connection crosses data types.
pub struct Inputs<'a, T, M> {
	node: NodeId,
	metadata: &'a M,
	values: SmallVec<[&'a T; 4]>,
}

impl<'a, T, M> Inputs<'a, T, M> {
	pub(crate) fn new(node: NodeId, metadata: &'a M, values: SmallVec<[&'a T; 4]>) -> Self {
		Inputs {
			node,
			metadata,
			values,
		}
	}

	/// The node being computed.
	pub fn node(&self) -> NodeId {
		self.node
	}

	/// Metadata of the node being computed.
	pub fn metadata(&self) -> &M {
		self.metadata
	}

	pub fn get(&self, index: usize) -> Option<&T> {
		self.values.get(index).copied()
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
		self.values.iter().copied()
	}
}

impl<'a, T, M> Index<usize> for Inputs<'a, T, M> {
	type Output = T;

	fn index(&self, index: usize) -> &T {
		self.values[index]
	}
}
