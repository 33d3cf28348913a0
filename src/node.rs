use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::{LinkId, NodeId, NodeTemplate};

/// A computation vertex. Its slots hold ids of links in the pipeline.
pub struct Node<T, M, E> {
	pub(crate) id: NodeId,
	pub(crate) name: String,
	pub(crate) template: Rc<NodeTemplate<T, M, E>>,
	pub(crate) metadata: M,
	pub(crate) inputs: SmallVec<[LinkId; 4]>,
	pub(crate) outputs: SmallVec<[LinkId; 4]>,
}

impl<T, M, E> Node<T, M, E> {
	pub fn id(&self) -> NodeId {
		self.id
	}

	/// Name of the template this node was created from.
	pub fn template_name(&self) -> &str {
		&self.name
	}

	pub fn template(&self) -> &NodeTemplate<T, M, E> {
		&self.template
	}

	pub fn metadata(&self) -> &M {
		&self.metadata
	}

	pub fn inputs(&self) -> &[LinkId] {
		&self.inputs
	}

	pub fn outputs(&self) -> &[LinkId] {
		&self.outputs
	}
}

impl<T, M, E> fmt::Debug for Node<T, M, E>
where
	M: fmt::Debug,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Node")
			.field("id", &self.id)
			.field("template", &self.name)
			.field("metadata", &self.metadata)
			.field("inputs", &self.inputs)
			.field("outputs", &self.outputs)
			.finish()
	}
}
