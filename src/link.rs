use serde::{Deserialize, Serialize};

use crate::{LinkId, NodeId, State};

/// One end of a link: a node and a slot index on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
	pub node: NodeId,
	pub index: usize,
}

impl Endpoint {
	pub fn new(node: NodeId, index: usize) -> Self {
		Endpoint { node, index }
	}
}

/// Blueprint for one input or output slot of a node template.
#[derive(Debug, Clone)]
pub struct LinkTemplate<T, M> {
	metadata: M,
	default: T,
	data_type: Option<String>,
}

impl<T, M> LinkTemplate<T, M> {
	pub fn new(metadata: M, default: T) -> Self {
		LinkTemplate {
			metadata,
			default,
			data_type: None,
		}
	}

	/// Tag the slot with a data type. Connections between differently
	/// tagged slots need a conversion registered in the template table.
	pub fn typed(mut self, data_type: impl Into<String>) -> Self {
		self.data_type = Some(data_type.into());
		self
	}

	pub fn metadata(&self) -> &M {
		&self.metadata
	}

	pub fn default_value(&self) -> &T {
		&self.default
	}

	pub fn data_type(&self) -> Option<&str> {
		self.data_type.as_deref()
	}
}

/// A single-value conduit between a producer and a consumer.
///
/// Links live in the pipeline's arena and are only rewired by the
/// pipeline itself.
#[derive(Debug, Clone)]
pub struct Link<T, M> {
	pub(crate) id: LinkId,
	pub(crate) value: T,
	pub(crate) metadata: M,
	pub(crate) state: State,
	pub(crate) custom: bool,
	pub(crate) from: Option<Endpoint>,
	pub(crate) to: Option<Endpoint>,
}

impl<T, M> Link<T, M> {
	pub(crate) fn new(id: LinkId, value: T, metadata: M) -> Self {
		Link {
			id,
			value,
			metadata,
			state: State::Dirty,
			custom: false,
			from: None,
			to: None,
		}
	}

	pub(crate) fn from_template(id: LinkId, template: &LinkTemplate<T, M>) -> Self
	where
		T: Clone,
		M: Clone,
	{
		Link::new(id, template.default.clone(), template.metadata.clone())
	}

	/// User write: the value becomes part of the serialized document.
	pub(crate) fn set(&mut self, value: T) {
		self.value = value;
		self.state = State::Dirty;
		self.custom = true;
	}

	/// Write performed by the producer's recompute.
	pub(crate) fn write(&mut self, value: T) {
		self.value = value;
		self.state = State::Dirty;
		self.custom = false;
	}

	pub fn id(&self) -> LinkId {
		self.id
	}

	/// The last value stored in the link. Does not hydrate.
	pub fn value(&self) -> &T {
		&self.value
	}

	pub fn metadata(&self) -> &M {
		&self.metadata
	}

	pub fn state(&self) -> State {
		self.state
	}

	pub fn is_dirty(&self) -> bool {
		self.state == State::Dirty
	}

	/// Whether the value was written with `set` rather than taken from
	/// the template or produced by a recompute.
	pub fn is_custom(&self) -> bool {
		self.custom
	}

	pub fn from(&self) -> Option<Endpoint> {
		self.from
	}

	pub fn to(&self) -> Option<Endpoint> {
		self.to
	}

	pub fn is_connected(&self) -> bool {
		self.from.is_some() && self.to.is_some()
	}
}
