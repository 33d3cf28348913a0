pub mod macros;

mod error;
mod hydrate;
pub mod image;
mod inputs;
mod link;
mod node;
mod pipeline;
mod serialize;
mod template;
pub mod tracker;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use error::{Direction, Error, MalformedLink, Result};
pub use inputs::Inputs;
pub use link::{Endpoint, Link, LinkTemplate};
pub use node::Node;
pub use pipeline::Pipeline;
pub use serialize::{
	deserialize_pipeline, serialize_pipeline, SerializedLink, SerializedNode, SerializedPipeline,
};
pub use template::{CastFn, ComputeFn, NodeTemplate, TemplateTable};

/// Identity of a node, stable across serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

/// Identity of a link, stable across serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(pub u64);

impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

impl fmt::Display for LinkId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

/// Largest node or link id accepted from a serialized document: the
/// largest integer a JSON number carries exactly in the editor.
pub const MAX_ID: u64 = (1 << 53) - 1;

/// Freshness of a link relative to its consumer.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum State {
	/// The consumer has already seen the current value.
	Clean,
	/// The value was written (by `set` or by a recompute of the producer)
	/// and the consumer has not pulled it yet.
	Dirty,
}

/// What a call to [`Pipeline::hydrate`] ended up doing.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Hydration {
	Unchanged,
	Recomputed,
}
