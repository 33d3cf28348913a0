//! Session state linking editor nodes to images in the image store.

use fxhash::FxHashMap;
use tracing::debug;

use crate::image::NodeData;
use crate::{NodeId, Pipeline};

/// Remembers which stored image each `input` node shows.
#[derive(Debug, Default, Clone)]
pub struct ValueTracker {
	source_images: FxHashMap<NodeId, u64>,
}

impl ValueTracker {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn set_source_image(&mut self, node: NodeId, image: u64) {
		self.source_images.insert(node, image);
	}

	pub fn source_image(&self, node: NodeId) -> Option<u64> {
		self.source_images.get(&node).copied()
	}

	pub fn forget(&mut self, node: NodeId) -> Option<u64> {
		self.source_images.remove(&node)
	}

	pub fn len(&self) -> usize {
		self.source_images.len()
	}

	pub fn is_empty(&self) -> bool {
		self.source_images.is_empty()
	}

	/// Writes every tracked image into the output of its `input` node.
	/// Returns how many nodes were updated.
	pub fn apply<I, M, E>(&self, pipeline: &mut Pipeline<NodeData<I>, M, E>) -> usize {
		let mut targets = Vec::new();
		for (&node, &image) in &self.source_images {
			match pipeline.node(node) {
				Some(found) if found.template_name() == "input" => {
					if let Some(&link) = found.outputs().first() {
						targets.push((link, image));
					}
				}
				Some(_) => debug!(%node, "tracked node is not an input node"),
				None => debug!(%node, "tracked node is gone"),
			}
		}

		let mut applied = 0;
		for (link, id) in targets {
			if pipeline.set(link, NodeData::StoredImage { id }).is_ok() {
				applied += 1;
			}
		}
		applied
	}
}
