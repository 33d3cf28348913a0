//! Flat, id-addressed wire format for pipelines.

use std::rc::Rc;

use fxhash::FxHashSet;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::{
	Direction, Endpoint, Link, LinkId, MalformedLink, NodeId, Pipeline, Result, TemplateTable,
	MAX_ID,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedNode<M> {
	pub id: NodeId,
	pub template: String,
	pub metadata: M,
}

/// A link record. `default_value` is present only for values written
/// with `set`; a record without `from` and `to` is a free-standing
/// constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedLink<T, M> {
	pub id: LinkId,
	pub metadata: M,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub default_value: Option<T>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub from: Option<Endpoint>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub to: Option<Endpoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedPipeline<T, M> {
	pub nodes: Vec<SerializedNode<M>>,
	pub links: Vec<SerializedLink<T, M>>,
	#[serde(default, deserialize_with = "deserialize_output")]
	pub output: Option<NodeId>,
}

/// Accepts `null` as well as the negative "no output" sentinel older
/// documents carry.
fn deserialize_output<'de, D>(deserializer: D) -> std::result::Result<Option<NodeId>, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = Option::<i64>::deserialize(deserializer)?;
	Ok(raw.and_then(|id| u64::try_from(id).ok()).map(NodeId))
}

impl<T, M> SerializedPipeline<T, M> {
	/// Strict check for callers that must not accept a partially
	/// restored graph: every link endpoint has to name a listed node.
	pub fn validate(&self) -> std::result::Result<(), MalformedLink> {
		let nodes: FxHashSet<NodeId> = self.nodes.iter().map(|node| node.id).collect();
		for link in &self.links {
			for end in link.from.iter().chain(link.to.iter()) {
				if !nodes.contains(&end.node) {
					return Err(MalformedLink {
						link: link.id,
						node: end.node,
					});
				}
			}
		}
		Ok(())
	}

	fn max_id(&self) -> Option<u64> {
		let nodes = self.nodes.iter().map(|node| node.id.0);
		let links = self.links.iter().map(|link| link.id.0);
		nodes.chain(links).filter(|&id| id <= MAX_ID).max()
	}
}

impl<T, M> SerializedPipeline<T, M>
where
	T: Serialize,
	M: Serialize,
{
	pub fn to_json(&self) -> serde_json::Result<String> {
		serde_json::to_string(self)
	}
}

impl<T, M> SerializedPipeline<T, M>
where
	T: DeserializeOwned,
	M: DeserializeOwned,
{
	pub fn from_json(json: &str) -> serde_json::Result<Self> {
		serde_json::from_str(json)
	}
}

pub fn serialize_pipeline<T, M, E>(pipeline: &Pipeline<T, M, E>) -> SerializedPipeline<T, M>
where
	T: Clone,
	M: Clone,
{
	let mut nodes: Vec<_> = pipeline
		.nodes
		.values()
		.map(|node| SerializedNode {
			id: node.id,
			template: node.name.clone(),
			metadata: node.metadata.clone(),
		})
		.collect();
	nodes.sort_by_key(|node| node.id);

	let mut links: Vec<_> = pipeline
		.links
		.values()
		.map(|link| SerializedLink {
			id: link.id,
			metadata: link.metadata.clone(),
			default_value: link.custom.then(|| link.value.clone()),
			from: link.from,
			to: link.to,
		})
		.collect();
	links.sort_by_key(|link| link.id);

	SerializedPipeline {
		nodes,
		links,
		output: pipeline.output,
	}
}

/// Rebuilds a pipeline from its wire form, binding nodes to `templates`.
///
/// Unknown template names abort. Link records that cannot be restored
/// are skipped with a warning; run [`SerializedPipeline::validate`]
/// first to refuse them instead.
pub fn deserialize_pipeline<T, M, E>(
	document: SerializedPipeline<T, M>,
	templates: Rc<TemplateTable<T, M, E>>,
) -> Result<Pipeline<T, M, E>, E>
where
	T: Clone,
	M: Clone,
{
	let mut pipeline = Pipeline::new(templates);
	// Slot links created below get ids above everything the document
	// uses, then get re-keyed to their recorded ids.
	pipeline.next_id = document.max_id().map_or(0, |id| id + 1);

	for node in document.nodes {
		if node.id.0 > MAX_ID {
			warn!(node = %node.id, "node id out of range, skipping");
			continue;
		}
		if pipeline.nodes.contains_key(&node.id) {
			warn!(node = %node.id, "duplicate node id, skipping");
			continue;
		}
		let template = Rc::clone(pipeline.templates.get_template(&node.template)?);
		pipeline.insert_node(node.id, &node.template, template, node.metadata);
	}

	let mut skipped = 0;
	for record in document.links {
		let id = record.id;
		if let Err(reason) = pipeline.restore_link(record) {
			warn!(link = %id, %reason, "skipping link record");
			skipped += 1;
		}
	}

	pipeline.output = document.output;

	debug!(
		nodes = pipeline.nodes.len(),
		links = pipeline.links.len(),
		skipped,
		"deserialized pipeline"
	);
	Ok(pipeline)
}

#[derive(thiserror::Error, Debug)]
enum Skipped {
	#[error(transparent)]
	Malformed(#[from] MalformedLink),
	#[error("node {node} has no {direction} slot {index}")]
	NoSlot {
		node: NodeId,
		direction: Direction,
		index: usize,
	},
	#[error("slot is already connected")]
	Occupied,
	#[error("connection rejected (cycle or incompatible data types)")]
	Rejected,
	#[error("link id is already taken")]
	Duplicate,
	#[error("link id is out of range")]
	OutOfRange,
	#[error("free-standing link has no value")]
	Empty,
}

impl<T, M, E> Pipeline<T, M, E>
where
	T: Clone,
	M: Clone,
{
	pub fn serialize(&self) -> SerializedPipeline<T, M> {
		serialize_pipeline(self)
	}

	pub fn deserialize(
		document: SerializedPipeline<T, M>,
		templates: Rc<TemplateTable<T, M, E>>,
	) -> Result<Self, E> {
		deserialize_pipeline(document, templates)
	}

	pub fn from_json(json: &str, templates: Rc<TemplateTable<T, M, E>>) -> Result<Self, E>
	where
		T: DeserializeOwned,
		M: DeserializeOwned,
	{
		deserialize_pipeline(SerializedPipeline::from_json(json)?, templates)
	}

	fn restore_link(&mut self, record: SerializedLink<T, M>) -> std::result::Result<(), Skipped> {
		let SerializedLink {
			id,
			metadata,
			default_value,
			from,
			to,
		} = record;

		if id.0 > MAX_ID {
			return Err(Skipped::OutOfRange);
		}

		for end in from.iter().chain(to.iter()) {
			if !self.nodes.contains_key(&end.node) {
				return Err(MalformedLink { link: id, node: end.node }.into());
			}
		}

		let current = match (from, to) {
			(Some(from), Some(to)) => {
				self.record_slot(from, Direction::Output)?;
				self.record_slot(to, Direction::Input)?;
				self.link(from.node, from.index, to.node, to.index, metadata.clone())
					.map_err(|_| Skipped::Rejected)?
			}
			(None, Some(to)) => {
				let current = self.record_slot(to, Direction::Input)?;
				if self.links[&current].from.is_some() {
					return Err(Skipped::Occupied);
				}
				current
			}
			(Some(from), None) => {
				let current = self.record_slot(from, Direction::Output)?;
				if self.links[&current].to.is_some() {
					return Err(Skipped::Occupied);
				}
				current
			}
			(None, None) => {
				if self.links.contains_key(&id) {
					return Err(Skipped::Duplicate);
				}
				let value = default_value.ok_or(Skipped::Empty)?;
				let mut link = Link::new(id, value, metadata);
				link.custom = true;
				self.links.insert(id, link);
				return Ok(());
			}
		};

		let current = self.rekey(current, id)?;
		let link = self.link_mut(current);
		link.metadata = metadata;
		if let Some(value) = default_value {
			link.set(value);
		}
		Ok(())
	}

	fn record_slot(&self, end: Endpoint, direction: Direction) -> std::result::Result<LinkId, Skipped> {
		self.slot(end, direction).map_err(|_| Skipped::NoSlot {
			node: end.node,
			direction,
			index: end.index,
		})
	}

	/// Moves a link to the id recorded in the document.
	fn rekey(&mut self, current: LinkId, id: LinkId) -> std::result::Result<LinkId, Skipped> {
		if current == id {
			return Ok(id);
		}
		if self.links.contains_key(&id) {
			return Err(Skipped::Duplicate);
		}

		let mut link = self
			.links
			.remove(&current)
			.expect("node slot refers to a link outside the arena");
		link.id = id;
		if let Some(from) = link.from {
			self.node_mut(from.node).outputs[from.index] = id;
		}
		if let Some(to) = link.to {
			self.node_mut(to.node).inputs[to.index] = id;
		}
		self.links.insert(id, link);
		Ok(id)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn negative_output_means_none() {
		let document: SerializedPipeline<i64, ()> =
			serde_json::from_str(r#"{ "nodes": [], "links": [], "output": -1 }"#).unwrap();
		assert_eq!(document.output, None);

		let document: SerializedPipeline<i64, ()> =
			serde_json::from_str(r#"{ "nodes": [], "links": [], "output": 4 }"#).unwrap();
		assert_eq!(document.output, Some(NodeId(4)));
		assert_eq!(document.to_json().unwrap(), r#"{"nodes":[],"links":[],"output":4}"#);
	}
}
