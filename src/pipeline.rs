use std::rc::Rc;

use fxhash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use tracing::debug;

use crate::{
	Direction, Endpoint, Error, Link, LinkId, Node, NodeId, NodeTemplate, Result, State,
	TemplateTable,
};

/// The owning aggregate of every node and link in one graph.
///
/// Nodes and links live in id-keyed arenas. Links refer to their
/// producer and consumer by [`Endpoint`], nodes refer to their slot
/// links by [`LinkId`].
pub struct Pipeline<T, M, E> {
	pub(crate) templates: Rc<TemplateTable<T, M, E>>,
	pub(crate) nodes: FxHashMap<NodeId, Node<T, M, E>>,
	pub(crate) links: FxHashMap<LinkId, Link<T, M>>,
	pub(crate) next_id: u64,
	pub(crate) output: Option<NodeId>,
}

impl<T, M, E> Pipeline<T, M, E> {
	pub fn new(templates: Rc<TemplateTable<T, M, E>>) -> Self {
		Pipeline {
			templates,
			nodes: FxHashMap::default(),
			links: FxHashMap::default(),
			next_id: 0,
			output: None,
		}
	}

	pub fn templates(&self) -> &Rc<TemplateTable<T, M, E>> {
		&self.templates
	}

	/// The id the next created node or link will receive.
	pub fn next_id(&self) -> u64 {
		self.next_id
	}

	pub fn node(&self, id: NodeId) -> Option<&Node<T, M, E>> {
		self.nodes.get(&id)
	}

	pub fn nodes(&self) -> impl Iterator<Item = &Node<T, M, E>> {
		self.nodes.values()
	}

	pub fn get_link(&self, id: LinkId) -> Option<&Link<T, M>> {
		self.links.get(&id)
	}

	pub fn links(&self) -> impl Iterator<Item = &Link<T, M>> {
		self.links.values()
	}

	pub fn set_node_metadata(&mut self, id: NodeId, metadata: M) -> Result<(), E> {
		let node = self.nodes.get_mut(&id).ok_or(Error::NodeNotFound(id))?;
		node.metadata = metadata;
		Ok(())
	}

	/// Designates the node whose value is the pipeline's result.
	/// The id is resolved lazily by [`Pipeline::evaluate`].
	pub fn set_output_node(&mut self, id: NodeId) {
		self.output = Some(id);
	}

	pub fn output_node(&self) -> Option<NodeId> {
		self.output
	}

	pub fn input_link(&self, node: NodeId, index: usize) -> Result<LinkId, E> {
		self.slot(Endpoint::new(node, index), Direction::Input)
	}

	pub fn output_link(&self, node: NodeId, index: usize) -> Result<LinkId, E> {
		self.slot(Endpoint::new(node, index), Direction::Output)
	}

	/// Overwrites a link's value and marks it dirty.
	pub fn set(&mut self, id: LinkId, value: T) -> Result<(), E> {
		let link = self.links.get_mut(&id).ok_or(Error::LinkNotFound(id))?;
		link.set(value);
		Ok(())
	}

	/// Overrides the value arriving at an input slot.
	pub fn set_input(&mut self, node: NodeId, index: usize, value: T) -> Result<(), E> {
		let link = self.input_link(node, index)?;
		self.set(link, value)
	}

	pub(crate) fn allocate(&mut self) -> u64 {
		let id = self.next_id;
		self.next_id = id.checked_add(1).expect("id counter overflowed");
		id
	}

	pub(crate) fn slot(&self, end: Endpoint, direction: Direction) -> Result<LinkId, E> {
		let node = self.nodes.get(&end.node).ok_or(Error::NodeNotFound(end.node))?;
		let slots = match direction {
			Direction::Input => &node.inputs,
			Direction::Output => &node.outputs,
		};
		slots
			.get(end.index)
			.copied()
			.ok_or(Error::SlotOutOfRange {
				node: end.node,
				direction,
				index: end.index,
			})
	}

	pub(crate) fn link_mut(&mut self, id: LinkId) -> &mut Link<T, M> {
		self.links
			.get_mut(&id)
			.expect("node slot refers to a link outside the arena")
	}

	pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node<T, M, E> {
		self.nodes
			.get_mut(&id)
			.expect("link endpoint refers to a node outside the arena")
	}

	/// Data type tags of both ends of a prospective or existing connection,
	/// when both ends are tagged.
	pub(crate) fn slot_types(&self, from: Endpoint, to: Endpoint) -> Option<(&str, &str)> {
		let output = self.nodes.get(&from.node)?.template.outputs().get(from.index)?;
		let input = self.nodes.get(&to.node)?.template.inputs().get(to.index)?;
		Some((output.data_type()?, input.data_type()?))
	}

	/// Whether `node` reads, directly or transitively, from `target`.
	fn depends_on(&self, node: NodeId, target: NodeId) -> bool {
		let mut stack = vec![node];
		let mut seen = FxHashSet::default();

		while let Some(current) = stack.pop() {
			if current == target {
				return true;
			}
			if !seen.insert(current) {
				continue;
			}
			if let Some(node) = self.nodes.get(&current) {
				stack.extend(
					node.inputs
						.iter()
						.filter_map(|link| self.links.get(link)?.from)
						.map(|end| end.node),
				);
			}
		}

		false
	}
}

impl<T, M, E> Pipeline<T, M, E>
where
	T: Clone,
	M: Clone,
{
	/// Instantiates a node from a registered template.
	pub fn create_node(&mut self, template: &str, metadata: M) -> Result<NodeId, E> {
		let resolved = Rc::clone(self.templates.get_template(template)?);
		let id = NodeId(self.allocate());
		self.insert_node(id, template, resolved, metadata);
		debug!(node = %id, template, "created node");
		Ok(id)
	}

	pub(crate) fn insert_node(
		&mut self,
		id: NodeId,
		name: &str,
		template: Rc<NodeTemplate<T, M, E>>,
		metadata: M,
	) {
		let mut inputs = SmallVec::new();
		for (index, slot) in template.inputs().iter().enumerate() {
			let mut link = Link::from_template(LinkId(self.allocate()), slot);
			link.to = Some(Endpoint::new(id, index));
			inputs.push(link.id);
			self.links.insert(link.id, link);
		}

		let mut outputs = SmallVec::new();
		for (index, slot) in template.outputs().iter().enumerate() {
			let mut link = Link::from_template(LinkId(self.allocate()), slot);
			link.from = Some(Endpoint::new(id, index));
			outputs.push(link.id);
			self.links.insert(link.id, link);
		}

		self.nodes.insert(
			id,
			Node {
				id,
				name: name.to_owned(),
				template,
				metadata,
				inputs,
				outputs,
			},
		);
	}

	/// Connects output `from_index` of `from` to input `to_index` of `to`.
	///
	/// Existing connections on either slot are severed first. The new
	/// connection link starts out with the producer's last output value.
	pub fn link(
		&mut self,
		from: NodeId,
		from_index: usize,
		to: NodeId,
		to_index: usize,
		metadata: M,
	) -> Result<LinkId, E> {
		let producer = Endpoint::new(from, from_index);
		let consumer = Endpoint::new(to, to_index);

		let output = self.slot(producer, Direction::Output)?;
		let input = self.slot(consumer, Direction::Input)?;

		if let Some((output_type, input_type)) = self.slot_types(producer, consumer) {
			if !self.templates.can_cast(output_type, input_type) {
				return Err(Error::IncompatibleLink {
					from: output_type.to_owned(),
					to: input_type.to_owned(),
				});
			}
		}

		if self.depends_on(from, to) {
			return Err(Error::Cycle { from, to });
		}

		if self.links[&output].to.is_some() {
			self.sever(output);
		}
		if self.links[&input].from.is_some() {
			self.sever(input);
		}

		let output = self.nodes[&from].outputs[from_index];
		let input = self.nodes[&to].inputs[to_index];
		let previous = self
			.links
			.remove(&output)
			.expect("node slot refers to a link outside the arena");
		let mut link = self
			.links
			.remove(&input)
			.expect("node slot refers to a link outside the arena");

		let id = LinkId(self.allocate());
		link.id = id;
		link.from = Some(producer);
		link.metadata = metadata;
		link.value = previous.value;
		link.custom = previous.custom;
		link.state = State::Dirty;
		self.links.insert(id, link);

		self.node_mut(from).outputs[from_index] = id;
		self.node_mut(to).inputs[to_index] = id;

		debug!(link = %id, %from, from_index, %to, to_index, "linked");
		Ok(id)
	}

	/// Severs a connection. The consumer's input goes back to a fresh
	/// link holding the template default; the producer keeps the old
	/// link as its output.
	pub fn unlink(
		&mut self,
		from: NodeId,
		from_index: usize,
		to: NodeId,
		to_index: usize,
	) -> Result<(), E> {
		self.output_link(from, from_index)?;
		let input = self.input_link(to, to_index)?;
		if self.links[&input].from != Some(Endpoint::new(from, from_index)) {
			return Err(Error::NotConnected {
				from,
				from_index,
				to,
				to_index,
			});
		}

		self.sever(input);
		debug!(%from, from_index, %to, to_index, "unlinked");
		Ok(())
	}

	/// Removes a node after severing every connection it takes part in.
	/// The id counter is bumped so stale references stay detectable.
	pub fn remove_node(&mut self, id: NodeId) -> Result<(), E> {
		let node = self.nodes.remove(&id).ok_or(Error::NodeNotFound(id))?;

		for link in node.inputs {
			if self.links[&link].from.is_some() {
				// The producer keeps the connection link as its output.
				self.link_mut(link).to = None;
			} else {
				self.links.remove(&link);
			}
		}

		for link in node.outputs {
			if self.links[&link].to.is_some() {
				self.sever(link);
			}
			self.links.remove(&link);
		}

		self.allocate();
		debug!(node = %id, "removed node");
		Ok(())
	}

	/// Detaches the consumer of `id`, handing it a fresh default input.
	fn sever(&mut self, id: LinkId) {
		let Some(consumer) = self.link_mut(id).to.take() else {
			return;
		};

		let template = Rc::clone(&self.nodes[&consumer.node].template);
		let mut fresh = Link::from_template(LinkId(self.allocate()), &template.inputs()[consumer.index]);
		fresh.to = Some(consumer);

		self.node_mut(consumer.node).inputs[consumer.index] = fresh.id;
		self.links.insert(fresh.id, fresh);
	}
}
