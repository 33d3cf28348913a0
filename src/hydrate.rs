use fxhash::FxHashSet;
use smallvec::SmallVec;
use tracing::{error, trace};

use crate::{Error, Hydration, Inputs, Link, LinkId, NodeId, Pipeline, Result, State};

impl<T, M, E> Pipeline<T, M, E>
where
	T: Clone,
	M: Clone,
{
	/// Pulls a link's value, recomputing its producer first if any of
	/// the producer's inputs changed.
	///
	/// A link without a consumer is clean afterwards. A link with a
	/// consumer stays dirty until that consumer recomputes, rather than
	/// being cleared by this read: the consumer decides whether to
	/// recompute by looking at its input flags after pulling, so a read
	/// from outside must not hide a change from it.
	pub fn get(&mut self, id: LinkId) -> Result<T, E> {
		self.pull_link(id, &mut FxHashSet::default())
	}

	pub fn get_input(&mut self, node: NodeId, index: usize) -> Result<T, E> {
		let link = self.input_link(node, index)?;
		self.get(link)
	}

	pub fn get_output(&mut self, node: NodeId, index: usize) -> Result<T, E> {
		let link = self.output_link(node, index)?;
		self.get(link)
	}

	/// Brings a node up to date.
	///
	/// Upstream producers are hydrated first. The compute function only
	/// runs when `force` is set or at least one input is dirty. Outputs
	/// are written only if the compute function succeeds with the
	/// declared number of values; otherwise the previous outputs stay
	/// and the inputs stay dirty so the next pull retries.
	pub fn hydrate(&mut self, id: NodeId, force: bool) -> Result<Hydration, E> {
		self.hydrate_node(id, force, &mut FxHashSet::default())
	}

	/// Hydrates the designated output node and returns its output values,
	/// or its input values when it is a sink without outputs.
	pub fn evaluate(&mut self) -> Result<Vec<T>, E> {
		let id = match self.output {
			Some(id) if self.nodes.contains_key(&id) => id,
			other => return Err(Error::OutputNodeNotFound(other)),
		};

		let mut visited = FxHashSet::default();
		self.hydrate_node(id, false, &mut visited)?;

		let node = &self.nodes[&id];
		if node.outputs.is_empty() {
			return Ok(node
				.inputs
				.iter()
				.map(|link| self.links[link].value.clone())
				.collect());
		}

		let outputs = node.outputs.clone();
		outputs
			.into_iter()
			.map(|link| self.pull_link(link, &mut visited))
			.collect()
	}

	/// `visited` holds the nodes already brought up to date during the
	/// current pull; each of them is hydrated at most once per pull.
	fn pull_link(&mut self, id: LinkId, visited: &mut FxHashSet<NodeId>) -> Result<T, E> {
		let from = self.links.get(&id).ok_or(Error::LinkNotFound(id))?.from;
		if let Some(from) = from {
			self.pull_node(from.node, visited)?;
		}

		let link = self.link_mut(id);
		if link.to.is_none() {
			link.state = State::Clean;
		}
		Ok(link.value.clone())
	}

	fn pull_node(&mut self, id: NodeId, visited: &mut FxHashSet<NodeId>) -> Result<(), E> {
		if !visited.contains(&id) {
			self.hydrate_node(id, false, visited)?;
		}
		Ok(())
	}

	fn hydrate_node(
		&mut self,
		id: NodeId,
		force: bool,
		visited: &mut FxHashSet<NodeId>,
	) -> Result<Hydration, E> {
		let inputs = self.nodes.get(&id).ok_or(Error::NodeNotFound(id))?.inputs.clone();
		visited.insert(id);

		for link in &inputs {
			let from = self.links[link].from;
			if let Some(from) = from {
				self.pull_node(from.node, visited)?;
			}
		}

		let dirty = inputs.iter().any(|link| self.links[link].is_dirty());
		if !force && !dirty {
			trace!(node = %id, "inputs clean");
			return Ok(Hydration::Unchanged);
		}

		let values = self.recompute(id, &inputs)?;

		let outputs = self.nodes[&id].outputs.clone();
		for (link, value) in outputs.iter().zip(values) {
			self.link_mut(*link).write(value);
		}
		for link in &inputs {
			self.link_mut(*link).state = State::Clean;
		}

		trace!(node = %id, forced = force, "recomputed");
		Ok(Hydration::Recomputed)
	}

	fn recompute(&self, id: NodeId, inputs: &[LinkId]) -> Result<Vec<T>, E> {
		let node = &self.nodes[&id];

		let mut converted: SmallVec<[Option<T>; 4]> = SmallVec::with_capacity(inputs.len());
		for link in inputs {
			converted.push(self.convert(&self.links[link])?);
		}

		let values = inputs
			.iter()
			.zip(&converted)
			.map(|(link, converted)| converted.as_ref().unwrap_or(&self.links[link].value))
			.collect();

		let outputs = node
			.template
			.compute(&Inputs::new(id, &node.metadata, values))
			.map_err(Error::Compute)?;

		let expected = node.template.outputs().len();
		if outputs.len() != expected {
			error!(
				node = %id,
				template = %node.name,
				expected,
				actual = outputs.len(),
				"compute function broke its declared arity"
			);
			return Err(Error::ArityMismatch {
				template: node.name.clone(),
				expected,
				actual: outputs.len(),
			});
		}

		Ok(outputs)
	}

	/// Applies the registered conversion when a connection crosses data
	/// types. `None` means the link's own value is used as is.
	fn convert(&self, link: &Link<T, M>) -> Result<Option<T>, E> {
		let (Some(from), Some(to)) = (link.from, link.to) else {
			return Ok(None);
		};

		match self
			.slot_types(from, to)
			.and_then(|(output, input)| self.templates.cast(output, input, &link.value))
		{
			Some(converted) => converted.map(Some).map_err(Error::Compute),
			None => Ok(None),
		}
	}
}
