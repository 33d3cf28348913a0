use std::rc::Rc;

use fxhash::FxHashMap;

use crate::{Error, Inputs, LinkTemplate};

/// Computes a node's outputs from its hydrated inputs.
pub type ComputeFn<T, M, E> = Box<dyn Fn(&Inputs<'_, T, M>) -> std::result::Result<Vec<T>, E>>;

/// Converts a value between two slot data types.
pub type CastFn<T, E> = Box<dyn Fn(&T) -> std::result::Result<T, E>>;

/// Immutable blueprint from which nodes are instantiated.
pub struct NodeTemplate<T, M, E> {
	compute: ComputeFn<T, M, E>,
	inputs: Vec<LinkTemplate<T, M>>,
	outputs: Vec<LinkTemplate<T, M>>,
	metadata: M,
}

impl<T, M, E> NodeTemplate<T, M, E> {
	pub fn new<F>(
		compute: F,
		inputs: Vec<LinkTemplate<T, M>>,
		outputs: Vec<LinkTemplate<T, M>>,
		metadata: M,
	) -> Self
	where
		F: Fn(&Inputs<'_, T, M>) -> std::result::Result<Vec<T>, E> + 'static,
	{
		NodeTemplate {
			compute: Box::new(compute),
			inputs,
			outputs,
			metadata,
		}
	}

	pub fn inputs(&self) -> &[LinkTemplate<T, M>] {
		&self.inputs
	}

	pub fn outputs(&self) -> &[LinkTemplate<T, M>] {
		&self.outputs
	}

	pub fn metadata(&self) -> &M {
		&self.metadata
	}

	pub(crate) fn compute(&self, inputs: &Inputs<'_, T, M>) -> std::result::Result<Vec<T>, E> {
		(self.compute)(inputs)
	}
}

/// Named catalog of node templates plus the conversions allowed between
/// slot data types.
pub struct TemplateTable<T, M, E> {
	templates: FxHashMap<String, Rc<NodeTemplate<T, M, E>>>,
	casts: FxHashMap<(String, String), CastFn<T, E>>,
}

impl<T, M, E> Default for TemplateTable<T, M, E> {
	fn default() -> Self {
		TemplateTable {
			templates: FxHashMap::default(),
			casts: FxHashMap::default(),
		}
	}
}

impl<T, M, E> TemplateTable<T, M, E> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `template` under `name`, replacing any previous entry.
	/// Nodes already created keep the template they were built from.
	pub fn add_template(&mut self, name: impl Into<String>, template: NodeTemplate<T, M, E>) {
		self.templates.insert(name.into(), Rc::new(template));
	}

	pub fn get_template(&self, name: &str) -> Result<&Rc<NodeTemplate<T, M, E>>, Error<E>> {
		self.templates
			.get(name)
			.ok_or_else(|| Error::TemplateNotFound(name.to_owned()))
	}

	/// Names of every registered template, sorted.
	pub fn names(&self) -> Vec<&str> {
		let mut names: Vec<&str> = self.templates.keys().map(String::as_str).collect();
		names.sort_unstable();
		names
	}

	pub fn add_cast<F>(&mut self, from: impl Into<String>, to: impl Into<String>, cast: F)
	where
		F: Fn(&T) -> std::result::Result<T, E> + 'static,
	{
		let key = (from.into().to_ascii_lowercase(), to.into().to_ascii_lowercase());
		self.casts.insert(key, Box::new(cast));
	}

	pub fn can_cast(&self, from: &str, to: &str) -> bool {
		from.eq_ignore_ascii_case(to) || self.casts.contains_key(&cast_key(from, to))
	}

	/// Converts `value` from `from` to `to`. Returns `None` when no
	/// conversion is needed (same type) or none is registered.
	pub(crate) fn cast(&self, from: &str, to: &str, value: &T) -> Option<std::result::Result<T, E>> {
		if from.eq_ignore_ascii_case(to) {
			return None;
		}
		self.casts.get(&cast_key(from, to)).map(|cast| cast(value))
	}
}

fn cast_key(from: &str, to: &str) -> (String, String) {
	(from.to_ascii_lowercase(), to.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn casts_ignore_case() {
		let mut table: TemplateTable<i64, (), String> = TemplateTable::new();
		table.add_cast("Celsius", "Kelvin", |c: &i64| Ok(c + 273));

		assert!(table.can_cast("celsius", "KELVIN"));
		assert!(table.can_cast("Kelvin", "kelvin"));
		assert!(!table.can_cast("kelvin", "celsius"));

		assert!(table.cast("kelvin", "Kelvin", &1).is_none());
		assert_eq!(table.cast("CELSIUS", "kelvin", &1).unwrap().unwrap(), 274);
	}

	#[test]
	fn missing_template() {
		let table: TemplateTable<i64, (), String> = TemplateTable::new();
		assert!(matches!(
			table.get_template("nope"),
			Err(Error::TemplateNotFound(name)) if name == "nope"
		));
		assert!(table.names().is_empty());
	}
}
