//! Node catalog for image pipelines.
//!
//! Pixel work is delegated to an [`ImageOps`] provider; this module only
//! wires the provider into templates and evaluates documents produced by
//! the editor.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::{compute, Error, Inputs, LinkTemplate, NodeTemplate, Pipeline, Result, TemplateTable};

pub const IMAGE: &str = "image";
pub const COLOR: &str = "color";
pub const NUMBER: &str = "number";

/// A value flowing through an image pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", bound(serialize = "", deserialize = ""))]
pub enum NodeData<I> {
	/// An image held by the image store, referenced by id.
	StoredImage { id: u64 },
	/// A decoded image handle. Only ever produced by compute functions.
	#[serde(skip)]
	Image(I),
	Color { color: String },
	Number { value: f64 },
	Invalid,
}

/// The image backend.
pub trait ImageOps {
	type Image: Clone;
	type Error: fmt::Display + fmt::Debug;

	fn load(&self, id: u64) -> std::result::Result<Self::Image, Self::Error>;
	fn invert(&self, image: &Self::Image) -> std::result::Result<Self::Image, Self::Error>;
	fn composite(
		&self,
		top: &Self::Image,
		bottom: &Self::Image,
	) -> std::result::Result<Self::Image, Self::Error>;
	fn brightness_contrast(
		&self,
		image: &Self::Image,
		brightness: f64,
		contrast: f64,
	) -> std::result::Result<Self::Image, Self::Error>;
	fn gaussian_blur(
		&self,
		image: &Self::Image,
		std_dev_x: f64,
		std_dev_y: f64,
	) -> std::result::Result<Self::Image, Self::Error>;
	fn solid_color(&self, color: &str) -> std::result::Result<Self::Image, Self::Error>;
}

#[derive(thiserror::Error, Debug)]
pub enum ImageError<E> {
	#[error("input {slot} does not hold an image")]
	NotAnImage { slot: usize },
	#[error("input {slot} does not hold a number")]
	NotANumber { slot: usize },
	#[error("value is not a color")]
	NotAColor,
	#[error("image operation failed: {0}")]
	Operation(E),
}

pub type Metadata = Value;
pub type ImageData<O> = NodeData<<O as ImageOps>::Image>;
pub type ImageTemplates<O> = TemplateTable<ImageData<O>, Metadata, ImageError<<O as ImageOps>::Error>>;
pub type ImagePipeline<O> = Pipeline<ImageData<O>, Metadata, ImageError<<O as ImageOps>::Error>>;

fn load<O: ImageOps>(
	ops: &O,
	data: Option<&ImageData<O>>,
	slot: usize,
) -> std::result::Result<O::Image, ImageError<O::Error>> {
	match data {
		Some(NodeData::Image(image)) => Ok(image.clone()),
		Some(NodeData::StoredImage { id }) => ops.load(*id).map_err(ImageError::Operation),
		_ => Err(ImageError::NotAnImage { slot }),
	}
}

fn number<O: ImageOps>(
	inputs: &Inputs<'_, ImageData<O>, Metadata>,
	slot: usize,
) -> std::result::Result<f64, ImageError<O::Error>> {
	match inputs.get(slot) {
		Some(NodeData::Number { value }) => Ok(*value),
		_ => Err(ImageError::NotANumber { slot }),
	}
}

fn slot<I>(title: &str, data_type: &str, default: NodeData<I>) -> LinkTemplate<NodeData<I>, Metadata> {
	LinkTemplate::new(json!({ "title": title }), default).typed(data_type)
}

fn meta(name: &str, category: &str) -> Metadata {
	json!({ "name": name, "category": category })
}

/// Builds the template table understood by the editor, backed by `ops`.
pub fn image_templates<O>(ops: Rc<O>) -> ImageTemplates<O>
where
	O: ImageOps + 'static,
{
	let mut table: ImageTemplates<O> = TemplateTable::new();

	// Input nodes only ever carry values written into their output link.
	table.add_template(
		"input",
		NodeTemplate::new(
			compute!(_inputs => Ok(vec![NodeData::Invalid])),
			vec![],
			vec![slot("Input Image", IMAGE, NodeData::Invalid)],
			meta("Image Input", "Input"),
		),
	);

	table.add_template(
		"color-input",
		NodeTemplate::new(
			compute!(_inputs => Ok(vec![NodeData::Invalid])),
			vec![],
			vec![slot(
				"Input Color",
				COLOR,
				NodeData::Color {
					color: "#FF00FF".to_owned(),
				},
			)],
			meta("Color Input", "Input"),
		),
	);

	table.add_template(
		"output",
		NodeTemplate::new(
			compute!(inputs => Ok(vec![inputs[0].clone()])),
			vec![slot("Viewport", IMAGE, NodeData::Invalid)],
			vec![slot("Result", IMAGE, NodeData::Invalid)],
			meta("Output", "Output"),
		),
	);

	table.add_template(
		"invert",
		NodeTemplate::new(
			compute!((ops) inputs => {
				let image = load(&*ops, inputs.get(0), 0)?;
				let inverted = ops.invert(&image).map_err(ImageError::Operation)?;
				Ok(vec![NodeData::Image(inverted)])
			}),
			vec![slot("Image", IMAGE, NodeData::Invalid)],
			vec![slot("Inverted Image", IMAGE, NodeData::Invalid)],
			meta("Invert", "Filters"),
		),
	);

	table.add_template(
		"composite",
		NodeTemplate::new(
			compute!((ops) inputs => {
				let top = load(&*ops, inputs.get(0), 0)?;
				let bottom = load(&*ops, inputs.get(1), 1)?;
				let composed = ops.composite(&top, &bottom).map_err(ImageError::Operation)?;
				Ok(vec![NodeData::Image(composed)])
			}),
			vec![
				slot("Top Image", IMAGE, NodeData::Invalid),
				slot("Bottom Image", IMAGE, NodeData::Invalid),
			],
			vec![slot("Composite Image", IMAGE, NodeData::Invalid)],
			meta("Composite", "Composites"),
		),
	);

	table.add_template(
		"brightness-contrast",
		NodeTemplate::new(
			compute!((ops) inputs => {
				let image = load(&*ops, inputs.get(0), 0)?;
				let brightness = number::<O>(inputs, 1)?;
				let contrast = number::<O>(inputs, 2)?;
				let adjusted = ops
					.brightness_contrast(&image, brightness, contrast)
					.map_err(ImageError::Operation)?;
				Ok(vec![NodeData::Image(adjusted)])
			}),
			vec![
				slot("Image", IMAGE, NodeData::Invalid),
				slot("Brightness", NUMBER, NodeData::Number { value: 0.0 }),
				slot("Contrast", NUMBER, NodeData::Number { value: 1.0 }),
			],
			vec![slot("Adjusted Image", IMAGE, NodeData::Invalid)],
			meta("Brightness / Contrast", "Filters"),
		),
	);

	table.add_template(
		"gaussian-blur",
		NodeTemplate::new(
			compute!((ops) inputs => {
				let image = load(&*ops, inputs.get(0), 0)?;
				let x = number::<O>(inputs, 1)?;
				let y = number::<O>(inputs, 2)?;
				let blurred = ops.gaussian_blur(&image, x, y).map_err(ImageError::Operation)?;
				Ok(vec![NodeData::Image(blurred)])
			}),
			vec![
				slot("Image", IMAGE, NodeData::Invalid),
				slot("Standard Deviation X", NUMBER, NodeData::Number { value: 1.5 }),
				slot("Standard Deviation Y", NUMBER, NodeData::Number { value: 1.5 }),
			],
			vec![slot("Blurred Image", IMAGE, NodeData::Invalid)],
			meta("Gaussian Blur", "Filters"),
		),
	);

	table.add_cast(COLOR, IMAGE, move |data: &ImageData<O>| match data {
		NodeData::Color { color } => ops
			.solid_color(color)
			.map(NodeData::Image)
			.map_err(ImageError::Operation),
		_ => Err(ImageError::NotAColor),
	});

	table
}

/// Evaluates an editor document and returns the image reaching its
/// output node.
pub fn process<O>(document: &str, ops: Rc<O>) -> Result<O::Image, ImageError<O::Error>>
where
	O: ImageOps + 'static,
{
	let templates = Rc::new(image_templates(Rc::clone(&ops)));
	let mut pipeline = ImagePipeline::<O>::from_json(document, templates)?;
	debug!(output = ?pipeline.output_node(), "processing pipeline");

	let values = pipeline.evaluate()?;
	load(&*ops, values.first(), 0).map_err(Error::Compute)
}
