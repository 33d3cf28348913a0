use std::rc::Rc;

use pictoflow::image::{image_templates, ImagePipeline, NodeData};
use pictoflow::tracker::ValueTracker;
use pictoflow::{NodeId, Pipeline};
use serde_json::Value;

use crate::init_tracing;
use crate::mock::MockOps;

fn editor() -> ImagePipeline<MockOps> {
	init_tracing();
	Pipeline::new(Rc::new(image_templates(Rc::new(MockOps::new()))))
}

#[test]
fn apply_writes_input_nodes() {
	let mut editor = editor();
	let input = editor.create_node("input", Value::Null).unwrap();
	let invert = editor.create_node("invert", Value::Null).unwrap();
	editor.link(input, 0, invert, 0, Value::Null).unwrap();

	let mut tracker = ValueTracker::new();
	assert!(tracker.is_empty());
	tracker.set_source_image(input, 10);
	tracker.set_source_image(invert, 11);
	tracker.set_source_image(NodeId(99), 12);

	assert_eq!(tracker.apply(&mut editor), 1);

	let source = editor.output_link(input, 0).unwrap();
	let link = editor.get_link(source).unwrap();
	assert_eq!(*link.value(), NodeData::StoredImage { id: 10 });
	assert!(link.is_custom());
	assert!(link.is_dirty());

	let untouched = editor.input_link(invert, 0).unwrap();
	assert_eq!(untouched, source);
	let output = editor.output_link(invert, 0).unwrap();
	assert_eq!(*editor.get_link(output).unwrap().value(), NodeData::Invalid);
}

#[test]
fn forget_and_removed_nodes() {
	let mut editor = editor();
	let first = editor.create_node("input", Value::Null).unwrap();
	let second = editor.create_node("input", Value::Null).unwrap();

	let mut tracker = ValueTracker::new();
	tracker.set_source_image(first, 1);
	tracker.set_source_image(second, 2);
	tracker.set_source_image(second, 3);
	assert_eq!(tracker.len(), 2);
	assert_eq!(tracker.source_image(second), Some(3));

	assert_eq!(tracker.forget(first), Some(1));
	assert_eq!(tracker.forget(first), None);

	editor.remove_node(second).unwrap();
	assert_eq!(tracker.apply(&mut editor), 0);
	assert_eq!(tracker.len(), 1);
}
