use std::rc::Rc;

use pictoflow::{Error, LinkId, MalformedLink, NodeId, Pipeline, SerializedPipeline, MAX_ID};
use serde_json::Value;

use crate::{arithmetic, init_tracing, pipeline, sum_pipeline};

fn restore(json: &str) -> pictoflow::Result<Pipeline<i64, (), String>, String> {
	init_tracing();
	Pipeline::from_json(json, Rc::new(arithmetic(None)))
}

#[test]
fn round_trip() {
	let (mut built, _, _) = sum_pipeline(None);
	let sub = built.create_node("subtract", ()).unwrap();
	built.set_input(sub, 1, 4).unwrap();
	assert_eq!(built.evaluate().unwrap(), vec![43]);

	let document = built.serialize();
	let json = document.to_json().unwrap();
	let mut restored = restore(&json).unwrap();

	assert_eq!(restored.serialize(), document);
	assert_eq!(restored.output_node(), built.output_node());
	assert_eq!(restored.evaluate().unwrap(), vec![43]);
	assert_eq!(restored.get_output(sub, 0).unwrap(), -4);
}

#[test]
fn only_set_values_are_written() {
	let mut pipeline = pipeline(None);
	let add = pipeline.create_node("add", ()).unwrap();
	assert_eq!(pipeline.get_output(add, 0).unwrap(), 0);

	let json: Value = serde_json::from_str(&pipeline.serialize().to_json().unwrap()).unwrap();
	let links = json["links"].as_array().unwrap();
	assert_eq!(links.len(), 3);
	assert!(links.iter().all(|link| link.get("defaultValue").is_none()));

	pipeline.set_input(add, 1, 5).unwrap();
	let document = pipeline.serialize();
	let custom: Vec<_> = document
		.links
		.iter()
		.filter_map(|link| link.default_value)
		.collect();
	assert_eq!(custom, vec![5]);
}

const WITH_BROKEN_LINK: &str = r#"{
	"nodes": [{ "id": 0, "template": "increment", "metadata": null }],
	"links": [
		{ "id": 1, "metadata": null, "defaultValue": 4, "to": { "node": 0, "index": 0 } },
		{ "id": 2, "metadata": null, "from": { "node": 0, "index": 0 } },
		{ "id": 3, "metadata": null, "from": { "node": 9, "index": 0 }, "to": { "node": 0, "index": 0 } }
	],
	"output": -1
}"#;

#[test]
fn malformed_links_are_skipped() {
	let document = SerializedPipeline::<i64, ()>::from_json(WITH_BROKEN_LINK).unwrap();
	assert_eq!(
		document.validate(),
		Err(MalformedLink {
			link: LinkId(3),
			node: NodeId(9),
		})
	);

	let strict: Error<String> = document.validate().unwrap_err().into();
	assert!(matches!(strict, Error::Malformed(MalformedLink { link: LinkId(3), .. })));

	let mut pipeline = restore(WITH_BROKEN_LINK).unwrap();
	assert!(pipeline.get_link(LinkId(3)).is_none());
	assert_eq!(pipeline.input_link(NodeId(0), 0).unwrap(), LinkId(1));
	assert_eq!(pipeline.output_link(NodeId(0), 0).unwrap(), LinkId(2));
	assert_eq!(pipeline.output_node(), None);
	assert_eq!(pipeline.get_output(NodeId(0), 0).unwrap(), 5);
}

#[test]
fn missing_output_fails_on_evaluate() {
	let mut pipeline = restore(r#"{ "nodes": [], "links": [], "output": 7 }"#).unwrap();
	assert!(matches!(
		pipeline.evaluate(),
		Err(Error::OutputNodeNotFound(Some(NodeId(7))))
	));

	let mut pipeline = restore(r#"{ "nodes": [], "links": [] }"#).unwrap();
	assert!(matches!(pipeline.evaluate(), Err(Error::OutputNodeNotFound(None))));
}

#[test]
fn unknown_template_aborts() {
	let result = restore(r#"{ "nodes": [{ "id": 0, "template": "nope", "metadata": null }], "links": [] }"#);
	assert!(matches!(result, Err(Error::TemplateNotFound(name)) if name == "nope"));

	assert!(matches!(restore("{ not json"), Err(Error::Json(_))));
}

#[test]
fn free_standing_links() {
	let json = r#"{
		"nodes": [],
		"links": [
			{ "id": 5, "metadata": null, "defaultValue": 11 },
			{ "id": 6, "metadata": null }
		]
	}"#;
	let mut pipeline = restore(json).unwrap();

	let link = pipeline.get_link(LinkId(5)).unwrap();
	assert_eq!(link.from(), None);
	assert_eq!(link.to(), None);
	assert!(link.is_custom());
	assert_eq!(pipeline.get(LinkId(5)).unwrap(), 11);
	assert!(pipeline.get_link(LinkId(6)).is_none());

	let document = pipeline.serialize();
	assert_eq!(document.links.len(), 1);
	assert_eq!(document.links[0].default_value, Some(11));
}

#[test]
fn restored_ids_stay_ahead_of_the_document() {
	let mut pipeline = restore(WITH_BROKEN_LINK).unwrap();
	assert!(pipeline.next_id() > 3);

	let fresh = pipeline.create_node("increment", ()).unwrap();
	assert!(fresh.0 > 3);
	pipeline.link(NodeId(0), 0, fresh, 0, ()).unwrap();
	assert_eq!(pipeline.get_output(fresh, 0).unwrap(), 6);
}

#[test]
fn round_trip_after_edits() {
	let mut built = pipeline(None);
	let a = built.create_node("input", ()).unwrap();
	let b = built.create_node("input", ()).unwrap();
	let inc = built.create_node("increment", ()).unwrap();
	let add = built.create_node("add", ()).unwrap();
	let out = built.create_node("output", ()).unwrap();

	let a_out = built.output_link(a, 0).unwrap();
	built.set(a_out, 42).unwrap();
	let b_out = built.output_link(b, 0).unwrap();
	built.set(b_out, 7).unwrap();

	built.link(a, 0, inc, 0, ()).unwrap();
	built.link(inc, 0, add, 0, ()).unwrap();
	built.link(b, 0, add, 1, ()).unwrap();
	built.link(add, 0, out, 0, ()).unwrap();
	assert_eq!(built.get_output(add, 0).unwrap(), 50);

	built.link(b, 0, inc, 0, ()).unwrap();
	built.unlink(inc, 0, add, 0).unwrap();
	built.set_input(add, 0, 9).unwrap();
	built.remove_node(out).unwrap();

	let document = built.serialize();
	assert!(document
		.links
		.iter()
		.any(|link| link.from.map(|end| end.node) == Some(a) && link.to.is_none()));
	assert!(document
		.links
		.iter()
		.any(|link| link.from.map(|end| end.node) == Some(add) && link.to.is_none()));

	let mut restored = restore(&document.to_json().unwrap()).unwrap();
	assert_eq!(restored.serialize(), document);
	assert_eq!(restored.get_output(inc, 0).unwrap(), built.get_output(inc, 0).unwrap());
	assert_eq!(restored.get_output(add, 0).unwrap(), built.get_output(add, 0).unwrap());
	assert_eq!(restored.get_output(add, 0).unwrap(), 9);
}

#[test]
fn out_of_range_ids_are_skipped() {
	let json = r#"{
		"nodes": [
			{ "id": 18446744073709551615, "template": "increment", "metadata": null },
			{ "id": 0, "template": "increment", "metadata": null }
		],
		"links": [
			{ "id": 18446744073709551615, "metadata": null, "defaultValue": 3 },
			{ "id": 1, "metadata": null, "defaultValue": 4, "to": { "node": 0, "index": 0 } }
		]
	}"#;
	let mut pipeline = restore(json).unwrap();

	assert!(pipeline.node(NodeId(u64::MAX)).is_none());
	assert!(pipeline.get_link(LinkId(u64::MAX)).is_none());
	assert!(pipeline.next_id() <= MAX_ID);
	assert_eq!(pipeline.get_output(NodeId(0), 0).unwrap(), 5);

	let fresh = pipeline.create_node("increment", ()).unwrap();
	assert!(fresh.0 > 1 && fresh.0 <= MAX_ID);
}
