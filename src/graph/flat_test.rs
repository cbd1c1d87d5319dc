use serde_json::json;

use crate::graph::{BlockGraph, BlockNode, FlatGraph, GraphError, ParentLink};

fn sample_graph() -> BlockGraph {
    let body = BlockNode::chain(vec![
        BlockNode::new("wait", "control_wait")
            .input("DURATION", BlockNode::new("n1", "math_number").field("NUM", 1)),
        BlockNode::new("hide", "looks_hide"),
    ]);
    let hat = BlockNode::new("hat", "event_whenbroadcastreceived")
        .field("BROADCAST_OPTION", "go")
        .then(body.unwrap());
    let stray = BlockNode::new("stray", "operator_add");
    BlockGraph::new(vec![hat, stray])
}

#[test]
fn flatten_writes_pre_order_parent_pointers() {
    let flat = FlatGraph::from_graph(&sample_graph());
    let ids: Vec<&str> = flat.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["hat", "wait", "n1", "hide", "stray"]);

    assert_eq!(flat.nodes[0].p, None);
    assert_eq!(flat.nodes[1].p, Some(ParentLink::Next("hat".into())));
    assert_eq!(
        flat.nodes[2].p,
        Some(ParentLink::Input("wait".into(), "DURATION".into()))
    );
    assert_eq!(flat.nodes[3].p, Some(ParentLink::Next("wait".into())));
}

#[test]
fn flat_form_converts_back_losslessly() {
    let graph = sample_graph();
    let flat = FlatGraph::from_graph(&graph);
    assert_eq!(flat.to_graph().unwrap(), graph);
}

#[test]
fn flat_json_uses_compact_parent_encoding() {
    let flat = FlatGraph::from_graph(&sample_graph());
    let encoded = serde_json::to_value(&flat).unwrap();
    assert_eq!(encoded["nodes"][2]["p"], json!(["wait", "DURATION"]));
    assert_eq!(encoded["nodes"][1]["p"], json!("hat"));
    assert!(encoded["nodes"][0].get("p").is_none());
}

#[test]
fn duplicate_ids_are_rejected() {
    let flat: FlatGraph = serde_json::from_value(json!({
        "nodes": [
            {"id": "a", "type": "looks_hide"},
            {"id": "a", "type": "looks_show"}
        ]
    }))
    .unwrap();
    assert!(matches!(flat.to_graph(), Err(GraphError::DuplicateId(id)) if id == "a"));
}

#[test]
fn unknown_parent_is_rejected() {
    let flat: FlatGraph = serde_json::from_value(json!({
        "nodes": [{"id": "a", "type": "looks_hide", "p": "ghost"}]
    }))
    .unwrap();
    assert!(matches!(flat.to_graph(), Err(GraphError::UnknownParent { .. })));
}

#[test]
fn two_successors_for_one_block_conflict() {
    let flat: FlatGraph = serde_json::from_value(json!({
        "nodes": [
            {"id": "a", "type": "event_immediately"},
            {"id": "b", "type": "looks_hide", "p": "a"},
            {"id": "c", "type": "looks_show", "p": "a"}
        ]
    }))
    .unwrap();
    assert!(matches!(flat.to_graph(), Err(GraphError::SlotConflict { .. })));
}

#[test]
fn parent_cycles_are_unreachable() {
    let flat: FlatGraph = serde_json::from_value(json!({
        "nodes": [
            {"id": "a", "type": "looks_hide", "p": "b"},
            {"id": "b", "type": "looks_show", "p": "a"}
        ]
    }))
    .unwrap();
    assert!(matches!(flat.to_graph(), Err(GraphError::Unreachable(_))));
}
