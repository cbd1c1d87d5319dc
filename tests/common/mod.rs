#![allow(dead_code)]

use std::{rc::Rc, time::Duration};

use piecescript::{
    config::SessionConfig,
    graph::{BehaviorRecord, BlockGraph, BlockNode},
    runtime::{registry::TriggerRegistry, services::Services},
    scene::{Host, MemoryScene, ObjectStore, SceneObject},
    session::Session,
};

pub fn hat(id: &str, kind: &str, body: Vec<BlockNode>) -> BlockNode {
    let node = BlockNode::new(id, kind);
    match BlockNode::chain(body) {
        Some(first) => node.then(first),
        None => node,
    }
}

pub fn on_broadcast(id: &str, name: &str, body: Vec<BlockNode>) -> BlockNode {
    hat(id, "event_whenbroadcastreceived", body).field("BROADCAST_OPTION", name)
}

pub fn number(id: &str, n: impl Into<serde_json::Value>) -> BlockNode {
    BlockNode::new(id, "math_number").field("NUM", n)
}

pub fn text(id: &str, s: &str) -> BlockNode {
    BlockNode::new(id, "text").field("TEXT", s)
}

pub fn statement(id: &str, kind: &str) -> BlockNode {
    BlockNode::new(id, kind)
}

pub fn graph(blocks: Vec<BlockNode>) -> BlockGraph {
    BlockGraph::new(blocks)
}

/// A collidable square piece.
pub fn piece(id: &str, x: f64, y: f64) -> SceneObject {
    SceneObject::new(id)
        .with_position(x, y)
        .with_size(10.0, 10.0)
        .with_layer("PROP")
}

/// Attaches a stored behavior to `object` under the default key.
pub fn with_behavior(object: SceneObject, version: u64, graph: &BlockGraph) -> SceneObject {
    let key = SessionConfig::default().behavior_key;
    object.with_metadata(key, BehaviorRecord::new(version, graph).to_json())
}

pub fn registry_on(scene: &Rc<MemoryScene>, config: SessionConfig) -> TriggerRegistry {
    let services = Services::new(
        config,
        Rc::clone(scene) as Rc<dyn ObjectStore>,
        Rc::clone(scene) as Rc<dyn Host>,
    );
    TriggerRegistry::new(Rc::new(services))
}

pub fn session_on(scene: &Rc<MemoryScene>, config: SessionConfig) -> Session {
    Session::new(
        config,
        Rc::clone(scene) as Rc<dyn ObjectStore>,
        Rc::clone(scene) as Rc<dyn Host>,
    )
}

/// Lets every pending execution and flush run to completion under paused
/// time.
pub async fn settle() {
    tokio::time::sleep(Duration::from_secs(5)).await;
}
