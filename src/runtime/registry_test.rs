use std::{rc::Rc, time::Duration};

use indexmap::IndexMap;
use serde_json::Value as Json;
use tokio::task::LocalSet;

use super::{
    collision::CollisionPair, registry::TriggerRegistry, services::Services, value::Value,
};
use crate::{
    config::SessionConfig,
    graph::{BlockGraph, BlockNode},
    ir::{CollisionPhase, DICE_ROLL_SIGNAL},
    scene::{Host, MemoryScene, ObjectStore, SceneObject, TrackedProperty},
};

fn setup(objects: Vec<SceneObject>, config: SessionConfig) -> (Rc<MemoryScene>, TriggerRegistry) {
    let scene = Rc::new(MemoryScene::with_objects(objects));
    let services = Services::new(
        config,
        Rc::clone(&scene) as Rc<dyn ObjectStore>,
        Rc::clone(&scene) as Rc<dyn Host>,
    );
    (scene, TriggerRegistry::new(Rc::new(services)))
}

fn hat(id: &str, kind: &str, body: Vec<BlockNode>) -> BlockNode {
    let node = BlockNode::new(id, kind);
    match BlockNode::chain(body) {
        Some(first) => node.then(first),
        None => node,
    }
}

fn on_broadcast(id: &str, name: &str, body: Vec<BlockNode>) -> BlockNode {
    hat(id, "event_whenbroadcastreceived", body).field("BROADCAST_OPTION", name)
}

fn number(n: &str) -> BlockNode {
    BlockNode::new(format!("n{}", n), "math_number").field("NUM", n)
}

fn text(s: &str) -> BlockNode {
    BlockNode::new(format!("t{}", s), "text").field("TEXT", s)
}

fn set_text(id: &str, value: BlockNode) -> BlockNode {
    BlockNode::new(id, "looks_settext").input("TEXT", value)
}

fn wait(id: &str, seconds: &str) -> BlockNode {
    BlockNode::new(id, "control_wait").input("DURATION", number(seconds))
}

fn change_x(id: &str, by: &str) -> BlockNode {
    BlockNode::new(id, "motion_changexby").input("DX", number(by))
}

fn graph(blocks: Vec<BlockNode>) -> BlockGraph {
    BlockGraph::new(blocks)
}

async fn settle() {
    tokio::time::sleep(Duration::from_secs(5)).await;
}

#[tokio::test(start_paused = true)]
async fn immediate_handlers_run_on_install() {
    let (scene, registry) = setup(vec![SceneObject::new("piece")], SessionConfig::default());
    let piece = scene.object("piece").unwrap();

    LocalSet::new()
        .run_until(async {
            let started = registry
                .start_behavior(
                    &piece,
                    &graph(vec![hat("h", "event_immediately", vec![BlockNode::new("s", "looks_hide")])]),
                    1,
                    None,
                )
                .unwrap();
            assert_eq!(started, 1);
            assert_eq!(registry.installed_version("piece"), Some(1));
            assert!(registry.is_running("piece", "h"));

            settle().await;
            assert!(!scene.object("piece").unwrap().visible);
            assert_eq!(registry.live_count(), 0);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn broadcasts_reach_matching_handlers_in_installation_order() {
    let (scene, registry) = setup(
        vec![SceneObject::new("b"), SceneObject::new("a"), SceneObject::new("c")],
        SessionConfig::default(),
    );

    LocalSet::new()
        .run_until(async {
            for id in ["b", "a"] {
                let object = scene.object(id).unwrap();
                let behavior = graph(vec![
                    on_broadcast("go", "go", vec![set_text("s1", text("went"))]),
                    on_broadcast("other", "other", vec![set_text("s2", text("wrong"))]),
                ]);
                registry.start_behavior(&object, &behavior, 1, None).unwrap();
            }
            assert_eq!(registry.get_behavior_item_ids(), ["b", "a"]);

            assert_eq!(registry.dispatch_broadcast("go", None), 2);
            assert_eq!(registry.dispatch_broadcast("nobody", None), 0);
            settle().await;

            assert_eq!(scene.object("a").unwrap().text, "went");
            assert_eq!(scene.object("b").unwrap().text, "went");
            assert_eq!(scene.object("c").unwrap().text, "");
            // Both writes went out in one batch, in dispatch order.
            assert_eq!(scene.update_calls(), vec![vec!["b".to_string(), "a".to_string()]]);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn targeted_broadcast_only_reaches_listed_objects() {
    let (scene, registry) = setup(
        vec![SceneObject::new("a"), SceneObject::new("b")],
        SessionConfig::default(),
    );

    LocalSet::new()
        .run_until(async {
            for id in ["a", "b"] {
                let object = scene.object(id).unwrap();
                let behavior = graph(vec![on_broadcast("h", "ping", vec![set_text("s", text("pong"))])]);
                registry.start_behavior(&object, &behavior, 1, None).unwrap();
            }
            let targets = vec!["b".to_string()];
            assert_eq!(registry.dispatch_broadcast("ping", Some(&targets)), 1);
            settle().await;

            assert_eq!(scene.object("a").unwrap().text, "");
            assert_eq!(scene.object("b").unwrap().text, "pong");
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn retriggering_cancels_only_the_previous_run() {
    let (scene, registry) = setup(vec![SceneObject::new("piece")], SessionConfig::default());
    let piece = scene.object("piece").unwrap();

    LocalSet::new()
        .run_until(async {
            let behavior = graph(vec![on_broadcast(
                "h",
                "go",
                vec![wait("w", "1"), change_x("c", "10")],
            )]);
            registry.start_behavior(&piece, &behavior, 1, None).unwrap();

            for _ in 0..3 {
                assert_eq!(registry.dispatch_broadcast("go", None), 1);
            }
            assert_eq!(registry.live_count(), 1);
            settle().await;

            assert_eq!(scene.object("piece").unwrap().position.x, 10.0);
            assert_eq!(scene.update_calls().len(), 1);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn stop_for_item_can_spare_one_handler() {
    let (scene, registry) = setup(vec![SceneObject::new("piece")], SessionConfig::default());
    let piece = scene.object("piece").unwrap();

    LocalSet::new()
        .run_until(async {
            let forever = |id: &str| {
                hat(
                    id,
                    "event_immediately",
                    vec![BlockNode::new(format!("{}-loop", id), "control_forever")
                        .input("SUBSTACK", wait(&format!("{}-w", id), "0.5"))],
                )
            };
            let behavior = graph(vec![forever("keep"), forever("drop")]);
            assert_eq!(registry.start_behavior(&piece, &behavior, 1, None).unwrap(), 2);
            tokio::time::sleep(Duration::from_millis(100)).await;

            assert_eq!(registry.stop_behaviors_for_item("piece", Some("keep")), 1);
            assert!(registry.is_running("piece", "keep"));
            assert_eq!(registry.descriptors("piece").len(), 1);

            assert_eq!(registry.stop_all(), 1);
            assert!(registry.get_behavior_item_ids().is_empty());
            assert_eq!(registry.stop_behaviors_for_item("piece", None), 0);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn compile_errors_leave_the_object_without_handlers() {
    let (scene, registry) = setup(vec![SceneObject::new("piece")], SessionConfig::default());
    let piece = scene.object("piece").unwrap();

    LocalSet::new()
        .run_until(async {
            let good = graph(vec![on_broadcast("h", "go", vec![BlockNode::new("s", "looks_hide")])]);
            registry.start_behavior(&piece, &good, 1, None).unwrap();

            let bad = graph(vec![hat("h", "event_immediately", vec![BlockNode::new("x", "no_such_block")])]);
            let err = registry.start_behavior(&piece, &bad, 2, None).unwrap_err();
            assert_eq!(err.code(), "E101");
            assert!(registry.get_behavior_item_ids().is_empty());
            assert_eq!(registry.dispatch_broadcast("go", None), 0);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn reinstall_keeps_the_excepted_run_alive() {
    let (scene, registry) = setup(vec![SceneObject::new("piece")], SessionConfig::default());
    let piece = scene.object("piece").unwrap();

    LocalSet::new()
        .run_until(async {
            let behavior = graph(vec![on_broadcast(
                "slow",
                "go",
                vec![wait("w", "1"), set_text("s", text("finished"))],
            )]);
            registry.start_behavior(&piece, &behavior, 1, None).unwrap();
            registry.dispatch_broadcast("go", None);
            tokio::time::sleep(Duration::from_millis(100)).await;

            registry.start_behavior(&piece, &behavior, 2, Some("slow")).unwrap();
            assert!(registry.is_running("piece", "slow"));
            assert_eq!(registry.installed_version("piece"), Some(2));

            settle().await;
            assert_eq!(scene.object("piece").unwrap().text, "finished");
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn excepted_run_shares_locals_with_the_reinstalled_handlers() {
    let (scene, registry) = setup(vec![SceneObject::new("piece")], SessionConfig::default());
    let piece = scene.object("piece").unwrap();

    LocalSet::new()
        .run_until(async {
            let behavior = graph(vec![
                on_broadcast(
                    "slow",
                    "go",
                    vec![
                        wait("w", "1"),
                        BlockNode::new("set", "data_setvariableto")
                            .field("VARIABLE", "count")
                            .input("VALUE", text("5")),
                    ],
                ),
                on_broadcast(
                    "report",
                    "report",
                    vec![set_text(
                        "show",
                        BlockNode::new("read", "data_variable").field("VARIABLE", "count"),
                    )],
                ),
            ]);
            registry.start_behavior(&piece, &behavior, 1, None).unwrap();
            registry.dispatch_broadcast("go", None);
            tokio::time::sleep(Duration::from_millis(100)).await;

            registry.start_behavior(&piece, &behavior, 2, Some("slow")).unwrap();
            settle().await;

            assert_eq!(registry.dispatch_broadcast("report", None), 1);
            settle().await;
            assert_eq!(scene.object("piece").unwrap().text, "5");
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn collisions_fire_both_sides_with_the_other_object() {
    let (scene, registry) = setup(
        vec![SceneObject::new("a"), SceneObject::new("b")],
        SessionConfig::default(),
    );

    LocalSet::new()
        .run_until(async {
            for id in ["a", "b"] {
                let object = scene.object(id).unwrap();
                let behavior = graph(vec![hat(
                    "touch",
                    "event_whentouchingobject",
                    vec![set_text("s", BlockNode::new("other", "sensing_otherobject"))],
                )
                .field("STATE", "START")]);
                registry.start_behavior(&object, &behavior, 1, None).unwrap();
            }

            let pair = CollisionPair::new("b", "a");
            assert_eq!(registry.dispatch_collision(&pair, CollisionPhase::End), 0);
            assert_eq!(registry.dispatch_collision(&pair, CollisionPhase::Start), 2);
            settle().await;

            assert_eq!(scene.object("a").unwrap().text, "b");
            assert_eq!(scene.object("b").unwrap().text, "a");
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn property_and_external_triggers_match_their_criteria() {
    let (scene, registry) = setup(vec![SceneObject::new("piece")], SessionConfig::default());
    let piece = scene.object("piece").unwrap();

    LocalSet::new()
        .run_until(async {
            let behavior = graph(vec![
                hat("hidden", "event_whenpropertybecomes", vec![set_text("s1", text("hidden"))])
                    .field("PROPERTY", "visible")
                    .field("VALUE", "false"),
                hat("six", "extension_whendiceroll", vec![set_text("s2", text("six"))])
                    .field("DIE", "d6")
                    .field("VALUE", "6"),
            ]);
            registry.start_behavior(&piece, &behavior, 1, None).unwrap();

            assert_eq!(
                registry.dispatch_property_changed("piece", TrackedProperty::Visible, &Value::Bool(true)),
                0
            );
            assert_eq!(
                registry.dispatch_property_changed("piece", TrackedProperty::Visible, &Value::Bool(false)),
                1
            );
            settle().await;
            assert_eq!(scene.object("piece").unwrap().text, "hidden");

            let mut payload = IndexMap::new();
            payload.insert("die".to_string(), Value::text("d6"));
            payload.insert("value".to_string(), Value::Number(3.0));
            assert_eq!(registry.dispatch_external(DICE_ROLL_SIGNAL, None, &payload), 0);
            payload.insert("value".to_string(), Value::Number(6.0));
            assert_eq!(registry.dispatch_external(DICE_ROLL_SIGNAL, None, &payload), 1);
            settle().await;
            assert_eq!(scene.object("piece").unwrap().text, "six");
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn fresh_clones_run_start_as_clone_once_and_lose_the_flag() {
    let config = SessionConfig::default();
    let flag = config.clone_flag_key.clone();
    let clone = SceneObject::new("piece-1").with_metadata(flag.clone(), Json::Bool(true));
    let (scene, registry) = setup(vec![clone], config);
    let clone = scene.object("piece-1").unwrap();

    LocalSet::new()
        .run_until(async {
            let behavior = graph(vec![hat(
                "as-clone",
                "control_start_as_clone",
                vec![change_x("c", "5")],
            )]);
            assert_eq!(registry.start_behavior(&clone, &behavior, 1, None).unwrap(), 1);
            settle().await;

            let after = scene.object("piece-1").unwrap();
            assert_eq!(after.position.x, 5.0);
            assert!(!after.metadata.contains_key(&flag));

            // Reinstalling from the updated object does not rerun it.
            assert_eq!(registry.start_behavior(&after, &behavior, 2, None).unwrap(), 0);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn exhausted_loop_guard_is_reported_to_the_host() {
    let (scene, registry) = setup(
        vec![SceneObject::new("piece")],
        SessionConfig::default().with_loop_guard(3),
    );
    let piece = scene.object("piece").unwrap();

    LocalSet::new()
        .run_until(async {
            let behavior = graph(vec![hat(
                "h",
                "event_immediately",
                vec![BlockNode::new("r", "control_repeat")
                    .input("TIMES", number("10"))
                    .input("SUBSTACK", change_x("c", "1"))],
            )]);
            registry.start_behavior(&piece, &behavior, 1, None).unwrap();
            settle().await;

            assert_eq!(scene.object("piece").unwrap().position.x, 3.0);
            let notifications = scene.notifications();
            assert_eq!(notifications.len(), 1);
            assert!(notifications[0].contains("exhausted loop iterations"));
            assert!(!registry.is_running("piece", "h"));
        })
        .await;
}
