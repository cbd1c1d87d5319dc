use crate::{
    compiler::{BlockKind, CompileOptions, ProcedureCache, Rule, compile, rule_for},
    graph::{BlockGraph, BlockNode},
    ir::{
        BroadcastTarget, Effect, Expr, Stmt, StopScope, TriggerKind, ValueMatch, VarRef,
        DICE_ROLL_SIGNAL,
    },
    runtime::value::Value,
    scene::TrackedProperty,
};

fn hat(id: &str, kind: &str, body: Vec<BlockNode>) -> BlockNode {
    let node = BlockNode::new(id, kind);
    match BlockNode::chain(body) {
        Some(first) => node.then(first),
        None => node,
    }
}

fn number(id: &str, n: &str) -> BlockNode {
    BlockNode::new(id, "math_number").field("NUM", n)
}

fn compile_one(blocks: Vec<BlockNode>) -> crate::ir::CompiledProcedure {
    compile(&BlockGraph::new(blocks), &CompileOptions::default()).unwrap()
}

#[test]
fn every_block_kind_round_trips_its_tag() {
    for kind in BlockKind::ALL {
        assert_eq!(BlockKind::parse(kind.tag()), Some(*kind));
        // Exhaustive by construction; touching each rule keeps it honest.
        let _ = rule_for(*kind).shape();
    }
}

#[test]
fn only_hats_with_a_body_become_handlers() {
    let procedure = compile_one(vec![
        hat("lonely", "event_immediately", vec![]),
        number("dangling", "4"),
        BlockNode::new("stray", "looks_hide"),
        hat("h1", "event_immediately", vec![BlockNode::new("s1", "looks_show")]),
    ]);

    assert_eq!(procedure.handlers.len(), 1);
    assert_eq!(procedure.handlers[0].descriptor.hat_id, "h1");
    assert_eq!(procedure.immediate().count(), 1);
}

#[test]
fn broadcast_hat_captures_name_at_compile_time() {
    let procedure = compile_one(vec![hat(
        "h",
        "event_whenbroadcastreceived",
        vec![BlockNode::new("hide", "looks_hide")],
    )
    .field("BROADCAST_OPTION", "X")]);

    let handler = &procedure.handlers[0];
    assert_eq!(
        handler.descriptor.kind,
        TriggerKind::Broadcast {
            name: "X".to_string()
        }
    );
    assert_eq!(&*handler.body, &[Stmt::Effect(Effect::SetVisible(false))]);
}

#[test]
fn hat_rules_are_only_recognised_at_top_level() {
    assert!(matches!(
        rule_for(BlockKind::EventWhenBroadcastReceived),
        Rule::Hat(_)
    ));
    let err = compile(
        &BlockGraph::new(vec![hat(
            "h",
            "event_immediately",
            vec![BlockNode::new("inner", "event_immediately")],
        )]),
        &CompileOptions::default(),
    )
    .unwrap_err();
    assert_eq!(err.code(), "E102");
    assert_eq!(err.block_id(), "inner");
}

#[test]
fn unknown_block_type_is_reported_wherever_it_appears() {
    let top = compile(
        &BlockGraph::new(vec![BlockNode::new("t", "motion_teleport")]),
        &CompileOptions::default(),
    )
    .unwrap_err();
    assert_eq!(top.code(), "E101");

    let nested = compile(
        &BlockGraph::new(vec![hat(
            "h",
            "event_immediately",
            vec![BlockNode::new("s", "motion_setx").input("X", BlockNode::new("r", "bogus"))],
        )]),
        &CompileOptions::default(),
    )
    .unwrap_err();
    assert_eq!(nested.code(), "E101");
    assert_eq!(nested.block_id(), "r");
}

#[test]
fn shape_mismatches_are_rejected() {
    let reporter_in_chain = compile(
        &BlockGraph::new(vec![hat("h", "event_immediately", vec![number("n", "1")])]),
        &CompileOptions::default(),
    )
    .unwrap_err();
    assert_eq!(reporter_in_chain.code(), "E102");

    let statement_in_slot = compile(
        &BlockGraph::new(vec![hat(
            "h",
            "event_immediately",
            vec![BlockNode::new("s", "motion_setx").input("X", BlockNode::new("w", "looks_hide"))],
        )]),
        &CompileOptions::default(),
    )
    .unwrap_err();
    assert_eq!(statement_in_slot.code(), "E102");
    assert_eq!(statement_in_slot.block_id(), "w");
}

#[test]
fn missing_and_invalid_fields_carry_their_codes() {
    let missing = compile(
        &BlockGraph::new(vec![hat(
            "h",
            "event_whenbroadcastreceived",
            vec![BlockNode::new("s", "looks_hide")],
        )]),
        &CompileOptions::default(),
    )
    .unwrap_err();
    assert_eq!(missing.code(), "E103");

    let invalid = compile(
        &BlockGraph::new(vec![hat(
            "h",
            "event_immediately",
            vec![BlockNode::new("s", "control_stop").field("STOP_OPTION", "everything")],
        )]),
        &CompileOptions::default(),
    )
    .unwrap_err();
    assert_eq!(invalid.code(), "E104");
    assert!(invalid.to_string().starts_with("[E104]"));
}

#[test]
fn empty_slots_take_the_neutral_default() {
    let procedure = compile_one(vec![hat(
        "h",
        "event_immediately",
        vec![
            BlockNode::new("a", "motion_gotoxy"),
            BlockNode::new("b", "looks_settext"),
            BlockNode::new("c", "control_if"),
        ],
    )]);

    let body = &procedure.handlers[0].body;
    assert_eq!(
        body[0],
        Stmt::Effect(Effect::GoTo {
            x: Expr::number(0.0),
            y: Expr::number(0.0),
        })
    );
    assert_eq!(body[1], Stmt::Effect(Effect::SetText(Expr::text(""))));
    assert_eq!(
        body[2],
        Stmt::If {
            condition: Expr::boolean(false),
            then_branch: vec![],
            else_branch: vec![],
        }
    );
}

#[test]
fn numeric_literals_go_through_finite_coercion() {
    let procedure = compile_one(vec![hat(
        "h",
        "event_immediately",
        vec![
            BlockNode::new("a", "motion_setx").input("X", number("n1", "12.5")),
            BlockNode::new("b", "motion_setx").input("X", number("n2", "abc")),
            BlockNode::new("c", "motion_setx").input("X", number("n3", "1e400")),
        ],
    )]);

    let xs: Vec<_> = procedure.handlers[0]
        .body
        .iter()
        .map(|stmt| match stmt {
            Stmt::Effect(Effect::SetX(Expr::Literal(Value::Number(n)))) => *n,
            other => panic!("unexpected {:?}", other),
        })
        .collect();
    assert_eq!(xs, vec![12.5, 0.0, 0.0]);
}

#[test]
fn variables_resolve_to_local_slots_or_shared_keys() {
    let graph = BlockGraph::new(vec![hat(
        "h",
        "event_immediately",
        vec![
            BlockNode::new("a", "data_setvariableto").field("VARIABLE", "score"),
            BlockNode::new("b", "data_changevariableby").field("VARIABLE", "round"),
            BlockNode::new("c", "data_changevariableby").field("VARIABLE", "score"),
        ],
    )]);
    let procedure = compile(&graph, &CompileOptions::with_globals(["round"])).unwrap();

    let vars: Vec<_> = procedure.handlers[0]
        .body
        .iter()
        .map(|stmt| match stmt {
            Stmt::SetVariable { var, .. } | Stmt::ChangeVariable { var, .. } => var.clone(),
            other => panic!("unexpected {:?}", other),
        })
        .collect();
    assert_eq!(
        vars,
        vec![VarRef::Local(0), VarRef::Global("round".into()), VarRef::Local(0)]
    );
    assert_eq!(procedure.locals, vec!["score".to_string()]);
}

#[test]
fn control_blocks_nest_their_substacks() {
    let procedure = compile_one(vec![hat(
        "h",
        "event_immediately",
        vec![
            BlockNode::new("loop", "control_repeat")
                .input("TIMES", number("n", "3"))
                .input("SUBSTACK", BlockNode::new("turn", "motion_turnright")),
            BlockNode::new("stop", "control_stop").field("STOP_OPTION", "other scripts in sprite"),
            BlockNode::new("send", "event_broadcastto")
                .field("TARGET", "ATTACHMENTS")
                .input(
                    "BROADCAST_INPUT",
                    BlockNode::new("menu", "event_broadcast_menu").field("BROADCAST_OPTION", "go"),
                ),
        ],
    )]);

    let body = &procedure.handlers[0].body;
    assert_eq!(
        body[0],
        Stmt::Repeat {
            times: Expr::number(3.0),
            body: vec![Stmt::Effect(Effect::Turn {
                degrees: Expr::number(0.0),
                clockwise: true,
            })],
        }
    );
    assert_eq!(body[1], Stmt::Stop(StopScope::OtherScriptsOnObject));
    assert_eq!(
        body[2],
        Stmt::Broadcast {
            message: Expr::text("go"),
            target: BroadcastTarget::Attachments,
        }
    );
}

#[test]
fn property_literals_are_typed_by_property() {
    let procedure = compile_one(vec![
        hat("a", "event_whenpropertybecomes", vec![BlockNode::new("s1", "looks_show")])
            .field("PROPERTY", "x")
            .field("VALUE", "10"),
        hat("b", "event_whenpropertybecomes", vec![BlockNode::new("s2", "looks_show")])
            .field("PROPERTY", "visible")
            .field("VALUE", "TRUE"),
        hat("c", "event_whendetached", vec![BlockNode::new("s3", "looks_show")]),
    ]);

    let kinds: Vec<_> = procedure
        .descriptors()
        .into_iter()
        .map(|d| d.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            TriggerKind::PropertyChanged {
                property: TrackedProperty::X,
                matcher: ValueMatch::Exactly(Value::Number(10.0)),
            },
            TriggerKind::PropertyChanged {
                property: TrackedProperty::Visible,
                matcher: ValueMatch::Exactly(Value::Bool(true)),
            },
            TriggerKind::PropertyChanged {
                property: TrackedProperty::AttachedTo,
                matcher: ValueMatch::Exactly(Value::Nothing),
            },
        ]
    );
}

#[test]
fn dice_hat_treats_blank_fields_as_wildcards() {
    let procedure = compile_one(vec![hat(
        "d",
        "extension_whendiceroll",
        vec![BlockNode::new("s", "looks_show")],
    )
    .field("DIE", "ANY")
    .field("VALUE", "6")]);

    match &procedure.handlers[0].descriptor.kind {
        TriggerKind::External { signal, criteria } => {
            assert_eq!(signal, DICE_ROLL_SIGNAL);
            assert_eq!(criteria["die"], ValueMatch::Any);
            assert_eq!(criteria["value"], ValueMatch::Exactly(Value::Number(6.0)));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn hash_depends_on_global_declarations() {
    let graph = BlockGraph::new(vec![hat(
        "h",
        "event_immediately",
        vec![BlockNode::new("s", "data_changevariableby").field("VARIABLE", "v")],
    )]);

    let local = compile(&graph, &CompileOptions::default()).unwrap();
    let global = compile(&graph, &CompileOptions::with_globals(["v"])).unwrap();
    assert_ne!(local.hash, global.hash);
}

#[test]
fn cache_reuses_procedures_for_identical_graphs() {
    let graph = BlockGraph::new(vec![hat(
        "h",
        "event_immediately",
        vec![BlockNode::new("s", "looks_hide")],
    )]);
    let options = CompileOptions::default();
    let mut cache = ProcedureCache::new();

    let first = cache.get_or_compile(&graph, &options).unwrap();
    let second = cache.get_or_compile(&graph, &options).unwrap();
    assert!(std::rc::Rc::ptr_eq(&first, &second));

    let stats = cache.stats();
    assert_eq!((stats.entries, stats.hits, stats.misses), (1, 1, 1));

    drop(first);
    drop(second);
    assert_eq!(cache.prune(), 1);
}
