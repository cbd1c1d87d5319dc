//! Node type → emission rule table.
//!
//! `rule_for` is an exhaustive match over [`BlockKind`], so adding a block
//! type without an emission rule fails the build.

use crate::{
    graph::BlockNode,
    ir::{
        ArithOp, BroadcastTarget, CompareOp, Effect, Expr, MathFn, ObjectProperty, Sensor, Stmt,
        TriggerKind, ZOrder,
    },
};

use super::{
    BlockKind, CompileError, CompileResult, Compiler,
    expression::{boolean_literal, menu_literal, number_literal, text_literal},
    hats,
    statement::{layer, locked, stop_scope},
};

pub type HatRule = fn(&Compiler, &BlockNode) -> CompileResult<TriggerKind>;
pub type StatementRule = fn(&mut Compiler, &BlockNode) -> CompileResult<Stmt>;
pub type ReporterRule = fn(&mut Compiler, &BlockNode) -> CompileResult<Expr>;

/// How one block type lowers into the IR. The variant doubles as the block's
/// shape: only hats start scripts, statements chain, reporters fill slots.
#[derive(Clone, Copy)]
pub enum Rule {
    Hat(HatRule),
    Statement(StatementRule),
    Reporter(ReporterRule),
}

impl Rule {
    pub fn shape(&self) -> &'static str {
        match self {
            Rule::Hat(_) => "hat",
            Rule::Statement(_) => "statement",
            Rule::Reporter(_) => "reporter",
        }
    }
}

fn effect(effect: Effect) -> CompileResult<Stmt> {
    Ok(Stmt::Effect(effect))
}

fn arith(c: &mut Compiler, b: &BlockNode, op: ArithOp) -> CompileResult<Expr> {
    Ok(Expr::Arith {
        op,
        left: c.boxed_number(b, "NUM1")?,
        right: c.boxed_number(b, "NUM2")?,
    })
}

fn compare(c: &mut Compiler, b: &BlockNode, op: CompareOp) -> CompileResult<Expr> {
    Ok(Expr::Compare {
        op,
        left: c.boxed_text(b, "OPERAND1")?,
        right: c.boxed_text(b, "OPERAND2")?,
    })
}

fn math_op(c: &mut Compiler, b: &BlockNode) -> CompileResult<Expr> {
    let raw = Compiler::required_field(b, "OPERATOR")?;
    let func = MathFn::parse(&raw).ok_or_else(|| CompileError::invalid_field(b, "OPERATOR", &raw))?;
    Ok(Expr::Math {
        func,
        operand: c.boxed_number(b, "NUM")?,
    })
}

fn property_of(c: &mut Compiler, b: &BlockNode) -> CompileResult<Expr> {
    let raw = Compiler::required_field(b, "PROPERTY")?;
    let property =
        ObjectProperty::parse(&raw).ok_or_else(|| CompileError::invalid_field(b, "PROPERTY", &raw))?;
    Ok(Expr::Sense(Sensor::PropertyOf {
        property,
        object: c.boxed_text(b, "OBJECT")?,
    }))
}

fn if_else(c: &mut Compiler, b: &BlockNode, with_else: bool) -> CompileResult<Stmt> {
    let condition = c.bool_input(b, "CONDITION")?;
    let then_branch = c.substack(b, "SUBSTACK")?;
    let else_branch = if with_else {
        c.substack(b, "SUBSTACK2")?
    } else {
        Vec::new()
    };
    Ok(Stmt::If {
        condition,
        then_branch,
        else_branch,
    })
}

pub fn rule_for(kind: BlockKind) -> Rule {
    use BlockKind as K;

    match kind {
        // hats
        K::EventImmediately => Rule::Hat(|_, _| Ok(TriggerKind::Immediately)),
        K::ControlStartAsClone => Rule::Hat(|_, _| Ok(TriggerKind::StartAsClone)),
        K::EventWhenBroadcastReceived => Rule::Hat(|_, b| hats::broadcast(b)),
        K::EventWhenPropertyChanged => Rule::Hat(|_, b| hats::property_changed(b)),
        K::EventWhenPropertyBecomes => Rule::Hat(|_, b| hats::property_becomes(b)),
        K::EventWhenAttached => Rule::Hat(|_, _| Ok(hats::attached())),
        K::EventWhenDetached => Rule::Hat(|_, _| Ok(hats::detached())),
        K::EventWhenSelected => Rule::Hat(|_, b| hats::selection(b)),
        K::EventWhenTouchingObject => Rule::Hat(|_, b| hats::touching(b)),
        K::ExtensionWhenDiceRoll => Rule::Hat(|_, b| hats::dice_roll(b)),
        K::ExtensionWhenPhaseChanged => Rule::Hat(|_, b| hats::phase_changed(b)),
        K::ExtensionWhenDoor => Rule::Hat(|_, b| hats::door(b)),

        // motion
        K::MotionGoToXY => Rule::Statement(|c, b| {
            effect(Effect::GoTo {
                x: c.number_input(b, "X")?,
                y: c.number_input(b, "Y")?,
            })
        }),
        K::MotionChangeXBy => Rule::Statement(|c, b| effect(Effect::ChangeX(c.number_input(b, "DX")?))),
        K::MotionChangeYBy => Rule::Statement(|c, b| effect(Effect::ChangeY(c.number_input(b, "DY")?))),
        K::MotionSetX => Rule::Statement(|c, b| effect(Effect::SetX(c.number_input(b, "X")?))),
        K::MotionSetY => Rule::Statement(|c, b| effect(Effect::SetY(c.number_input(b, "Y")?))),
        K::MotionTurnRight => Rule::Statement(|c, b| {
            effect(Effect::Turn {
                degrees: c.number_input(b, "DEGREES")?,
                clockwise: true,
            })
        }),
        K::MotionTurnLeft => Rule::Statement(|c, b| {
            effect(Effect::Turn {
                degrees: c.number_input(b, "DEGREES")?,
                clockwise: false,
            })
        }),
        K::MotionPointInDirection => Rule::Statement(|c, b| {
            effect(Effect::PointInDirection(c.number_input(b, "DIRECTION")?))
        }),
        K::MotionMoveSteps => Rule::Statement(|c, b| effect(Effect::MoveSteps(c.number_input(b, "STEPS")?))),
        K::MotionGlideSecsToXY => Rule::Statement(|c, b| {
            effect(Effect::Glide {
                seconds: c.number_input(b, "SECS")?,
                x: c.number_input(b, "X")?,
                y: c.number_input(b, "Y")?,
            })
        }),
        K::MotionGoToObject => Rule::Statement(|c, b| effect(Effect::GoToObject(c.text_input(b, "OBJECT")?))),
        K::MotionXPosition => Rule::Reporter(|_, _| Ok(Expr::Sense(Sensor::XPosition))),
        K::MotionYPosition => Rule::Reporter(|_, _| Ok(Expr::Sense(Sensor::YPosition))),
        K::MotionDirection => Rule::Reporter(|_, _| Ok(Expr::Sense(Sensor::Direction))),

        // looks
        K::LooksShow => Rule::Statement(|_, _| effect(Effect::SetVisible(true))),
        K::LooksHide => Rule::Statement(|_, _| effect(Effect::SetVisible(false))),
        K::LooksSetSizeTo => Rule::Statement(|c, b| effect(Effect::SetSize(c.number_input(b, "SIZE")?))),
        K::LooksChangeSizeBy => Rule::Statement(|c, b| effect(Effect::ChangeSize(c.number_input(b, "CHANGE")?))),
        K::LooksSetText => Rule::Statement(|c, b| effect(Effect::SetText(c.text_input(b, "TEXT")?))),
        K::LooksSetLayer => Rule::Statement(|_, b| effect(Effect::SetLayer(layer(b)?))),
        K::LooksGoToFront => Rule::Statement(|_, _| effect(Effect::Arrange(ZOrder::Front))),
        K::LooksGoToBack => Rule::Statement(|_, _| effect(Effect::Arrange(ZOrder::Back))),
        K::LooksSetLocked => Rule::Statement(|_, b| effect(Effect::SetLocked(locked(b)?))),
        K::LooksSize => Rule::Reporter(|_, _| Ok(Expr::Sense(Sensor::Size))),
        K::LooksText => Rule::Reporter(|_, _| Ok(Expr::Sense(Sensor::Text))),
        K::LooksVisible => Rule::Reporter(|_, _| Ok(Expr::Sense(Sensor::Visible))),

        // sound
        K::SoundPlay => Rule::Statement(|c, b| {
            effect(Effect::PlaySound {
                name: c.text_input(b, "SOUND_MENU")?,
                wait: false,
            })
        }),
        K::SoundPlayUntilDone => Rule::Statement(|c, b| {
            effect(Effect::PlaySound {
                name: c.text_input(b, "SOUND_MENU")?,
                wait: true,
            })
        }),
        K::SoundStopAllSounds => Rule::Statement(|_, _| effect(Effect::StopSounds)),
        K::SoundSoundsMenu => Rule::Reporter(|_, b| menu_literal(b, "SOUND_MENU")),

        // tags
        K::TagsAdd => Rule::Statement(|c, b| effect(Effect::AddTag(c.text_input(b, "TAG")?))),
        K::TagsRemove => Rule::Statement(|c, b| effect(Effect::RemoveTag(c.text_input(b, "TAG")?))),
        K::TagsHasTag => Rule::Reporter(|c, b| Ok(Expr::Sense(Sensor::HasTag(c.boxed_text(b, "TAG")?)))),

        // events
        K::EventBroadcast => Rule::Statement(|c, b| {
            Ok(Stmt::Broadcast {
                message: c.text_input(b, "BROADCAST_INPUT")?,
                target: BroadcastTarget::Everyone,
            })
        }),
        K::EventBroadcastTo => Rule::Statement(|c, b| {
            Ok(Stmt::Broadcast {
                message: c.text_input(b, "BROADCAST_INPUT")?,
                target: c.broadcast_target(b)?,
            })
        }),
        K::EventBroadcastMenu => Rule::Reporter(|_, b| menu_literal(b, "BROADCAST_OPTION")),

        // control
        K::ControlWait => Rule::Statement(|c, b| {
            Ok(Stmt::Wait {
                seconds: c.number_input(b, "DURATION")?,
            })
        }),
        K::ControlRepeat => Rule::Statement(|c, b| {
            Ok(Stmt::Repeat {
                times: c.number_input(b, "TIMES")?,
                body: c.substack(b, "SUBSTACK")?,
            })
        }),
        K::ControlForever => Rule::Statement(|c, b| {
            Ok(Stmt::Forever {
                body: c.substack(b, "SUBSTACK")?,
            })
        }),
        K::ControlIf => Rule::Statement(|c, b| if_else(c, b, false)),
        K::ControlIfElse => Rule::Statement(|c, b| if_else(c, b, true)),
        K::ControlWaitUntil => Rule::Statement(|c, b| {
            Ok(Stmt::WaitUntil {
                condition: c.bool_input(b, "CONDITION")?,
            })
        }),
        K::ControlRepeatUntil => Rule::Statement(|c, b| {
            Ok(Stmt::RepeatUntil {
                condition: c.bool_input(b, "CONDITION")?,
                body: c.substack(b, "SUBSTACK")?,
            })
        }),
        K::ControlStop => Rule::Statement(|_, b| Ok(Stmt::Stop(stop_scope(b)?))),
        K::ControlCreateCloneOfMyself => Rule::Statement(|_, _| effect(Effect::CloneSelf)),
        K::ControlDeleteThisClone => Rule::Statement(|_, _| effect(Effect::DeleteSelf)),

        // sensing
        K::SensingTouchingObject => Rule::Reporter(|c, b| {
            Ok(Expr::Sense(Sensor::Touching(c.boxed_text(b, "OBJECT")?)))
        }),
        K::SensingDistanceTo => Rule::Reporter(|c, b| {
            Ok(Expr::Sense(Sensor::DistanceTo(c.boxed_text(b, "OBJECT")?)))
        }),
        K::SensingOtherObject => Rule::Reporter(|_, _| Ok(Expr::Sense(Sensor::OtherObject))),
        K::SensingMyId => Rule::Reporter(|_, _| Ok(Expr::Sense(Sensor::MyId))),
        K::SensingOf => Rule::Reporter(property_of),
        K::SensingTimer => Rule::Reporter(|_, _| Ok(Expr::Sense(Sensor::Timer))),
        K::SensingObjectMenu => Rule::Reporter(|_, b| menu_literal(b, "OBJECT")),

        // operators
        K::OperatorAdd => Rule::Reporter(|c, b| arith(c, b, ArithOp::Add)),
        K::OperatorSubtract => Rule::Reporter(|c, b| arith(c, b, ArithOp::Sub)),
        K::OperatorMultiply => Rule::Reporter(|c, b| arith(c, b, ArithOp::Mul)),
        K::OperatorDivide => Rule::Reporter(|c, b| arith(c, b, ArithOp::Div)),
        K::OperatorMod => Rule::Reporter(|c, b| arith(c, b, ArithOp::Mod)),
        K::OperatorRandom => Rule::Reporter(|c, b| {
            Ok(Expr::Random {
                from: c.boxed_number(b, "FROM")?,
                to: c.boxed_number(b, "TO")?,
            })
        }),
        K::OperatorGt => Rule::Reporter(|c, b| compare(c, b, CompareOp::Gt)),
        K::OperatorLt => Rule::Reporter(|c, b| compare(c, b, CompareOp::Lt)),
        K::OperatorEquals => Rule::Reporter(|c, b| compare(c, b, CompareOp::Eq)),
        K::OperatorAnd => Rule::Reporter(|c, b| {
            Ok(Expr::And(c.boxed_bool(b, "OPERAND1")?, c.boxed_bool(b, "OPERAND2")?))
        }),
        K::OperatorOr => Rule::Reporter(|c, b| {
            Ok(Expr::Or(c.boxed_bool(b, "OPERAND1")?, c.boxed_bool(b, "OPERAND2")?))
        }),
        K::OperatorNot => Rule::Reporter(|c, b| Ok(Expr::Not(c.boxed_bool(b, "OPERAND")?))),
        K::OperatorJoin => Rule::Reporter(|c, b| {
            Ok(Expr::Join(c.boxed_text(b, "STRING1")?, c.boxed_text(b, "STRING2")?))
        }),
        K::OperatorLetterOf => Rule::Reporter(|c, b| {
            Ok(Expr::LetterOf {
                index: c.boxed_number(b, "LETTER")?,
                text: c.boxed_text(b, "STRING")?,
            })
        }),
        K::OperatorLength => Rule::Reporter(|c, b| Ok(Expr::Length(c.boxed_text(b, "STRING")?))),
        K::OperatorContains => Rule::Reporter(|c, b| {
            Ok(Expr::Contains {
                haystack: c.boxed_text(b, "STRING1")?,
                needle: c.boxed_text(b, "STRING2")?,
            })
        }),
        K::OperatorRound => Rule::Reporter(|c, b| Ok(Expr::Round(c.boxed_number(b, "NUM")?))),
        K::OperatorMathOp => Rule::Reporter(math_op),

        // data
        K::DataVariable => Rule::Reporter(|c, b| Ok(Expr::Variable(c.variable(b)?))),
        K::DataSetVariableTo => Rule::Statement(|c, b| {
            Ok(Stmt::SetVariable {
                var: c.variable(b)?,
                value: c.text_input(b, "VALUE")?,
            })
        }),
        K::DataChangeVariableBy => Rule::Statement(|c, b| {
            Ok(Stmt::ChangeVariable {
                var: c.variable(b)?,
                by: c.number_input(b, "VALUE")?,
            })
        }),

        // literals
        K::MathNumber | K::MathWholeNumber | K::MathPositiveNumber | K::MathAngle => {
            Rule::Reporter(|_, b| Ok(number_literal(b)))
        }
        K::Text => Rule::Reporter(|_, b| Ok(text_literal(b))),
        K::LogicBoolean => Rule::Reporter(|_, b| boolean_literal(b)),
    }
}
