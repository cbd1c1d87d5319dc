//! The closed set of block types the compiler understands.

macro_rules! block_kinds {
    ($($variant:ident => $tag:literal,)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum BlockKind {
            $($variant,)*
        }

        impl BlockKind {
            pub const ALL: &'static [BlockKind] = &[$(BlockKind::$variant,)*];

            pub fn parse(tag: &str) -> Option<Self> {
                match tag {
                    $($tag => Some(BlockKind::$variant),)*
                    _ => None,
                }
            }

            pub fn tag(self) -> &'static str {
                match self {
                    $(BlockKind::$variant => $tag,)*
                }
            }
        }
    };
}

block_kinds! {
    // hats
    EventImmediately => "event_immediately",
    ControlStartAsClone => "control_start_as_clone",
    EventWhenBroadcastReceived => "event_whenbroadcastreceived",
    EventWhenPropertyChanged => "event_whenpropertychanged",
    EventWhenPropertyBecomes => "event_whenpropertybecomes",
    EventWhenAttached => "event_whenattached",
    EventWhenDetached => "event_whendetached",
    EventWhenSelected => "event_whenselected",
    EventWhenTouchingObject => "event_whentouchingobject",
    ExtensionWhenDiceRoll => "extension_whendiceroll",
    ExtensionWhenPhaseChanged => "extension_whenphasechanged",
    ExtensionWhenDoor => "extension_whendoor",

    // motion
    MotionGoToXY => "motion_gotoxy",
    MotionChangeXBy => "motion_changexby",
    MotionChangeYBy => "motion_changeyby",
    MotionSetX => "motion_setx",
    MotionSetY => "motion_sety",
    MotionTurnRight => "motion_turnright",
    MotionTurnLeft => "motion_turnleft",
    MotionPointInDirection => "motion_pointindirection",
    MotionMoveSteps => "motion_movesteps",
    MotionGlideSecsToXY => "motion_glidesecstoxy",
    MotionGoToObject => "motion_gotoobject",
    MotionXPosition => "motion_xposition",
    MotionYPosition => "motion_yposition",
    MotionDirection => "motion_direction",

    // looks
    LooksShow => "looks_show",
    LooksHide => "looks_hide",
    LooksSetSizeTo => "looks_setsizeto",
    LooksChangeSizeBy => "looks_changesizeby",
    LooksSetText => "looks_settext",
    LooksSetLayer => "looks_setlayer",
    LooksGoToFront => "looks_gotofront",
    LooksGoToBack => "looks_gotoback",
    LooksSetLocked => "looks_setlocked",
    LooksSize => "looks_size",
    LooksText => "looks_text",
    LooksVisible => "looks_visible",

    // sound
    SoundPlay => "sound_play",
    SoundPlayUntilDone => "sound_playuntildone",
    SoundStopAllSounds => "sound_stopallsounds",
    SoundSoundsMenu => "sound_sounds_menu",

    // tags
    TagsAdd => "tags_add",
    TagsRemove => "tags_remove",
    TagsHasTag => "tags_hastag",

    // events
    EventBroadcast => "event_broadcast",
    EventBroadcastTo => "event_broadcastto",
    EventBroadcastMenu => "event_broadcast_menu",

    // control
    ControlWait => "control_wait",
    ControlRepeat => "control_repeat",
    ControlForever => "control_forever",
    ControlIf => "control_if",
    ControlIfElse => "control_if_else",
    ControlWaitUntil => "control_wait_until",
    ControlRepeatUntil => "control_repeat_until",
    ControlStop => "control_stop",
    ControlCreateCloneOfMyself => "control_create_clone_of_myself",
    ControlDeleteThisClone => "control_delete_this_clone",

    // sensing
    SensingTouchingObject => "sensing_touchingobject",
    SensingDistanceTo => "sensing_distanceto",
    SensingOtherObject => "sensing_otherobject",
    SensingMyId => "sensing_myid",
    SensingOf => "sensing_of",
    SensingTimer => "sensing_timer",
    SensingObjectMenu => "sensing_objectmenu",

    // operators
    OperatorAdd => "operator_add",
    OperatorSubtract => "operator_subtract",
    OperatorMultiply => "operator_multiply",
    OperatorDivide => "operator_divide",
    OperatorMod => "operator_mod",
    OperatorRandom => "operator_random",
    OperatorGt => "operator_gt",
    OperatorLt => "operator_lt",
    OperatorEquals => "operator_equals",
    OperatorAnd => "operator_and",
    OperatorOr => "operator_or",
    OperatorNot => "operator_not",
    OperatorJoin => "operator_join",
    OperatorLetterOf => "operator_letter_of",
    OperatorLength => "operator_length",
    OperatorContains => "operator_contains",
    OperatorRound => "operator_round",
    OperatorMathOp => "operator_mathop",

    // data
    DataVariable => "data_variable",
    DataSetVariableTo => "data_setvariableto",
    DataChangeVariableBy => "data_changevariableby",

    // literals
    MathNumber => "math_number",
    MathWholeNumber => "math_whole_number",
    MathPositiveNumber => "math_positive_number",
    MathAngle => "math_angle",
    Text => "text",
    LogicBoolean => "logic_boolean",
}
