use super::expr::{Expr, VarRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopScope {
    ThisScript,
    /// Every other handler on the same object; the caller keeps running.
    OtherScriptsOnObject,
    All,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BroadcastTarget {
    Everyone,
    OnlySelf,
    /// Every object attached to the executing object.
    Attachments,
    /// The object whose id the expression evaluates to.
    Object(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZOrder {
    Front,
    Back,
}

/// Host-facing primitive operation with its argument expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    GoTo { x: Expr, y: Expr },
    ChangeX(Expr),
    ChangeY(Expr),
    SetX(Expr),
    SetY(Expr),
    Turn { degrees: Expr, clockwise: bool },
    PointInDirection(Expr),
    MoveSteps(Expr),
    Glide { seconds: Expr, x: Expr, y: Expr },
    GoToObject(Expr),
    SetVisible(bool),
    SetSize(Expr),
    ChangeSize(Expr),
    SetText(Expr),
    SetLayer(String),
    Arrange(ZOrder),
    SetLocked(bool),
    PlaySound { name: Expr, wait: bool },
    StopSounds,
    AddTag(Expr),
    RemoveTag(Expr),
    CloneSelf,
    DeleteSelf,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Effect(Effect),
    SetVariable {
        var: VarRef,
        value: Expr,
    },
    ChangeVariable {
        var: VarRef,
        by: Expr,
    },
    If {
        condition: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Vec<Stmt>,
    },
    Forever {
        body: Vec<Stmt>,
    },
    Repeat {
        times: Expr,
        body: Vec<Stmt>,
    },
    RepeatUntil {
        condition: Expr,
        body: Vec<Stmt>,
    },
    WaitUntil {
        condition: Expr,
    },
    Wait {
        seconds: Expr,
    },
    Broadcast {
        message: Expr,
        target: BroadcastTarget,
    },
    Stop(StopScope),
}
