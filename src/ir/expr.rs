use std::rc::Rc;

use crate::runtime::value::Value;

/// Variable reference resolved at compile time.
#[derive(Debug, Clone, PartialEq)]
pub enum VarRef {
    /// Slot in the per-object local table.
    Local(usize),
    /// Key into the scene-shared variable map.
    Global(Rc<str>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Gt,
    Eq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathFn {
    Abs,
    Floor,
    Ceiling,
    Sqrt,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Ln,
    Log,
    Exp,
    Pow10,
}

impl MathFn {
    pub fn parse(name: &str) -> Option<Self> {
        let func = match name.to_ascii_lowercase().as_str() {
            "abs" => MathFn::Abs,
            "floor" => MathFn::Floor,
            "ceiling" => MathFn::Ceiling,
            "sqrt" => MathFn::Sqrt,
            "sin" => MathFn::Sin,
            "cos" => MathFn::Cos,
            "tan" => MathFn::Tan,
            "asin" => MathFn::Asin,
            "acos" => MathFn::Acos,
            "atan" => MathFn::Atan,
            "ln" => MathFn::Ln,
            "log" => MathFn::Log,
            "e ^" | "exp" => MathFn::Exp,
            "10 ^" | "pow10" => MathFn::Pow10,
            _ => return None,
        };
        Some(func)
    }

    /// Trigonometry works in degrees.
    pub fn apply(self, n: f64) -> f64 {
        match self {
            MathFn::Abs => n.abs(),
            MathFn::Floor => n.floor(),
            MathFn::Ceiling => n.ceil(),
            MathFn::Sqrt => n.sqrt(),
            MathFn::Sin => n.to_radians().sin(),
            MathFn::Cos => n.to_radians().cos(),
            MathFn::Tan => n.to_radians().tan(),
            MathFn::Asin => n.asin().to_degrees(),
            MathFn::Acos => n.acos().to_degrees(),
            MathFn::Atan => n.atan().to_degrees(),
            MathFn::Ln => n.ln(),
            MathFn::Log => n.log10(),
            MathFn::Exp => n.exp(),
            MathFn::Pow10 => 10f64.powf(n),
        }
    }
}

/// Properties readable from another object with `sensing_of`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectProperty {
    X,
    Y,
    Direction,
    Size,
    Name,
    Text,
    Layer,
    Visible,
}

impl ObjectProperty {
    pub fn parse(name: &str) -> Option<Self> {
        let property = match name.to_ascii_lowercase().as_str() {
            "x" | "x position" => ObjectProperty::X,
            "y" | "y position" => ObjectProperty::Y,
            "direction" | "rotation" => ObjectProperty::Direction,
            "size" => ObjectProperty::Size,
            "name" => ObjectProperty::Name,
            "text" => ObjectProperty::Text,
            "layer" => ObjectProperty::Layer,
            "visible" => ObjectProperty::Visible,
            _ => return None,
        };
        Some(property)
    }
}

/// Reporter that reads scene or execution state.
#[derive(Debug, Clone, PartialEq)]
pub enum Sensor {
    XPosition,
    YPosition,
    Direction,
    Size,
    Text,
    Visible,
    /// The counterpart object of the triggering event, if any.
    OtherObject,
    MyId,
    /// Seconds since the session started.
    Timer,
    Touching(Box<Expr>),
    DistanceTo(Box<Expr>),
    PropertyOf {
        property: ObjectProperty,
        object: Box<Expr>,
    },
    HasTag(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Variable(VarRef),
    Arith {
        op: ArithOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Join(Box<Expr>, Box<Expr>),
    LetterOf {
        index: Box<Expr>,
        text: Box<Expr>,
    },
    Length(Box<Expr>),
    Contains {
        haystack: Box<Expr>,
        needle: Box<Expr>,
    },
    Round(Box<Expr>),
    Math {
        func: MathFn,
        operand: Box<Expr>,
    },
    Random {
        from: Box<Expr>,
        to: Box<Expr>,
    },
    Sense(Sensor),
}

impl Expr {
    pub fn number(n: f64) -> Self {
        Expr::Literal(Value::Number(n))
    }

    pub fn text(s: &str) -> Self {
        Expr::Literal(Value::text(s))
    }

    pub fn boolean(b: bool) -> Self {
        Expr::Literal(Value::Bool(b))
    }
}
