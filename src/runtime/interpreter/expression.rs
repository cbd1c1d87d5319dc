use std::cmp::Ordering;

use futures::{FutureExt, future::LocalBoxFuture};
use rand::Rng;

use crate::{
    ir::{ArithOp, CompareOp, Expr, Sensor, VarRef},
    runtime::{error::ExecResult, primitives::sensing, value::Value},
};

use super::Execution;

impl Execution {
    pub(super) fn eval<'a>(&'a self, expr: &'a Expr) -> LocalBoxFuture<'a, ExecResult<Value>> {
        async move {
            let value = match expr {
                Expr::Literal(value) => value.clone(),
                Expr::Variable(var) => self.read_variable(var),
                Expr::Arith { op, left, right } => {
                    let left = self.eval(left).await?.to_number();
                    let right = self.eval(right).await?.to_number();
                    Value::Number(arith(*op, left, right))
                }
                Expr::Compare { op, left, right } => {
                    let left = self.eval(left).await?;
                    let right = self.eval(right).await?;
                    let ordering = left.compare(&right);
                    Value::Bool(match op {
                        CompareOp::Lt => ordering == Ordering::Less,
                        CompareOp::Gt => ordering == Ordering::Greater,
                        CompareOp::Eq => ordering == Ordering::Equal,
                    })
                }
                Expr::And(left, right) => {
                    Value::Bool(self.eval(left).await?.to_bool() && self.eval(right).await?.to_bool())
                }
                Expr::Or(left, right) => {
                    Value::Bool(self.eval(left).await?.to_bool() || self.eval(right).await?.to_bool())
                }
                Expr::Not(operand) => Value::Bool(!self.eval(operand).await?.to_bool()),
                Expr::Join(left, right) => {
                    let left = self.eval(left).await?;
                    let right = self.eval(right).await?;
                    Value::text(format!("{}{}", left, right))
                }
                Expr::LetterOf { index, text } => {
                    let index = self.eval(index).await?.to_number();
                    let text = self.eval(text).await?.to_string();
                    letter_of(&text, index)
                }
                Expr::Length(text) => {
                    Value::Number(self.eval(text).await?.to_string().chars().count() as f64)
                }
                Expr::Contains { haystack, needle } => {
                    let haystack = self.eval(haystack).await?.to_string().to_lowercase();
                    let needle = self.eval(needle).await?.to_string().to_lowercase();
                    Value::Bool(haystack.contains(&needle))
                }
                Expr::Round(operand) => Value::Number(self.eval(operand).await?.to_number().round()),
                Expr::Math { func, operand } => {
                    Value::Number(func.apply(self.eval(operand).await?.to_number()))
                }
                Expr::Random { from, to } => {
                    let from = self.eval(from).await?;
                    let to = self.eval(to).await?;
                    random_between(&from, &to)
                }
                Expr::Sense(sensor) => self.sense(sensor).await?,
            };
            Ok(value)
        }
        .boxed_local()
    }

    async fn sense(&self, sensor: &Sensor) -> ExecResult<Value> {
        let ctx = &self.ctx;
        match sensor {
            Sensor::Touching(target) => Ok(sensing::touching(ctx, &self.eval(target).await?)),
            Sensor::DistanceTo(target) => {
                let target = self.eval(target).await?;
                sensing::distance_to(ctx, &target).await
            }
            Sensor::PropertyOf { property, object } => {
                let object = self.eval(object).await?;
                sensing::property_of(ctx, *property, &object).await
            }
            Sensor::HasTag(tag) => {
                let tag = self.eval(tag).await?;
                sensing::has_tag(ctx, &tag).await
            }
            own => sensing::read_own(ctx, own).await,
        }
    }

    pub(super) fn read_variable(&self, var: &VarRef) -> Value {
        match var {
            VarRef::Local(slot) => self
                .ctx
                .locals
                .borrow()
                .get(*slot)
                .cloned()
                .unwrap_or_default(),
            VarRef::Global(key) => self
                .ctx
                .services()
                .globals
                .borrow()
                .get(key.as_ref())
                .cloned()
                .unwrap_or_default(),
        }
    }

    pub(super) fn write_variable(&self, var: &VarRef, value: Value) {
        match var {
            VarRef::Local(slot) => {
                let mut locals = self.ctx.locals.borrow_mut();
                if locals.len() <= *slot {
                    locals.resize(*slot + 1, Value::Nothing);
                }
                locals[*slot] = value;
            }
            VarRef::Global(key) => {
                self.ctx
                    .services()
                    .globals
                    .borrow_mut()
                    .insert(key.to_string(), value);
            }
        }
    }
}

fn arith(op: ArithOp, left: f64, right: f64) -> f64 {
    match op {
        ArithOp::Add => left + right,
        ArithOp::Sub => left - right,
        ArithOp::Mul => left * right,
        ArithOp::Div => left / right,
        // Result takes the sign of the divisor.
        ArithOp::Mod => left - right * (left / right).floor(),
    }
}

/// 1-based; out of range yields empty text.
fn letter_of(text: &str, index: f64) -> Value {
    if index < 1.0 {
        return Value::text("");
    }
    let position = index.floor() as usize - 1;
    text.chars()
        .nth(position)
        .map(|c| Value::text(c.to_string()))
        .unwrap_or_else(|| Value::text(""))
}

fn looks_integral(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.fract() == 0.0,
        Value::Text(s) => !s.contains('.'),
        _ => true,
    }
}

/// Integers when both bounds look integral, otherwise a float in range.
fn random_between(from: &Value, to: &Value) -> Value {
    let (a, b) = (from.to_number(), to.to_number());
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    if low == high {
        return Value::Number(low);
    }

    let mut rng = rand::thread_rng();
    if looks_integral(from) && looks_integral(to) {
        Value::Number(rng.gen_range(low as i64..=high as i64) as f64)
    } else {
        Value::Number(rng.gen_range(low..high))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modulo_follows_divisor_sign() {
        assert_eq!(arith(ArithOp::Mod, -1.0, 3.0), 2.0);
        assert_eq!(arith(ArithOp::Mod, 7.0, 3.0), 1.0);
    }

    #[test]
    fn letter_of_is_one_based() {
        assert_eq!(letter_of("dice", 1.0), Value::text("d"));
        assert_eq!(letter_of("dice", 5.0), Value::text(""));
        assert_eq!(letter_of("dice", 0.0), Value::text(""));
    }

    #[test]
    fn random_with_integral_bounds_is_integral() {
        for _ in 0..50 {
            let value = random_between(&Value::Number(1.0), &Value::text("6"));
            let n = value.to_number();
            assert!((1.0..=6.0).contains(&n));
            assert_eq!(n.fract(), 0.0);
        }
    }
}
