use std::cmp::Ordering;

use crate::runtime::value::Value;

#[test]
fn to_number_coerces_non_finite_and_garbage_to_zero() {
    assert_eq!(Value::Number(f64::INFINITY).to_number(), 0.0);
    assert_eq!(Value::Number(f64::NAN).to_number(), 0.0);
    assert_eq!(Value::text("abc").to_number(), 0.0);
    assert_eq!(Value::text("").to_number(), 0.0);
    assert_eq!(Value::Nothing.to_number(), 0.0);
}

#[test]
fn to_number_parses_padded_text_and_bools() {
    assert_eq!(Value::text("  42.5 ").to_number(), 42.5);
    assert_eq!(Value::Bool(true).to_number(), 1.0);
    assert_eq!(Value::Bool(false).to_number(), 0.0);
}

#[test]
fn compare_is_numeric_when_both_sides_parse() {
    assert_eq!(Value::text("10").compare(&Value::text("9")), Ordering::Greater);
    assert_eq!(Value::Number(2.0).compare(&Value::text("2")), Ordering::Equal);
}

#[test]
fn compare_falls_back_to_lexical() {
    assert_eq!(Value::text("10").compare(&Value::text("apple")), Ordering::Less);
    assert_eq!(Value::text("Apple").compare(&Value::text("apple")), Ordering::Equal);
    assert_eq!(Value::text("").compare(&Value::Number(0.0)), Ordering::Less);
}

#[test]
fn strict_equality_distinguishes_types() {
    assert_ne!(Value::Number(1.0), Value::text("1"));
    assert!(Value::Number(1.0).loose_eq(&Value::text("1")));
}

#[test]
fn display_drops_trailing_zero_fraction() {
    assert_eq!(Value::Number(3.0).to_string(), "3");
    assert_eq!(Value::Number(2.5).to_string(), "2.5");
    assert_eq!(Value::Nothing.to_string(), "");
}

#[test]
fn truthiness_follows_text_conventions() {
    assert!(!Value::text("false").to_bool());
    assert!(!Value::text("0").to_bool());
    assert!(Value::text("yes").to_bool());
    assert!(!Value::Number(0.0).to_bool());
}

#[test]
fn json_round_trip_keeps_scalars() {
    let json = serde_json::json!(null);
    assert_eq!(Value::from_json(&json), Value::Nothing);
    assert_eq!(Value::Number(4.0).to_json(), serde_json::json!(4.0));
}
