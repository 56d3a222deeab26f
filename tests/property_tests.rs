//! Property-based tests for the interpreter.
//!
//! These tests use proptest to generate random programs and verify the
//! dialect's algebraic laws hold for all inputs: literal round-trips,
//! arithmetic identities, quote identity, and the list laws.

use lisplet::evaluate;
use proptest::prelude::*;

// ============================================================================
// Strategies for generating test inputs
// ============================================================================

/// Strategy for integer literals (kept integral so printed forms are exact)
fn arb_int() -> impl Strategy<Value = i64> {
    -1_000_000i64..1_000_000
}

/// Strategy for string literal content without quotes or backslashes
fn arb_string_content() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .,!?]{0,20}"
}

/// Strategy for symbol names, avoiding the reserved atoms `nil` and `t`
fn arb_symbol() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,10}".prop_filter("reserved atom", |s| s != "nil" && s != "t")
}

/// Strategy for short integer lists
fn arb_int_list() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(-1000i64..1000, 0..8)
}

fn list_expr(items: &[i64]) -> String {
    let rendered: Vec<String> = items.iter().map(ToString::to_string).collect();
    format!("(list {})", rendered.join(" "))
}

proptest! {
    // Evaluating a number literal returns that number
    #[test]
    fn number_literals_round_trip(n in arb_int()) {
        let output = evaluate(&format!("(print {n})"))?;
        prop_assert_eq!(output, n.to_string());
    }

    // Evaluating a string literal returns its content
    #[test]
    fn string_literals_round_trip(s in arb_string_content()) {
        let output = evaluate(&format!("(print \"{s}\")"))?;
        prop_assert_eq!(output, s);
    }

    // (quote sym) evaluates to the symbol itself
    #[test]
    fn quote_returns_symbols_unevaluated(name in arb_symbol()) {
        let output = evaluate(&format!("(print (quote {name}))"))?;
        prop_assert_eq!(output, name);
    }

    // Addition commutes
    #[test]
    fn addition_commutes(a in arb_int(), b in arb_int()) {
        let left = evaluate(&format!("(print (+ {a} {b}))"))?;
        let right = evaluate(&format!("(print (+ {b} {a}))"))?;
        prop_assert_eq!(left, right);
    }

    // 0 and 1 are the additive and multiplicative identities
    #[test]
    fn arithmetic_identities(x in arb_int()) {
        let plus_zero = evaluate(&format!("(print (+ 0 {x}))"))?;
        prop_assert_eq!(plus_zero, x.to_string());
        let times_one = evaluate(&format!("(print (* 1 {x}))"))?;
        prop_assert_eq!(times_one, x.to_string());
    }

    // (car (cons x L)) is x and (cdr (cons x L)) equals L
    #[test]
    fn cons_car_cdr_laws(x in arb_int(), items in arb_int_list()) {
        let list = list_expr(&items);
        let car = evaluate(&format!("(print (car (cons {x} {list})))"))?;
        prop_assert_eq!(car, x.to_string());
        let cdr_matches = evaluate(&format!(
            "(print (equal (cdr (cons {x} {list})) {list}))"
        ))?;
        prop_assert_eq!(cdr_matches, "true");
    }

    // Reversing twice is the identity under equal
    #[test]
    fn reverse_is_an_involution(items in arb_int_list()) {
        let list = list_expr(&items);
        let output = evaluate(&format!(
            "(print (equal (reverse (reverse {list})) {list}))"
        ))?;
        prop_assert_eq!(output, "true");
    }

    // nth visits exactly the elements list built the value from
    #[test]
    fn nth_indexes_every_element(items in prop::collection::vec(-1000i64..1000, 1..8)) {
        let list = list_expr(&items);
        for (i, expected) in items.iter().enumerate() {
            let output = evaluate(&format!("(print (nth {i} {list}))"))?;
            prop_assert_eq!(output, expected.to_string());
        }
        // One past the end is always out of bounds
        match evaluate(&format!("(nth {} {list})", items.len())) {
            Err(err) => prop_assert!(err.to_string().contains("nth")),
            Ok(output) => prop_assert!(false, "expected an error, got {output:?}"),
        }
    }

    // and/or never evaluate forms past their deciding operand
    #[test]
    fn short_circuit_skips_later_forms(x in arb_int()) {
        // The unbound symbol would error if it were ever evaluated
        let output = evaluate(&format!(
            "(print (and (> 0 {}) missing-binding))",
            x.abs() + 1
        ))?;
        prop_assert_eq!(output, "false");
        let output = evaluate(&format!(
            "(print (or (< 0 {}) missing-binding))",
            x.abs() + 1
        ))?;
        prop_assert_eq!(output, "true");
    }
}
