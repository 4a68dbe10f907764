// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    plain = { "1.23", "$1.23" },
    dollar_sign = { "$0.0423", "$0.0423" },
    whitespace = { "  $2.50 ", "$2.50" },
    integer = { "3", "$3" },
    zero = { "0", "$0" },
)]
fn parse_accepts(input: &str, display: &str) {
    let cost = Cost::parse(input).unwrap();
    assert_eq!(cost.to_string(), display);
}

#[parameterized(
    empty = { "" },
    only_dollar = { "$" },
    words = { "four dollars" },
    double_point = { "1.2.3" },
)]
fn parse_rejects(input: &str) {
    assert!(Cost::parse(input).is_err());
}

#[test]
fn sums_exactly() {
    // The classic float trap: 0.1 + 0.2 must equal 0.3 exactly.
    let mut total = Cost::ZERO;
    total += Cost::parse("0.1").unwrap();
    total += Cost::parse("0.2").unwrap();
    assert_eq!(total, Cost::parse("0.3").unwrap());
}

#[test]
fn sums_across_many_small_amounts() {
    let mut total = Cost::ZERO;
    for _ in 0..1000 {
        total += Cost::parse("$0.0001").unwrap();
    }
    assert_eq!(total, Cost::parse("0.1").unwrap());
}

#[test]
fn serde_round_trip() {
    let cost = Cost::parse("$12.0450").unwrap();
    let json = serde_json::to_string(&cost).unwrap();
    let back: Cost = serde_json::from_str(&json).unwrap();
    assert_eq!(back, cost);
}

#[test]
fn default_is_zero() {
    assert_eq!(Cost::default(), Cost::ZERO);
    assert!(Cost::ZERO.is_zero());
}
