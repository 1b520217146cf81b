//! Integration tests for the Money type

use core_kernel::{Currency, Money, MoneyError};
use rust_decimal_macros::dec;

#[test]
fn test_display_formats_with_symbol() {
    let m = Money::new(dec!(1234.5), Currency::USD);
    assert_eq!(m.to_string(), "$ 1234.50");
}

#[test]
fn test_jpy_has_no_minor_units() {
    let m = Money::from_minor(500, Currency::JPY);
    assert_eq!(m.amount(), dec!(500));
    assert_eq!(m.round_to_currency().amount(), dec!(500));
}

#[test]
fn test_split_across_currencies_with_minor_units() {
    // 10.00 into 3: the 0.01 remainder must land on the final portion
    let m = Money::new(dec!(10.00), Currency::EUR);
    let parts = m.split_last_remainder(3).unwrap();

    assert_eq!(parts.len(), 3);
    assert_eq!(parts[2].amount(), dec!(3.34));

    let total = parts
        .into_iter()
        .fold(Money::zero(Currency::EUR), |acc, p| acc + p);
    assert_eq!(total.amount(), dec!(10.00));
}

#[test]
fn test_split_single_part_is_identity() {
    let m = Money::new(dec!(99.99), Currency::USD);
    let parts = m.split_last_remainder(1).unwrap();
    assert_eq!(parts, vec![m]);
}

#[test]
fn test_divide_by_zero_is_error() {
    let m = Money::new(dec!(100), Currency::USD);
    assert_eq!(m.divide(dec!(0)), Err(MoneyError::DivisionByZero));
}

#[test]
fn test_checked_ops_preserve_currency() {
    let a = Money::new(dec!(75.25), Currency::INR);
    let b = Money::new(dec!(24.75), Currency::INR);

    let sum = a.checked_add(&b).unwrap();
    assert_eq!(sum.amount(), dec!(100.00));
    assert_eq!(sum.currency(), Currency::INR);
}

#[test]
fn test_bankers_rounding() {
    // Half-to-even keeps repeated roundings from drifting one direction
    let up = Money::new(dec!(10.255), Currency::USD).round_bankers(2);
    let down = Money::new(dec!(10.245), Currency::USD).round_bankers(2);

    assert_eq!(up.amount(), dec!(10.26));
    assert_eq!(down.amount(), dec!(10.24));
}

#[test]
fn test_negation_and_abs() {
    let m = Money::new(dec!(50), Currency::USD);
    let n = -m;
    assert!(n.is_negative());
    assert_eq!(n.abs(), m);
}
