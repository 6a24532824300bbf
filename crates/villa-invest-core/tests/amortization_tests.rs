use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use villa_invest_core::financing::{amortize, build_loan_schedule, LoanInput, RepaymentScheme};

// ===========================================================================
// Reference development loan: 36.75M at prime 3.5% over 15 years
// ===========================================================================

#[test]
fn test_reference_level_payment() {
    let rows = amortize(dec!(36750000), dec!(0.035), 15, RepaymentScheme::LevelPayment).unwrap();
    assert_eq!(rows.len(), 180);
    assert_eq!(rows[0].period, 1);
    assert_eq!(rows[179].period, 180);

    let payment = rows[0].payment;
    assert!(
        (payment - dec!(262719.3339)).abs() < dec!(0.001),
        "Expected monthly payment ~262,719.33, got {payment}"
    );
    // First month: 36.75M × 0.035/12 = 107,187.50
    assert!((rows[0].interest - dec!(107187.5)).abs() < dec!(0.0001));
    assert!(rows[179].remaining_balance.abs() < Decimal::ONE);
}

#[test]
fn test_reference_display_rows_rounded() {
    let rows = amortize(dec!(36750000), dec!(0.035), 15, RepaymentScheme::LevelPayment).unwrap();
    let first = rows[0].rounded();
    assert_eq!(first.payment, dec!(262719));
    assert_eq!(first.interest, dec!(107188));
    assert_eq!(first.principal, dec!(155532));
}

#[test]
fn test_level_payment_portions_sum_to_payment() {
    let rows = amortize(dec!(500000), dec!(0.045), 10, RepaymentScheme::LevelPayment).unwrap();
    for row in &rows {
        assert!((row.principal + row.interest - row.payment).abs() < dec!(0.0000001));
    }
    for w in rows.windows(2) {
        assert!(w[1].interest < w[0].interest);
        assert!(w[1].remaining_balance < w[0].remaining_balance);
    }
}

#[test]
fn test_equal_principal_constant_portion() {
    let rows = amortize(dec!(36750000), dec!(0.035), 15, RepaymentScheme::EqualPrincipal).unwrap();
    let expected = dec!(36750000) / dec!(180);
    for row in &rows[..179] {
        assert_eq!(row.principal, expected);
        assert_eq!(row.principal + row.interest, row.payment);
    }
    assert!((rows[179].principal - expected).abs() < dec!(0.000001));
    assert_eq!(rows[179].remaining_balance, Decimal::ZERO);
}

#[test]
fn test_one_year_bullet_loan() {
    let rows = amortize(dec!(1000000), dec!(0.06), 1, RepaymentScheme::Bullet).unwrap();
    assert_eq!(rows.len(), 12);
    for row in &rows[..11] {
        assert_eq!(row.principal, Decimal::ZERO);
        assert_eq!(row.payment, row.interest);
        assert_eq!(row.remaining_balance, dec!(1000000));
    }
    assert_eq!(rows[11].principal, dec!(1000000));
    assert_eq!(rows[11].payment, dec!(1005000));
    assert_eq!(rows[11].remaining_balance, Decimal::ZERO);
}

#[test]
fn test_bullet_principal_sum_is_exact() {
    let rows = amortize(dec!(987654.32), dec!(0.041), 7, RepaymentScheme::Bullet).unwrap();
    let total: Decimal = rows.iter().map(|r| r.principal).sum();
    assert_eq!(total, dec!(987654.32));
}

#[test]
fn test_zero_principal_schedule() {
    for scheme in RepaymentScheme::ALL {
        let rows = amortize(Decimal::ZERO, dec!(0.05), 2, scheme).unwrap();
        assert!(rows.iter().all(|r| r.payment.is_zero() && r.remaining_balance.is_zero()));
    }
}

#[test]
fn test_negative_principal_every_scheme() {
    for scheme in RepaymentScheme::ALL {
        let rows = amortize(dec!(-250000), dec!(0.035), 3, scheme).unwrap();
        assert_eq!(rows.len(), 36);
        assert!(rows.last().unwrap().remaining_balance.abs() < Decimal::ONE);
    }
}

#[test]
fn test_schedule_envelope_totals() {
    let input = LoanInput {
        principal: dec!(36750000),
        annual_rate: dec!(0.035),
        term_years: 15,
        scheme: RepaymentScheme::LevelPayment,
    };
    let result = build_loan_schedule(&input).unwrap();
    let out = &result.result;
    assert_eq!(out.payments.len(), 180);
    assert!((out.total_principal - dec!(36750000)).abs() < Decimal::ONE);
    assert!((out.first_year_interest - dec!(1256017.1206)).abs() < dec!(0.001));
    assert!((out.total_paid - out.payments[0].payment * dec!(180)).abs() < dec!(0.001));
    assert_eq!(result.methodology, "Monthly Loan Amortization");
}

#[test]
fn test_scheme_deserializes_from_snake_case() {
    let input: LoanInput = serde_json::from_str(
        r#"{"principal": "1000", "annual_rate": "0.05", "term_years": 2, "scheme": "equal_principal"}"#,
    )
    .unwrap();
    assert_eq!(input.scheme, RepaymentScheme::EqualPrincipal);

    let defaulted: LoanInput =
        serde_json::from_str(r#"{"principal": "1000", "annual_rate": "0.05", "term_years": 2}"#).unwrap();
    assert_eq!(defaulted.scheme, RepaymentScheme::LevelPayment);
}
