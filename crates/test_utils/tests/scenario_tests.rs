//! Cross-domain scenario tests
//!
//! Walks the full engine the way request handlers drive it: enrollment,
//! plan creation, payment application, snapshot derivation, usage billing
//! and the reconciliation pass, all against in-memory state.

use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal_macros::dec;

use core_kernel::{Currency, Money, ReportingMonth, Timezone};
use domain_billing::{
    compute_snapshot, BillingPlan, ChargeCategory, PaymentLedger, PaymentStanding, PlanStatus,
    ReceiptContext, SnapshotInputs,
};
use domain_enrollment::{monthly_charge, resolve_hourly_rate, AttendanceEvent, Subject};
use domain_reconciliation::ports::mock::{MockEnrollmentDirectory, RecordingNotificationSink};
use domain_reconciliation::{EnrollmentRecord, ReconciliationEvent, ReconciliationJob};

use test_utils::assertions::{assert_money_eq, assert_schedule_sums_to, assert_standing};
use test_utils::{IdFixtures, MoneyFixtures, PlanParamsBuilder, StringFixtures, TemporalFixtures,
    TuitionPaymentBuilder};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// The full installment story: plan, payments, completion, receipts.
#[test]
fn test_installment_plan_lifecycle_end_to_end() {
    let subject_id = IdFixtures::subject_id();
    let params = PlanParamsBuilder::new()
        .with_subject(subject_id)
        .with_registration_fee(MoneyFixtures::registration_fee())
        .build();

    let (mut plan, initial_bill) = BillingPlan::create(params).unwrap();
    assert_schedule_sums_to(plan.schedule(), plan.total_amount());

    let mut ledger = PaymentLedger::new();
    ledger.adopt(initial_bill.unwrap());

    // Pay the first installment and check the intermediate snapshot
    let first_item = plan.schedule()[0].id;
    let request = TuitionPaymentBuilder::new(subject_id)
        .against_item(first_item)
        .build();
    let payment_id = ledger.record_payment(request, Some(&mut plan)).unwrap().id;

    let payments = ledger.completed_for_subject(subject_id);
    let snapshot = compute_snapshot(SnapshotInputs {
        catalog_charges: &[],
        custom_plan_total: Some(plan.total_amount()),
        payments: &payments,
        schedule: plan.schedule(),
        today: TemporalFixtures::early_report_date(),
        currency: Currency::USD,
    })
    .unwrap();

    assert_money_eq(snapshot.total_due, MoneyFixtures::usd(dec!(5000)));
    assert_standing(&snapshot, PaymentStanding::PartiallyPaid);
    assert_eq!(snapshot.next_due_date, Some(date(2024, 5, 1)));

    // Settle the remaining installments
    let remaining: Vec<_> = plan
        .schedule()
        .iter()
        .filter(|i| i.is_pending())
        .map(|i| i.id)
        .collect();
    for item in remaining {
        let request = TuitionPaymentBuilder::new(subject_id).against_item(item).build();
        ledger.record_payment(request, Some(&mut plan)).unwrap();
    }

    assert_eq!(plan.status(), PlanStatus::Completed);

    let payments = ledger.completed_for_subject(subject_id);
    let snapshot = compute_snapshot(SnapshotInputs {
        catalog_charges: &[],
        custom_plan_total: Some(plan.total_amount()),
        payments: &payments,
        schedule: plan.schedule(),
        today: date(2024, 12, 1),
        currency: Currency::USD,
    })
    .unwrap();

    assert_standing(&snapshot, PaymentStanding::FullyPaid);
    assert!(snapshot.total_due.is_zero());

    // Receipts: idempotent issuance for the live payment, sweep for the rest
    let ctx = ReceiptContext {
        organization_prefix: StringFixtures::receipt_prefix().to_string(),
        academic_year: StringFixtures::academic_year().to_string(),
    };
    let receipt = ledger.issue_receipt(payment_id, &ctx).unwrap();
    assert_eq!(ledger.issue_receipt(payment_id, &ctx).unwrap(), receipt);

    let swept = ledger.backfill_missing_receipts(&ctx);
    assert_eq!(swept, 6); // registration bill + five later installments
    assert_eq!(ledger.backfill_missing_receipts(&ctx), 0);
}

/// The daycare story: attendance drives a metered charge that lands in the
/// ledger as an additional-category payment.
#[test]
fn test_usage_metered_billing_end_to_end() {
    let organization_id = IdFixtures::organization_id();
    let subject = Subject::enroll_usage_metered(
        organization_id,
        StringFixtures::daycare_class(),
        TemporalFixtures::term(),
        None,
    );

    // Two visits in June: 3h and 2h
    let mut first = AttendanceEvent::check_in(
        subject.id(),
        Utc.with_ymd_and_hms(2024, 6, 4, 8, 0, 0).unwrap(),
    );
    first
        .close(Utc.with_ymd_and_hms(2024, 6, 4, 11, 0, 0).unwrap())
        .unwrap();
    let mut second = AttendanceEvent::check_in(
        subject.id(),
        Utc.with_ymd_and_hms(2024, 6, 18, 13, 0, 0).unwrap(),
    );
    second
        .close(Utc.with_ymd_and_hms(2024, 6, 18, 15, 0, 0).unwrap())
        .unwrap();

    let rate = resolve_hourly_rate(subject.custom_hourly_rate(), MoneyFixtures::hourly_rate());
    let charge = monthly_charge(
        &[first, second],
        ReportingMonth::new(2024, 6).unwrap(),
        rate,
        &Timezone::default(),
    )
    .unwrap();
    assert_money_eq(charge, MoneyFixtures::usd(dec!(500)));

    // The charge is billed retrospectively as a usage payment
    let mut ledger = PaymentLedger::new();
    let request = TuitionPaymentBuilder::new(subject.id())
        .with_amount(charge)
        .with_category(ChargeCategory::UsageCharge)
        .paid_on(date(2024, 7, 1))
        .build();
    ledger.record_payment(request, None).unwrap();

    let payments = ledger.completed_for_subject(subject.id());
    let snapshot = compute_snapshot(SnapshotInputs {
        catalog_charges: &[],
        custom_plan_total: Some(MoneyFixtures::usd(dec!(4000))),
        payments: &payments,
        schedule: &[],
        today: date(2024, 7, 2),
        currency: Currency::USD,
    })
    .unwrap();

    // Usage collections are tracked separately and never reduce tuition due
    assert_money_eq(snapshot.collected_additional, MoneyFixtures::usd(dec!(500)));
    assert_money_eq(snapshot.total_due, MoneyFixtures::usd(dec!(4000)));
    assert_standing(&snapshot, PaymentStanding::Pending);
}

/// The reconciliation story: an expiring daycare enrollment and an expired
/// one, both handled in one pass.
#[tokio::test]
async fn test_reconciliation_pass_end_to_end() {
    let today = date(2024, 6, 29);

    let expiring = EnrollmentRecord {
        subject_id: IdFixtures::subject_id(),
        end_date: date(2024, 6, 30),
        usage_metered: true,
    };
    let lapsed = EnrollmentRecord {
        subject_id: IdFixtures::subject_id(),
        end_date: date(2024, 6, 20),
        usage_metered: true,
    };
    let lapsed_id = lapsed.subject_id;

    let directory =
        Arc::new(MockEnrollmentDirectory::with_enrollments(vec![expiring, lapsed]).await);
    let sink = Arc::new(RecordingNotificationSink::new());
    let job = ReconciliationJob::new(directory.clone(), sink.clone());

    let report = job.run(today).await.unwrap();
    assert_eq!(report.expiring_notified, 1);
    assert_eq!(report.expired, 1);
    assert!(report.failures.is_empty());
    assert_eq!(directory.expired_subjects().await, vec![lapsed_id]);

    let events: Vec<_> = sink.requests().await.iter().map(|r| r.event).collect();
    assert!(events.contains(&ReconciliationEvent::Expiring));
    assert!(events.contains(&ReconciliationEvent::Expired));

    // The expired enrollment left the active set; a re-run only re-notifies
    // the expiring one, under the same dedupe key
    let second = job.run(today).await.unwrap();
    assert_eq!(second.expired, 0);
    assert_eq!(second.expiring_notified, 1);
}
