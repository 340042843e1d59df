mod common;

use chrono::NaiveDate;

use engine::{
    Actor, BillPaymentFilter, BillPaymentUpdate, BillStatus, EngineError, Frequency, Money,
    NotificationCategory, ScheduleBillCmd, TransactionKind,
};

use common::{balance, harness, history, open_checking};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn paying_a_monthly_bill_schedules_the_next_one() {
    let h = harness().await;
    let a = open_checking(&h.engine, "alice", 5_000).await;
    let alice = Actor::owner("alice");

    let bill = h
        .engine
        .schedule_bill_payment(
            ScheduleBillCmd::new(
                alice.clone(),
                a.id,
                "Power Co",
                Money::new(1_200),
                date(2024, 1, 15),
                Frequency::Monthly,
            )
            .description("electricity"),
        )
        .await
        .unwrap();
    assert_eq!(bill.status, BillStatus::Scheduled);
    assert!(bill.reminder_enabled);
    assert_eq!(bill.reminder_days, engine::DEFAULT_REMINDER_DAYS);
    h.notifier.clear();

    let (paid, tx) = h.engine.pay_bill_now(&alice, bill.id).await.unwrap();
    assert_eq!(paid.status, BillStatus::Completed);
    assert!(paid.payment_date.is_some());
    assert_eq!(balance(&h.engine, &a).await, Money::new(3_800));

    assert_eq!(tx.kind, TransactionKind::Payment);
    assert_eq!(tx.amount, Money::new(1_200));
    assert_eq!(tx.from_account, Some(a.id));
    assert_eq!(tx.payee.as_deref(), Some("Power Co"));
    assert_eq!(tx.category.as_deref(), Some("Bills"));
    assert_eq!(tx.description.as_deref(), Some("electricity"));

    let stored = h.engine.bill_payment(&alice, bill.id).await.unwrap();
    assert_eq!(stored.status, BillStatus::Completed);

    let scheduled = h
        .engine
        .bill_payments_for_owner("alice", &BillPaymentFilter::default().status(BillStatus::Scheduled))
        .await
        .unwrap();
    assert_eq!(scheduled.len(), 1);
    let next = &scheduled[0];
    assert_ne!(next.id, bill.id);
    assert_eq!(next.due_date, date(2024, 2, 15));
    assert_eq!(next.payee, "Power Co");
    assert_eq!(next.amount, Money::new(1_200));
    assert_eq!(next.frequency, Frequency::Monthly);
    assert_eq!(next.description.as_deref(), Some("electricity"));
    assert_eq!(next.payment_date, None);

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].category, NotificationCategory::BillPayment);
}

#[tokio::test]
async fn one_time_bill_has_no_successor() {
    let h = harness().await;
    let a = open_checking(&h.engine, "alice", 500).await;
    let alice = Actor::owner("alice");
    let bill = h
        .engine
        .schedule_bill_payment(
            ScheduleBillCmd::new(
                alice.clone(),
                a.id,
                "Dentist",
                Money::new(300),
                date(2024, 3, 1),
                Frequency::OneTime,
            )
            .category("Health"),
        )
        .await
        .unwrap();

    let (_, tx) = h.engine.pay_bill_now(&alice, bill.id).await.unwrap();
    assert_eq!(tx.category.as_deref(), Some("Health"));
    assert_eq!(tx.description.as_deref(), Some("Bill payment to Dentist"));

    let all = h
        .engine
        .bill_payments_for_owner("alice", &BillPaymentFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].status, BillStatus::Completed);
}

#[tokio::test]
async fn month_end_due_dates_clamp() {
    let h = harness().await;
    let a = open_checking(&h.engine, "alice", 1_000).await;
    let alice = Actor::owner("alice");
    let bill = h
        .engine
        .schedule_bill_payment(ScheduleBillCmd::new(
            alice.clone(),
            a.id,
            "Landlord",
            Money::new(100),
            date(2024, 1, 31),
            Frequency::Monthly,
        ))
        .await
        .unwrap();

    h.engine.pay_bill_now(&alice, bill.id).await.unwrap();
    let next = h
        .engine
        .upcoming_bill_payments("alice", date(2024, 12, 31))
        .await
        .unwrap();
    assert_eq!(next.len(), 1);
    assert_eq!(next[0].due_date, date(2024, 2, 29));
}

#[tokio::test]
async fn insufficient_funds_leaves_bill_scheduled() {
    let h = harness().await;
    let a = open_checking(&h.engine, "alice", 1_000).await;
    let alice = Actor::owner("alice");
    let bill = h
        .engine
        .schedule_bill_payment(ScheduleBillCmd::new(
            alice.clone(),
            a.id,
            "Insurance",
            Money::new(1_200),
            date(2024, 1, 15),
            Frequency::Monthly,
        ))
        .await
        .unwrap();
    let log_before = history(&h.engine, "alice").await.len();
    h.notifier.clear();

    let err = h.engine.pay_bill_now(&alice, bill.id).await.unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds(_)));

    let stored = h.engine.bill_payment(&alice, bill.id).await.unwrap();
    assert_eq!(stored.status, BillStatus::Scheduled);
    assert_eq!(stored.payment_date, None);
    assert_eq!(balance(&h.engine, &a).await, Money::new(1_000));
    assert_eq!(history(&h.engine, "alice").await.len(), log_before);
    let all = h
        .engine
        .bill_payments_for_owner("alice", &BillPaymentFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn terminal_bills_reject_every_change() {
    let h = harness().await;
    let a = open_checking(&h.engine, "alice", 1_000).await;
    let alice = Actor::owner("alice");
    let schedule = |payee: &str| {
        ScheduleBillCmd::new(
            alice.clone(),
            a.id,
            payee,
            Money::new(100),
            date(2024, 5, 1),
            Frequency::OneTime,
        )
    };

    let paid = h.engine.schedule_bill_payment(schedule("Gym")).await.unwrap();
    h.engine.pay_bill_now(&alice, paid.id).await.unwrap();
    let cancelled = h
        .engine
        .schedule_bill_payment(schedule("Magazine"))
        .await
        .unwrap();
    let cancelled = h
        .engine
        .cancel_bill_payment(&alice, cancelled.id)
        .await
        .unwrap();
    assert_eq!(cancelled.status, BillStatus::Cancelled);

    for id in [paid.id, cancelled.id] {
        let update = BillPaymentUpdate {
            amount: Some(Money::new(1)),
            ..Default::default()
        };
        assert!(matches!(
            h.engine.update_bill_payment(&alice, id, update).await,
            Err(EngineError::InvalidState(_))
        ));
        assert!(matches!(
            h.engine.cancel_bill_payment(&alice, id).await,
            Err(EngineError::InvalidState(_))
        ));
        assert!(matches!(
            h.engine.pay_bill_now(&alice, id).await,
            Err(EngineError::InvalidState(_))
        ));
    }

    // Only the single successful payment moved money.
    assert_eq!(balance(&h.engine, &a).await, Money::new(900));
    let stored = h.engine.bill_payment(&alice, paid.id).await.unwrap();
    assert_eq!(stored.amount, Money::new(100));
}

#[tokio::test]
async fn update_changes_only_supplied_fields() {
    let h = harness().await;
    let a = open_checking(&h.engine, "alice", 1_000).await;
    let b = open_checking(&h.engine, "alice", 1_000).await;
    let alice = Actor::owner("alice");
    let bill = h
        .engine
        .schedule_bill_payment(
            ScheduleBillCmd::new(
                alice.clone(),
                a.id,
                "Water",
                Money::new(80),
                date(2024, 6, 10),
                Frequency::Quarterly,
            )
            .description("water bill")
            .reminder(true, 5),
        )
        .await
        .unwrap();

    let updated = h
        .engine
        .update_bill_payment(
            &alice,
            bill.id,
            BillPaymentUpdate {
                account_id: Some(b.id),
                amount: Some(Money::new(95)),
                reminder_enabled: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.account_id, b.id);
    assert_eq!(updated.amount, Money::new(95));
    assert!(!updated.reminder_enabled);
    assert_eq!(updated.payee, "Water");
    assert_eq!(updated.due_date, date(2024, 6, 10));
    assert_eq!(updated.frequency, Frequency::Quarterly);
    assert_eq!(updated.description.as_deref(), Some("water bill"));
    assert_eq!(updated.reminder_days, 5);
    assert_eq!(updated.status, BillStatus::Scheduled);

    let stored = h.engine.bill_payment(&alice, bill.id).await.unwrap();
    assert_eq!(stored.account_id, b.id);
    assert_eq!(stored.amount, Money::new(95));

    let bad_amount = h
        .engine
        .update_bill_payment(
            &alice,
            bill.id,
            BillPaymentUpdate {
                amount: Some(Money::ZERO),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(bad_amount, Err(EngineError::InvalidState(_))));

    let blank_payee = h
        .engine
        .update_bill_payment(
            &alice,
            bill.id,
            BillPaymentUpdate {
                payee: Some("   ".to_string()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(blank_payee, Err(EngineError::InvalidState(_))));
}

#[tokio::test]
async fn schedule_validates_account_and_amount() {
    let h = harness().await;
    let a = open_checking(&h.engine, "alice", 1_000).await;
    let bob_account = open_checking(&h.engine, "bob", 1_000).await;
    let alice = Actor::owner("alice");

    let zero = h
        .engine
        .schedule_bill_payment(ScheduleBillCmd::new(
            alice.clone(),
            a.id,
            "Power Co",
            Money::ZERO,
            date(2024, 1, 15),
            Frequency::Monthly,
        ))
        .await;
    assert!(matches!(zero, Err(EngineError::InvalidState(_))));

    let no_payee = h
        .engine
        .schedule_bill_payment(ScheduleBillCmd::new(
            alice.clone(),
            a.id,
            "",
            Money::new(10),
            date(2024, 1, 15),
            Frequency::Monthly,
        ))
        .await;
    assert!(matches!(no_payee, Err(EngineError::InvalidState(_))));

    let foreign = h
        .engine
        .schedule_bill_payment(ScheduleBillCmd::new(
            alice,
            bob_account.id,
            "Power Co",
            Money::new(10),
            date(2024, 1, 15),
            Frequency::Monthly,
        ))
        .await;
    assert!(matches!(foreign, Err(EngineError::NotFound(_))));

    assert!(
        h.engine
            .bill_payments_for_owner("alice", &BillPaymentFilter::default())
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn bills_of_other_owners_are_unauthorized() {
    let h = harness().await;
    let a = open_checking(&h.engine, "alice", 1_000).await;
    let bill = h
        .engine
        .schedule_bill_payment(ScheduleBillCmd::new(
            Actor::owner("alice"),
            a.id,
            "Power Co",
            Money::new(100),
            date(2024, 1, 15),
            Frequency::Monthly,
        ))
        .await
        .unwrap();
    let mallory = Actor::owner("mallory");

    assert!(matches!(
        h.engine.bill_payment(&mallory, bill.id).await,
        Err(EngineError::Unauthorized(_))
    ));
    assert!(matches!(
        h.engine.pay_bill_now(&mallory, bill.id).await,
        Err(EngineError::Unauthorized(_))
    ));
    assert!(matches!(
        h.engine.cancel_bill_payment(&mallory, bill.id).await,
        Err(EngineError::Unauthorized(_))
    ));
    assert!(matches!(
        h.engine
            .bill_payment(&mallory, uuid::Uuid::new_v4())
            .await,
        Err(EngineError::NotFound(_))
    ));
    assert_eq!(balance(&h.engine, &a).await, Money::new(1_000));

    // An elevated caller may act on it.
    let (paid, _) = h
        .engine
        .pay_bill_now(&Actor::admin("ops"), bill.id)
        .await
        .unwrap();
    assert_eq!(paid.status, BillStatus::Completed);
}

#[tokio::test]
async fn upcoming_lists_scheduled_bills_by_due_date() {
    let h = harness().await;
    let a = open_checking(&h.engine, "alice", 1_000).await;
    let alice = Actor::owner("alice");
    for (payee, due) in [
        ("Rent", date(2024, 3, 1)),
        ("Phone", date(2024, 2, 10)),
        ("Later", date(2024, 6, 1)),
    ] {
        h.engine
            .schedule_bill_payment(ScheduleBillCmd::new(
                alice.clone(),
                a.id,
                payee,
                Money::new(10),
                due,
                Frequency::OneTime,
            ))
            .await
            .unwrap();
    }

    let upcoming = h
        .engine
        .upcoming_bill_payments("alice", date(2024, 3, 1))
        .await
        .unwrap();
    let payees: Vec<&str> = upcoming.iter().map(|b| b.payee.as_str()).collect();
    assert_eq!(payees, vec!["Phone", "Rent"]);
    assert_eq!(upcoming[0].reminder_date(), Some(date(2024, 2, 7)));
}

#[tokio::test]
async fn failed_payment_record_rolls_back_debit_and_successor() {
    let h = harness().await;
    h.ids.fix_transaction_id(Some("TX0000000001"));
    // The opening deposit takes the only id the generator will hand out.
    let a = open_checking(&h.engine, "alice", 1_000).await;
    let alice = Actor::owner("alice");
    let bill = h
        .engine
        .schedule_bill_payment(ScheduleBillCmd::new(
            alice.clone(),
            a.id,
            "Power Co",
            Money::new(400),
            date(2024, 1, 15),
            Frequency::Monthly,
        ))
        .await
        .unwrap();
    h.notifier.clear();

    let err = h.engine.pay_bill_now(&alice, bill.id).await.unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    let stored = h.engine.bill_payment(&alice, bill.id).await.unwrap();
    assert_eq!(stored.status, BillStatus::Scheduled);
    assert_eq!(stored.payment_date, None);
    assert_eq!(balance(&h.engine, &a).await, Money::new(1_000));
    let all = h
        .engine
        .bill_payments_for_owner("alice", &BillPaymentFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(history(&h.engine, "alice").await.len(), 1);
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn update_rejects_foreign_or_closed_funding_accounts() {
    let h = harness().await;
    let a = open_checking(&h.engine, "alice", 1_000).await;
    let closed = open_checking(&h.engine, "alice", 0).await;
    let bobs = open_checking(&h.engine, "bob", 1_000).await;
    let alice = Actor::owner("alice");
    h.engine.close_account(&alice, closed.id).await.unwrap();
    let bill = h
        .engine
        .schedule_bill_payment(ScheduleBillCmd::new(
            alice.clone(),
            a.id,
            "Water",
            Money::new(80),
            date(2024, 6, 10),
            Frequency::OneTime,
        ))
        .await
        .unwrap();

    for account_id in [bobs.id, closed.id] {
        let err = h
            .engine
            .update_bill_payment(
                &alice,
                bill.id,
                BillPaymentUpdate {
                    account_id: Some(account_id),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    let stored = h.engine.bill_payment(&alice, bill.id).await.unwrap();
    assert_eq!(stored.account_id, a.id);
}

#[tokio::test]
async fn paying_from_a_closed_account_is_not_found() {
    let h = harness().await;
    let a = open_checking(&h.engine, "alice", 500).await;
    let alice = Actor::owner("alice");
    let bill = h
        .engine
        .schedule_bill_payment(ScheduleBillCmd::new(
            alice.clone(),
            a.id,
            "Gym",
            Money::new(50),
            date(2024, 4, 1),
            Frequency::Monthly,
        ))
        .await
        .unwrap();
    h.engine
        .withdraw(engine::WithdrawCmd::new(alice.clone(), a.id, Money::new(500)))
        .await
        .unwrap();
    h.engine.close_account(&alice, a.id).await.unwrap();

    let err = h.engine.pay_bill_now(&alice, bill.id).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    let stored = h.engine.bill_payment(&alice, bill.id).await.unwrap();
    assert_eq!(stored.status, BillStatus::Scheduled);
    assert_eq!(stored.payment_date, None);
}

#[tokio::test]
async fn concurrent_payments_of_one_bill_settle_once() {
    let h = harness().await;
    let a = open_checking(&h.engine, "alice", 1_000).await;
    let alice = Actor::owner("alice");
    let bill = h
        .engine
        .schedule_bill_payment(ScheduleBillCmd::new(
            alice.clone(),
            a.id,
            "Rent",
            Money::new(300),
            date(2024, 1, 1),
            Frequency::Monthly,
        ))
        .await
        .unwrap();

    let (first, second) = tokio::join!(
        h.engine.pay_bill_now(&alice, bill.id),
        h.engine.pay_bill_now(&alice, bill.id),
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        outcomes
            .iter()
            .any(|r| matches!(r, Err(EngineError::InvalidState(_))))
    );
    assert_eq!(balance(&h.engine, &a).await, Money::new(700));
    let scheduled = h
        .engine
        .bill_payments_for_owner("alice", &BillPaymentFilter::default().status(BillStatus::Scheduled))
        .await
        .unwrap();
    assert_eq!(scheduled.len(), 1);
    assert_eq!(scheduled[0].due_date, date(2024, 2, 1));
}
