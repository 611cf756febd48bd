use obligation_engine_rs::chrono::{NaiveDate, TimeZone, Utc};
use obligation_engine_rs::{
    Direction, EngineConfig, Event, MemoryStore, Money, MutationScope, ObligationChanges,
    ObligationEngine, ObligationError, ObligationInstance, ObligationQuery, ObligationRequest,
    ObligationStatus, ObligationStore, SafeTimeProvider, TimeSource, Uuid,
};

fn clock() -> SafeTimeProvider {
    SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2025, 3, 12, 10, 0, 0).unwrap(),
    ))
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn purchase(user: Uuid, card: Uuid, count: u32) -> ObligationRequest {
    ObligationRequest::new(
        user,
        "Celular",
        Money::from_major(1200),
        Direction::Outflow,
        Uuid::new_v4(),
        date(2025, 3, 15),
    )
    .installments(count)
    .on_card(card)
}

#[test]
fn test_series_delete_removes_exactly_the_tail() {
    let time = clock();
    for config in [EngineConfig::default(), EngineConfig::legacy()] {
        for target in 0..6 {
            let mut engine = ObligationEngine::new(MemoryStore::new(), config.clone()).unwrap();
            let user = Uuid::new_v4();
            let card = Uuid::new_v4();
            let ids = engine.create(&purchase(user, card, 6), &time).unwrap().succeeded;

            engine
                .delete(ids[target], MutationScope::Series, &time)
                .unwrap();

            for (i, id) in ids.iter().enumerate() {
                let present = engine.store().get(*id).unwrap().is_some();
                assert_eq!(
                    present,
                    i < target,
                    "installment {} after deleting from {}",
                    i + 1,
                    target + 1
                );
            }
        }
    }
}

#[test]
fn test_legacy_rows_without_flat_fields() {
    let time = clock();
    let user = Uuid::new_v4();
    let card = Uuid::new_v4();
    let category = Uuid::new_v4();

    // three record shapes for one purchase
    let mut rows = Vec::new();
    for index in 1..=3u32 {
        let value = match index {
            1 => serde_json::json!({
                "id": Uuid::new_v4(), "user_id": user, "description": "Sofa - Parcela 1/3",
                "amount": "400.00", "direction": "outflow", "expected_date": "2025-03-10",
                "category_id": category, "credit_card_id": card, "status": "pending",
                "is_installment": true, "current_installment": 1, "total_installments": 3
            }),
            2 => serde_json::json!({
                "id": Uuid::new_v4(), "user_id": user, "description": "Sofa (2/3)",
                "amount": "400.00", "direction": "outflow", "expected_date": "2025-04-10",
                "category_id": category, "credit_card_id": card, "status": "pending",
                "is_installment": true,
                "installment_info": { "current": 2, "total": 3 }
            }),
            _ => serde_json::json!({
                "id": Uuid::new_v4(), "user_id": user, "description": "Sofa 3/3",
                "amount": "400.00", "direction": "outflow", "expected_date": "2025-05-10",
                "category_id": category, "credit_card_id": card, "status": "pending",
                "is_installment": true
            }),
        };
        let row: ObligationInstance = serde_json::from_value(value).unwrap();
        rows.push(row);
    }
    let ids: Vec<_> = rows.iter().map(|r| r.id).collect();

    let mut engine =
        ObligationEngine::new(MemoryStore::with_rows(rows), EngineConfig::default()).unwrap();
    let changes = ObligationChanges::new().description("Sofa retratil");
    let outcome = engine
        .edit(ids[1], MutationScope::Series, &changes, &time)
        .unwrap();
    assert_eq!(outcome.succeeded, vec![ids[1], ids[2]]);

    let second = engine.get(ids[1]).unwrap();
    let third = engine.get(ids[2]).unwrap();
    assert_eq!(second.description, "Sofa retratil - Parcela 2/3");
    assert_eq!(third.description, "Sofa retratil - Parcela 3/3");
    assert_eq!(engine.get(ids[0]).unwrap().description, "Sofa - Parcela 1/3");
}

#[test]
fn test_settled_member_blocks_series_edit() {
    let time = clock();
    let user = Uuid::new_v4();
    let card = Uuid::new_v4();
    let mut engine = ObligationEngine::new(MemoryStore::new(), EngineConfig::default()).unwrap();
    let ids = engine.create(&purchase(user, card, 4), &time).unwrap().succeeded;

    let mut last = engine.get(ids[3]).unwrap();
    last.status = ObligationStatus::Settled;
    engine.store_mut().update(&last).unwrap();
    engine.events.clear();

    let changes = ObligationChanges::new().amount(Money::from_major(1));
    let err = engine
        .edit(ids[0], MutationScope::Series, &changes, &time)
        .unwrap_err();
    assert!(matches!(err, ObligationError::Validation { .. }));
    assert!(engine.events.events().is_empty());

    let untouched = engine
        .store()
        .query(&ObligationQuery::for_user(user).card(card))
        .unwrap();
    assert!(untouched.iter().all(|r| r.amount == Money::from_major(300)));
}

#[test]
fn test_partial_series_edit_keeps_prefix_and_signals_it() {
    let time = clock();
    let user = Uuid::new_v4();
    let card = Uuid::new_v4();
    let mut engine = ObligationEngine::new(MemoryStore::new(), EngineConfig::default()).unwrap();
    let ids = engine.create(&purchase(user, card, 5), &time).unwrap().succeeded;
    engine.events.clear();
    engine.store_mut().fail_after(2);

    let changes = ObligationChanges::new().expected_date(date(2025, 3, 20));
    let err = engine
        .edit(ids[0], MutationScope::Series, &changes, &time)
        .unwrap_err();

    match &err {
        ObligationError::PartialBatchFailure {
            succeeded,
            total,
            succeeded_ids,
            failed_id,
            ..
        } => {
            assert_eq!((*succeeded, *total), (2, 5));
            assert_eq!(succeeded_ids, &ids[..2].to_vec());
            assert_eq!(*failed_id, Some(ids[2]));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    engine.store_mut().clear_failures();
    assert_eq!(engine.get(ids[1]).unwrap().expected_date, date(2025, 4, 20));
    assert_eq!(engine.get(ids[2]).unwrap().expected_date, date(2025, 5, 15));

    let events = engine.events.take_events();
    assert!(matches!(
        &events[0],
        Event::ObligationsUpdated { ids: updated, .. } if updated.len() == 2
    ));
    assert!(matches!(&events[1], Event::CardsChanged { .. }));
}
