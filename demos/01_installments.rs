/// installments - splitting a purchase and cancelling the rest of it
use obligation_engine_rs::chrono::{NaiveDate, TimeZone, Utc};
use obligation_engine_rs::{
    Direction, EngineConfig, MemoryStore, Money, MutationScope, ObligationEngine, ObligationQuery,
    ObligationRequest, ObligationStore, SafeTimeProvider, SplitPolicy, TimeSource, Uuid,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).unwrap(),
    ));
    let user = Uuid::new_v4();
    let card = Uuid::new_v4();

    let purchase = ObligationRequest::new(
        user,
        "Geladeira",
        Money::from_major(1000),
        Direction::Outflow,
        Uuid::new_v4(),
        NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
    )
    .installments(3)
    .on_card(card);

    // the default policy puts the leftover cent on the last installment
    for policy in [SplitPolicy::RemainderToLast, SplitPolicy::EqualDrift] {
        let config = EngineConfig::default().with_split_policy(policy);
        let mut engine = ObligationEngine::new(MemoryStore::new(), config)?;
        engine.create(&purchase, &time)?;

        println!("{:?}:", policy);
        for row in engine.store().query(&ObligationQuery::for_user(user))? {
            println!(
                "  {}  {}  {}",
                row.expected_date, row.description, row.amount
            );
        }
    }

    // return the fridge after the first installment
    let mut engine = ObligationEngine::new(MemoryStore::new(), EngineConfig::default())?;
    let ids = engine.create(&purchase, &time)?.succeeded;
    let removed = engine.delete(ids[1], MutationScope::Series, &time)?;
    println!(
        "\nremoved {} of {} installments",
        removed.succeeded_count(),
        ids.len()
    );
    println!("left: {}", engine.store().len());

    Ok(())
}
