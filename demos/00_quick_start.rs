/// quick start - a monthly bill stored and edited through the engine
use obligation_engine_rs::chrono::{NaiveDate, TimeZone, Utc};
use obligation_engine_rs::{
    telemetry, Direction, EngineConfig, MemoryStore, Money, MutationScope, ObligationChanges,
    ObligationEngine, ObligationQuery, ObligationRequest, ObligationStore, Periodicity,
    SafeTimeProvider, TimeSource, Uuid,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init_tracing();

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2025, 1, 2, 9, 0, 0).unwrap(),
    ));
    let mut engine = ObligationEngine::new(MemoryStore::new(), EngineConfig::default())?;
    let user = Uuid::new_v4();

    // rent on the 5th of every month this year
    let rent = ObligationRequest::new(
        user,
        "Aluguel",
        Money::from_major(1800),
        Direction::Outflow,
        Uuid::new_v4(),
        NaiveDate::from_ymd_opt(2025, 1, 5).unwrap(),
    )
    .recurring(
        Periodicity::Monthly,
        NaiveDate::from_ymd_opt(2025, 12, 5).unwrap(),
    );

    let created = engine.create(&rent, &time)?;
    println!("created {} instances", created.total);

    // rent goes up from July on
    let july = created.succeeded[6];
    let changes = ObligationChanges::new().amount(Money::from_major(1950));
    let updated = engine.edit(july, MutationScope::Series, &changes, &time)?;
    println!("updated {} instances", updated.total);

    for row in engine.store().query(&ObligationQuery::for_user(user))? {
        println!(
            "{}  {}  {}",
            row.expected_month(),
            row.description,
            row.amount
        );
    }

    for event in engine.events.take_events() {
        println!("{:?}", event);
    }

    Ok(())
}
