/// card limits - open invoice month and limit use across cards
use obligation_engine_rs::chrono::{Duration, NaiveDate, TimeZone, Utc};
use obligation_engine_rs::{
    CreditCard, Direction, EngineConfig, MemoryStore, Money, ObligationEngine, ObligationRequest,
    Periodicity, ReferenceMonthMode, SafeTimeProvider, TimeSource, Uuid,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2025, 5, 8, 15, 0, 0).unwrap(),
    ));
    let controller = time.test_control().unwrap();

    let user = Uuid::new_v4();
    let visa = CreditCard::new("Visa", Money::from_major(5000), 10).with_due_day(17);
    let master = CreditCard::new("Master", Money::from_major(3000), 25).with_due_day(2);
    let cards = vec![visa.clone(), master.clone()];

    let config = EngineConfig::default().with_utc_offset_minutes(-180);
    let mut engine = ObligationEngine::new(MemoryStore::new(), config)?;

    let streaming = ObligationRequest::new(
        user,
        "Streaming",
        Money::from_major(45),
        Direction::Outflow,
        Uuid::new_v4(),
        NaiveDate::from_ymd_opt(2025, 5, 9).unwrap(),
    )
    .recurring(Periodicity::Monthly, NaiveDate::from_ymd_opt(2025, 12, 9).unwrap())
    .on_card(visa.id);
    engine.create(&streaming, &time)?;

    let tv = ObligationRequest::new(
        user,
        "TV",
        Money::from_major(2400),
        Direction::Outflow,
        Uuid::new_v4(),
        NaiveDate::from_ymd_opt(2025, 5, 20).unwrap(),
    )
    .installments(6)
    .on_card(master.id);
    engine.create(&tv, &time)?;

    println!("{}", engine.card_view(user, &visa, &time)?.json()?);

    // a week later the visa cycle has closed
    controller.advance(Duration::days(7));
    println!("{}", engine.card_view(user, &visa, &time)?.json()?);

    let shared = engine.card_summary(user, &cards, &time)?;
    println!("{}", shared.json()?);

    engine.config.reference_month_mode = ReferenceMonthMode::PerCard;
    let per_card = engine.card_summary(user, &cards, &time)?;
    println!("{}", per_card.json()?);

    Ok(())
}
