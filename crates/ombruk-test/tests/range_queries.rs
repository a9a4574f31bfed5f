#![allow(clippy::expect_used)]
//! Range selection and deletion across several stored series.

use chrono::TimeDelta;
use ombruk_db::db::memory::MemoryStore;
use ombruk_db::db::store::OccurrenceFilter;
use ombruk_recurrence::{DaySet, RecurrenceRule};
use ombruk_service::error::ServiceError;
use ombruk_service::schedule::SchedulingService;
use ombruk_test::fixtures::{assigned_pickup, at, memory_service, monday_anchor, pickup};
use uuid::Uuid;

struct Seeded {
    service: SchedulingService<MemoryStore>,
    daily: Uuid,
    weekly: Uuid,
    location: Uuid,
    actor: Uuid,
}

/// Two series: every day for two weeks, and four weekly pickups by one actor.
async fn seeded() -> Seeded {
    let service = memory_service();

    let daily_template = pickup(monday_anchor());
    let location = daily_template.payload.location_id;
    let daily = service
        .schedule_series(
            &daily_template,
            Some(&RecurrenceRule::weekly(2).with_days(DaySet::all())),
        )
        .await
        .expect("daily series scheduled")
        .rule_id()
        .expect("daily rule stored");

    let actor = Uuid::now_v7();
    let weekly = service
        .schedule_series(
            &assigned_pickup(monday_anchor() + TimeDelta::hours(2), actor),
            Some(&RecurrenceRule::weekly(4)),
        )
        .await
        .expect("weekly series scheduled")
        .rule_id()
        .expect("weekly rule stored");

    Seeded {
        service,
        daily,
        weekly,
        location,
        actor,
    }
}

#[test_log::test(tokio::test)]
async fn filters_combine_with_and() {
    let seeded = seeded().await;

    let in_week_two = OccurrenceFilter::new()
        .starting_from(at(2020, 7, 20, 0))
        .starting_until(at(2020, 7, 26, 23));
    assert_eq!(
        seeded
            .service
            .find_occurrences(&in_week_two)
            .await
            .expect("select succeeds")
            .len(),
        8
    );

    let daily_in_week_two = in_week_two.clone().at_location(seeded.location);
    assert_eq!(
        seeded
            .service
            .find_occurrences(&daily_in_week_two)
            .await
            .expect("select succeeds")
            .len(),
        7
    );

    let by_actor = OccurrenceFilter::new().by_actor(seeded.actor);
    let found = seeded
        .service
        .find_occurrences(&by_actor)
        .await
        .expect("select succeeds");
    assert_eq!(found.len(), 4);
    assert!(found.iter().all(|o| o.recurrence_rule_id == Some(seeded.weekly)));
}

#[test_log::test(tokio::test)]
async fn results_are_ordered_by_start() {
    let seeded = seeded().await;

    let all = seeded
        .service
        .find_occurrences(&OccurrenceFilter::new())
        .await
        .expect("select succeeds");

    assert_eq!(all.len(), 18);
    assert!(all.windows(2).all(|pair| pair[0].start_at <= pair[1].start_at));
}

#[test_log::test(tokio::test)]
async fn unscoped_delete_leaves_other_series_alone() {
    let seeded = seeded().await;

    let deleted = seeded
        .service
        .delete_series(&OccurrenceFilter::for_rule(seeded.daily))
        .await
        .expect("delete succeeds");

    assert_eq!(deleted.occurrences.len(), 14);
    assert_eq!(deleted.rule_removed, Some(seeded.daily));
    assert!(
        seeded
            .service
            .find_occurrences(&OccurrenceFilter::for_rule(seeded.daily))
            .await
            .expect("select succeeds")
            .is_empty()
    );
    assert!(matches!(
        seeded.service.get_rule(seeded.daily).await,
        Err(ServiceError::NotFound(_))
    ));
    assert!(seeded.service.get_rule(seeded.weekly).await.is_ok());
    assert_eq!(seeded.service.store().occurrence_count().await, 4);
}

#[test_log::test(tokio::test)]
async fn scoped_delete_trims_the_tail_of_a_series() {
    let seeded = seeded().await;
    let cutoff = at(2020, 7, 27, 0);

    let deleted = seeded
        .service
        .delete_series(&OccurrenceFilter::for_rule(seeded.weekly).starting_from(cutoff))
        .await
        .expect("delete succeeds");

    assert_eq!(deleted.occurrences.len(), 2);
    assert!(deleted.occurrences.iter().all(|o| o.start_at >= cutoff));
    assert_eq!(deleted.rule_removed, None);
    assert!(seeded.service.get_rule(seeded.weekly).await.is_ok());
}

#[test_log::test(tokio::test)]
async fn deleting_a_removed_series_twice_is_empty() {
    let seeded = seeded().await;
    let filter = OccurrenceFilter::for_rule(seeded.weekly);

    seeded
        .service
        .delete_series(&filter)
        .await
        .expect("first delete succeeds");
    let second = seeded.service.delete_series(&filter).await;

    assert!(matches!(second, Err(ServiceError::EmptyDeleteTarget(_))));
}

#[test_log::test(tokio::test)]
async fn deleted_occurrences_no_longer_exist() {
    let seeded = seeded().await;
    let filter = OccurrenceFilter::new().starting_until(at(2020, 7, 14, 23));

    let deleted = seeded
        .service
        .delete_series(&filter)
        .await
        .expect("delete succeeds");

    assert_eq!(deleted.occurrences.len(), 3);
    for occurrence in &deleted.occurrences {
        assert!(
            !seeded
                .service
                .occurrence_exists(occurrence.id)
                .await
                .expect("lookup succeeds")
        );
    }
}
