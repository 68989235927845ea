use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use dayblock_core::time::horizon;
use dayblock_core::{
    AutoScheduler, BlockType, Habit, MemoryStorage, NewTimeBlock, Placement, Priority, Settings,
    Storage, StoreSnapshot, Task, TimeSlot, plan_habit_week,
};

// 2026-03-02 is a Monday.
fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, d, h, m, 0).unwrap()
}

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

async fn all_blocks(store: &MemoryStorage) -> Vec<dayblock_core::TimeBlock> {
    store
        .list_time_blocks(at(1, 0, 0), at(31, 0, 0))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_single_task_lands_at_work_start() {
    let store = Arc::new(MemoryStorage::new());
    store
        .create_task(Task::new("t1", "Write summary").with_duration(30))
        .await
        .unwrap();

    let report = AutoScheduler::new(store.clone())
        .auto_schedule_at(at(2, 8, 0))
        .await
        .unwrap();

    let expected = TimeSlot::new(at(2, 9, 0), at(2, 9, 30));
    assert_eq!(report.outcomes[0].placement, Placement::Placed(expected));

    let task = store.get_task("t1").await.unwrap().unwrap();
    assert_eq!(task.scheduled_slot(), Some(expected));

    let blocks = all_blocks(&store).await;
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].block_type, BlockType::Task);
    assert_eq!(blocks[0].reference_id.as_deref(), Some("t1"));
    assert_eq!(blocks[0].slot(), expected);
}

#[tokio::test]
async fn test_priority_decides_order_on_shared_day() {
    let store = Arc::new(MemoryStorage::new());
    store
        .create_task(Task::new("x", "X").with_priority(Priority::High).with_duration(60))
        .await
        .unwrap();
    store
        .create_task(Task::new("y", "Y").with_priority(Priority::Critical).with_duration(60))
        .await
        .unwrap();

    AutoScheduler::new(store.clone())
        .auto_schedule_at(at(2, 8, 0))
        .await
        .unwrap();

    let y = store.get_task("y").await.unwrap().unwrap();
    let x = store.get_task("x").await.unwrap().unwrap();
    assert_eq!(y.scheduled_slot(), Some(TimeSlot::new(at(2, 9, 0), at(2, 10, 0))));
    assert_eq!(x.scheduled_slot(), Some(TimeSlot::new(at(2, 10, 0), at(2, 11, 0))));
}

#[tokio::test]
async fn test_task_longer_than_window_is_left_unscheduled() {
    // Stored records are not revalidated on load, so an oversized task can exist.
    let store = Arc::new(MemoryStorage::from_snapshot(StoreSnapshot {
        tasks: vec![Task::new("big", "Offsite").with_duration(600)],
        ..Default::default()
    }));

    let report = AutoScheduler::new(store.clone())
        .auto_schedule_at(at(2, 8, 0))
        .await
        .unwrap();

    assert_eq!(report.outcomes[0].placement, Placement::Unplaced);
    assert_eq!(report.summary(), "0 of 1 tasks scheduled");
    assert!(all_blocks(&store).await.is_empty());
}

#[tokio::test]
async fn test_existing_block_is_skipped() {
    let store = Arc::new(MemoryStorage::new());
    let meeting = Habit::new("h1", "Standup");
    store
        .create_time_block(NewTimeBlock::for_habit(
            &meeting,
            TimeSlot::new(at(2, 9, 0), at(2, 10, 0)),
        ))
        .await
        .unwrap();
    store.create_task(Task::new("t1", "Review")).await.unwrap();

    AutoScheduler::new(store.clone())
        .auto_schedule_at(at(2, 8, 0))
        .await
        .unwrap();

    let task = store.get_task("t1").await.unwrap().unwrap();
    assert_eq!(task.scheduled_slot(), Some(TimeSlot::new(at(2, 10, 0), at(2, 10, 30))));
}

#[tokio::test]
async fn test_full_run_properties_hold() {
    let tz: Tz = "America/New_York".parse().unwrap();
    let store = Arc::new(MemoryStorage::new());
    store
        .upsert_settings(Settings {
            timezone: tz,
            ..Settings::default()
        })
        .await
        .unwrap();

    store
        .create_habit(Habit::new("lunch", "Lunch").with_duration(60).with_start_time(hm(12, 0)))
        .await
        .unwrap();
    store
        .create_habit(
            Habit::new("gym", "Gym")
                .with_duration(45)
                .with_days([1, 3])
                .with_start_time(hm(16, 0)),
        )
        .await
        .unwrap();
    let first_week = chrono::NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
    plan_habit_week(store.as_ref(), first_week, tz).await.unwrap();
    plan_habit_week(store.as_ref(), first_week + chrono::Days::new(7), tz)
        .await
        .unwrap();

    let priorities = [Priority::Low, Priority::Critical, Priority::Medium, Priority::High];
    let durations = [25, 45, 60, 90, 120, 15, 5, 240];
    for i in 0..40 {
        store
            .create_task(
                Task::new(format!("t{i:02}"), format!("Task {i}"))
                    .with_priority(priorities[i % priorities.len()])
                    .with_duration(durations[i % durations.len()]),
            )
            .await
            .unwrap();
    }

    // Mid-morning with seconds; 10:07:31 EST.
    let now = Utc.with_ymd_and_hms(2026, 3, 2, 15, 7, 31).unwrap();
    let report = AutoScheduler::new(store.clone())
        .auto_schedule_at(now)
        .await
        .unwrap();
    assert_eq!(report.attempted(), 40);
    assert!(report.placed_count() > 0);

    let range = horizon(now, tz);
    for (_, slot) in report.placed() {
        assert!(slot.start >= now, "{slot} starts before now");
        assert!(slot.end <= range.end, "{slot} ends past the horizon");

        let start = slot.start.with_timezone(&tz);
        let end = slot.end.with_timezone(&tz);
        assert_eq!(start.minute() % 15, 0);
        assert_eq!(start.second(), 0);
        assert_eq!(start.date_naive(), end.date_naive());
        assert!((1..=5).contains(&start.weekday().num_days_from_sunday()));
        assert!(start.time() >= hm(9, 0));
        assert!(end.time() <= hm(17, 0));
    }

    let blocks = all_blocks(&store).await;
    for (i, a) in blocks.iter().enumerate() {
        for b in &blocks[i + 1..] {
            assert!(
                !a.slot().overlaps(&b.slot()),
                "{} overlaps {}",
                a.title,
                b.title
            );
        }
    }
}

#[tokio::test]
async fn test_second_run_changes_nothing() {
    let store = Arc::new(MemoryStorage::new());
    for i in 0..5 {
        store
            .create_task(Task::new(format!("t{i}"), "x").with_duration(45))
            .await
            .unwrap();
    }
    let scheduler = AutoScheduler::new(store.clone());

    let first = scheduler.auto_schedule_at(at(2, 8, 0)).await.unwrap();
    assert_eq!(first.placed_count(), 5);
    let tasks_after_first = store.list_tasks().await.unwrap();
    let blocks_after_first = all_blocks(&store).await.len();

    let second = scheduler.auto_schedule_at(at(2, 8, 0)).await.unwrap();
    assert_eq!(second.attempted(), 0);
    assert_eq!(store.list_tasks().await.unwrap(), tasks_after_first);
    assert_eq!(all_blocks(&store).await.len(), blocks_after_first);
}

#[tokio::test]
async fn test_concurrent_runs_are_serialized() {
    let store = Arc::new(MemoryStorage::new());
    for i in 0..6 {
        store
            .create_task(Task::new(format!("t{i}"), "x").with_duration(60))
            .await
            .unwrap();
    }
    let scheduler = Arc::new(AutoScheduler::new(store.clone()));

    let (a, b) = tokio::join!(
        scheduler.auto_schedule_at(at(2, 8, 0)),
        scheduler.auto_schedule_at(at(2, 8, 0)),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.placed_count() + b.placed_count(), 6);
    assert_eq!(a.attempted().min(b.attempted()), 0);

    let blocks = all_blocks(&store).await;
    assert_eq!(blocks.len(), 6);
    for pair in blocks.windows(2) {
        assert!(pair[0].end_time <= pair[1].start_time);
    }
}
