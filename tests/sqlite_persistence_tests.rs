#![cfg(feature = "sqlite")]

use chrono::NaiveDate;
use day_planner::{
    ClockConfig, ScheduleError, SqliteTaskRepository, TaskDraft, TaskPatch, TaskRepository,
    TaskService, TimeOfDay,
};
use std::sync::Arc;
use tempfile::NamedTempFile;

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn open_service(file: &NamedTempFile) -> TaskService {
    let repository = SqliteTaskRepository::new(file.path()).expect("open sqlite file");
    TaskService::with_repository(ClockConfig::default(), Arc::new(repository))
}

#[test]
fn sqlite_repository_round_trip() {
    let repository = SqliteTaskRepository::in_memory().unwrap();
    let service = TaskService::in_memory(ClockConfig::default());
    let task = service
        .create(&TaskDraft::new("2025-04-02", "Dentist", "15:00", "15:45"), false)
        .unwrap();

    repository.insert(&task).unwrap();
    assert_eq!(repository.find_by_id(task.id).unwrap(), Some(task.clone()));
    assert_eq!(repository.find_by_date(d(2025, 4, 2)).unwrap(), vec![task.clone()]);
    assert!(repository.find_by_date(d(2025, 4, 3)).unwrap().is_empty());

    let mut moved = task.clone();
    moved.start_time = "16:00".parse().unwrap();
    moved.end_time = "16:45".parse().unwrap();
    assert!(repository.update_by_id(task.id, &moved).unwrap());
    assert_eq!(repository.find_by_id(task.id).unwrap(), Some(moved));

    assert!(repository.delete_by_id(task.id).unwrap());
    assert!(!repository.delete_by_id(task.id).unwrap());
    assert_eq!(repository.find_by_id(task.id).unwrap(), None);
}

#[test]
fn sqlite_repository_rejects_duplicate_insert() {
    let repository = SqliteTaskRepository::in_memory().unwrap();
    let service = TaskService::in_memory(ClockConfig::default());
    let task = service
        .create(&TaskDraft::new("2025-04-02", "Dentist", "15:00", "15:45"), false)
        .unwrap();
    repository.insert(&task).unwrap();
    assert!(repository.insert(&task).is_err());
}

#[test]
fn tasks_survive_a_service_restart() {
    let file = NamedTempFile::new().unwrap();
    let created = {
        let service = open_service(&file);
        let created = service
            .create(&TaskDraft::new("2025-04-02", "Standup", "09:00", "09:15"), false)
            .unwrap();
        service
            .create(&TaskDraft::new("2025-04-02", "Review", "11:00", "12:00"), false)
            .unwrap();
        created
    };

    let service = open_service(&file);
    let tasks = service.list(d(2025, 4, 2)).unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0], created);
    assert_eq!(tasks[1].title, "Review");
}

#[test]
fn hydrated_tasks_take_part_in_conflict_checks() {
    let file = NamedTempFile::new().unwrap();
    {
        let service = open_service(&file);
        service
            .create(&TaskDraft::new("2025-04-02", "Standup", "09:00", "10:00"), false)
            .unwrap();
    }

    let service = open_service(&file);
    let err = service
        .create(&TaskDraft::new("2025-04-02", "Clash", "09:30", "10:30"), false)
        .unwrap_err();
    match err {
        ScheduleError::Conflict { overlaps } => assert_eq!(overlaps[0].title, "Standup"),
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[test]
fn updates_relocations_and_deletes_are_written_through() {
    let file = NamedTempFile::new().unwrap();
    let id = {
        let service = open_service(&file);
        let task = service
            .create(&TaskDraft::new("2025-04-02", "Walk", "14:00", "14:30"), false)
            .unwrap();
        let patch = TaskPatch {
            title: Some("Long walk".into()),
            ..TaskPatch::default()
        };
        service.update(task.id, &patch, false).unwrap();
        service
            .relocate(task.id, "10:05".parse::<TimeOfDay>().unwrap(), false)
            .unwrap();
        task.id
    };

    let service = open_service(&file);
    let stored = service.get(id).unwrap();
    assert_eq!(stored.title, "Long walk");
    assert_eq!(stored.start_time.to_string(), "10:00");
    assert_eq!(stored.end_time.to_string(), "10:30");

    service.delete(id).unwrap();
    let service = open_service(&file);
    assert!(service.list(d(2025, 4, 2)).unwrap().is_empty());
    assert!(matches!(service.get(id), Err(ScheduleError::NotFound(_))));
}
