// tests/task_store_test.rs
// Tasks, statuses, assignees and time-window listings

mod common;

use chrono::{Duration, Utc};

use common::{seed_project, seed_user, test_db};
use taskbot::task::{NewTask, TaskStatus, TaskUpdate};

#[tokio::test]
async fn test_create_with_assignees_ignores_duplicates() {
    let db = test_db().await;
    seed_user(&db, 1, "owner").await;
    seed_user(&db, 2, "helper").await;
    let project = seed_project(&db, 1, "Tasks").await;

    let mut uow = db.begin().await.unwrap();
    let task = uow
        .tasks()
        .create(&NewTask::new(project.id, "Order chairs", 1).with_assignees([2, 1, 2]))
        .await
        .unwrap();
    assert_eq!(task.status, TaskStatus::Pending);

    let details = uow.tasks().get_by_id(task.id).await.unwrap().unwrap();
    assert_eq!(details.project.id, project.id);
    let assignees: Vec<i64> = details.assignees.iter().map(|u| u.telegram_id).collect();
    assert_eq!(assignees.len(), 2);
    assert!(assignees.contains(&1) && assignees.contains(&2));
}

#[tokio::test]
async fn test_project_ordering_nulls_last() {
    let db = test_db().await;
    seed_user(&db, 1, "owner").await;
    let project = seed_project(&db, 1, "Order").await;
    let now = Utc::now().naive_utc();

    let mut uow = db.begin().await.unwrap();
    let mut tasks = uow.tasks();
    let undated_old = tasks.create(&NewTask::new(project.id, "Undated old", 1)).await.unwrap();
    let late = tasks
        .create(&NewTask::new(project.id, "Late", 1).with_deadline(now + Duration::days(5)))
        .await
        .unwrap();
    let soon = tasks
        .create(&NewTask::new(project.id, "Soon", 1).with_deadline(now + Duration::days(1)))
        .await
        .unwrap();
    let undated_new = tasks.create(&NewTask::new(project.id, "Undated new", 1)).await.unwrap();

    let ids: Vec<i64> = tasks
        .list_by_project(project.id)
        .await
        .unwrap()
        .iter()
        .map(|t| t.task.id)
        .collect();
    assert_eq!(ids, vec![soon.id, late.id, undated_new.id, undated_old.id]);
}

#[tokio::test]
async fn test_status_sets_and_clears_completion() {
    let db = test_db().await;
    seed_user(&db, 1, "owner").await;
    let project = seed_project(&db, 1, "Status").await;

    let mut uow = db.begin().await.unwrap();
    let task = uow
        .tasks()
        .create(&NewTask::new(project.id, "Finish", 1))
        .await
        .unwrap();

    let done = uow
        .tasks()
        .update_status(task.id, TaskStatus::Completed)
        .await
        .unwrap()
        .unwrap();
    assert!(done.completed_at.is_some());

    let reopened = uow
        .tasks()
        .update_status(task.id, TaskStatus::Delayed)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reopened.status, TaskStatus::Delayed);
    assert!(reopened.completed_at.is_none());

    assert!(uow.tasks().update_status(999, TaskStatus::Completed).await.unwrap().is_none());
}

#[tokio::test]
async fn test_assignee_round_trip_is_idempotent() {
    let db = test_db().await;
    seed_user(&db, 1, "owner").await;
    seed_user(&db, 2, "helper").await;
    let project = seed_project(&db, 1, "Assign").await;

    let mut uow = db.begin().await.unwrap();
    let mut tasks = uow.tasks();
    let task = tasks
        .create(&NewTask::new(project.id, "Sweep", 1).with_assignees([2]))
        .await
        .unwrap();

    assert!(tasks.remove_assignee(task.id, 2).await.unwrap());
    assert!(!tasks.remove_assignee(task.id, 2).await.unwrap());

    assert!(tasks.add_assignee(task.id, 2).await.unwrap());
    assert!(!tasks.add_assignee(task.id, 2).await.unwrap());

    let details = tasks.get_by_id(task.id).await.unwrap().unwrap();
    assert_eq!(details.assignees.len(), 1);
}

#[tokio::test]
async fn test_partial_update_keeps_unset_fields() {
    let db = test_db().await;
    seed_user(&db, 1, "owner").await;
    let project = seed_project(&db, 1, "Edit").await;
    let deadline = Utc::now().naive_utc() + Duration::days(2);

    let mut uow = db.begin().await.unwrap();
    let mut new = NewTask::new(project.id, "Draft", 1).with_deadline(deadline);
    new.description = Some("first pass".into());
    let task = uow.tasks().create(&new).await.unwrap();

    let updated = uow
        .tasks()
        .update(
            task.id,
            &TaskUpdate {
                title: Some("Final".into()),
                ..TaskUpdate::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.title, "Final");
    assert_eq!(updated.description.as_deref(), Some("first pass"));
    assert_eq!(updated.deadline, Some(deadline));

    let untouched = uow
        .tasks()
        .update(task.id, &TaskUpdate { title: Some(String::new()), ..TaskUpdate::default() })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(untouched.title, "Final");
}

#[tokio::test]
async fn test_due_and_overdue_windows() {
    let db = test_db().await;
    seed_user(&db, 1, "owner").await;
    seed_user(&db, 2, "helper").await;
    let project = seed_project(&db, 1, "Windows").await;
    let now = Utc::now().naive_utc();

    let mut uow = db.begin().await.unwrap();
    let mut tasks = uow.tasks();
    let due = tasks
        .create(&NewTask::new(project.id, "Due", 1).with_deadline(now + Duration::days(2)).with_assignees([2]))
        .await
        .unwrap();
    let far = tasks
        .create(&NewTask::new(project.id, "Far", 1).with_deadline(now + Duration::days(10)).with_assignees([2]))
        .await
        .unwrap();
    let late = tasks
        .create(&NewTask::new(project.id, "Late", 1).with_deadline(now - Duration::hours(1)).with_assignees([2]))
        .await
        .unwrap();
    let done_late = tasks
        .create(&NewTask::new(project.id, "Done late", 1).with_deadline(now - Duration::hours(2)).with_assignees([2]))
        .await
        .unwrap();
    tasks.update_status(done_late.id, TaskStatus::Completed).await.unwrap();
    let delayed = tasks
        .create(&NewTask::new(project.id, "Delayed", 1).with_deadline(now + Duration::days(1)))
        .await
        .unwrap();
    tasks.update_status(delayed.id, TaskStatus::Delayed).await.unwrap();

    let ids = |list: Vec<taskbot::task::AssignedTask>| list.iter().map(|t| t.task.id).collect::<Vec<_>>();

    assert_eq!(ids(tasks.list_due_within(3, now).await.unwrap()), vec![due.id]);
    assert_eq!(ids(tasks.list_overdue(now).await.unwrap()), vec![late.id]);
    assert_eq!(
        ids(tasks.get_tasks_for_user_reminder(2, 3, now).await.unwrap()),
        vec![late.id, due.id]
    );

    let candidates = ids(tasks.list_reminder_candidates(project.id).await.unwrap());
    assert_eq!(candidates, vec![late.id, delayed.id, due.id, far.id]);
}

#[tokio::test]
async fn test_list_for_user_filters() {
    let db = test_db().await;
    seed_user(&db, 1, "owner").await;
    seed_user(&db, 2, "helper").await;
    let first = seed_project(&db, 1, "First").await;
    let second = seed_project(&db, 1, "Second").await;

    let mut uow = db.begin().await.unwrap();
    let mut tasks = uow.tasks();
    let a = tasks.create(&NewTask::new(first.id, "A", 1).with_assignees([2])).await.unwrap();
    let b = tasks.create(&NewTask::new(second.id, "B", 1).with_assignees([2])).await.unwrap();
    tasks.create(&NewTask::new(second.id, "C", 1).with_assignees([1])).await.unwrap();
    tasks.update_status(b.id, TaskStatus::InProgress).await.unwrap();

    assert_eq!(tasks.list_for_user(2, None, None).await.unwrap().len(), 2);

    let in_progress = tasks
        .list_for_user(2, Some(TaskStatus::InProgress), None)
        .await
        .unwrap();
    assert_eq!(in_progress.len(), 1);
    assert_eq!(in_progress[0].task.id, b.id);

    let in_first = tasks.list_for_user(2, None, Some(first.id)).await.unwrap();
    assert_eq!(in_first.len(), 1);
    assert_eq!(in_first[0].task.id, a.id);

    let pending_b = tasks
        .list_by_project_with_status(second.id, TaskStatus::Pending)
        .await
        .unwrap();
    assert_eq!(pending_b.len(), 1);
}

#[tokio::test]
async fn test_delete_cascades_assignees() {
    let db = test_db().await;
    seed_user(&db, 1, "owner").await;
    seed_user(&db, 2, "helper").await;
    let project = seed_project(&db, 1, "Cascade").await;

    let mut uow = db.begin().await.unwrap();
    let task = uow
        .tasks()
        .create(&NewTask::new(project.id, "Temporary", 1).with_assignees([2]))
        .await
        .unwrap();
    assert!(uow.tasks().delete(task.id).await.unwrap());
    assert!(!uow.tasks().delete(task.id).await.unwrap());
    uow.commit().await.unwrap();

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM task_assignees")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}
