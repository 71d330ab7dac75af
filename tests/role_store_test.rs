// tests/role_store_test.rs
// Dynamic roles and how they resolve on memberships

mod common;

use common::{seed_project, seed_user, test_db};
use taskbot::role::{Capabilities, Capability, FixedRole, MemberRole, NewRole};

#[tokio::test]
async fn test_role_crud_scoped_to_project() {
    let db = test_db().await;
    seed_user(&db, 1, "owner").await;
    let project = seed_project(&db, 1, "Roles").await;
    let other = seed_project(&db, 1, "Other").await;

    let mut uow = db.begin().await.unwrap();
    let mut roles = uow.roles();
    let role = roles
        .create(project.id, &NewRole::new("Editor", 2, Capabilities::default()))
        .await
        .unwrap();

    assert!(roles.get(project.id, role.id).await.unwrap().is_some());
    assert!(roles.get(other.id, role.id).await.unwrap().is_none());

    let mut changed = NewRole::new("Chief editor", 1, Capabilities::ALL);
    changed.managed_by = vec![role.id, role.id];
    let updated = roles.update(project.id, role.id, &changed).await.unwrap().unwrap();
    assert_eq!(updated.name, "Chief editor");
    assert_eq!(updated.managed_by, vec![role.id]);
    assert!(roles.update(other.id, role.id, &changed).await.unwrap().is_none());

    assert!(!roles.delete(other.id, role.id).await.unwrap());
    assert!(roles.delete(project.id, role.id).await.unwrap());
    assert!(roles.list_for_project(project.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_default_set_and_managers() {
    let db = test_db().await;
    seed_user(&db, 1, "owner").await;
    let project = seed_project(&db, 1, "Hierarchy").await;

    let mut uow = db.begin().await.unwrap();
    let mut roles = uow.roles();
    let created = roles.create_default_set(project.id).await.unwrap();
    let levels: Vec<i64> = created.iter().map(|r| r.level).collect();
    assert_eq!(levels, vec![0, 1, 2]);
    assert!(created[0].capabilities.manage_roles);
    assert!(created[1].capabilities.manage_members);
    assert!(!created[2].capabilities.manage_members);

    let mut member_role = NewRole::new("Volunteer", 3, Capabilities::default());
    member_role.managed_by = vec![created[1].id, 9999, created[0].id];
    let volunteer = roles.create(project.id, &member_role).await.unwrap();

    let managers: Vec<i64> = roles
        .managers_of(&volunteer)
        .await
        .unwrap()
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(managers, vec![created[1].id, created[0].id]);
}

#[tokio::test]
async fn test_assignment_overrides_legacy_tag() {
    let db = test_db().await;
    seed_user(&db, 1, "owner").await;
    seed_user(&db, 2, "newbie").await;
    let project = seed_project(&db, 1, "Assign").await;

    let mut uow = db.begin().await.unwrap();
    let observer = uow
        .roles()
        .create(project.id, &NewRole::new("Observer", 5, Capabilities::NONE))
        .await
        .unwrap();

    // existing projectnik loses admin rights once a capability-less role is attached
    let owner = uow.roles().assign_to_user(project.id, observer.id, 1).await.unwrap();
    assert!(matches!(owner.role, MemberRole::Custom(ref r) if r.id == observer.id));
    assert!(!owner.role.can(Capability::ManageSettings));

    // a non-member joins through the assignment
    let newbie = uow.roles().assign_to_user(project.id, observer.id, 2).await.unwrap();
    assert_eq!(newbie.user.telegram_id, 2);

    let holders = uow.roles().members_with_role(observer.id).await.unwrap();
    assert_eq!(holders.len(), 2);
    uow.commit().await.unwrap();

    // deleting the role falls back to the legacy tag
    let mut uow = db.begin().await.unwrap();
    assert!(uow.roles().delete(project.id, observer.id).await.unwrap());
    let owner = uow.projects().get_member(project.id, 1).await.unwrap().unwrap();
    assert_eq!(owner.role.fixed(), Some(FixedRole::Projectnik));
    let newbie = uow.projects().get_member(project.id, 2).await.unwrap().unwrap();
    assert_eq!(newbie.role.fixed(), Some(FixedRole::Member));
}

#[tokio::test]
async fn test_untagged_member_is_unassigned() {
    let db = test_db().await;
    seed_user(&db, 1, "owner").await;
    seed_user(&db, 2, "legacy").await;
    let project = seed_project(&db, 1, "Legacy").await;

    sqlx::query("INSERT INTO project_members (project_id, user_id, role, joined_at) VALUES (?, 2, NULL, '2026-01-01 00:00:00')")
        .bind(project.id)
        .execute(db.pool())
        .await
        .unwrap();

    let mut uow = db.begin().await.unwrap();
    let member = uow.projects().get_member(project.id, 2).await.unwrap().unwrap();
    assert_eq!(member.role, MemberRole::Unassigned);
    assert!(!member.role.can(Capability::ManageTasks));
}

#[tokio::test]
async fn test_deleting_project_removes_roles() {
    let db = test_db().await;
    seed_user(&db, 1, "owner").await;
    let project = seed_project(&db, 1, "Gone").await;

    let mut uow = db.begin().await.unwrap();
    uow.roles().create_default_set(project.id).await.unwrap();
    uow.commit().await.unwrap();

    sqlx::query("DELETE FROM projects WHERE id = ?")
        .bind(project.id)
        .execute(db.pool())
        .await
        .unwrap();

    let mut uow = db.begin().await.unwrap();
    assert!(uow.roles().list_for_project(project.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unreadable_row_is_an_error() {
    let db = test_db().await;
    seed_user(&db, 1, "owner").await;
    let project = seed_project(&db, 1, "Corrupt").await;

    let mut uow = db.begin().await.unwrap();
    let role = uow
        .roles()
        .create(project.id, &NewRole::new("Editor", 2, Capabilities::default()))
        .await
        .unwrap();
    uow.roles().assign_to_user(project.id, role.id, 1).await.unwrap();
    uow.commit().await.unwrap();

    sqlx::query("UPDATE project_roles SET level = 'high' WHERE id = ?")
        .bind(role.id)
        .execute(db.pool())
        .await
        .unwrap();

    let mut uow = db.begin().await.unwrap();
    assert!(uow.roles().list_for_project(project.id).await.is_err());
    assert!(uow.roles().get(project.id, role.id).await.is_err());
    assert!(uow.projects().list_members(project.id).await.is_err());
}
