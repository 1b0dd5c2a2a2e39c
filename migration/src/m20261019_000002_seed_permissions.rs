use sea_orm_migration::prelude::*;

use crate::m20261019_000001_create_tables::{Permissions, Roles, RolesPermissions};

#[derive(DeriveMigrationName)]
pub struct Migration;

/// (id, 名称, 默认值, 是否为课程权限)
const PERMISSIONS: &[(i64, &str, bool, bool)] = &[
    (1, "can_create_courses", false, false),
    (2, "can_manage_site_users", false, false),
    (3, "can_search_users", false, false),
    (4, "can_edit_own_info", true, false),
    (5, "can_use_snippets", false, false),
    (6, "can_submit_own_work", true, true),
    (7, "can_see_assignments", true, true),
    (8, "can_see_hidden_assignments", false, true),
    (9, "can_see_others_work", false, true),
    (10, "can_grade_work", false, true),
    (11, "can_see_grade_before_open", false, true),
    (12, "can_upload_after_deadline", false, true),
    (13, "can_manage_course", false, true),
    (14, "manage_rubrics", false, true),
    (15, "can_use_linter", false, true),
    (16, "can_edit_others_work", false, true),
    (17, "can_delete_submission", false, true),
    (18, "can_view_own_teacher_files", false, true),
];

/// 站点角色及其与默认值相反的权限
const SITE_ROLES: &[(i64, &str, &[i64])] = &[
    (1, "Admin", &[1, 2, 3, 5]),
    (2, "Staff", &[1, 3, 5]),
    (3, "Student", &[]),
    (4, "Nobody", &[4]),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (id, name, default_value, course_permission) in PERMISSIONS {
            let insert = Query::insert()
                .into_table(Permissions::Table)
                .columns([
                    Permissions::Id,
                    Permissions::Name,
                    Permissions::DefaultValue,
                    Permissions::CoursePermission,
                ])
                .values_panic([
                    (*id).into(),
                    (*name).into(),
                    (*default_value).into(),
                    (*course_permission).into(),
                ])
                .to_owned();

            manager.exec_stmt(insert).await?;
        }

        for (id, name, explicit) in SITE_ROLES {
            let insert = Query::insert()
                .into_table(Roles::Table)
                .columns([Roles::Id, Roles::Name])
                .values_panic([(*id).into(), (*name).into()])
                .to_owned();
            manager.exec_stmt(insert).await?;

            for permission_id in explicit.iter() {
                let insert = Query::insert()
                    .into_table(RolesPermissions::Table)
                    .columns([RolesPermissions::RoleId, RolesPermissions::PermissionId])
                    .values_panic([(*id).into(), (*permission_id).into()])
                    .to_owned();
                manager.exec_stmt(insert).await?;
            }
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .exec_stmt(Query::delete().from_table(RolesPermissions::Table).to_owned())
            .await?;
        manager
            .exec_stmt(Query::delete().from_table(Roles::Table).to_owned())
            .await?;
        manager
            .exec_stmt(Query::delete().from_table(Permissions::Table).to_owned())
            .await?;
        Ok(())
    }
}
