use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ==================== 权限与站点角色 ====================
        manager
            .create_table(
                Table::create()
                    .table(Permissions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Permissions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Permissions::Name)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Permissions::DefaultValue).boolean().not_null())
                    .col(
                        ColumnDef::new(Permissions::CoursePermission)
                            .boolean()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Roles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Roles::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Roles::Name).string().not_null().unique_key())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RolesPermissions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RolesPermissions::RoleId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RolesPermissions::PermissionId)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(RolesPermissions::RoleId)
                            .col(RolesPermissions::PermissionId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(RolesPermissions::Table, RolesPermissions::RoleId)
                            .to(Roles::Table, Roles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(RolesPermissions::Table, RolesPermissions::PermissionId)
                            .to(Permissions::Table, Permissions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ==================== 用户 ====================
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Name).string().not_null())
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::Email).string().not_null())
                    .col(ColumnDef::new(Users::PasswordHash).string().null())
                    .col(
                        ColumnDef::new(Users::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Users::LtiUserId).string().null().unique_key())
                    .col(ColumnDef::new(Users::RoleId).big_integer().null())
                    .col(ColumnDef::new(Users::CreatedAt).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Users::Table, Users::RoleId)
                            .to(Roles::Table, Roles::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // ==================== 课程 ====================
        manager
            .create_table(
                Table::create()
                    .table(LtiProviders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LtiProviders::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(LtiProviders::Key)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Courses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Courses::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Courses::Name).string().not_null())
                    .col(ColumnDef::new(Courses::LtiCourseId).string().null().unique_key())
                    .col(ColumnDef::new(Courses::LtiProviderId).big_integer().null())
                    .col(ColumnDef::new(Courses::CreatedAt).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Courses::Table, Courses::LtiProviderId)
                            .to(LtiProviders::Table, LtiProviders::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CourseRoles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CourseRoles::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CourseRoles::Name).string().not_null())
                    .col(ColumnDef::new(CourseRoles::CourseId).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(CourseRoles::Table, CourseRoles::CourseId)
                            .to(Courses::Table, Courses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_course_roles_course_name")
                    .table(CourseRoles::Table)
                    .col(CourseRoles::CourseId)
                    .col(CourseRoles::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CourseRolesPermissions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CourseRolesPermissions::CourseRoleId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CourseRolesPermissions::PermissionId)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(CourseRolesPermissions::CourseRoleId)
                            .col(CourseRolesPermissions::PermissionId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(
                                CourseRolesPermissions::Table,
                                CourseRolesPermissions::CourseRoleId,
                            )
                            .to(CourseRoles::Table, CourseRoles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(
                                CourseRolesPermissions::Table,
                                CourseRolesPermissions::PermissionId,
                            )
                            .to(Permissions::Table, Permissions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UsersCourses::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UsersCourses::UserId).big_integer().not_null())
                    .col(ColumnDef::new(UsersCourses::CourseId).big_integer().not_null())
                    .col(
                        ColumnDef::new(UsersCourses::CourseRoleId)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(UsersCourses::UserId)
                            .col(UsersCourses::CourseId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(UsersCourses::Table, UsersCourses::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(UsersCourses::Table, UsersCourses::CourseId)
                            .to(Courses::Table, Courses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(UsersCourses::Table, UsersCourses::CourseRoleId)
                            .to(CourseRoles::Table, CourseRoles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ==================== 作业 ====================
        manager
            .create_table(
                Table::create()
                    .table(Assignments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Assignments::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Assignments::Name).string().not_null())
                    .col(ColumnDef::new(Assignments::CourseId).big_integer().not_null())
                    .col(ColumnDef::new(Assignments::State).string().not_null())
                    .col(ColumnDef::new(Assignments::Deadline).big_integer().not_null())
                    .col(ColumnDef::new(Assignments::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Assignments::LtiAssignmentId).string().null())
                    .col(ColumnDef::new(Assignments::LtiOutcomeServiceUrl).string().null())
                    .col(ColumnDef::new(Assignments::Cgignore).text().null())
                    .col(
                        ColumnDef::new(Assignments::ReminderType)
                            .string()
                            .not_null()
                            .default("none"),
                    )
                    .col(ColumnDef::new(Assignments::ReminderTime).big_integer().null())
                    .col(ColumnDef::new(Assignments::ReminderTaskId).string().null())
                    .col(ColumnDef::new(Assignments::DoneEmail).string().null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Assignments::Table, Assignments::CourseId)
                            .to(Courses::Table, Courses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_assignments_lti_assignment_id")
                    .table(Assignments::Table)
                    .col(Assignments::LtiAssignmentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AssignmentGraders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AssignmentGraders::AssignmentId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AssignmentGraders::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AssignmentGraders::Weight).double().not_null())
                    .primary_key(
                        Index::create()
                            .col(AssignmentGraders::AssignmentId)
                            .col(AssignmentGraders::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(AssignmentGraders::Table, AssignmentGraders::AssignmentId)
                            .to(Assignments::Table, Assignments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(AssignmentGraders::Table, AssignmentGraders::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AssignmentGraderDone::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AssignmentGraderDone::AssignmentId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AssignmentGraderDone::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(AssignmentGraderDone::AssignmentId)
                            .col(AssignmentGraderDone::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(
                                AssignmentGraderDone::Table,
                                AssignmentGraderDone::AssignmentId,
                            )
                            .to(Assignments::Table, Assignments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(AssignmentGraderDone::Table, AssignmentGraderDone::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AssignmentResults::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AssignmentResults::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AssignmentResults::AssignmentId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AssignmentResults::Sourcedid).string().not_null())
                    .primary_key(
                        Index::create()
                            .col(AssignmentResults::UserId)
                            .col(AssignmentResults::AssignmentId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(AssignmentResults::Table, AssignmentResults::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(AssignmentResults::Table, AssignmentResults::AssignmentId)
                            .to(Assignments::Table, Assignments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ==================== 提交与文件树 ====================
        manager
            .create_table(
                Table::create()
                    .table(Works::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Works::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Works::AssignmentId).big_integer().not_null())
                    .col(ColumnDef::new(Works::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Works::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Works::AssignedTo).big_integer().null())
                    .col(ColumnDef::new(Works::Grade).double().null())
                    .col(ColumnDef::new(Works::Comment).text().null())
                    .col(ColumnDef::new(Works::Edit).integer().not_null().default(0))
                    .foreign_key(
                        ForeignKey::create()
                            .from(Works::Table, Works::AssignmentId)
                            .to(Assignments::Table, Assignments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Works::Table, Works::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Works::Table, Works::AssignedTo)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_works_assignment_user")
                    .table(Works::Table)
                    .col(Works::AssignmentId)
                    .col(Works::UserId)
                    .col(Works::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Files::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Files::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Files::WorkId).big_integer().not_null())
                    .col(ColumnDef::new(Files::ParentId).big_integer().null())
                    .col(ColumnDef::new(Files::Name).string().not_null())
                    .col(ColumnDef::new(Files::Extension).string().null())
                    .col(ColumnDef::new(Files::Filename).string().null())
                    .col(ColumnDef::new(Files::IsDirectory).boolean().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Files::Table, Files::WorkId)
                            .to(Works::Table, Works::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Files::Table, Files::ParentId)
                            .to(Files::Table, Files::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_files_work_id")
                    .table(Files::Table)
                    .col(Files::WorkId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Comments::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Comments::FileId).big_integer().not_null())
                    .col(ColumnDef::new(Comments::Line).integer().not_null())
                    .col(ColumnDef::new(Comments::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Comments::Comment).text().not_null())
                    .primary_key(Index::create().col(Comments::FileId).col(Comments::Line))
                    .foreign_key(
                        ForeignKey::create()
                            .from(Comments::Table, Comments::FileId)
                            .to(Files::Table, Files::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Comments::Table, Comments::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ==================== Linter ====================
        manager
            .create_table(
                Table::create()
                    .table(AssignmentLinters::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AssignmentLinters::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AssignmentLinters::AssignmentId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AssignmentLinters::Name).string().not_null())
                    .col(ColumnDef::new(AssignmentLinters::Config).text().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(AssignmentLinters::Table, AssignmentLinters::AssignmentId)
                            .to(Assignments::Table, Assignments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_assignment_linters_assignment_name")
                    .table(AssignmentLinters::Table)
                    .col(AssignmentLinters::AssignmentId)
                    .col(AssignmentLinters::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LinterInstances::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LinterInstances::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LinterInstances::WorkId).big_integer().not_null())
                    .col(ColumnDef::new(LinterInstances::TesterId).string().not_null())
                    .col(ColumnDef::new(LinterInstances::State).string().not_null())
                    .col(ColumnDef::new(LinterInstances::Error).text().null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(LinterInstances::Table, LinterInstances::WorkId)
                            .to(Works::Table, Works::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(LinterInstances::Table, LinterInstances::TesterId)
                            .to(AssignmentLinters::Table, AssignmentLinters::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LinterComments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LinterComments::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LinterComments::FileId).big_integer().not_null())
                    .col(ColumnDef::new(LinterComments::Line).integer().not_null())
                    .col(ColumnDef::new(LinterComments::LinterId).string().not_null())
                    .col(ColumnDef::new(LinterComments::LinterCode).string().not_null())
                    .col(ColumnDef::new(LinterComments::Comment).text().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(LinterComments::Table, LinterComments::FileId)
                            .to(Files::Table, Files::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(LinterComments::Table, LinterComments::LinterId)
                            .to(LinterInstances::Table, LinterInstances::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_linter_comments_file_line")
                    .table(LinterComments::Table)
                    .col(LinterComments::FileId)
                    .col(LinterComments::Line)
                    .col(LinterComments::LinterId)
                    .to_owned(),
            )
            .await?;

        // ==================== 评分标准 ====================
        manager
            .create_table(
                Table::create()
                    .table(RubricRows::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RubricRows::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RubricRows::AssignmentId).big_integer().not_null())
                    .col(ColumnDef::new(RubricRows::Header).string().not_null())
                    .col(ColumnDef::new(RubricRows::Description).text().not_null())
                    .col(ColumnDef::new(RubricRows::Position).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(RubricRows::Table, RubricRows::AssignmentId)
                            .to(Assignments::Table, Assignments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RubricItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RubricItems::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RubricItems::RubricRowId).big_integer().not_null())
                    .col(ColumnDef::new(RubricItems::Header).string().not_null())
                    .col(ColumnDef::new(RubricItems::Description).text().not_null())
                    .col(ColumnDef::new(RubricItems::Points).double().not_null())
                    .col(ColumnDef::new(RubricItems::Position).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(RubricItems::Table, RubricItems::RubricRowId)
                            .to(RubricRows::Table, RubricRows::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(WorkRubricItems::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(WorkRubricItems::WorkId).big_integer().not_null())
                    .col(
                        ColumnDef::new(WorkRubricItems::RubricItemId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WorkRubricItems::RubricRowId)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(WorkRubricItems::WorkId)
                            .col(WorkRubricItems::RubricItemId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(WorkRubricItems::Table, WorkRubricItems::WorkId)
                            .to(Works::Table, Works::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(WorkRubricItems::Table, WorkRubricItems::RubricItemId)
                            .to(RubricItems::Table, RubricItems::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(WorkRubricItems::Table, WorkRubricItems::RubricRowId)
                            .to(RubricRows::Table, RubricRows::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 每个提交每行最多选一项
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_work_rubric_items_work_row")
                    .table(WorkRubricItems::Table)
                    .col(WorkRubricItems::WorkId)
                    .col(WorkRubricItems::RubricRowId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GradeHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GradeHistory::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GradeHistory::WorkId).big_integer().not_null())
                    .col(ColumnDef::new(GradeHistory::UserId).big_integer().null())
                    .col(ColumnDef::new(GradeHistory::Grade).double().null())
                    .col(ColumnDef::new(GradeHistory::PassedBack).boolean().not_null())
                    .col(
                        ColumnDef::new(GradeHistory::RubricModified)
                            .boolean()
                            .not_null(),
                    )
                    .col(ColumnDef::new(GradeHistory::ChangedAt).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(GradeHistory::Table, GradeHistory::WorkId)
                            .to(Works::Table, Works::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(GradeHistory::Table, GradeHistory::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 按照创建的相反顺序删除
        manager
            .drop_table(Table::drop().table(GradeHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WorkRubricItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RubricItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RubricRows::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LinterComments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LinterInstances::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AssignmentLinters::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Comments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Files::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Works::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AssignmentResults::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AssignmentGraderDone::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AssignmentGraders::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Assignments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UsersCourses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CourseRolesPermissions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CourseRoles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Courses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LtiProviders::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RolesPermissions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Roles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Permissions::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
pub(crate) enum Permissions {
    #[sea_orm(iden = "permissions")]
    Table,
    Id,
    Name,
    DefaultValue,
    CoursePermission,
}

#[derive(DeriveIden)]
pub(crate) enum Roles {
    #[sea_orm(iden = "roles")]
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
pub(crate) enum RolesPermissions {
    #[sea_orm(iden = "roles_permissions")]
    Table,
    RoleId,
    PermissionId,
}

#[derive(DeriveIden)]
enum Users {
    #[sea_orm(iden = "users")]
    Table,
    Id,
    Name,
    Username,
    Email,
    PasswordHash,
    Active,
    LtiUserId,
    RoleId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum LtiProviders {
    #[sea_orm(iden = "lti_providers")]
    Table,
    Id,
    Key,
}

#[derive(DeriveIden)]
enum Courses {
    #[sea_orm(iden = "courses")]
    Table,
    Id,
    Name,
    LtiCourseId,
    LtiProviderId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum CourseRoles {
    #[sea_orm(iden = "course_roles")]
    Table,
    Id,
    Name,
    CourseId,
}

#[derive(DeriveIden)]
enum CourseRolesPermissions {
    #[sea_orm(iden = "course_roles_permissions")]
    Table,
    CourseRoleId,
    PermissionId,
}

#[derive(DeriveIden)]
enum UsersCourses {
    #[sea_orm(iden = "users_courses")]
    Table,
    UserId,
    CourseId,
    CourseRoleId,
}

#[derive(DeriveIden)]
enum Assignments {
    #[sea_orm(iden = "assignments")]
    Table,
    Id,
    Name,
    CourseId,
    State,
    Deadline,
    CreatedAt,
    LtiAssignmentId,
    LtiOutcomeServiceUrl,
    Cgignore,
    ReminderType,
    ReminderTime,
    ReminderTaskId,
    DoneEmail,
}

#[derive(DeriveIden)]
enum AssignmentGraders {
    #[sea_orm(iden = "assignment_graders")]
    Table,
    AssignmentId,
    UserId,
    Weight,
}

#[derive(DeriveIden)]
enum AssignmentGraderDone {
    #[sea_orm(iden = "assignment_grader_done")]
    Table,
    AssignmentId,
    UserId,
}

#[derive(DeriveIden)]
enum AssignmentResults {
    #[sea_orm(iden = "assignment_results")]
    Table,
    UserId,
    AssignmentId,
    Sourcedid,
}

#[derive(DeriveIden)]
enum Works {
    #[sea_orm(iden = "works")]
    Table,
    Id,
    AssignmentId,
    UserId,
    CreatedAt,
    AssignedTo,
    Grade,
    Comment,
    Edit,
}

#[derive(DeriveIden)]
enum Files {
    #[sea_orm(iden = "files")]
    Table,
    Id,
    WorkId,
    ParentId,
    Name,
    Extension,
    Filename,
    IsDirectory,
}

#[derive(DeriveIden)]
enum Comments {
    #[sea_orm(iden = "comments")]
    Table,
    FileId,
    Line,
    UserId,
    Comment,
}

#[derive(DeriveIden)]
enum AssignmentLinters {
    #[sea_orm(iden = "assignment_linters")]
    Table,
    Id,
    AssignmentId,
    Name,
    Config,
}

#[derive(DeriveIden)]
enum LinterInstances {
    #[sea_orm(iden = "linter_instances")]
    Table,
    Id,
    WorkId,
    TesterId,
    State,
    Error,
}

#[derive(DeriveIden)]
enum LinterComments {
    #[sea_orm(iden = "linter_comments")]
    Table,
    Id,
    FileId,
    Line,
    LinterId,
    LinterCode,
    Comment,
}

#[derive(DeriveIden)]
enum RubricRows {
    #[sea_orm(iden = "rubric_rows")]
    Table,
    Id,
    AssignmentId,
    Header,
    Description,
    Position,
}

#[derive(DeriveIden)]
enum RubricItems {
    #[sea_orm(iden = "rubric_items")]
    Table,
    Id,
    RubricRowId,
    Header,
    Description,
    Points,
    Position,
}

#[derive(DeriveIden)]
enum WorkRubricItems {
    #[sea_orm(iden = "work_rubric_items")]
    Table,
    WorkId,
    RubricItemId,
    RubricRowId,
}

#[derive(DeriveIden)]
enum GradeHistory {
    #[sea_orm(iden = "grade_history")]
    Table,
    Id,
    WorkId,
    UserId,
    Grade,
    PassedBack,
    RubricModified,
    ChangedAt,
}
