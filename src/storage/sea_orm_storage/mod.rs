//! SeaORM 存储实现
//!
//! 统一的数据库存储层，支持 SQLite、PostgreSQL 和 MySQL。
//! 需要原子性的多行写入（提交与文件树、linter 与实例、评分标准替换等）在事务中完成。

mod assignments;
mod comments;
mod courses;
mod linters;
mod roles;
mod rubrics;
mod users;
mod works;

use crate::config::AppConfig;
use crate::errors::{CGSystemError, Result};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;

/// SeaORM 存储实现
#[derive(Clone)]
pub struct SeaOrmStorage {
    pub(crate) db: DatabaseConnection,
}

impl SeaOrmStorage {
    /// 创建新的 SeaORM 存储实例
    pub async fn new_async() -> Result<Self> {
        let config = AppConfig::get();
        let db_url = Self::build_database_url(&config.database.url)?;

        // 根据数据库类型选择连接方式
        let db = if db_url.starts_with("sqlite://") {
            Self::connect_sqlite(&db_url, config).await?
        } else {
            Self::connect_generic(&db_url, config).await?
        };

        // 运行迁移
        Migrator::up(&db, None)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("数据库迁移失败: {e}")))?;

        info!("SeaORM 存储初始化完成，数据库: {}", db_url);

        Ok(Self { db })
    }

    /// SQLite 专用连接（WAL + pragma 优化）
    async fn connect_sqlite(url: &str, config: &AppConfig) -> Result<DatabaseConnection> {
        use sea_orm::SqlxSqliteConnector;
        use sea_orm::sqlx::sqlite::{
            SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
        };
        use std::str::FromStr;

        let opt = SqliteConnectOptions::from_str(url)
            .map_err(|e| CGSystemError::database_config(format!("SQLite URL 解析失败: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .pragma("cache_size", "-64000")
            .pragma("temp_store", "memory")
            .pragma("mmap_size", "536870912")
            .pragma("wal_autocheckpoint", "1000");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.database.pool_size)
            .min_connections(1)
            .test_before_acquire(true)
            .acquire_timeout(Duration::from_secs(config.database.timeout))
            .idle_timeout(Duration::from_secs(300))
            .connect_with(opt)
            .await
            .map_err(|e| CGSystemError::database_connection(format!("SQLite 连接失败: {e}")))?;

        Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
    }

    /// 通用连接（PostgreSQL、MySQL 等）
    async fn connect_generic(url: &str, config: &AppConfig) -> Result<DatabaseConnection> {
        let mut opt = ConnectOptions::new(url);
        opt.max_connections(config.database.pool_size)
            .min_connections(5)
            .connect_timeout(Duration::from_secs(config.database.timeout))
            .acquire_timeout(Duration::from_secs(config.database.timeout))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .sqlx_logging(false)
            .sqlx_logging_level(tracing::log::LevelFilter::Debug);

        Database::connect(opt)
            .await
            .map_err(|e| CGSystemError::database_connection(format!("无法连接到数据库: {e}")))
    }

    /// 从 URL 自动推断数据库类型并构建连接 URL
    fn build_database_url(url: &str) -> Result<String> {
        if url.starts_with("sqlite://") {
            Ok(url.to_string())
        } else if url.ends_with(".db") || url.ends_with(".sqlite") || url == ":memory:" {
            Ok(format!("sqlite://{}?mode=rwc", url))
        } else if url.starts_with("postgres://")
            || url.starts_with("postgresql://")
            || url.starts_with("mysql://")
            || url.starts_with("mariadb://")
        {
            Ok(url.to_string())
        } else {
            Err(CGSystemError::database_config(format!(
                "无法从 URL 推断数据库类型: {url}. 支持: sqlite://, postgres://, mysql://, 或 .db/.sqlite 文件路径"
            )))
        }
    }
}


// Storage trait 实现
use crate::models::{
    assignments::entities::{Assignment, AssignmentUpdate, GraderWeight, NewAssignment},
    comments::entities::{Comment, LinterComment, NewLinterComment},
    courses::entities::{Course, NewCourse},
    files::entities::{FileNode, FileTree},
    linters::entities::{AssignmentLinter, LinterInstance, LinterState},
    permissions::entities::{Permission, Role},
    rubrics::entities::{RubricItem, RubricPlan, RubricRow},
    submissions::entities::{GradeHistoryEntry, NewGradeHistory, NewWork, Work, WorkUpdate},
    users::entities::{NewUser, User},
};
use crate::storage::{DivisionWrite, Storage};
use async_trait::async_trait;

#[async_trait]
impl Storage for SeaOrmStorage {
    // 用户管理方法
    async fn create_user(&self, user: NewUser) -> Result<User> {
        self.create_user_impl(user).await
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        self.get_user_by_id_impl(id).await
    }

    async fn get_users_by_ids(&self, ids: &[i64]) -> Result<Vec<User>> {
        self.get_users_by_ids_impl(ids).await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.get_user_by_username_impl(username).await
    }

    async fn find_user_for_login(&self, identifier: &str) -> Result<Option<User>> {
        self.find_user_for_login_impl(identifier).await
    }

    async fn get_user_by_lti_id(&self, lti_user_id: &str) -> Result<Option<User>> {
        self.get_user_by_lti_id_impl(lti_user_id).await
    }

    async fn count_users(&self) -> Result<u64> {
        self.count_users_impl().await
    }

    async fn search_users(&self, query: &str, limit: u64) -> Result<Vec<User>> {
        self.search_users_impl(query, limit).await
    }

    async fn usernames_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        self.usernames_with_prefix_impl(prefix).await
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        self.email_exists_impl(email).await
    }

    async fn update_user_email(&self, id: i64, email: &str) -> Result<()> {
        self.update_user_email_impl(id, email).await
    }

    async fn set_user_site_role(&self, id: i64, role_id: i64) -> Result<()> {
        self.set_user_site_role_impl(id, role_id).await
    }

    // 权限与角色
    async fn list_permissions(&self) -> Result<Vec<Permission>> {
        self.list_permissions_impl().await
    }

    async fn get_site_role(&self, id: i64) -> Result<Option<Role>> {
        self.get_site_role_impl(id).await
    }

    async fn get_site_role_by_name(&self, name: &str) -> Result<Option<Role>> {
        self.get_site_role_by_name_impl(name).await
    }

    async fn list_site_roles(&self) -> Result<Vec<Role>> {
        self.list_site_roles_impl().await
    }

    async fn set_site_role_permission(&self, role_id: i64, permission_id: i64, explicit: bool,) -> Result<()> {
        self.set_site_role_permission_impl(role_id, permission_id, explicit).await
    }

    async fn list_course_roles(&self, course_id: i64) -> Result<Vec<Role>> {
        self.list_course_roles_impl(course_id).await
    }

    async fn get_course_role(&self, id: i64) -> Result<Option<Role>> {
        self.get_course_role_impl(id).await
    }

    async fn create_course_role(&self, course_id: i64, name: &str, explicit: &[String],) -> Result<Role> {
        self.create_course_role_impl(course_id, name, explicit).await
    }

    async fn set_course_role_permission(&self, role_id: i64, permission_id: i64, explicit: bool,) -> Result<()> {
        self.set_course_role_permission_impl(role_id, permission_id, explicit).await
    }

    async fn user_course_role(&self, user_id: i64, course_id: i64) -> Result<Option<Role>> {
        self.user_course_role_impl(user_id, course_id).await
    }

    async fn user_course_roles(&self, user_id: i64) -> Result<Vec<(i64, Role)>> {
        self.user_course_roles_impl(user_id).await
    }

    async fn set_user_course_role(&self, user_id: i64, course_id: i64, role_id: i64) -> Result<()> {
        self.set_user_course_role_impl(user_id, course_id, role_id).await
    }

    async fn list_course_users(&self, course_id: i64) -> Result<Vec<(User, Role)>> {
        self.list_course_users_impl(course_id).await
    }

    // 课程管理
    async fn create_course(&self, course: NewCourse) -> Result<Course> {
        self.create_course_impl(course).await
    }

    async fn get_course(&self, id: i64) -> Result<Option<Course>> {
        self.get_course_impl(id).await
    }

    async fn get_courses_by_ids(&self, ids: &[i64]) -> Result<Vec<Course>> {
        self.get_courses_by_ids_impl(ids).await
    }

    async fn get_course_by_lti_id(&self, provider_id: i64, lti_course_id: &str,) -> Result<Option<Course>> {
        self.get_course_by_lti_id_impl(provider_id, lti_course_id).await
    }

    async fn update_course_name(&self, id: i64, name: &str) -> Result<()> {
        self.update_course_name_impl(id, name).await
    }

    async fn get_or_create_lti_provider(&self, key: &str) -> Result<i64> {
        self.get_or_create_lti_provider_impl(key).await
    }

    async fn get_lti_provider_key(&self, id: i64) -> Result<Option<String>> {
        self.get_lti_provider_key_impl(id).await
    }

    // 作业管理
    async fn create_assignment(&self, assignment: NewAssignment) -> Result<Assignment> {
        self.create_assignment_impl(assignment).await
    }

    async fn get_assignment(&self, id: i64) -> Result<Option<Assignment>> {
        self.get_assignment_impl(id).await
    }

    async fn list_course_assignments(&self, course_id: i64) -> Result<Vec<Assignment>> {
        self.list_course_assignments_impl(course_id).await
    }

    async fn get_assignment_by_lti_id(&self, lti_assignment_id: &str) -> Result<Option<Assignment>> {
        self.get_assignment_by_lti_id_impl(lti_assignment_id).await
    }

    async fn update_assignment(&self, id: i64, update: AssignmentUpdate) -> Result<Assignment> {
        self.update_assignment_impl(id, update).await
    }

    async fn list_pending_reminders(&self) -> Result<Vec<Assignment>> {
        self.list_pending_reminders_impl().await
    }

    async fn set_assignment_result(&self, user_id: i64, assignment_id: i64, sourcedid: &str,) -> Result<()> {
        self.set_assignment_result_impl(user_id, assignment_id, sourcedid).await
    }

    async fn get_assignment_result(&self, user_id: i64, assignment_id: i64) -> Result<Option<String>> {
        self.get_assignment_result_impl(user_id, assignment_id).await
    }

    // 评分员分配
    async fn list_grader_weights(&self, assignment_id: i64) -> Result<Vec<GraderWeight>> {
        self.list_grader_weights_impl(assignment_id).await
    }

    async fn list_done_graders(&self, assignment_id: i64) -> Result<Vec<i64>> {
        self.list_done_graders_impl(assignment_id).await
    }

    async fn set_grader_done(&self, assignment_id: i64, user_id: i64, done: bool) -> Result<()> {
        self.set_grader_done_impl(assignment_id, user_id, done).await
    }

    async fn apply_division(&self, assignment_id: i64, write: DivisionWrite) -> Result<()> {
        self.apply_division_impl(assignment_id, write).await
    }

    // 提交管理
    async fn create_work(&self, work: NewWork, tree: &FileTree) -> Result<Work> {
        self.create_work_impl(work, tree).await
    }

    async fn get_work(&self, id: i64) -> Result<Option<Work>> {
        self.get_work_impl(id).await
    }

    async fn latest_works(&self, assignment_id: i64) -> Result<Vec<Work>> {
        self.latest_works_impl(assignment_id).await
    }

    async fn latest_work_for_user(&self, assignment_id: i64, user_id: i64) -> Result<Option<Work>> {
        self.latest_work_for_user_impl(assignment_id, user_id).await
    }

    async fn list_works(&self, assignment_id: i64, user_id: Option<i64>) -> Result<Vec<Work>> {
        self.list_works_impl(assignment_id, user_id).await
    }

    async fn update_work(&self, id: i64, update: WorkUpdate) -> Result<Work> {
        self.update_work_impl(id, update).await
    }

    async fn delete_work(&self, id: i64) -> Result<Vec<String>> {
        self.delete_work_impl(id).await
    }

    async fn add_grade_history(&self, entry: NewGradeHistory) -> Result<()> {
        self.add_grade_history_impl(entry).await
    }

    async fn mark_grade_passed_back(&self, work_id: i64) -> Result<()> {
        self.mark_grade_passed_back_impl(work_id).await
    }

    async fn list_grade_history(&self, work_id: i64) -> Result<Vec<GradeHistoryEntry>> {
        self.list_grade_history_impl(work_id).await
    }

    // 文件与评论
    async fn list_work_files(&self, work_id: i64) -> Result<Vec<FileNode>> {
        self.list_work_files_impl(work_id).await
    }

    async fn get_file(&self, id: i64) -> Result<Option<FileNode>> {
        self.get_file_impl(id).await
    }

    async fn upsert_comment(&self, comment: Comment) -> Result<()> {
        self.upsert_comment_impl(comment).await
    }

    async fn delete_comment(&self, file_id: i64, line: i32) -> Result<bool> {
        self.delete_comment_impl(file_id, line).await
    }

    async fn list_file_comments(&self, file_id: i64) -> Result<Vec<Comment>> {
        self.list_file_comments_impl(file_id).await
    }

    async fn list_work_comments(&self, work_id: i64) -> Result<Vec<Comment>> {
        self.list_work_comments_impl(work_id).await
    }

    async fn list_file_linter_comments(&self, file_id: i64) -> Result<Vec<(String, LinterComment)>> {
        self.list_file_linter_comments_impl(file_id).await
    }

    async fn list_work_linter_comments(&self, work_id: i64) -> Result<Vec<(String, LinterComment)>> {
        self.list_work_linter_comments_impl(work_id).await
    }

    // Linter
    async fn create_assignment_linter(&self, linter: AssignmentLinter, instances: Vec<LinterInstance>,) -> Result<()> {
        self.create_assignment_linter_impl(linter, instances).await
    }

    async fn get_assignment_linter(&self, id: &str) -> Result<Option<AssignmentLinter>> {
        self.get_assignment_linter_impl(id).await
    }

    async fn list_assignment_linters(&self, assignment_id: i64) -> Result<Vec<AssignmentLinter>> {
        self.list_assignment_linters_impl(assignment_id).await
    }

    async fn delete_assignment_linter(&self, id: &str) -> Result<bool> {
        self.delete_assignment_linter_impl(id).await
    }

    async fn linter_instance_states(&self, linter_id: &str) -> Result<Vec<LinterState>> {
        self.linter_instance_states_impl(linter_id).await
    }

    async fn create_linter_instance(&self, instance: LinterInstance) -> Result<()> {
        self.create_linter_instance_impl(instance).await
    }

    async fn get_linter_instance(&self, id: &str) -> Result<Option<LinterInstance>> {
        self.get_linter_instance_impl(id).await
    }

    async fn finish_linter_instance(&self, id: &str, state: LinterState, error: Option<String>, comments: Vec<NewLinterComment>,) -> Result<bool> {
        self.finish_linter_instance_impl(id, state, error, comments).await
    }

    // 评分标准
    async fn get_rubric(&self, assignment_id: i64) -> Result<Vec<RubricRow>> {
        self.get_rubric_impl(assignment_id).await
    }

    async fn apply_rubric_plan(&self, assignment_id: i64, plan: RubricPlan, clear_selections: bool,) -> Result<Vec<RubricRow>> {
        self.apply_rubric_plan_impl(assignment_id, plan, clear_selections).await
    }

    async fn get_rubric_item(&self, item_id: i64) -> Result<Option<(RubricItem, i64)>> {
        self.get_rubric_item_impl(item_id).await
    }

    async fn works_selecting_items(&self, item_ids: &[i64]) -> Result<Vec<i64>> {
        self.works_selecting_items_impl(item_ids).await
    }

    async fn get_selection(&self, work_id: i64) -> Result<Vec<RubricItem>> {
        self.get_selection_impl(work_id).await
    }

    async fn replace_selection(&self, work_id: i64, items: &[RubricItem]) -> Result<()> {
        self.replace_selection_impl(work_id, items).await
    }

    async fn select_rubric_item(&self, work_id: i64, item: &RubricItem) -> Result<()> {
        self.select_rubric_item_impl(work_id, item).await
    }

    async fn unselect_rubric_item(&self, work_id: i64, item_id: i64) -> Result<bool> {
        self.unselect_rubric_item_impl(work_id, item_id).await
    }
}
