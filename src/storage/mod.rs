use std::sync::Arc;

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

use crate::errors::Result;

pub mod sea_orm_storage;

/// 重新分配评分员时的一次性写入
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DivisionWrite {
    /// 新的权重表，替换原有记录
    pub weights: Vec<GraderWeight>,
    /// (提交 id, 新评分员)
    pub assignments: Vec<(i64, Option<i64>)>,
    /// 需要清除完成标记的评分员
    pub reset_done: Vec<i64>,
}

#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// 用户管理方法
    // 创建用户
    async fn create_user(&self, user: NewUser) -> Result<User>;
    // 通过ID获取用户信息
    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>>;
    // 批量获取用户
    async fn get_users_by_ids(&self, ids: &[i64]) -> Result<Vec<User>>;
    // 通过用户名获取用户信息
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    // 登录查找：用户名区分大小写，邮箱不区分
    async fn find_user_for_login(&self, identifier: &str) -> Result<Option<User>>;
    // 通过 LTI 用户 ID 获取用户
    async fn get_user_by_lti_id(&self, lti_user_id: &str) -> Result<Option<User>>;
    // 用户总数
    async fn count_users(&self) -> Result<u64>;
    // 按用户名或姓名搜索
    async fn search_users(&self, query: &str, limit: u64) -> Result<Vec<User>>;
    // 以指定前缀开头的用户名
    async fn usernames_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
    // 邮箱是否已被使用（不区分大小写）
    async fn email_exists(&self, email: &str) -> Result<bool>;
    // 更新邮箱
    async fn update_user_email(&self, id: i64, email: &str) -> Result<()>;
    // 设置站点角色
    async fn set_user_site_role(&self, id: i64, role_id: i64) -> Result<()>;

    /// 权限与角色
    // 权限目录
    async fn list_permissions(&self) -> Result<Vec<Permission>>;
    async fn get_site_role(&self, id: i64) -> Result<Option<Role>>;
    async fn get_site_role_by_name(&self, name: &str) -> Result<Option<Role>>;
    async fn list_site_roles(&self) -> Result<Vec<Role>>;
    // explicit 为 true 时写入显式记录，否则删除
    async fn set_site_role_permission(
        &self,
        role_id: i64,
        permission_id: i64,
        explicit: bool,
    ) -> Result<()>;
    async fn list_course_roles(&self, course_id: i64) -> Result<Vec<Role>>;
    async fn get_course_role(&self, id: i64) -> Result<Option<Role>>;
    async fn create_course_role(
        &self,
        course_id: i64,
        name: &str,
        explicit: &[String],
    ) -> Result<Role>;
    async fn set_course_role_permission(
        &self,
        role_id: i64,
        permission_id: i64,
        explicit: bool,
    ) -> Result<()>;
    // 用户在课程中的角色
    async fn user_course_role(&self, user_id: i64, course_id: i64) -> Result<Option<Role>>;
    // 用户的全部课程角色 (course_id, role)
    async fn user_course_roles(&self, user_id: i64) -> Result<Vec<(i64, Role)>>;
    async fn set_user_course_role(&self, user_id: i64, course_id: i64, role_id: i64)
    -> Result<()>;
    async fn list_course_users(&self, course_id: i64) -> Result<Vec<(User, Role)>>;

    /// 课程管理
    async fn create_course(&self, course: NewCourse) -> Result<Course>;
    async fn get_course(&self, id: i64) -> Result<Option<Course>>;
    async fn get_courses_by_ids(&self, ids: &[i64]) -> Result<Vec<Course>>;
    async fn get_course_by_lti_id(
        &self,
        provider_id: i64,
        lti_course_id: &str,
    ) -> Result<Option<Course>>;
    async fn update_course_name(&self, id: i64, name: &str) -> Result<()>;
    async fn get_or_create_lti_provider(&self, key: &str) -> Result<i64>;
    // 提供方的 consumer key
    async fn get_lti_provider_key(&self, id: i64) -> Result<Option<String>>;

    /// 作业管理
    async fn create_assignment(&self, assignment: NewAssignment) -> Result<Assignment>;
    async fn get_assignment(&self, id: i64) -> Result<Option<Assignment>>;
    async fn list_course_assignments(&self, course_id: i64) -> Result<Vec<Assignment>>;
    async fn get_assignment_by_lti_id(&self, lti_assignment_id: &str)
    -> Result<Option<Assignment>>;
    async fn update_assignment(&self, id: i64, update: AssignmentUpdate) -> Result<Assignment>;
    // 登记了提醒任务、尚未执行的作业
    async fn list_pending_reminders(&self) -> Result<Vec<Assignment>>;
    // LTI 成绩回传句柄
    async fn set_assignment_result(
        &self,
        user_id: i64,
        assignment_id: i64,
        sourcedid: &str,
    ) -> Result<()>;
    async fn get_assignment_result(&self, user_id: i64, assignment_id: i64)
    -> Result<Option<String>>;

    /// 评分员分配
    async fn list_grader_weights(&self, assignment_id: i64) -> Result<Vec<GraderWeight>>;
    async fn list_done_graders(&self, assignment_id: i64) -> Result<Vec<i64>>;
    async fn set_grader_done(&self, assignment_id: i64, user_id: i64, done: bool) -> Result<()>;
    // 在一个事务中写入分配结果
    async fn apply_division(&self, assignment_id: i64, write: DivisionWrite) -> Result<()>;

    /// 提交管理
    // 提交与文件树在同一事务中写入
    async fn create_work(&self, work: NewWork, tree: &FileTree) -> Result<Work>;
    async fn get_work(&self, id: i64) -> Result<Option<Work>>;
    // 每个用户的最新提交
    async fn latest_works(&self, assignment_id: i64) -> Result<Vec<Work>>;
    async fn latest_work_for_user(&self, assignment_id: i64, user_id: i64)
    -> Result<Option<Work>>;
    // 按时间倒序列出提交，可限定用户
    async fn list_works(&self, assignment_id: i64, user_id: Option<i64>) -> Result<Vec<Work>>;
    async fn update_work(&self, id: i64, update: WorkUpdate) -> Result<Work>;
    // 删除提交，返回需要清理的 blob 名
    async fn delete_work(&self, id: i64) -> Result<Vec<String>>;
    async fn add_grade_history(&self, entry: NewGradeHistory) -> Result<()>;
    async fn list_grade_history(&self, work_id: i64) -> Result<Vec<GradeHistoryEntry>>;
    async fn mark_grade_passed_back(&self, work_id: i64) -> Result<()>;

    /// 文件与评论
    async fn list_work_files(&self, work_id: i64) -> Result<Vec<FileNode>>;
    async fn get_file(&self, id: i64) -> Result<Option<FileNode>>;
    async fn upsert_comment(&self, comment: Comment) -> Result<()>;
    async fn delete_comment(&self, file_id: i64, line: i32) -> Result<bool>;
    async fn list_file_comments(&self, file_id: i64) -> Result<Vec<Comment>>;
    async fn list_work_comments(&self, work_id: i64) -> Result<Vec<Comment>>;
    // (linter 名称, 评论)
    async fn list_file_linter_comments(&self, file_id: i64)
    -> Result<Vec<(String, LinterComment)>>;
    async fn list_work_linter_comments(&self, work_id: i64)
    -> Result<Vec<(String, LinterComment)>>;

    /// Linter
    // linter 与所有实例在同一事务中写入
    async fn create_assignment_linter(
        &self,
        linter: AssignmentLinter,
        instances: Vec<LinterInstance>,
    ) -> Result<()>;
    async fn get_assignment_linter(&self, id: &str) -> Result<Option<AssignmentLinter>>;
    async fn list_assignment_linters(&self, assignment_id: i64) -> Result<Vec<AssignmentLinter>>;
    async fn delete_assignment_linter(&self, id: &str) -> Result<bool>;
    async fn linter_instance_states(&self, linter_id: &str) -> Result<Vec<LinterState>>;
    async fn create_linter_instance(&self, instance: LinterInstance) -> Result<()>;
    async fn get_linter_instance(&self, id: &str) -> Result<Option<LinterInstance>>;
    // 写入终态与评论；实例已被删除时返回 false
    async fn finish_linter_instance(
        &self,
        id: &str,
        state: LinterState,
        error: Option<String>,
        comments: Vec<NewLinterComment>,
    ) -> Result<bool>;

    /// 评分标准
    async fn get_rubric(&self, assignment_id: i64) -> Result<Vec<RubricRow>>;
    async fn apply_rubric_plan(
        &self,
        assignment_id: i64,
        plan: RubricPlan,
        clear_selections: bool,
    ) -> Result<Vec<RubricRow>>;
    async fn get_rubric_item(&self, item_id: i64) -> Result<Option<(RubricItem, i64)>>;
    // 选中了任一给定条目的提交
    async fn works_selecting_items(&self, item_ids: &[i64]) -> Result<Vec<i64>>;
    async fn get_selection(&self, work_id: i64) -> Result<Vec<RubricItem>>;
    // 以下三个操作同时清除手动成绩
    async fn replace_selection(&self, work_id: i64, items: &[RubricItem]) -> Result<()>;
    async fn select_rubric_item(&self, work_id: i64, item: &RubricItem) -> Result<()>;
    async fn unselect_rubric_item(&self, work_id: i64, item_id: i64) -> Result<bool>;
}

pub async fn create_storage() -> Result<Arc<dyn Storage>> {
    let storage = sea_orm_storage::SeaOrmStorage::new_async().await?;
    Ok(Arc::new(storage))
}
