//! SeaORM 实体定义
//!
//! 这些实体用于数据库操作，与 models 模块中的业务实体分离。
//! Storage 层使用这些实体进行 CRUD 操作，然后转换为 models 中的业务实体。

pub mod prelude;

pub mod assignment_grader_done;
pub mod assignment_graders;
pub mod assignment_linters;
pub mod assignment_results;
pub mod assignments;
pub mod comments;
pub mod course_roles;
pub mod course_roles_permissions;
pub mod courses;
pub mod files;
pub mod grade_history;
pub mod linter_comments;
pub mod linter_instances;
pub mod lti_providers;
pub mod permissions;
pub mod roles;
pub mod roles_permissions;
pub mod rubric_items;
pub mod rubric_rows;
pub mod users;
pub mod users_courses;
pub mod work_rubric_items;
pub mod works;
