//! 预导入模块，方便使用

pub use super::assignment_grader_done::Entity as AssignmentGraderDone;
pub use super::assignment_graders::Entity as AssignmentGraders;
pub use super::assignment_linters::Entity as AssignmentLinters;
pub use super::assignment_results::Entity as AssignmentResults;
pub use super::assignments::Entity as Assignments;
pub use super::comments::Entity as Comments;
pub use super::course_roles::Entity as CourseRoles;
pub use super::course_roles_permissions::Entity as CourseRolesPermissions;
pub use super::courses::Entity as Courses;
pub use super::files::Entity as Files;
pub use super::grade_history::Entity as GradeHistory;
pub use super::linter_comments::Entity as LinterComments;
pub use super::linter_instances::Entity as LinterInstances;
pub use super::lti_providers::Entity as LtiProviders;
pub use super::permissions::Entity as Permissions;
pub use super::roles::Entity as Roles;
pub use super::roles_permissions::Entity as RolesPermissions;
pub use super::rubric_items::Entity as RubricItems;
pub use super::rubric_rows::Entity as RubricRows;
pub use super::users::Entity as Users;
pub use super::users_courses::Entity as UsersCourses;
pub use super::work_rubric_items::Entity as WorkRubricItems;
pub use super::works::Entity as Works;
