use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 权限目录中的一项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: i64,
    pub name: String,
    pub default_value: bool,
    pub course_permission: bool,
}

impl Permission {
    pub fn scope(&self) -> PermissionScope {
        if self.course_permission {
            PermissionScope::Course
        } else {
            PermissionScope::Site
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionScope {
    Site,
    Course,
}

/// 站点角色或课程角色
///
/// `explicit` 只保存取值与默认值相反的权限名。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub course_id: Option<i64>,
    pub explicit: BTreeSet<String>,
}

macro_rules! define_permissions {
    ($($variant:ident => $name:literal, $scope:ident;)*) => {
        /// 代码中引用的权限
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Perm {
            $($variant,)*
        }

        impl Perm {
            pub const ALL: &'static [Perm] = &[$(Perm::$variant,)*];

            pub fn name(&self) -> &'static str {
                match self {
                    $(Perm::$variant => $name,)*
                }
            }

            pub fn scope(&self) -> PermissionScope {
                match self {
                    $(Perm::$variant => PermissionScope::$scope,)*
                }
            }

            pub fn from_name(name: &str) -> Option<Perm> {
                match name {
                    $($name => Some(Perm::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

define_permissions! {
    CanCreateCourses => "can_create_courses", Site;
    CanManageSiteUsers => "can_manage_site_users", Site;
    CanSearchUsers => "can_search_users", Site;
    CanEditOwnInfo => "can_edit_own_info", Site;
    CanUseSnippets => "can_use_snippets", Site;
    CanSubmitOwnWork => "can_submit_own_work", Course;
    CanSeeAssignments => "can_see_assignments", Course;
    CanSeeHiddenAssignments => "can_see_hidden_assignments", Course;
    CanSeeOthersWork => "can_see_others_work", Course;
    CanGradeWork => "can_grade_work", Course;
    CanSeeGradeBeforeOpen => "can_see_grade_before_open", Course;
    CanUploadAfterDeadline => "can_upload_after_deadline", Course;
    CanManageCourse => "can_manage_course", Course;
    ManageRubrics => "manage_rubrics", Course;
    CanUseLinter => "can_use_linter", Course;
    CanEditOthersWork => "can_edit_others_work", Course;
    CanDeleteSubmission => "can_delete_submission", Course;
    CanViewOwnTeacherFiles => "can_view_own_teacher_files", Course;
}

impl std::fmt::Display for Perm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
