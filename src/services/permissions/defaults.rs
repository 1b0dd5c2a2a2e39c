//! 新课程的默认角色

use crate::models::permissions::entities::Perm;

/// 课程创建者的角色
pub const OWNER_ROLE: &str = "Teacher";

/// (角色名, 与默认值相反的权限)
const DEFAULT_COURSE_ROLES: &[(&str, &[Perm])] = &[
    (
        "Teacher",
        &[
            Perm::CanSeeHiddenAssignments,
            Perm::CanSeeOthersWork,
            Perm::CanGradeWork,
            Perm::CanSeeGradeBeforeOpen,
            Perm::CanUploadAfterDeadline,
            Perm::CanManageCourse,
            Perm::ManageRubrics,
            Perm::CanUseLinter,
            Perm::CanEditOthersWork,
            Perm::CanDeleteSubmission,
            Perm::CanViewOwnTeacherFiles,
        ],
    ),
    (
        "TA",
        &[
            Perm::CanSeeHiddenAssignments,
            Perm::CanSeeOthersWork,
            Perm::CanGradeWork,
            Perm::CanSeeGradeBeforeOpen,
            Perm::CanUploadAfterDeadline,
        ],
    ),
    ("Student", &[]),
    ("Observer", &[Perm::CanSubmitOwnWork, Perm::CanSeeOthersWork]),
];

pub fn default_course_roles() -> Vec<(String, Vec<String>)> {
    DEFAULT_COURSE_ROLES
        .iter()
        .map(|(name, perms)| {
            (
                name.to_string(),
                perms.iter().map(|p| p.name().to_string()).collect(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::permissions::entities::PermissionScope;

    #[test]
    fn test_default_roles() {
        let roles = default_course_roles();
        let names: Vec<_> = roles.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Teacher", "TA", "Student", "Observer"]);
        assert!(names.contains(&OWNER_ROLE));
    }

    #[test]
    fn test_only_course_permissions() {
        for (_, perms) in DEFAULT_COURSE_ROLES {
            assert!(perms.iter().all(|p| p.scope() == PermissionScope::Course));
        }
    }
}
