//! LTI 角色到站点/课程角色的映射

/// 自动创建课程角色时的兜底名称
pub const NEW_LTI_ROLE: &str = "New LTI Role";

/// `urn:lti:role:ims/lis/Instructor` -> `instructor`
pub fn normalize_role(role: &str) -> String {
    role.trim()
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

fn site_lookup(role: &str) -> Option<&'static str> {
    match role {
        "administrator" => Some("Admin"),
        "instructor" => Some("Staff"),
        "student" | "learner" => Some("Student"),
        _ => None,
    }
}

fn course_lookup(role: &str) -> Option<&'static str> {
    match role {
        "instructor" => Some("Teacher"),
        "teachingassistant" | "ta" => Some("TA"),
        "learner" | "student" => Some("Student"),
        "observer" => Some("Observer"),
        _ => None,
    }
}

/// 第一个可识别的站点角色，否则使用默认角色
pub fn site_role_for(roles: &[&str], default_role: &str) -> String {
    roles
        .iter()
        .find_map(|role| site_lookup(&normalize_role(role)))
        .unwrap_or(default_role)
        .to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CourseRoleMatch {
    /// 课程默认角色之一
    Known(&'static str),
    /// 没有可识别的角色，需要按名称新建
    Unknown(String),
}

pub fn course_role_for(roles: &[&str]) -> CourseRoleMatch {
    let normalized: Vec<String> = roles
        .iter()
        .map(|role| normalize_role(role))
        .filter(|role| !role.is_empty())
        .collect();

    if let Some(known) = normalized.iter().find_map(|role| course_lookup(role)) {
        return CourseRoleMatch::Known(known);
    }
    let unknown = normalized
        .into_iter()
        .find(|role| site_lookup(role).is_none())
        .unwrap_or_else(|| NEW_LTI_ROLE.to_string());
    CourseRoleMatch::Unknown(unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_role("urn:lti:role:ims/lis/Instructor"), "instructor");
        assert_eq!(normalize_role(" Learner "), "learner");
        assert_eq!(normalize_role("urn:lti:instrole:ims/lis/Administrator"), "administrator");
    }

    #[test]
    fn test_site_role() {
        assert_eq!(site_role_for(&["urn:lti:instrole:ims/lis/Administrator"], "Student"), "Admin");
        assert_eq!(site_role_for(&["Instructor"], "Student"), "Staff");
        assert_eq!(site_role_for(&["Mentor", "Learner"], "Staff"), "Student");
        assert_eq!(site_role_for(&["Mentor"], "Student"), "Student");
        assert_eq!(site_role_for(&[], "Staff"), "Staff");
    }

    #[test]
    fn test_course_role() {
        assert_eq!(
            course_role_for(&["urn:lti:role:ims/lis/Instructor"]),
            CourseRoleMatch::Known("Teacher")
        );
        assert_eq!(
            course_role_for(&["urn:lti:role:ims/lis/TeachingAssistant"]),
            CourseRoleMatch::Known("TA")
        );
        assert_eq!(course_role_for(&["Mentor", "Learner"]), CourseRoleMatch::Known("Student"));
        assert_eq!(course_role_for(&["Observer"]), CourseRoleMatch::Known("Observer"));
    }

    #[test]
    fn test_unknown_course_role() {
        assert_eq!(
            course_role_for(&["urn:lti:role:ims/lis/Mentor", "ContentDeveloper"]),
            CourseRoleMatch::Unknown("mentor".into())
        );
        assert_eq!(
            course_role_for(&["urn:lti:instrole:ims/lis/Administrator"]),
            CourseRoleMatch::Unknown(NEW_LTI_ROLE.into())
        );
        assert_eq!(course_role_for(&[]), CourseRoleMatch::Unknown(NEW_LTI_ROLE.into()));
    }
}
