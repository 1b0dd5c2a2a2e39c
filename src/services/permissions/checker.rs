//! 请求内的权限检查

use std::collections::BTreeMap;
use std::sync::Arc;

use super::engine::PermissionCatalogue;
use crate::errors::{CGSystemError, Result};
use crate::models::permissions::entities::{Perm, PermissionScope, Role};
use crate::models::users::entities::User;
use crate::storage::Storage;

/// 一次请求中当前用户的全部角色
#[derive(Debug, Clone)]
pub struct PermissionChecker {
    user_id: i64,
    active: bool,
    catalogue: PermissionCatalogue,
    site_role: Option<Role>,
    course_roles: Vec<(i64, Role)>,
}

impl PermissionChecker {
    pub async fn load(storage: &Arc<dyn Storage>, user: &User) -> Result<Self> {
        let catalogue = PermissionCatalogue::new(storage.list_permissions().await?);
        let site_role = match user.role_id {
            Some(id) => storage.get_site_role(id).await?,
            None => None,
        };
        let course_roles = storage.user_course_roles(user.id).await?;
        Ok(Self::from_parts(user, catalogue, site_role, course_roles))
    }

    pub fn from_parts(
        user: &User,
        catalogue: PermissionCatalogue,
        site_role: Option<Role>,
        course_roles: Vec<(i64, Role)>,
    ) -> Self {
        Self {
            user_id: user.id,
            active: user.active,
            catalogue,
            site_role,
            course_roles,
        }
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn catalogue(&self) -> &PermissionCatalogue {
        &self.catalogue
    }

    pub fn course_role(&self, course_id: i64) -> Option<&Role> {
        self.course_roles
            .iter()
            .find(|(id, _)| *id == course_id)
            .map(|(_, role)| role)
    }

    pub fn course_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.course_roles.iter().map(|(id, _)| *id)
    }

    pub fn site(&self, perm: Perm) -> bool {
        self.active
            && self
                .catalogue
                .granted(self.site_role.as_ref(), perm.name(), PermissionScope::Site)
                .unwrap_or(false)
    }

    pub fn course(&self, perm: Perm, course_id: i64) -> bool {
        self.active
            && self
                .catalogue
                .granted(self.course_role(course_id), perm.name(), PermissionScope::Course)
                .unwrap_or(false)
    }

    pub fn ensure_site(&self, perm: Perm) -> Result<()> {
        if self.site(perm) {
            Ok(())
        } else {
            Err(denied(perm))
        }
    }

    pub fn ensure_course(&self, perm: Perm, course_id: i64) -> Result<()> {
        if self.course(perm, course_id) {
            Ok(())
        } else {
            Err(denied(perm))
        }
    }

    /// 站点权限全表
    pub fn site_map(&self) -> BTreeMap<String, bool> {
        let role = self.site_role.as_ref().filter(|_| self.active);
        self.catalogue.role_map(role, PermissionScope::Site)
    }

    /// 某门课程的课程权限全表
    pub fn course_map(&self, course_id: i64) -> BTreeMap<String, bool> {
        let role = self.course_role(course_id).filter(|_| self.active);
        self.catalogue.role_map(role, PermissionScope::Course)
    }

    /// 按名称查询每门课程中的取值
    pub fn per_course(&self, name: &str) -> Result<BTreeMap<i64, bool>> {
        let mut map = self.catalogue.per_course(&self.course_roles, name)?;
        if !self.active {
            map.values_mut().for_each(|v| *v = false);
        }
        Ok(map)
    }

    pub fn any_course(&self, perm: Perm) -> bool {
        self.active
            && self
                .catalogue
                .any_course(&self.course_roles, perm.name())
                .unwrap_or(false)
    }
}

fn denied(perm: Perm) -> CGSystemError {
    CGSystemError::incorrect_permission("You do not have permission to do this")
        .with_description(format!("The current user does not have `{perm}`"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::permissions::engine::tests::{catalogue, role};

    fn user(active: bool) -> User {
        User {
            id: 7,
            name: "Grader".into(),
            username: "grader".into(),
            email: "g@example.com".into(),
            password_hash: None,
            active,
            lti_user_id: None,
            role_id: Some(2),
            created_at: chrono::Utc::now(),
        }
    }

    fn checker(active: bool) -> PermissionChecker {
        PermissionChecker::from_parts(
            &user(active),
            catalogue(),
            Some(role(2, None, &["can_create_courses"])),
            vec![(5, role(20, Some(5), &["can_grade_work"]))],
        )
    }

    #[test]
    fn test_site_and_course_checks() {
        let checker = checker(true);
        assert!(checker.site(Perm::CanCreateCourses));
        assert!(checker.course(Perm::CanGradeWork, 5));
        assert!(!checker.course(Perm::CanGradeWork, 6));
        assert!(checker.ensure_course(Perm::CanSeeOthersWork, 5).is_err());
        assert!(checker.ensure_site(Perm::CanEditOwnInfo).is_ok());
        assert!(checker.any_course(Perm::CanGradeWork));
    }

    #[test]
    fn test_inactive_user_has_nothing() {
        let checker = checker(false);
        assert!(!checker.site(Perm::CanEditOwnInfo));
        assert!(!checker.course(Perm::CanSubmitOwnWork, 5));
        assert!(checker.site_map().values().all(|v| !v));
        assert!(checker.per_course("can_grade_work").unwrap().values().all(|v| !v));
        let err = checker.ensure_site(Perm::CanCreateCourses).unwrap_err();
        assert_eq!(err.api_code(), "INCORRECT_PERMISSION");
    }
}
