//! 权限求值
//!
//! 角色只保存与默认值相反的权限，求值时用默认值与显式集合取异或，
//! 并且要求权限的作用域与查询的作用域一致。

use std::collections::{BTreeMap, HashMap};

use crate::errors::{CGSystemError, Result};
use crate::models::permissions::entities::{Permission, PermissionScope, Role};

#[derive(Debug, Clone, Default)]
pub struct PermissionCatalogue {
    by_name: HashMap<String, Permission>,
}

impl PermissionCatalogue {
    pub fn new(permissions: Vec<Permission>) -> Self {
        Self {
            by_name: permissions
                .into_iter()
                .map(|p| (p.name.clone(), p))
                .collect(),
        }
    }

    /// 按名称查找，未知名称返回 INVALID_PARAM
    pub fn get(&self, name: &str) -> Result<&Permission> {
        self.by_name.get(name).ok_or_else(|| {
            CGSystemError::invalid_param("The given permission does not exist")
                .with_description(format!("Unknown permission `{name}`"))
        })
    }

    /// 某个作用域下的全部权限，按名称排序
    pub fn in_scope(&self, scope: PermissionScope) -> Vec<&Permission> {
        let mut perms: Vec<_> = self
            .by_name
            .values()
            .filter(|p| p.scope() == scope)
            .collect();
        perms.sort_by(|a, b| a.name.cmp(&b.name));
        perms
    }

    /// 单个权限在角色上的取值
    pub fn value_of(permission: &Permission, role: &Role) -> bool {
        permission.default_value != role.explicit.contains(&permission.name)
    }

    pub fn granted(&self, role: Option<&Role>, name: &str, scope: PermissionScope) -> Result<bool> {
        let permission = self.get(name)?;
        let Some(role) = role else {
            return Ok(false);
        };
        Ok(permission.scope() == scope && Self::value_of(permission, role))
    }

    /// 角色在某个作用域下的完整权限表
    pub fn role_map(&self, role: Option<&Role>, scope: PermissionScope) -> BTreeMap<String, bool> {
        self.in_scope(scope)
            .into_iter()
            .map(|p| {
                let value = role.is_some_and(|role| Self::value_of(p, role));
                (p.name.clone(), value)
            })
            .collect()
    }

    /// 设置权限值时是否需要显式记录
    pub fn needs_explicit(&self, name: &str, value: bool) -> Result<(&Permission, bool)> {
        let permission = self.get(name)?;
        Ok((permission, value != permission.default_value))
    }

    /// 用户在哪些课程中拥有该权限
    pub fn per_course(&self, enrollments: &[(i64, Role)], name: &str) -> Result<BTreeMap<i64, bool>> {
        let permission = self.get(name)?;
        Ok(enrollments
            .iter()
            .map(|(course_id, role)| {
                let value = permission.scope() == PermissionScope::Course
                    && Self::value_of(permission, role);
                (*course_id, value)
            })
            .collect())
    }

    /// 用户是否在任一课程中拥有该权限
    pub fn any_course(&self, enrollments: &[(i64, Role)], name: &str) -> Result<bool> {
        Ok(self.per_course(enrollments, name)?.values().any(|v| *v))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::BTreeSet;

    pub(crate) fn catalogue() -> PermissionCatalogue {
        let perms = [
            (1, "can_create_courses", false, false),
            (4, "can_edit_own_info", true, false),
            (6, "can_submit_own_work", true, true),
            (10, "can_grade_work", false, true),
            (9, "can_see_others_work", false, true),
        ];
        PermissionCatalogue::new(
            perms
                .into_iter()
                .map(|(id, name, default_value, course_permission)| Permission {
                    id,
                    name: name.into(),
                    default_value,
                    course_permission,
                })
                .collect(),
        )
    }

    pub(crate) fn role(id: i64, course_id: Option<i64>, explicit: &[&str]) -> Role {
        Role {
            id,
            name: format!("role{id}"),
            course_id,
            explicit: explicit.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
        }
    }

    #[test]
    fn test_default_inversion() {
        let cat = catalogue();
        let admin = role(1, None, &["can_create_courses"]);
        let nobody = role(4, None, &["can_edit_own_info"]);

        assert!(cat.granted(Some(&admin), "can_create_courses", PermissionScope::Site).unwrap());
        assert!(cat.granted(Some(&admin), "can_edit_own_info", PermissionScope::Site).unwrap());
        assert!(!cat.granted(Some(&nobody), "can_edit_own_info", PermissionScope::Site).unwrap());
        assert!(!cat.granted(Some(&nobody), "can_create_courses", PermissionScope::Site).unwrap());
    }

    #[test]
    fn test_scope_mismatch_is_denied() {
        let cat = catalogue();
        let student = role(3, Some(1), &[]);
        assert!(cat.granted(Some(&student), "can_submit_own_work", PermissionScope::Course).unwrap());
        assert!(!cat.granted(Some(&student), "can_submit_own_work", PermissionScope::Site).unwrap());
        assert!(!cat.granted(Some(&student), "can_edit_own_info", PermissionScope::Course).unwrap());
    }

    #[test]
    fn test_missing_role_and_unknown_permission() {
        let cat = catalogue();
        assert!(!cat.granted(None, "can_submit_own_work", PermissionScope::Course).unwrap());
        let err = cat.granted(None, "can_fly", PermissionScope::Site).unwrap_err();
        assert_eq!(err.api_code(), "INVALID_PARAM");
    }

    #[test]
    fn test_role_map_and_explicit() {
        let cat = catalogue();
        let ta = role(2, Some(1), &["can_grade_work"]);
        let map = cat.role_map(Some(&ta), PermissionScope::Course);
        assert_eq!(map.len(), 3);
        assert_eq!(map["can_grade_work"], true);
        assert_eq!(map["can_see_others_work"], false);
        assert_eq!(map["can_submit_own_work"], true);

        assert!(cat.needs_explicit("can_grade_work", true).unwrap().1);
        assert!(!cat.needs_explicit("can_grade_work", false).unwrap().1);
        assert!(cat.needs_explicit("can_submit_own_work", false).unwrap().1);
    }

    #[test]
    fn test_bulk_queries() {
        let cat = catalogue();
        let enrollments = vec![
            (1, role(10, Some(1), &["can_grade_work"])),
            (2, role(11, Some(2), &[])),
        ];
        let map = cat.per_course(&enrollments, "can_grade_work").unwrap();
        assert_eq!(map[&1], true);
        assert_eq!(map[&2], false);
        assert!(cat.any_course(&enrollments, "can_grade_work").unwrap());
        assert!(!cat.any_course(&enrollments, "can_see_others_work").unwrap());
        assert!(!cat.any_course(&enrollments, "can_create_courses").unwrap());
    }
}
