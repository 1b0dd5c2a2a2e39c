//! 权限目录、站点角色与课程角色

use super::SeaOrmStorage;
use crate::entity::{
    course_roles, course_roles_permissions, permissions, roles, roles_permissions, users,
    users_courses,
};
use crate::errors::{CGSystemError, Result};
use crate::models::permissions::entities::{Permission, Role};
use crate::models::users::entities::User;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::collections::{BTreeSet, HashMap};

impl SeaOrmStorage {
    /// 权限 id -> 名称
    async fn permission_names<C: ConnectionTrait>(conn: &C) -> Result<HashMap<i64, String>> {
        let rows = permissions::Entity::find()
            .all(conn)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询权限失败: {e}")))?;
        Ok(rows.into_iter().map(|p| (p.id, p.name)).collect())
    }

    async fn site_roles_where(&self, filter: Option<sea_orm::Condition>) -> Result<Vec<Role>> {
        let mut select = roles::Entity::find().order_by_asc(roles::Column::Id);
        if let Some(filter) = filter {
            select = select.filter(filter);
        }
        let found = select
            .all(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询角色失败: {e}")))?;
        if found.is_empty() {
            return Ok(Vec::new());
        }

        let names = Self::permission_names(&self.db).await?;
        let links = roles_permissions::Entity::find()
            .filter(roles_permissions::Column::RoleId.is_in(found.iter().map(|r| r.id)))
            .all(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询角色权限失败: {e}")))?;

        let mut explicit: HashMap<i64, BTreeSet<String>> = HashMap::new();
        for link in links {
            if let Some(name) = names.get(&link.permission_id) {
                explicit.entry(link.role_id).or_default().insert(name.clone());
            }
        }

        Ok(found
            .into_iter()
            .map(|r| Role {
                id: r.id,
                name: r.name,
                course_id: None,
                explicit: explicit.remove(&r.id).unwrap_or_default(),
            })
            .collect())
    }

    async fn course_roles_where<C: ConnectionTrait>(
        conn: &C,
        filter: sea_orm::Condition,
    ) -> Result<Vec<Role>> {
        let found = course_roles::Entity::find()
            .filter(filter)
            .order_by_asc(course_roles::Column::Id)
            .all(conn)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询课程角色失败: {e}")))?;
        if found.is_empty() {
            return Ok(Vec::new());
        }

        let names = Self::permission_names(conn).await?;
        let links = course_roles_permissions::Entity::find()
            .filter(
                course_roles_permissions::Column::CourseRoleId.is_in(found.iter().map(|r| r.id)),
            )
            .all(conn)
            .await
            .map_err(|e| {
                CGSystemError::database_operation(format!("查询课程角色权限失败: {e}"))
            })?;

        let mut explicit: HashMap<i64, BTreeSet<String>> = HashMap::new();
        for link in links {
            if let Some(name) = names.get(&link.permission_id) {
                explicit
                    .entry(link.course_role_id)
                    .or_default()
                    .insert(name.clone());
            }
        }

        Ok(found
            .into_iter()
            .map(|r| Role {
                id: r.id,
                name: r.name,
                course_id: Some(r.course_id),
                explicit: explicit.remove(&r.id).unwrap_or_default(),
            })
            .collect())
    }

    /// 写入课程角色及其显式权限（供事务内复用）
    pub(super) async fn insert_course_role<C: ConnectionTrait>(
        conn: &C,
        course_id: i64,
        name: &str,
        explicit: &[String],
    ) -> Result<Role> {
        let role = course_roles::ActiveModel {
            name: Set(name.to_string()),
            course_id: Set(course_id),
            ..Default::default()
        }
        .insert(conn)
        .await
        .map_err(|e| CGSystemError::database_operation(format!("创建课程角色失败: {e}")))?;

        let ids: HashMap<String, i64> = Self::permission_names(conn)
            .await?
            .into_iter()
            .map(|(id, name)| (name, id))
            .collect();

        let mut stored = BTreeSet::new();
        for perm in explicit {
            let permission_id = ids.get(perm).copied().ok_or_else(|| {
                CGSystemError::invalid_param(format!("Unknown permission \"{perm}\""))
            })?;
            course_roles_permissions::ActiveModel {
                course_role_id: Set(role.id),
                permission_id: Set(permission_id),
            }
            .insert(conn)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("写入课程角色权限失败: {e}")))?;
            stored.insert(perm.clone());
        }

        Ok(Role {
            id: role.id,
            name: role.name,
            course_id: Some(course_id),
            explicit: stored,
        })
    }

    pub async fn list_permissions_impl(&self) -> Result<Vec<Permission>> {
        let rows = permissions::Entity::find()
            .order_by_asc(permissions::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询权限失败: {e}")))?;
        Ok(rows.into_iter().map(|p| p.into_permission()).collect())
    }

    pub async fn get_site_role_impl(&self, id: i64) -> Result<Option<Role>> {
        let cond = sea_orm::Condition::all().add(roles::Column::Id.eq(id));
        Ok(self.site_roles_where(Some(cond)).await?.into_iter().next())
    }

    pub async fn get_site_role_by_name_impl(&self, name: &str) -> Result<Option<Role>> {
        let cond = sea_orm::Condition::all().add(roles::Column::Name.eq(name));
        Ok(self.site_roles_where(Some(cond)).await?.into_iter().next())
    }

    pub async fn list_site_roles_impl(&self) -> Result<Vec<Role>> {
        self.site_roles_where(None).await
    }

    pub async fn set_site_role_permission_impl(
        &self,
        role_id: i64,
        permission_id: i64,
        explicit: bool,
    ) -> Result<()> {
        roles_permissions::Entity::delete_many()
            .filter(roles_permissions::Column::RoleId.eq(role_id))
            .filter(roles_permissions::Column::PermissionId.eq(permission_id))
            .exec(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("更新角色权限失败: {e}")))?;

        if explicit {
            roles_permissions::ActiveModel {
                role_id: Set(role_id),
                permission_id: Set(permission_id),
            }
            .insert(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("更新角色权限失败: {e}")))?;
        }
        Ok(())
    }

    pub async fn list_course_roles_impl(&self, course_id: i64) -> Result<Vec<Role>> {
        Self::course_roles_where(
            &self.db,
            sea_orm::Condition::all().add(course_roles::Column::CourseId.eq(course_id)),
        )
        .await
    }

    pub async fn get_course_role_impl(&self, id: i64) -> Result<Option<Role>> {
        Ok(Self::course_roles_where(
            &self.db,
            sea_orm::Condition::all().add(course_roles::Column::Id.eq(id)),
        )
        .await?
        .into_iter()
        .next())
    }

    pub async fn create_course_role_impl(
        &self,
        course_id: i64,
        name: &str,
        explicit: &[String],
    ) -> Result<Role> {
        Self::insert_course_role(&self.db, course_id, name, explicit).await
    }

    pub async fn set_course_role_permission_impl(
        &self,
        role_id: i64,
        permission_id: i64,
        explicit: bool,
    ) -> Result<()> {
        course_roles_permissions::Entity::delete_many()
            .filter(course_roles_permissions::Column::CourseRoleId.eq(role_id))
            .filter(course_roles_permissions::Column::PermissionId.eq(permission_id))
            .exec(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("更新课程角色权限失败: {e}")))?;

        if explicit {
            course_roles_permissions::ActiveModel {
                course_role_id: Set(role_id),
                permission_id: Set(permission_id),
            }
            .insert(&self.db)
            .await
            .map_err(|e| {
                CGSystemError::database_operation(format!("更新课程角色权限失败: {e}"))
            })?;
        }
        Ok(())
    }

    pub async fn user_course_role_impl(&self, user_id: i64, course_id: i64) -> Result<Option<Role>> {
        let link = users_courses::Entity::find_by_id((user_id, course_id))
            .one(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询课程成员失败: {e}")))?;

        match link {
            Some(link) => self.get_course_role_impl(link.course_role_id).await,
            None => Ok(None),
        }
    }

    pub async fn user_course_roles_impl(&self, user_id: i64) -> Result<Vec<(i64, Role)>> {
        let links = users_courses::Entity::find()
            .filter(users_courses::Column::UserId.eq(user_id))
            .all(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询课程成员失败: {e}")))?;
        if links.is_empty() {
            return Ok(Vec::new());
        }

        let roles: HashMap<i64, Role> = Self::course_roles_where(
            &self.db,
            sea_orm::Condition::all()
                .add(course_roles::Column::Id.is_in(links.iter().map(|l| l.course_role_id))),
        )
        .await?
        .into_iter()
        .map(|r| (r.id, r))
        .collect();

        Ok(links
            .into_iter()
            .filter_map(|l| roles.get(&l.course_role_id).map(|r| (l.course_id, r.clone())))
            .collect())
    }

    pub async fn set_user_course_role_impl(
        &self,
        user_id: i64,
        course_id: i64,
        role_id: i64,
    ) -> Result<()> {
        Self::enroll(&self.db, user_id, course_id, role_id).await
    }

    /// 加入课程或修改课程角色
    pub(super) async fn enroll<C: ConnectionTrait>(
        conn: &C,
        user_id: i64,
        course_id: i64,
        role_id: i64,
    ) -> Result<()> {
        let existing = users_courses::Entity::find_by_id((user_id, course_id))
            .one(conn)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询课程成员失败: {e}")))?;

        match existing {
            Some(model) => {
                let mut active: users_courses::ActiveModel = model.into();
                active.course_role_id = Set(role_id);
                active.update(conn).await
            }
            None => {
                users_courses::ActiveModel {
                    user_id: Set(user_id),
                    course_id: Set(course_id),
                    course_role_id: Set(role_id),
                }
                .insert(conn)
                .await
            }
        }
        .map_err(|e| CGSystemError::database_operation(format!("更新课程成员失败: {e}")))?;
        Ok(())
    }

    pub async fn list_course_users_impl(&self, course_id: i64) -> Result<Vec<(User, Role)>> {
        let links = users_courses::Entity::find()
            .filter(users_courses::Column::CourseId.eq(course_id))
            .find_also_related(users::Entity)
            .all(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询课程成员失败: {e}")))?;

        let roles: HashMap<i64, Role> = self
            .list_course_roles_impl(course_id)
            .await?
            .into_iter()
            .map(|r| (r.id, r))
            .collect();

        Ok(links
            .into_iter()
            .filter_map(|(link, user)| {
                let user = user?.into_user();
                roles
                    .get(&link.course_role_id)
                    .map(|role| (user, role.clone()))
            })
            .collect())
    }
}
