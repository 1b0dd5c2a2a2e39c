//! 权限服务
//!
//! 站点权限跟随用户的站点角色，课程权限跟随用户在课程中的角色。

pub mod checker;
pub mod defaults;
pub mod engine;
pub mod query;
pub mod roles;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::errors::Result;
use crate::middlewares::RequireJWT;
use crate::models::assignments::entities::{Assignment, AssignmentState};
use crate::models::submissions::entities::Work;
use crate::models::permissions::entities::{Perm, PermissionScope};
use crate::models::permissions::requests::{PermissionQuery, SetPermissionRequest};
use crate::models::users::entities::User;
use crate::storage::Storage;

pub use checker::PermissionChecker;
pub use defaults::{OWNER_ROLE, default_course_roles};
pub use engine::PermissionCatalogue;

pub struct PermissionService {
    storage: Option<Arc<dyn Storage>>,
}

impl PermissionService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> Arc<dyn Storage> {
        if let Some(storage) = &self.storage {
            storage.clone()
        } else {
            request
                .app_data::<actix_web::web::Data<Arc<dyn Storage>>>()
                .expect("Storage not found in app data")
                .get_ref()
                .clone()
        }
    }

    pub async fn get_permissions(
        &self,
        request: &HttpRequest,
        query: PermissionQuery,
    ) -> ActixResult<HttpResponse> {
        query::get_permissions(self, request, query).await
    }

    pub async fn list_roles(&self, request: &HttpRequest) -> ActixResult<HttpResponse> {
        roles::list_roles(self, request).await
    }

    pub async fn update_role(
        &self,
        request: &HttpRequest,
        role_id: i64,
        req: SetPermissionRequest,
    ) -> ActixResult<HttpResponse> {
        roles::update_role(self, request, role_id, req).await
    }
}

/// 读取当前用户并加载其权限
pub async fn load_checker(
    storage: &Arc<dyn Storage>,
    request: &HttpRequest,
) -> Result<(User, PermissionChecker)> {
    let user = RequireJWT::current_user(request)?;
    let checker = PermissionChecker::load(storage, &user).await?;
    Ok((user, checker))
}

/// 课程中拥有某个课程权限的活跃用户，按小写名称排序
pub async fn users_with_course_perm(
    storage: &Arc<dyn Storage>,
    course_id: i64,
    perm: Perm,
) -> Result<Vec<User>> {
    let catalogue = PermissionCatalogue::new(storage.list_permissions().await?);
    let mut users = Vec::new();
    for (user, role) in storage.list_course_users(course_id).await? {
        if user.active && catalogue.granted(Some(&role), perm.name(), PermissionScope::Course)? {
            users.push(user);
        }
    }
    users.sort_by_key(|u| u.name.to_lowercase());
    Ok(users)
}

/// 能否查看作业：隐藏作业另需 `can_see_hidden_assignments`
pub fn ensure_can_see_assignment(checker: &PermissionChecker, assignment: &Assignment) -> Result<()> {
    checker.ensure_course(Perm::CanSeeAssignments, assignment.course_id)?;
    if assignment.state == AssignmentState::Hidden {
        checker.ensure_course(Perm::CanSeeHiddenAssignments, assignment.course_id)?;
    }
    Ok(())
}

/// 能否查看提交：自己的提交或拥有 `can_see_others_work`
pub fn ensure_can_see_work(
    checker: &PermissionChecker,
    assignment: &Assignment,
    work: &Work,
) -> Result<()> {
    ensure_can_see_assignment(checker, assignment)?;
    if work.user_id != checker.user_id() {
        checker.ensure_course(Perm::CanSeeOthersWork, assignment.course_id)?;
    }
    Ok(())
}

/// 能否看到成绩与反馈：评分员总是可以，学生要等作业完成
pub fn can_see_feedback(checker: &PermissionChecker, assignment: &Assignment) -> bool {
    assignment.is_done()
        || checker.course(Perm::CanSeeGradeBeforeOpen, assignment.course_id)
        || checker.course(Perm::CanGradeWork, assignment.course_id)
        || checker.course(Perm::CanSeeOthersWork, assignment.course_id)
}
