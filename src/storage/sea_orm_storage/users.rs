use super::SeaOrmStorage;
use crate::entity::users::{ActiveModel, Column, Entity as Users};
use crate::errors::{CGSystemError, Result};
use crate::models::users::entities::{NewUser, User};
use crate::utils::escape_like_pattern;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

impl SeaOrmStorage {
    /// 创建用户
    pub async fn create_user_impl(&self, req: NewUser) -> Result<User> {
        let model = ActiveModel {
            name: Set(req.name),
            username: Set(req.username),
            email: Set(req.email),
            password_hash: Set(req.password_hash),
            active: Set(true),
            lti_user_id: Set(req.lti_user_id),
            role_id: Set(req.role_id),
            created_at: Set(chrono::Utc::now().timestamp()),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("创建用户失败: {e}")))?;

        Ok(result.into_user())
    }

    /// 通过 ID 获取用户
    pub async fn get_user_by_id_impl(&self, id: i64) -> Result<Option<User>> {
        let result = Users::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询用户失败: {e}")))?;

        Ok(result.map(|m| m.into_user()))
    }

    pub async fn get_users_by_ids_impl(&self, ids: &[i64]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let result = Users::find()
            .filter(Column::Id.is_in(ids.iter().copied()))
            .all(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询用户失败: {e}")))?;

        Ok(result.into_iter().map(|m| m.into_user()).collect())
    }

    /// 通过用户名获取用户
    pub async fn get_user_by_username_impl(&self, username: &str) -> Result<Option<User>> {
        let result = Users::find()
            .filter(Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询用户失败: {e}")))?;

        Ok(result.map(|m| m.into_user()))
    }

    /// 登录查找，用户名精确匹配优先
    pub async fn find_user_for_login_impl(&self, identifier: &str) -> Result<Option<User>> {
        if let Some(user) = self.get_user_by_username_impl(identifier).await? {
            return Ok(Some(user));
        }

        let result = Users::find()
            .filter(Expr::cust_with_values(
                "LOWER(email) = ?",
                [identifier.to_lowercase()],
            ))
            .order_by_asc(Column::Id)
            .one(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询用户失败: {e}")))?;

        Ok(result.map(|m| m.into_user()))
    }

    pub async fn get_user_by_lti_id_impl(&self, lti_user_id: &str) -> Result<Option<User>> {
        let result = Users::find()
            .filter(Column::LtiUserId.eq(lti_user_id))
            .one(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询用户失败: {e}")))?;

        Ok(result.map(|m| m.into_user()))
    }

    /// 统计用户数量
    pub async fn count_users_impl(&self) -> Result<u64> {
        Users::find()
            .count(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("统计用户数量失败: {e}")))
    }

    /// 按用户名或姓名模糊搜索
    pub async fn search_users_impl(&self, query: &str, limit: u64) -> Result<Vec<User>> {
        let escaped = escape_like_pattern(query.trim());
        let result = Users::find()
            .filter(
                Condition::any()
                    .add(Column::Username.contains(&escaped))
                    .add(Column::Name.contains(&escaped)),
            )
            .filter(Column::Active.eq(true))
            .order_by_asc(Column::Name)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("搜索用户失败: {e}")))?;

        Ok(result.into_iter().map(|m| m.into_user()).collect())
    }

    pub async fn usernames_with_prefix_impl(&self, prefix: &str) -> Result<Vec<String>> {
        let result = Users::find()
            .filter(Column::Username.starts_with(prefix))
            .all(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询用户名失败: {e}")))?;

        Ok(result.into_iter().map(|m| m.username).collect())
    }

    /// 邮箱是否已存在（不区分大小写）
    pub async fn email_exists_impl(&self, email: &str) -> Result<bool> {
        let count = Users::find()
            .filter(Expr::cust_with_values(
                "LOWER(email) = ?",
                [email.to_lowercase()],
            ))
            .count(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询邮箱失败: {e}")))?;

        Ok(count > 0)
    }

    pub async fn update_user_email_impl(&self, id: i64, email: &str) -> Result<()> {
        Users::update_many()
            .col_expr(Column::Email, Expr::value(email.to_string()))
            .filter(Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("更新邮箱失败: {e}")))?;
        Ok(())
    }

    pub async fn set_user_site_role_impl(&self, id: i64, role_id: i64) -> Result<()> {
        Users::update_many()
            .col_expr(Column::RoleId, Expr::value(role_id))
            .filter(Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("更新用户角色失败: {e}")))?;
        Ok(())
    }
}
