use super::SeaOrmStorage;
use crate::entity::{courses, lti_providers};
use crate::errors::{CGSystemError, Result};
use crate::models::courses::entities::{Course, NewCourse};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait};

impl SeaOrmStorage {
    /// 创建课程、课程角色并登记创建者
    pub async fn create_course_impl(&self, req: NewCourse) -> Result<Course> {
        let txn = self.db.begin().await?;

        let course = courses::ActiveModel {
            name: Set(req.name),
            lti_course_id: Set(req.lti_course_id),
            lti_provider_id: Set(req.lti_provider_id),
            created_at: Set(chrono::Utc::now().timestamp()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| CGSystemError::database_operation(format!("创建课程失败: {e}")))?;

        let mut owner_role = None;
        for (name, explicit) in &req.roles {
            let role = Self::insert_course_role(&txn, course.id, name, explicit).await?;
            if let Some((_, owner_role_name)) = &req.owner
                && owner_role_name == name
            {
                owner_role = Some(role.id);
            }
        }

        if let (Some((owner_id, _)), Some(role_id)) = (req.owner, owner_role) {
            Self::enroll(&txn, owner_id, course.id, role_id).await?;
        }

        txn.commit().await?;
        Ok(course.into_course())
    }

    pub async fn get_course_impl(&self, id: i64) -> Result<Option<Course>> {
        let result = courses::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询课程失败: {e}")))?;
        Ok(result.map(|m| m.into_course()))
    }

    pub async fn get_courses_by_ids_impl(&self, ids: &[i64]) -> Result<Vec<Course>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let result = courses::Entity::find()
            .filter(courses::Column::Id.is_in(ids.iter().copied()))
            .order_by_asc(courses::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询课程失败: {e}")))?;
        Ok(result.into_iter().map(|m| m.into_course()).collect())
    }

    pub async fn get_course_by_lti_id_impl(
        &self,
        provider_id: i64,
        lti_course_id: &str,
    ) -> Result<Option<Course>> {
        let result = courses::Entity::find()
            .filter(courses::Column::LtiProviderId.eq(provider_id))
            .filter(courses::Column::LtiCourseId.eq(lti_course_id))
            .one(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询课程失败: {e}")))?;
        Ok(result.map(|m| m.into_course()))
    }

    pub async fn update_course_name_impl(&self, id: i64, name: &str) -> Result<()> {
        courses::Entity::update_many()
            .col_expr(courses::Column::Name, Expr::value(name.to_string()))
            .filter(courses::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("更新课程失败: {e}")))?;
        Ok(())
    }

    pub async fn get_or_create_lti_provider_impl(&self, key: &str) -> Result<i64> {
        let existing = lti_providers::Entity::find()
            .filter(lti_providers::Column::Key.eq(key))
            .one(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询 LTI 提供方失败: {e}")))?;
        if let Some(provider) = existing {
            return Ok(provider.id);
        }

        let provider = lti_providers::ActiveModel {
            key: Set(key.to_string()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(|e| CGSystemError::database_operation(format!("创建 LTI 提供方失败: {e}")))?;
        Ok(provider.id)
    }

    pub async fn get_lti_provider_key_impl(&self, id: i64) -> Result<Option<String>> {
        let provider = lti_providers::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询 LTI 提供方失败: {e}")))?;
        Ok(provider.map(|p| p.key))
    }
}
