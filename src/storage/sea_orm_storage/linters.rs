use super::SeaOrmStorage;
use crate::entity::{assignment_linters, linter_comments, linter_instances};
use crate::errors::{CGSystemError, Result};
use crate::models::comments::entities::NewLinterComment;
use crate::models::linters::entities::{AssignmentLinter, LinterInstance, LinterState};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};

impl SeaOrmStorage {
    /// linter 与实例在同一事务中写入
    pub async fn create_assignment_linter_impl(
        &self,
        linter: AssignmentLinter,
        instances: Vec<LinterInstance>,
    ) -> Result<()> {
        let txn = self.db.begin().await?;

        assignment_linters::ActiveModel {
            id: Set(linter.id),
            assignment_id: Set(linter.assignment_id),
            name: Set(linter.name),
            config: Set(linter.config),
        }
        .insert(&txn)
        .await
        .map_err(|e| CGSystemError::database_operation(format!("创建 linter 失败: {e}")))?;

        for instance in instances {
            Self::instance_model(instance)
                .insert(&txn)
                .await
                .map_err(|e| CGSystemError::database_operation(format!("创建 linter 实例失败: {e}")))?;
        }

        txn.commit().await?;
        Ok(())
    }

    fn instance_model(instance: LinterInstance) -> linter_instances::ActiveModel {
        linter_instances::ActiveModel {
            id: Set(instance.id),
            work_id: Set(instance.work_id),
            tester_id: Set(instance.tester_id),
            state: Set(instance.state.as_str().to_string()),
            error: Set(instance.error),
        }
    }

    pub async fn get_assignment_linter_impl(&self, id: &str) -> Result<Option<AssignmentLinter>> {
        let result = assignment_linters::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询 linter 失败: {e}")))?;
        Ok(result.map(|m| m.into_assignment_linter()))
    }

    pub async fn list_assignment_linters_impl(
        &self,
        assignment_id: i64,
    ) -> Result<Vec<AssignmentLinter>> {
        let result = assignment_linters::Entity::find()
            .filter(assignment_linters::Column::AssignmentId.eq(assignment_id))
            .order_by_asc(assignment_linters::Column::Name)
            .all(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询 linter 失败: {e}")))?;
        Ok(result.into_iter().map(|m| m.into_assignment_linter()).collect())
    }

    /// 删除 linter 及其实例与评论
    pub async fn delete_assignment_linter_impl(&self, id: &str) -> Result<bool> {
        let txn = self.db.begin().await?;

        let instance_ids: Vec<String> = linter_instances::Entity::find()
            .filter(linter_instances::Column::TesterId.eq(id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|i| i.id)
            .collect();

        if !instance_ids.is_empty() {
            linter_comments::Entity::delete_many()
                .filter(linter_comments::Column::LinterId.is_in(instance_ids))
                .exec(&txn)
                .await?;
        }
        linter_instances::Entity::delete_many()
            .filter(linter_instances::Column::TesterId.eq(id))
            .exec(&txn)
            .await?;
        let result = assignment_linters::Entity::delete_by_id(id.to_string())
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn linter_instance_states_impl(&self, linter_id: &str) -> Result<Vec<LinterState>> {
        let result = linter_instances::Entity::find()
            .filter(linter_instances::Column::TesterId.eq(linter_id))
            .all(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询 linter 实例失败: {e}")))?;
        Ok(result
            .into_iter()
            .map(|m| m.into_linter_instance().state)
            .collect())
    }

    pub async fn create_linter_instance_impl(&self, instance: LinterInstance) -> Result<()> {
        Self::instance_model(instance)
            .insert(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("创建 linter 实例失败: {e}")))?;
        Ok(())
    }

    pub async fn get_linter_instance_impl(&self, id: &str) -> Result<Option<LinterInstance>> {
        let result = linter_instances::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询 linter 实例失败: {e}")))?;
        Ok(result.map(|m| m.into_linter_instance()))
    }

    /// 写入实例终态；实例在运行期间被删除时丢弃结果
    pub async fn finish_linter_instance_impl(
        &self,
        id: &str,
        state: LinterState,
        error: Option<String>,
        comments: Vec<NewLinterComment>,
    ) -> Result<bool> {
        let txn = self.db.begin().await?;

        let Some(model) = linter_instances::Entity::find_by_id(id.to_string())
            .one(&txn)
            .await?
        else {
            txn.rollback().await?;
            return Ok(false);
        };

        for comment in comments {
            linter_comments::ActiveModel {
                file_id: Set(comment.file_id),
                line: Set(comment.line),
                linter_id: Set(id.to_string()),
                linter_code: Set(comment.code),
                comment: Set(comment.comment),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("写入 linter 评论失败: {e}")))?;
        }

        let mut active: linter_instances::ActiveModel = model.into();
        active.state = Set(state.as_str().to_string());
        active.error = Set(error);
        active.update(&txn).await?;

        txn.commit().await?;
        Ok(true)
    }
}
