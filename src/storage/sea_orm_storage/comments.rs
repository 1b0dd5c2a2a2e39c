use super::SeaOrmStorage;
use crate::entity::{assignment_linters, comments, files, linter_comments, linter_instances};
use crate::errors::{CGSystemError, Result};
use crate::models::comments::entities::{Comment, LinterComment};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use std::collections::HashMap;

impl SeaOrmStorage {
    /// 写入或覆盖 (file_id, line) 上的评论
    pub async fn upsert_comment_impl(&self, comment: Comment) -> Result<()> {
        let existing = comments::Entity::find_by_id((comment.file_id, comment.line))
            .one(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询评论失败: {e}")))?;

        match existing {
            Some(model) if model.comment == comment.comment && model.user_id == comment.user_id => {
                return Ok(());
            }
            Some(model) => {
                let mut active: comments::ActiveModel = model.into();
                active.user_id = Set(comment.user_id);
                active.comment = Set(comment.comment);
                active.update(&self.db).await
            }
            None => {
                comments::ActiveModel {
                    file_id: Set(comment.file_id),
                    line: Set(comment.line),
                    user_id: Set(comment.user_id),
                    comment: Set(comment.comment),
                }
                .insert(&self.db)
                .await
            }
        }
        .map_err(|e| CGSystemError::database_operation(format!("保存评论失败: {e}")))?;
        Ok(())
    }

    pub async fn delete_comment_impl(&self, file_id: i64, line: i32) -> Result<bool> {
        let result = comments::Entity::delete_by_id((file_id, line))
            .exec(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("删除评论失败: {e}")))?;
        Ok(result.rows_affected > 0)
    }

    pub async fn list_file_comments_impl(&self, file_id: i64) -> Result<Vec<Comment>> {
        let result = comments::Entity::find()
            .filter(comments::Column::FileId.eq(file_id))
            .order_by_asc(comments::Column::Line)
            .all(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询评论失败: {e}")))?;
        Ok(result.into_iter().map(|m| m.into_comment()).collect())
    }

    async fn work_file_ids(&self, work_id: i64) -> Result<Vec<i64>> {
        let result = files::Entity::find()
            .filter(files::Column::WorkId.eq(work_id))
            .all(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询文件失败: {e}")))?;
        Ok(result.into_iter().map(|f| f.id).collect())
    }

    pub async fn list_work_comments_impl(&self, work_id: i64) -> Result<Vec<Comment>> {
        let file_ids = self.work_file_ids(work_id).await?;
        if file_ids.is_empty() {
            return Ok(Vec::new());
        }
        let result = comments::Entity::find()
            .filter(comments::Column::FileId.is_in(file_ids))
            .all(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询评论失败: {e}")))?;
        Ok(result.into_iter().map(|m| m.into_comment()).collect())
    }

    /// 给 linter 评论附上 linter 名称
    async fn with_linter_names(
        &self,
        found: Vec<linter_comments::Model>,
    ) -> Result<Vec<(String, LinterComment)>> {
        if found.is_empty() {
            return Ok(Vec::new());
        }

        let instances = linter_instances::Entity::find()
            .filter(linter_instances::Column::Id.is_in(found.iter().map(|c| c.linter_id.clone())))
            .all(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询 linter 实例失败: {e}")))?;
        let linters: HashMap<String, String> = assignment_linters::Entity::find()
            .filter(
                assignment_linters::Column::Id
                    .is_in(instances.iter().map(|i| i.tester_id.clone())),
            )
            .all(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询 linter 失败: {e}")))?
            .into_iter()
            .map(|l| (l.id, l.name))
            .collect();
        let names: HashMap<String, String> = instances
            .into_iter()
            .filter_map(|i| linters.get(&i.tester_id).map(|name| (i.id, name.clone())))
            .collect();

        Ok(found
            .into_iter()
            .filter_map(|c| {
                let name = names.get(&c.linter_id)?.clone();
                Some((name, c.into_linter_comment()))
            })
            .collect())
    }

    pub async fn list_file_linter_comments_impl(
        &self,
        file_id: i64,
    ) -> Result<Vec<(String, LinterComment)>> {
        let found = linter_comments::Entity::find()
            .filter(linter_comments::Column::FileId.eq(file_id))
            .order_by_asc(linter_comments::Column::Line)
            .order_by_asc(linter_comments::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询 linter 评论失败: {e}")))?;
        self.with_linter_names(found).await
    }

    pub async fn list_work_linter_comments_impl(
        &self,
        work_id: i64,
    ) -> Result<Vec<(String, LinterComment)>> {
        let file_ids = self.work_file_ids(work_id).await?;
        if file_ids.is_empty() {
            return Ok(Vec::new());
        }
        let found = linter_comments::Entity::find()
            .filter(linter_comments::Column::FileId.is_in(file_ids))
            .order_by_asc(linter_comments::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询 linter 评论失败: {e}")))?;
        self.with_linter_names(found).await
    }
}
