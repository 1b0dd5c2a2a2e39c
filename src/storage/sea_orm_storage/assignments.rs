use super::SeaOrmStorage;
use crate::entity::{
    assignment_grader_done, assignment_graders, assignment_results, assignments, works,
};
use crate::errors::{CGSystemError, Result};
use crate::models::assignments::entities::{
    Assignment, AssignmentUpdate, GraderWeight, NewAssignment,
};
use crate::storage::DivisionWrite;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};

impl SeaOrmStorage {
    pub async fn create_assignment_impl(&self, req: NewAssignment) -> Result<Assignment> {
        let model = assignments::ActiveModel {
            name: Set(req.name),
            course_id: Set(req.course_id),
            state: Set(req.state.as_str().to_string()),
            deadline: Set(req.deadline.timestamp()),
            created_at: Set(chrono::Utc::now().timestamp()),
            lti_assignment_id: Set(req.lti_assignment_id),
            lti_outcome_service_url: Set(req.lti_outcome_service_url),
            cgignore: Set(None),
            reminder_type: Set("none".to_string()),
            reminder_time: Set(None),
            reminder_task_id: Set(None),
            done_email: Set(None),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("创建作业失败: {e}")))?;
        Ok(result.into_assignment())
    }

    pub async fn get_assignment_impl(&self, id: i64) -> Result<Option<Assignment>> {
        let result = assignments::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询作业失败: {e}")))?;
        Ok(result.map(|m| m.into_assignment()))
    }

    pub async fn list_course_assignments_impl(&self, course_id: i64) -> Result<Vec<Assignment>> {
        let result = assignments::Entity::find()
            .filter(assignments::Column::CourseId.eq(course_id))
            .order_by_asc(assignments::Column::Deadline)
            .order_by_asc(assignments::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询作业列表失败: {e}")))?;
        Ok(result.into_iter().map(|m| m.into_assignment()).collect())
    }

    pub async fn list_pending_reminders_impl(&self) -> Result<Vec<Assignment>> {
        let result = assignments::Entity::find()
            .filter(assignments::Column::ReminderTaskId.is_not_null())
            .filter(assignments::Column::ReminderTime.is_not_null())
            .filter(assignments::Column::ReminderType.ne("none"))
            .order_by_asc(assignments::Column::ReminderTime)
            .all(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询待发送提醒失败: {e}")))?;
        Ok(result.into_iter().map(|m| m.into_assignment()).collect())
    }

    pub async fn get_assignment_by_lti_id_impl(
        &self,
        lti_assignment_id: &str,
    ) -> Result<Option<Assignment>> {
        let result = assignments::Entity::find()
            .filter(assignments::Column::LtiAssignmentId.eq(lti_assignment_id))
            .one(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询作业失败: {e}")))?;
        Ok(result.map(|m| m.into_assignment()))
    }

    pub async fn update_assignment_impl(
        &self,
        id: i64,
        update: AssignmentUpdate,
    ) -> Result<Assignment> {
        let model = assignments::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询作业失败: {e}")))?
            .ok_or_else(|| {
                CGSystemError::object_id_not_found(format!("Assignment with id {id} not found"))
            })?;

        let mut active: assignments::ActiveModel = model.into();
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        if let Some(state) = update.state {
            active.state = Set(state.as_str().to_string());
        }
        if let Some(deadline) = update.deadline {
            active.deadline = Set(deadline.timestamp());
        }
        if let Some(cgignore) = update.cgignore {
            active.cgignore = Set(cgignore);
        }
        if let Some(url) = update.lti_outcome_service_url {
            active.lti_outcome_service_url = Set(url);
        }
        if let Some(reminder) = update.reminder {
            active.reminder_type = Set(reminder.reminder_type.as_str().to_string());
            active.reminder_time = Set(reminder.reminder_time.map(|t| t.timestamp()));
            active.reminder_task_id = Set(reminder.task_id);
            active.done_email = Set(reminder.done_email);
        }

        let result = active
            .update(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("更新作业失败: {e}")))?;
        Ok(result.into_assignment())
    }

    pub async fn set_assignment_result_impl(
        &self,
        user_id: i64,
        assignment_id: i64,
        sourcedid: &str,
    ) -> Result<()> {
        let existing = assignment_results::Entity::find_by_id((user_id, assignment_id))
            .one(&self.db)
            .await?;
        match existing {
            Some(model) if model.sourcedid == sourcedid => return Ok(()),
            Some(model) => {
                let mut active: assignment_results::ActiveModel = model.into();
                active.sourcedid = Set(sourcedid.to_string());
                active.update(&self.db).await
            }
            None => {
                assignment_results::ActiveModel {
                    user_id: Set(user_id),
                    assignment_id: Set(assignment_id),
                    sourcedid: Set(sourcedid.to_string()),
                }
                .insert(&self.db)
                .await
            }
        }
        .map_err(|e| CGSystemError::database_operation(format!("保存回传句柄失败: {e}")))?;
        Ok(())
    }

    pub async fn get_assignment_result_impl(
        &self,
        user_id: i64,
        assignment_id: i64,
    ) -> Result<Option<String>> {
        let result = assignment_results::Entity::find_by_id((user_id, assignment_id))
            .one(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询回传句柄失败: {e}")))?;
        Ok(result.map(|m| m.sourcedid))
    }

    pub async fn list_grader_weights_impl(&self, assignment_id: i64) -> Result<Vec<GraderWeight>> {
        let result = assignment_graders::Entity::find()
            .filter(assignment_graders::Column::AssignmentId.eq(assignment_id))
            .order_by_asc(assignment_graders::Column::UserId)
            .all(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询评分员失败: {e}")))?;
        Ok(result
            .into_iter()
            .map(|m| GraderWeight {
                user_id: m.user_id,
                weight: m.weight,
            })
            .collect())
    }

    pub async fn list_done_graders_impl(&self, assignment_id: i64) -> Result<Vec<i64>> {
        let result = assignment_grader_done::Entity::find()
            .filter(assignment_grader_done::Column::AssignmentId.eq(assignment_id))
            .all(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询评分完成状态失败: {e}")))?;
        Ok(result.into_iter().map(|m| m.user_id).collect())
    }

    pub async fn set_grader_done_impl(
        &self,
        assignment_id: i64,
        user_id: i64,
        done: bool,
    ) -> Result<()> {
        assignment_grader_done::Entity::delete_by_id((assignment_id, user_id))
            .exec(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("更新评分完成状态失败: {e}")))?;
        if done {
            assignment_grader_done::ActiveModel {
                assignment_id: Set(assignment_id),
                user_id: Set(user_id),
            }
            .insert(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("更新评分完成状态失败: {e}")))?;
        }
        Ok(())
    }

    /// 写入分配结果：替换权重、更新提交评分员、清除完成标记
    pub async fn apply_division_impl(&self, assignment_id: i64, write: DivisionWrite) -> Result<()> {
        let txn = self.db.begin().await?;

        // 锁定作业行，保证同一作业的分配串行执行
        assignments::Entity::update_many()
            .col_expr(assignments::Column::Id, Expr::col(assignments::Column::Id).into())
            .filter(assignments::Column::Id.eq(assignment_id))
            .exec(&txn)
            .await?;

        assignment_graders::Entity::delete_many()
            .filter(assignment_graders::Column::AssignmentId.eq(assignment_id))
            .exec(&txn)
            .await?;
        for grader in &write.weights {
            assignment_graders::ActiveModel {
                assignment_id: Set(assignment_id),
                user_id: Set(grader.user_id),
                weight: Set(grader.weight),
            }
            .insert(&txn)
            .await?;
        }

        for (work_id, grader) in &write.assignments {
            works::Entity::update_many()
                .col_expr(works::Column::AssignedTo, Expr::value(*grader))
                .filter(works::Column::Id.eq(*work_id))
                .exec(&txn)
                .await?;
        }

        if !write.reset_done.is_empty() {
            assignment_grader_done::Entity::delete_many()
                .filter(assignment_grader_done::Column::AssignmentId.eq(assignment_id))
                .filter(assignment_grader_done::Column::UserId.is_in(write.reset_done.clone()))
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(())
    }
}
