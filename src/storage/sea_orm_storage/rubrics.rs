//! 评分标准与提交的条目选择

use super::SeaOrmStorage;
use crate::entity::{rubric_items, rubric_rows, work_rubric_items, works};
use crate::errors::{CGSystemError, Result};
use crate::models::rubrics::entities::{RubricItem, RubricPlan, RubricRow};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use std::collections::{BTreeSet, HashMap};

impl SeaOrmStorage {
    async fn load_rubric<C: ConnectionTrait>(conn: &C, assignment_id: i64) -> Result<Vec<RubricRow>> {
        let rows = rubric_rows::Entity::find()
            .filter(rubric_rows::Column::AssignmentId.eq(assignment_id))
            .order_by_asc(rubric_rows::Column::Position)
            .order_by_asc(rubric_rows::Column::Id)
            .all(conn)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询评分标准失败: {e}")))?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut items: HashMap<i64, Vec<RubricItem>> = HashMap::new();
        for item in rubric_items::Entity::find()
            .filter(rubric_items::Column::RubricRowId.is_in(rows.iter().map(|r| r.id)))
            .order_by_asc(rubric_items::Column::Position)
            .order_by_asc(rubric_items::Column::Id)
            .all(conn)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询评分条目失败: {e}")))?
        {
            items
                .entry(item.rubric_row_id)
                .or_default()
                .push(item.into_rubric_item());
        }

        Ok(rows
            .into_iter()
            .map(|row| RubricRow {
                items: items.remove(&row.id).unwrap_or_default(),
                id: row.id,
                assignment_id: row.assignment_id,
                header: row.header,
                description: row.description,
            })
            .collect())
    }

    /// 清除手动成绩
    async fn clear_manual_grades<C: ConnectionTrait>(conn: &C, work_ids: Vec<i64>) -> Result<()> {
        if work_ids.is_empty() {
            return Ok(());
        }
        works::Entity::update_many()
            .col_expr(works::Column::Grade, Expr::value(Option::<f64>::None))
            .filter(works::Column::Id.is_in(work_ids))
            .exec(conn)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("清除成绩失败: {e}")))?;
        Ok(())
    }

    pub async fn get_rubric_impl(&self, assignment_id: i64) -> Result<Vec<RubricRow>> {
        Self::load_rubric(&self.db, assignment_id).await
    }

    /// 按计划更新、新建、删除行与条目
    pub async fn apply_rubric_plan_impl(
        &self,
        assignment_id: i64,
        plan: RubricPlan,
        clear_selections: bool,
    ) -> Result<Vec<RubricRow>> {
        let txn = self.db.begin().await?;

        if clear_selections && (!plan.delete_items.is_empty() || !plan.delete_rows.is_empty()) {
            let affected = work_rubric_items::Entity::find()
                .filter(
                    sea_orm::Condition::any()
                        .add(work_rubric_items::Column::RubricItemId.is_in(plan.delete_items.clone()))
                        .add(work_rubric_items::Column::RubricRowId.is_in(plan.delete_rows.clone())),
                )
                .all(&txn)
                .await?;
            let work_ids: BTreeSet<i64> = affected.iter().map(|s| s.work_id).collect();

            work_rubric_items::Entity::delete_many()
                .filter(
                    sea_orm::Condition::any()
                        .add(work_rubric_items::Column::RubricItemId.is_in(plan.delete_items.clone()))
                        .add(work_rubric_items::Column::RubricRowId.is_in(plan.delete_rows.clone())),
                )
                .exec(&txn)
                .await?;
            Self::clear_manual_grades(&txn, work_ids.into_iter().collect()).await?;
        }

        if !plan.delete_items.is_empty() {
            rubric_items::Entity::delete_many()
                .filter(rubric_items::Column::Id.is_in(plan.delete_items.clone()))
                .exec(&txn)
                .await?;
        }
        if !plan.delete_rows.is_empty() {
            rubric_items::Entity::delete_many()
                .filter(rubric_items::Column::RubricRowId.is_in(plan.delete_rows.clone()))
                .exec(&txn)
                .await?;
            rubric_rows::Entity::delete_many()
                .filter(rubric_rows::Column::Id.is_in(plan.delete_rows.clone()))
                .exec(&txn)
                .await?;
        }

        for (row_pos, row) in plan.rows.into_iter().enumerate() {
            let row_id = match row.id {
                Some(id) => {
                    rubric_rows::ActiveModel {
                        id: Set(id),
                        assignment_id: Set(assignment_id),
                        header: Set(row.header),
                        description: Set(row.description),
                        position: Set(row_pos as i32),
                    }
                    .update(&txn)
                    .await?;
                    id
                }
                None => {
                    rubric_rows::ActiveModel {
                        assignment_id: Set(assignment_id),
                        header: Set(row.header),
                        description: Set(row.description),
                        position: Set(row_pos as i32),
                        ..Default::default()
                    }
                    .insert(&txn)
                    .await?
                    .id
                }
            };

            for (item_pos, item) in row.items.into_iter().enumerate() {
                let model = rubric_items::ActiveModel {
                    rubric_row_id: Set(row_id),
                    header: Set(item.header),
                    description: Set(item.description),
                    points: Set(item.points),
                    position: Set(item_pos as i32),
                    ..Default::default()
                };
                match item.id {
                    Some(id) => {
                        rubric_items::ActiveModel { id: Set(id), ..model }
                            .update(&txn)
                            .await?;
                    }
                    None => {
                        model.insert(&txn).await?;
                    }
                }
            }
        }

        let rubric = Self::load_rubric(&txn, assignment_id).await?;
        txn.commit().await?;
        Ok(rubric)
    }

    /// 条目及其所属作业
    pub async fn get_rubric_item_impl(&self, item_id: i64) -> Result<Option<(RubricItem, i64)>> {
        let found = rubric_items::Entity::find_by_id(item_id)
            .find_also_related(rubric_rows::Entity)
            .one(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询评分条目失败: {e}")))?;

        Ok(found.and_then(|(item, row)| row.map(|row| (item.into_rubric_item(), row.assignment_id))))
    }

    pub async fn works_selecting_items_impl(&self, item_ids: &[i64]) -> Result<Vec<i64>> {
        if item_ids.is_empty() {
            return Ok(Vec::new());
        }
        let found = work_rubric_items::Entity::find()
            .filter(work_rubric_items::Column::RubricItemId.is_in(item_ids.iter().copied()))
            .all(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询评分选择失败: {e}")))?;
        let ids: BTreeSet<i64> = found.into_iter().map(|s| s.work_id).collect();
        Ok(ids.into_iter().collect())
    }

    pub async fn get_selection_impl(&self, work_id: i64) -> Result<Vec<RubricItem>> {
        let selected: Vec<i64> = work_rubric_items::Entity::find()
            .filter(work_rubric_items::Column::WorkId.eq(work_id))
            .all(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询评分选择失败: {e}")))?
            .into_iter()
            .map(|s| s.rubric_item_id)
            .collect();
        if selected.is_empty() {
            return Ok(Vec::new());
        }

        let items = rubric_items::Entity::find()
            .filter(rubric_items::Column::Id.is_in(selected))
            .order_by_asc(rubric_items::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询评分条目失败: {e}")))?;
        Ok(items.into_iter().map(|m| m.into_rubric_item()).collect())
    }

    fn selection_model(work_id: i64, item: &RubricItem) -> work_rubric_items::ActiveModel {
        work_rubric_items::ActiveModel {
            work_id: Set(work_id),
            rubric_item_id: Set(item.id),
            rubric_row_id: Set(item.row_id),
        }
    }

    pub async fn replace_selection_impl(&self, work_id: i64, items: &[RubricItem]) -> Result<()> {
        let txn = self.db.begin().await?;
        work_rubric_items::Entity::delete_many()
            .filter(work_rubric_items::Column::WorkId.eq(work_id))
            .exec(&txn)
            .await?;
        for item in items {
            Self::selection_model(work_id, item).insert(&txn).await?;
        }
        Self::clear_manual_grades(&txn, vec![work_id]).await?;
        txn.commit().await?;
        Ok(())
    }

    /// 选中条目，同一行已有的选择被替换
    pub async fn select_rubric_item_impl(&self, work_id: i64, item: &RubricItem) -> Result<()> {
        let txn = self.db.begin().await?;
        work_rubric_items::Entity::delete_many()
            .filter(work_rubric_items::Column::WorkId.eq(work_id))
            .filter(work_rubric_items::Column::RubricRowId.eq(item.row_id))
            .exec(&txn)
            .await?;
        Self::selection_model(work_id, item).insert(&txn).await?;
        Self::clear_manual_grades(&txn, vec![work_id]).await?;
        txn.commit().await?;
        Ok(())
    }

    pub async fn unselect_rubric_item_impl(&self, work_id: i64, item_id: i64) -> Result<bool> {
        let txn = self.db.begin().await?;
        let result = work_rubric_items::Entity::delete_many()
            .filter(work_rubric_items::Column::WorkId.eq(work_id))
            .filter(work_rubric_items::Column::RubricItemId.eq(item_id))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(false);
        }
        Self::clear_manual_grades(&txn, vec![work_id]).await?;
        txn.commit().await?;
        Ok(true)
    }
}
