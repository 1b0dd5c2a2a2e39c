//! 成绩变更历史

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "grade_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub work_id: i64,
    pub user_id: Option<i64>,
    pub grade: Option<f64>,
    pub passed_back: bool,
    pub rubric_modified: bool,
    pub changed_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_grade_history(self) -> crate::models::submissions::entities::GradeHistoryEntry {
        use chrono::{DateTime, Utc};

        crate::models::submissions::entities::GradeHistoryEntry {
            id: self.id,
            work_id: self.work_id,
            user_id: self.user_id,
            grade: self.grade,
            passed_back: self.passed_back,
            rubric_modified: self.rubric_modified,
            changed_at: DateTime::<Utc>::from_timestamp(self.changed_at, 0).unwrap_or_default(),
        }
    }
}
