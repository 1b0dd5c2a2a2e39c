//! linter 实例实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "linter_instances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub work_id: i64,
    pub tester_id: String,
    pub state: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub error: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::assignment_linters::Entity",
        from = "Column::TesterId",
        to = "super::assignment_linters::Column::Id",
        on_delete = "Cascade"
    )]
    Tester,
}

impl Related<super::assignment_linters::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tester.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_linter_instance(self) -> crate::models::linters::entities::LinterInstance {
        use crate::models::linters::entities::{LinterInstance, LinterState};

        LinterInstance {
            id: self.id,
            work_id: self.work_id,
            tester_id: self.tester_id,
            state: self
                .state
                .parse::<LinterState>()
                .unwrap_or(LinterState::Crashed),
            error: self.error,
        }
    }
}
