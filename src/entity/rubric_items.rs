//! 评分标准项

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "rubric_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub rubric_row_id: i64,
    pub header: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub points: f64,
    pub position: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::rubric_rows::Entity",
        from = "Column::RubricRowId",
        to = "super::rubric_rows::Column::Id",
        on_delete = "Cascade"
    )]
    Row,
}

impl Related<super::rubric_rows::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Row.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_rubric_item(self) -> crate::models::rubrics::entities::RubricItem {
        crate::models::rubrics::entities::RubricItem {
            id: self.id,
            row_id: self.rubric_row_id,
            header: self.header,
            description: self.description,
            points: self.points,
        }
    }
}
