//! linter 评论实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "linter_comments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub file_id: i64,
    pub line: i32,
    pub linter_id: String,
    pub linter_code: String,
    #[sea_orm(column_type = "Text")]
    pub comment: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_linter_comment(self) -> crate::models::comments::entities::LinterComment {
        crate::models::comments::entities::LinterComment {
            file_id: self.file_id,
            line: self.line,
            linter_id: self.linter_id,
            code: self.linter_code,
            comment: self.comment,
        }
    }
}
