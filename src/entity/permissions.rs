//! 权限目录实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "permissions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub name: String,
    pub default_value: bool,
    pub course_permission: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_permission(self) -> crate::models::permissions::entities::Permission {
        crate::models::permissions::entities::Permission {
            id: self.id,
            name: self.name,
            default_value: self.default_value,
            course_permission: self.course_permission,
        }
    }
}
