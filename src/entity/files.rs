//! 文件树节点实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "files")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub work_id: i64,
    pub parent_id: Option<i64>,
    pub name: String,
    pub extension: Option<String>,
    pub filename: Option<String>,
    pub is_directory: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::works::Entity",
        from = "Column::WorkId",
        to = "super::works::Column::Id",
        on_delete = "Cascade"
    )]
    Work,
}

impl Related<super::works::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Work.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_file_node(self) -> crate::models::files::entities::FileNode {
        crate::models::files::entities::FileNode {
            id: self.id,
            work_id: self.work_id,
            parent_id: self.parent_id,
            name: self.name,
            extension: self.extension,
            filename: self.filename,
            is_directory: self.is_directory,
        }
    }
}
