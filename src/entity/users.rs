//! 用户实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    #[sea_orm(unique)]
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub active: bool,
    #[sea_orm(unique)]
    pub lti_user_id: Option<String>,
    pub role_id: Option<i64>,
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::roles::Entity",
        from = "Column::RoleId",
        to = "super::roles::Column::Id",
        on_delete = "SetNull"
    )]
    Role,
    #[sea_orm(has_many = "super::users_courses::Entity")]
    UsersCourses,
    #[sea_orm(has_many = "super::works::Entity")]
    Works,
}

impl Related<super::roles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Role.def()
    }
}

impl Related<super::users_courses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UsersCourses.def()
    }
}

impl Related<super::works::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Works.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// 从数据库模型转换为业务模型
impl Model {
    pub fn into_user(self) -> crate::models::users::entities::User {
        use crate::models::users::entities::User;
        use chrono::{DateTime, Utc};

        User {
            id: self.id,
            name: self.name,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            active: self.active,
            lti_user_id: self.lti_user_id,
            role_id: self.role_id,
            created_at: DateTime::<Utc>::from_timestamp(self.created_at, 0).unwrap_or_default(),
        }
    }
}
