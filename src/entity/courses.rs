//! 课程实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "courses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    #[sea_orm(unique)]
    pub lti_course_id: Option<String>,
    pub lti_provider_id: Option<i64>,
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::lti_providers::Entity",
        from = "Column::LtiProviderId",
        to = "super::lti_providers::Column::Id",
        on_delete = "SetNull"
    )]
    LtiProvider,
    #[sea_orm(has_many = "super::course_roles::Entity")]
    CourseRoles,
    #[sea_orm(has_many = "super::assignments::Entity")]
    Assignments,
}

impl Related<super::lti_providers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LtiProvider.def()
    }
}

impl Related<super::course_roles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CourseRoles.def()
    }
}

impl Related<super::assignments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_course(self) -> crate::models::courses::entities::Course {
        use chrono::{DateTime, Utc};

        crate::models::courses::entities::Course {
            id: self.id,
            name: self.name,
            lti_course_id: self.lti_course_id,
            lti_provider_id: self.lti_provider_id,
            created_at: DateTime::<Utc>::from_timestamp(self.created_at, 0).unwrap_or_default(),
        }
    }
}
