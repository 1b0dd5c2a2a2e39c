//! 作业实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "assignments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub course_id: i64,
    pub state: String,
    pub deadline: i64,
    pub created_at: i64,
    pub lti_assignment_id: Option<String>,
    pub lti_outcome_service_url: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub cgignore: Option<String>,
    pub reminder_type: String,
    pub reminder_time: Option<i64>,
    pub reminder_task_id: Option<String>,
    pub done_email: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::courses::Entity",
        from = "Column::CourseId",
        to = "super::courses::Column::Id",
        on_delete = "Cascade"
    )]
    Course,
    #[sea_orm(has_many = "super::works::Entity")]
    Works,
    #[sea_orm(has_many = "super::rubric_rows::Entity")]
    RubricRows,
    #[sea_orm(has_many = "super::assignment_linters::Entity")]
    Linters,
}

impl Related<super::courses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }
}

impl Related<super::works::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Works.def()
    }
}

impl Related<super::rubric_rows::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RubricRows.def()
    }
}

impl Related<super::assignment_linters::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Linters.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_assignment(self) -> crate::models::assignments::entities::Assignment {
        use crate::models::assignments::entities::{Assignment, AssignmentState, ReminderType};
        use chrono::{DateTime, Utc};

        Assignment {
            id: self.id,
            name: self.name,
            course_id: self.course_id,
            state: self
                .state
                .parse::<AssignmentState>()
                .unwrap_or(AssignmentState::Hidden),
            deadline: DateTime::<Utc>::from_timestamp(self.deadline, 0).unwrap_or_default(),
            created_at: DateTime::<Utc>::from_timestamp(self.created_at, 0).unwrap_or_default(),
            lti_assignment_id: self.lti_assignment_id,
            lti_outcome_service_url: self.lti_outcome_service_url,
            cgignore: self.cgignore,
            reminder_type: self
                .reminder_type
                .parse::<ReminderType>()
                .unwrap_or(ReminderType::None),
            reminder_time: self
                .reminder_time
                .map(|ts| DateTime::<Utc>::from_timestamp(ts, 0).unwrap_or_default()),
            reminder_task_id: self.reminder_task_id,
            done_email: self.done_email,
        }
    }
}
