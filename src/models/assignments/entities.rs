use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// 作业状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "assignment.ts")]
pub enum AssignmentState {
    Hidden,
    Open,
    Done,
}

impl AssignmentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentState::Hidden => "hidden",
            AssignmentState::Open => "open",
            AssignmentState::Done => "done",
        }
    }
}

impl std::fmt::Display for AssignmentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AssignmentState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hidden" => Ok(AssignmentState::Hidden),
            "open" => Ok(AssignmentState::Open),
            "done" => Ok(AssignmentState::Done),
            _ => Err(format!("Invalid assignment state: {s}")),
        }
    }
}

// 提醒邮件类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "assignment.ts")]
pub enum ReminderType {
    #[serde(rename = "none")]
    None,
    #[serde(rename = "assigned-only")]
    AssignedOnly,
    #[serde(rename = "all-graders")]
    AllGraders,
}

impl ReminderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderType::None => "none",
            ReminderType::AssignedOnly => "assigned-only",
            ReminderType::AllGraders => "all-graders",
        }
    }
}

impl std::str::FromStr for ReminderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(ReminderType::None),
            "assigned-only" => Ok(ReminderType::AssignedOnly),
            "all-graders" => Ok(ReminderType::AllGraders),
            _ => Err(format!("Invalid reminder type: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: i64,
    pub name: String,
    pub course_id: i64,
    pub state: AssignmentState,
    pub deadline: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub lti_assignment_id: Option<String>,
    pub lti_outcome_service_url: Option<String>,
    pub cgignore: Option<String>,
    pub reminder_type: ReminderType,
    pub reminder_time: Option<DateTime<Utc>>,
    pub reminder_task_id: Option<String>,
    pub done_email: Option<String>,
}

impl Assignment {
    pub fn is_done(&self) -> bool {
        self.state == AssignmentState::Done
    }

    pub fn is_lti(&self) -> bool {
        self.lti_outcome_service_url.is_some()
    }

    /// 当前时间下是否需要 `can_upload_after_deadline`
    pub fn deadline_expired(&self, now: DateTime<Utc>) -> bool {
        self.state != AssignmentState::Open || now > self.deadline
    }
}

/// 新建作业所需字段
#[derive(Debug, Clone)]
pub struct NewAssignment {
    pub name: String,
    pub course_id: i64,
    pub state: AssignmentState,
    pub deadline: DateTime<Utc>,
    pub lti_assignment_id: Option<String>,
    pub lti_outcome_service_url: Option<String>,
}

/// 作业更新，None 表示不修改
#[derive(Debug, Clone, Default)]
pub struct AssignmentUpdate {
    pub name: Option<String>,
    pub state: Option<AssignmentState>,
    pub deadline: Option<DateTime<Utc>>,
    pub cgignore: Option<Option<String>>,
    pub lti_outcome_service_url: Option<Option<String>>,
    pub reminder: Option<ReminderUpdate>,
}

#[derive(Debug, Clone)]
pub struct ReminderUpdate {
    pub reminder_type: ReminderType,
    pub reminder_time: Option<DateTime<Utc>>,
    pub task_id: Option<String>,
    pub done_email: Option<String>,
}

/// 评分员及其分配权重
#[derive(Debug, Clone, PartialEq)]
pub struct GraderWeight {
    pub user_id: i64,
    pub weight: f64,
}
