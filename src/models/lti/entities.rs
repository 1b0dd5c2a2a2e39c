use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 去掉 oauth_* 字段后的 LTI 启动参数
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchParams(pub BTreeMap<String, String>);

impl LaunchParams {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn user_id(&self) -> Option<&str> {
        self.get("user_id")
    }

    pub fn user_email(&self) -> Option<&str> {
        self.get("lis_person_contact_email_primary")
    }

    pub fn full_name(&self) -> Option<&str> {
        self.get("lis_person_name_full")
    }

    pub fn username(&self) -> Option<&str> {
        self.get("custom_canvas_user_login_id")
    }

    pub fn course_id(&self) -> Option<&str> {
        self.get("custom_canvas_course_id")
    }

    pub fn course_name(&self) -> Option<&str> {
        self.get("custom_canvas_course_name")
    }

    pub fn assignment_id(&self) -> Option<&str> {
        self.get("custom_canvas_assignment_id")
    }

    pub fn assignment_name(&self) -> Option<&str> {
        self.get("custom_canvas_assignment_title")
    }

    pub fn assignment_published(&self) -> bool {
        self.get("custom_canvas_assignment_published") == Some("true")
    }

    pub fn assignment_due(&self) -> Option<&str> {
        self.get("custom_canvas_assignment_due_at")
    }

    pub fn outcome_service_url(&self) -> Option<&str> {
        self.get("lis_outcome_service_url")
    }

    pub fn result_sourcedid(&self) -> Option<&str> {
        self.get("lis_result_sourcedid")
    }

    pub fn roles(&self) -> Vec<&str> {
        self.get("roles")
            .map(|roles| roles.split(',').map(str::trim).collect())
            .unwrap_or_default()
    }

    pub fn consumer_key(&self) -> Option<&str> {
        self.get("lti_consumer_key")
    }
}
