use crate::models::assignments::responses::AssignmentResponse;
use serde::Serialize;

// GET /lti/launch/2
#[derive(Debug, Serialize)]
pub struct LaunchResponse {
    pub assignment: AssignmentResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_role_created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_email: Option<String>,
}
