//! LTI 1.1 Basic Outcomes 成绩回传

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::oauth::{HmacSha1Signer, body_authorization};
use crate::errors::{CGSystemError, Result};
use crate::models::assignments::entities::Assignment;
use crate::models::submissions::entities::Work;
use crate::runtime::Background;
use crate::services::rubrics::grade::work_grade;

const OUTCOME_NS: &str = "http://www.imsglobal.org/services/ltiv1p1/xsd/imsoms_v1p0";

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// 成绩为 None 时删除 LMS 中的成绩，否则以 grade/10 替换
pub fn outcome_xml(message_id: &str, sourcedid: &str, grade: Option<f64>) -> String {
    let (operation, result) = match grade {
        Some(grade) => (
            "replaceResultRequest",
            format!(
                "<result><resultScore><language>en</language><textString>{}</textString></resultScore></result>",
                grade / 10.0
            ),
        ),
        None => ("deleteResultRequest", String::new()),
    };

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <imsx_POXEnvelopeRequest xmlns=\"{OUTCOME_NS}\">\
         <imsx_POXHeader><imsx_POXRequestHeaderInfo>\
         <imsx_version>V1.0</imsx_version>\
         <imsx_messageIdentifier>{}</imsx_messageIdentifier>\
         </imsx_POXRequestHeaderInfo></imsx_POXHeader>\
         <imsx_POXBody><{operation}><resultRecord>\
         <sourcedGUID><sourcedId>{}</sourcedId></sourcedGUID>{result}\
         </resultRecord></{operation}></imsx_POXBody>\
         </imsx_POXEnvelopeRequest>",
        escape_xml(message_id),
        escape_xml(sourcedid),
    )
}

/// 只有作业已完成时才回传成绩
pub fn should_passback(assignment: &Assignment) -> bool {
    assignment.is_done() && assignment.is_lti()
}

async fn consumer_secret(bg: &Background, assignment: &Assignment) -> Result<Option<(String, String)>> {
    let Some(course) = bg.storage.get_course(assignment.course_id).await? else {
        return Ok(None);
    };
    let Some(provider_id) = course.lti_provider_id else {
        return Ok(None);
    };
    let Some(key) = bg.storage.get_lti_provider_key(provider_id).await? else {
        return Ok(None);
    };
    match bg.lti_secrets.get(&key) {
        Some(secret) => Ok(Some((key, secret.clone()))),
        None => {
            warn!("No secret configured for LTI consumer key {}", key);
            Ok(None)
        }
    }
}

/// 回传一次提交的当前成绩
pub async fn passback_work(bg: &Background, assignment: &Assignment, work: &Work) -> Result<()> {
    let Some(service_url) = assignment.lti_outcome_service_url.as_deref() else {
        return Ok(());
    };
    let Some(sourcedid) = bg
        .storage
        .get_assignment_result(work.user_id, assignment.id)
        .await?
    else {
        info!(
            "No sourcedid for user {} on assignment {}, skipping passback",
            work.user_id, assignment.id
        );
        return Ok(());
    };
    let Some((key, secret)) = consumer_secret(bg, assignment).await? else {
        return Ok(());
    };

    let grade = work_grade(&bg.storage, work).await?.grade;
    let body = outcome_xml(&Uuid::new_v4().to_string(), &sourcedid, grade);
    let authorization = body_authorization(
        &HmacSha1Signer,
        &key,
        &secret,
        service_url,
        &body,
        &Uuid::new_v4().simple().to_string(),
        chrono::Utc::now().timestamp(),
    )?;

    let response = bg
        .http
        .post(service_url)
        .header("Authorization", authorization)
        .header("Content-Type", "application/xml")
        .body(body)
        .send()
        .await
        .map_err(|e| CGSystemError::external_service(format!("成绩回传请求失败: {e}")))?;
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| CGSystemError::external_service(format!("读取回传响应失败: {e}")))?;

    if !status.is_success() || !text.contains("<imsx_codeMajor>success</imsx_codeMajor>") {
        return Err(CGSystemError::external_service(format!(
            "LMS rejected passback for work {} ({status})",
            work.id
        )));
    }

    bg.storage.mark_grade_passed_back(work.id).await?;
    info!("Passed back grade {:?} for work {}", grade, work.id);
    Ok(())
}

/// 成绩变更后在后台回传
pub fn spawn_work_passback(bg: Arc<Background>, assignment: Assignment, work: Work) {
    if !should_passback(&assignment) {
        return;
    }
    let task = bg.clone();
    bg.spawn("grade passback", async move {
        passback_work(&task, &assignment, &work).await
    });
}

/// 作业变为完成时回传所有最新提交
pub fn spawn_assignment_passback(bg: Arc<Background>, assignment: Assignment) {
    if !should_passback(&assignment) {
        return;
    }
    let task = bg.clone();
    bg.spawn("assignment passback", async move {
        let works = task.storage.latest_works(assignment.id).await?;
        for work in &works {
            if let Err(e) = passback_work(&task, &assignment, work).await {
                warn!("Passback of work {} failed: {}", work.id, e);
            }
        }
        Ok(())
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::assignments::entities::{AssignmentState, ReminderType};
    use chrono::Utc;

    #[test]
    fn test_replace_xml() {
        let xml = outcome_xml("msg-1", "src<1>", Some(7.5));
        assert!(xml.contains("<replaceResultRequest>"));
        assert!(xml.contains("<textString>0.75</textString>"));
        assert!(xml.contains("<sourcedId>src&lt;1&gt;</sourcedId>"));
        assert!(xml.contains("<imsx_messageIdentifier>msg-1</imsx_messageIdentifier>"));
    }

    #[test]
    fn test_delete_xml() {
        let xml = outcome_xml("msg-2", "abc", None);
        assert!(xml.contains("<deleteResultRequest>"));
        assert!(!xml.contains("resultScore"));
    }

    #[test]
    fn test_should_passback() {
        let mut assignment = Assignment {
            id: 1,
            name: "a".into(),
            course_id: 1,
            state: AssignmentState::Open,
            deadline: Utc::now(),
            created_at: Utc::now(),
            lti_assignment_id: Some("x".into()),
            lti_outcome_service_url: Some("https://lms/outcomes".into()),
            cgignore: None,
            reminder_type: ReminderType::None,
            reminder_time: None,
            reminder_task_id: None,
            done_email: None,
        };
        assert!(!should_passback(&assignment));
        assignment.state = AssignmentState::Done;
        assert!(should_passback(&assignment));
        assignment.lti_outcome_service_url = None;
        assert!(!should_passback(&assignment));
    }
}
