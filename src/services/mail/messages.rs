//! 邮件正文

use super::MailMessage;
use crate::models::assignments::entities::Assignment;
use crate::models::users::entities::User;

fn assignment_url(external_url: &str, assignment: &Assignment) -> String {
    format!(
        "{}/courses/{}/assignments/{}/submissions",
        external_url.trim_end_matches('/'),
        assignment.course_id,
        assignment.id
    )
}

/// 评分提醒
pub fn grade_reminder(assignment: &Assignment, grader: &User, external_url: &str) -> MailMessage {
    MailMessage {
        to_name: grader.name.clone(),
        to_email: grader.email.clone(),
        subject: format!("Grade reminder for {} on {}", assignment.name, external_url),
        body: format!(
            "Dear {},\n\n\
             This email is a reminder that you have work left to grade on the assignment \"{}\" \
             on {}. If you have finished grading you can mark yourself as done on {}.\n\n\
             You received this mail because you are a grader of this assignment.",
            grader.name,
            assignment.name,
            external_url,
            assignment_url(external_url, assignment),
        ),
    }
}

/// 评分员被重置为未完成
pub fn grader_status(assignment: &Assignment, grader: &User, external_url: &str) -> MailMessage {
    MailMessage {
        to_name: grader.name.clone(),
        to_email: grader.email.clone(),
        subject: format!(
            "Grading status reset for {} on {}",
            assignment.name, external_url
        ),
        body: format!(
            "Dear {},\n\n\
             New work was assigned to you on the assignment \"{}\", so you are no longer \
             marked as done. The submissions can be found on {}.",
            grader.name,
            assignment.name,
            assignment_url(external_url, assignment),
        ),
    }
}

/// 所有评分员都已完成
pub fn grading_done(assignment: &Assignment, address: &str, external_url: &str) -> MailMessage {
    MailMessage {
        to_name: String::new(),
        to_email: address.to_string(),
        subject: format!("Grading has finished for {} on {}", assignment.name, external_url),
        body: format!(
            "All graders are finished with grading the assignment \"{}\". \
             The submissions can be found on {}.",
            assignment.name,
            assignment_url(external_url, assignment),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::assignments::entities::{AssignmentState, ReminderType};
    use chrono::Utc;

    fn assignment() -> Assignment {
        Assignment {
            id: 3,
            name: "Hello World".into(),
            course_id: 2,
            state: AssignmentState::Open,
            deadline: Utc::now(),
            created_at: Utc::now(),
            lti_assignment_id: None,
            lti_outcome_service_url: None,
            cgignore: None,
            reminder_type: ReminderType::AllGraders,
            reminder_time: None,
            reminder_task_id: None,
            done_email: None,
        }
    }

    fn grader() -> User {
        User {
            id: 1,
            name: "Thomas".into(),
            username: "thomas".into(),
            email: "thomas@example.com".into(),
            password_hash: None,
            active: true,
            lti_user_id: None,
            role_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_reminder_subject() {
        let mail = grade_reminder(&assignment(), &grader(), "https://cg.example.com");
        assert_eq!(
            mail.subject,
            "Grade reminder for Hello World on https://cg.example.com"
        );
        assert_eq!(mail.to_email, "thomas@example.com");
        assert!(
            mail.body
                .contains("https://cg.example.com/courses/2/assignments/3/submissions")
        );
    }

    #[test]
    fn test_done_mail_recipient() {
        let mail = grading_done(&assignment(), "teacher@example.com", "http://x/");
        assert_eq!(mail.to_email, "teacher@example.com");
        assert!(mail.body.contains("http://x/courses/2/assignments/3"));
    }
}
