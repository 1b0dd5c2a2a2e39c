//! 评分提醒调度
//!
//! 每个提醒是一个延时执行的 tokio 任务，以 UUID 为任务 id 登记。
//! 作业记录保存待执行任务的 id，重新设置或取消提醒时按 id 终止旧任务。
//! 新任务 id 先写入作业记录再启动任务，写入失败时旧任务保持不变。
//! 服务启动时按作业记录重新登记尚未执行的提醒。

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use super::{Mailer, messages};
use crate::errors::Result;
use crate::models::assignments::entities::{
    Assignment, AssignmentUpdate, ReminderType, ReminderUpdate,
};
use crate::models::permissions::entities::Perm;
use crate::models::users::entities::User;
use crate::runtime::Background;
use crate::services::permissions::users_with_course_perm;
use crate::storage::Storage;

#[derive(Default)]
pub struct ReminderScheduler {
    tasks: DashMap<String, JoinHandle<()>>,
}

impl ReminderScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_task_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// 延时执行任务，返回任务 id；任务本身也会拿到这个 id
    pub fn schedule<F, Fut>(&self, delay: Duration, job: F) -> String
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.schedule_as(Self::new_task_id(), delay, job)
    }

    /// 以事先生成的 id 登记任务
    pub fn schedule_as<F, Fut>(&self, task_id: String, delay: Duration, job: F) -> String
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.tasks.retain(|_, handle| !handle.is_finished());

        let job = job(task_id.clone());
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            job.await;
        });
        info!("Scheduled reminder task {} to run in {:?}", task_id, delay);
        self.tasks.insert(task_id.clone(), handle);
        task_id
    }

    /// 取消任务，任务不存在时返回 false
    pub fn cancel(&self, task_id: &str) -> bool {
        match self.tasks.remove(task_id) {
            Some((_, handle)) => {
                handle.abort();
                info!("Cancelled reminder task {}", task_id);
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, task_id: &str) -> bool {
        self.tasks
            .get(task_id)
            .is_some_and(|handle| !handle.is_finished())
    }
}

/// 距提醒时间的延时，已过期的立即执行
pub fn reminder_delay(time: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (time - now).to_std().unwrap_or_default()
}

/// 以 `task_id` 登记作业的提醒任务，调用前 id 应已写入作业记录
pub fn start_reminder(bg: &Background, assignment_id: i64, task_id: String, time: DateTime<Utc>) {
    let (storage, mailer) = (bg.storage.clone(), bg.mailer.clone());
    let external_url = bg.external_url.clone();
    bg.reminders.schedule_as(
        task_id,
        reminder_delay(time, Utc::now()),
        move |task_id| async move {
            match send_reminders(storage, mailer, assignment_id, task_id, external_url).await {
                Ok(sent) => info!("Sent {} reminder mail(s) for assignment {}", sent, assignment_id),
                Err(e) => warn!("Reminder for assignment {} failed: {}", assignment_id, e),
            }
        },
    );
}

/// 启动时需要重新登记的提醒及其时间
pub fn reminders_to_restore(assignments: &[Assignment]) -> Vec<(&Assignment, DateTime<Utc>)> {
    assignments
        .iter()
        .filter(|a| a.reminder_type != ReminderType::None && a.reminder_task_id.is_some())
        .filter_map(|a| a.reminder_time.map(|time| (a, time)))
        .collect()
}

/// 重新登记上次运行时尚未执行的提醒，过期的立即发送，返回登记数量
pub async fn restore_reminders(bg: &Background) -> Result<usize> {
    let pending = bg.storage.list_pending_reminders().await?;
    let mut restored = 0;
    for (assignment, time) in reminders_to_restore(&pending) {
        let assignment_id = assignment.id;
        let task_id = ReminderScheduler::new_task_id();
        let update = AssignmentUpdate {
            reminder: Some(ReminderUpdate {
                reminder_type: assignment.reminder_type,
                reminder_time: Some(time),
                task_id: Some(task_id.clone()),
                done_email: assignment.done_email.clone(),
            }),
            ..Default::default()
        };
        if let Err(e) = bg.storage.update_assignment(assignment_id, update).await {
            warn!("Could not restore reminder of assignment {}: {}", assignment_id, e);
            continue;
        }
        start_reminder(bg, assignment_id, task_id, time);
        restored += 1;
    }
    info!("Restored {} pending reminder(s)", restored);
    Ok(restored)
}

/// 按提醒类型筛选收件人，已完成的评分员不会收到提醒
pub fn reminder_recipients(
    kind: ReminderType,
    graders: Vec<User>,
    assigned: &HashSet<i64>,
    done: &HashSet<i64>,
) -> Vec<User> {
    graders
        .into_iter()
        .filter(|user| !done.contains(&user.id))
        .filter(|user| match kind {
            ReminderType::None => false,
            ReminderType::AssignedOnly => assigned.contains(&user.id),
            ReminderType::AllGraders => true,
        })
        .collect()
}

/// 提醒任务本体
pub async fn send_reminders(
    storage: Arc<dyn Storage>,
    mailer: Arc<dyn Mailer>,
    assignment_id: i64,
    task_id: String,
    external_url: String,
) -> Result<usize> {
    let Some(assignment) = storage.get_assignment(assignment_id).await? else {
        return Ok(0);
    };
    if assignment.reminder_task_id.as_deref() != Some(task_id.as_str()) {
        info!(
            "Reminder task {} is stale for assignment {}, skipping",
            task_id, assignment_id
        );
        return Ok(0);
    }

    let graders = users_with_course_perm(&storage, assignment.course_id, Perm::CanGradeWork).await?;
    let assigned: HashSet<i64> = storage
        .latest_works(assignment_id)
        .await?
        .into_iter()
        .filter_map(|w| w.assigned_to)
        .collect();
    let done: HashSet<i64> = storage
        .list_done_graders(assignment_id)
        .await?
        .into_iter()
        .collect();

    let mails: Vec<_> = reminder_recipients(assignment.reminder_type, graders, &assigned, &done)
        .iter()
        .filter(|user| !user.email.is_empty())
        .map(|user| messages::grade_reminder(&assignment, user, &external_url))
        .collect();
    let total = mails.len();
    let sent = mailer.send_batch(mails).await;
    if sent < total {
        warn!(
            "Only {} of {} reminder mails for assignment {} were sent",
            sent, total, assignment_id
        );
    }

    storage
        .update_assignment(
            assignment_id,
            AssignmentUpdate {
                reminder: Some(ReminderUpdate {
                    reminder_type: assignment.reminder_type,
                    reminder_time: assignment.reminder_time,
                    task_id: None,
                    done_email: assignment.done_email.clone(),
                }),
                ..Default::default()
            },
        )
        .await?;
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn user(id: i64) -> User {
        User {
            id,
            name: format!("user{id}"),
            username: format!("user{id}"),
            email: format!("user{id}@example.com"),
            password_hash: None,
            active: true,
            lti_user_id: None,
            role_id: None,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_recipients_per_kind() {
        let graders = || vec![user(1), user(2), user(3)];
        let assigned: HashSet<i64> = [1, 2].into_iter().collect();
        let done: HashSet<i64> = [2].into_iter().collect();

        let ids = |users: Vec<User>| users.into_iter().map(|u| u.id).collect::<Vec<_>>();
        assert_eq!(
            ids(reminder_recipients(ReminderType::AssignedOnly, graders(), &assigned, &done)),
            vec![1]
        );
        assert_eq!(
            ids(reminder_recipients(ReminderType::AllGraders, graders(), &assigned, &done)),
            vec![1, 3]
        );
        assert!(reminder_recipients(ReminderType::None, graders(), &assigned, &done).is_empty());
    }

    fn assignment(id: i64, kind: ReminderType, time: Option<DateTime<Utc>>, task: Option<&str>) -> Assignment {
        Assignment {
            id,
            name: format!("assignment{id}"),
            course_id: 1,
            state: crate::models::assignments::entities::AssignmentState::Open,
            deadline: Utc::now(),
            created_at: Utc::now(),
            lti_assignment_id: None,
            lti_outcome_service_url: None,
            cgignore: None,
            reminder_type: kind,
            reminder_time: time,
            reminder_task_id: task.map(str::to_string),
            done_email: None,
        }
    }

    #[test]
    fn test_reminders_to_restore() {
        let now = Utc::now();
        let past = now - chrono::Duration::hours(2);
        let future = now + chrono::Duration::hours(2);
        let assignments = vec![
            assignment(1, ReminderType::AllGraders, Some(future), Some("t1")),
            assignment(2, ReminderType::AssignedOnly, Some(past), Some("t2")),
            // 已执行过的提醒不再登记
            assignment(3, ReminderType::AllGraders, Some(past), None),
            assignment(4, ReminderType::None, Some(future), Some("t4")),
            assignment(5, ReminderType::AllGraders, None, Some("t5")),
        ];
        let restored: Vec<_> = reminders_to_restore(&assignments)
            .into_iter()
            .map(|(a, time)| (a.id, time))
            .collect();
        assert_eq!(restored, vec![(1, future), (2, past)]);

        assert_eq!(reminder_delay(past, now), Duration::ZERO);
        assert_eq!(reminder_delay(future, now), Duration::from_secs(2 * 3600));
    }

    #[tokio::test]
    async fn test_schedule_with_known_id() {
        let scheduler = ReminderScheduler::new();
        let seen = Arc::new(std::sync::Mutex::new(String::new()));
        let record = seen.clone();

        let task_id = ReminderScheduler::new_task_id();
        let returned = scheduler.schedule_as(task_id.clone(), Duration::ZERO, move |id| async move {
            *record.lock().unwrap() = id;
        });
        assert_eq!(returned, task_id);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(*seen.lock().unwrap(), task_id);
    }

    #[tokio::test]
    async fn test_cancelled_task_does_not_run() {
        let scheduler = ReminderScheduler::new();
        let fired = Arc::new(AtomicBool::new(false));

        let flag = fired.clone();
        let task_id = scheduler.schedule(Duration::from_millis(50), |_| async move {
            flag.store(true, Ordering::SeqCst);
        });
        assert!(scheduler.is_pending(&task_id));
        assert!(scheduler.cancel(&task_id));
        assert!(!scheduler.cancel(&task_id));

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_scheduled_task_runs() {
        let scheduler = ReminderScheduler::new();
        let fired = Arc::new(AtomicBool::new(false));

        let flag = fired.clone();
        let seen = Arc::new(std::sync::Mutex::new(String::new()));
        let record = seen.clone();
        let task_id = scheduler.schedule(Duration::from_millis(10), move |id| async move {
            *record.lock().unwrap() = id;
            flag.store(true, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(fired.load(Ordering::SeqCst));
        assert!(!scheduler.is_pending(&task_id));
        assert_eq!(*seen.lock().unwrap(), task_id);
    }
}
