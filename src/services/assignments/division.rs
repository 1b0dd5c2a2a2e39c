//! 把最新提交按权重分给评分员
//!
//! 已分配给仍在名单中的评分员的提交保持不动；只有超出目标份额超过半份的评分员
//! 会让出提交，空出的提交交给离目标最远的评分员。

use rand::seq::SliceRandom;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::info;

use crate::errors::Result;
use crate::models::assignments::entities::{Assignment, GraderWeight};
use crate::models::submissions::entities::Work;
use crate::runtime::Background;
use crate::services::mail::messages;
use crate::storage::DivisionWrite;

/// 一次分配的结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DivisionPlan {
    pub write: DivisionWrite,
    /// 工作量增加的评分员
    pub loaded: Vec<i64>,
}

fn counts(works: &[Work], weights: &[GraderWeight]) -> BTreeMap<i64, usize> {
    let mut counts: BTreeMap<i64, usize> = weights.iter().map(|w| (w.user_id, 0)).collect();
    for work in works {
        if let Some(count) = work.assigned_to.and_then(|id| counts.get_mut(&id)) {
            *count += 1;
        }
    }
    counts
}

/// 离目标份额最远的评分员
fn most_behind(weights: &[GraderWeight], counts: &BTreeMap<i64, usize>, total: usize) -> Option<i64> {
    let weight_sum: f64 = weights.iter().map(|w| w.weight).sum();
    if weight_sum <= 0.0 {
        return None;
    }
    weights
        .iter()
        .filter(|w| w.weight > 0.0)
        .map(|w| {
            let target = w.weight / weight_sum * total as f64;
            let behind = target - counts.get(&w.user_id).copied().unwrap_or(0) as f64;
            (w.user_id, behind)
        })
        .fold(None, |best: Option<(i64, f64)>, (id, behind)| match best {
            Some((_, b)) if b >= behind => best,
            _ => Some((id, behind)),
        })
        .map(|(id, _)| id)
}

/// 重新分配，`works` 应已打乱
pub fn plan_division(works: &[Work], weights: &[GraderWeight], done: &HashSet<i64>) -> DivisionPlan {
    let weights: Vec<GraderWeight> = weights.iter().filter(|w| w.weight > 0.0).cloned().collect();
    if weights.is_empty() {
        return DivisionPlan {
            write: DivisionWrite {
                weights: Vec::new(),
                assignments: works
                    .iter()
                    .filter(|w| w.assigned_to.is_some())
                    .map(|w| (w.id, None))
                    .collect(),
                reset_done: Vec::new(),
            },
            loaded: Vec::new(),
        };
    }

    let before = counts(works, &weights);
    let mut current = before.clone();
    let weight_sum: f64 = weights.iter().map(|w| w.weight).sum();
    let total = works.len();

    let mut kept: Vec<(i64, Option<i64>)> = works.iter().map(|w| (w.id, w.assigned_to)).collect();
    let mut pool: Vec<usize> = kept
        .iter()
        .enumerate()
        .filter(|(_, (_, grader))| grader.is_none_or(|g| !current.contains_key(&g)))
        .map(|(idx, _)| idx)
        .collect();

    for grader in &weights {
        let target = grader.weight / weight_sum * total as f64;
        for (idx, (_, assigned)) in kept.iter().enumerate() {
            let count = current[&grader.user_id];
            if count as f64 - target <= 0.5 {
                break;
            }
            if *assigned == Some(grader.user_id) {
                pool.push(idx);
                if let Some(c) = current.get_mut(&grader.user_id) {
                    *c -= 1;
                }
            }
        }
    }
    for &idx in &pool {
        kept[idx].1 = None;
    }

    for idx in pool {
        let Some(grader) = most_behind(&weights, &current, total) else {
            break;
        };
        kept[idx].1 = Some(grader);
        if let Some(c) = current.get_mut(&grader) {
            *c += 1;
        }
    }

    let assignments = works
        .iter()
        .zip(kept)
        .filter(|(work, (_, grader))| work.assigned_to != *grader)
        .map(|(_, change)| change)
        .collect();
    let loaded: Vec<i64> = current
        .iter()
        .filter(|(id, count)| before.get(id).is_some_and(|b| *count > b))
        .map(|(id, _)| *id)
        .collect();
    let reset_done = loaded.iter().copied().filter(|id| done.contains(id)).collect();

    DivisionPlan {
        write: DivisionWrite {
            weights,
            assignments,
            reset_done,
        },
        loaded,
    }
}

/// 新提交的评分员：沿用该用户上一份提交的评分员，否则取离目标最远的评分员
pub fn pick_grader(previous: Option<&Work>, works: &[Work], weights: &[GraderWeight]) -> Option<i64> {
    let weights: Vec<GraderWeight> = weights.iter().filter(|w| w.weight > 0.0).cloned().collect();
    if let Some(grader) = previous.and_then(|w| w.assigned_to)
        && weights.iter().any(|w| w.user_id == grader)
    {
        return Some(grader);
    }
    most_behind(&weights, &counts(works, &weights), works.len() + 1)
}

/// 加锁后按给定权重重新分配，并通知被重置完成状态的评分员
pub async fn redivide(bg: &Arc<Background>, assignment: &Assignment, weights: Vec<GraderWeight>) -> Result<()> {
    let _guard = bg.lock_division(assignment.id).await;

    let mut works = bg.storage.latest_works(assignment.id).await?;
    works.shuffle(&mut rand::rng());
    let done: HashSet<i64> = bg.storage.list_done_graders(assignment.id).await?.into_iter().collect();

    let plan = plan_division(&works, &weights, &done);
    let reset = plan.write.reset_done.clone();
    info!(
        "Dividing {} submission(s) of assignment {} over {} grader(s), {} moved",
        works.len(),
        assignment.id,
        plan.write.weights.len(),
        plan.write.assignments.len()
    );
    bg.storage.apply_division(assignment.id, plan.write).await?;

    notify_reset(bg, assignment, reset);
    Ok(())
}

/// 给被重置为未完成的评分员发状态邮件
pub fn notify_reset(bg: &Arc<Background>, assignment: &Assignment, graders: Vec<i64>) {
    if graders.is_empty() {
        return;
    }
    let task = bg.clone();
    let assignment = assignment.clone();
    bg.spawn("grader status mail", async move {
        let users = task.storage.get_users_by_ids(&graders).await?;
        let mails = users
            .iter()
            .filter(|u| !u.email.is_empty())
            .map(|u| messages::grader_status(&assignment, u, &task.external_url))
            .collect();
        task.mailer.send_batch(mails).await;
        Ok(())
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn work(id: i64, assigned_to: Option<i64>) -> Work {
        Work {
            id,
            assignment_id: 1,
            user_id: 100 + id,
            created_at: Utc::now(),
            assigned_to,
            grade: None,
            comment: None,
            edit: 0,
        }
    }

    fn weight(user_id: i64, weight: f64) -> GraderWeight {
        GraderWeight { user_id, weight }
    }

    fn apply(works: &[Work], plan: &DivisionPlan) -> Vec<Work> {
        works
            .iter()
            .map(|w| {
                let mut w = w.clone();
                if let Some((_, g)) = plan.write.assignments.iter().find(|(id, _)| *id == w.id) {
                    w.assigned_to = *g;
                }
                w
            })
            .collect()
    }

    fn load(works: &[Work], grader: i64) -> usize {
        works.iter().filter(|w| w.assigned_to == Some(grader)).count()
    }

    #[test]
    fn test_single_grader_gets_everything() {
        let works: Vec<Work> = (1..=5).map(|id| work(id, None)).collect();
        let plan = plan_division(&works, &[weight(1, 1.0)], &HashSet::new());
        assert_eq!(load(&apply(&works, &plan), 1), 5);
        assert_eq!(plan.loaded, vec![1]);
    }

    #[test]
    fn test_weights_are_respected() {
        let works: Vec<Work> = (1..=9).map(|id| work(id, None)).collect();
        let plan = plan_division(&works, &[weight(1, 2.0), weight(2, 1.0)], &HashSet::new());
        let after = apply(&works, &plan);
        assert_eq!(load(&after, 1), 6);
        assert_eq!(load(&after, 2), 3);
    }

    #[test]
    fn test_balanced_division_is_stable() {
        let works = vec![work(1, Some(1)), work(2, Some(2)), work(3, Some(1)), work(4, Some(2))];
        let done: HashSet<i64> = [1, 2].into_iter().collect();
        let plan = plan_division(&works, &[weight(1, 1.0), weight(2, 1.0)], &done);
        assert!(plan.write.assignments.is_empty());
        assert!(plan.write.reset_done.is_empty());
    }

    #[test]
    fn test_removed_grader_work_moves_and_resets_done() {
        let works = vec![work(1, Some(1)), work(2, Some(3)), work(3, Some(2))];
        let done: HashSet<i64> = [1, 2].into_iter().collect();
        let plan = plan_division(&works, &[weight(1, 1.0), weight(2, 1.0)], &done);
        assert_eq!(plan.write.assignments.len(), 1);
        assert_eq!(plan.write.assignments[0].0, 2);
        // 只有拿到新提交的评分员被重置
        assert_eq!(plan.write.reset_done.len(), 1);
        assert_eq!(plan.loaded, plan.write.reset_done);
    }

    #[test]
    fn test_empty_weights_clear_assignments() {
        let works = vec![work(1, Some(1)), work(2, None)];
        let plan = plan_division(&works, &[], &HashSet::new());
        assert!(plan.write.weights.is_empty());
        assert_eq!(plan.write.assignments, vec![(1, None)]);
    }

    #[test]
    fn test_pick_grader_keeps_continuity() {
        let works = vec![work(1, Some(2)), work(2, Some(2)), work(3, None)];
        let weights = [weight(1, 1.0), weight(2, 1.0)];
        assert_eq!(pick_grader(Some(&works[0]), &works, &weights), Some(2));
        assert_eq!(pick_grader(Some(&works[2]), &works, &weights), Some(1));
        assert_eq!(pick_grader(None, &works, &[]), None);
    }
}
