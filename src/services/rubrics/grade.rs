//! 成绩计算
//!
//! 手动成绩优先；没有手动成绩时按选中的评分标准条目计算
//! `10 * selected / max`，并限制在 [0, 10]。

use std::sync::Arc;

use crate::errors::Result;
use crate::models::assignments::entities::Assignment;
use crate::models::rubrics::entities::{RubricItem, RubricRow};
use crate::models::submissions::entities::{NewGradeHistory, Work, WorkUpdate};
use crate::runtime::Background;
use crate::services::lookup;
use crate::services::lti::spawn_work_passback;
use crate::storage::Storage;

/// 每行取最高分之和
pub fn max_points(rows: &[RubricRow]) -> f64 {
    rows.iter()
        .filter_map(|row| {
            row.items
                .iter()
                .map(|item| item.points)
                .fold(None, |max: Option<f64>, p| Some(max.map_or(p, |m| m.max(p))))
        })
        .sum()
}

pub fn selected_points(selected: &[RubricItem]) -> f64 {
    selected.iter().map(|item| item.points).sum()
}

pub fn rubric_grade(rows: &[RubricRow], selected: &[RubricItem]) -> Option<f64> {
    if selected.is_empty() {
        return None;
    }
    let max = max_points(rows);
    if max <= 0.0 {
        return None;
    }
    Some((10.0 * selected_points(selected) / max).clamp(0.0, 10.0))
}

/// 对外可见的成绩
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EffectiveGrade {
    pub grade: Option<f64>,
    /// 手动成绩覆盖了评分标准计算值
    pub overridden: bool,
}

pub fn effective_grade(manual: Option<f64>, rubric: Option<f64>) -> EffectiveGrade {
    EffectiveGrade {
        grade: manual.or(rubric),
        overridden: manual.is_some() && rubric.is_some(),
    }
}

pub async fn work_grade(storage: &Arc<dyn Storage>, work: &Work) -> Result<EffectiveGrade> {
    let selected = storage.get_selection(work.id).await?;
    let rubric = if selected.is_empty() {
        None
    } else {
        rubric_grade(&storage.get_rubric(work.assignment_id).await?, &selected)
    };
    Ok(effective_grade(work.grade, rubric))
}

/// 成绩变化后写一条历史记录，并在需要时回传 LMS
///
/// 评分标准选择变化时清除手动成绩。
pub async fn record_grade_change(
    bg: &Arc<Background>,
    assignment: &Assignment,
    work_id: i64,
    changed_by: i64,
    rubric_modified: bool,
) -> Result<EffectiveGrade> {
    let mut work = lookup::work(&bg.storage, work_id).await?;
    if rubric_modified && work.grade.is_some() {
        work = bg
            .storage
            .update_work(
                work_id,
                WorkUpdate {
                    grade: Some(None),
                    ..Default::default()
                },
            )
            .await?;
    }
    let grade = work_grade(&bg.storage, &work).await?;
    bg.storage
        .add_grade_history(NewGradeHistory {
            work_id,
            user_id: Some(changed_by),
            grade: grade.grade,
            passed_back: false,
            rubric_modified,
        })
        .await?;
    spawn_work_passback(bg.clone(), assignment.clone(), work);
    Ok(grade)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn item(id: i64, row_id: i64, points: f64) -> RubricItem {
        RubricItem {
            id,
            row_id,
            header: format!("item {id}"),
            description: String::new(),
            points,
        }
    }

    pub(crate) fn row(id: i64, items: Vec<RubricItem>) -> RubricRow {
        RubricRow {
            id,
            assignment_id: 1,
            header: format!("row {id}"),
            description: String::new(),
            items,
        }
    }

    fn rubric() -> Vec<RubricRow> {
        vec![
            row(1, vec![item(1, 1, 5.0), item(2, 1, 10.0)]),
            row(2, vec![item(3, 2, 1.0), item(4, 2, 2.0)]),
        ]
    }

    #[test]
    fn test_max_points() {
        assert_eq!(max_points(&rubric()), 12.0);
        assert_eq!(max_points(&[row(9, vec![])]), 0.0);
    }

    #[test]
    fn test_rubric_grade() {
        let grade = rubric_grade(&rubric(), &[item(1, 1, 5.0), item(4, 2, 2.0)]).unwrap();
        assert!((grade - 10.0 * 7.0 / 12.0).abs() < 1e-9);
        assert_eq!(rubric_grade(&rubric(), &[]), None);
        assert_eq!(rubric_grade(&[], &[item(1, 1, 5.0)]), None);
    }

    #[test]
    fn test_rubric_grade_clamped() {
        let rows = vec![row(1, vec![item(1, 1, 2.0), item(2, 1, -4.0)])];
        assert_eq!(rubric_grade(&rows, &[item(2, 1, -4.0)]), Some(0.0));
    }

    #[test]
    fn test_manual_grade_wins() {
        let grade = effective_grade(Some(3.0), Some(8.0));
        assert_eq!(grade.grade, Some(3.0));
        assert!(grade.overridden);

        let grade = effective_grade(None, Some(8.0));
        assert_eq!(grade.grade, Some(8.0));
        assert!(!grade.overridden);

        assert_eq!(effective_grade(None, None).grade, None);
    }
}
