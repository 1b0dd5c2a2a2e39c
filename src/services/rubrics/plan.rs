//! 评分标准替换计划
//!
//! 带 id 的行与条目原地更新，不带 id 的新建，未提到的删除。

use std::collections::BTreeSet;

use crate::errors::{CGSystemError, Result};
use crate::models::rubrics::entities::{PlannedItem, PlannedRow, RubricPlan, RubricRow};
use crate::models::rubrics::requests::RubricRowInput;

fn unknown(kind: &str, id: i64) -> CGSystemError {
    CGSystemError::invalid_param(format!("The given {kind} does not belong to this rubric"))
        .with_description(format!("There is no {kind} with id {id} in the current rubric"))
}

/// 校验输入并计算写入计划
pub fn plan_rubric(current: &[RubricRow], input: Vec<RubricRowInput>) -> Result<RubricPlan> {
    let empty_rows: Vec<&str> = input
        .iter()
        .filter(|row| row.items.is_empty())
        .map(|row| row.header.as_str())
        .collect();
    if !empty_rows.is_empty() {
        return Err(CGSystemError::invalid_state("Rubric rows need at least one item")
            .with_description(format!(
                "The following rows have no items: {}",
                empty_rows.join(", ")
            )));
    }

    if let Some(item) = input
        .iter()
        .flat_map(|row| row.items.iter())
        .find(|item| item.points < 0.0 || !item.points.is_finite())
    {
        return Err(CGSystemError::invalid_param("Points of a rubric item cannot be negative")
            .with_description(format!(
                "The item \"{}\" has {} points",
                item.header, item.points
            )));
    }

    let mut rows = Vec::with_capacity(input.len());
    let mut seen_rows = BTreeSet::new();
    let mut seen_items = BTreeSet::new();
    for row in input {
        let existing = match row.id {
            Some(id) => {
                let found = current
                    .iter()
                    .find(|r| r.id == id)
                    .ok_or_else(|| unknown("row", id))?;
                if !seen_rows.insert(id) {
                    return Err(CGSystemError::invalid_param("A rubric row was given twice")
                        .with_description(format!("The row {id} occurs more than once")));
                }
                Some(found)
            }
            None => None,
        };

        let mut items = Vec::with_capacity(row.items.len());
        for item in row.items {
            if let Some(id) = item.id {
                let belongs = existing.is_some_and(|r| r.items.iter().any(|i| i.id == id));
                if !belongs || !seen_items.insert(id) {
                    return Err(unknown("item", id));
                }
            }
            items.push(PlannedItem {
                id: item.id,
                header: item.header,
                description: item.description,
                points: item.points,
            });
        }
        rows.push(PlannedRow {
            id: row.id,
            header: row.header,
            description: row.description,
            items,
        });
    }

    let max: f64 = rows
        .iter()
        .map(|row| row.items.iter().map(|i| i.points).fold(f64::MIN, f64::max))
        .sum();
    if max <= 0.0 {
        return Err(CGSystemError::invalid_state("The max amount of points of a rubric must be higher than 0")
            .with_description(format!("The rubric would have {max} points at most")));
    }

    let delete_rows = current
        .iter()
        .filter(|r| !seen_rows.contains(&r.id))
        .map(|r| r.id)
        .collect();
    let delete_items = current
        .iter()
        .filter(|r| seen_rows.contains(&r.id))
        .flat_map(|r| r.items.iter())
        .filter(|i| !seen_items.contains(&i.id))
        .map(|i| i.id)
        .collect();

    Ok(RubricPlan {
        rows,
        delete_rows,
        delete_items,
    })
}

/// 计划会删除的所有条目，包括被删除行里的条目
pub fn removed_items(current: &[RubricRow], plan: &RubricPlan) -> Vec<i64> {
    current
        .iter()
        .flat_map(|row| {
            let whole_row = plan.delete_rows.contains(&row.id);
            row.items
                .iter()
                .filter(move |item| whole_row || plan.delete_items.contains(&item.id))
                .map(|item| item.id)
        })
        .collect()
}

/// 删除整个评分标准的计划
pub fn delete_all(current: &[RubricRow]) -> RubricPlan {
    RubricPlan {
        rows: Vec::new(),
        delete_rows: current.iter().map(|r| r.id).collect(),
        delete_items: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::rubrics::requests::RubricItemInput;
    use crate::services::rubrics::grade::tests::{item, row};

    fn item_input(id: Option<i64>, points: f64) -> RubricItemInput {
        RubricItemInput {
            id,
            header: format!("{points} points"),
            description: String::new(),
            points,
        }
    }

    fn row_input(id: Option<i64>, header: &str, items: Vec<RubricItemInput>) -> RubricRowInput {
        RubricRowInput {
            id,
            header: header.into(),
            description: String::new(),
            items,
        }
    }

    fn current() -> Vec<RubricRow> {
        vec![
            row(1, vec![item(1, 1, 5.0), item(2, 1, 10.0)]),
            row(2, vec![item(3, 2, 1.0), item(4, 2, 2.0)]),
        ]
    }

    #[test]
    fn test_same_content_deletes_nothing() {
        let input = vec![
            row_input(Some(1), "row 1", vec![item_input(Some(1), 5.0), item_input(Some(2), 10.0)]),
            row_input(Some(2), "row 2", vec![item_input(Some(3), 1.0), item_input(Some(4), 2.0)]),
        ];
        let plan = plan_rubric(&current(), input).unwrap();
        assert!(plan.delete_rows.is_empty());
        assert!(plan.delete_items.is_empty());
        assert_eq!(plan.rows.len(), 2);
    }

    #[test]
    fn test_unmentioned_rows_and_items_are_deleted() {
        let input = vec![
            row_input(Some(1), "row 1", vec![item_input(Some(2), 10.0), item_input(None, 3.0)]),
            row_input(None, "new", vec![item_input(None, 1.0)]),
        ];
        let current = current();
        let plan = plan_rubric(&current, input).unwrap();
        assert_eq!(plan.delete_rows, vec![2]);
        assert_eq!(plan.delete_items, vec![1]);

        let mut removed = removed_items(&current, &plan);
        removed.sort();
        assert_eq!(removed, vec![1, 3, 4]);
    }

    #[test]
    fn test_rows_without_items() {
        let input = vec![
            row_input(None, "Style", vec![]),
            row_input(None, "Tests", vec![item_input(None, 1.0)]),
        ];
        let err = plan_rubric(&[], input).unwrap_err();
        assert_eq!(err.api_code(), "INVALID_STATE");
        assert!(err.description().contains("Style"));
    }

    #[test]
    fn test_point_rules() {
        let err = plan_rubric(&[], vec![row_input(None, "a", vec![item_input(None, 0.0)])]).unwrap_err();
        assert_eq!(err.api_code(), "INVALID_STATE");

        let err = plan_rubric(&[], vec![]).unwrap_err();
        assert_eq!(err.api_code(), "INVALID_STATE");

        let err = plan_rubric(
            &[],
            vec![row_input(None, "a", vec![item_input(None, 2.0), item_input(None, -1.0)])],
        )
        .unwrap_err();
        assert_eq!(err.api_code(), "INVALID_PARAM");
    }

    #[test]
    fn test_foreign_ids_rejected() {
        let err = plan_rubric(&current(), vec![row_input(Some(9), "x", vec![item_input(None, 1.0)])])
            .unwrap_err();
        assert_eq!(err.api_code(), "INVALID_PARAM");

        // 条目 3 属于行 2，不能挂到行 1 下
        let err = plan_rubric(
            &current(),
            vec![row_input(Some(1), "x", vec![item_input(Some(3), 1.0)])],
        )
        .unwrap_err();
        assert_eq!(err.api_code(), "INVALID_PARAM");
    }

    #[test]
    fn test_delete_all() {
        let plan = delete_all(&current());
        assert_eq!(plan.delete_rows, vec![1, 2]);
        assert_eq!(removed_items(&current(), &plan).len(), 4);
    }
}
