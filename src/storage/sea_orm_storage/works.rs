//! 提交、文件树与成绩历史

use super::SeaOrmStorage;
use crate::entity::{files, grade_history, works};
use crate::errors::{CGSystemError, Result};
use crate::models::files::entities::{FileNode, FileTree, file_extension};
use crate::models::submissions::entities::{
    GradeHistoryEntry, NewGradeHistory, NewWork, Work, WorkUpdate,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use std::collections::HashSet;

impl SeaOrmStorage {
    /// 先序写入文件树
    async fn insert_tree<C: ConnectionTrait>(conn: &C, work_id: i64, tree: &FileTree) -> Result<()> {
        let mut stack: Vec<(Option<i64>, &FileTree)> = vec![(None, tree)];

        while let Some((parent_id, node)) = stack.pop() {
            let model = match node {
                FileTree::File { name, filename } => files::ActiveModel {
                    work_id: Set(work_id),
                    parent_id: Set(parent_id),
                    name: Set(name.clone()),
                    extension: Set(Some(file_extension(name))),
                    filename: Set(Some(filename.clone())),
                    is_directory: Set(false),
                    ..Default::default()
                },
                FileTree::Directory { name, .. } => files::ActiveModel {
                    work_id: Set(work_id),
                    parent_id: Set(parent_id),
                    name: Set(name.clone()),
                    extension: Set(None),
                    filename: Set(None),
                    is_directory: Set(true),
                    ..Default::default()
                },
            };

            let inserted = model
                .insert(conn)
                .await
                .map_err(|e| CGSystemError::database_operation(format!("写入文件失败: {e}")))?;

            if let FileTree::Directory { entries, .. } = node {
                for entry in entries.iter().rev() {
                    stack.push((Some(inserted.id), entry));
                }
            }
        }
        Ok(())
    }

    /// 创建提交，文件树在同一事务中写入
    pub async fn create_work_impl(&self, req: NewWork, tree: &FileTree) -> Result<Work> {
        let txn = self.db.begin().await?;

        let work = works::ActiveModel {
            assignment_id: Set(req.assignment_id),
            user_id: Set(req.user_id),
            created_at: Set(req.created_at.timestamp()),
            assigned_to: Set(req.assigned_to),
            grade: Set(req.grade),
            comment: Set(req.comment),
            edit: Set(0),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| CGSystemError::database_operation(format!("创建提交失败: {e}")))?;

        Self::insert_tree(&txn, work.id, tree).await?;

        txn.commit().await?;
        Ok(work.into_work())
    }

    pub async fn get_work_impl(&self, id: i64) -> Result<Option<Work>> {
        let result = works::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询提交失败: {e}")))?;
        Ok(result.map(|m| m.into_work()))
    }

    /// 每个用户的最新提交（created_at 最大，id 次之）
    pub async fn latest_works_impl(&self, assignment_id: i64) -> Result<Vec<Work>> {
        let all = self.list_works_impl(assignment_id, None).await?;
        let mut seen = HashSet::new();
        Ok(all
            .into_iter()
            .filter(|work| seen.insert(work.user_id))
            .collect())
    }

    pub async fn latest_work_for_user_impl(
        &self,
        assignment_id: i64,
        user_id: i64,
    ) -> Result<Option<Work>> {
        Ok(self
            .list_works_impl(assignment_id, Some(user_id))
            .await?
            .into_iter()
            .next())
    }

    /// 按时间倒序列出提交
    pub async fn list_works_impl(&self, assignment_id: i64, user_id: Option<i64>) -> Result<Vec<Work>> {
        let mut select = works::Entity::find().filter(works::Column::AssignmentId.eq(assignment_id));
        if let Some(user_id) = user_id {
            select = select.filter(works::Column::UserId.eq(user_id));
        }

        let result = select
            .order_by_desc(works::Column::CreatedAt)
            .order_by_desc(works::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询提交列表失败: {e}")))?;
        Ok(result.into_iter().map(|m| m.into_work()).collect())
    }

    pub async fn update_work_impl(&self, id: i64, update: WorkUpdate) -> Result<Work> {
        let model = works::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询提交失败: {e}")))?
            .ok_or_else(|| {
                CGSystemError::object_id_not_found(format!("Submission with id {id} not found"))
            })?;

        let edit = model.edit;
        let mut active: works::ActiveModel = model.into();
        if let Some(grade) = update.grade {
            active.grade = Set(grade);
            active.edit = Set(edit + 1);
        }
        if let Some(comment) = update.comment {
            active.comment = Set(comment);
        }
        if let Some(assigned_to) = update.assigned_to {
            active.assigned_to = Set(assigned_to);
        }

        let result = active
            .update(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("更新提交失败: {e}")))?;
        Ok(result.into_work())
    }

    /// 删除提交，返回其文件的 blob 名
    pub async fn delete_work_impl(&self, id: i64) -> Result<Vec<String>> {
        let txn = self.db.begin().await?;

        let blobs = files::Entity::find()
            .filter(files::Column::WorkId.eq(id))
            .all(&txn)
            .await?
            .into_iter()
            .filter_map(|f| f.filename)
            .collect();

        // 先删子节点再删父节点，不依赖自引用外键的级联
        files::Entity::delete_many()
            .filter(files::Column::WorkId.eq(id))
            .filter(files::Column::IsDirectory.eq(false))
            .exec(&txn)
            .await?;
        loop {
            let dirs = files::Entity::find()
                .filter(files::Column::WorkId.eq(id))
                .all(&txn)
                .await?;
            if dirs.is_empty() {
                break;
            }
            let parents: HashSet<i64> = dirs.iter().filter_map(|d| d.parent_id).collect();
            let leaves: Vec<i64> = dirs
                .iter()
                .map(|d| d.id)
                .filter(|id| !parents.contains(id))
                .collect();
            files::Entity::delete_many()
                .filter(files::Column::Id.is_in(leaves))
                .exec(&txn)
                .await?;
        }

        works::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        Ok(blobs)
    }

    pub async fn add_grade_history_impl(&self, entry: NewGradeHistory) -> Result<()> {
        grade_history::ActiveModel {
            work_id: Set(entry.work_id),
            user_id: Set(entry.user_id),
            grade: Set(entry.grade),
            passed_back: Set(entry.passed_back),
            rubric_modified: Set(entry.rubric_modified),
            changed_at: Set(chrono::Utc::now().timestamp()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(|e| CGSystemError::database_operation(format!("写入成绩历史失败: {e}")))?;
        Ok(())
    }

    pub async fn list_grade_history_impl(&self, work_id: i64) -> Result<Vec<GradeHistoryEntry>> {
        let result = grade_history::Entity::find()
            .filter(grade_history::Column::WorkId.eq(work_id))
            .order_by_desc(grade_history::Column::ChangedAt)
            .order_by_desc(grade_history::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询成绩历史失败: {e}")))?;
        Ok(result.into_iter().map(|m| m.into_grade_history()).collect())
    }

    /// 标记最近一条成绩历史已回传
    pub async fn mark_grade_passed_back_impl(&self, work_id: i64) -> Result<()> {
        let latest = grade_history::Entity::find()
            .filter(grade_history::Column::WorkId.eq(work_id))
            .order_by_desc(grade_history::Column::ChangedAt)
            .order_by_desc(grade_history::Column::Id)
            .one(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询成绩历史失败: {e}")))?;
        if let Some(entry) = latest {
            let mut active: grade_history::ActiveModel = entry.into();
            active.passed_back = Set(true);
            active
                .update(&self.db)
                .await
                .map_err(|e| CGSystemError::database_operation(format!("更新成绩历史失败: {e}")))?;
        }
        Ok(())
    }

    pub async fn list_work_files_impl(&self, work_id: i64) -> Result<Vec<FileNode>> {
        let result = files::Entity::find()
            .filter(files::Column::WorkId.eq(work_id))
            .order_by_asc(files::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询文件失败: {e}")))?;
        Ok(result.into_iter().map(|m| m.into_file_node()).collect())
    }

    pub async fn get_file_impl(&self, id: i64) -> Result<Option<FileNode>> {
        let result = files::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| CGSystemError::database_operation(format!("查询文件失败: {e}")))?;
        Ok(result.map(|m| m.into_file_node()))
    }
}
