//! linter 实例的后台执行
//!
//! 每个实例在自己的任务里运行：还原提交、运行 linter、把结果归到文件上，
//! 最后一次性写入终态。单个实例出错或 panic 只会把该实例标记为 crashed。

use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::registry::{Emitted, Linter};
use crate::errors::{CGSystemError, Result};
use crate::models::comments::entities::NewLinterComment;
use crate::models::linters::entities::LinterState;
use crate::runtime::Background;
use crate::services::ingest::FileArena;

/// 待运行的实例
#[derive(Debug, Clone)]
pub struct LintJob {
    pub instance_id: String,
    pub work_id: i64,
}

/// 把一次运行的所有实例放到后台
pub fn start_run(bg: Arc<Background>, linter: &'static dyn Linter, config: String, jobs: Vec<LintJob>) {
    info!(
        "Starting {} on {} submission(s) in the background",
        linter.name(),
        jobs.len()
    );
    for job in jobs {
        tokio::spawn(run_instance(bg.clone(), linter, config.clone(), job));
    }
}

/// 实例的终态、崩溃原因和结果
type Outcome = (LinterState, Option<String>, Vec<NewLinterComment>);

async fn run_instance(bg: Arc<Background>, linter: &'static dyn Linter, config: String, job: LintJob) {
    let (state, error, comments) = match bg.linter_slot().await {
        Ok(permit) => {
            info!(
                "Linter instance {} ({}) is running on work {}",
                job.instance_id,
                linter.name(),
                job.work_id
            );
            let outcome = settle(tokio::spawn(lint_work(bg.clone(), linter, config, job.work_id))).await;
            drop(permit);
            outcome
        }
        Err(e) => not_scheduled(&e),
    };

    if let Some(reason) = &error {
        warn!("Linter instance {} crashed: {}", job.instance_id, reason);
    }

    match bg
        .storage
        .finish_linter_instance(&job.instance_id, state, error, comments)
        .await
    {
        Ok(true) => info!(
            "Linter instance {} finished with state {}",
            job.instance_id,
            state.as_str()
        ),
        Ok(false) => info!(
            "Linter instance {} was deleted while running, discarding results",
            job.instance_id
        ),
        Err(e) => warn!("Failed to store result of linter instance {}: {}", job.instance_id, e),
    }
}

/// 拿不到运行名额的实例直接结束为 crashed，不会停在 running
fn not_scheduled(e: &CGSystemError) -> Outcome {
    (
        LinterState::Crashed,
        Some(format!("The linter could not be scheduled: {}", e.message())),
        Vec::new(),
    )
}

/// 等待单个实例结束，出错或 panic 都归为 crashed
async fn settle(handle: JoinHandle<Result<Vec<NewLinterComment>>>) -> Outcome {
    match handle.await {
        Ok(Ok(comments)) => (LinterState::Done, None, comments),
        Ok(Err(e)) => (LinterState::Crashed, Some(e.message().to_string()), Vec::new()),
        Err(e) => (LinterState::Crashed, Some(format!("The linter crashed: {e}")), Vec::new()),
    }
}

async fn lint_work(
    bg: Arc<Background>,
    linter: &'static dyn Linter,
    config: String,
    work_id: i64,
) -> Result<Vec<NewLinterComment>> {
    let arena = FileArena::new(bg.storage.list_work_files(work_id).await?)?;
    let tmpdir = tempfile::tempdir()?;

    let upload_dir = bg.upload_dir.clone();
    let target = tmpdir.path().to_path_buf();
    let arena = tokio::task::spawn_blocking(move || {
        arena.restore(&upload_dir, &target)?;
        Ok::<_, CGSystemError>(arena)
    })
    .await
    .map_err(|e| CGSystemError::file_operation(format!("还原提交失败: {e}")))??;

    let emitted = linter.run(tmpdir.path(), &config, bg.linter_timeout()).await?;
    Ok(attribute(&arena, tmpdir.path(), emitted))
}

/// 把输出中的路径去掉临时目录前缀后解析到文件，行号转为从 0 开始
pub fn attribute(arena: &FileArena, tmpdir: &Path, emitted: Vec<Emitted>) -> Vec<NewLinterComment> {
    let prefix = tmpdir.to_string_lossy();
    emitted
        .into_iter()
        .filter_map(|e| {
            let relative = e
                .path
                .strip_prefix(prefix.as_ref())
                .unwrap_or(&e.path)
                .trim_start_matches('/');
            let node = arena.resolve_path(relative).filter(|n| !n.is_directory)?;
            Some(NewLinterComment {
                file_id: node.id,
                line: (e.line - 1).max(0),
                code: e.code,
                comment: e.msg,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ingest::tree::tests::sample;
    use std::path::PathBuf;

    fn emitted(path: &str, line: i32) -> Emitted {
        Emitted {
            path: path.into(),
            line,
            code: "W191".into(),
            msg: "indentation contains tabs".into(),
        }
    }

    #[test]
    fn test_attribute_strips_tmpdir() {
        let arena = sample();
        let tmp = PathBuf::from("/tmp/lint-abc");
        let comments = attribute(
            &arena,
            &tmp,
            vec![
                emitted("/tmp/lint-abc/topdir/b.py", 1),
                emitted("/tmp/lint-abc/topdir/sub/c.txt", 12),
                emitted("/tmp/lint-abc/topdir/missing.py", 3),
                emitted("/tmp/lint-abc/topdir/sub", 3),
            ],
        );
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].file_id, 2);
        assert_eq!(comments[0].line, 0);
        assert_eq!(comments[1].file_id, 5);
        assert_eq!(comments[1].line, 11);
    }

    #[tokio::test]
    async fn test_failing_instance_does_not_affect_others() {
        let ok = tokio::spawn(async {
            Ok(vec![NewLinterComment {
                file_id: 2,
                line: 0,
                code: "W191".into(),
                comment: "indentation contains tabs".into(),
            }])
        });
        let failed = tokio::spawn(async {
            Err(CGSystemError::external_service("flake8 exited abnormally: bad config"))
        });
        let panicked = tokio::spawn(async {
            if true {
                panic!("runner blew up");
            }
            Ok(Vec::new())
        });

        let (ok, failed, panicked) = tokio::join!(settle(ok), settle(failed), settle(panicked));
        assert_eq!(ok.0, LinterState::Done);
        assert_eq!(ok.2.len(), 1);
        assert_eq!(failed.0, LinterState::Crashed);
        assert_eq!(failed.1.as_deref(), Some("flake8 exited abnormally: bad config"));
        assert!(failed.2.is_empty());
        assert_eq!(panicked.0, LinterState::Crashed);
        assert!(panicked.1.unwrap().starts_with("The linter crashed"));
    }

    #[tokio::test]
    async fn test_closed_queue_marks_instance_crashed() {
        let slots = Arc::new(tokio::sync::Semaphore::new(1));
        slots.close();
        let err = slots
            .acquire_owned()
            .await
            .map_err(|e| CGSystemError::unknown_error(format!("linter 队列已关闭: {e}")))
            .unwrap_err();

        let (state, reason, comments) = not_scheduled(&err);
        assert_eq!(state, LinterState::Crashed);
        assert!(reason.unwrap().contains("could not be scheduled"));
        assert!(comments.is_empty());
    }

    #[test]
    fn test_attribute_accepts_relative_paths() {
        let arena = sample();
        let comments = attribute(&arena, Path::new("/elsewhere"), vec![emitted("topdir/A.py", 5)]);
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].file_id, 3);
        assert_eq!(comments[0].line, 4);
    }
}
