use serde::{Deserialize, Serialize};
use ts_rs::TS;

// linter 实例状态，只能从 running 转为 done 或 crashed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "linter.ts")]
pub enum LinterState {
    Running,
    Done,
    Crashed,
}

impl LinterState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinterState::Running => "running",
            LinterState::Done => "done",
            LinterState::Crashed => "crashed",
        }
    }
}

impl std::str::FromStr for LinterState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(LinterState::Running),
            "done" => Ok(LinterState::Done),
            "crashed" => Ok(LinterState::Crashed),
            _ => Err(format!("Invalid linter state: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentLinter {
    pub id: String,
    pub assignment_id: i64,
    pub name: String,
    pub config: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinterInstance {
    pub id: String,
    pub work_id: i64,
    pub tester_id: String,
    pub state: LinterState,
    pub error: Option<String>,
}

/// 实例状态计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, TS)]
#[ts(export, export_to = "linter.ts")]
pub struct LinterCounts {
    pub done: u64,
    pub working: u64,
    pub crashed: u64,
}

impl LinterCounts {
    pub fn from_states<I: IntoIterator<Item = LinterState>>(states: I) -> Self {
        let mut counts = Self::default();
        for state in states {
            match state {
                LinterState::Running => counts.working += 1,
                LinterState::Done => counts.done += 1,
                LinterState::Crashed => counts.crashed += 1,
            }
        }
        counts
    }

    /// 聚合状态：有运行中的为 running，否则有崩溃的为 crashed
    pub fn aggregate(&self) -> LinterState {
        if self.working > 0 {
            LinterState::Running
        } else if self.crashed > 0 {
            LinterState::Crashed
        } else {
            LinterState::Done
        }
    }
}
