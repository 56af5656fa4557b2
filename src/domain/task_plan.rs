//! Task plan: the set of tasks produced by the planner for one user message.

use uuid::Uuid;

use crate::domain::task::{Task, TaskStatus};
use crate::domain::DomainError;

/// Non-empty ordered set of tasks, tied to the user message that prompted it.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskPlan {
    id: Uuid,
    message_id: Uuid,
    tasks: Vec<Task>,
}

impl TaskPlan {
    pub fn new(message_id: Uuid, tasks: Vec<Task>) -> Result<Self, DomainError> {
        if tasks.is_empty() {
            return Err(DomainError::EmptyTaskList);
        }
        Ok(Self {
            id: Uuid::new_v4(),
            message_id,
            tasks,
        })
    }

    pub fn reconstruct(id: Uuid, message_id: Uuid, tasks: Vec<Task>) -> Result<Self, DomainError> {
        if tasks.is_empty() {
            return Err(DomainError::EmptyTaskList);
        }
        Ok(Self {
            id,
            message_id,
            tasks,
        })
    }

    #[inline]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[inline]
    pub fn message_id(&self) -> Uuid {
        self.message_id
    }

    #[inline]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Split into parts for fan-out; the supervisor moves each task into its
    /// agent and reassembles with `reconstruct` under the same plan id.
    pub fn into_parts(self) -> (Uuid, Uuid, Vec<Task>) {
        (self.id, self.message_id, self.tasks)
    }

    /// Render completed task results for final synthesis. Tasks keep their
    /// positional numbering; non-completed tasks are omitted and the header
    /// reports completed/total. Fails if nothing completed.
    pub fn format_task_results(&self) -> Result<String, DomainError> {
        let mut parts = Vec::new();
        for (i, task) in self.tasks.iter().enumerate() {
            if task.status() != TaskStatus::Completed {
                continue;
            }
            parts.push(format!(
                "## Task {}: {}\n\n### Agent\n{}\n\n### Result\n{}",
                i + 1,
                task.description(),
                task.agent(),
                task.result().unwrap_or_default(),
            ));
        }

        if parts.is_empty() {
            return Err(DomainError::AllTasksFailed);
        }

        Ok(format!(
            "# Task result summary\n\nCompleted tasks: {}/{}\n\n---\n\n{}",
            parts.len(),
            self.tasks.len(),
            parts.join("\n\n---\n\n"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(description: &str, result: &str) -> Task {
        let mut task = Task::general_answer(description).unwrap();
        task.complete(result).unwrap();
        task
    }

    #[test]
    fn empty_task_list_rejected() {
        assert_eq!(
            TaskPlan::new(Uuid::new_v4(), vec![]).unwrap_err(),
            DomainError::EmptyTaskList
        );
    }

    #[test]
    fn format_includes_all_completed_tasks() {
        let plan = TaskPlan::new(
            Uuid::new_v4(),
            vec![completed("first", "alpha"), completed("second", "beta")],
        )
        .unwrap();

        let text = plan.format_task_results().unwrap();
        assert!(text.contains("Completed tasks: 2/2"));
        assert!(text.contains("## Task 1: first"));
        assert!(text.contains("alpha"));
        assert!(text.contains("## Task 2: second"));
        assert!(text.contains("beta"));
    }

    #[test]
    fn format_keeps_positional_numbering_when_skipping() {
        let mut failed = Task::web_search("broken").unwrap();
        failed.fail("no results");

        let plan = TaskPlan::new(
            Uuid::new_v4(),
            vec![failed, completed("working", "gamma")],
        )
        .unwrap();

        let text = plan.format_task_results().unwrap();
        assert!(text.contains("Completed tasks: 1/2"));
        assert!(!text.contains("## Task 1:"));
        assert!(text.contains("## Task 2: working"));
        assert!(!text.contains("no results"));
    }

    #[test]
    fn format_fails_when_nothing_completed() {
        let mut a = Task::web_search("a").unwrap();
        a.fail("x");
        let b = Task::general_answer("b").unwrap(); // still in progress

        let plan = TaskPlan::new(Uuid::new_v4(), vec![a, b]).unwrap();
        assert_eq!(
            plan.format_task_results().unwrap_err(),
            DomainError::AllTasksFailed
        );
    }

    #[test]
    fn into_parts_then_reconstruct_preserves_identity() {
        let plan = TaskPlan::new(Uuid::new_v4(), vec![completed("t", "r")]).unwrap();
        let expected = plan.clone();
        let (id, message_id, tasks) = plan.into_parts();
        let back = TaskPlan::reconstruct(id, message_id, tasks).unwrap();
        assert_eq!(back, expected);
    }
}
