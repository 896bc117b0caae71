use serde::{Deserialize, Serialize};

/// An entry in the external flat task list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalTask {
    pub id: String,
    pub content: String,
    pub completed: bool,
    pub project_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTask {
    pub content: String,
    pub project_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
    pub priority: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_string: Option<String>,
}

/// Tasks as fetched once at the start of a run.
///
/// The groomer's own writes are applied here so later steps of the same run
/// see them; changes made elsewhere wait for the next run.
#[derive(Debug, Clone, Default)]
pub struct TaskSnapshot {
    tasks: Vec<ExternalTask>,
    completed_in_view: bool,
}

impl TaskSnapshot {
    /// Open and completed tasks together.
    pub fn new(tasks: Vec<ExternalTask>) -> Self {
        Self {
            tasks,
            completed_in_view: true,
        }
    }

    /// Open tasks only. A missing match proves nothing here, since the
    /// task may have been finished.
    pub fn without_completed(open: Vec<ExternalTask>) -> Self {
        Self {
            tasks: open,
            completed_in_view: false,
        }
    }

    pub fn completed_in_view(&self) -> bool {
        self.completed_in_view
    }

    pub fn tasks(&self) -> &[ExternalTask] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn insert(&mut self, task: ExternalTask) {
        self.tasks.push(task);
    }

    pub fn mark_completed(&mut self, id: &str) {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
            task.completed = true;
        }
    }

    pub fn remove(&mut self, id: &str) {
        self.tasks.retain(|t| t.id != id);
    }
}
