use tracing::{debug, info, warn};

use super::checklist::{checklist_items, mark_checked, move_item, Partition};
use super::matcher::{correlation_key, match_item, tag};
use super::RunStats;
use crate::error::{best_effort, SyncError};
use crate::model::board::{Card, CheckItem, ChecklistName};
use crate::model::task::{ExternalTask, NewTask, TaskSnapshot};
use crate::providers::{BoardService, TaskService};

/// Attributes given to every task the groomer creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDefaults {
    pub project_id: String,
    pub assignee_id: Option<String>,
    pub priority: u8,
    pub due_string: Option<String>,
}

impl TaskDefaults {
    pub fn new_task(&self, content: String) -> NewTask {
        NewTask {
            content,
            project_id: self.project_id.clone(),
            assignee_id: self.assignee_id.clone(),
            priority: self.priority,
            due_string: self.due_string.clone(),
        }
    }
}

/// How an unchecked item relates to the task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disagreement {
    /// No task matches: one has to be created.
    Missing,
    /// A matching task is done: the item gets checked.
    CompletedExternally,
    /// Open on both sides.
    InSync,
}

fn classify_unchecked(matches: &[ExternalTask]) -> Disagreement {
    if matches.is_empty() {
        Disagreement::Missing
    } else if matches.iter().any(|t| t.completed) {
        Disagreement::CompletedExternally
    } else {
        Disagreement::InSync
    }
}

/// Two-way sync of an "In Progress" card's Tasks checklist with the task
/// list. The task list wins: a checked item only ever closes tasks.
pub struct Reconciler<'a> {
    pub boards: &'a dyn BoardService,
    pub tasks: &'a dyn TaskService,
    pub defaults: &'a TaskDefaults,
    pub strict: bool,
}

impl Reconciler<'_> {
    /// Reconcile one card. Checklist reads are required; individual task and
    /// item writes are best-effort.
    pub async fn reconcile(
        &self,
        card: &mut Card,
        snapshot: &mut TaskSnapshot,
        stats: &mut RunStats,
    ) -> Result<(), SyncError> {
        let tasks = self.refill_from_backlog(card, stats).await?;

        for item in &tasks.checked {
            self.push_completion(card, item, snapshot, stats).await;
        }
        for item in &tasks.unchecked {
            self.sync_unchecked(card, item, snapshot, stats).await;
        }

        self.prune_backlog(card, snapshot, stats).await
    }

    /// Promote the first unchecked Backlog item when Tasks has nothing left to
    /// do, then return the current Tasks partition.
    async fn refill_from_backlog(
        &self,
        card: &mut Card,
        stats: &mut RunStats,
    ) -> Result<Partition, SyncError> {
        let tasks = checklist_items(self.boards, card, ChecklistName::Tasks, stats).await?;
        if !tasks.unchecked.is_empty() {
            return Ok(tasks);
        }

        let backlog = checklist_items(self.boards, card, ChecklistName::Backlog, stats).await?;
        let Some(next) = backlog.unchecked.first() else {
            return Ok(tasks);
        };

        move_item(self.boards, card, next, ChecklistName::Tasks).await?;
        info!(card = %card.id, item = %next.name, "promoted backlog item into Tasks");
        stats.backlog_items_promoted += 1;

        checklist_items(self.boards, card, ChecklistName::Tasks, stats).await
    }

    /// A checked item closes every open task that matches it.
    async fn push_completion(
        &self,
        card: &Card,
        item: &CheckItem,
        snapshot: &mut TaskSnapshot,
        stats: &mut RunStats,
    ) {
        let matches = match_item(snapshot.tasks(), &card.id, item, self.strict);
        for task in matches.iter().filter(|t| !t.completed) {
            let closed = self.tasks.complete_task(&task.id).await;
            if best_effort("complete task", closed).is_some() {
                info!(card = %card.id, item = %item.name, task = %task.id, "closed task for checked item");
                snapshot.mark_completed(&task.id);
                stats.tasks_completed += 1;
            }
        }
    }

    async fn sync_unchecked(
        &self,
        card: &mut Card,
        item: &CheckItem,
        snapshot: &mut TaskSnapshot,
        stats: &mut RunStats,
    ) {
        let matches = match_item(snapshot.tasks(), &card.id, item, self.strict);
        match classify_unchecked(&matches) {
            Disagreement::InSync => {
                debug!(card = %card.id, item = %item.name, "item and task both open");
            }
            Disagreement::CompletedExternally => {
                let checked = mark_checked(self.boards, card, item).await;
                if best_effort("check item", checked).is_some() {
                    info!(card = %card.id, item = %item.name, "checked item completed in task list");
                    stats.items_checked += 1;
                }
            }
            Disagreement::Missing if !snapshot.completed_in_view() => {
                debug!(card = %card.id, item = %item.name, "no open task, completed tasks not fetched");
            }
            Disagreement::Missing => {
                let content = tag(
                    &format!("[{}]({})", item.name, card.url),
                    &correlation_key(&card.id, &item.id),
                );
                let created = self.tasks.create_task(&self.defaults.new_task(content)).await;
                if let Some(task) = best_effort("create task", created) {
                    info!(card = %card.id, item = %item.name, task = %task.id, "created task");
                    snapshot.insert(task);
                    stats.tasks_created += 1;
                }
            }
        }
    }

    /// Items still waiting in Backlog must not have a task.
    async fn prune_backlog(
        &self,
        card: &mut Card,
        snapshot: &mut TaskSnapshot,
        stats: &mut RunStats,
    ) -> Result<(), SyncError> {
        let backlog = checklist_items(self.boards, card, ChecklistName::Backlog, stats).await?;
        for item in &backlog.unchecked {
            let matches = match_item(snapshot.tasks(), &card.id, item, self.strict);
            if matches.len() > 1 {
                // every match goes, duplicates included
                warn!(card = %card.id, item = %item.name, count = matches.len(), "backlog item matches several tasks, deleting all");
            }
            for task in &matches {
                let deleted = self.tasks.delete_task(&task.id).await;
                if best_effort("delete task", deleted).is_some() {
                    info!(card = %card.id, item = %item.name, task = %task.id, "deleted task for backlog item");
                    snapshot.remove(&task.id);
                    stats.tasks_deleted += 1;
                }
            }
        }
        Ok(())
    }
}
