pub mod checklist;
pub mod flow;
pub mod labels;
pub mod matcher;
pub mod promote;
pub mod reconcile;
pub mod run;


use serde::Serialize;
use std::fmt;

/// Counters for one pass over both boards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub cards_visited: usize,
    pub card_failures: usize,
    pub checklists_created: usize,
    pub labels_added: usize,
    pub labels_removed: usize,
    pub cards_promoted: usize,
    pub cards_started: usize,
    pub backlog_items_promoted: usize,
    pub tasks_created: usize,
    pub tasks_completed: usize,
    pub tasks_deleted: usize,
    pub items_checked: usize,
    pub nudges_created: usize,
}

impl RunStats {
    /// Number of state-changing calls issued against either service.
    pub fn mutations(&self) -> usize {
        self.checklists_created
            + self.labels_added
            + self.labels_removed
            + self.cards_promoted
            + self.cards_started
            + self.backlog_items_promoted
            + self.tasks_created
            + self.tasks_completed
            + self.tasks_deleted
            + self.items_checked
            + self.nudges_created
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cards ({} failed), labels +{}/-{}, {} promoted, {} started, \
             {} backlog items moved, tasks +{} done {} -{}, {} items checked, {} nudges",
            self.cards_visited,
            self.card_failures,
            self.labels_added,
            self.labels_removed,
            self.cards_promoted,
            self.cards_started,
            self.backlog_items_promoted,
            self.tasks_created,
            self.tasks_completed,
            self.tasks_deleted,
            self.items_checked,
            self.nudges_created,
        )
    }
}
