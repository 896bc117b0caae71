pub mod todoist;
pub mod trello;

#[cfg(test)]
pub mod fake;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Settings;
use crate::error::SyncError;
use crate::model::board::{Board, BoardList, CardSummary, Card, CheckState, Checklist, Label};
use crate::model::task::{ExternalTask, NewTask};

/// A state-changing update to one check item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckItemUpdate {
    State(CheckState),
    /// Re-parent the item onto another checklist of the same card, at the bottom.
    MoveTo { checklist_id: String },
}

/// New placement for a card. Unset fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardMove {
    pub board_id: Option<String>,
    pub list_id: Option<String>,
}

/// The project board service.
#[async_trait]
pub trait BoardService: Send + Sync {
    /// Look up a board by id, short link or name.
    async fn board(&self, reference: &str) -> Result<Board, SyncError>;
    async fn lists(&self, board_id: &str) -> Result<Vec<BoardList>, SyncError>;
    async fn cards(&self, list_id: &str) -> Result<Vec<CardSummary>, SyncError>;
    /// Full card detail with checklists, labels and list.
    async fn card(&self, card_id: &str) -> Result<Card, SyncError>;
    async fn create_checklist(&self, card_id: &str, name: &str) -> Result<Checklist, SyncError>;
    async fn update_check_item(
        &self,
        card_id: &str,
        item_id: &str,
        update: CheckItemUpdate,
    ) -> Result<(), SyncError>;
    async fn board_labels(&self, board_id: &str) -> Result<Vec<Label>, SyncError>;
    async fn add_label(&self, card_id: &str, label_id: &str) -> Result<(), SyncError>;
    async fn remove_label(&self, card_id: &str, label_id: &str) -> Result<(), SyncError>;
    async fn move_card(&self, card_id: &str, destination: CardMove) -> Result<(), SyncError>;
}

/// The external flat task list service.
#[async_trait]
pub trait TaskService: Send + Sync {
    /// Resolve a task list (project) name to its id.
    async fn project_id(&self, name: &str) -> Result<String, SyncError>;
    async fn open_tasks(&self, project_id: &str) -> Result<Vec<ExternalTask>, SyncError>;
    /// Recently completed tasks. Not every account can read these.
    async fn completed_tasks(&self, project_id: &str) -> Result<Vec<ExternalTask>, SyncError>;
    async fn create_task(&self, task: &NewTask) -> Result<ExternalTask, SyncError>;
    async fn complete_task(&self, task_id: &str) -> Result<(), SyncError>;
    async fn delete_task(&self, task_id: &str) -> Result<(), SyncError>;
}

pub fn create_services(settings: &Settings) -> (Arc<dyn BoardService>, Arc<dyn TaskService>) {
    let boards = trello::TrelloClient::new(
        settings.trello.api_key.clone(),
        settings.trello.token.clone(),
    );
    let tasks = todoist::TodoistClient::new(
        settings.todoist.token.clone(),
        settings.todoist.completed_window_days,
    );
    (Arc::new(boards), Arc::new(tasks))
}
