use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{BoardService, CardMove, CheckItemUpdate, TaskService};
use crate::error::SyncError;
use crate::model::board::{
    Board, BoardList, Card, CardSummary, CheckItem, CheckState, Checklist, Label,
};
use crate::model::task::{ExternalTask, NewTask};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardCall {
    CreateChecklist { card: String, name: String },
    UpdateCheckItem { card: String, item: String, update: CheckItemUpdate },
    AddLabel { card: String, label: String },
    RemoveLabel { card: String, label: String },
    MoveCard { card: String, destination: CardMove },
}

#[derive(Default)]
pub struct BoardState {
    pub boards: Vec<Board>,
    /// (board id, list) in board order.
    pub lists: Vec<(String, BoardList)>,
    /// Cards in list order.
    pub cards: Vec<Card>,
    /// (board id, label)
    pub labels: Vec<(String, Label)>,
    pub calls: Vec<BoardCall>,
    pub failing: HashSet<String>,
    next_id: u32,
}

#[derive(Default)]
pub struct FakeBoard {
    state: Mutex<BoardState>,
}

impl FakeBoard {
    pub fn state(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap()
    }

    pub fn add_board(&self, id: &str, name: &str, lists: &[&str]) {
        let mut state = self.state();
        state.boards.push(Board {
            id: id.into(),
            name: name.into(),
        });
        for list in lists {
            state.lists.push((id.into(), list_named(id, list)));
        }
        for label in ["Needs success criteria", "Needs tasks", "Planned"] {
            state.labels.push((
                id.into(),
                Label {
                    id: label_id(id, label),
                    name: label.into(),
                },
            ));
        }
    }

    pub fn add_card(&self, card: Card) {
        self.state().cards.push(card);
    }

    pub fn card_snapshot(&self, id: &str) -> Card {
        self.state().cards.iter().find(|c| c.id == id).cloned().unwrap()
    }

    /// Make every call to `operation` fail with a remote error.
    pub fn fail_on(&self, operation: &str) {
        self.state().failing.insert(operation.into());
    }

    pub fn calls(&self) -> Vec<BoardCall> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }
}

pub fn list_named(board_id: &str, name: &str) -> BoardList {
    BoardList {
        id: format!("{board_id}/{name}"),
        name: name.into(),
    }
}

pub fn label_id(board_id: &str, name: &str) -> String {
    format!("{board_id}#{name}")
}

pub fn item(name: &str, checked: bool) -> CheckItem {
    CheckItem {
        id: format!("item-{}", name.to_lowercase().replace(' ', "-")),
        name: name.into(),
        state: if checked {
            CheckState::Complete
        } else {
            CheckState::Incomplete
        },
    }
}

pub fn checklist(name: &str, items: Vec<CheckItem>) -> Checklist {
    Checklist {
        id: format!("cl-{}", name.to_lowercase().replace(' ', "-")),
        name: name.into(),
        items,
    }
}

pub fn card(id: &str, board_id: &str, list: &str, checklists: Vec<Checklist>) -> Card {
    Card {
        id: id.into(),
        name: format!("Card {id}"),
        url: format!("https://trello.com/c/{id}"),
        board_id: board_id.into(),
        list: Some(list_named(board_id, list)),
        checklists,
        labels: vec![],
    }
}

fn check(state: &BoardState, operation: &str) -> Result<(), SyncError> {
    if state.failing.contains(operation) {
        return Err(SyncError::remote(operation, "injected failure"));
    }
    Ok(())
}

#[async_trait]
impl BoardService for FakeBoard {
    async fn board(&self, reference: &str) -> Result<Board, SyncError> {
        let state = self.state();
        check(&state, "board")?;
        state
            .boards
            .iter()
            .find(|b| b.id == reference || b.name == reference)
            .cloned()
            .ok_or_else(|| SyncError::not_found("board", reference))
    }

    async fn lists(&self, board_id: &str) -> Result<Vec<BoardList>, SyncError> {
        let state = self.state();
        check(&state, "lists")?;
        Ok(state
            .lists
            .iter()
            .filter(|(b, _)| b == board_id)
            .map(|(_, l)| l.clone())
            .collect())
    }

    async fn cards(&self, list_id: &str) -> Result<Vec<CardSummary>, SyncError> {
        let state = self.state();
        check(&state, "cards")?;
        Ok(state
            .cards
            .iter()
            .filter(|c| c.list.as_ref().map(|l| l.id.as_str()) == Some(list_id))
            .map(|c| CardSummary {
                id: c.id.clone(),
                name: c.name.clone(),
            })
            .collect())
    }

    async fn card(&self, card_id: &str) -> Result<Card, SyncError> {
        let state = self.state();
        check(&state, "card")?;
        check(&state, &format!("card:{card_id}"))?;
        state
            .cards
            .iter()
            .find(|c| c.id == card_id)
            .cloned()
            .ok_or_else(|| SyncError::not_found("card", card_id))
    }

    async fn create_checklist(&self, card_id: &str, name: &str) -> Result<Checklist, SyncError> {
        let mut state = self.state();
        check(&state, "create_checklist")?;
        state.next_id += 1;
        let created = Checklist {
            id: format!("cl-new-{}", state.next_id),
            name: name.into(),
            items: vec![],
        };
        let card = state
            .cards
            .iter_mut()
            .find(|c| c.id == card_id)
            .ok_or_else(|| SyncError::not_found("card", card_id))?;
        card.checklists.push(created.clone());
        state.calls.push(BoardCall::CreateChecklist {
            card: card_id.into(),
            name: name.into(),
        });
        Ok(created)
    }

    async fn update_check_item(
        &self,
        card_id: &str,
        item_id: &str,
        update: CheckItemUpdate,
    ) -> Result<(), SyncError> {
        let mut state = self.state();
        check(&state, "update_check_item")?;
        let card = state
            .cards
            .iter_mut()
            .find(|c| c.id == card_id)
            .ok_or_else(|| SyncError::not_found("card", card_id))?;
        match &update {
            CheckItemUpdate::State(new_state) => {
                let item = card
                    .checklists
                    .iter_mut()
                    .flat_map(|cl| cl.items.iter_mut())
                    .find(|i| i.id == item_id)
                    .ok_or_else(|| SyncError::not_found("check item", item_id))?;
                item.state = *new_state;
            }
            CheckItemUpdate::MoveTo { checklist_id } => {
                if !card.checklists.iter().any(|cl| &cl.id == checklist_id) {
                    return Err(SyncError::not_found("checklist", checklist_id.as_str()));
                }
                let mut moved = None;
                for cl in card.checklists.iter_mut() {
                    if let Some(pos) = cl.items.iter().position(|i| i.id == item_id) {
                        moved = Some(cl.items.remove(pos));
                    }
                }
                let moved = moved.ok_or_else(|| SyncError::not_found("check item", item_id))?;
                if let Some(target) = card.checklists.iter_mut().find(|cl| &cl.id == checklist_id) {
                    target.items.push(moved);
                }
            }
        }
        state.calls.push(BoardCall::UpdateCheckItem {
            card: card_id.into(),
            item: item_id.into(),
            update,
        });
        Ok(())
    }

    async fn board_labels(&self, board_id: &str) -> Result<Vec<Label>, SyncError> {
        let state = self.state();
        check(&state, "board_labels")?;
        Ok(state
            .labels
            .iter()
            .filter(|(b, _)| b == board_id)
            .map(|(_, l)| l.clone())
            .collect())
    }

    async fn add_label(&self, card_id: &str, label_id: &str) -> Result<(), SyncError> {
        let mut state = self.state();
        check(&state, "add_label")?;
        let label = state
            .labels
            .iter()
            .map(|(_, l)| l.clone())
            .find(|l| l.id == label_id)
            .ok_or_else(|| SyncError::not_found("label", label_id))?;
        let card = state
            .cards
            .iter_mut()
            .find(|c| c.id == card_id)
            .ok_or_else(|| SyncError::not_found("card", card_id))?;
        if !card.labels.iter().any(|l| l.id == label_id) {
            card.labels.push(label);
        }
        state.calls.push(BoardCall::AddLabel {
            card: card_id.into(),
            label: label_id.into(),
        });
        Ok(())
    }

    async fn remove_label(&self, card_id: &str, label_id: &str) -> Result<(), SyncError> {
        let mut state = self.state();
        check(&state, "remove_label")?;
        let card = state
            .cards
            .iter_mut()
            .find(|c| c.id == card_id)
            .ok_or_else(|| SyncError::not_found("card", card_id))?;
        card.labels.retain(|l| l.id != label_id);
        state.calls.push(BoardCall::RemoveLabel {
            card: card_id.into(),
            label: label_id.into(),
        });
        Ok(())
    }

    async fn move_card(&self, card_id: &str, destination: CardMove) -> Result<(), SyncError> {
        let mut state = self.state();
        check(&state, "move_card")?;
        let target_list = match (&destination.list_id, &destination.board_id) {
            (Some(list_id), _) => state.lists.iter().find(|(_, l)| &l.id == list_id).cloned(),
            (None, Some(board_id)) => state.lists.iter().find(|(b, _)| b == board_id).cloned(),
            (None, None) => None,
        };
        let card = state
            .cards
            .iter_mut()
            .find(|c| c.id == card_id)
            .ok_or_else(|| SyncError::not_found("card", card_id))?;
        if let Some((board_id, list)) = target_list {
            card.board_id = board_id;
            card.list = Some(list);
        } else if let Some(board_id) = &destination.board_id {
            card.board_id = board_id.clone();
            card.list = None;
        }
        state.calls.push(BoardCall::MoveCard {
            card: card_id.into(),
            destination,
        });
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskCall {
    Create(NewTask),
    Complete(String),
    Delete(String),
}

#[derive(Default)]
pub struct TaskState {
    /// (id, name)
    pub projects: Vec<(String, String)>,
    pub tasks: Vec<ExternalTask>,
    pub calls: Vec<TaskCall>,
    pub failing: HashSet<String>,
    next_id: u32,
}

#[derive(Default)]
pub struct FakeTasks {
    state: Mutex<TaskState>,
}

impl FakeTasks {
    pub fn with_project(id: &str, name: &str) -> Self {
        let fake = Self::default();
        fake.state().projects.push((id.into(), name.into()));
        fake
    }

    pub fn state(&self) -> MutexGuard<'_, TaskState> {
        self.state.lock().unwrap()
    }

    pub fn add_task(&self, id: &str, content: &str, completed: bool) {
        let mut state = self.state();
        let project_id = state
            .projects
            .first()
            .map(|(pid, _)| pid.clone())
            .unwrap_or_default();
        state.tasks.push(ExternalTask {
            id: id.into(),
            content: content.into(),
            completed,
            project_id,
        });
    }

    pub fn task(&self, id: &str) -> Option<ExternalTask> {
        self.state().tasks.iter().find(|t| t.id == id).cloned()
    }

    pub fn tasks(&self) -> Vec<ExternalTask> {
        self.state().tasks.clone()
    }

    pub fn fail_on(&self, operation: &str) {
        self.state().failing.insert(operation.into());
    }

    pub fn clear_failures(&self) {
        self.state().failing.clear();
    }

    pub fn calls(&self) -> Vec<TaskCall> {
        self.state().calls.clone()
    }
}

fn check_tasks(state: &TaskState, operation: &str) -> Result<(), SyncError> {
    if state.failing.contains(operation) {
        return Err(SyncError::remote(operation, "injected failure"));
    }
    Ok(())
}

#[async_trait]
impl TaskService for FakeTasks {
    async fn project_id(&self, name: &str) -> Result<String, SyncError> {
        let state = self.state();
        check_tasks(&state, "project_id")?;
        state
            .projects
            .iter()
            .find(|(_, n)| n == name)
            .map(|(id, _)| id.clone())
            .ok_or_else(|| SyncError::not_found("project", name))
    }

    async fn open_tasks(&self, project_id: &str) -> Result<Vec<ExternalTask>, SyncError> {
        let state = self.state();
        check_tasks(&state, "open_tasks")?;
        Ok(state
            .tasks
            .iter()
            .filter(|t| t.project_id == project_id && !t.completed)
            .cloned()
            .collect())
    }

    async fn completed_tasks(&self, project_id: &str) -> Result<Vec<ExternalTask>, SyncError> {
        let state = self.state();
        check_tasks(&state, "completed_tasks")?;
        Ok(state
            .tasks
            .iter()
            .filter(|t| t.project_id == project_id && t.completed)
            .cloned()
            .collect())
    }

    async fn create_task(&self, task: &NewTask) -> Result<ExternalTask, SyncError> {
        let mut state = self.state();
        check_tasks(&state, "create_task")?;
        state.next_id += 1;
        let created = ExternalTask {
            id: format!("new-{}", state.next_id),
            content: task.content.clone(),
            completed: false,
            project_id: task.project_id.clone(),
        };
        state.tasks.push(created.clone());
        state.calls.push(TaskCall::Create(task.clone()));
        Ok(created)
    }

    async fn complete_task(&self, task_id: &str) -> Result<(), SyncError> {
        let mut state = self.state();
        check_tasks(&state, "complete_task")?;
        let task = state
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| SyncError::not_found("task", task_id))?;
        task.completed = true;
        state.calls.push(TaskCall::Complete(task_id.into()));
        Ok(())
    }

    async fn delete_task(&self, task_id: &str) -> Result<(), SyncError> {
        let mut state = self.state();
        check_tasks(&state, "delete_task")?;
        state.tasks.retain(|t| t.id != task_id);
        state.calls.push(TaskCall::Delete(task_id.into()));
        Ok(())
    }
}
