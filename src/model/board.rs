use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardList {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckState {
    Complete,
    Incomplete,
}

impl CheckState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckState::Complete => "complete",
            CheckState::Incomplete => "incomplete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckItem {
    pub id: String,
    pub name: String,
    pub state: CheckState,
}

impl CheckItem {
    pub fn is_checked(&self) -> bool {
        self.state == CheckState::Complete
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checklist {
    pub id: String,
    pub name: String,
    /// Items in board order.
    #[serde(default)]
    pub items: Vec<CheckItem>,
}

/// A card as listed on a board list, before its detail is fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardSummary {
    pub id: String,
    pub name: String,
}

/// Full card detail: checklists, labels and the list it sits on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub name: String,
    pub url: String,
    pub board_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list: Option<BoardList>,
    #[serde(default)]
    pub checklists: Vec<Checklist>,
    #[serde(default)]
    pub labels: Vec<Label>,
}

impl Card {
    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|l| l.name == name)
    }

    pub fn list_name(&self) -> Option<&str> {
        self.list.as_ref().map(|l| l.name.as_str())
    }
}

/// The checklists the groomer reads and writes. A card has at most one of each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChecklistName {
    SuccessCriteria,
    Tasks,
    Backlog,
}

impl ChecklistName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChecklistName::SuccessCriteria => "Success Criteria",
            ChecklistName::Tasks => "Tasks",
            ChecklistName::Backlog => "Backlog",
        }
    }
}

impl fmt::Display for ChecklistName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status labels derived from checklist state, plus the manual "Planned" trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusLabel {
    NeedsSuccessCriteria,
    NeedsTasks,
    Planned,
}

impl StatusLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusLabel::NeedsSuccessCriteria => "Needs success criteria",
            StatusLabel::NeedsTasks => "Needs tasks",
            StatusLabel::Planned => "Planned",
        }
    }
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const IN_PROGRESS_LIST: &str = "In Progress";
pub const TO_DO_LIST: &str = "To Do";

/// Where a list sits in the backlog flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListRole {
    /// Idea and research lists: never touched.
    Excluded,
    ToDo,
    InProgress,
    /// Any other list: labels and promotion only.
    Other,
}

impl ListRole {
    pub fn classify(name: &str, excluded: &[String]) -> Self {
        if excluded.iter().any(|ex| ex == name) {
            ListRole::Excluded
        } else if name == IN_PROGRESS_LIST {
            ListRole::InProgress
        } else if name == TO_DO_LIST {
            ListRole::ToDo
        } else {
            ListRole::Other
        }
    }
}
