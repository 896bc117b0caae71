use tracing::{info, warn};

use super::checklist::checklist_items;
use super::RunStats;
use crate::error::{best_effort, SyncError};
use crate::model::board::{Card, ChecklistName, Label, StatusLabel};
use crate::providers::BoardService;

/// Item counts of the checklists that drive the status labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChecklistCounts {
    pub success_criteria: usize,
    pub tasks: usize,
    pub backlog: usize,
}

/// The status labels a card should carry, as (label, present) pairs.
pub fn desired_labels(counts: ChecklistCounts) -> [(StatusLabel, bool); 2] {
    [
        (StatusLabel::NeedsSuccessCriteria, counts.success_criteria == 0),
        (StatusLabel::NeedsTasks, counts.tasks + counts.backlog == 0),
    ]
}

/// Board labels, fetched at most once per card and only when a label has to be added.
#[derive(Default)]
pub struct BoardLabels {
    labels: Option<Vec<Label>>,
}

impl BoardLabels {
    async fn find(
        &mut self,
        boards: &dyn BoardService,
        board_id: &str,
        name: &str,
    ) -> Result<Option<Label>, SyncError> {
        if self.labels.is_none() {
            self.labels = Some(boards.board_labels(board_id).await?);
        }
        Ok(self
            .labels
            .iter()
            .flatten()
            .find(|l| l.name == name)
            .cloned())
    }
}

/// Add `label` to the card if it is missing. Returns whether a call was made.
pub async fn ensure_present(
    boards: &dyn BoardService,
    card: &mut Card,
    label: StatusLabel,
    board_labels: &mut BoardLabels,
) -> Result<bool, SyncError> {
    if card.has_label(label.as_str()) {
        return Ok(false);
    }
    let Some(found) = board_labels
        .find(boards, &card.board_id, label.as_str())
        .await?
    else {
        warn!(card = %card.id, board = %card.board_id, label = %label, "board has no such label");
        return Ok(false);
    };

    boards.add_label(&card.id, &found.id).await?;
    info!(card = %card.id, label = %label, "added label");
    card.labels.push(found);
    Ok(true)
}

/// Remove every label named `label` from the card. Returns how many were removed.
pub async fn ensure_absent(
    boards: &dyn BoardService,
    card: &mut Card,
    label: StatusLabel,
) -> Result<usize, SyncError> {
    let matching: Vec<Label> = card
        .labels
        .iter()
        .filter(|l| l.name == label.as_str())
        .cloned()
        .collect();

    for found in &matching {
        boards.remove_label(&card.id, &found.id).await?;
        info!(card = %card.id, label = %label, "removed label");
        card.labels.retain(|l| l.id != found.id);
    }
    Ok(matching.len())
}

/// Bring the card's status labels in line with its checklists.
///
/// Missing checklists are created along the way. Label writes are
/// best-effort: a failed add or remove is logged and the next label is tried.
pub async fn derive_labels(
    boards: &dyn BoardService,
    card: &mut Card,
    stats: &mut RunStats,
) -> Result<(), SyncError> {
    let success = checklist_items(boards, card, ChecklistName::SuccessCriteria, stats).await?;
    let tasks = checklist_items(boards, card, ChecklistName::Tasks, stats).await?;
    let backlog = checklist_items(boards, card, ChecklistName::Backlog, stats).await?;

    let counts = ChecklistCounts {
        success_criteria: success.len(),
        tasks: tasks.len(),
        backlog: backlog.len(),
    };

    let mut board_labels = BoardLabels::default();
    for (label, wanted) in desired_labels(counts) {
        if wanted {
            let added = ensure_present(boards, card, label, &mut board_labels).await;
            if best_effort("add label", added) == Some(true) {
                stats.labels_added += 1;
            }
        } else {
            let removed = ensure_absent(boards, card, label).await;
            stats.labels_removed += best_effort("remove label", removed).unwrap_or(0);
        }
    }
    Ok(())
}
