use tracing::info;

use super::RunStats;
use crate::error::SyncError;
use crate::model::board::{Card, CheckItem, CheckState, Checklist, ChecklistName};
use crate::providers::{BoardService, CheckItemUpdate};

/// A checklist's items split by completion state, each side in board order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    pub checked: Vec<CheckItem>,
    pub unchecked: Vec<CheckItem>,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.checked.len() + self.unchecked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn checklist(card: &Card, name: ChecklistName) -> Option<&Checklist> {
    card.checklists.iter().find(|cl| cl.name == name.as_str())
}

fn partition(checklist: &Checklist) -> Partition {
    let (checked, unchecked): (Vec<_>, Vec<_>) =
        checklist.items.iter().cloned().partition(CheckItem::is_checked);
    Partition { checked, unchecked }
}

/// Read a named checklist, creating it empty on the card when it is missing.
///
/// A freshly created checklist yields an empty partition; it is present on
/// `card` from then on.
pub async fn checklist_items(
    boards: &dyn BoardService,
    card: &mut Card,
    name: ChecklistName,
    stats: &mut RunStats,
) -> Result<Partition, SyncError> {
    if let Some(existing) = checklist(card, name) {
        return Ok(partition(existing));
    }

    let created = boards.create_checklist(&card.id, name.as_str()).await?;
    info!(card = %card.id, checklist = %name, "created missing checklist");
    stats.checklists_created += 1;
    card.checklists.push(created);
    Ok(Partition::default())
}

/// Re-parent `item` onto the `target` checklist of the same card.
pub async fn move_item(
    boards: &dyn BoardService,
    card: &mut Card,
    item: &CheckItem,
    target: ChecklistName,
) -> Result<(), SyncError> {
    let target_id = checklist(card, target)
        .map(|cl| cl.id.clone())
        .ok_or_else(|| SyncError::not_found("checklist", target.as_str()))?;

    boards
        .update_check_item(
            &card.id,
            &item.id,
            CheckItemUpdate::MoveTo {
                checklist_id: target_id.clone(),
            },
        )
        .await?;

    let mut moved = None;
    for cl in card.checklists.iter_mut() {
        if let Some(pos) = cl.items.iter().position(|i| i.id == item.id) {
            moved = Some(cl.items.remove(pos));
        }
    }
    let moved = moved.unwrap_or_else(|| item.clone());
    if let Some(target) = card.checklists.iter_mut().find(|cl| cl.id == target_id) {
        target.items.push(moved);
    }
    Ok(())
}

/// Mark an item complete on the board and on `card`.
pub async fn mark_checked(
    boards: &dyn BoardService,
    card: &mut Card,
    item: &CheckItem,
) -> Result<(), SyncError> {
    boards
        .update_check_item(
            &card.id,
            &item.id,
            CheckItemUpdate::State(CheckState::Complete),
        )
        .await?;

    if let Some(local) = card
        .checklists
        .iter_mut()
        .flat_map(|cl| cl.items.iter_mut())
        .find(|i| i.id == item.id)
    {
        local.state = CheckState::Complete;
    }
    Ok(())
}
