use tracing::{error, info, warn};

use super::labels::ensure_absent;
use super::RunStats;
use crate::model::board::{Board, Card, StatusLabel};
use crate::providers::{BoardService, CardMove};

/// What happened to an intake card during stage promotion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Promotion {
    /// The card is not marked "Planned".
    NotPlanned,
    /// Label removed and card moved to the goals board.
    Moved,
    /// The label could not be removed; the card stays put this run.
    LabelRemovalFailed,
    /// The label is gone but the move failed. Not rolled back.
    MoveFailed,
}

/// Move a "Planned" intake card to the goals board.
///
/// The label is removed strictly before the move. A failed move leaves the
/// label removed, so the card will not be picked up for promotion again.
pub async fn promote_if_planned(
    boards: &dyn BoardService,
    card: &mut Card,
    goals: &Board,
    stats: &mut RunStats,
) -> Promotion {
    if !card.has_label(StatusLabel::Planned.as_str()) {
        return Promotion::NotPlanned;
    }

    match ensure_absent(boards, card, StatusLabel::Planned).await {
        Ok(removed) => stats.labels_removed += removed,
        Err(e) => {
            warn!(card = %card.id, error = %e, "could not clear Planned label, skipping promotion");
            return Promotion::LabelRemovalFailed;
        }
    }

    info!(card = %card.id, board = %goals.id, "moving planned card to goals board");
    let destination = CardMove {
        board_id: Some(goals.id.clone()),
        list_id: None,
    };
    if let Err(e) = boards.move_card(&card.id, destination).await {
        error!(card = %card.id, board = %goals.id, error = %e, "moving card to goals board failed");
        return Promotion::MoveFailed;
    }

    card.board_id = goals.id.clone();
    card.list = None;
    stats.cards_promoted += 1;
    Promotion::Moved
}
