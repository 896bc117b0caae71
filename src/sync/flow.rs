use tracing::{debug, info};

use super::matcher::find_matches;
use super::reconcile::TaskDefaults;
use super::RunStats;
use crate::error::SyncError;
use crate::model::board::{Board, BoardList, IN_PROGRESS_LIST, TO_DO_LIST};
use crate::model::task::{ExternalTask, TaskSnapshot};
use crate::providers::{BoardService, CardMove, TaskService};

/// Result of one step of the goals-board flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    /// Something is already in progress.
    Active,
    /// The first "To Do" card, by id, was moved into "In Progress".
    Started(String),
    /// Nothing to pull: a planning task was created.
    Nudged,
    /// Nothing to pull and the planning task is still open.
    AlreadyNudged,
}

fn find_list<'a>(lists: &'a [BoardList], name: &str) -> Option<&'a BoardList> {
    lists.iter().find(|l| l.name == name)
}

/// Keep one card in progress on the goals board.
///
/// An empty "In Progress" list pulls the first "To Do" card. With nothing to
/// pull the user is asked, through a single open task, to plan new work.
pub async fn advance_flow(
    boards: &dyn BoardService,
    tasks: &dyn TaskService,
    goals: &Board,
    snapshot: &mut TaskSnapshot,
    defaults: &TaskDefaults,
    plan_prompt: &str,
    stats: &mut RunStats,
) -> Result<FlowOutcome, SyncError> {
    let lists = boards.lists(&goals.id).await?;
    let in_progress = find_list(&lists, IN_PROGRESS_LIST)
        .ok_or_else(|| SyncError::not_found("list", IN_PROGRESS_LIST))?;

    if !boards.cards(&in_progress.id).await?.is_empty() {
        debug!(board = %goals.id, "work in progress, nothing to pull");
        return Ok(FlowOutcome::Active);
    }

    let next = match find_list(&lists, TO_DO_LIST) {
        Some(to_do) => boards.cards(&to_do.id).await?.into_iter().next(),
        None => None,
    };

    if let Some(card) = next {
        let destination = CardMove {
            board_id: None,
            list_id: Some(in_progress.id.clone()),
        };
        boards.move_card(&card.id, destination).await?;
        info!(board = %goals.id, card = %card.id, name = %card.name, "started next card");
        stats.cards_started += 1;
        return Ok(FlowOutcome::Started(card.id));
    }

    let open: Vec<ExternalTask> = snapshot
        .tasks()
        .iter()
        .filter(|t| !t.completed)
        .cloned()
        .collect();
    if !find_matches(&open, plan_prompt, true).is_empty() {
        debug!(board = %goals.id, "planning task still open");
        return Ok(FlowOutcome::AlreadyNudged);
    }

    let created = tasks
        .create_task(&defaults.new_task(plan_prompt.to_string()))
        .await?;
    info!(board = %goals.id, task = %created.id, "nothing left to do, asked for planning");
    snapshot.insert(created);
    stats.nudges_created += 1;
    Ok(FlowOutcome::Nudged)
}
