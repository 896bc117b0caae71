use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, info_span, warn, Instrument};

use super::flow::advance_flow;
use super::labels::derive_labels;
use super::promote::promote_if_planned;
use super::reconcile::{Reconciler, TaskDefaults};
use super::RunStats;
use crate::config::Settings;
use crate::error::SyncError;
use crate::model::board::{Board, CardSummary, ListRole};
use crate::model::task::TaskSnapshot;
use crate::providers::{BoardService, TaskService};

/// The part of the configuration a pass needs.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub backlog_board: String,
    pub goals_board: String,
    pub excluded_lists: Vec<String>,
    pub project: String,
    pub assignee_id: Option<String>,
    pub priority: u8,
    pub due_string: Option<String>,
    pub include_completed: bool,
    pub plan_prompt: String,
    pub strict_match: bool,
}

impl From<&Settings> for SyncSettings {
    fn from(settings: &Settings) -> Self {
        Self {
            backlog_board: settings.trello.backlog_board.clone(),
            goals_board: settings.trello.goals_board.clone(),
            excluded_lists: settings.trello.excluded_lists.clone(),
            project: settings.todoist.project.clone(),
            assignee_id: settings.todoist.assignee_id.clone(),
            priority: settings.todoist.priority,
            due_string: settings.todoist.due(),
            include_completed: settings.todoist.include_completed,
            plan_prompt: settings.todoist.plan_prompt.clone(),
            strict_match: settings.todoist.strict_match,
        }
    }
}

/// A card found while listing a board, with the role of its list.
struct Visit {
    card: CardSummary,
    role: ListRole,
}

/// Runs full passes over the intake and goals boards.
pub struct Groomer {
    boards: Arc<dyn BoardService>,
    tasks: Arc<dyn TaskService>,
    settings: SyncSettings,
}

impl Groomer {
    pub fn new(
        boards: Arc<dyn BoardService>,
        tasks: Arc<dyn TaskService>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            boards,
            tasks,
            settings,
        }
    }

    /// One numbered pass, wrapped in a span and summarised in the log.
    pub async fn run_logged(&self, run: u64) -> Result<RunStats, SyncError> {
        async {
            let started = Instant::now();
            let result = self.run_once().await;
            let elapsed_ms = started.elapsed().as_millis() as u64;
            match &result {
                Ok(stats) => info!(elapsed_ms, %stats, "run finished"),
                Err(e) => error!(elapsed_ms, error = %e, "run aborted"),
            }
            result
        }
        .instrument(info_span!("run", run))
        .await
    }

    /// One full pass: intake board, backlog flow, then goals board.
    ///
    /// Failing to resolve the project, read the tasks, or list either board
    /// aborts the pass. A failure on one card is logged and the pass moves on.
    pub async fn run_once(&self) -> Result<RunStats, SyncError> {
        let mut stats = RunStats::default();

        let project_id = self.tasks.project_id(&self.settings.project).await?;
        let mut snapshot = self.snapshot(&project_id).await?;
        let defaults = TaskDefaults {
            project_id,
            assignee_id: self.settings.assignee_id.clone(),
            priority: self.settings.priority,
            due_string: self.settings.due_string.clone(),
        };

        let intake = self.boards.board(&self.settings.backlog_board).await?;
        let goals = self.boards.board(&self.settings.goals_board).await?;

        for visit in self.cards_to_visit(&intake).await? {
            stats.cards_visited += 1;
            if let Err(e) = self.groom_intake_card(&visit.card, &goals, &mut stats).await {
                error!(card = %visit.card.id, error = %e, "skipping intake card");
                stats.card_failures += 1;
            }
        }

        match advance_flow(
            self.boards.as_ref(),
            self.tasks.as_ref(),
            &goals,
            &mut snapshot,
            &defaults,
            &self.settings.plan_prompt,
            &mut stats,
        )
        .await
        {
            Ok(outcome) => debug!(board = %goals.id, ?outcome, "backlog flow"),
            Err(e) if e.is_not_found() => {
                warn!(board = %goals.id, error = %e, "goals board is missing a flow list")
            }
            Err(e) => warn!(board = %goals.id, error = %e, "backlog flow skipped"),
        }

        let reconciler = Reconciler {
            boards: self.boards.as_ref(),
            tasks: self.tasks.as_ref(),
            defaults: &defaults,
            strict: self.settings.strict_match,
        };
        for visit in self.cards_to_visit(&goals).await? {
            stats.cards_visited += 1;
            let groomed = self
                .groom_goals_card(&visit, &reconciler, &mut snapshot, &mut stats)
                .await;
            if let Err(e) = groomed {
                error!(card = %visit.card.id, error = %e, "skipping goals card");
                stats.card_failures += 1;
            }
        }

        Ok(stats)
    }

    /// Both reads are required: without the completed tasks an item finished
    /// in the task list would look untracked and get a fresh task.
    async fn snapshot(&self, project_id: &str) -> Result<TaskSnapshot, SyncError> {
        let mut tasks = self.tasks.open_tasks(project_id).await?;
        let snapshot = if self.settings.include_completed {
            tasks.extend(self.tasks.completed_tasks(project_id).await?);
            TaskSnapshot::new(tasks)
        } else {
            TaskSnapshot::without_completed(tasks)
        };
        debug!(tasks = snapshot.len(), "task snapshot");
        Ok(snapshot)
    }

    /// Cards on every non-excluded list of `board`, in board order.
    async fn cards_to_visit(&self, board: &Board) -> Result<Vec<Visit>, SyncError> {
        let mut visits = Vec::new();
        for list in self.boards.lists(&board.id).await? {
            let role = ListRole::classify(&list.name, &self.settings.excluded_lists);
            if role == ListRole::Excluded {
                debug!(board = %board.id, list = %list.name, "skipping excluded list");
                continue;
            }
            for card in self.boards.cards(&list.id).await? {
                visits.push(Visit { card, role });
            }
        }
        Ok(visits)
    }

    async fn groom_intake_card(
        &self,
        summary: &CardSummary,
        goals: &Board,
        stats: &mut RunStats,
    ) -> Result<(), SyncError> {
        let mut card = self.boards.card(&summary.id).await?;
        derive_labels(self.boards.as_ref(), &mut card, stats).await?;
        let outcome = promote_if_planned(self.boards.as_ref(), &mut card, goals, stats).await;
        debug!(card = %card.id, ?outcome, "promotion");
        Ok(())
    }

    async fn groom_goals_card(
        &self,
        visit: &Visit,
        reconciler: &Reconciler<'_>,
        snapshot: &mut TaskSnapshot,
        stats: &mut RunStats,
    ) -> Result<(), SyncError> {
        let mut card = self.boards.card(&visit.card.id).await?;
        // the detail is fresher than the listing
        let role = card
            .list_name()
            .map(|name| ListRole::classify(name, &self.settings.excluded_lists))
            .unwrap_or(visit.role);
        derive_labels(self.boards.as_ref(), &mut card, stats).await?;
        if role == ListRole::InProgress {
            reconciler.reconcile(&mut card, snapshot, stats).await?;
        }
        Ok(())
    }
}
