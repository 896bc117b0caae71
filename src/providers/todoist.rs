use async_trait::async_trait;
use chrono::{Duration, SecondsFormat, Utc};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::instrument;

use super::TaskService;
use crate::error::SyncError;
use crate::model::task::{ExternalTask, NewTask};

const TODOIST_API_BASE: &str = "https://api.todoist.com/api/v1";

/// The completed-tasks endpoint rejects ranges longer than this.
const MAX_COMPLETED_WINDOW_DAYS: u32 = 90;

pub struct TodoistClient {
    token: String,
    client: reqwest::Client,
    base_url: String,
    completed_window_days: u32,
}

impl TodoistClient {
    pub fn new(token: String, completed_window_days: u32) -> Self {
        Self::with_base_url(token, completed_window_days, TODOIST_API_BASE)
    }

    pub fn with_base_url(token: String, completed_window_days: u32, base_url: &str) -> Self {
        Self {
            token,
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            completed_window_days: completed_window_days.clamp(1, MAX_COMPLETED_WINDOW_DAYS),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
    }

    /// Follow `next_cursor` until the listing is exhausted.
    async fn fetch_all<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        operation: &str,
    ) -> Result<Vec<T>, SyncError> {
        let mut all = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut request = self.request(reqwest::Method::GET, path).query(params);
            if let Some(c) = &cursor {
                request = request.query(&[("cursor", c)]);
            }
            let page: Page<T> = execute(request, operation)
                .await?
                .json()
                .await
                .map_err(|e| SyncError::remote(operation, e))?;
            all.extend(page.results);
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }
        Ok(all)
    }
}

async fn execute(request: RequestBuilder, operation: &str) -> Result<Response, SyncError> {
    let resp = request
        .send()
        .await
        .map_err(|e| SyncError::remote(operation, e))?;
    let status = resp.status();
    if status == StatusCode::NOT_FOUND {
        return Err(SyncError::not_found("todoist resource", operation));
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(SyncError::remote(operation, format!("{status}: {body}")));
    }
    Ok(resp)
}

#[derive(Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new", alias = "items")]
    results: Vec<T>,
    next_cursor: Option<String>,
}

#[derive(Deserialize)]
struct TodoistProject {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct TodoistTask {
    id: String,
    content: String,
    #[serde(default)]
    checked: bool,
    project_id: String,
}

impl From<TodoistTask> for ExternalTask {
    fn from(task: TodoistTask) -> Self {
        ExternalTask {
            id: task.id,
            content: task.content,
            completed: task.checked,
            project_id: task.project_id,
        }
    }
}

#[async_trait]
impl TaskService for TodoistClient {
    #[instrument(skip(self), level = "debug")]
    async fn project_id(&self, name: &str) -> Result<String, SyncError> {
        let projects: Vec<TodoistProject> =
            self.fetch_all("/projects", &[], "list projects").await?;
        projects
            .into_iter()
            .find(|p| p.name == name)
            .map(|p| p.id)
            .ok_or_else(|| SyncError::not_found("project", name))
    }

    async fn open_tasks(&self, project_id: &str) -> Result<Vec<ExternalTask>, SyncError> {
        let tasks: Vec<TodoistTask> = self
            .fetch_all(
                "/tasks",
                &[("project_id", project_id.to_string())],
                &format!("list tasks of project {project_id}"),
            )
            .await?;
        Ok(tasks.into_iter().map(ExternalTask::from).collect())
    }

    async fn completed_tasks(&self, project_id: &str) -> Result<Vec<ExternalTask>, SyncError> {
        let until = Utc::now();
        let since = until - Duration::days(i64::from(self.completed_window_days));
        let tasks: Vec<TodoistTask> = self
            .fetch_all(
                "/tasks/completed/by_completion_date",
                &[
                    ("project_id", project_id.to_string()),
                    ("since", since.to_rfc3339_opts(SecondsFormat::Secs, true)),
                    ("until", until.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ],
                &format!("list completed tasks of project {project_id}"),
            )
            .await?;
        Ok(tasks
            .into_iter()
            .filter(|t| t.project_id == project_id)
            .map(|t| ExternalTask {
                completed: true,
                ..ExternalTask::from(t)
            })
            .collect())
    }

    async fn create_task(&self, task: &NewTask) -> Result<ExternalTask, SyncError> {
        let operation = format!("create task {:?}", task.content);
        let created: TodoistTask = execute(
            self.request(reqwest::Method::POST, "/tasks").json(task),
            &operation,
        )
        .await?
        .json()
        .await
        .map_err(|e| SyncError::remote(&operation, e))?;
        Ok(created.into())
    }

    async fn complete_task(&self, task_id: &str) -> Result<(), SyncError> {
        execute(
            self.request(reqwest::Method::POST, &format!("/tasks/{task_id}/close")),
            &format!("close task {task_id}"),
        )
        .await?;
        Ok(())
    }

    async fn delete_task(&self, task_id: &str) -> Result<(), SyncError> {
        execute(
            self.request(reqwest::Method::DELETE, &format!("/tasks/{task_id}")),
            &format!("delete task {task_id}"),
        )
        .await?;
        Ok(())
    }
}
