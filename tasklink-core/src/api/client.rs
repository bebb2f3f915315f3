//! Google Tasks v1 REST client.

use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::retry::RetryPolicy;
use super::{AccessTokenProvider, TaskService};
use crate::error::{Error, Result};
use crate::model::{RemoteTask, TaskList, TaskPayload};

pub const TASKS_API: &str = "https://tasks.googleapis.com/tasks/v1";

const PAGE_SIZE: &str = "100";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    next_page_token: Option<String>,
}

#[derive(Serialize)]
struct NewTaskList<'a> {
    title: &'a str,
}

/// Typed access to task lists and tasks, with retries and token refresh.
pub struct TasksClient<P> {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
    tokens: P,
}

impl<P: AccessTokenProvider> TasksClient<P> {
    pub fn new(tokens: P) -> Self {
        Self::with_base_url(tokens, TASKS_API)
    }

    /// Points the client at another server (used against local fakes).
    pub fn with_base_url(tokens: P, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
            tokens,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn list_url(&self, list_id: &str) -> String {
        format!(
            "{}/lists/{}/tasks",
            self.base_url,
            urlencoding::encode(list_id)
        )
    }

    fn task_url(&self, list_id: &str, task_id: &str) -> String {
        format!(
            "{}/{}",
            self.list_url(list_id),
            urlencoding::encode(task_id)
        )
    }

    async fn send<F>(&self, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        self.retry
            .execute(&self.tokens, |token| build().bearer_auth(token).send())
            .await
    }

    async fn fetch_pages<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let response = self
                .send(|| {
                    let request = self.http.get(url).query(query);
                    match &page_token {
                        Some(token) => request.query(&[("pageToken", token.as_str())]),
                        None => request,
                    }
                })
                .await?;
            let page: Page<T> = decode(response).await?;
            items.extend(page.items);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => return Ok(items),
            }
        }
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    response
        .json()
        .await
        .map_err(|e| Error::Http(format!("invalid response body: {}", e)))
}

impl<P: AccessTokenProvider> TaskService for TasksClient<P> {
    async fn find_or_create_list(&self, title: &str) -> Result<String> {
        if let Some(list) = self
            .task_lists()
            .await?
            .into_iter()
            .find(|list| list.title == title)
        {
            return Ok(list.id);
        }

        tracing::info!("Creating task list '{}'", title);
        let url = format!("{}/users/@me/lists", self.base_url);
        let body = NewTaskList { title };
        let response = self.send(|| self.http.post(&url).json(&body)).await?;
        let list: TaskList = decode(response).await?;
        Ok(list.id)
    }

    async fn task_lists(&self) -> Result<Vec<TaskList>> {
        let url = format!("{}/users/@me/lists", self.base_url);
        self.fetch_pages(&url, &[("maxResults", PAGE_SIZE)]).await
    }

    async fn list_active_tasks(&self, list_id: &str) -> Result<Vec<RemoteTask>> {
        let url = self.list_url(list_id);
        let tasks: Vec<RemoteTask> = self
            .fetch_pages(
                &url,
                &[
                    ("showCompleted", "false"),
                    ("showHidden", "false"),
                    ("maxResults", PAGE_SIZE),
                ],
            )
            .await?;
        Ok(tasks.into_iter().filter(RemoteTask::is_active).collect())
    }

    async fn get_task(&self, list_id: &str, task_id: &str) -> Result<RemoteTask> {
        let url = self.task_url(list_id, task_id);
        let response = self.send(|| self.http.get(&url)).await?;
        decode(response).await
    }

    async fn create_task(&self, list_id: &str, payload: &TaskPayload) -> Result<RemoteTask> {
        let url = self.list_url(list_id);
        let response = self.send(|| self.http.post(&url).json(payload)).await?;
        decode(response).await
    }

    async fn update_task(
        &self,
        list_id: &str,
        task_id: &str,
        payload: &TaskPayload,
    ) -> Result<RemoteTask> {
        let url = self.task_url(list_id, task_id);
        let response = self.send(|| self.http.patch(&url).json(payload)).await?;
        decode(response).await
    }
}
