//! Remote task service access.

use std::future::Future;

use crate::auth::TokenManager;
use crate::error::Result;
use crate::model::{RemoteTask, TaskList, TaskPayload};

pub mod client;
pub mod retry;

pub use client::TasksClient;
pub use retry::RetryPolicy;

/// Supplies bearer tokens to outbound requests.
pub trait AccessTokenProvider: Send + Sync {
    /// A token that is valid right now.
    fn access_token(&self) -> impl Future<Output = Result<String>> + Send;

    /// Forces a refresh after the server rejected the current token.
    fn refresh(&self) -> impl Future<Output = Result<String>> + Send;
}

impl AccessTokenProvider for TokenManager {
    async fn access_token(&self) -> Result<String> {
        Ok(TokenManager::access_token(self).await?)
    }

    async fn refresh(&self) -> Result<String> {
        Ok(self.refresh_access_token().await?.access_token)
    }
}

/// Operations the reconciliation engine needs from the remote service.
pub trait TaskService: Send + Sync {
    /// Returns the id of the list titled `title`, creating it if absent.
    fn find_or_create_list(&self, title: &str) -> impl Future<Output = Result<String>> + Send;

    /// All non-completed, non-hidden tasks of a list, across pages.
    fn list_active_tasks(&self, list_id: &str)
        -> impl Future<Output = Result<Vec<RemoteTask>>> + Send;

    /// Fetches one task; a missing task yields `Error::NotFound`.
    fn get_task(&self, list_id: &str, task_id: &str)
        -> impl Future<Output = Result<RemoteTask>> + Send;

    fn create_task(
        &self,
        list_id: &str,
        payload: &TaskPayload,
    ) -> impl Future<Output = Result<RemoteTask>> + Send;

    fn update_task(
        &self,
        list_id: &str,
        task_id: &str,
        payload: &TaskPayload,
    ) -> impl Future<Output = Result<RemoteTask>> + Send;

    fn task_lists(&self) -> impl Future<Output = Result<Vec<TaskList>>> + Send;
}
