//! Facade bundling the account tasks over one dispatcher

use crate::filter::Filter;
use crate::tasks::{
    ChangePassword, FetchLinkedProviders, FetchUser, FetchUsers, Follow, LinkProvider, Login,
    Logout, PasswordReset, SaveUser, Signup, SocialSignup, Unfollow, UnlinkProvider, UserList,
};
use crate::user::User;
use baaskit_core::{CredentialStore, Envelope, Session};
use baaskit_dispatch::{
    submit_with_retry, DispatchResult, Dispatcher, Priority, RequestHandle, RetryPolicy, Task,
};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::debug;

/// Account operations with an explicit priority
///
/// The awaiting methods resolve to the task's envelope, retrying transient failures when a
/// [`RetryPolicy`] is set. The `*_async` variants enqueue once and hand the envelope to a
/// callback, returning a handle that can cancel the request.
#[derive(Clone)]
pub struct Accounts {
    dispatcher: Arc<Dispatcher>,
    retry: Option<RetryPolicy>,
}

impl Accounts {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher, retry: None }
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn session(&self) -> Session {
        self.dispatcher.store().get()
    }

    /// Name of the logged-in user, if any
    pub fn current_user(&self) -> Option<String> {
        self.session().identity().map(str::to_string)
    }

    /// Run any task to completion
    pub async fn run<T>(&self, task: T, priority: Priority) -> DispatchResult<Envelope<T::Output>>
    where
        T: Task + Clone,
    {
        match &self.retry {
            Some(policy) => {
                submit_with_retry(&self.dispatcher, || task.clone(), priority, policy).await
            }
            None => self.dispatcher.submit_sync(task, priority).await,
        }
    }

    /// Enqueue any task without waiting
    pub fn spawn<T, F>(&self, task: T, priority: Priority, callback: F) -> DispatchResult<RequestHandle>
    where
        T: Task,
        F: FnOnce(Envelope<T::Output>) + Send + 'static,
    {
        debug!(task = task.name(), %priority, "submitting without waiting");
        self.dispatcher.submit_async(task, priority, callback)
    }

    pub async fn signup(&self, user: User, priority: Priority) -> DispatchResult<Envelope<User>> {
        self.run(Signup::new(user), priority).await
    }

    pub fn signup_async<F>(&self, user: User, priority: Priority, callback: F) -> DispatchResult<RequestHandle>
    where
        F: FnOnce(Envelope<User>) + Send + 'static,
    {
        self.spawn(Signup::new(user), priority, callback)
    }

    pub async fn login(&self, username: &str, password: &str, priority: Priority) -> DispatchResult<Envelope<User>> {
        self.run(Login::new(username, password), priority).await
    }

    pub fn login_async<F>(
        &self,
        username: &str,
        password: &str,
        priority: Priority,
        callback: F,
    ) -> DispatchResult<RequestHandle>
    where
        F: FnOnce(Envelope<User>) + Send + 'static,
    {
        self.spawn(Login::new(username, password), priority, callback)
    }

    pub async fn social_signup(
        &self,
        provider: &str,
        oauth_token: &str,
        oauth_secret: &str,
        priority: Priority,
    ) -> DispatchResult<Envelope<User>> {
        self.run(SocialSignup::new(provider, oauth_token, oauth_secret), priority).await
    }

    pub fn social_signup_async<F>(
        &self,
        provider: &str,
        oauth_token: &str,
        oauth_secret: &str,
        priority: Priority,
        callback: F,
    ) -> DispatchResult<RequestHandle>
    where
        F: FnOnce(Envelope<User>) + Send + 'static,
    {
        self.spawn(SocialSignup::new(provider, oauth_token, oauth_secret), priority, callback)
    }

    pub async fn logout(&self, username: &str, priority: Priority) -> DispatchResult<Envelope<()>> {
        self.run(Logout::new(username), priority).await
    }

    pub fn logout_async<F>(&self, username: &str, priority: Priority, callback: F) -> DispatchResult<RequestHandle>
    where
        F: FnOnce(Envelope<()>) + Send + 'static,
    {
        self.spawn(Logout::new(username), priority, callback)
    }

    pub async fn save(&self, user: User, priority: Priority) -> DispatchResult<Envelope<User>> {
        self.run(SaveUser::new(user), priority).await
    }

    pub fn save_async<F>(&self, user: User, priority: Priority, callback: F) -> DispatchResult<RequestHandle>
    where
        F: FnOnce(Envelope<User>) + Send + 'static,
    {
        self.spawn(SaveUser::new(user), priority, callback)
    }

    pub async fn change_password(
        &self,
        username: &str,
        new_password: &str,
        priority: Priority,
    ) -> DispatchResult<Envelope<()>> {
        self.run(ChangePassword::new(username, new_password), priority).await
    }

    pub fn change_password_async<F>(
        &self,
        username: &str,
        new_password: &str,
        priority: Priority,
        callback: F,
    ) -> DispatchResult<RequestHandle>
    where
        F: FnOnce(Envelope<()>) + Send + 'static,
    {
        self.spawn(ChangePassword::new(username, new_password), priority, callback)
    }

    pub async fn fetch(&self, username: &str, priority: Priority) -> DispatchResult<Envelope<User>> {
        self.run(FetchUser::new(username), priority).await
    }

    pub fn fetch_async<F>(&self, username: &str, priority: Priority, callback: F) -> DispatchResult<RequestHandle>
    where
        F: FnOnce(Envelope<User>) + Send + 'static,
    {
        self.spawn(FetchUser::new(username), priority, callback)
    }

    pub async fn fetch_users(
        &self,
        list: UserList,
        filter: Filter,
        priority: Priority,
    ) -> DispatchResult<Envelope<Vec<User>>> {
        self.run(FetchUsers::new(list).with_filter(filter), priority).await
    }

    pub fn fetch_users_async<F>(
        &self,
        list: UserList,
        filter: Filter,
        priority: Priority,
        callback: F,
    ) -> DispatchResult<RequestHandle>
    where
        F: FnOnce(Envelope<Vec<User>>) + Send + 'static,
    {
        self.spawn(FetchUsers::new(list).with_filter(filter), priority, callback)
    }

    pub async fn follow(&self, username: &str, priority: Priority) -> DispatchResult<Envelope<User>> {
        self.run(Follow::new(username), priority).await
    }

    pub fn follow_async<F>(&self, username: &str, priority: Priority, callback: F) -> DispatchResult<RequestHandle>
    where
        F: FnOnce(Envelope<User>) + Send + 'static,
    {
        self.spawn(Follow::new(username), priority, callback)
    }

    pub async fn unfollow(&self, username: &str, priority: Priority) -> DispatchResult<Envelope<()>> {
        self.run(Unfollow::new(username), priority).await
    }

    pub fn unfollow_async<F>(&self, username: &str, priority: Priority, callback: F) -> DispatchResult<RequestHandle>
    where
        F: FnOnce(Envelope<()>) + Send + 'static,
    {
        self.spawn(Unfollow::new(username), priority, callback)
    }

    pub async fn reset_password(&self, username: &str, priority: Priority) -> DispatchResult<Envelope<()>> {
        self.run(PasswordReset::new(username), priority).await
    }

    pub fn reset_password_async<F>(
        &self,
        username: &str,
        priority: Priority,
        callback: F,
    ) -> DispatchResult<RequestHandle>
    where
        F: FnOnce(Envelope<()>) + Send + 'static,
    {
        self.spawn(PasswordReset::new(username), priority, callback)
    }

    pub async fn link_provider(
        &self,
        username: &str,
        provider: &str,
        oauth_token: &str,
        oauth_secret: &str,
        priority: Priority,
    ) -> DispatchResult<Envelope<()>> {
        self.run(link(username, provider, oauth_token, oauth_secret), priority).await
    }

    pub fn link_provider_async<F>(
        &self,
        username: &str,
        provider: &str,
        oauth_token: &str,
        oauth_secret: &str,
        priority: Priority,
        callback: F,
    ) -> DispatchResult<RequestHandle>
    where
        F: FnOnce(Envelope<()>) + Send + 'static,
    {
        self.spawn(link(username, provider, oauth_token, oauth_secret), priority, callback)
    }

    pub async fn unlink_provider(
        &self,
        username: &str,
        provider: &str,
        priority: Priority,
    ) -> DispatchResult<Envelope<()>> {
        self.run(unlink(username, provider), priority).await
    }

    pub fn unlink_provider_async<F>(
        &self,
        username: &str,
        provider: &str,
        priority: Priority,
        callback: F,
    ) -> DispatchResult<RequestHandle>
    where
        F: FnOnce(Envelope<()>) + Send + 'static,
    {
        self.spawn(unlink(username, provider), priority, callback)
    }

    pub async fn linked_providers(
        &self,
        username: &str,
        priority: Priority,
    ) -> DispatchResult<Envelope<Vec<JsonValue>>> {
        self.run(FetchLinkedProviders { username: username.to_string() }, priority).await
    }

    pub fn linked_providers_async<F>(
        &self,
        username: &str,
        priority: Priority,
        callback: F,
    ) -> DispatchResult<RequestHandle>
    where
        F: FnOnce(Envelope<Vec<JsonValue>>) + Send + 'static,
    {
        self.spawn(FetchLinkedProviders { username: username.to_string() }, priority, callback)
    }
}

fn link(username: &str, provider: &str, oauth_token: &str, oauth_secret: &str) -> LinkProvider {
    LinkProvider {
        username: username.to_string(),
        provider: provider.to_string(),
        oauth_token: oauth_token.to_string(),
        oauth_secret: oauth_secret.to_string(),
    }
}

fn unlink(username: &str, provider: &str) -> UnlinkProvider {
    UnlinkProvider { username: username.to_string(), provider: provider.to_string() }
}
