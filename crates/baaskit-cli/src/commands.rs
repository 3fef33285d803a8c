//! Command handlers
//!
//! Each command runs one or two account operations and returns what should be shown; printing
//! is left to `main`.

use crate::app::App;
use crate::cli::Commands;
use crate::error::{CliError, CliResult};
use crate::utils::parse_json_object;
use baaskit_core::{sanitize_json_value, Envelope};
use baaskit_dispatch::{DispatchResult, Priority};
use baaskit_user::{Login, Logout, Registration, User, UserList};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::debug;

/// Result of a command: a status line and an optional payload
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub message: String,
    pub value: Option<JsonValue>,
}

impl Output {
    fn message(message: impl Into<String>) -> Self {
        Self { message: message.into(), value: None }
    }

    fn with_value<T: Serialize>(message: impl Into<String>, value: &T) -> CliResult<Self> {
        let value = sanitize_json_value(&serde_json::to_value(value)?);
        Ok(Self { message: message.into(), value: Some(value) })
    }
}

/// Unwrap both the dispatcher result and the envelope
fn settle<T>(result: DispatchResult<Envelope<T>>) -> CliResult<T> {
    Ok(result??)
}

/// `OS:DEVICE_ID`
fn parse_device(device: &str) -> CliResult<Registration> {
    match device.split_once(':') {
        Some((os, device_id)) if !os.is_empty() && !device_id.is_empty() => Ok(Registration {
            os: os.to_string(),
            device_id: device_id.to_string(),
        }),
        _ => Err(CliError::InvalidArgument(format!(
            "device must look like OS:DEVICE_ID, got '{}'",
            device
        ))),
    }
}

pub async fn run(app: &App, command: Commands, priority: Priority) -> CliResult<Output> {
    let accounts = &app.accounts;
    debug!(?priority, "running command");

    match command {
        Commands::Signup { username, password } => {
            let user = User::new(username).with_password(password);
            let user = settle(accounts.signup(user, priority).await)?;
            Output::with_value(format!("Signed up as {}", user.username), &user)
        }

        Commands::Login { username, password, device } => {
            let mut task = Login::new(username, password);
            if let Some(device) = device {
                task = task.with_registration(parse_device(&device)?);
            }
            let user = settle(accounts.run(task, priority).await)?;
            Output::with_value(format!("Logged in as {}", user.username), &user)
        }

        Commands::Logout { registration } => {
            let current = app.require_current_user()?;
            let mut task = Logout::new(current.clone());
            if let Some(registration) = registration {
                task = task.with_registration(registration);
            }
            settle(accounts.run(task, priority).await)?;
            Ok(Output::message(format!("Logged out {}", current)))
        }

        Commands::Whoami => {
            let current = app.require_current_user()?;
            let user = settle(accounts.fetch(&current, priority).await)?;
            Output::with_value(format!("Logged in as {}", current), &user)
        }

        Commands::Fetch { user } => {
            let username = match user {
                Some(user) => user,
                None => app.require_current_user()?,
            };
            let user = settle(accounts.fetch(&username, priority).await)?;
            Output::with_value(format!("Profile of {}", user.username), &user)
        }

        Commands::Users { filter } => {
            let users = settle(accounts.fetch_users(UserList::All, filter.into(), priority).await)?;
            Output::with_value(format!("{} users", users.len()), &users)
        }

        Commands::Followers { user, filter } => {
            if user.is_none() {
                app.require_current_user()?;
            }
            let list = UserList::Followers(user);
            let users = settle(accounts.fetch_users(list, filter.into(), priority).await)?;
            Output::with_value(format!("{} followers", users.len()), &users)
        }

        Commands::Following { user, filter } => {
            if user.is_none() {
                app.require_current_user()?;
            }
            let list = UserList::Following(user);
            let users = settle(accounts.fetch_users(list, filter.into(), priority).await)?;
            Output::with_value(format!("{} followed users", users.len()), &users)
        }

        Commands::Follow { user } => {
            let followed = settle(accounts.follow(&user, priority).await)?;
            Output::with_value(format!("Now following {}", user), &followed)
        }

        Commands::Unfollow { user } => {
            settle(accounts.unfollow(&user, priority).await)?;
            Ok(Output::message(format!("No longer following {}", user)))
        }

        Commands::ChangePassword { new_password } => {
            let current = app.require_current_user()?;
            settle(accounts.change_password(&current, &new_password, priority).await)?;
            Ok(Output::message(format!("Password changed for {}", current)))
        }

        Commands::ResetPassword { user } => {
            settle(accounts.reset_password(&user, priority).await)?;
            Ok(Output::message(format!("Password reset requested for {}", user)))
        }

        Commands::Save { scope, data } => {
            let current = app.require_current_user()?;
            let values = parse_json_object(&data)?;
            // The server replaces every scope it receives, so start from the stored profile
            let mut profile = settle(accounts.fetch(&current, priority).await)?;
            *profile.scope_mut(scope) = values;
            let saved = settle(accounts.save(profile, priority).await)?;
            Output::with_value(format!("Saved {} data of {}", scope, current), &saved)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device() {
        let registration = parse_device("android:dev-1").unwrap();
        assert_eq!(registration.os, "android");
        assert_eq!(registration.device_id, "dev-1");

        assert!(parse_device("android").is_err());
        assert!(parse_device(":dev-1").is_err());
    }

    #[test]
    fn test_output_is_sanitized() {
        let output =
            Output::with_value("ok", &serde_json::json!({"user": "alice", "password": "pw"})).unwrap();
        let value = output.value.unwrap();
        assert_eq!(value["user"], "alice");
        assert_ne!(value["password"], "pw");
    }
}
