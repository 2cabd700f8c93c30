//! `promote` / `demote`: toggle the manager flag that selects the team
//! dashboard on the home tab.

use simba_core::domain::user::SlackUserId;
use simba_db::{SqlUserRepository, UserRepository};

use crate::commands::{load_config, with_store, CommandResult};

pub fn run(slack_user_id: &str, is_manager: bool) -> CommandResult {
    let command = if is_manager { "promote" } else { "demote" };
    let slack_user_id = slack_user_id.trim();
    if slack_user_id.is_empty() {
        return CommandResult::failure(
            command,
            "invalid_argument",
            "slack user id must not be empty",
            2,
        );
    }

    let config = match load_config(command) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let id = SlackUserId(slack_user_id.to_string());
    let updated = with_store(command, &config, |pool| async move {
        SqlUserRepository::new(pool)
            .set_manager(&id, is_manager)
            .await
            .map_err(|error| ("persistence", error.to_string(), 6u8))
    });

    match updated {
        Ok(Some(user)) => CommandResult::success(
            command,
            format!(
                "{} ({}) {} the team dashboard",
                user.username,
                user.slack_user_id,
                if user.is_manager { "now sees" } else { "no longer sees" }
            ),
        ),
        // Users only exist once they have answered a prompt.
        Ok(None) => CommandResult::failure(
            command,
            "user_not_found",
            format!("no user with slack id `{slack_user_id}` has recorded a mood yet"),
            7,
        ),
        Err(failure) => failure,
    }
}
