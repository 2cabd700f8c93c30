use crate::commands::{load_config, with_store, CommandResult};

pub fn run() -> CommandResult {
    let config = match load_config("migrate") {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    match with_store("migrate", &config, |_pool| async { Ok(()) }) {
        Ok(()) => CommandResult::success("migrate", "users and daily_moods tables are up to date"),
        Err(failure) => failure,
    }
}
