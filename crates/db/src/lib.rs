pub mod connection;
pub mod ledger;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_config, connect_with_settings, DbPool};
pub use ledger::{LedgerError, MoodLedger};
pub use repositories::{
    MoodRepository, RepositoryError, SqlMoodRepository, SqlUserRepository, UserRepository,
};
