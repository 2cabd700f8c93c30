pub mod aggregate;
pub mod config;
pub mod domain;
pub mod errors;
pub mod thread_slot;

pub use aggregate::{
    count_by_category, global_breakdown, per_user_breakdown, percentages, MoodWindow,
};
pub use domain::mood::{DailyMood, Mood, MoodId, ThreadKey};
pub use domain::user::{NewUser, SlackUserId, User, UserId, UserWithMoods};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use thread_slot::{CurrentThread, ThreadNotifier};
