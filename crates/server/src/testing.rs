//! Scripted collaborators for service and route tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use simba_core::domain::user::SlackUserId;
use simba_core::thread_slot::{spawn_writer, CurrentThread};
use simba_db::{
    connect_with_settings, migrations, DbPool, MoodLedger, SqlMoodRepository, SqlUserRepository,
};
use simba_slack::blocks::{MessageTemplate, QuoteOfTheDay};
use simba_slack::views::View;
use simba_slack::{SlackApi, SlackApiError, SlackProfile};

use crate::content::ContentProvider;
use crate::home::HomeRenderer;
use crate::service::MoodService;

#[derive(Clone, Debug, PartialEq)]
pub enum SlackCall {
    PostMessage { channel: String, message: MessageTemplate },
    UpdateMessage { channel: String, ts: String },
    PostEphemeral { channel: String, user: String, message: MessageTemplate },
    OpenModal { trigger_id: String, view: View },
    PublishHome { user: String, view: View },
    OpenDirectMessage { user: String },
}

#[derive(Default)]
pub struct FakeSlack {
    calls: Mutex<Vec<SlackCall>>,
    names: HashMap<String, String>,
    admins: HashSet<String>,
    members: HashMap<String, Vec<String>>,
    failing_profiles: bool,
    next_ts: AtomicU64,
}

impl FakeSlack {
    pub fn with_profile(mut self, user: &str, name: &str) -> Self {
        self.names.insert(user.to_owned(), name.to_owned());
        self
    }

    pub fn with_admin(mut self, user: &str) -> Self {
        self.admins.insert(user.to_owned());
        self
    }

    pub fn with_members(mut self, channel: &str, members: &[&str]) -> Self {
        self.members.insert(channel.to_owned(), members.iter().map(|id| id.to_string()).collect());
        self
    }

    pub fn failing_profiles(mut self) -> Self {
        self.failing_profiles = true;
        self
    }

    pub fn calls(&self) -> Vec<SlackCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    /// Polls until a recorded call matches, for work dispatched off the request task.
    pub async fn wait_for(&self, predicate: impl Fn(&SlackCall) -> bool) {
        let polled = tokio::time::timeout(Duration::from_secs(2), async {
            while !self.calls().iter().any(&predicate) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(polled.is_ok(), "no matching slack call in {:?}", self.calls());
    }

    fn record(&self, call: SlackCall) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

#[async_trait]
impl SlackApi for FakeSlack {
    async fn user_profile(&self, user: &SlackUserId) -> Result<SlackProfile, SlackApiError> {
        if self.failing_profiles {
            return Err(SlackApiError::Api { method: "users.info", error: "user_not_found".into() });
        }
        Ok(SlackProfile {
            user_id: user.0.clone(),
            display_name: self.names.get(user.as_str()).cloned(),
            real_name: None,
            is_admin: self.admins.contains(user.as_str()),
        })
    }

    async fn post_message(
        &self,
        channel: &str,
        message: &MessageTemplate,
    ) -> Result<String, SlackApiError> {
        self.record(SlackCall::PostMessage {
            channel: channel.to_owned(),
            message: message.clone(),
        });
        let sequence = self.next_ts.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("1700000000.{sequence:06}"))
    }

    async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        _message: &MessageTemplate,
    ) -> Result<(), SlackApiError> {
        self.record(SlackCall::UpdateMessage { channel: channel.to_owned(), ts: ts.to_owned() });
        Ok(())
    }

    async fn post_ephemeral(
        &self,
        channel: &str,
        user: &SlackUserId,
        message: &MessageTemplate,
    ) -> Result<(), SlackApiError> {
        self.record(SlackCall::PostEphemeral {
            channel: channel.to_owned(),
            user: user.0.clone(),
            message: message.clone(),
        });
        Ok(())
    }

    async fn open_modal(&self, trigger_id: &str, view: &View) -> Result<(), SlackApiError> {
        self.record(SlackCall::OpenModal { trigger_id: trigger_id.to_owned(), view: view.clone() });
        Ok(())
    }

    async fn publish_home_view(
        &self,
        user: &SlackUserId,
        view: &View,
    ) -> Result<(), SlackApiError> {
        self.record(SlackCall::PublishHome { user: user.0.clone(), view: view.clone() });
        Ok(())
    }

    async fn list_channel_members(&self, channel: &str) -> Result<Vec<String>, SlackApiError> {
        self.members.get(channel).cloned().ok_or_else(|| SlackApiError::Api {
            method: "conversations.members",
            error: "channel_not_found".into(),
        })
    }

    async fn open_direct_message(&self, user: &SlackUserId) -> Result<String, SlackApiError> {
        self.record(SlackCall::OpenDirectMessage { user: user.0.clone() });
        Ok(format!("D-{}", user.as_str()))
    }
}

pub struct FixedContent;

#[async_trait]
impl ContentProvider for FixedContent {
    async fn quote_of_the_day(&self) -> QuoteOfTheDay {
        QuoteOfTheDay { text: "Hakuna matata".into(), author: "Timon".into() }
    }

    fn buzz_word(&self) -> String {
        "hakuna matata".into()
    }

    async fn gif_for(&self, _buzz_word: &str) -> Option<String> {
        Some("https://gif.example/lion.gif".into())
    }
}

pub async fn memory_pool() -> DbPool {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect test pool");
    migrations::run_pending(&pool).await.expect("run migrations");
    pool
}

pub async fn memory_ledger() -> (DbPool, MoodLedger) {
    let pool = memory_pool().await;
    let ledger = MoodLedger::new(
        Arc::new(SqlUserRepository::new(pool.clone())),
        Arc::new(SqlMoodRepository::new(pool.clone())),
    );
    (pool, ledger)
}

pub struct Harness {
    pub pool: DbPool,
    pub ledger: MoodLedger,
    pub slack: Arc<FakeSlack>,
    pub register: CurrentThread,
    pub service: MoodService,
}

pub async fn harness(slack: FakeSlack) -> Harness {
    harness_with_content(slack, Arc::new(FixedContent)).await
}

pub async fn harness_with_content(slack: FakeSlack, content: Arc<dyn ContentProvider>) -> Harness {
    let (pool, ledger) = memory_ledger().await;
    let slack = Arc::new(slack);
    let register = CurrentThread::default();
    let (notifier, _writer) = spawn_writer(register.clone());
    let service = MoodService::new(
        ledger.clone(),
        slack.clone(),
        content,
        HomeRenderer::new(ledger.clone(), slack.clone()),
        register.clone(),
        notifier,
        "C-prompt".to_owned(),
    );
    Harness { pool, ledger, slack, register, service }
}
