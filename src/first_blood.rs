use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter};

use crate::entities::{prelude::*, solves, teams, users};
use crate::error::HookError;
use crate::host::Host;
use crate::host::hooks::{SolveEvent, SolveObserver};
use crate::notify::{Dispatcher, Message};
use crate::utils::config::{ConfigStore, NotifyConfig, UserMode};
use crate::utils::template::{MAX_NAME_CHARS, render, truncate};

pub const OBSERVER_ID: &str = "notify.first_blood";
pub const TITLE: &str = "First Blood";

/// Announces the first valid solve of each challenge.
pub struct FirstBlood {
    config: ConfigStore,
    db: DatabaseConnection,
    dispatcher: Arc<Dispatcher>,
}

impl FirstBlood {
    pub fn new(host: &Host, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            config: host.config.clone(),
            db: host.db.clone(),
            dispatcher,
        }
    }

    /// Returns the message to send when this solve is the challenge's only valid one.
    pub async fn check(
        &self,
        event: &SolveEvent,
    ) -> Result<Option<(NotifyConfig, Message)>, HookError> {
        let cfg = NotifyConfig::load(&self.config).await?;
        if !cfg.notify_firstblood {
            return Ok(None);
        }

        let count = valid_solve_count(&self.db, event.challenge.id, cfg.user_mode).await?;
        if count != 1 {
            return Ok(None);
        }

        let solver = match (cfg.user_mode, &event.team) {
            (UserMode::Teams, Some(team)) => team.name.as_str(),
            _ => event.user.name.as_str(),
        };
        let text = render(
            &cfg.firstblood_text,
            &[
                ("solver", truncate(solver, MAX_NAME_CHARS)),
                ("challenge", truncate(&event.challenge.name, MAX_NAME_CHARS)),
            ],
        );
        Ok(Some((cfg, Message::new(TITLE, text))))
    }
}

#[async_trait]
impl SolveObserver for FirstBlood {
    fn id(&self) -> &'static str {
        OBSERVER_ID
    }

    async fn on_solve(&self, event: &SolveEvent) -> Result<(), HookError> {
        if let Some((cfg, msg)) = self.check(event).await? {
            info!("First blood on challenge {} by user {}", event.challenge.id, event.user.id);
            // The solver's request should not wait on the chat api.
            let dispatcher = Arc::clone(&self.dispatcher);
            tokio::spawn(async move {
                dispatcher.dispatch(&cfg, &msg).await;
            });
        }
        Ok(())
    }
}

/// Solves of a challenge by accounts that are neither banned nor hidden.
pub async fn valid_solve_count(
    db: &DatabaseConnection,
    challenge_id: i32,
    mode: UserMode,
) -> Result<u64, DbErr> {
    let query = Solves::find().filter(solves::Column::ChallengeId.eq(challenge_id));
    let query = match mode {
        UserMode::Teams => query
            .inner_join(Teams)
            .filter(teams::Column::Banned.eq(false))
            .filter(teams::Column::Hidden.eq(false)),
        UserMode::Users => query
            .inner_join(Users)
            .filter(users::Column::Banned.eq(false))
            .filter(users::Column::Hidden.eq(false)),
    };
    query.count(db).await
}
