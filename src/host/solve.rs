use chrono::Utc;
use log::debug;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::ActiveModelTrait;

use super::Host;
use super::hooks::{SolveEvent, SolveRequest};
use crate::entities::{challenges, solves, teams, users};
use crate::error::SolveError;
use crate::utils::config::UserMode;

/// Records an accepted submission, then runs every registered post-solve observer.
///
/// Observers only run once the solve is stored; a failure to store it is returned as-is.
pub async fn record(
    host: &Host,
    user: &users::Model,
    team: Option<&teams::Model>,
    challenge: &challenges::Model,
    request: SolveRequest,
) -> Result<solves::Model, SolveError> {
    let solve = base_solve(host, user, team, challenge, &request).await?;

    let event = SolveEvent {
        user: user.clone(),
        team: team.cloned(),
        challenge: challenge.clone(),
        request,
    };
    host.hooks.notify(&event).await;
    Ok(solve)
}

async fn base_solve(
    host: &Host,
    user: &users::Model,
    team: Option<&teams::Model>,
    challenge: &challenges::Model,
    request: &SolveRequest,
) -> Result<solves::Model, SolveError> {
    if host.config.user_mode().await? == UserMode::Teams && team.is_none() {
        return Err(SolveError::MissingTeam);
    }

    let solve = solves::ActiveModel {
        id: NotSet,
        challenge_id: Set(challenge.id),
        user_id: Set(user.id),
        team_id: Set(team.map(|t| t.id)),
        ip: Set(request.ip.map(|ip| ip.to_string())),
        provided: Set(request.provided.clone()),
        date: Set(Utc::now()),
    }
    .insert(&host.db)
    .await?;
    debug!("User {} solved challenge {}", user.id, challenge.id);
    Ok(solve)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::prelude::*;
    use crate::error::HookError;
    use crate::host::hooks::SolveObserver;
    use crate::test_support::{challenge, memory_host, team, user};
    use crate::utils::config::USER_MODE;
    use async_trait::async_trait;
    use sea_orm::{EntityTrait, PaginatorTrait};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Seen(Arc<AtomicUsize>);

    #[async_trait]
    impl SolveObserver for Seen {
        fn id(&self) -> &'static str {
            "seen"
        }

        async fn on_solve(&self, _event: &SolveEvent) -> Result<(), HookError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn stores_solve_then_notifies() {
        let host = memory_host().await;
        let seen = Arc::new(AtomicUsize::new(0));
        host.hooks.register(Arc::new(Seen(seen.clone())));
        let alice = user(&host, "alice", None).await;
        let chal = challenge(&host, "warmup").await;

        let request = SolveRequest {
            ip: Some("10.0.0.1".parse().unwrap()),
            provided: "flag{x}".into(),
        };
        let solve = record(&host, &alice, None, &chal, request).await.unwrap();

        assert_eq!(solve.challenge_id, chal.id);
        assert_eq!(solve.ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(Solves::find().count(&host.db).await.unwrap(), 1);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn teams_mode_requires_a_team_and_skips_observers() {
        let host = memory_host().await;
        host.config.set(USER_MODE, "teams").await.unwrap();
        let seen = Arc::new(AtomicUsize::new(0));
        host.hooks.register(Arc::new(Seen(seen.clone())));
        let alice = user(&host, "alice", None).await;
        let chal = challenge(&host, "warmup").await;

        let err = record(&host, &alice, None, &chal, SolveRequest::default()).await;
        assert!(matches!(err, Err(SolveError::MissingTeam)));
        assert_eq!(seen.load(Ordering::SeqCst), 0);

        let red = team(&host, "red").await;
        record(&host, &alice, Some(&red), &chal, SolveRequest::default()).await.unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn padded_teams_mode_still_requires_a_team() {
        let host = memory_host().await;
        host.config.set(USER_MODE, " teams\n").await.unwrap();
        let alice = user(&host, "alice", None).await;
        let chal = challenge(&host, "warmup").await;

        let err = record(&host, &alice, None, &chal, SolveRequest::default()).await;
        assert!(matches!(err, Err(SolveError::MissingTeam)));
        assert_eq!(Solves::find().count(&host.db).await.unwrap(), 0);
    }
}
