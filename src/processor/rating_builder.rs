use std::time::Duration;

use tracing::{debug, trace};

use posterforge_common::{Error, Item, Result, RunContext};

use super::stage;
use crate::ratings::RatingService;

/// Fills in ratings an item does not carry yet.
///
/// Services are queried one after another in registration order. A service
/// is skipped when it has no platform or when the item already has any
/// rating from that provider. Each call gets its own deadline, clamped by
/// the caller's context. A call that outlives its own deadline fails with
/// [`Error::Timeout`]; only a stopped caller surfaces as a cancellation.
pub struct RatingBuilder {
    services: Vec<RatingService>,
    timeout: Duration,
}

impl RatingBuilder {
    pub fn new(services: Vec<RatingService>, timeout: Duration) -> Self {
        Self { services, timeout }
    }

    pub async fn resolve(&self, ctx: &RunContext, item: &mut Item) -> Result<()> {
        for service in &self.services {
            let Some(platform) = &service.platform else {
                continue;
            };
            if item.ratings.has_provider(service.name) {
                trace!(title = %item.title, provider = %service.name, "rating already present");
                continue;
            }

            ctx.check(stage::RATINGS)?;
            let call = ctx.child_with_timeout(self.timeout);
            let ratings = call
                .run(stage::RATING_FETCH, platform.get_rating(&call, item))
                .await
                .map_err(|e| {
                    let source = if e.is_cancellation() && ctx.cause().is_none() {
                        Error::Timeout {
                            stage: stage::RATING_FETCH,
                            timeout: self.timeout,
                        }
                    } else {
                        e
                    };
                    Error::RatingFetch {
                        provider: service.name.to_string(),
                        source: Box::new(source),
                    }
                })?;

            for rating in ratings {
                if !item.ratings.insert(rating) {
                    debug!(
                        title = %item.title,
                        provider = %rating.name,
                        rating_type = %rating.rating_type,
                        score = rating.score,
                        "dropping duplicate or non-numeric rating"
                    );
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    use posterforge_common::{Rating, RatingName, RatingType};

    use crate::ratings::RatingPlatform;

    enum Reply {
        Scores(Vec<Rating>),
        Fail,
        Stall,
    }

    struct Scripted {
        name: RatingName,
        reply: Reply,
        log: Arc<Mutex<Vec<RatingName>>>,
    }

    #[async_trait]
    impl RatingPlatform for Scripted {
        async fn get_rating(&self, _ctx: &RunContext, _item: &Item) -> Result<Vec<Rating>> {
            self.log.lock().push(self.name);
            match &self.reply {
                Reply::Scores(scores) => Ok(scores.clone()),
                Reply::Fail => Err(Error::internal("provider unavailable")),
                Reply::Stall => {
                    tokio::time::sleep(Duration::from_secs(600)).await;
                    Ok(Vec::new())
                }
            }
        }
    }

    fn service(name: RatingName, reply: Reply, log: &Arc<Mutex<Vec<RatingName>>>) -> RatingService {
        RatingService {
            name,
            platform: Some(Arc::new(Scripted {
                name,
                reply,
                log: log.clone(),
            })),
            logo: None,
        }
    }

    fn audience(name: RatingName, score: f64) -> Rating {
        Rating::new(name, RatingType::Audience, score)
    }

    #[tokio::test]
    async fn services_are_queried_in_registration_order() {
        let log = Arc::default();
        let builder = RatingBuilder::new(
            vec![
                service(RatingName::Tmdb, Reply::Scores(vec![audience(RatingName::Tmdb, 7.1)]), &log),
                service(RatingName::Imdb, Reply::Scores(vec![audience(RatingName::Imdb, 8.0)]), &log),
            ],
            Duration::from_secs(5),
        );
        let mut item = Item::new("1", "Heat");

        builder.resolve(&RunContext::new(), &mut item).await.unwrap();

        assert_eq!(*log.lock(), vec![RatingName::Tmdb, RatingName::Imdb]);
        assert_eq!(item.ratings.len(), 2);
    }

    #[tokio::test]
    async fn provider_already_present_is_not_queried() {
        let log = Arc::default();
        let builder = RatingBuilder::new(
            vec![service(RatingName::Tmdb, Reply::Scores(vec![audience(RatingName::Tmdb, 2.0)]), &log)],
            Duration::from_secs(5),
        );
        let mut item = Item::new("1", "Heat");
        item.ratings.insert(Rating::new(RatingName::Tmdb, RatingType::Critic, 9.0));

        builder.resolve(&RunContext::new(), &mut item).await.unwrap();

        assert!(log.lock().is_empty());
        assert_eq!(item.ratings.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_and_nan_scores_are_dropped() {
        let log = Arc::default();
        let builder = RatingBuilder::new(
            vec![service(
                RatingName::Tmdb,
                Reply::Scores(vec![
                    audience(RatingName::Tmdb, 6.5),
                    audience(RatingName::Tmdb, 9.9),
                    Rating::new(RatingName::Tmdb, RatingType::Critic, f64::NAN),
                ]),
                &log,
            )],
            Duration::from_secs(5),
        );
        let mut item = Item::new("1", "Heat");

        builder.resolve(&RunContext::new(), &mut item).await.unwrap();

        assert_eq!(item.ratings.len(), 1);
        let kept = item.ratings.get(RatingName::Tmdb, RatingType::Audience).unwrap();
        assert_eq!(kept.score, 6.5);
    }

    #[tokio::test]
    async fn provider_error_names_the_provider() {
        let log = Arc::default();
        let builder = RatingBuilder::new(
            vec![
                service(RatingName::Tmdb, Reply::Fail, &log),
                service(RatingName::Imdb, Reply::Scores(vec![audience(RatingName::Imdb, 8.0)]), &log),
            ],
            Duration::from_secs(5),
        );
        let mut item = Item::new("1", "Heat");

        let err = builder.resolve(&RunContext::new(), &mut item).await.unwrap_err();

        assert_matches!(
            &err,
            Error::RatingFetch { provider, source }
                if *provider == RatingName::Tmdb.to_string() && matches!(**source, Error::Internal(_))
        );
        assert!(!err.is_cancellation());
        assert_eq!(*log.lock(), vec![RatingName::Tmdb]);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_times_out_without_stopping_the_caller() {
        let log = Arc::default();
        let builder = RatingBuilder::new(
            vec![service(RatingName::Tmdb, Reply::Stall, &log)],
            Duration::from_secs(1),
        );
        let ctx = RunContext::new();
        let mut item = Item::new("1", "Heat");

        let err = builder.resolve(&ctx, &mut item).await.unwrap_err();

        assert_matches!(
            &err,
            Error::RatingFetch { source, .. }
                if matches!(**source, Error::Timeout { stage: stage::RATING_FETCH, .. })
        );
        assert!(!err.is_cancellation());
        assert!(!err.is_deadline_exceeded());
        assert!(!ctx.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn caller_deadline_stays_a_cancellation() {
        let log = Arc::default();
        let builder = RatingBuilder::new(
            vec![service(RatingName::Tmdb, Reply::Stall, &log)],
            Duration::from_secs(30),
        );
        let ctx = RunContext::with_timeout(Duration::from_secs(1));
        let mut item = Item::new("1", "Heat");

        let err = builder.resolve(&ctx, &mut item).await.unwrap_err();

        assert_matches!(err, Error::RatingFetch { .. });
        assert!(err.is_cancellation());
        assert!(err.is_deadline_exceeded());
    }

    #[tokio::test]
    async fn cancelled_caller_queries_nothing() {
        let log = Arc::default();
        let builder = RatingBuilder::new(
            vec![service(RatingName::Tmdb, Reply::Fail, &log)],
            Duration::from_secs(5),
        );
        let ctx = RunContext::new();
        ctx.cancel();
        let mut item = Item::new("1", "Heat");

        let err = builder.resolve(&ctx, &mut item).await.unwrap_err();

        assert!(err.is_cancellation());
        assert!(log.lock().is_empty());
    }
}
