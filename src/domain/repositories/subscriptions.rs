use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::{
    entities::subscriptions::{SubscriptionEntity, UpdateSubscriptionEntity},
    value_objects::{
        months::Month,
        subscription_filter::{SubscriptionFilter, SubscriptionKey},
    },
};

/// Result of an update keyed by `(user_id, service_name)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    NotFound,
    /// The row exists but its stored end date would precede the new start date.
    EndBeforeStart,
}

#[automock]
#[async_trait]
pub trait SubscriptionRepository {
    /// Every present filter field narrows the result by equality; absent fields add nothing.
    async fn search(&self, filter: &SubscriptionFilter) -> Result<Vec<SubscriptionEntity>>;

    /// Rows whose active range meets `[window_start, window_end]`, i.e.
    /// `start_date <= window_end AND (end_date IS NULL OR end_date >= window_start)`.
    async fn find_overlapping(
        &self,
        window_start: Month,
        window_end: Month,
        user_id: Option<String>,
        service_name: Option<String>,
    ) -> Result<Vec<SubscriptionEntity>>;

    async fn create(&self, subscription_entity: SubscriptionEntity) -> Result<()>;

    /// An absent end date keeps the stored one, provided it does not precede the new
    /// start date.
    async fn update(
        &self,
        key: SubscriptionKey,
        update_subscription_entity: UpdateSubscriptionEntity,
    ) -> Result<UpdateOutcome>;

    /// Returns the number of rows deleted.
    async fn delete(&self, key: SubscriptionKey) -> Result<usize>;

    /// Releases the connection pool. Safe to call more than once.
    fn close(&self);
}
