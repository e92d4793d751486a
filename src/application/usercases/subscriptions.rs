use std::{future::Future, sync::Arc};

use axum::http::StatusCode;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
    application::deadline::Deadline,
    domain::{
        entities::subscriptions::{SubscriptionEntity, UpdateSubscriptionEntity},
        errors::ValidationError,
        repositories::subscriptions::{SubscriptionRepository, UpdateOutcome},
        value_objects::{
            billing_window::BillingWindow,
            subscription_filter::{SubscriptionFilterInput, SubscriptionKeyInput},
            subscriptions::{SubscriptionInput, SubscriptionModel, SubscriptionSummary},
        },
    },
};

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error(transparent)]
    Parse(ValidationError),
    #[error(transparent)]
    Validation(ValidationError),
    #[error("subscription not found")]
    NotFound,
    #[error("storage call timed out")]
    Timeout,
    #[error(transparent)]
    Storage(anyhow::Error),
}

impl From<ValidationError> for SubscriptionError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::Date { .. } => SubscriptionError::Parse(err),
            ValidationError::Field { .. } => SubscriptionError::Validation(err),
        }
    }
}

impl SubscriptionError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SubscriptionError::Parse(_) | SubscriptionError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            SubscriptionError::NotFound => StatusCode::NOT_FOUND,
            SubscriptionError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            SubscriptionError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, SubscriptionError>;

pub struct SubscriptionUseCase<T>
where
    T: SubscriptionRepository + Send + Sync,
{
    subscription_repository: Arc<T>,
}

impl<T> SubscriptionUseCase<T>
where
    T: SubscriptionRepository + Send + Sync,
{
    pub fn new(subscription_repository: Arc<T>) -> Self {
        Self {
            subscription_repository,
        }
    }

    pub async fn search(
        &self,
        filter_input: SubscriptionFilterInput,
        deadline: Deadline,
    ) -> UseCaseResult<Vec<SubscriptionModel>> {
        let filter = filter_input.validate().map_err(|err| {
            warn!(field = err.field_name(), error = %err, "subscriptions: invalid search filter");
            SubscriptionError::from(err)
        })?;

        debug!(?filter, "subscriptions: searching");
        let entities = storage_call(
            "search",
            deadline,
            self.subscription_repository.search(&filter),
        )
        .await?;

        if entities.is_empty() {
            info!(?filter, "subscriptions: no subscription found");
            return Ok(Vec::new());
        }

        let subscriptions: Vec<SubscriptionModel> =
            entities.into_iter().map(SubscriptionModel::from).collect();
        info!(
            count = subscriptions.len(),
            "subscriptions: search returned results"
        );
        Ok(subscriptions)
    }

    pub async fn summarize(
        &self,
        filter_input: SubscriptionFilterInput,
        deadline: Deadline,
    ) -> UseCaseResult<SubscriptionSummary> {
        let filter = filter_input.validate().map_err(|err| {
            warn!(field = err.field_name(), error = %err, "subscriptions: invalid summary filter");
            SubscriptionError::from(err)
        })?;
        let window = BillingWindow::from_filter(&filter).map_err(|err| {
            warn!(field = err.field_name(), error = %err, "subscriptions: invalid billing window");
            SubscriptionError::from(err)
        })?;

        let entities = storage_call(
            "find_overlapping",
            deadline,
            self.subscription_repository.find_overlapping(
                window.start(),
                window.end(),
                filter.user_id.clone(),
                filter.service_name.clone(),
            ),
        )
        .await?;

        let subscriptions: Vec<SubscriptionModel> =
            entities.into_iter().map(SubscriptionModel::from).collect();
        let total_price = window.total_price(&subscriptions);

        info!(
            window_start = %window.start(),
            window_end = %window.end(),
            matched = subscriptions.len(),
            total_price,
            "subscriptions: summary computed"
        );
        Ok(SubscriptionSummary { total_price })
    }

    pub async fn create_subscription(
        &self,
        input: SubscriptionInput,
        deadline: Deadline,
    ) -> UseCaseResult<()> {
        let subscription = input.into_model().map_err(|err| {
            warn!(field = err.field_name(), error = %err, "subscriptions: invalid subscription input");
            SubscriptionError::from(err)
        })?;

        storage_call(
            "create",
            deadline,
            self.subscription_repository
                .create(SubscriptionEntity::from(&subscription)),
        )
        .await?;

        info!(
            user_id = %subscription.user_id,
            service_name = %subscription.service_name,
            "subscriptions: subscription created"
        );
        Ok(())
    }

    pub async fn update_subscription(
        &self,
        input: SubscriptionInput,
        deadline: Deadline,
    ) -> UseCaseResult<()> {
        let subscription = input.into_model().map_err(|err| {
            warn!(field = err.field_name(), error = %err, "subscriptions: invalid subscription input");
            SubscriptionError::from(err)
        })?;

        let outcome = storage_call(
            "update",
            deadline,
            self.subscription_repository.update(
                subscription.key(),
                UpdateSubscriptionEntity::from(&subscription),
            ),
        )
        .await?;

        match outcome {
            UpdateOutcome::Updated => {}
            UpdateOutcome::NotFound => {
                warn!(
                    user_id = %subscription.user_id,
                    service_name = %subscription.service_name,
                    "subscriptions: no subscription found to update"
                );
                return Err(SubscriptionError::NotFound);
            }
            UpdateOutcome::EndBeforeStart => {
                warn!(
                    user_id = %subscription.user_id,
                    service_name = %subscription.service_name,
                    start_date = %subscription.start_date,
                    "subscriptions: stored end_date precedes the new start_date"
                );
                return Err(SubscriptionError::Validation(ValidationError::field(
                    "end_date",
                    "end_date must not precede start_date",
                )));
            }
        }

        info!(
            user_id = %subscription.user_id,
            service_name = %subscription.service_name,
            "subscriptions: subscription updated"
        );
        Ok(())
    }

    /// Deletion ignores whether the subscription's range has already ended.
    pub async fn delete_subscription(
        &self,
        key_input: SubscriptionKeyInput,
        deadline: Deadline,
    ) -> UseCaseResult<()> {
        let key = key_input.validate()?;

        let affected = storage_call(
            "delete",
            deadline,
            self.subscription_repository.delete(key.clone()),
        )
        .await?;

        if affected == 0 {
            warn!(
                user_id = %key.user_id,
                service_name = %key.service_name,
                "subscriptions: no subscription found to delete"
            );
            return Err(SubscriptionError::NotFound);
        }

        info!(
            user_id = %key.user_id,
            service_name = %key.service_name,
            "subscriptions: subscription deleted"
        );
        Ok(())
    }

    pub fn close(&self) {
        self.subscription_repository.close();
        info!("subscriptions: repository closed");
    }
}

async fn storage_call<F, R>(operation: &'static str, deadline: Deadline, future: F) -> UseCaseResult<R>
where
    F: Future<Output = anyhow::Result<R>>,
{
    let budget = deadline.remaining();
    match deadline.run(future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => {
            error!(operation, db_error = ?err, "subscriptions: storage call failed");
            Err(SubscriptionError::Storage(err))
        }
        Err(_) => {
            warn!(
                operation,
                budget_ms = u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
                "subscriptions: storage call exceeded its deadline"
            );
            Err(SubscriptionError::Timeout)
        }
    }
}
