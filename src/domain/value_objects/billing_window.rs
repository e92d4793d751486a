use crate::domain::{
    errors::ValidationError,
    value_objects::{
        months::{Month, clamp_lower_bound, clamp_upper_bound, months_between_inclusive},
        subscription_filter::SubscriptionFilter,
        subscriptions::SubscriptionModel,
    },
};

/// Inclusive `[start, end]` month range a summary is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingWindow {
    start: Month,
    end: Month,
}

impl BillingWindow {
    pub fn new(start: Month, end: Month) -> Result<Self, ValidationError> {
        if end < start {
            return Err(ValidationError::field(
                "end_date",
                "end_date must not precede start_date",
            ));
        }
        Ok(Self { start, end })
    }

    /// Both dates of the filter are required here, unlike a search where each is an
    /// independent exact-match predicate.
    pub fn from_filter(filter: &SubscriptionFilter) -> Result<Self, ValidationError> {
        match (filter.start_date, filter.end_date) {
            (Some(start), Some(end)) => Self::new(start, end),
            (None, _) => Err(ValidationError::field(
                "start_date",
                "start_date and end_date are required",
            )),
            (_, None) => Err(ValidationError::field(
                "end_date",
                "start_date and end_date are required",
            )),
        }
    }

    pub fn start(&self) -> Month {
        self.start
    }

    pub fn end(&self) -> Month {
        self.end
    }

    /// Whole months of `subscription` that fall inside the window; 0 when they don't meet.
    pub fn overlap_months(&self, subscription: &SubscriptionModel) -> i64 {
        let overlap_start = clamp_lower_bound(self.start, subscription.start_date);
        let overlap_end = clamp_upper_bound(self.end, subscription.end_date);
        months_between_inclusive(overlap_start, overlap_end).max(0)
    }

    /// Sum of `price * overlap_months` over every subscription. Rows that do not overlap
    /// contribute nothing, so the input does not need to be pre-filtered.
    pub fn total_price(&self, subscriptions: &[SubscriptionModel]) -> i64 {
        subscriptions
            .iter()
            .map(|subscription| i64::from(subscription.price) * self.overlap_months(subscription))
            .sum()
    }
}
