use serde::{Deserialize, Serialize};

use crate::domain::{
    entities::subscriptions::{SubscriptionEntity, UpdateSubscriptionEntity},
    errors::ValidationError,
    value_objects::{
        months::Month,
        subscription_filter::{
            SubscriptionKey, parse_month_field, present, validate_price, validate_service_name,
            validate_user_id,
        },
    },
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubscriptionModel {
    pub user_id: String,
    pub service_name: String,
    pub price: i32,
    pub start_date: Month,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<Month>,
}

impl SubscriptionModel {
    /// Builds a subscription from its parts, enforcing every field rule and
    /// `end_date >= start_date`.
    pub fn new(
        user_id: String,
        service_name: String,
        price: i64,
        start_date: Month,
        end_date: Option<Month>,
    ) -> Result<Self, ValidationError> {
        validate_user_id(&user_id)?;
        validate_service_name(&service_name)?;
        let price = validate_price(price)?;

        if let Some(end_date) = end_date {
            if end_date < start_date {
                return Err(ValidationError::field(
                    "end_date",
                    "end_date must not precede start_date",
                ));
            }
        }

        Ok(Self {
            user_id,
            service_name,
            price,
            start_date,
            end_date,
        })
    }

    pub fn key(&self) -> SubscriptionKey {
        SubscriptionKey {
            user_id: self.user_id.clone(),
            service_name: self.service_name.clone(),
        }
    }
}

/// Create/update request body. Everything is optional on the wire so missing fields
/// produce a validation message instead of a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionInput {
    pub user_id: Option<String>,
    pub service_name: Option<String>,
    pub price: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl SubscriptionInput {
    pub fn into_model(self) -> Result<SubscriptionModel, ValidationError> {
        let user_id = present(self.user_id).ok_or_else(|| {
            ValidationError::field("user_id", "user_id is required correct format UUID")
        })?;
        let service_name = present(self.service_name)
            .ok_or_else(|| ValidationError::field("service_name", "service_name is required"))?;
        let price = self
            .price
            .ok_or_else(|| ValidationError::field("price", "price must be positive"))?;
        let start_date = present(self.start_date)
            .ok_or_else(|| ValidationError::field("start_date", "start_date is required"))?;

        validate_user_id(&user_id)?;
        validate_service_name(&service_name)?;
        validate_price(price)?;
        let start_date = parse_month_field("start_date", &start_date)?;
        let end_date = present(self.end_date)
            .map(|raw| parse_month_field("end_date", &raw))
            .transpose()?;

        SubscriptionModel::new(user_id, service_name, price, start_date, end_date)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubscriptionSummary {
    pub total_price: i64,
}

impl From<SubscriptionEntity> for SubscriptionModel {
    fn from(entity: SubscriptionEntity) -> Self {
        Self {
            user_id: entity.user_id,
            service_name: entity.service_name,
            price: entity.price,
            start_date: Month::from(entity.start_date),
            end_date: entity.end_date.map(Month::from),
        }
    }
}

impl From<&SubscriptionModel> for SubscriptionEntity {
    fn from(model: &SubscriptionModel) -> Self {
        Self {
            user_id: model.user_id.clone(),
            service_name: model.service_name.clone(),
            price: model.price,
            start_date: model.start_date.first_day(),
            end_date: model.end_date.map(|m| m.first_day()),
        }
    }
}

impl From<&SubscriptionModel> for UpdateSubscriptionEntity {
    fn from(model: &SubscriptionModel) -> Self {
        Self {
            price: model.price,
            start_date: model.start_date.first_day(),
            end_date: model.end_date.map(|m| m.first_day()),
        }
    }
}
