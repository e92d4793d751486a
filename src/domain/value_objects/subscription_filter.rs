use serde::{Deserialize, Serialize};

use crate::domain::{errors::ValidationError, value_objects::months::Month};

pub const USER_ID_LEN: usize = 36;
pub const MAX_SERVICE_NAME_LEN: usize = 255;

/// Raw filter as it arrives from a query string. Every field is optional and kept as
/// text until [`SubscriptionFilterInput::validate`] runs; empty strings count as absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionFilterInput {
    pub user_id: Option<String>,
    pub service_name: Option<String>,
    pub price: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

/// Validated filter. `None` means "no constraint", never "equals null".
///
/// For a search the date pair are exact-match predicates. For a summary they are the
/// billing window (see [`BillingWindow`](super::billing_window::BillingWindow)).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionFilter {
    pub user_id: Option<String>,
    pub service_name: Option<String>,
    pub price: Option<i32>,
    pub start_date: Option<Month>,
    pub end_date: Option<Month>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl SubscriptionFilterInput {
    pub fn validate(self) -> Result<SubscriptionFilter, ValidationError> {
        let user_id = present(self.user_id)
            .map(|v| validate_user_id(&v).map(|_| v))
            .transpose()?;
        let service_name = present(self.service_name)
            .map(|v| validate_service_name(&v).map(|_| v))
            .transpose()?;
        let price = present(self.price)
            .map(|v| parse_price(&v))
            .transpose()?;
        let start_date = present(self.start_date)
            .map(|v| parse_month_field("start_date", &v))
            .transpose()?;
        let end_date = present(self.end_date)
            .map(|v| parse_month_field("end_date", &v))
            .transpose()?;
        let limit = present(self.limit)
            .map(|v| parse_limit(&v))
            .transpose()?;
        let offset = present(self.offset)
            .map(|v| parse_offset(&v))
            .transpose()?;

        Ok(SubscriptionFilter {
            user_id,
            service_name,
            price,
            start_date,
            end_date,
            limit,
            offset,
        })
    }
}

/// JSON body of a summary request. Only identity and window fields take part.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SummaryInput {
    pub user_id: Option<String>,
    pub service_name: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl From<SummaryInput> for SubscriptionFilterInput {
    fn from(input: SummaryInput) -> Self {
        SubscriptionFilterInput {
            user_id: input.user_id,
            service_name: input.service_name,
            start_date: input.start_date,
            end_date: input.end_date,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionKeyInput {
    pub user_id: Option<String>,
    pub service_name: Option<String>,
}

/// Identity of a stored subscription, used by update and delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionKey {
    pub user_id: String,
    pub service_name: String,
}

impl SubscriptionKeyInput {
    pub fn validate(self) -> Result<SubscriptionKey, ValidationError> {
        let (Some(user_id), Some(service_name)) = (present(self.user_id), present(self.service_name))
        else {
            return Err(ValidationError::field(
                "user_id",
                "user_id and service_name are required",
            ));
        };

        validate_user_id(&user_id)?;
        validate_service_name(&service_name)?;

        Ok(SubscriptionKey {
            user_id,
            service_name,
        })
    }
}

pub(crate) fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

pub(crate) fn validate_user_id(user_id: &str) -> Result<(), ValidationError> {
    if user_id.chars().count() != USER_ID_LEN {
        return Err(ValidationError::field(
            "user_id",
            "user_id must be correct format UUID",
        ));
    }
    Ok(())
}

pub(crate) fn validate_service_name(service_name: &str) -> Result<(), ValidationError> {
    if service_name.is_empty() {
        return Err(ValidationError::field(
            "service_name",
            "service_name must not be empty",
        ));
    }
    if service_name.chars().count() > MAX_SERVICE_NAME_LEN {
        return Err(ValidationError::field(
            "service_name",
            format!("service_name must not exceed {MAX_SERVICE_NAME_LEN} characters"),
        ));
    }
    Ok(())
}

pub(crate) fn validate_price(price: i64) -> Result<i32, ValidationError> {
    if price <= 0 {
        return Err(ValidationError::field("price", "price must be positive"));
    }
    i32::try_from(price).map_err(|_| ValidationError::field("price", "price is too large"))
}

pub(crate) fn parse_month_field(
    field: &'static str,
    raw: &str,
) -> Result<Month, ValidationError> {
    Month::parse(raw).map_err(|source| ValidationError::Date { field, source })
}

fn parse_price(raw: &str) -> Result<i32, ValidationError> {
    let price = raw
        .parse::<i64>()
        .map_err(|_| ValidationError::field("price", "price must be a positive integer"))?;
    validate_price(price)
}

fn parse_limit(raw: &str) -> Result<i64, ValidationError> {
    match raw.parse::<i64>() {
        Ok(limit) if limit > 0 => Ok(limit),
        Ok(_) => Err(ValidationError::field("limit", "limit must be positive")),
        Err(_) => Err(ValidationError::field(
            "limit",
            "limit must be a positive integer",
        )),
    }
}

fn parse_offset(raw: &str) -> Result<i64, ValidationError> {
    match raw.parse::<i64>() {
        Ok(offset) if offset >= 0 => Ok(offset),
        Ok(_) => Err(ValidationError::field("offset", "offset must be non-negative")),
        Err(_) => Err(ValidationError::field(
            "offset",
            "offset must be a non-negative integer",
        )),
    }
}
