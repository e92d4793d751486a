use chrono::NaiveDate;
use diesel::prelude::*;

use crate::infrastructure::postgres::schema::subscriptions;

/// Row of the `subscriptions` table. Month columns hold the first day of the month.
#[derive(Debug, Clone, PartialEq, Eq, Selectable, Queryable, Insertable)]
#[diesel(table_name = subscriptions)]
pub struct SubscriptionEntity {
    pub user_id: String,
    pub service_name: String,
    pub price: i32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

/// Mutable part of a subscription. A `None` end date leaves the stored value untouched.
#[derive(Debug, Clone, PartialEq, Eq, AsChangeset)]
#[diesel(table_name = subscriptions)]
pub struct UpdateSubscriptionEntity {
    pub price: i32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}
