use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use diesel::{
    RunQueryDsl, delete,
    dsl::exists,
    expression::IntoSql,
    insert_into,
    pg::Pg,
    prelude::*,
    query_builder::QueryFragment,
    query_dsl::{LoadQuery, methods::ExecuteDsl},
    result::{DatabaseErrorKind, Error as DieselError},
    select,
    sql_types::Bool,
    update,
};
use std::sync::{Arc, RwLock};
use tokio::task;
use tracing::info;

use crate::{
    domain::{
        entities::subscriptions::{SubscriptionEntity, UpdateSubscriptionEntity},
        repositories::subscriptions::{SubscriptionRepository, UpdateOutcome},
        value_objects::{
            months::Month,
            subscription_filter::{SubscriptionFilter, SubscriptionKey},
        },
    },
    infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::subscriptions},
};

pub struct SubscriptionPostgres {
    db_pool: RwLock<Option<Arc<PgPoolSquad>>>,
}

impl SubscriptionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self {
            db_pool: RwLock::new(Some(db_pool)),
        }
    }

    fn pool(&self) -> Result<Arc<PgPoolSquad>> {
        let guard = self
            .db_pool
            .read()
            .map_err(|_| anyhow!("subscription pool lock poisoned"))?;
        guard
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(|| anyhow!("subscription repository is closed"))
    }
}

/// Equality predicate per present field, then limit and offset.
fn search_query(
    filter: SubscriptionFilter,
) -> impl RunQueryDsl<PgConnection> + LoadQuery<'static, PgConnection, SubscriptionEntity> + QueryFragment<Pg>
{
    let mut query = subscriptions::table
        .select(SubscriptionEntity::as_select())
        .order((subscriptions::user_id.asc(), subscriptions::service_name.asc()))
        .into_boxed();

    if let Some(user_id) = filter.user_id {
        query = query.filter(subscriptions::user_id.eq(user_id));
    }
    if let Some(service_name) = filter.service_name {
        query = query.filter(subscriptions::service_name.eq(service_name));
    }
    if let Some(price) = filter.price {
        query = query.filter(subscriptions::price.eq(price));
    }
    if let Some(start_date) = filter.start_date {
        query = query.filter(subscriptions::start_date.eq(start_date.first_day()));
    }
    if let Some(end_date) = filter.end_date {
        query = query.filter(subscriptions::end_date.eq(end_date.first_day()));
    }
    if let Some(limit) = filter.limit {
        query = query.limit(limit);
    }
    if let Some(offset) = filter.offset {
        query = query.offset(offset);
    }

    query
}

/// Rows active at some point of `[window_start, window_end]`.
fn overlapping_query(
    window_start: Month,
    window_end: Month,
    user_id: Option<String>,
    service_name: Option<String>,
) -> impl RunQueryDsl<PgConnection> + LoadQuery<'static, PgConnection, SubscriptionEntity> + QueryFragment<Pg>
{
    let mut query = subscriptions::table
        .select(SubscriptionEntity::as_select())
        .filter(subscriptions::start_date.le(window_end.first_day()))
        .filter(
            subscriptions::end_date
                .is_null()
                .or(subscriptions::end_date.ge(window_start.first_day())),
        )
        .order((subscriptions::user_id.asc(), subscriptions::service_name.asc()))
        .into_boxed();

    if let Some(user_id) = user_id {
        query = query.filter(subscriptions::user_id.eq(user_id));
    }
    if let Some(service_name) = service_name {
        query = query.filter(subscriptions::service_name.eq(service_name));
    }

    query
}

/// Without a new end date the stored one is kept, so the row only matches when that
/// stored end date does not precede the new start date.
fn update_statement(
    key: SubscriptionKey,
    changes: UpdateSubscriptionEntity,
) -> impl RunQueryDsl<PgConnection> + ExecuteDsl<PgConnection> + QueryFragment<Pg> {
    let replaces_end_date = changes.end_date.is_some();
    let new_start_date = changes.start_date;

    update(
        subscriptions::table
            .filter(subscriptions::user_id.eq(key.user_id))
            .filter(subscriptions::service_name.eq(key.service_name))
            .filter(
                replaces_end_date
                    .into_sql::<Bool>()
                    .or(subscriptions::end_date.is_null())
                    .or(subscriptions::end_date.ge(new_start_date)),
            ),
    )
    .set(changes)
}

/// `None` means nothing matched and the caller has to find out why.
fn classify_update(result: QueryResult<usize>) -> Result<Option<UpdateOutcome>> {
    match result {
        Ok(0) => Ok(None),
        Ok(_) => Ok(Some(UpdateOutcome::Updated)),
        Err(DieselError::DatabaseError(DatabaseErrorKind::CheckViolation, _)) => {
            Ok(Some(UpdateOutcome::EndBeforeStart))
        }
        Err(err) => Err(err.into()),
    }
}

// Diesel is synchronous; every call runs on the blocking pool so the caller's deadline
// can abandon it without stalling the runtime.
#[async_trait]
impl SubscriptionRepository for SubscriptionPostgres {
    async fn search(&self, filter: &SubscriptionFilter) -> Result<Vec<SubscriptionEntity>> {
        let db_pool = self.pool()?;
        let filter = filter.clone();

        task::spawn_blocking(move || -> Result<Vec<SubscriptionEntity>> {
            let mut conn = db_pool.get()?;

            let results = search_query(filter).load::<SubscriptionEntity>(&mut conn)?;
            Ok(results)
        })
        .await?
    }

    async fn find_overlapping(
        &self,
        window_start: Month,
        window_end: Month,
        user_id: Option<String>,
        service_name: Option<String>,
    ) -> Result<Vec<SubscriptionEntity>> {
        let db_pool = self.pool()?;

        task::spawn_blocking(move || -> Result<Vec<SubscriptionEntity>> {
            let mut conn = db_pool.get()?;

            let results = overlapping_query(window_start, window_end, user_id, service_name)
                .load::<SubscriptionEntity>(&mut conn)?;
            Ok(results)
        })
        .await?
    }

    async fn create(&self, subscription_entity: SubscriptionEntity) -> Result<()> {
        let db_pool = self.pool()?;

        task::spawn_blocking(move || -> Result<()> {
            let mut conn = db_pool.get()?;

            let affected = insert_into(subscriptions::table)
                .values(&subscription_entity)
                .execute(&mut conn)?;

            if affected != 1 {
                bail!("expected to affect 1 row, affected: {affected}");
            }
            Ok(())
        })
        .await?
    }

    async fn update(
        &self,
        key: SubscriptionKey,
        update_subscription_entity: UpdateSubscriptionEntity,
    ) -> Result<UpdateOutcome> {
        let db_pool = self.pool()?;

        task::spawn_blocking(move || -> Result<UpdateOutcome> {
            let mut conn = db_pool.get()?;

            let result =
                update_statement(key.clone(), update_subscription_entity).execute(&mut conn);
            if let Some(outcome) = classify_update(result)? {
                return Ok(outcome);
            }

            let row_exists = select(exists(
                subscriptions::table
                    .filter(subscriptions::user_id.eq(key.user_id))
                    .filter(subscriptions::service_name.eq(key.service_name)),
            ))
            .get_result::<bool>(&mut conn)?;

            Ok(if row_exists {
                UpdateOutcome::EndBeforeStart
            } else {
                UpdateOutcome::NotFound
            })
        })
        .await?
    }

    async fn delete(&self, key: SubscriptionKey) -> Result<usize> {
        let db_pool = self.pool()?;

        task::spawn_blocking(move || -> Result<usize> {
            let mut conn = db_pool.get()?;

            let affected = delete(
                subscriptions::table
                    .filter(subscriptions::user_id.eq(key.user_id))
                    .filter(subscriptions::service_name.eq(key.service_name)),
            )
            .execute(&mut conn)?;

            Ok(affected)
        })
        .await?
    }

    fn close(&self) {
        let released = match self.db_pool.write() {
            Ok(mut guard) => guard.take().is_some(),
            Err(poisoned) => poisoned.into_inner().take().is_some(),
        };

        if released {
            info!("subscriptions: postgres pool released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use diesel::debug_query;

    const USER_ID: &str = "60601fee-2bf1-4721-ae6f-7636e79a0cba";

    fn month(year: i32, month: u32) -> Month {
        Month::new(year, month).unwrap()
    }

    fn date(year: i32, month: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, 1).unwrap()
    }

    fn key() -> SubscriptionKey {
        SubscriptionKey {
            user_id: USER_ID.to_string(),
            service_name: "Netflix".to_string(),
        }
    }

    #[test]
    fn empty_filter_adds_no_predicate() {
        let sql = debug_query::<Pg, _>(&search_query(SubscriptionFilter::default())).to_string();

        assert!(!sql.contains("WHERE"), "{sql}");
        assert!(!sql.contains("LIMIT"), "{sql}");
        assert!(!sql.contains("OFFSET"), "{sql}");
        assert!(
            sql.contains(
                r#"ORDER BY "subscriptions"."user_id" ASC, "subscriptions"."service_name" ASC"#
            ),
            "{sql}"
        );
        assert!(sql.ends_with("-- binds: []"), "{sql}");
    }

    #[test]
    fn user_id_filter_is_a_single_equality() {
        let filter = SubscriptionFilter {
            user_id: Some(USER_ID.to_string()),
            ..Default::default()
        };
        let sql = debug_query::<Pg, _>(&search_query(filter)).to_string();

        assert!(sql.contains(r#"WHERE ("subscriptions"."user_id" = $1)"#), "{sql}");
        assert!(!sql.contains("$2"), "{sql}");
        assert!(sql.ends_with(&format!("-- binds: [{USER_ID:?}]")), "{sql}");
    }

    #[test]
    fn every_present_field_becomes_an_equality() {
        let filter = SubscriptionFilter {
            user_id: Some(USER_ID.to_string()),
            service_name: Some("Netflix".to_string()),
            price: Some(400),
            start_date: Some(month(2024, 1)),
            end_date: Some(month(2024, 12)),
            limit: None,
            offset: None,
        };
        let sql = debug_query::<Pg, _>(&search_query(filter)).to_string();

        for predicate in [
            r#""subscriptions"."user_id" = $1"#,
            r#""subscriptions"."service_name" = $2"#,
            r#""subscriptions"."price" = $3"#,
            r#""subscriptions"."start_date" = $4"#,
            r#""subscriptions"."end_date" = $5"#,
        ] {
            assert!(sql.contains(predicate), "missing {predicate} in {sql}");
        }
        assert!(sql.contains("2024-01-01, 2024-12-01]"), "{sql}");
    }

    #[test]
    fn limit_and_offset_are_bound_after_ordering() {
        let filter = SubscriptionFilter {
            limit: Some(10),
            offset: Some(5),
            ..Default::default()
        };
        let sql = debug_query::<Pg, _>(&search_query(filter)).to_string();

        assert!(sql.contains(r#"ASC LIMIT $1 OFFSET $2"#), "{sql}");
        assert!(sql.ends_with("-- binds: [10, 5]"), "{sql}");
    }

    #[test]
    fn overlap_query_bounds_are_inclusive() {
        let sql = debug_query::<Pg, _>(&overlapping_query(
            month(2024, 1),
            month(2024, 12),
            None,
            None,
        ))
        .to_string();

        assert!(sql.contains(r#""subscriptions"."start_date" <= $1"#), "{sql}");
        assert!(sql.contains(r#""subscriptions"."end_date" IS NULL"#), "{sql}");
        assert!(sql.contains(r#""subscriptions"."end_date" >= $2"#), "{sql}");
        assert!(sql.ends_with("-- binds: [2024-12-01, 2024-01-01]"), "{sql}");
    }

    #[test]
    fn overlap_query_narrows_by_identity() {
        let sql = debug_query::<Pg, _>(&overlapping_query(
            month(2024, 1),
            month(2024, 3),
            Some(USER_ID.to_string()),
            Some("Netflix".to_string()),
        ))
        .to_string();

        assert!(sql.contains(r#""subscriptions"."user_id" = $3"#), "{sql}");
        assert!(sql.contains(r#""subscriptions"."service_name" = $4"#), "{sql}");
    }

    #[test]
    fn update_without_end_date_keeps_it_but_guards_on_it() {
        let sql = debug_query::<Pg, _>(&update_statement(
            key(),
            UpdateSubscriptionEntity {
                price: 100,
                start_date: date(2025, 6),
                end_date: None,
            },
        ))
        .to_string();

        let (set_clause, where_clause) = sql.split_once("WHERE").unwrap();
        assert!(!set_clause.contains("end_date"), "{sql}");
        assert!(where_clause.contains(r#""subscriptions"."end_date" IS NULL"#), "{sql}");
        assert!(where_clause.contains(r#""subscriptions"."end_date" >= $"#), "{sql}");
        assert!(sql.contains("false"), "{sql}");
        assert!(sql.contains("2025-06-01"), "{sql}");
    }

    #[test]
    fn update_with_end_date_replaces_it() {
        let sql = debug_query::<Pg, _>(&update_statement(
            key(),
            UpdateSubscriptionEntity {
                price: 100,
                start_date: date(2025, 6),
                end_date: Some(date(2025, 12)),
            },
        ))
        .to_string();

        let (set_clause, _) = sql.split_once("WHERE").unwrap();
        assert!(set_clause.contains(r#""end_date" = $"#), "{sql}");
        assert!(sql.contains("true"), "{sql}");
    }

    #[test]
    fn update_outcomes_from_statement_results() {
        assert_eq!(classify_update(Ok(1)).unwrap(), Some(UpdateOutcome::Updated));
        assert_eq!(classify_update(Ok(0)).unwrap(), None);

        let violation = DieselError::DatabaseError(
            DatabaseErrorKind::CheckViolation,
            Box::new("violates check constraint \"subscriptions_end_after_start\"".to_string()),
        );
        assert_eq!(
            classify_update(Err(violation)).unwrap(),
            Some(UpdateOutcome::EndBeforeStart)
        );

        assert!(classify_update(Err(DieselError::NotFound)).is_err());
    }
}
