use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::entity::Entity;
use super::manager::DatabaseError;
use super::query::{Condition, Select};
use super::session::Session;
use super::store::Store;
use super::value::{Changes, FieldValue};
use crate::authorization::{AuthorizationContext, ScopeStrategy};
use crate::filter::{parse_order, FilterParams};

/// Generic CRUD and bulk access for one entity type.
///
/// Every query built here goes through the same pipeline: scope, search, ordering, then the
/// generic filters. Scope is skipped entirely when there is no authorization context.
pub struct Repository<E: Entity> {
    store: Arc<dyn Store<E>>,
    scope: Arc<dyn ScopeStrategy<E>>,
    context: Option<AuthorizationContext>,
}

impl<E: Entity> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            scope: Arc::clone(&self.scope),
            context: self.context.clone(),
        }
    }
}

impl<E: Entity> Repository<E> {
    pub fn new(
        store: Arc<dyn Store<E>>,
        scope: Arc<dyn ScopeStrategy<E>>,
        context: Option<AuthorizationContext>,
    ) -> Self {
        Self { store, scope, context }
    }

    pub fn from_session(
        session: &Session,
        scope: Arc<dyn ScopeStrategy<E>>,
        context: Option<AuthorizationContext>,
    ) -> Self {
        Self::new(session.store::<E>(), scope, context)
    }

    pub fn context(&self) -> Option<&AuthorizationContext> {
        self.context.as_ref()
    }

    fn scoped(&self, select: Select) -> Select {
        match &self.context {
            Some(context) => self.scope.apply_scope(select, context),
            None => select,
        }
    }

    fn apply_search(&self, select: Select, filters: &FilterParams) -> Select {
        match filters.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(term) => match E::search(term) {
                Some(condition) => select.filter(condition),
                None => select,
            },
            None => select,
        }
    }

    /// Unknown columns are ignored rather than rejected.
    fn apply_ordering(&self, select: Select, filters: &FilterParams) -> Select {
        let Some(order_by) = filters.order_by.as_deref() else {
            return select;
        };
        let (field, direction) = parse_order(order_by);
        match E::column(field) {
            Some(column) => select.order_by(column, direction),
            None => {
                debug!("Ignoring order_by on unknown column {}.{}", E::TABLE, field);
                select
            }
        }
    }

    fn apply_filters(&self, select: Select, filters: &FilterParams) -> Select {
        match &filters.id_in {
            Some(ids) => select.filter(Condition::In(
                "id",
                ids.iter().copied().map(FieldValue::Uuid).collect(),
            )),
            None => select,
        }
    }

    fn build(&self, filters: &FilterParams) -> Select {
        let select = self.scoped(Select::new());
        let select = self.apply_search(select, filters);
        let select = self.apply_ordering(select, filters);
        self.apply_filters(select, filters)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<E>, DatabaseError> {
        self.store.fetch_optional(&self.scoped(Select::by_id(id))).await
    }

    /// First row whose `column` equals `value`, within scope.
    pub async fn get_by(&self, column: &'static str, value: FieldValue) -> Result<Option<E>, DatabaseError> {
        let select = self.scoped(Select::new()).filter(Condition::Eq(column, value));
        self.store.fetch_optional(&select).await
    }

    /// All matching rows, unpaginated.
    pub async fn get_all(&self, filters: &FilterParams) -> Result<Vec<E>, DatabaseError> {
        self.store.fetch_all(&self.build(filters)).await
    }

    /// Total count of matching rows, and the requested page of them.
    pub async fn get_paginated(&self, filters: &FilterParams) -> Result<(i64, Vec<E>), DatabaseError> {
        let select = self.build(filters);
        let count = self.store.count(&select).await?;
        let page = select.page(filters.limit, filters.offset);
        let rows = self.store.fetch_all(&page).await?;
        Ok((count, rows))
    }

    pub async fn get_ids(&self, filters: &FilterParams) -> Result<Vec<Uuid>, DatabaseError> {
        self.store.fetch_ids(&self.build(filters).unpaged()).await
    }

    pub async fn create(&self, data: &Changes) -> Result<E, DatabaseError> {
        self.store
            .insert(std::slice::from_ref(data))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DatabaseError::QueryError(format!("insert into {} returned no row", E::TABLE)))
    }

    /// Writes only the supplied columns, then returns the refreshed row.
    pub async fn update(&self, instance: &E, data: &Changes) -> Result<E, DatabaseError> {
        let id = instance.id();
        self.store
            .update(&[id], data)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DatabaseError::NotFound(format!("{} {} not found", E::TABLE, id)))
    }

    pub async fn delete(&self, instance: &E) -> Result<bool, DatabaseError> {
        let affected = self.store.delete(&Select::by_id(instance.id())).await?;
        Ok(affected > 0)
    }

    pub async fn bulk_create(&self, data: &[Changes]) -> Result<Vec<E>, DatabaseError> {
        if data.is_empty() {
            return Ok(vec![]);
        }
        debug!("Bulk insert of {} rows into {}", data.len(), E::TABLE);
        self.store.insert(data).await
    }

    pub async fn bulk_update(&self, instances: &[E], data: &Changes) -> Result<Vec<E>, DatabaseError> {
        if instances.is_empty() {
            return Ok(vec![]);
        }
        let ids: Vec<Uuid> = instances.iter().map(Entity::id).collect();
        debug!("Bulk update of {} rows in {}", ids.len(), E::TABLE);
        self.store.update(&ids, data).await
    }

    pub async fn bulk_delete(&self, ids: &[Uuid]) -> Result<u64, DatabaseError> {
        if ids.is_empty() {
            return Ok(0);
        }
        debug!("Bulk delete of {} rows from {}", ids.len(), E::TABLE);
        self.store.delete(&self.scoped(Select::by_ids(ids))).await
    }
}
