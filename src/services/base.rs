//! Capability traits that compose a service from small pieces.
//!
//! A concrete service implements [`BaseService`] (repository access and permission hooks) and
//! then opts into the operations it supports. Every operation runs the same sequence:
//! general permission check, instance fetch and instance check where an instance is involved,
//! payload preparation, validation, then the repository call. Without an authorization context
//! the service runs in system mode and both permission hooks are skipped.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use super::error::ServiceError;
use crate::authorization::AuthorizationContext;
use crate::database::{Changes, Changeset, Entity, Repository};
use crate::filter::FilterParams;

/// Audit identity recorded for system-mode writes.
pub const SYSTEM_ACTOR: &str = "system";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    List,
    Read,
    Create,
    Update,
    Delete,
    BulkCreate,
    BulkUpdate,
    BulkDelete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::List => "list",
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::BulkCreate => "bulk_create",
            Action::BulkUpdate => "bulk_update",
            Action::BulkDelete => "bulk_delete",
        }
    }
}

/// One page of results plus the total number of matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub count: i64,
    pub data: Vec<T>,
}

impl<T> Paginated<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated { count: self.count, data: self.data.into_iter().map(f).collect() }
    }
}

pub trait BaseService: Send + Sync {
    type Entity: Entity;

    const ENTITY_NAME: &'static str = "Entity";

    fn repository(&self) -> &Repository<Self::Entity>;

    fn context(&self) -> Option<&AuthorizationContext> {
        self.repository().context()
    }

    /// Identity written to audit columns.
    fn actor(&self) -> String {
        self.context()
            .map(|c| c.user_email.clone())
            .unwrap_or_else(|| SYSTEM_ACTOR.to_string())
    }

    /// Action-level rule. Allows everything unless overridden.
    fn check_general_permissions(
        &self,
        _action: Action,
        _context: &AuthorizationContext,
    ) -> Result<(), ServiceError> {
        Ok(())
    }

    /// Rule for one fetched instance. Allows everything unless overridden.
    fn check_instance_permissions(
        &self,
        _action: Action,
        _instance: &Self::Entity,
        _context: &AuthorizationContext,
    ) -> Result<(), ServiceError> {
        Ok(())
    }

    fn authorize(&self, action: Action) -> Result<(), ServiceError> {
        match self.context() {
            Some(context) => self.check_general_permissions(action, context),
            None => Ok(()),
        }
    }

    fn authorize_instance(&self, action: Action, instance: &Self::Entity) -> Result<(), ServiceError> {
        match self.context() {
            Some(context) => self.check_instance_permissions(action, instance, context),
            None => Ok(()),
        }
    }

    fn not_found(&self, id: Uuid) -> ServiceError {
        ServiceError::not_found(format!("{} with id {} not found", Self::ENTITY_NAME, id))
    }
}

#[async_trait]
pub trait ReadService: BaseService {
    async fn get_by_id(&self, id: Uuid) -> Result<Self::Entity, ServiceError> {
        self.authorize(Action::Read)?;
        let instance = self
            .repository()
            .get_by_id(id)
            .await?
            .ok_or_else(|| self.not_found(id))?;
        self.authorize_instance(Action::Read, &instance)?;
        Ok(instance)
    }
}

#[async_trait]
pub trait ListService: BaseService {
    fn validate_filters(&self, filters: &FilterParams) -> Result<(), ServiceError> {
        filters.validate()?;
        Ok(())
    }

    async fn get_paginated(&self, filters: &FilterParams) -> Result<Paginated<Self::Entity>, ServiceError> {
        self.authorize(Action::List)?;
        self.validate_filters(filters)?;
        let (count, data) = self.repository().get_paginated(filters).await?;
        Ok(Paginated { count, data })
    }

    async fn get_all(&self, filters: &FilterParams) -> Result<Vec<Self::Entity>, ServiceError> {
        self.authorize(Action::List)?;
        self.validate_filters(filters)?;
        Ok(self.repository().get_all(filters).await?)
    }

    async fn get_ids(&self, filters: &FilterParams) -> Result<Vec<Uuid>, ServiceError> {
        self.authorize(Action::List)?;
        self.validate_filters(filters)?;
        Ok(self.repository().get_ids(filters).await?)
    }
}

#[async_trait]
pub trait CreateService: BaseService {
    type Create: Changeset;

    /// Converts the payload to column values and stamps audit columns.
    fn prepare_create(&self, data: &Self::Create) -> Changes {
        let mut changes = data.changes();
        if <Self::Entity as Entity>::AUDITED {
            let actor = self.actor();
            changes.set("created_by", actor.clone());
            changes.set("updated_by", actor);
        }
        changes
    }

    async fn validate_create(&self, _data: &Self::Create) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn create(&self, data: &Self::Create) -> Result<Self::Entity, ServiceError> {
        self.authorize(Action::Create)?;
        let changes = self.prepare_create(data);
        self.validate_create(data).await?;
        Ok(self.repository().create(&changes).await?)
    }
}

#[async_trait]
pub trait UpdateService: ReadService {
    type Patch: Changeset;

    /// Converts the patch to column values. A non-empty patch also stamps `updated_by`.
    fn prepare_update(&self, data: &Self::Patch) -> Changes {
        let mut changes = data.changes();
        if <Self::Entity as Entity>::AUDITED && !changes.is_empty() {
            changes.set("updated_by", self.actor());
        }
        changes
    }

    async fn validate_update(&self, _instance: &Self::Entity, _data: &Self::Patch) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn update(&self, id: Uuid, data: &Self::Patch) -> Result<Self::Entity, ServiceError> {
        self.authorize(Action::Update)?;
        let instance = self.get_by_id(id).await?;
        self.authorize_instance(Action::Update, &instance)?;
        let changes = self.prepare_update(data);
        self.validate_update(&instance, data).await?;
        Ok(self.repository().update(&instance, &changes).await?)
    }
}

#[async_trait]
pub trait DeleteService: ReadService {
    async fn delete(&self, id: Uuid) -> Result<bool, ServiceError> {
        self.authorize(Action::Delete)?;
        let instance = self.get_by_id(id).await?;
        self.authorize_instance(Action::Delete, &instance)?;
        Ok(self.repository().delete(&instance).await?)
    }
}

#[async_trait]
pub trait BulkCreateService: CreateService {
    async fn validate_bulk_create(&self, data: &[Self::Create]) -> Result<(), ServiceError> {
        for item in data {
            self.validate_create(item).await?;
        }
        Ok(())
    }

    async fn bulk_create(&self, data: &[Self::Create]) -> Result<Vec<Self::Entity>, ServiceError> {
        self.authorize(Action::BulkCreate)?;
        let changes: Vec<Changes> = data.iter().map(|item| self.prepare_create(item)).collect();
        self.validate_bulk_create(data).await?;
        Ok(self.repository().bulk_create(&changes).await?)
    }
}

#[async_trait]
pub trait BulkUpdateService: UpdateService {
    async fn validate_bulk_update(
        &self,
        instances: &[Self::Entity],
        data: &Self::Patch,
    ) -> Result<(), ServiceError> {
        for instance in instances {
            self.validate_update(instance, data).await?;
        }
        Ok(())
    }

    /// Updates every listed entity, or none of them if any id is missing or out of scope.
    async fn bulk_update(&self, ids: &[Uuid], data: &Self::Patch) -> Result<Vec<Self::Entity>, ServiceError> {
        self.authorize(Action::BulkUpdate)?;

        let mut seen = HashSet::new();
        let requested: Vec<Uuid> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
        if requested.is_empty() {
            return Ok(vec![]);
        }

        let instances = self
            .repository()
            .get_all(&FilterParams::with_ids(requested.clone()))
            .await?;
        if instances.len() < requested.len() {
            let found: HashSet<Uuid> = instances.iter().map(Entity::id).collect();
            let missing: Vec<String> = requested
                .iter()
                .filter(|id| !found.contains(*id))
                .map(Uuid::to_string)
                .collect();
            return Err(ServiceError::not_found(format!(
                "Entities with ids {} not found",
                missing.join(", ")
            )));
        }

        for instance in &instances {
            self.authorize_instance(Action::BulkUpdate, instance)?;
        }
        let changes = self.prepare_update(data);
        self.validate_bulk_update(&instances, data).await?;
        Ok(self.repository().bulk_update(&instances, &changes).await?)
    }
}

#[async_trait]
pub trait BulkDeleteService: BaseService {
    async fn validate_bulk_delete(&self, _ids: &[Uuid]) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn bulk_delete(&self, ids: &[Uuid]) -> Result<u64, ServiceError> {
        self.authorize(Action::BulkDelete)?;
        self.validate_bulk_delete(ids).await?;
        Ok(self.repository().bulk_delete(ids).await?)
    }
}
