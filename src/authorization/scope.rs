use std::marker::PhantomData;

use super::context::AuthorizationContext;
use crate::database::{Condition, Entity, FieldValue, Select};

/// Row-level restriction applied to every query a repository builds for a user.
///
/// Repositories never call this for system operations.
pub trait ScopeStrategy<E: Entity>: Send + Sync {
    fn apply_scope(&self, select: Select, _context: &AuthorizationContext) -> Select {
        select
    }
}

/// No restriction.
pub struct Unscoped;

impl<E: Entity> ScopeStrategy<E> for Unscoped {}

/// Restricts rows to those whose `column` holds the acting user's id.
pub struct OwnerScope {
    column: &'static str,
}

impl OwnerScope {
    pub fn new(column: &'static str) -> Self {
        Self { column }
    }
}

impl<E: Entity> ScopeStrategy<E> for OwnerScope {
    fn apply_scope(&self, select: Select, context: &AuthorizationContext) -> Select {
        select.filter(Condition::Eq(self.column, FieldValue::Uuid(context.user_id)))
    }
}

/// Restricts rows to the caller's organization when both the context and the table carry one.
pub struct OrganizationScope<E> {
    _phantom: PhantomData<fn() -> E>,
}

impl<E> OrganizationScope<E> {
    pub const COLUMN: &'static str = "organization_id";

    pub fn new() -> Self {
        Self { _phantom: PhantomData }
    }
}

impl<E> Default for OrganizationScope<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> ScopeStrategy<E> for OrganizationScope<E> {
    fn apply_scope(&self, select: Select, context: &AuthorizationContext) -> Select {
        match (context.organization_id, E::column(Self::COLUMN)) {
            (Some(organization_id), Some(column)) => {
                select.filter(Condition::Eq(column, FieldValue::Uuid(organization_id)))
            }
            _ => select,
        }
    }
}
