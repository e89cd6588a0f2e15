use sqlx::PgPool;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::entity::Entity;
use super::manager::{self, DatabaseError};
use super::memory::{MemoryStore, Referencing, Registry};
use super::store::{PgStore, Store};

/// Handle to the backing store, cloned into every request.
#[derive(Clone)]
pub enum Session {
    Postgres(PgPool),
    Memory(MemoryDatabase),
}

impl Session {
    pub fn postgres(pool: PgPool) -> Self {
        Session::Postgres(pool)
    }

    pub fn memory() -> Self {
        Session::Memory(MemoryDatabase::default())
    }

    pub fn store<E: Entity>(&self) -> Arc<dyn Store<E>> {
        match self {
            Session::Postgres(pool) => Arc::new(PgStore::<E>::new(pool.clone())),
            Session::Memory(db) => db.store::<E>(),
        }
    }

    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        match self {
            Session::Postgres(pool) => manager::health_check(pool).await,
            Session::Memory(_) => Ok(()),
        }
    }
}

/// One [`MemoryStore`] per entity type, shared by every clone of the session.
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    stores: Arc<Mutex<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>>,
    registry: Arc<Registry>,
}

impl MemoryDatabase {
    pub fn store<E: Entity>(&self) -> Arc<MemoryStore<E>> {
        let mut stores = self.stores.lock().unwrap_or_else(|e| e.into_inner());
        let key = TypeId::of::<E>();
        if let Some(existing) = stores.get(&key) {
            if let Ok(store) = Arc::clone(existing).downcast::<MemoryStore<E>>() {
                return store;
            }
        }
        let store = Arc::new(MemoryStore::<E>::in_registry(Arc::downgrade(&self.registry)));
        stores.insert(key, store.clone());
        let referencing: Arc<dyn Referencing> = store.clone();
        self.registry.lock().unwrap_or_else(|e| e.into_inner()).push(referencing);
        store
    }
}
