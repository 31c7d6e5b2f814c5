//! Immutable catalog snapshots and the read-through cache that hands them out.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::db::models::{Block, Blueprint, Filter, Profile};
use crate::db::repos::{blocks as block_repo, blueprints as blueprint_repo};
use crate::db::repos::{filters as filter_repo, profiles as profile_repo};
use crate::db::DbPool;
use crate::error::AppError;

/// Read-only view of profiles, system blueprints, blocks and filters used by
/// a compile. Built once and never mutated.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    profiles: HashMap<String, Profile>,
    blueprints: HashMap<String, Blueprint>,
    blocks: HashMap<String, Block>,
    filters: HashMap<String, Filter>,
}

impl CatalogSnapshot {
    pub fn new(
        profiles: Vec<Profile>,
        blueprints: Vec<Blueprint>,
        blocks: Vec<Block>,
        filters: Vec<Filter>,
    ) -> Self {
        Self {
            profiles: profiles.into_iter().map(|p| (p.id.clone(), p)).collect(),
            blueprints: blueprints.into_iter().map(|b| (b.id.clone(), b)).collect(),
            blocks: blocks.into_iter().map(|b| (b.key.clone(), b)).collect(),
            filters: filters.into_iter().map(|f| (f.key.clone(), f)).collect(),
        }
    }

    /// Load a snapshot from the store. Only system blueprints are included;
    /// user blueprints are registered per request on the compile context.
    pub fn load(pool: &DbPool) -> Result<Self, AppError> {
        let snapshot = Self::new(
            profile_repo::get_all(pool)?,
            blueprint_repo::get_system(pool)?,
            block_repo::get_all(pool)?,
            filter_repo::get_all(pool)?,
        );
        tracing::debug!(
            profiles = snapshot.profiles.len(),
            blueprints = snapshot.blueprints.len(),
            blocks = snapshot.blocks.len(),
            filters = snapshot.filters.len(),
            "Catalog snapshot loaded"
        );
        Ok(snapshot)
    }

    pub fn profile(&self, id: &str) -> Option<&Profile> {
        self.profiles.get(id)
    }

    pub fn blueprint(&self, id: &str) -> Option<&Blueprint> {
        self.blueprints.get(id)
    }

    pub fn block(&self, key: &str) -> Option<&Block> {
        self.blocks.get(key)
    }

    pub fn filter(&self, key: &str) -> Option<&Filter> {
        self.filters.get(key)
    }

    /// Keys among `selected` that name premium filters, in input order.
    pub fn premium_filters<'a, I>(&self, selected: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        selected
            .into_iter()
            .filter(|key| self.filter(key).is_some_and(|f| f.is_premium))
            .cloned()
            .collect()
    }
}

/// Read-through cache of the current catalog snapshot.
///
/// Readers get an `Arc` to a complete snapshot; catalog write paths call
/// [`CatalogCache::invalidate`] so the next reader reloads from the store.
#[derive(Debug, Default)]
pub struct CatalogCache {
    current: RwLock<Option<Arc<CatalogSnapshot>>>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self, pool: &DbPool) -> Result<Arc<CatalogSnapshot>, AppError> {
        {
            let guard = self
                .current
                .read()
                .map_err(|_| AppError::Internal("Catalog cache lock poisoned".into()))?;
            if let Some(ref snap) = *guard {
                return Ok(Arc::clone(snap));
            }
        }

        let mut guard = self
            .current
            .write()
            .map_err(|_| AppError::Internal("Catalog cache lock poisoned".into()))?;
        // Another writer may have filled it while we waited.
        if let Some(ref snap) = *guard {
            return Ok(Arc::clone(snap));
        }
        let snap = Arc::new(CatalogSnapshot::load(pool)?);
        *guard = Some(Arc::clone(&snap));
        Ok(snap)
    }

    pub fn invalidate(&self) {
        match self.current.write() {
            Ok(mut guard) => {
                *guard = None;
                tracing::debug!("Catalog cache invalidated");
            }
            Err(e) => tracing::error!("Catalog cache lock poisoned on invalidate: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_test_db;
    use crate::db::models::CreateBlockInput;

    #[test]
    fn test_snapshot_loads_seeded_catalog() {
        let pool = init_test_db().unwrap();
        let snap = CatalogSnapshot::load(&pool).unwrap();
        assert!(snap.profile("flux-dev").is_some());
        assert!(snap.block("lighting_soft").is_some());
        assert!(snap.filter("color").is_some());
        assert!(snap.blueprint("bp-cinematic-portrait").is_some());
    }

    #[test]
    fn test_premium_filters_in_input_order() {
        let pool = init_test_db().unwrap();
        let snap = CatalogSnapshot::load(&pool).unwrap();
        let selected = vec!["style_pack".to_string(), "color".to_string(), "nope".to_string()];
        assert_eq!(snap.premium_filters(&selected), vec!["style_pack".to_string()]);
    }

    #[test]
    fn test_cache_reuses_until_invalidated() {
        let pool = init_test_db().unwrap();
        let cache = CatalogCache::new();

        let first = cache.snapshot(&pool).unwrap();
        let second = cache.snapshot(&pool).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        block_repo::create(
            &pool,
            CreateBlockInput {
                key: "fog_low".into(),
                name: "Low fog".into(),
                template: "low rolling fog".into(),
                category: None,
            },
        )
        .unwrap();
        assert!(cache.snapshot(&pool).unwrap().block("fog_low").is_none());

        cache.invalidate();
        let third = cache.snapshot(&pool).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert!(third.block("fog_low").is_some());
    }
}
