//! Read-only queries over a [`TypeCatalog`].
//!
//! # Invariants
//! - Results never depend on declaration order: every list is sorted.
//! - Only repository types whose nearest base is a known generic are valid.

use crate::error::{RepoError, RepoResult};
use crate::registry::catalog::{ContextDescriptor, EntityDescriptor, GenericRepository, TypeCatalog};
use crate::registry::closed::ClosedRepository;
use log::debug;
use std::any::TypeId;

/// Authored repository type the registrar will bind.
#[derive(Clone, Copy)]
pub struct RepositoryTypeInfo<'a> {
    repository: &'a ClosedRepository,
    generic: &'a GenericRepository,
}

impl<'a> RepositoryTypeInfo<'a> {
    pub fn repository(&self) -> &'a ClosedRepository {
        self.repository
    }

    /// Generic repository this type specializes.
    pub fn generic(&self) -> &'a GenericRepository {
        self.generic
    }

    pub fn name(&self) -> &'static str {
        self.repository.name()
    }

    pub fn entity_name(&self) -> &'static str {
        self.repository.entity_name()
    }

    pub fn entity_type(&self) -> TypeId {
        self.repository.entity_type()
    }

    pub fn depth(&self) -> usize {
        self.repository.depth()
    }
}

pub struct TypeRegistry<'a> {
    catalog: &'a TypeCatalog,
}

impl<'a> TypeRegistry<'a> {
    pub fn new(catalog: &'a TypeCatalog) -> Self {
        Self { catalog }
    }

    /// Every persisted entity type, by name.
    pub fn entity_types(&self) -> Vec<&'a EntityDescriptor> {
        self.catalog.entities().collect()
    }

    /// Context implementations constructible without configuration.
    pub fn context_candidates(&self) -> Vec<&'a ContextDescriptor> {
        self.catalog
            .contexts()
            .filter(|context| !context.requires_configuration())
            .collect()
    }

    /// The single zero-configuration context implementation.
    pub fn canonical_context(&self) -> RepoResult<&'a ContextDescriptor> {
        let mut candidates = self.context_candidates();
        match candidates.len() {
            0 => Err(RepoError::no_context()),
            1 => Ok(candidates.remove(0)),
            _ => Err(RepoError::ambiguous_context(
                candidates
                    .iter()
                    .map(|context| context.name().to_string())
                    .collect(),
            )),
        }
    }

    /// Valid authored repository types, shallowest first, then by name.
    pub fn repository_types(&self) -> Vec<RepositoryTypeInfo<'a>> {
        let catalog = self.catalog;
        let mut valid: Vec<RepositoryTypeInfo<'a>> = catalog
            .repositories()
            .filter_map(|repository| {
                let generic = repository
                    .bases()
                    .first()
                    .and_then(|base| catalog.generic(base));
                if generic.is_none() {
                    debug!(
                        "event=repository_scan module=registry status=skipped repository={} reason=no_generic_base",
                        repository.closed_name()
                    );
                }
                generic.map(|generic| RepositoryTypeInfo {
                    repository,
                    generic,
                })
            })
            .collect();
        valid.sort_by(|left, right| {
            left.depth()
                .cmp(&right.depth())
                .then_with(|| left.name().cmp(right.name()))
                .then_with(|| left.entity_name().cmp(right.entity_name()))
        });
        valid
    }

    /// Generic repositories, most specialized first.
    pub fn generic_repositories(&self) -> Vec<&'a GenericRepository> {
        let mut generics: Vec<&'a GenericRepository> = self.catalog.generics().collect();
        generics.sort_by(|left, right| {
            right
                .depth
                .cmp(&left.depth)
                .then_with(|| left.name.cmp(right.name))
        });
        generics
    }

    /// Most specialized generic repository closable over `entity`.
    pub fn best_generic(&self, entity: &EntityDescriptor) -> Option<ClosedRepository> {
        self.generic_repositories()
            .into_iter()
            .find_map(|generic| entity.close(generic))
    }
}
