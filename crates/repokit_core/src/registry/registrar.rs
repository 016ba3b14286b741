//! Binds contexts and repositories from a catalog into a service register.
//!
//! # Responsibility
//! - Pick the canonical context and bind it untyped and for every entity type.
//! - Bind authored repositories under their class, base classes and contracts.
//! - Fill the gaps with the most specialized generic repository per entity.
//!
//! # Invariants
//! - Context resolution fails before anything is registered.
//! - Authored repositories always win over generic fallbacks.
//! - The resulting binding table is independent of catalog declaration order.

use crate::error::RepoResult;
use crate::messaging::MessageBus;
use crate::registry::catalog::TypeCatalog;
use crate::registry::closed::ClosedRepository;
use crate::registry::container::{ServiceContainer, ServiceRegister};
use crate::registry::type_registry::TypeRegistry;
use log::{debug, info, warn};
use std::any::TypeId;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

/// What one registration pass bound.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationReport {
    /// Name of the canonical context implementation.
    pub context: &'static str,
    /// Entity types that received a context binding.
    pub entities: Vec<&'static str>,
    /// Authored repositories, closed names, in registration order.
    pub authored: Vec<String>,
    /// Generic fallbacks, closed names, in registration order.
    pub generic: Vec<String>,
    /// Entity types left without any repository.
    pub unbound: Vec<&'static str>,
    /// Total bindings handed to the register, replacements included.
    pub bindings: usize,
}

/// Registers every binding `catalog` implies into `register`.
///
/// # Errors
/// - `Configuration` when zero or several zero-configuration contexts exist.
pub fn register_dependencies(
    catalog: &TypeCatalog,
    register: &mut dyn ServiceRegister,
) -> RepoResult<RegistrationReport> {
    let started_at = Instant::now();
    let registry = TypeRegistry::new(catalog);

    let context = match registry.canonical_context() {
        Ok(context) => context,
        Err(err) => {
            warn!("event=register_dependencies module=registry status=error error={err}");
            return Err(err);
        }
    };

    let mut report = RegistrationReport {
        context: context.name(),
        ..RegistrationReport::default()
    };

    register.register(context.backend_registration());
    report.bindings += 1;

    let entities = registry.entity_types();
    for entity in &entities {
        register.register(entity.context_registration(context));
        report.entities.push(entity.name());
        report.bindings += 1;
    }

    let known: BTreeSet<TypeId> = entities.iter().map(|entity| entity.type_id()).collect();
    let mut covered = BTreeSet::new();
    for info in registry.repository_types() {
        let repository = info.repository();
        if !known.contains(&repository.entity_type()) {
            warn!(
                "event=repository_register module=registry status=no_context repository={}",
                repository.closed_name()
            );
        }
        report.bindings += register_recursively(register, repository);
        report.authored.push(repository.closed_name());
        covered.insert(repository.entity_type());
    }

    for entity in &entities {
        if covered.contains(&entity.type_id()) {
            continue;
        }
        match registry.best_generic(entity) {
            Some(repository) => {
                report.bindings += register_recursively(register, &repository);
                report.generic.push(repository.closed_name());
            }
            None => {
                debug!(
                    "event=repository_register module=registry status=skipped entity={} reason=no_matching_generic",
                    entity.name()
                );
                report.unbound.push(entity.name());
            }
        }
    }

    info!(
        "event=register_dependencies module=registry status=ok context={} entities={} authored={} generic={} bindings={} duration_ms={}",
        report.context,
        report.entities.len(),
        report.authored.len(),
        report.generic.len(),
        report.bindings,
        started_at.elapsed().as_millis()
    );
    Ok(report)
}

fn register_recursively(register: &mut dyn ServiceRegister, repository: &ClosedRepository) -> usize {
    let registrations = repository.registrations();
    let count = registrations.len();
    for registration in registrations {
        register.register(registration);
    }
    count
}

/// Builds a container holding every binding `catalog` implies.
pub fn build_container(
    catalog: &TypeCatalog,
    bus: Option<Arc<MessageBus>>,
) -> RepoResult<(ServiceContainer, RegistrationReport)> {
    let mut container = match bus {
        Some(bus) => ServiceContainer::new().with_bus(bus),
        None => ServiceContainer::new(),
    };
    let report = register_dependencies(catalog, &mut container)?;
    Ok((container, report))
}
