//! Format id to filter dispatch.
//!
//! A [`FilterRegistry`] collects [`FilterProvider`]s. Ids are matched without
//! regard to case and the first provider to claim an id keeps it, so external
//! providers registered before the built-ins can replace a built-in format.

use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use lazy_static::lazy_static;
use log::debug;

use crate::{
    error::Error,
    formats::FormatId,
    traits::{MultiBundleResourceFilter, ResourceFilter},
};

/// Whether a format works on one bundle or on several.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Single,
    Multi,
}

/// An available format id and its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterInfo {
    pub id: String,
    pub kind: FilterKind,
}

impl FilterInfo {
    pub fn new(id: impl Into<String>, kind: FilterKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

/// A source of filters, such as the built-in formats or a plugin crate.
pub trait FilterProvider: Send + Sync {
    /// Formats this provider can create.
    fn available_filters(&self) -> Vec<FilterInfo>;

    /// Creates a single-bundle filter, or `None` if `id` is not one of ours.
    fn single_filter(&self, id: &str) -> Option<Arc<dyn ResourceFilter>>;

    /// Creates a multi-bundle filter, or `None` if `id` is not one of ours.
    fn multi_filter(&self, id: &str) -> Option<Arc<dyn MultiBundleResourceFilter>> {
        let _ = id;
        None
    }
}

/// Provider for the formats shipped with this crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinProvider;

impl FilterProvider for BuiltinProvider {
    fn available_filters(&self) -> Vec<FilterInfo> {
        FormatId::ALL
            .iter()
            .map(|id| FilterInfo::new(id.as_str(), FilterKind::Single))
            .collect()
    }

    fn single_filter(&self, id: &str) -> Option<Arc<dyn ResourceFilter>> {
        id.parse::<FormatId>().ok().map(|format| format.filter())
    }
}

struct Registration {
    info: FilterInfo,
    provider: Arc<dyn FilterProvider>,
}

/// Maps format ids to providers.
#[derive(Default)]
pub struct FilterRegistry {
    registrations: HashMap<String, Registration>,
}

impl FilterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding `providers` followed by the built-in formats.
    pub fn with_providers<I>(providers: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn FilterProvider>>,
    {
        let mut registry = Self::new();
        for provider in providers {
            registry.register(provider);
        }
        registry.register(Arc::new(BuiltinProvider));
        registry
    }

    /// Registers every format of `provider` whose id is still free.
    ///
    /// Returns the number of ids the provider claimed.
    pub fn register(&mut self, provider: Arc<dyn FilterProvider>) -> usize {
        let mut claimed = 0;
        for info in provider.available_filters() {
            let id = info.id.to_ascii_uppercase();
            if self.registrations.contains_key(&id) {
                debug!("format `{}` already registered; keeping the first provider", id);
                continue;
            }
            let info = FilterInfo::new(id.clone(), info.kind);
            self.registrations.insert(
                id,
                Registration {
                    info,
                    provider: Arc::clone(&provider),
                },
            );
            claimed += 1;
        }
        claimed
    }

    /// All registered ids, upper case.
    pub fn list_format_ids(&self) -> BTreeSet<String> {
        self.registrations.keys().cloned().collect()
    }

    pub fn filter_info(&self, id: &str) -> Option<&FilterInfo> {
        self.registrations
            .get(&id.to_ascii_uppercase())
            .map(|r| &r.info)
    }

    /// Single-bundle filter for `id`; `None` when unknown or multi-bundle.
    pub fn get_single_filter(&self, id: &str) -> Option<Arc<dyn ResourceFilter>> {
        let registration = self.registrations.get(&id.to_ascii_uppercase())?;
        match registration.info.kind {
            FilterKind::Single => registration.provider.single_filter(&registration.info.id),
            FilterKind::Multi => None,
        }
    }

    /// Multi-bundle filter for `id`; `None` when unknown or single-bundle.
    pub fn get_multi_filter(&self, id: &str) -> Option<Arc<dyn MultiBundleResourceFilter>> {
        let registration = self.registrations.get(&id.to_ascii_uppercase())?;
        match registration.info.kind {
            FilterKind::Multi => registration.provider.multi_filter(&registration.info.id),
            FilterKind::Single => None,
        }
    }

    /// Like [`FilterRegistry::get_single_filter`] but reports unknown ids as errors.
    pub fn filter_for(&self, id: &str) -> Result<Arc<dyn ResourceFilter>, Error> {
        self.get_single_filter(id)
            .ok_or_else(|| Error::UnknownFormat(id.to_string()))
    }
}

lazy_static! {
    static ref DEFAULT_REGISTRY: FilterRegistry =
        FilterRegistry::with_providers(std::iter::empty());
}

/// The process-wide registry of built-in formats. Read-only after first use.
pub fn default_registry() -> &'static FilterRegistry {
    &DEFAULT_REGISTRY
}
