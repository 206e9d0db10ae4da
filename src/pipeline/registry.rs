//! Mapping from event type to the projectors that handle it
//!
//! The registry is built once at startup and never changes afterwards, so the
//! pool shares it behind an `Arc` and reads it without locking.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::projector::Projector;

/// Collects `(event type, projector)` registrations
#[derive(Default)]
pub struct RegistryBuilder {
    registrations: Vec<(String, Arc<dyn Projector>)>,
}

impl RegistryBuilder {
    pub fn register(mut self, event_type: impl Into<String>, projector: Arc<dyn Projector>) -> Self {
        self.registrations.push((event_type.into(), projector));
        self
    }

    /// Group the registrations by event type, keeping registration order
    pub fn build(self) -> ProjectorRegistry {
        let mut projectors: HashMap<String, Vec<Arc<dyn Projector>>> = HashMap::new();

        for (event_type, projector) in self.registrations {
            debug!("registering {} for {event_type}", projector.name());
            projectors.entry(event_type).or_default().push(projector);
        }

        ProjectorRegistry { projectors }
    }
}

/// Immutable event type → ordered projectors mapping
pub struct ProjectorRegistry {
    projectors: HashMap<String, Vec<Arc<dyn Projector>>>,
}

impl ProjectorRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn from_registrations<I, S>(registrations: I) -> Self
    where
        I: IntoIterator<Item = (S, Arc<dyn Projector>)>,
        S: Into<String>,
    {
        registrations
            .into_iter()
            .fold(Self::builder(), |builder, (ty, projector)| {
                builder.register(ty, projector)
            })
            .build()
    }

    /// Projectors for `event_type`, in registration order
    ///
    /// Unknown event types yield an empty slice: newer agents may report
    /// things this hub does not know about yet.
    pub fn lookup(&self, event_type: &str) -> &[Arc<dyn Projector>] {
        self.projectors
            .get(event_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Event types with at least one projector
    pub fn event_types(&self) -> impl Iterator<Item = &str> {
        self.projectors.keys().map(String::as_str)
    }

    /// Total number of registrations
    pub fn len(&self) -> usize {
        self.projectors.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.projectors.is_empty()
    }
}

impl fmt::Debug for ProjectorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (event_type, projectors) in &self.projectors {
            let names: Vec<&str> = projectors.iter().map(|p| p.name()).collect();
            map.entry(event_type, &names);
        }
        map.finish()
    }
}
