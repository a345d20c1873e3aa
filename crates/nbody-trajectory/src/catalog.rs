//! The fixed, ordered list of scenarios the viewer offers.

use crate::types::ScenarioDescriptor;

/// Scenarios shipped with the viewer, in selector order.
const BUILTIN: &[ScenarioDescriptor] = &[
    ScenarioDescriptor::new("figure-eight", "Figure-eight choreography", "figure_eight.json"),
    ScenarioDescriptor::new("lagrange", "Lagrange triangle", "lagrange.json"),
    ScenarioDescriptor::new("pythagorean", "Pythagorean problem", "pythagorean.json"),
];

/// An ordered, immutable set of scenario descriptors.
#[derive(Debug, Clone, Copy)]
pub struct Catalog {
    entries: &'static [ScenarioDescriptor],
}

impl Catalog {
    /// The scenarios shipped with the viewer.
    #[must_use]
    pub const fn builtin() -> Self {
        Self { entries: BUILTIN }
    }

    /// Build a catalog over a static list. Ids are expected to be unique.
    #[must_use]
    pub const fn from_static(entries: &'static [ScenarioDescriptor]) -> Self {
        Self { entries }
    }

    /// Iterate descriptors in order.
    pub fn iter(&self) -> impl Iterator<Item = &'static ScenarioDescriptor> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The scenario selected at startup.
    #[must_use]
    pub fn first(&self) -> Option<&'static ScenarioDescriptor> {
        self.entries.first()
    }

    /// Look up a descriptor by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&'static ScenarioDescriptor> {
        self.entries.iter().find(|d| d.id == id)
    }

    /// Selector index of a descriptor.
    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|d| d.id == id)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
