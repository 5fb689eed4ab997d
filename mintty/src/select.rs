use std::collections::BTreeMap;

use crate::data::DataTree;
use crate::error::{SchemaError, UnclassifiedData};
use crate::path::ItemPath;
use crate::schema::BlockUi;

/// Structural test on a data tree node. Only used for untagged (legacy) data.
pub type Probe = fn(&DataTree) -> bool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// The node named its UI with `kind`.
    Tagged,
    /// A structural probe matched.
    Probed,
    /// Nothing matched; the fallback UI was used.
    Fallback,
}

#[derive(Debug, Clone, Copy)]
pub struct Picked<'a> {
    pub ui: &'a BlockUi,
    pub via: Selection,
}

/// Picks the implementation for a data tree node.
///
/// Nodes carrying a `kind` tag resolve through an explicit name -> UI
/// mapping. Untagged nodes go through the structural probes in registration
/// order. If neither applies, the fallback UI is used and a diagnostic is
/// logged; picking never fails.
#[derive(Debug, Clone)]
pub struct Selector {
    uis: BTreeMap<String, BlockUi>,
    probes: Vec<(String, Probe)>,
    fallback: String,
}

impl Selector {
    pub fn new(fallback: BlockUi) -> Self {
        let name = fallback.name().to_string();
        let mut uis = BTreeMap::new();
        uis.insert(name.clone(), fallback);
        Selector {
            uis,
            probes: Vec::new(),
            fallback: name,
        }
    }

    pub fn register(mut self, ui: BlockUi) -> Self {
        self.uis.insert(ui.name().to_string(), ui);
        self
    }

    /// Add a structural probe for untagged data. Probes run in the order
    /// they were added.
    pub fn probe(mut self, ui: &str, probe: Probe) -> Self {
        self.probes.push((ui.to_string(), probe));
        self
    }

    pub fn get(&self, name: &str) -> Option<&BlockUi> {
        self.uis.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.uis.keys().map(|s| s.as_str())
    }

    pub fn fallback(&self) -> &BlockUi {
        // Inserted in `new` and never removed.
        &self.uis[&self.fallback]
    }

    /// Classify without logging. `Err` means only the fallback applies.
    pub fn classify(&self, data: &DataTree) -> Result<Picked<'_>, UnclassifiedData> {
        if let Some(ui) = data.kind.as_deref().and_then(|kind| self.uis.get(kind)) {
            return Ok(Picked {
                ui,
                via: Selection::Tagged,
            });
        }
        for (name, probe) in &self.probes {
            if probe(data)
                && let Some(ui) = self.uis.get(name)
            {
                return Ok(Picked {
                    ui,
                    via: Selection::Probed,
                });
            }
        }
        Err(UnclassifiedData {
            kind: data.kind.clone(),
            fields: data.values.field_names(),
            slots: data.slots.keys().cloned().collect(),
        })
    }

    pub fn pick(&self, data: &DataTree) -> Picked<'_> {
        match self.classify(data) {
            Ok(picked) => {
                if let (Some(kind), Selection::Probed) = (&data.kind, picked.via) {
                    tracing::warn!(kind = %kind, ui = picked.ui.name(), "unknown kind, picked by structure");
                }
                tracing::debug!(ui = picked.ui.name(), via = ?picked.via, "picked ui");
                picked
            }
            Err(unclassified) => {
                tracing::warn!(
                    fallback = %self.fallback,
                    "{}, using fallback",
                    unclassified
                );
                Picked {
                    ui: self.fallback(),
                    via: Selection::Fallback,
                }
            }
        }
    }

    /// Check every node of a tree against the schema of the UI it resolves to.
    pub fn validate(&self, data: &DataTree) -> Validation {
        let mut report = Validation::default();
        data.walk(&mut |path, node| match self.classify(node) {
            Ok(picked) => report.errors.extend(picked.ui.schema().check(node, path)),
            Err(unclassified) => report.unclassified.push((path.clone(), unclassified)),
        });
        report
    }
}

#[derive(Debug, Default)]
pub struct Validation {
    pub errors: Vec<SchemaError>,
    /// Nodes that would render with the fallback UI.
    pub unclassified: Vec<(ItemPath, UnclassifiedData)>,
}

impl Validation {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.unclassified.is_empty()
    }
}
