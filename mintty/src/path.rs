use std::fmt;

/// Location of a block inside a data tree: the chain of (slot, item id)
/// steps from the root. The empty path is the root itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemPath {
    steps: Vec<(String, String)>,
}

impl ItemPath {
    pub fn root() -> Self {
        ItemPath::default()
    }

    pub fn child(&self, slot: &str, id: &str) -> Self {
        let mut steps = self.steps.clone();
        steps.push((slot.to_string(), id.to_string()));
        ItemPath { steps }
    }

    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    /// Id of the item this path points at, `None` for the root.
    pub fn item_id(&self) -> Option<&str> {
        self.steps.last().map(|(_, id)| id.as_str())
    }
}

impl fmt::Display for ItemPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return write!(f, "/");
        }
        for (slot, id) in &self.steps {
            write!(f, "/{}/{}", slot, id)?;
        }
        Ok(())
    }
}
