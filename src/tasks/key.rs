use std::fmt;
use std::sync::Arc;

/// `(name, label)` pair identifying one task instance.
///
/// Displays as `name.label`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskKey {
    name: Arc<str>,
    label: Arc<str>,
}

impl TaskKey {
    pub fn new(name: impl Into<Arc<str>>, label: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
        }
    }

    /// Plugin name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instance label.
    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.name, self.label)
    }
}
