/// Whether a row can be expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collapsible {
    None,
    Collapsed,
}

/// Content operation bound to a node, run when the user activates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    GetKeyValue,
    GetContent,
    OpenFile(String),
}

/// Display descriptor for one node. Building it never performs I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeItem {
    pub label: String,
    pub collapsible: Collapsible,
    pub activation: Option<Activation>,
    pub context_value: Option<&'static str>,
}

impl TreeItem {
    pub fn new(label: impl Into<String>, leaf: bool) -> Self {
        TreeItem {
            label: label.into(),
            collapsible: if leaf {
                Collapsible::None
            } else {
                Collapsible::Collapsed
            },
            activation: None,
            context_value: None,
        }
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = Some(activation);
        self
    }

    pub fn with_context_value(mut self, value: &'static str) -> Self {
        self.context_value = Some(value);
        self
    }
}

/// Fetched content ready to be shown in a viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub language: String,
    pub content: String,
}

impl Document {
    pub fn new(language: impl Into<String>, content: impl Into<String>) -> Self {
        Document {
            language: language.into(),
            content: content.into(),
        }
    }
}
