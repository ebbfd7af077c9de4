use std::fmt;

/// What a request to the controller's URL asks for, read from `o`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Add,
    Edit,
    Delete,
    DeleteMultiple,
    CustomAction,
}

impl Operation {
    /// Maps the `o` query parameter to an operation. Unknown or absent
    /// values mean [`Operation::List`].
    pub fn from_param(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("add") => Self::Add,
            Some("edit") => Self::Edit,
            Some("delete") => Self::Delete,
            Some("delete_multiple") => Self::DeleteMultiple,
            Some("action") => Self::CustomAction,
            _ => Self::List,
        }
    }

    /// The `o` value that selects this operation; `None` for the list.
    pub const fn as_param(self) -> Option<&'static str> {
        match self {
            Self::List => None,
            Self::Add => Some("add"),
            Self::Edit => Some("edit"),
            Self::Delete => Some("delete"),
            Self::DeleteMultiple => Some("delete_multiple"),
            Self::CustomAction => Some("action"),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param().unwrap_or("list"))
    }
}
