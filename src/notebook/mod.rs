pub mod validation;

use serde::{Deserialize, Serialize};

/// Boolean state carried by every notebook record.
///
/// The last four mirror the restrictions a remote service may place on a
/// notebook (mostly linked ones). Locally created notebooks have none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotebookFlags {
    pub synchronizable: bool,
    pub dirty: bool,
    pub default: bool,
    pub last_used: bool,
    pub published: bool,
    pub favorited: bool,
    pub name_updatable: bool,
    pub updatable: bool,
    pub can_create_notes: bool,
    pub can_update_notes: bool,
}

impl Default for NotebookFlags {
    fn default() -> Self {
        Self {
            synchronizable: false,
            dirty: false,
            default: false,
            last_used: false,
            published: false,
            favorited: false,
            name_updatable: true,
            updatable: true,
            can_create_notes: true,
            can_update_notes: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotebookRecord {
    pub local_id: String,
    #[serde(default)]
    pub guid: Option<String>,
    #[serde(default)]
    pub linked_notebook_guid: Option<String>,
    pub name: String,
    #[serde(default)]
    pub stack: Option<String>,
    #[serde(default)]
    pub flags: NotebookFlags,
    #[serde(default)]
    pub note_count: u32,
}

impl NotebookRecord {
    /// A fresh, unsynchronized notebook with a newly generated local id.
    pub fn new_local(name: &str, stack: Option<&str>) -> Self {
        Self {
            local_id: uuid::Uuid::new_v4().to_string(),
            guid: None,
            linked_notebook_guid: None,
            name: name.to_string(),
            stack: stack.map(str::to_string),
            flags: NotebookFlags {
                dirty: true,
                ..Default::default()
            },
            note_count: 0,
        }
    }

    /// Scope key used for name uniqueness: empty for the user's own account.
    pub fn scope(&self) -> &str {
        self.linked_notebook_guid.as_deref().unwrap_or("")
    }

    pub fn is_linked(&self) -> bool {
        self.linked_notebook_guid
            .as_deref()
            .map(|g| !g.is_empty())
            .unwrap_or(false)
    }

    pub fn is_synchronized(&self) -> bool {
        self.guid.as_deref().map(|g| !g.is_empty()).unwrap_or(false)
    }

    /// Stack name with empty strings treated as "no stack".
    pub fn stack_name(&self) -> Option<&str> {
        self.stack.as_deref().filter(|s| !s.is_empty())
    }

    pub fn linked_guid(&self) -> Option<&str> {
        self.linked_notebook_guid.as_deref().filter(|g| !g.is_empty())
    }
}

/// A notebook shared from another account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedNotebook {
    pub guid: String,
    pub username: String,
    #[serde(default)]
    pub share_name: Option<String>,
}

/// Filter for [`crate::catalog::NotebookCatalog::notebook_names`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotebookFilter {
    pub can_create_notes: Option<bool>,
    pub updatable: Option<bool>,
    pub name_updatable: Option<bool>,
    /// `None` matches all scopes, `Some("")` the user's own notebooks only.
    pub linked_notebook_guid: Option<String>,
}

impl NotebookFilter {
    pub fn matches(&self, record: &NotebookRecord) -> bool {
        if let Some(v) = self.can_create_notes {
            if record.flags.can_create_notes != v {
                return false;
            }
        }
        if let Some(v) = self.updatable {
            if record.flags.updatable != v {
                return false;
            }
        }
        if let Some(v) = self.name_updatable {
            if record.flags.name_updatable != v {
                return false;
            }
        }
        if let Some(guid) = &self.linked_notebook_guid {
            if record.scope() != guid {
                return false;
            }
        }
        true
    }
}
