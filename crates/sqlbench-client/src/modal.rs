//! The reusable form dialog.
//!
//! One dialog serves every form in the workbench. What confirming it does
//! is decided by its [`ModalIntent`], not by how it was opened.

use crate::records::ShortcutRecord;

/// What confirming the dialog should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalIntent {
    /// Create a quick-access shortcut.
    AddShortcut,
    /// Update the shortcut with this id.
    EditShortcut(i64),
    /// Insert a row into `table`, asking for `columns`.
    AddRow {
        /// Target table.
        table: String,
        /// Columns in form order.
        columns: Vec<String>,
    },
    /// Show a row; confirming only closes the dialog.
    ShowDetail,
}

/// One labelled input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalField {
    /// Field name, also its label.
    pub name: String,
    /// Current value.
    pub value: String,
    /// Whether the user may change the value.
    pub read_only: bool,
}

impl ModalField {
    fn editable(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            read_only: false,
        }
    }
}

/// An open dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modal {
    /// What confirming does.
    pub intent: ModalIntent,
    /// Dialog title.
    pub title: String,
    /// Label of the confirm button.
    pub confirm_label: String,
    /// Inputs in display order.
    pub fields: Vec<ModalField>,
}

impl Modal {
    /// Field holding a shortcut's name.
    pub const NAME_FIELD: &'static str = "name";
    /// Field holding a shortcut's statement.
    pub const SQL_FIELD: &'static str = "sql";

    /// An empty shortcut form.
    #[must_use]
    pub fn add_shortcut() -> Self {
        Self {
            intent: ModalIntent::AddShortcut,
            title: "Add Quick Access".into(),
            confirm_label: "Save".into(),
            fields: vec![
                ModalField::editable(Self::NAME_FIELD, ""),
                ModalField::editable(Self::SQL_FIELD, ""),
            ],
        }
    }

    /// A shortcut form prefilled from `shortcut`.
    #[must_use]
    pub fn edit_shortcut(shortcut: &ShortcutRecord) -> Self {
        Self {
            intent: ModalIntent::EditShortcut(shortcut.id),
            title: "Edit Quick Access".into(),
            confirm_label: "Update".into(),
            fields: vec![
                ModalField::editable(Self::NAME_FIELD, shortcut.name.as_str()),
                ModalField::editable(Self::SQL_FIELD, shortcut.sql.as_str()),
            ],
        }
    }

    /// A new-row form for `table`. With `duplicate` set the dialog is
    /// titled as a copy of an existing row; `defaults` carries its values.
    #[must_use]
    pub fn add_row(table: &str, defaults: Vec<(String, String)>, duplicate: bool) -> Self {
        let title = if duplicate {
            format!("Duplicate Row in {table}")
        } else {
            format!("Add New Row to {table}")
        };
        Self {
            intent: ModalIntent::AddRow {
                table: table.to_string(),
                columns: defaults.iter().map(|(c, _)| c.clone()).collect(),
            },
            title,
            confirm_label: "Insert".into(),
            fields: defaults
                .into_iter()
                .map(|(name, value)| ModalField::editable(name, value))
                .collect(),
        }
    }

    /// A read-only view of one row.
    #[must_use]
    pub fn row_detail(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            intent: ModalIntent::ShowDetail,
            title: "Row Details".into(),
            confirm_label: "Close".into(),
            fields: entries
                .into_iter()
                .map(|(name, value)| ModalField {
                    name,
                    value,
                    read_only: true,
                })
                .collect(),
        }
    }

    /// Returns a field's value.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    /// Sets a field's value. Returns `false` for unknown or read-only
    /// fields.
    pub fn set_value(&mut self, name: &str, value: impl Into<String>) -> bool {
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(field) if !field.read_only => {
                field.value = value.into();
                true
            }
            _ => false,
        }
    }

    /// Returns `(name, value)` pairs in display order.
    #[must_use]
    pub fn values(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), f.value.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_titles_and_labels() {
        let add = Modal::add_shortcut();
        assert_eq!((add.title.as_str(), add.confirm_label.as_str()), ("Add Quick Access", "Save"));

        let shortcut = ShortcutRecord {
            id: 4,
            name: "users".into(),
            sql: "SELECT * FROM users".into(),
        };
        let edit = Modal::edit_shortcut(&shortcut);
        assert_eq!(edit.intent, ModalIntent::EditShortcut(4));
        assert_eq!(edit.confirm_label, "Update");
        assert_eq!(edit.value(Modal::SQL_FIELD), Some("SELECT * FROM users"));

        let row = Modal::add_row("orders", vec![("qty".into(), String::new())], false);
        assert_eq!(row.title, "Add New Row to orders");
        let dup = Modal::add_row("orders", vec![("qty".into(), "3".into())], true);
        assert_eq!(dup.title, "Duplicate Row in orders");
        assert_eq!(dup.confirm_label, "Insert");
    }

    #[test]
    fn test_detail_fields_are_read_only() {
        let mut detail = Modal::row_detail([("id".to_string(), "1".to_string())]);
        assert_eq!(detail.title, "Row Details");
        assert!(!detail.set_value("id", "2"));
        assert_eq!(detail.value("id"), Some("1"));
    }

    #[test]
    fn test_set_value() {
        let mut modal = Modal::add_shortcut();
        assert!(modal.set_value(Modal::NAME_FIELD, "users"));
        assert!(!modal.set_value("missing", "x"));
        assert_eq!(
            modal.values(),
            vec![("name".to_string(), "users".to_string()), ("sql".to_string(), String::new())]
        );
    }
}
