//! The ordered quick-access list.
//!
//! The list is the source of truth for the current order until the order is
//! persisted. Drag gestures move items locally; the settled order is sent to
//! the record store as one complete id sequence.

use crate::records::ShortcutRecord;

/// Vertical extent of a rendered list item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemGeometry {
    /// Shortcut id.
    pub id: i64,
    /// Top edge.
    pub top: f64,
    /// Height.
    pub height: f64,
}

impl ItemGeometry {
    /// Returns the vertical midpoint.
    #[must_use]
    pub fn midpoint(&self) -> f64 {
        self.top + self.height / 2.0
    }
}

/// Shortcuts in display order, with drag state.
#[derive(Debug, Clone, Default)]
pub struct ShortcutList {
    items: Vec<ShortcutRecord>,
    dragging: Option<i64>,
}

impl ShortcutList {
    /// Creates a list in the given order.
    #[must_use]
    pub const fn new(items: Vec<ShortcutRecord>) -> Self {
        Self {
            items,
            dragging: None,
        }
    }

    /// Replaces the list with a freshly loaded one. Any drag in progress is
    /// dropped.
    pub fn replace(&mut self, items: Vec<ShortcutRecord>) {
        self.items = items;
        self.dragging = None;
    }

    /// Returns the shortcuts in display order.
    #[must_use]
    pub fn items(&self) -> &[ShortcutRecord] {
        &self.items
    }

    /// Returns the ids in display order.
    #[must_use]
    pub fn ordered_ids(&self) -> Vec<i64> {
        self.items.iter().map(|s| s.id).collect()
    }

    /// Returns a shortcut by id.
    #[must_use]
    pub fn get(&self, id: i64) -> Option<&ShortcutRecord> {
        self.items.iter().find(|s| s.id == id)
    }

    /// Returns the id being dragged, if any.
    #[must_use]
    pub const fn dragging(&self) -> Option<i64> {
        self.dragging
    }

    /// Starts dragging a shortcut. Returns `false` if the id is unknown.
    pub fn drag_start(&mut self, id: i64) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.dragging = Some(id);
        true
    }

    /// Moves the dragged item for a pointer at `pointer_y`.
    ///
    /// The item is placed right before the first other item whose midpoint
    /// lies below the pointer, or at the end if there is none. Items without
    /// geometry are skipped. Returns whether the order changed.
    pub fn drag_over(&mut self, pointer_y: f64, geometry: &[ItemGeometry]) -> bool {
        let Some(dragged) = self.dragging else {
            return false;
        };
        let Some(from) = self.items.iter().position(|s| s.id == dragged) else {
            return false;
        };

        let before = self.ordered_ids();
        let item = self.items.remove(from);
        let target = self.items.iter().position(|s| {
            geometry
                .iter()
                .find(|g| g.id == s.id)
                .is_some_and(|g| pointer_y < g.midpoint())
        });
        match target {
            Some(idx) => self.items.insert(idx, item),
            None => self.items.push(item),
        }
        self.ordered_ids() != before
    }

    /// Ends the drag and returns the order to persist.
    ///
    /// Returns `None` if no drag was in progress.
    pub fn drag_end(&mut self) -> Option<Vec<i64>> {
        self.dragging.take().map(|_| self.ordered_ids())
    }

    /// Moves the item at `from` to `to` (zero-based positions).
    ///
    /// Returns `false` and leaves the list untouched if either position is
    /// out of range.
    pub fn move_item(&mut self, from: usize, to: usize) -> bool {
        if from >= self.items.len() || to >= self.items.len() {
            return false;
        }
        let item = self.items.remove(from);
        self.items.insert(to, item);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list() -> ShortcutList {
        ShortcutList::new(
            [(10, "users"), (20, "orders"), (30, "events"), (40, "logs")]
                .into_iter()
                .map(|(id, name)| ShortcutRecord {
                    id,
                    name: name.into(),
                    sql: format!("SELECT * FROM {name} LIMIT 50"),
                })
                .collect(),
        )
    }

    /// Geometry of 20px rows in the list's current order.
    fn layout(list: &ShortcutList) -> Vec<ItemGeometry> {
        list.items()
            .iter()
            .zip(0u32..)
            .map(|(s, i)| ItemGeometry {
                id: s.id,
                top: f64::from(i * 20),
                height: 20.0,
            })
            .collect()
    }

    #[test]
    fn test_drag_third_to_first() {
        let mut list = list();
        let geometry = layout(&list);
        assert!(list.drag_start(30));
        assert!(list.drag_over(2.0, &geometry));
        assert_eq!(list.drag_end(), Some(vec![30, 10, 20, 40]));
        assert_eq!(list.dragging(), None);
    }

    #[test]
    fn test_drag_past_last_midpoint_appends() {
        let mut list = list();
        let geometry = layout(&list);
        list.drag_start(10);
        list.drag_over(75.0, &geometry);
        assert_eq!(list.ordered_ids(), [20, 30, 40, 10]);
    }

    #[test]
    fn test_drag_over_own_slot_is_no_change() {
        let mut list = list();
        let geometry = layout(&list);
        list.drag_start(20);
        assert!(!list.drag_over(25.0, &geometry));
        assert_eq!(list.ordered_ids(), [10, 20, 30, 40]);
    }

    #[test]
    fn test_drag_without_start() {
        let mut list = list();
        let geometry = layout(&list);
        assert!(!list.drag_over(0.0, &geometry));
        assert_eq!(list.drag_end(), None);
        assert!(!list.drag_start(99));
    }

    #[test]
    fn test_move_item() {
        let mut list = list();
        assert!(list.move_item(2, 0));
        assert_eq!(list.ordered_ids(), [30, 10, 20, 40]);
        assert!(list.move_item(0, 3));
        assert_eq!(list.ordered_ids(), [10, 20, 40, 30]);
        assert!(!list.move_item(4, 0));
    }
}
