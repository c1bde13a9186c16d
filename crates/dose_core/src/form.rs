use crate::calculator::EntryInput;
use crate::dose::DoseUnit;

/// Stable identity of a drug row. Ids are never reused within one form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRow {
    pub id: RowId,
    pub amount: String,
    pub unit: DoseUnit,
}

/// Ordered set of drug rows being edited. Opens with a single empty row.
#[derive(Debug, Clone)]
pub struct EntryForm {
    rows: Vec<EntryRow>,
    last_id: u64,
}

impl Default for EntryForm {
    fn default() -> Self {
        Self::new()
    }
}

impl EntryForm {
    pub fn new() -> Self {
        let mut form = Self {
            rows: Vec::new(),
            last_id: 0,
        };
        form.add_row();
        form
    }

    pub fn add_row(&mut self) -> RowId {
        self.last_id += 1;
        let id = RowId(self.last_id);
        self.rows.push(EntryRow {
            id,
            amount: String::new(),
            unit: DoseUnit::default(),
        });
        id
    }

    /// Returns false when no row has `id`.
    pub fn remove_row(&mut self, id: RowId) -> bool {
        let before = self.rows.len();
        self.rows.retain(|row| row.id != id);
        self.rows.len() != before
    }

    pub fn row_mut(&mut self, id: RowId) -> Option<&mut EntryRow> {
        self.rows.iter_mut().find(|row| row.id == id)
    }

    pub fn rows(&self) -> &[EntryRow] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [EntryRow] {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn inputs(&self) -> Vec<EntryInput> {
        self.rows
            .iter()
            .map(|row| EntryInput::new(row.amount.clone(), row.unit))
            .collect()
    }

    /// Drops every row and starts over with one fresh row.
    pub fn reset(&mut self) {
        self.rows.clear();
        self.add_row();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_one_row() {
        let form = EntryForm::new();
        assert_eq!(form.len(), 1);
        assert_eq!(form.rows()[0].id, RowId(1));
    }

    #[test]
    fn ids_keep_increasing_after_removal_and_reset() {
        let mut form = EntryForm::new();
        let second = form.add_row();
        assert!(form.remove_row(second));
        assert!(!form.remove_row(second));
        assert_eq!(form.add_row(), RowId(3));

        form.reset();
        assert_eq!(form.len(), 1);
        assert_eq!(form.rows()[0].id, RowId(4));
    }

    #[test]
    fn inputs_follow_row_order() {
        let mut form = EntryForm::new();
        let first = form.rows()[0].id;
        let second = form.add_row();
        form.row_mut(first).unwrap().amount = "2".into();
        let row = form.row_mut(second).unwrap();
        row.amount = "1".into();
        row.unit = DoseUnit::Week;

        form.remove_row(first);
        assert_eq!(form.inputs(), vec![EntryInput::new("1", DoseUnit::Week)]);
    }

    #[test]
    fn all_rows_can_be_removed() {
        let mut form = EntryForm::new();
        let id = form.rows()[0].id;
        form.remove_row(id);
        assert!(form.is_empty());
        assert!(form.inputs().is_empty());
    }
}
