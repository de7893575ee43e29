use std::collections::HashMap;

use crate::model::{RowId, SpecimenRecord};

/// In-memory specimen table keyed by [`RowId`], iterated in input order.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    headers: Vec<String>,
    records: Vec<SpecimenRecord>,
    index: HashMap<RowId, usize>,
}

impl RecordStore {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            records: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Append a record. A repeated `RowId` replaces nothing and returns false.
    pub fn insert(&mut self, record: SpecimenRecord) -> bool {
        if self.index.contains_key(&record.row_id) {
            return false;
        }
        self.index.insert(record.row_id, self.records.len());
        self.records.push(record);
        true
    }

    /// Source header order, used to re-emit the original schema.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn get(&self, row_id: RowId) -> Option<&SpecimenRecord> {
        self.index.get(&row_id).map(|&i| &self.records[i])
    }

    pub(crate) fn get_mut(&mut self, row_id: RowId) -> Option<&mut SpecimenRecord> {
        match self.index.get(&row_id) {
            Some(&i) => self.records.get_mut(i),
            None => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpecimenRecord> {
        self.records.iter()
    }

    pub fn row_ids(&self) -> Vec<RowId> {
        self.records.iter().map(|r| r.row_id).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Keep records matching `keep`, preserving order and row ids.
    pub fn retain(&mut self, mut keep: impl FnMut(&SpecimenRecord) -> bool) {
        self.records.retain(|r| keep(r));
        self.reindex();
    }

    /// Split into (matching, rest) without renumbering.
    pub fn partition(self, mut pred: impl FnMut(&SpecimenRecord) -> bool) -> (Self, Self) {
        let mut yes = Self::new(self.headers.clone());
        let mut no = Self::new(self.headers);
        for record in self.records {
            if pred(&record) {
                yes.insert(record);
            } else {
                no.insert(record);
            }
        }
        (yes, no)
    }

    fn reindex(&mut self) {
        self.index = self
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.row_id, i))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Taxonomy;

    fn rec(row: usize, pid: &str) -> SpecimenRecord {
        SpecimenRecord::new(RowId(row), pid, Taxonomy::default())
    }

    #[test]
    fn lookup_by_row_id_survives_filtering() {
        let mut store = RecordStore::new(vec!["Process ID".into()]);
        store.insert(rec(0, "A"));
        store.insert(rec(1, "B"));
        store.insert(rec(2, "C"));

        store.retain(|r| r.process_id != "B");

        assert_eq!(store.len(), 2);
        assert_eq!(store.get(RowId(2)).unwrap().process_id, "C");
        assert!(store.get(RowId(1)).is_none());
        assert_eq!(store.row_ids(), vec![RowId(0), RowId(2)]);
    }

    #[test]
    fn duplicate_row_id_rejected() {
        let mut store = RecordStore::default();
        assert!(store.insert(rec(0, "A")));
        assert!(!store.insert(rec(0, "B")));
        assert_eq!(store.get(RowId(0)).unwrap().process_id, "A");
    }

    #[test]
    fn partition_keeps_identity_and_order() {
        let mut store = RecordStore::new(vec!["h".into()]);
        for (i, pid) in ["A", "B", "C", "D"].iter().enumerate() {
            store.insert(rec(i, pid));
        }
        let (even, odd) = store.partition(|r| r.row_id.0 % 2 == 0);
        assert_eq!(even.row_ids(), vec![RowId(0), RowId(2)]);
        assert_eq!(odd.row_ids(), vec![RowId(1), RowId(3)]);
        assert_eq!(odd.headers(), &["h".to_string()]);
        assert_eq!(odd.get(RowId(3)).unwrap().process_id, "D");
    }
}
