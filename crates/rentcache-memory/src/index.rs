//! Insertion-ordered product storage keyed by id

use rentcache_core::ProductRecord;
use std::collections::HashMap;

/// Products in first-insertion order with an id lookup table.
///
/// Re-inserting an id overwrites the record at its original position, so
/// iteration order is stable across updates. Records are only ever removed
/// all at once.
#[derive(Debug, Default, Clone)]
pub(crate) struct ProductIndex {
    records: Vec<ProductRecord>,
    positions: HashMap<u64, usize>,
}

impl ProductIndex {
    pub(crate) fn upsert(&mut self, product: ProductRecord) {
        match self.positions.get(&product.id) {
            Some(&position) => self.records[position] = product,
            None => {
                self.positions.insert(product.id, self.records.len());
                self.records.push(product);
            }
        }
    }

    pub(crate) fn get(&self, id: u64) -> Option<&ProductRecord> {
        self.positions.get(&id).map(|&position| &self.records[position])
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &ProductRecord> {
        self.records.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn clear(&mut self) {
        self.records.clear();
        self.positions.clear();
    }
}

impl FromIterator<ProductRecord> for ProductIndex {
    fn from_iter<I: IntoIterator<Item = ProductRecord>>(iter: I) -> Self {
        let mut index = ProductIndex::default();
        for product in iter {
            index.upsert(product);
        }
        index
    }
}
