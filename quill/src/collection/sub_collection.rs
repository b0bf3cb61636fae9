use crate::collection::{Document, FindOptions};
use crate::common::{SortOrder, Value, SUB_COLLECTION_PREFIX};
use crate::errors::{ErrorKind, QuillError, QuillResult};
use crate::filter::{is_all_filter, Filter};
use itertools::Itertools;
use std::cmp::Ordering;

/// A throwaway, query-only collection over the items of one array.
///
/// It is never registered anywhere and never outlives the call that created
/// it: [SubCollection::drop_collection] is called explicitly on the normal
/// path and by `Drop` on every other path.
///
/// Scalar items are queried as if they were a document with the single key
/// `$`, the same convention `elem_match` uses.
pub(crate) struct SubCollection {
    name: String,
    items: Vec<Value>,
    dropped: bool,
}

impl SubCollection {
    pub(crate) fn new(owner_id: &str) -> Self {
        let name = format!("{}{}", SUB_COLLECTION_PREFIX, owner_id);
        log::trace!("Creating sub-collection {}", name);
        SubCollection {
            name,
            items: Vec::new(),
            dropped: false,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Replaces the contents with `items`.
    pub(crate) fn set_data(&mut self, items: Vec<Value>) -> QuillResult<()> {
        self.ensure_open()?;
        log::trace!("Seeding sub-collection {} with {} items", self.name, items.len());
        self.items = items;
        Ok(())
    }

    pub(crate) fn size(&self) -> usize {
        self.items.len()
    }

    /// Returns the items matching `filter`, shaped by `options`. Sorting runs
    /// first, then `distinct`, then `skip` and `limit`.
    pub(crate) fn find(&self, filter: &Filter, options: &FindOptions) -> QuillResult<Vec<Value>> {
        self.ensure_open()?;

        let mut matched: Vec<(Document, &Value)> = Vec::with_capacity(self.items.len());
        for item in &self.items {
            let view = query_view(item);
            if is_all_filter(filter) || filter.apply(&view)? {
                matched.push((view, item));
            }
        }

        if let Some(sort_by) = options.get_sort_by() {
            let mut keyed = Vec::with_capacity(matched.len());
            for (view, item) in matched {
                let mut keys = Vec::with_capacity(sort_by.sorting_order().len());
                for (field, _) in sort_by.sorting_order() {
                    keys.push(view.get(field)?);
                }
                keyed.push((keys, view, item));
            }

            // stable, so ties keep insertion order
            keyed.sort_by(|(a, _, _), (b, _, _)| {
                for (index, (_, order)) in sort_by.sorting_order().iter().enumerate() {
                    let ordering = match order {
                        SortOrder::Ascending => a[index].cmp(&b[index]),
                        SortOrder::Descending => b[index].cmp(&a[index]),
                    };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
            matched = keyed.into_iter().map(|(_, view, item)| (view, item)).collect();
        }

        let results = matched.into_iter().map(|(_, item)| item.clone());
        let results: Vec<Value> = if options.is_distinct() {
            results.unique().collect()
        } else {
            results.collect()
        };

        let skip = options.get_skip().unwrap_or(0) as usize;
        let limit = options.get_limit().map(|l| l as usize).unwrap_or(usize::MAX);
        Ok(results.into_iter().skip(skip).take(limit).collect())
    }

    /// Discards every item. Further use of the collection is an error.
    pub(crate) fn drop_collection(&mut self) {
        if !self.dropped {
            log::trace!("Dropping sub-collection {}", self.name);
            self.items.clear();
            self.dropped = true;
        }
    }

    #[cfg(test)]
    pub(crate) fn is_dropped(&self) -> bool {
        self.dropped
    }

    fn ensure_open(&self) -> QuillResult<()> {
        if self.dropped {
            log::error!("Sub-collection {} has been dropped", self.name);
            return Err(QuillError::new(
                &format!("Sub-collection {} has been dropped", self.name),
                ErrorKind::InvalidOperation,
            ));
        }
        Ok(())
    }
}

impl Drop for SubCollection {
    fn drop(&mut self) {
        self.drop_collection();
    }
}

fn query_view(item: &Value) -> Document {
    match item {
        Value::Document(doc) => doc.clone(),
        other => {
            let mut doc = Document::new();
            doc.insert("$", other.clone());
            doc
        }
    }
}
