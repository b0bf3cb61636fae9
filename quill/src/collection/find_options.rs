use crate::common::{SortOrder, SortableFields};

/// Options for controlling queries over an ephemeral sub-collection.
///
/// `FindOptions` specifies sorting, pagination and distinctness of the
/// results. Sorting is applied first, then `distinct`, then `skip` and
/// `limit`.
///
/// # Examples
///
/// ```rust,ignore
/// use quill::collection::{FindOptions, order_by, skip_by};
/// use quill::common::SortOrder;
///
/// let options = FindOptions::new()
///     .sort_by("price", SortOrder::Descending)
///     .skip(10)
///     .limit(20);
///
/// let options = order_by("name", SortOrder::Ascending);
/// let options = skip_by(5);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub(crate) sort_by: Option<SortableFields>,
    pub(crate) skip: Option<u64>,
    pub(crate) limit: Option<u64>,
    pub(crate) distinct: bool,
}

/// Creates `FindOptions` with sorting by a field.
pub fn order_by(field_name: &str, sort_order: SortOrder) -> FindOptions {
    FindOptions::new().sort_by(field_name, sort_order)
}

/// Creates `FindOptions` that skips the first `skip` results.
pub fn skip_by(skip: u64) -> FindOptions {
    FindOptions::new().skip(skip)
}

/// Creates `FindOptions` that returns at most `limit` results.
pub fn limit_to(limit: u64) -> FindOptions {
    FindOptions::new().limit(limit)
}

/// Creates `FindOptions` that removes duplicate results.
pub fn distinct() -> FindOptions {
    FindOptions::new().distinct()
}

impl FindOptions {
    pub fn new() -> FindOptions {
        FindOptions {
            sort_by: None,
            skip: None,
            limit: None,
            distinct: false,
        }
    }

    pub fn skip(mut self, skip: u64) -> FindOptions {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: u64) -> FindOptions {
        self.limit = Some(limit);
        self
    }

    /// Adds a sort key. Keys added first take precedence.
    pub fn sort_by(mut self, field_name: &str, sort_order: SortOrder) -> FindOptions {
        let fields = self.sort_by.take().unwrap_or_default();
        self.sort_by = Some(fields.add_sorted_field(field_name.to_string(), sort_order));
        self
    }

    pub fn distinct(mut self) -> FindOptions {
        self.distinct = true;
        self
    }

    pub fn get_skip(&self) -> Option<u64> {
        self.skip
    }

    pub fn get_limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn get_sort_by(&self) -> Option<&SortableFields> {
        self.sort_by.as_ref()
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_by() {
        let options = order_by("name", SortOrder::Ascending);

        let fields = options.sort_by.expect("sort fields");
        assert_eq!(fields.sorting_order().len(), 1);
        assert_eq!(fields.sorting_order()[0].0, "name");
        assert_eq!(fields.sorting_order()[0].1, SortOrder::Ascending);
    }

    #[test]
    fn test_skip_by() {
        let options = skip_by(10);

        assert_eq!(options.skip, Some(10));
        assert!(options.sort_by.is_none());
        assert!(options.limit.is_none());
        assert!(!options.distinct);
    }

    #[test]
    fn test_limit_to() {
        let options = limit_to(5);

        assert_eq!(options.limit, Some(5));
        assert!(options.skip.is_none());
    }

    #[test]
    fn test_distinct() {
        let options = distinct();

        assert!(options.distinct);
        assert!(options.sort_by.is_none());
    }

    #[test]
    fn test_chained_options() {
        let options = FindOptions::new()
            .sort_by("a", SortOrder::Descending)
            .sort_by("b", SortOrder::Ascending)
            .skip(1)
            .limit(2);

        assert_eq!(options.get_skip(), Some(1));
        assert_eq!(options.get_limit(), Some(2));
        let fields = options.get_sort_by().expect("sort fields");
        assert_eq!(fields.field_names(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_default_is_empty() {
        assert_eq!(FindOptions::default(), FindOptions::new());
    }
}
