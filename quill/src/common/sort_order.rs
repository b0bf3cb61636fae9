/// Specifies the direction for sorting sub-documents.
///
/// Used with [crate::collection::order_by] and
/// [crate::collection::FindOptions::sort_by].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Sort from smallest to largest value.
    Ascending,
    /// Sort from largest to smallest value.
    Descending,
}

/// An ordered list of `(field, order)` pairs. Earlier fields take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortableFields {
    sorting_order: Vec<(String, SortOrder)>,
}

impl SortableFields {
    pub fn new() -> SortableFields {
        SortableFields {
            sorting_order: Vec::new(),
        }
    }

    pub fn add_sorted_field(mut self, field_name: String, sort_order: SortOrder) -> SortableFields {
        self.sorting_order.push((field_name, sort_order));
        self
    }

    pub fn field_names(&self) -> Vec<String> {
        self.sorting_order
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn sorting_order(&self) -> &[(String, SortOrder)] {
        &self.sorting_order
    }

    pub fn is_empty(&self) -> bool {
        self.sorting_order.is_empty()
    }
}
