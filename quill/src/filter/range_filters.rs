use std::{any::Any, cmp::Ordering, fmt::Display};

use crate::{collection::Document, common::Value, errors::QuillResult};

use super::{any_match, FilterProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ComparisonMode {
    Greater,
    GreaterEqual,
    Lesser,
    LesserEqual,
}

impl ComparisonMode {
    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            ComparisonMode::Greater => ordering == Ordering::Greater,
            ComparisonMode::GreaterEqual => ordering != Ordering::Less,
            ComparisonMode::Lesser => ordering == Ordering::Less,
            ComparisonMode::LesserEqual => ordering != Ordering::Greater,
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            ComparisonMode::Greater => ">",
            ComparisonMode::GreaterEqual => ">=",
            ComparisonMode::Lesser => "<",
            ComparisonMode::LesserEqual => "<=",
        }
    }
}

/// Orders two values only when they belong to the same type class, so a
/// range never matches across types (a missing field is never `< 5`).
fn compare_same_type(a: &Value, b: &Value) -> Option<Ordering> {
    if a.type_rank() == b.type_rank() && !a.is_null() {
        Some(a.cmp(b))
    } else {
        None
    }
}

/// Matches documents whose field compares to a value in the given way.
pub(crate) struct ComparisonFilter {
    field_name: String,
    field_value: Value,
    comparison_mode: ComparisonMode,
}

impl ComparisonFilter {
    pub(crate) fn new(field_name: String, field_value: Value, comparison_mode: ComparisonMode) -> Self {
        ComparisonFilter {
            field_name,
            field_value,
            comparison_mode,
        }
    }
}

impl Display for ComparisonFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({} {} {})",
            self.field_name,
            self.comparison_mode.symbol(),
            self.field_value
        )
    }
}

impl FilterProvider for ComparisonFilter {
    fn apply(&self, entry: &Document) -> QuillResult<bool> {
        let value = entry.get(&self.field_name)?;
        any_match(&value, |v| {
            Ok(compare_same_type(v, &self.field_value)
                .map(|ordering| self.comparison_mode.accepts(ordering))
                .unwrap_or(false))
        })
    }

    fn field_name(&self) -> Option<&str> {
        Some(&self.field_name)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Matches documents whose field lies between two bounds.
pub(crate) struct BetweenFilter {
    field_name: String,
    lower: Value,
    upper: Value,
    inclusive: bool,
}

impl BetweenFilter {
    pub(crate) fn new(field_name: String, lower: Value, upper: Value, inclusive: bool) -> Self {
        BetweenFilter {
            field_name,
            lower,
            upper,
            inclusive,
        }
    }

    fn within(&self, value: &Value) -> bool {
        let (lower_mode, upper_mode) = if self.inclusive {
            (ComparisonMode::GreaterEqual, ComparisonMode::LesserEqual)
        } else {
            (ComparisonMode::Greater, ComparisonMode::Lesser)
        };

        let above = compare_same_type(value, &self.lower)
            .map(|o| lower_mode.accepts(o))
            .unwrap_or(false);
        let below = compare_same_type(value, &self.upper)
            .map(|o| upper_mode.accepts(o))
            .unwrap_or(false);
        above && below
    }
}

impl Display for BetweenFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (open, close) = if self.inclusive { ("[", "]") } else { ("(", ")") };
        write!(
            f,
            "({} between {}{}, {}{})",
            self.field_name, open, self.lower, self.upper, close
        )
    }
}

impl FilterProvider for BetweenFilter {
    fn apply(&self, entry: &Document) -> QuillResult<bool> {
        let value = entry.get(&self.field_name)?;
        any_match(&value, |v| Ok(self.within(v)))
    }

    fn field_name(&self) -> Option<&str> {
        Some(&self.field_name)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
