use crate::collection::{Document, FindOptions, SubCollection};
use crate::common::{Value, NO_MATCHING_PATH_MESSAGE};
use crate::errors::QuillResult;
use crate::filter::Filter;

/// Options of [QuillDocument::find_sub](crate::document::QuillDocument::find_sub).
#[derive(Debug, Clone, Default)]
pub struct SubDocumentOptions {
    /// Stop at the first parent whose array yields results and return its
    /// first result.
    pub return_first: bool,
    /// Return [SubDocuments::Stats] instead of a single value.
    pub stats: bool,
    /// Keep one result list per parent instead of flattening.
    pub split: bool,
    pub find_options: FindOptions,
}

impl SubDocumentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn return_first(mut self) -> Self {
        self.return_first = true;
        self
    }

    pub fn stats(mut self) -> Self {
        self.stats = true;
        self
    }

    pub fn split(mut self) -> Self {
        self.split = true;
        self
    }

    pub fn find_options(mut self, find_options: FindOptions) -> Self {
        self.find_options = find_options;
        self
    }
}

/// Aggregated outcome of a sub-document search.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubDocumentStats {
    /// Copies of the parent documents the search ran over, not just their
    /// number; see [SubDocumentStats::parent_count].
    pub parents: Vec<Document>,
    /// Number of sub-documents found across every parent.
    pub sub_doc_total: usize,
    /// Found sub-documents, flat or one array per parent when split.
    pub sub_docs: Vec<Value>,
    /// Whether any parent held an array at the path.
    pub path_found: bool,
    /// Set when no parent held an array at the path.
    pub err: Option<String>,
}

impl SubDocumentStats {
    /// Number of parent documents the search ran over.
    pub fn parent_count(&self) -> usize {
        self.parents.len()
    }
}

/// Result of [QuillDocument::find_sub](crate::document::QuillDocument::find_sub).
#[derive(Debug, Clone, PartialEq)]
pub enum SubDocuments {
    /// The first sub-document found, if any.
    Single(Option<Value>),
    Stats(SubDocumentStats),
}

impl SubDocuments {
    pub fn single(&self) -> Option<&Value> {
        match self {
            SubDocuments::Single(value) => value.as_ref(),
            SubDocuments::Stats(_) => None,
        }
    }

    pub fn stats(&self) -> Option<&SubDocumentStats> {
        match self {
            SubDocuments::Stats(stats) => Some(stats),
            SubDocuments::Single(_) => None,
        }
    }

    pub fn into_single(self) -> Option<Value> {
        match self {
            SubDocuments::Single(value) => value,
            SubDocuments::Stats(stats) => stats.sub_docs.into_iter().next(),
        }
    }
}

/// Searches the arrays found at `path` in each parent.
///
/// Every parent gets its own ephemeral sub-collection which is gone before
/// the next parent is looked at.
pub(crate) fn find_sub_documents(
    owner_id: &str,
    parents: Vec<Document>,
    path: &str,
    filter: &Filter,
    options: &SubDocumentOptions,
) -> QuillResult<SubDocuments> {
    let mut sub_docs = Vec::new();
    let mut sub_doc_total = 0;
    let mut path_found = false;

    for parent in &parents {
        let items = match parent.get(path)? {
            Value::Array(items) => items,
            other => {
                log::debug!("Path {} holds {} instead of an array", path, other.type_name());
                continue;
            }
        };
        path_found = true;

        let mut collection = SubCollection::new(owner_id);
        collection.set_data(items)?;
        let results = collection.find(filter, &options.find_options)?;
        log::trace!(
            "Sub-collection {} matched {} of {} items",
            collection.name(),
            results.len(),
            collection.size()
        );
        collection.drop_collection();

        if options.return_first && !results.is_empty() {
            return Ok(SubDocuments::Single(results.into_iter().next()));
        }

        sub_doc_total += results.len();
        if options.split {
            sub_docs.push(Value::Array(results));
        } else {
            sub_docs.extend(results);
        }
    }

    if options.stats {
        let err = if path_found {
            None
        } else {
            Some(format!("{}{}", NO_MATCHING_PATH_MESSAGE, path))
        };
        return Ok(SubDocuments::Stats(SubDocumentStats {
            parents,
            sub_doc_total,
            sub_docs,
            path_found,
            err,
        }));
    }

    Ok(SubDocuments::Single(sub_docs.into_iter().next()))
}
