// event constants
pub const QUILL_EVENT: &str = "quill_event";
pub const DATABASE_RECIPIENT: &str = "database";

// document constants
pub const DEFAULT_RESERVED_KEY_PREFIX: &str = "__";
pub const SUB_COLLECTION_PREFIX: &str = "__quill_sub_";
pub const FIELD_SEPARATOR: &str = ".";
pub const POSITIONAL_SUFFIX: &str = ".$";

// update operator constants
pub const OPERATOR_PREFIX: &str = "$";
pub const INDEX_KEY: &str = "$index";
pub const UNSET_KEY: &str = "$unset";

// sub-document constants
pub const NO_MATCHING_PATH_MESSAGE: &str =
    "No objects found in the parent documents with a matching path of: ";
