mod versioned_schema;

pub use versioned_schema::{
    open_versioned, validate_columns, Table, VersionedSchema, BASE_DB_VERSION,
};
