//! Default dump file names

use chrono::{Local, NaiveDateTime};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H%M%S";

/// `<object>_<yyyy-MM-dd_HHmmss>_<schema>.sql` at the current local time.
///
/// The object part is empty for schema-wide dumps.
pub fn default_dump_file_name(object: Option<&str>, schema: &str) -> String {
    dump_file_name_at(object, schema, Local::now().naive_local())
}

pub fn dump_file_name_at(object: Option<&str>, schema: &str, at: NaiveDateTime) -> String {
    format!(
        "{}_{}_{}.sql",
        object.unwrap_or(""),
        at.format(TIMESTAMP_FORMAT),
        schema
    )
}
