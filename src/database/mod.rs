//! Schema model: identifier sanitizing, column type inference and
//! `CREATE TABLE` generation.

pub mod column;
pub mod identifier;
pub mod table;

pub use column::infer_type;
pub use column::Classification;
pub use column::Column;
pub use column::SqlType;
pub use identifier::sanitize;
pub use table::generate_create_table;
pub use table::Table;
