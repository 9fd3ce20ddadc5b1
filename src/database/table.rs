use crate::database::column::Column;
use serde::Serialize;

/// A table generated from one worksheet.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(name: String, columns: Vec<Column>) -> Self {
        Table { name, columns }
    }

    pub fn create_statement(&self) -> String {
        generate_create_table(&self.name, &self.columns)
    }
}

/// Renders a `CREATE TABLE` statement, one indented definition per column.
pub fn generate_create_table(table_name: &str, columns: &[Column]) -> String {
    let definitions: Vec<String> = columns
        .iter()
        .map(|column| {
            let constraint = if column.primary_key {
                " PRIMARY KEY"
            } else if !column.nullable {
                " NOT NULL"
            } else {
                ""
            };
            format!("  {} {}{}", column.name, column.kind, constraint)
        })
        .collect();
    format!("CREATE TABLE {} (\n{}\n);", table_name, definitions.join(",\n"))
}
