use crate::datagen::Table;
use crate::error::RenderError;

pub fn render(table: &Table) -> Result<String, RenderError> {
    // The csv writer cannot express a record with zero fields.
    if table.columns.is_empty() {
        return Ok("\n".repeat(table.rows.len() + 1));
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

pub fn file_name(table: &Table) -> String {
    format!("{}.csv", table.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datagen::{TableKind, Value};
    use pretty_assertions::assert_eq;

    fn table(columns: &[&str], rows: Vec<Vec<Value>>) -> Table {
        Table {
            name: "Person".to_string(),
            kind: TableKind::Entity,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    #[test]
    fn render_header_and_rows() {
        let t = table(
            &["id", "name", "Org_id"],
            vec![
                vec![Value::Int(1), Value::Text("Ana".into()), Value::Int(2)],
                vec![Value::Int(2), Value::Text("Smith, Jr.".into()), Value::Null],
            ],
        );
        let expected = "\
id,name,Org_id
1,Ana,2
2,\"Smith, Jr.\",
";
        assert_eq!(render(&t).unwrap(), expected);
        assert_eq!(file_name(&t), "Person.csv");
    }

    #[test]
    fn render_header_only() {
        let t = table(&["id"], Vec::new());
        assert_eq!(render(&t).unwrap(), "id\n");
    }

    #[test]
    fn render_zero_columns() {
        let t = table(&[], vec![Vec::new(), Vec::new()]);
        assert_eq!(render(&t).unwrap(), "\n\n\n");
    }
}
