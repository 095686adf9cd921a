use crate::er_ast::*;
use crate::er_order::DependencyOrder;
use crate::er_resolver::{Column, JoinColumn, JoinTable, Schema};

const INDENT: &str = "    ";

pub fn render(schema: &Schema, order: &DependencyOrder) -> String {
    let mut out = String::new();

    for name in order.iter() {
        if let Some(entity) = schema.entity(name) {
            render_create_table(&mut out, schema, entity);
        }
    }

    for name in order.iter() {
        for fk in schema.foreign_keys(name) {
            match &fk.parent_key {
                Some(key) => out.push_str(&format!(
                    "ALTER TABLE {name} ADD CONSTRAINT fk_{name}_{column} FOREIGN KEY ({column}) REFERENCES {parent} ({key});\n",
                    column = fk.column,
                    parent = fk.parent,
                )),
                None => out.push_str(&format!(
                    "-- {name}.{column}: {parent} has no primary key, constraint skipped\n",
                    column = fk.column,
                    parent = fk.parent,
                )),
            }
        }
    }

    for jt in &schema.join_tables {
        out.push('\n');
        render_join_table(&mut out, schema, jt);
    }

    out
}

fn render_create_table(out: &mut String, schema: &Schema, entity: &Entity) {
    let columns = schema.columns(&entity.name);
    if columns.is_empty() {
        out.push_str(&format!("-- {}: no columns declared\n\n", entity.name));
        return;
    }

    let mut lines: Vec<String> = columns
        .iter()
        .map(|col| column_definition(schema, entity, col))
        .collect();
    if let Some(pk) = &entity.primary_key {
        lines.push(format!("PRIMARY KEY ({pk})"));
    }

    write_create(out, &entity.name, &lines);
    out.push('\n');
}

fn column_definition(schema: &Schema, entity: &Entity, col: &Column<'_>) -> String {
    let sql_type = match (col.attribute, col.foreign_key) {
        (Some(attr), _) => sql_type(&attr.attr_type),
        (None, Some(fk)) => parent_key_type(schema, &fk.parent),
        (None, None) => sql_type(&AttrType::Text),
    };

    let mut def = format!("{} {}", col.name, sql_type);
    if entity.is_primary_key(col.name) {
        def.push_str(" NOT NULL");
        if is_integer_type(&sql_type) {
            def.push_str(" AUTO_INCREMENT");
        }
    } else if col.attribute.is_some_and(|a| a.mandatory) {
        def.push_str(" NOT NULL");
    }
    def
}

fn is_integer_type(sql_type: &str) -> bool {
    let base = sql_type.split('(').next().unwrap_or_default().trim();
    matches!(
        base,
        "INT" | "INTEGER" | "BIGINT" | "SMALLINT" | "TINYINT" | "MEDIUMINT"
    )
}

fn render_join_table(out: &mut String, schema: &Schema, jt: &JoinTable) {
    let mut lines = Vec::new();
    for side in [&jt.left, &jt.right] {
        lines.push(format!(
            "{} {} NOT NULL",
            side.column,
            parent_key_type(schema, &side.entity)
        ));
    }
    lines.push(format!("PRIMARY KEY ({}, {})", jt.left.column, jt.right.column));
    for side in [&jt.left, &jt.right] {
        if let Some(reference) = join_reference(schema, side) {
            lines.push(reference);
        }
    }
    write_create(out, &jt.name, &lines);
}

fn join_reference(schema: &Schema, side: &JoinColumn) -> Option<String> {
    let key = schema.entity(&side.entity)?.primary_key.as_ref()?;
    Some(format!(
        "FOREIGN KEY ({}) REFERENCES {} ({key})",
        side.column, side.entity
    ))
}

fn write_create(out: &mut String, table: &str, lines: &[String]) {
    out.push_str(&format!("CREATE TABLE {table} (\n"));
    for (i, line) in lines.iter().enumerate() {
        out.push_str(INDENT);
        out.push_str(line);
        if i + 1 < lines.len() {
            out.push(',');
        }
        out.push('\n');
    }
    out.push_str(");\n");
}

fn parent_key_type(schema: &Schema, parent: &str) -> String {
    schema
        .entity(parent)
        .and_then(Entity::primary_key_attribute)
        .map(|attr| sql_type(&attr.attr_type))
        .unwrap_or_else(|| sql_type(&AttrType::Number))
}

pub fn sql_type(attr_type: &AttrType) -> String {
    match attr_type {
        AttrType::Number => "INT".to_string(),
        AttrType::Text => "VARCHAR(255)".to_string(),
        AttrType::DateTime => "DATETIME".to_string(),
        AttrType::Boolean => "BOOLEAN".to_string(),
        AttrType::Other(token) => token.to_uppercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::er_order::dependency_order;
    use crate::er_parser::parse_er;
    use crate::er_resolver::{UndeclaredEntities, resolve};
    use pretty_assertions::assert_eq;

    fn ddl(input: &str) -> String {
        let schema = resolve(&parse_er(input), UndeclaredEntities::Synthesize).unwrap();
        render(&schema, &dependency_order(&schema))
    }

    #[test]
    fn render_single_table() {
        let output = ddl("entity A {\n  id : number <<generated>>\n  name : text\n}\n");
        let expected = "\
CREATE TABLE A (
    id INT NOT NULL AUTO_INCREMENT,
    name VARCHAR(255),
    PRIMARY KEY (id)
);

";
        assert_eq!(output, expected);
    }

    #[test]
    fn render_types_and_mandatory() {
        let output = ddl("\
entity Event {
  * starts : datetime
  public : boolean
  price : decimal(10,2)
}
");
        assert!(output.contains("    starts DATETIME NOT NULL,\n"));
        assert!(output.contains("    public BOOLEAN,\n"));
        assert!(output.contains("    price DECIMAL(10,2)\n"));
        assert!(!output.contains("PRIMARY KEY"));
    }

    #[test]
    fn render_foreign_key_alter() {
        let output = ddl("\
entity A {
  id : number <<generated>>
}
entity B {
  id : number <<generated>>
}
A ||--o{ B
");
        let expected = "\
CREATE TABLE A (
    id INT NOT NULL AUTO_INCREMENT,
    PRIMARY KEY (id)
);

CREATE TABLE B (
    id INT NOT NULL AUTO_INCREMENT,
    A_id INT,
    PRIMARY KEY (id)
);

ALTER TABLE B ADD CONSTRAINT fk_B_A_id FOREIGN KEY (A_id) REFERENCES A (id);
";
        assert_eq!(output, expected);
    }

    #[test]
    fn render_foreign_key_to_keyless_parent_is_comment() {
        let output = ddl("entity B {\n  id : number <<generated>>\n}\nGhost ||--o{ B\n");
        assert!(output.contains("-- Ghost: no columns declared"));
        assert!(output.contains("-- B.Ghost_id: Ghost has no primary key, constraint skipped"));
        assert!(!output.contains("ALTER TABLE"));
    }

    #[test]
    fn render_join_table() {
        let output = ddl("\
entity A {
  id : number <<generated>>
}
entity B {
  code : text <<generated>>
}
A }o--o{ B
");
        let expected = "\
CREATE TABLE A_B (
    A_id INT NOT NULL,
    B_id VARCHAR(255) NOT NULL,
    PRIMARY KEY (A_id, B_id),
    FOREIGN KEY (A_id) REFERENCES A (id),
    FOREIGN KEY (B_id) REFERENCES B (code)
);
";
        assert!(output.ends_with(expected), "got:\n{output}");
    }

    #[test]
    fn render_auto_increment_only_for_integer_keys() {
        let output = ddl("\
entity Code {
  code : text <<generated>>
}
entity Big {
  id : bigint <<generated>>
}
");
        assert!(output.contains("    code VARCHAR(255) NOT NULL,\n"), "got:\n{output}");
        assert!(output.contains("    id BIGINT NOT NULL AUTO_INCREMENT,\n"), "got:\n{output}");
        assert_eq!(output.matches("AUTO_INCREMENT").count(), 1);
    }

    #[test]
    fn render_join_table_without_keys() {
        let output = ddl("A }o--o{ B\n");
        assert!(output.contains("CREATE TABLE A_B (\n    A_id INT NOT NULL,\n    B_id INT NOT NULL,\n    PRIMARY KEY (A_id, B_id)\n);\n"));
    }
}
