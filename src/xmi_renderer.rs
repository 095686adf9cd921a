use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};

use crate::er_ast::*;
use crate::er_order::DependencyOrder;
use crate::er_resolver::Schema;
use crate::error::RenderError;

const XMI_NS: &str = "http://schema.omg.org/spec/XMI/2.1";
const UML_NS: &str = "http://www.eclipse.org/uml2/3.0.0/UML";

/// UML2 class export: one class per entity with its declared attributes.
/// Relationships and derived foreign keys are not part of the export.
pub fn render(schema: &Schema, order: &DependencyOrder, model_name: &str) -> Result<String, RenderError> {
    let entities: Vec<&Entity> = order.iter().filter_map(|name| schema.entity(name)).collect();

    let mut types: Vec<&AttrType> = Vec::new();
    for attr in entities.iter().flat_map(|e| &e.attributes) {
        if !types.contains(&&attr.attr_type) {
            types.push(&attr.attr_type);
        }
    }

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("xmi:XMI").with_attributes([
        ("xmi:version", "2.1"),
        ("xmlns:xmi", XMI_NS),
        ("xmlns:uml", UML_NS),
    ])))?;
    writer.write_event(Event::Start(
        BytesStart::new("uml:Model").with_attributes([("xmi:id", "model"), ("name", model_name)]),
    ))?;

    for attr_type in &types {
        let id = type_id(attr_type);
        writer.write_event(Event::Empty(BytesStart::new("packagedElement").with_attributes([
            ("xmi:type", "uml:PrimitiveType"),
            ("xmi:id", id.as_str()),
            ("name", attr_type.as_str()),
        ])))?;
    }

    for entity in &entities {
        let class_id = format!("class_{}", entity.name);
        let class = BytesStart::new("packagedElement").with_attributes([
            ("xmi:type", "uml:Class"),
            ("xmi:id", class_id.as_str()),
            ("name", entity.name.as_str()),
        ]);
        if entity.attributes.is_empty() {
            writer.write_event(Event::Empty(class))?;
            continue;
        }

        writer.write_event(Event::Start(class))?;
        for attr in &entity.attributes {
            let attr_id = format!("{}.{}", entity.name, attr.name);
            let type_ref = type_id(&attr.attr_type);
            writer.write_event(Event::Empty(BytesStart::new("ownedAttribute").with_attributes([
                ("xmi:id", attr_id.as_str()),
                ("name", attr.name.as_str()),
                ("type", type_ref.as_str()),
            ])))?;
        }
        writer.write_event(Event::End(BytesEnd::new("packagedElement")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("uml:Model")))?;
    writer.write_event(Event::End(BytesEnd::new("xmi:XMI")))?;

    Ok(String::from_utf8(writer.into_inner())?)
}

/// `type_` plus the type token, with every character that is not
/// alphanumeric written as `_<hex>_` so distinct tokens keep distinct ids.
fn type_id(attr_type: &AttrType) -> String {
    let mut id = String::from("type_");
    for c in attr_type.as_str().chars() {
        if c.is_alphanumeric() {
            id.push(c);
        } else {
            id.push_str(&format!("_{:x}_", c as u32));
        }
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::er_order::dependency_order;
    use crate::er_parser::parse_er;
    use crate::er_resolver::{UndeclaredEntities, resolve};

    fn xmi(input: &str) -> String {
        let schema = resolve(&parse_er(input), UndeclaredEntities::Synthesize).unwrap();
        render(&schema, &dependency_order(&schema), "test").unwrap()
    }

    const INPUT: &str = "\
entity Person {
  id : number <<generated>>
  name : text
}
entity Paper {
  id : number <<generated>>
  price : decimal(10,2)
}
Person ||--o{ Paper
";

    #[test]
    fn render_classes_and_attributes() {
        let output = xmi(INPUT);
        assert!(output.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(output.contains(r#"<uml:Model xmi:id="model" name="test">"#));
        assert!(output.contains(r#"xmi:type="uml:Class" xmi:id="class_Person" name="Person""#));
        assert!(output.contains(r#"xmi:id="Person.name" name="name" type="type_text""#));
        assert!(output.contains(r#"xmi:id="Paper.price" name="price" type="type_decimal_28_10_2c_2_29_""#));
        assert!(output.trim_end().ends_with("</xmi:XMI>"));
    }

    #[test]
    fn render_primitive_types_once() {
        let output = xmi(INPUT);
        assert_eq!(output.matches(r#"xmi:type="uml:PrimitiveType""#).count(), 3);
        assert!(output.contains(r#"name="decimal(10,2)""#));
    }

    #[test]
    fn render_ignores_derived_foreign_keys() {
        let output = xmi(INPUT);
        assert!(!output.contains("Person_id"));
    }

    #[test]
    fn render_classes_in_dependency_order() {
        let output = xmi(INPUT);
        let person = output.find("class_Person").unwrap();
        let paper = output.find("class_Paper").unwrap();
        assert!(person < paper);
    }

    #[test]
    fn render_escapes_and_empty_classes() {
        let schema = resolve(&parse_er("Ghost ||--o{ Real\n"), UndeclaredEntities::Synthesize).unwrap();
        let output = render(&schema, &dependency_order(&schema), "a<b").unwrap();
        assert!(output.contains(r#"name="a&lt;b""#));
        assert!(output.contains(r#"xmi:id="class_Ghost" name="Ghost"/>"#));
    }

    #[test]
    fn render_type_ids_stay_distinct() {
        let output = xmi("entity T {\n  a : x-y\n  b : x_y\n  c : x-y\n}\n");
        assert_eq!(output.matches(r#"xmi:id="type_x_2d_y""#).count(), 1);
        assert_eq!(output.matches(r#"xmi:id="type_x_5f_y""#).count(), 1);
        assert!(output.contains(r#"xmi:id="T.c" name="c" type="type_x_2d_y""#));
    }
}
