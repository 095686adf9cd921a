use winnow::prelude::*;
use winnow::ascii::{space0, space1};
use winnow::combinator::{alt, delimited, opt, preceded};
use winnow::token::{rest, take_until, take_while};

use crate::er_ast::*;

/// One classified line of ER-DSL input.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Blank,
    EntityOpen(String),
    EntityClose,
    Separator,
    Attribute(Attribute),
    Relationship {
        left: String,
        connector: Connector,
        right: String,
        label: Option<String>,
    },
    Unrecognized,
}

pub fn classify_line(raw: &str) -> Line {
    let line = raw.trim();
    if line.is_empty() || line.starts_with('\'') {
        return Line::Blank;
    }
    match line {
        "}" => return Line::EntityClose,
        "--" => return Line::Separator,
        _ => {}
    }

    if let Ok(name) = entity_open.parse(line) {
        return Line::EntityOpen(name.to_string());
    }
    if let Ok(rel) = relationship_line.parse(line) {
        return rel;
    }

    let unquoted = line.replace('\'', "");
    if let Ok(attr) = attribute_line.parse(unquoted.trim()) {
        return Line::Attribute(attr);
    }

    Line::Unrecognized
}

fn identifier<'s>(input: &mut &'s str) -> winnow::Result<&'s str> {
    take_while(1.., |c: char| c.is_alphanumeric() || c == '_').parse_next(input)
}

fn entity_open<'s>(input: &mut &'s str) -> winnow::Result<&'s str> {
    "entity".parse_next(input)?;
    space1.parse_next(input)?;
    let name = identifier.parse_next(input)?;
    space0.parse_next(input)?;
    opt("{").parse_next(input)?;
    space0.parse_next(input)?;
    Ok(name)
}

fn attribute_line(input: &mut &str) -> winnow::Result<Attribute> {
    let mandatory = opt("*").parse_next(input)?.is_some();
    space0.parse_next(input)?;
    let name = identifier.parse_next(input)?;
    space0.parse_next(input)?;
    ":".parse_next(input)?;
    space0.parse_next(input)?;
    let attr_type: &str =
        take_while(1.., |c: char| !c.is_whitespace() && c != '<').parse_next(input)?;
    space0.parse_next(input)?;
    let stereotype: Option<&str> =
        opt(delimited("<<", take_until(0.., ">>"), ">>")).parse_next(input)?;
    space0.parse_next(input)?;

    Ok(Attribute {
        name: name.to_string(),
        attr_type: AttrType::parse(attr_type),
        stereotype: stereotype.map(Stereotype::parse),
        mandatory,
    })
}

fn relationship_line(input: &mut &str) -> winnow::Result<Line> {
    let left = identifier.parse_next(input)?;
    space0.parse_next(input)?;
    let connector = connector.parse_next(input)?;
    space0.parse_next(input)?;
    let right = identifier.parse_next(input)?;
    space0.parse_next(input)?;
    let label: Option<&str> = opt(preceded((":", space0), rest)).parse_next(input)?;

    Ok(Line::Relationship {
        left: left.to_string(),
        connector,
        right: right.to_string(),
        label: label
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string),
    })
}

fn connector(input: &mut &str) -> winnow::Result<Connector> {
    let left = alt(("||", "|o", "o|", "}o", "}|")).parse_next(input)?;
    let body = alt(("--", "..")).parse_next(input)?;
    let right = alt(("||", "|o", "o|", "o{", "|{")).parse_next(input)?;
    Ok(Connector::new(left, body, right))
}
