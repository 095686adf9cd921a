use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct ErModel {
    pub entities: BTreeMap<String, Entity>,
    pub relationships: Vec<Relationship>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub primary_key: Option<String>,
    /// `false` for entities only ever named in a relationship line.
    pub declared: bool,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            primary_key: None,
            declared: true,
        }
    }

    pub fn placeholder(name: impl Into<String>) -> Self {
        Self {
            declared: false,
            ..Self::new(name)
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn primary_key_attribute(&self) -> Option<&Attribute> {
        self.primary_key.as_deref().and_then(|pk| self.attribute(pk))
    }

    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_key.as_deref() == Some(column)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub attr_type: AttrType,
    pub stereotype: Option<Stereotype>,
    /// PlantUML `*` marker.
    pub mandatory: bool,
}

impl Attribute {
    pub fn new(name: impl Into<String>, attr_type: AttrType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            stereotype: None,
            mandatory: false,
        }
    }

    pub fn is_generated(&self) -> bool {
        self.stereotype == Some(Stereotype::Generated)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttrType {
    Number,
    Text,
    DateTime,
    Boolean,
    Other(String),
}

impl AttrType {
    pub fn parse(token: &str) -> Self {
        match token.to_ascii_lowercase().as_str() {
            "number" => AttrType::Number,
            "text" => AttrType::Text,
            "datetime" => AttrType::DateTime,
            "boolean" => AttrType::Boolean,
            _ => AttrType::Other(token.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AttrType::Number => "number",
            AttrType::Text => "text",
            AttrType::DateTime => "datetime",
            AttrType::Boolean => "boolean",
            AttrType::Other(token) => token,
        }
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stereotype {
    Generated,
    Other(String),
}

impl Stereotype {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.eq_ignore_ascii_case("generated") {
            Stereotype::Generated
        } else {
            Stereotype::Other(text.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub left: String,
    pub right: String,
    pub connector: Connector,
    pub label: Option<String>,
    pub line: usize,
}

impl Relationship {
    pub fn kind(&self) -> RelationshipKind {
        self.connector.kind()
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.connector, self.right)
    }
}

/// A crow's-foot connector such as `||--o{`, split into its two ends.
#[derive(Debug, Clone, PartialEq)]
pub struct Connector {
    pub left: String,
    pub body: String,
    pub right: String,
}

impl Connector {
    pub fn new(left: &str, body: &str, right: &str) -> Self {
        Self {
            left: left.to_string(),
            body: body.to_string(),
            right: right.to_string(),
        }
    }

    pub fn kind(&self) -> RelationshipKind {
        let left_many = self.left.starts_with('}');
        let right_many = self.right.ends_with('{');
        match (left_many, right_many) {
            (true, true) => RelationshipKind::ManyToMany,
            // `child |o--o{ parent`: kept as written, not the textbook reading.
            (false, true) if self.left == "|o" => RelationshipKind::OneToMany { parent: Side::Right },
            (true, false) => RelationshipKind::OneToMany { parent: Side::Right },
            _ => RelationshipKind::OneToMany { parent: Side::Left },
        }
    }
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.left, self.body, self.right)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipKind {
    OneToMany { parent: Side },
    ManyToMany,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}
