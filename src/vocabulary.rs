//! Built-in value vocabulary for "interesting" attribute names.
//!
//! Lookups are case-insensitive. An entry bound to an entity wins over a
//! generic entry for the same attribute.

use rand::seq::IndexedRandom;
use rand::{Rng, RngCore};

use crate::datagen::{RowContext, Value, ValueSource};
use crate::er_ast::Attribute;

const FIRSTNAMES: &[&str] = &[
    "Ana", "Marko", "Jelena", "Petar", "Ivana", "Nikola", "Maja", "Milos", "Luka", "Sara",
];
const LASTNAMES: &[&str] = &[
    "Petrovic", "Garcia", "Smith", "Ivanov", "Chen", "Silva", "Jovanovic", "Kovacevic",
];
const NAMES: &[&str] = &[
    "University of Belgrade",
    "Faculty of Science",
    "Institute of AI",
    "Open Data Lab",
    "Ana",
    "Marko",
    "Jelena",
    "Petar",
];
const DOC_TITLES: &[&str] = &[
    "AI in Education",
    "Knowledge Graphs",
    "Quantum Research",
    "Cloud Computing",
    "Open Science",
    "Machine Learning for Healthcare",
    "Semantic Web Technologies",
    "Data Science for Policy",
];
const JOURNAL_TITLES: &[&str] = &[
    "AI Review",
    "Information Systems",
    "Data Science Journal",
    "Computing Advances",
];
const EVENT_NAMES: &[&str] = &[
    "AIConf 2025",
    "Open Science Summit",
    "Quantum Symposium",
    "Cloud Expo Europe",
];
const GEO_NAMES: &[&str] = &["Serbia", "Germany", "USA", "France", "Spain"];
const GEO_CODES: &[&str] = &["RS", "DE", "US", "FR", "ES"];
const GRANT_NAMES: &[&str] = &[
    "HorizonEurope Project X",
    "National Science Grant Y",
    "AI Innovation Programme",
    "Climate Research Initiative",
];
const PERSON_TYPES: &[&str] = &["researcher", "student", "staff"];
const PREFERRED_TITLES: &[&str] = &["Dr.", "Prof.", "Mr.", "Ms."];
const POSITION_TYPES: &[&str] = &["faculty position", "non-academic position"];
const POSITION_TITLES: &[&str] = &["full professor", "librarian", "developer"];
const ORG_TYPES: &[&str] = &["Faculty", "Research Center", "Research Institute", "College", "NGO"];
const ORG_NAMES: &[&str] = &[
    "University of Belgrade",
    "Faculty of Science",
    "Institute of AI",
    "Research Center VINCA",
    "Open Data Lab",
];
const CITATION_SOURCES: &[&str] = &["OpenAlex", "Web of Science", "Scopus"];
const ADVISORY_TYPES: &[&str] = &[
    "Advising",
    "Faculty Mentoring",
    "Graduate Advising",
    "Postdoc or Fellow Advising",
    "Undergraduate Advising",
];
const ROR_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

enum Candidates {
    Static(&'static [&'static str]),
    Owned(Vec<String>),
    Make(fn(&mut dyn RngCore) -> Value),
    /// Derived from the rest of the row or from earlier tables.
    Rule(fn(&RowContext<'_>, &mut dyn RngCore) -> Option<Value>),
}

impl Candidates {
    fn pick(&self, row: &RowContext<'_>, rng: &mut dyn RngCore) -> Option<Value> {
        match self {
            Candidates::Static(list) => list.choose(rng).map(|s| Value::Text(s.to_string())),
            Candidates::Owned(list) => list.choose(rng).map(|s| Value::Text(s.clone())),
            Candidates::Make(make) => Some(make(rng)),
            Candidates::Rule(rule) => rule(row, rng),
        }
    }
}

enum AttributePattern {
    Exact(String),
    Suffix(&'static str),
}

impl AttributePattern {
    fn matches(&self, attribute: &str) -> bool {
        match self {
            AttributePattern::Exact(name) => name.eq_ignore_ascii_case(attribute),
            AttributePattern::Suffix(suffix) => attribute.to_ascii_lowercase().ends_with(suffix),
        }
    }
}

struct Entry {
    entity: Option<String>,
    attribute: AttributePattern,
    candidates: Candidates,
}

pub struct Vocabulary {
    entries: Vec<Entry>,
}

impl Vocabulary {
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    /// Adds (or overrides) a candidate list. `entity: None` applies to every
    /// entity.
    pub fn with_candidates(mut self, entity: Option<&str>, attribute: &str, candidates: Vec<String>) -> Self {
        self.entries.insert(
            0,
            Entry {
                entity: entity.map(str::to_string),
                attribute: AttributePattern::Exact(attribute.to_string()),
                candidates: Candidates::Owned(candidates),
            },
        );
        self
    }

    fn list(&mut self, entity: Option<&str>, attribute: &str, list: &'static [&'static str]) {
        self.push(entity, AttributePattern::Exact(attribute.to_string()), Candidates::Static(list));
    }

    fn make(&mut self, entity: Option<&str>, attribute: &str, make: fn(&mut dyn RngCore) -> Value) {
        self.push(entity, AttributePattern::Exact(attribute.to_string()), Candidates::Make(make));
    }

    fn rule(
        &mut self,
        entity: Option<&str>,
        attribute: &str,
        rule: fn(&RowContext<'_>, &mut dyn RngCore) -> Option<Value>,
    ) {
        self.push(entity, AttributePattern::Exact(attribute.to_string()), Candidates::Rule(rule));
    }

    fn push(&mut self, entity: Option<&str>, attribute: AttributePattern, candidates: Candidates) {
        self.entries.push(Entry {
            entity: entity.map(str::to_string),
            attribute,
            candidates,
        });
    }

    fn lookup(&self, entity: &str, attribute: &str) -> Option<&Candidates> {
        let matching = |e: &&Entry| e.attribute.matches(attribute);
        self.entries
            .iter()
            .filter(matching)
            .find(|e| e.entity.as_deref().is_some_and(|name| name.eq_ignore_ascii_case(entity)))
            .or_else(|| self.entries.iter().filter(matching).find(|e| e.entity.is_none()))
            .map(|e| &e.candidates)
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        let mut v = Self::empty();

        v.list(Some("Journal"), "title", JOURNAL_TITLES);
        v.make(Some("Journal"), "abbreviation", |rng| {
            Value::Text(abbreviate(pick(JOURNAL_TITLES, rng)))
        });
        v.list(Some("Event"), "name", EVENT_NAMES);
        v.list(Some("Geolocation"), "name", GEO_NAMES);
        v.rule(Some("Geolocation"), "code", geo_code);
        v.list(Some("Grant"), "name", GRANT_NAMES);
        v.list(Some("Person"), "type", PERSON_TYPES);
        v.list(Some("Position"), "type", POSITION_TYPES);
        v.list(Some("Position"), "title", POSITION_TITLES);
        v.list(Some("OrganisationUnit"), "type", ORG_TYPES);
        v.list(Some("OrganisationUnit"), "name", ORG_NAMES);
        v.list(Some("Citations"), "source", CITATION_SOURCES);
        v.list(Some("Citations"), "citation_source", CITATION_SOURCES);
        v.make(Some("Citations"), "number", citation_count);
        v.make(Some("Citations"), "citation_number", citation_count);
        v.make(Some("Grant"), "total_award_amount", |rng| {
            Value::Int(rng.random_range(50..=500i64) * 10_000)
        });
        v.rule(Some("Authorship"), "display_author_name", display_author_name);
        v.rule(Some("Advisorship"), "advisor_person_id", advisor);
        v.rule(Some("Advisorship"), "student_person_id", student);
        v.list(Some("Advisorship"), "advising_relationship_type", ADVISORY_TYPES);

        v.list(None, "firstname", FIRSTNAMES);
        v.list(None, "lastname", LASTNAMES);
        v.list(None, "other_name", FIRSTNAMES);
        v.list(None, "name", NAMES);
        v.list(None, "title", DOC_TITLES);
        v.list(None, "preferred_title", PREFERRED_TITLES);
        v.make(None, "identifier", |rng| {
            Value::Text(format!("ID-{:05}", rng.random_range(0..100_000u32)))
        });
        v.make(None, "orcid", make_orcid);
        v.make(None, "issn", make_issn);
        v.make(None, "isbn", |rng| {
            Value::Text(rng.random_range(1_000_000_000..=9_999_999_999u64).to_string())
        });
        v.make(None, "doi", |rng| {
            Value::Text(format!(
                "10.{}/{}",
                rng.random_range(100..=999u32),
                rng.random_range(1000..=9999u32)
            ))
        });
        v.make(None, "ror", make_ror);
        v.make(None, "page_start", |rng| Value::Int(rng.random_range(1..=200)));
        v.rule(None, "page_end", page_end);
        v.make(None, "abbreviation", |rng| Value::Text(abbreviate(pick(ORG_NAMES, rng))));
        v.push(
            None,
            AttributePattern::Suffix("_year"),
            Candidates::Make(|rng| Value::Int(rng.random_range(1990..=2025))),
        );

        v
    }
}

impl ValueSource for Vocabulary {
    fn value(&self, row: &RowContext<'_>, attribute: &Attribute, rng: &mut dyn RngCore) -> Option<Value> {
        self.lookup(row.entity, &attribute.name)?.pick(row, rng)
    }
}

fn pick(list: &'static [&'static str], rng: &mut dyn RngCore) -> &'static str {
    list.choose(rng).copied().unwrap_or_default()
}

fn citation_count(rng: &mut dyn RngCore) -> Value {
    Value::Int(rng.random_range(1..=500))
}

fn page_end(row: &RowContext<'_>, rng: &mut dyn RngCore) -> Option<Value> {
    let end = match row.get("page_start").and_then(Value::as_int) {
        Some(start) => start + rng.random_range(1..=30),
        None => rng.random_range(2..=400),
    };
    Some(Value::Int(end))
}

/// "First Last" of the row's person, or of a random earlier person row.
fn display_author_name(row: &RowContext<'_>, rng: &mut dyn RngCore) -> Option<Value> {
    let from_person = row
        .table("Person")
        .filter(|person| !person.rows.is_empty())
        .and_then(|person| {
            // Primary keys are the row index + 1.
            let idx = match row.get("person_id").and_then(Value::as_int) {
                Some(id) if id >= 1 && id as usize <= person.rows.len() => id as usize - 1,
                _ => rng.random_range(0..person.rows.len()),
            };
            let first = person.cell(idx, "firstname")?;
            let last = person.cell(idx, "lastname")?;
            Some(format!("{first} {last}"))
        });
    let name = from_person
        .unwrap_or_else(|| format!("{} {}", pick(FIRSTNAMES, rng), pick(LASTNAMES, rng)));
    Some(Value::Text(name))
}

fn advisor(row: &RowContext<'_>, rng: &mut dyn RngCore) -> Option<Value> {
    row.keys("Person").choose(rng).map(|&key| Value::Int(key))
}

/// A person other than the row's advisor whenever there is one.
fn student(row: &RowContext<'_>, rng: &mut dyn RngCore) -> Option<Value> {
    let pool = row.keys("Person");
    let advisor = row.get("advisor_person_id").and_then(Value::as_int);
    let others: Vec<i64> = pool.iter().copied().filter(|&key| Some(key) != advisor).collect();
    let candidates = if others.is_empty() { pool } else { others.as_slice() };
    candidates.choose(rng).map(|&key| Value::Int(key))
}

fn geo_code(row: &RowContext<'_>, rng: &mut dyn RngCore) -> Option<Value> {
    let named = row.get("name").and_then(|value| match value {
        Value::Text(name) => GEO_NAMES.iter().position(|geo| *geo == name.as_str()),
        _ => None,
    });
    let idx = named.unwrap_or_else(|| rng.random_range(0..GEO_CODES.len()));
    GEO_CODES.get(idx).map(|code| Value::Text(code.to_string()))
}

fn make_orcid(rng: &mut dyn RngCore) -> Value {
    let blocks: Vec<String> = (0..4)
        .map(|_| format!("{:04}", rng.random_range(0..=9999u32)))
        .collect();
    Value::Text(blocks.join("-"))
}

fn make_issn(rng: &mut dyn RngCore) -> Value {
    Value::Text(format!(
        "{:04}-{:04}",
        rng.random_range(1000..=9999u32),
        rng.random_range(1000..=9999u32)
    ))
}

fn make_ror(rng: &mut dyn RngCore) -> Value {
    let suffix: String = (0..9)
        .map(|_| ROR_ALPHABET[rng.random_range(0..ROR_ALPHABET.len())] as char)
        .collect();
    Value::Text(format!("https://ror.org/{suffix}"))
}

/// Initials of a multi-word name, or the first four letters of a single word.
pub fn abbreviate(name: &str) -> String {
    let parts: Vec<&str> = name
        .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() <= 1 {
        return name.chars().take(4).collect::<String>().to_uppercase();
    }
    parts
        .iter()
        .filter_map(|p| p.chars().next())
        .flat_map(char::to_uppercase)
        .take(6)
        .collect()
}
