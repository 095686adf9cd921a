pub mod csv_renderer;
pub mod datagen;
pub mod ddl_renderer;
pub mod er_ast;
pub mod er_grammar;
pub mod er_order;
pub mod er_parser;
pub mod er_resolver;
pub mod error;
pub mod vocabulary;
pub mod xmi_renderer;

use rand::Rng;

pub use datagen::{Dataset, GenerateOptions, RowContext, Table, Value, ValueSource};
pub use er_resolver::UndeclaredEntities;
pub use error::{Error, RenderError};
pub use vocabulary::Vocabulary;

/// Parsed, resolved and ordered model shared by every backend.
#[derive(Debug, Clone)]
pub struct Plan {
    pub model: er_ast::ErModel,
    pub schema: er_resolver::Schema,
    pub order: er_order::DependencyOrder,
}

pub fn build(input: &str) -> Result<Plan, Error> {
    build_with_options(input, UndeclaredEntities::default())
}

pub fn build_with_options(input: &str, undeclared: UndeclaredEntities) -> Result<Plan, Error> {
    let model = er_parser::parse_er(input);
    let schema = er_resolver::resolve(&model, undeclared)?;
    let order = er_order::dependency_order(&schema);
    Ok(Plan {
        model,
        schema,
        order,
    })
}

impl Plan {
    pub fn ddl(&self) -> String {
        ddl_renderer::render(&self.schema, &self.order)
    }

    pub fn xmi(&self, model_name: &str) -> Result<String, Error> {
        Ok(xmi_renderer::render(&self.schema, &self.order, model_name)?)
    }

    pub fn dataset<R: Rng>(
        &self,
        options: &GenerateOptions,
        source: &dyn ValueSource,
        rng: &mut R,
    ) -> Result<Dataset, Error> {
        Ok(datagen::generate(&self.schema, &self.order, options, source, rng)?)
    }

    /// `(file name, contents)` for every generated table.
    pub fn csv_files<R: Rng>(
        &self,
        options: &GenerateOptions,
        source: &dyn ValueSource,
        rng: &mut R,
    ) -> Result<Vec<(String, String)>, Error> {
        let dataset = self.dataset(options, source, rng)?;
        dataset
            .tables
            .iter()
            .map(|table| -> Result<(String, String), Error> {
                Ok((csv_renderer::file_name(table), csv_renderer::render(table)?))
            })
            .collect()
    }
}
