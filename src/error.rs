use crate::datagen::GenerationError;
use crate::er_resolver::ResolveError;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("rendered output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Render(#[from] RenderError),
}
