use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("Failed to parse KDL")]
    #[diagnostic(code(hidremap::config::parse_error))]
    ParseError {
        #[source_code]
        src: String,
        #[label("here")]
        span: miette::SourceSpan,
        #[source]
        source: kdl::KdlError,
    },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(hidremap::config::invalid))]
    Invalid { message: String },

    #[error("Missing required field: {field}")]
    #[diagnostic(code(hidremap::config::missing_field))]
    MissingField { field: String },

    #[error("Duplicate profile name: {name}")]
    #[diagnostic(code(hidremap::config::duplicate_profile))]
    DuplicateProfile { name: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
