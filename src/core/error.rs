use crate::pbrtparser::tokens::Loc;
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can abort a parse, a binary load or a binary write.
/// Soft conditions (missing textures, version mismatches, unknown entity
/// tags) are logged instead and never show up here.
#[derive(Error, Debug)]
pub enum PbrtError {
    // lexical
    #[error("unterminated string literal starting at {0}")]
    UnterminatedString(Loc),

    #[error("can't push back more than one character at {0}")]
    DoubleUnget(Loc),

    // grammar
    #[error("unexpected token '{token}' at {loc}")]
    UnexpectedToken { token: String, loc: Loc },

    #[error("unexpected end of file")]
    UnexpectedEof,

    #[error("'Material' field not within a WorldBegin/End context at {0}. \
             Did you run the parser on the 'shape.pbrt' file directly? \
             (you shouldn't - it should only be included from within a pbrt scene file)")]
    MaterialOutsideWorld(Loc),

    #[error("unmatched '{what}' at {loc}: nothing left to pop")]
    UnbalancedEnd { what: &'static str, loc: Loc },

    #[error("unknown ActiveTransform type '{token}' at {loc}")]
    UnknownActiveTransform { token: String, loc: Loc },

    #[error("expected {expected} but found '{token}' at {loc}")]
    MissingArgument { expected: &'static str, token: String, loc: Loc },

    // parameters
    #[error("malformed parameter declaration \"{header}\" at {loc}: expected \"<type> <name>\"")]
    MalformedParamHeader { header: String, loc: Loc },

    #[error("unknown parameter type '{ty}' at {loc}")]
    UnknownParamType { ty: String, loc: Loc },

    #[error("invalid {ty} value '{value}'")]
    InvalidValue { ty: &'static str, value: String },

    #[error("parameter '{name}' is of type {found}, expected {expected}")]
    ParamType { name: String, expected: &'static str, found: String },

    #[error("parameter '{name}' has {found} values, expected {expected}")]
    ParamArity { name: String, expected: String, found: usize },

    #[error("{what} '{name}' is missing its \"string type\" parameter")]
    MissingImplicitType { what: &'static str, name: String },

    // binary
    #[error("entity {id} is not of expected type {expected}")]
    EntityType { id: i32, expected: &'static str },

    #[error("invalid entity handle {id} ({count} entities read so far)")]
    InvalidHandle { id: i32, count: usize },

    #[error("not enough data in data block: wanted {wanted} bytes, {left} left")]
    TruncatedBlock { wanted: usize, left: usize },

    #[error("binary file ends in the middle of a block")]
    TruncatedFile,

    #[error("binary file does not contain a scene")]
    NoScene,

    #[error("{what} has {count} entries, too many for the binary format")]
    TooManyEntries { what: &'static str, count: usize },

    // external
    #[error("ply file \"{path}\": {msg}")]
    Ply { path: PathBuf, msg: String },

    #[error("could not detect input file format for \"{0}\" (expected .pbrt or .pbf)")]
    UnknownFileFormat(PathBuf),

    #[error("could not open \"{path}\"")]
    Open { path: PathBuf, #[source] source: std::io::Error },

    #[error(transparent)]
    Io(#[from] std::io::Error)
}

pub type Result<T> = std::result::Result<T, PbrtError>;
