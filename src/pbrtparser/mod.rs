pub mod tokens;
pub mod lexer;
pub mod pbrtparser;
