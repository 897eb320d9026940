//! `codetpl_core` is the core library for the codetpl code-generation
//! template engine. It parses `.template` files written in a small
//! line-oriented macro language and substitutes caller-supplied values
//! into them.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Template file
//!   → Loader (resolves the name under a base directory, caches by name)
//!   → Parser (extracts if/each blocks line by line, recursively per
//!     clause body, leaving one placeholder per block)
//!   → Scanner (collects plain/join/json tags from the residual text)
//!   → CodeTemplate (holds residual code + blocks + tags)
//!   → for_values (substitutes a ValueMap, producing the resolved text)
//! ```
//!
//! ## Template Language
//!
//! - `${name}` — plain substitution; unresolved tags are left verbatim.
//! - `${join:name:glue}` — a sequence joined with `glue` (`\n`, `\t` and
//!   `\\` escapes are decoded).
//! - `${json:name}` — JSON serialization of a value; scalars are wrapped
//!   in a one-element array first.
//! - `${if:expr}` … `${elseif:expr}` … `${else}` … `${fi}` — conditional
//!   blocks, where `expr` is `name`, `name=value` or `name>value`.
//! - `${each:name as alias}` … `${done}` — iteration, with `${alias}` and
//!   `${alias[field]}` references in the body.
//!
//! ## Key Types
//!
//! - [`TemplateLoader`] / [`LoaderRegistry`] — file loading with
//!   per-name and per-directory caching.
//! - [`CodeTemplateParser`] — parses template text into a
//!   [`CodeTemplate`].
//! - [`CodeTemplate`] — a parsed template; substitute with
//!   [`for_values`](CodeTemplate::for_values).
//! - [`Value`] / [`ValueMap`] — the substitution data model.
//! - [`IfBlock`] / [`EachBlock`] / [`IfExpression`] — the block
//!   structure a parse produces.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use codetpl_core::TemplateLoader;
//! use codetpl_core::ValueMap;
//!
//! let loader = TemplateLoader::new("templates");
//! let mut values = ValueMap::new();
//! values.insert("name", "World");
//! let resolved = loader.load("greeting", &values).unwrap();
//! println!("{resolved}");
//! ```

pub use block::*;
pub use config::*;
pub use error::*;
pub use expression::*;
pub use loader::*;
pub use parser::*;
pub use template::*;
pub use value::*;

mod block;
pub mod config;
mod error;
mod expression;
mod loader;
mod parser;
pub(crate) mod scanner;
mod template;
mod value;

#[cfg(test)]
mod __fixtures;
#[cfg(test)]
mod __tests;
