//! Hyperparameter resolution engine.
//!
//! Turns configuration text into constructor-ready parameters:
//!
//! ```text
//! params.json ─┐
//! "k=v;k=v"  ──┼─ merge ─→ coerce (parser │ schema │ fallback) ─→ input_params
//! overrides  ──┘
//! "k=[a,b]"  ───── literal lists ─→ coerce each candidate ──────→ search_params
//! ```
//!
//! Coercion is opportunistic: keys the algorithm does not know pass through.
//! Recoverable problems become [`ParamWarning`]s; only unreadable files,
//! unknown algorithms, bad signatures and failed casts are errors.

pub mod algorithms;
pub mod error;
pub mod literal;
pub mod resolver;
pub mod schema;
pub mod source;
pub mod value;

pub use algorithms::{
    AlgorithmSpec, Fallback, ParseFn, algorithm, algorithms, parse_literal_or_text,
};
pub use error::{Diagnostics, ParamError, ParamWarning};
pub use literal::{LiteralError, parse_literal};
pub use resolver::{ParameterResolver, ResolvedParameters, resolve};
pub use schema::{ParamKind, ParamSchema, ParamSpec};
pub use source::{parse_file, parse_param_str};
pub use value::{ParamMap, ParamValue};
