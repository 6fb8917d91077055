pub mod build_cache;
pub mod builder;
pub mod calculator;
pub mod certificate;
pub mod checker;
pub mod diagnostics;
pub mod emitter;
pub mod error;
pub mod evaluator;
pub mod expression;
pub mod kernel;
pub mod manifest;
pub mod product_table;
pub mod project;
pub mod verifier;

#[cfg(test)]
mod tests;
