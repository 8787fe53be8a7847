//! An embeddable interpreter for C# expressions.
//!
//! Source text flows through four stages:
//!
//! 1. [`lexer`]: text to tokens
//! 2. [`parser`]: tokens to a [`syntax_tree::SyntaxNode`] (operator precedence
//!    parsing with explicit stacks)
//! 3. [`binder`]: names, overloads, conversions and operators resolved
//!    against a [`types::TypeResolver`]
//! 4. [`evaluator`]: the typed tree lowered once and run many times
//!
//! [`api`] wraps the stages behind [`api::Engine`] and [`api::evaluate`].

extern crate alloc;

pub mod api;
pub mod binder;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod render;
pub mod stack;
pub mod stdlib;
pub mod syntax;
pub mod syntax_tree;
pub mod template;
pub mod types;
pub mod values;
