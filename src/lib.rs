//! In-memory class graph for JVM class files.
//!
//! Classes are loaded into a [`classpath::Universe`] (program classes with constant pools and
//! attributes, library classes with members only), then the [`pipeline`] links superclasses
//! and subclasses, resolves every symbolic reference, and groups overriding methods into
//! chains. The [`matcher`] recognizes bytecode idioms such as primitive array initializers.

pub mod access;
pub mod attribute;
pub mod classfile;
pub mod classpath;
pub mod constant;
pub mod dataflow;
pub mod descriptor;
pub mod filter;
pub mod hierarchy;
pub mod instruction;
pub mod ir;
pub mod kotlin;
pub mod linker;
pub mod logging;
pub mod matcher;
pub mod member_finder;
pub mod opcodes;
pub mod pipeline;
pub mod reference;
pub mod report;
pub mod scan;
pub mod warning;

#[cfg(test)]
mod test_harness;
