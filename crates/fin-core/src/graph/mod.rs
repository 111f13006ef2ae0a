//! Grafo de dependencias entre steps.

pub mod dag;

pub use dag::DependencyGraph;
