pub mod latex_compiler;

pub use latex_compiler::LatexCompiler;
