//! The standard checks, in the order the engine runs them.

mod cjs_only_exports_default;
mod entrypoint_resolutions;
mod export_default_disagreement;
mod internal_resolution_error;
mod module_kind_disagreement;
mod named_exports;
mod unexpected_module_syntax;

pub use cjs_only_exports_default::CjsOnlyExportsDefault;
pub use entrypoint_resolutions::EntrypointResolutions;
pub use export_default_disagreement::ExportDefaultDisagreement;
pub use internal_resolution_error::InternalResolutionError;
pub use module_kind_disagreement::ModuleKindDisagreement;
pub use named_exports::NamedExports;
pub use unexpected_module_syntax::UnexpectedModuleSyntax;

use crate::engine::{Check, CheckContext};
use crate::kinds::{is_javascript_file, is_typescript_file};

/// Every standard check.
#[must_use]
pub fn all<'c>() -> Vec<Box<dyn Check + 'c>> {
    vec![
        Box::new(EntrypointResolutions),
        Box::new(ModuleKindDisagreement),
        Box::new(UnexpectedModuleSyntax),
        Box::new(CjsOnlyExportsDefault),
        Box::new(NamedExports),
        Box::new(ExportDefaultDisagreement),
        Box::new(InternalResolutionError),
    ]
}

/// The cell's type-level and implementation files, when the first carries
/// types and the second is JavaScript.
fn typed_pair<'a>(cx: &CheckContext<'a>) -> Option<(&'a str, &'a str)> {
    let types = cx.cell.resolution.as_ref()?;
    let implementation = cx.cell.implementation_resolution.as_ref()?;
    (is_typescript_file(&types.file_name) && is_javascript_file(&implementation.file_name))
        .then_some((types.file_name.as_str(), implementation.file_name.as_str()))
}
