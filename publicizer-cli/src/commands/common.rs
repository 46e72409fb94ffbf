use std::path::Path;

use anyhow::Context;
use publicizer::{
    backend::{BackendKind, CilBackend, ManifestBackend, MetadataBackend},
    module::Module,
    Diagnostics,
};

/// Load a module through the backend selected on the command line.
pub fn load_module(path: &Path, backend: BackendKind) -> anyhow::Result<Box<dyn Module>> {
    let module: publicizer::Result<Box<dyn Module>> = match backend {
        BackendKind::Cil => CilBackend
            .load_module(path)
            .map(|module| Box::new(module) as Box<dyn Module>),
        BackendKind::Manifest => ManifestBackend
            .load_module(path)
            .map(|module| Box::new(module) as Box<dyn Module>),
    };

    module.with_context(|| format!("failed to load module ({backend}): {}", path.display()))
}

/// Print collected diagnostics verbatim.
pub fn print_diagnostics(diagnostics: &Diagnostics) {
    if !diagnostics.is_empty() {
        print!("{diagnostics}");
    }
}
