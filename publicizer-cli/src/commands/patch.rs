use std::path::Path;

use publicizer::{
    backend::BackendKind,
    patcher::{self, NestedVisibility, PatchOptions, PatchRules, PatchSummary},
};
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::print_diagnostics,
    output::{print_output, Align, TabWriter},
};

#[derive(Debug, Serialize)]
struct PatchOutput {
    path: String,
    backend: BackendKind,
    backup: bool,
    success: bool,
    summary: Option<PatchSummary>,
    error: Option<String>,
}

pub fn run(
    path: &Path,
    backend: BackendKind,
    backup: bool,
    nested_visibility: NestedVisibility,
    opts: &GlobalOptions,
) -> anyhow::Result<i32> {
    let options = PatchOptions {
        backend,
        backup,
        rules: PatchRules::with_nested_visibility(nested_visibility),
    };

    let outcome = patcher::patch(path, &options);
    let code = outcome.code();
    let (result, diagnostics) = outcome.into_parts();

    let output = PatchOutput {
        path: path.display().to_string(),
        backend,
        backup,
        success: result.is_ok(),
        error: result.as_ref().err().map(ToString::to_string),
        summary: result.ok(),
    };

    if output.summary.is_none() && !opts.json {
        println!("An error occurred:");
        print_diagnostics(&diagnostics);
        return Ok(code);
    }

    print_output(&output, opts, |out| {
        let Some(summary) = &out.summary else {
            return;
        };

        if summary.is_unchanged() {
            println!("{}: nothing to patch.", out.path);
            return;
        }

        println!("Patched {} ({} backend)\n", out.path, out.backend);
        let mut tw = TabWriter::new(&[("Change", Align::Left), ("Count", Align::Right)]).indent("  ");
        for (label, count) in [
            ("types examined", summary.types_examined),
            ("types publicized", summary.types_publicized),
            ("types unsealed", summary.types_unsealed),
            ("delegates skipped", summary.delegates_skipped),
            ("fields publicized", summary.fields_publicized),
            ("methods publicized", summary.methods_publicized),
            ("methods virtualized", summary.methods_virtualized),
        ] {
            tw.row(vec![label.to_string(), count.to_string()]);
        }
        tw.print();
    })?;

    Ok(code)
}
