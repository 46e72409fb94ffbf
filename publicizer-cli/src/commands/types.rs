use std::path::Path;

use publicizer::{backend::BackendKind, metadata::attributes::TypeAttributes};
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::load_module,
    output::{print_output, Align, TabWriter},
};

#[derive(Debug, Serialize)]
struct TypeEntry {
    token: String,
    visibility: &'static str,
    sealed: bool,
    is_abstract: bool,
    nested: bool,
    delegate: bool,
    fields: usize,
    methods: usize,
    name: String,
}

#[derive(Debug, Serialize)]
struct TypesOutput {
    module: String,
    types: Vec<TypeEntry>,
    count: usize,
}

fn visibility_name(flags: TypeAttributes) -> &'static str {
    match flags.visibility() {
        0 => "internal",
        1 => "public",
        2 => "nested public",
        3 => "nested private",
        4 => "nested family",
        5 => "nested assembly",
        6 => "nested fam&assem",
        _ => "nested fam|assem",
    }
}

pub fn run(
    path: &Path,
    backend: BackendKind,
    namespace: Option<&str>,
    opts: &GlobalOptions,
) -> anyhow::Result<()> {
    let module = load_module(path, backend)?;

    let types: Vec<TypeEntry> = module
        .types()
        .iter()
        .filter(|ty| namespace.is_none_or(|ns| ty.namespace == ns))
        .map(|ty| TypeEntry {
            token: ty.token.to_string(),
            visibility: visibility_name(ty.flags),
            sealed: ty.is_sealed(),
            is_abstract: ty.is_abstract(),
            nested: ty.is_nested(),
            delegate: ty.is_delegate(),
            fields: ty.fields.len(),
            methods: ty.methods.len(),
            name: module.qualified_name(ty),
        })
        .collect();

    let output = TypesOutput {
        module: module.name().to_string(),
        count: types.len(),
        types,
    };

    print_output(&output, opts, |out| {
        let mut tw = TabWriter::new(&[
            ("Token", Align::Left),
            ("Vis", Align::Left),
            ("Modifiers", Align::Left),
            ("Fields", Align::Right),
            ("Methods", Align::Right),
            ("Name", Align::Left),
        ]);
        for e in &out.types {
            let modifiers = [
                (e.sealed, "sealed"),
                (e.is_abstract, "abstract"),
                (e.nested, "nested"),
                (e.delegate, "delegate"),
            ]
            .iter()
            .filter(|(set, _)| *set)
            .map(|(_, label)| *label)
            .collect::<Vec<_>>()
            .join(" ");

            tw.row(vec![
                e.token.clone(),
                e.visibility.to_string(),
                if modifiers.is_empty() { "-".to_string() } else { modifiers },
                e.fields.to_string(),
                e.methods.to_string(),
                e.name.clone(),
            ]);
        }
        tw.print();
        println!("\n{} type(s) listed in {}.", out.count, out.module);
    })
}
