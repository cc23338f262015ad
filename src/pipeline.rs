//! Wires the pipeline stages together: load both objects, validate,
//! correlate, classify, substitute, walk the inclusion closure,
//! synthesize the output graph, and emit it.

use tracing::info;

use crate::config::RunConfig;
use crate::elfio::symbol::SymType;
use crate::error::Result;
use crate::model::Status;
use crate::{closure, compare, correlate, emit, inventory, loader, substitute, synthesize, validate};

/// Run the full differencing pipeline per `config`. Returns `true` if
/// any function changed (informational only — a clean run with no
/// changes is not itself an error).
pub fn run(config: &RunConfig) -> Result<bool> {
    let mut base = loader::load(&config.base)?;
    let mut patched = loader::load(&config.patched)?;

    validate::validate(&base, &patched)?;

    correlate::correlate(&mut base, &mut patched);
    compare::compare(&mut base, &mut patched)?;

    substitute::substitute_section_symbols(&mut base);
    substitute::substitute_section_symbols(&mut patched);

    let changed_functions: Vec<&str> = patched
        .symbols
        .iter()
        .filter(|s| matches!(s.sym_type(), Some(SymType::Func)) && s.status == Status::Changed)
        .map(|s| s.name.as_str())
        .collect();
    if changed_functions.is_empty() {
        info!("no changed functions found");
    } else {
        for name in &changed_functions {
            info!(function = name, "function changed");
        }
    }
    let any_changed = !changed_functions.is_empty();

    let closure = closure::compute(&patched);
    let mut output = synthesize::synthesize(&mut patched, &closure)?;

    if config.inventory {
        inventory::write(&output, &config.output)?;
    }

    emit::emit(&mut output, &config.output)?;

    info!(
        sections = output.sections.len(),
        symbols = output.symbols.len().saturating_sub(1),
        output = %config.output,
        "wrote patch object"
    );

    Ok(any_changed)
}
