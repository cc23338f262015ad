//! Optional human-readable dump of an output graph's sections and
//! symbols, written alongside the object file when `--inventory` is
//! passed.

use std::fs;

use crate::error::Result;
use crate::model::Graph;

/// Render `graph` as one `section <name>` line per section followed by
/// one `symbol <name> <type> <bind>` line per non-null symbol, using the
/// raw numeric type/bind codes.
pub fn render(graph: &Graph) -> String {
    let mut out = String::new();
    for section in &graph.sections {
        out.push_str("section ");
        out.push_str(&section.name);
        out.push('\n');
    }
    for symbol in graph.symbols.iter().skip(1) {
        let bind = symbol.record.info >> 4;
        let sym_type = symbol.record.info & 0xf;
        out.push_str(&format!("symbol {} {} {}\n", symbol.name, sym_type, bind));
    }
    out
}

/// Write the inventory for `graph` to `<output_path>.inventory`.
pub fn write(graph: &Graph, output_path: &str) -> Result<()> {
    let path = format!("{output_path}.inventory");
    fs::write(path, render(graph))?;
    Ok(())
}
