//! `sigil dump`: link one archive from an entry and print the linked IR.
//!
//! The archive is linked on its own with the referenced-only strategy, so
//! references into other libraries are stubbed silently and show up under
//! `stubs` in the output.

use std::path::Path;

use sigil_archive::Archive;
use sigil_config::PartialLinkageLog;
use sigil_ir::IrDumper;
use sigil_link::strategy::uniform;
use sigil_link::{options, DeserializationStrategy, LinkError, LinkOptions, Linker};

use crate::pipeline::{read_archive, render_diagnostics};
use crate::{DumpArgs, GlobalArgs, ReportFormat};

/// Runs the `sigil dump` command.
pub fn run(args: &DumpArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let archive = read_archive(Path::new(&args.archive))?;
    let mut linker = Linker::new(LinkOptions {
        partial_linkage: true,
        partial_linkage_log: PartialLinkageLog::Silent,
        ..Default::default()
    });
    match dump_archive(&mut linker, archive, &args.entry, args.builtins) {
        Ok(text) => {
            print!("{text}");
            Ok(0)
        }
        Err(e) => {
            render_diagnostics(&[e.to_diagnostic()], ReportFormat::Terminal, global.color);
            Ok(1)
        }
    }
}

fn dump_archive(
    linker: &mut Linker,
    archive: Archive,
    entry: &str,
    builtins: bool,
) -> Result<String, LinkError> {
    let entry = options::parse_signature(entry)?;
    let resolver = uniform(DeserializationStrategy::OnlyReferenced);
    linker.add_archive(archive, &[], &resolver, builtins)?;
    linker.resolve_entry(&entry)?;
    linker.finish()?;
    Ok(IrDumper::new(linker.program(), linker.interner()).dump_program())
}
