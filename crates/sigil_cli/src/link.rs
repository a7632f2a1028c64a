//! `sigil link`: link every library of a project.
//!
//! 1. Find the project root and load `sigil.toml`
//! 2. Load the fingerprint cache and compute dirty files of incremental libraries
//! 3. Register libraries in dependency order
//! 4. Register expect/actual pairs and entry points
//! 5. Run the linker to a fixed point and the end-of-link passes
//! 6. Render diagnostics, print the summary, save the cache on success

use std::path::Path;

use sigil_archive::Archive;
use sigil_cache::FingerprintCache;
use sigil_config::LinkConfig;
use sigil_diagnostics::{Origin, SeverityCounts};
use sigil_ir::IrDumper;
use sigil_link::{options, strategy, LinkError, LinkOptions, LinkReport, Linker};

use crate::pipeline::{library_resolver, render_diagnostics, resolve_project_root};
use crate::{GlobalArgs, LinkArgs, ReportFormat};

/// Runs the `sigil link` command. Returns exit code 1 if errors were reported.
pub fn run(args: &LinkArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let root = resolve_project_root(args.config.as_deref())?;
    let config = sigil_config::load_config(&root)?;

    if !global.quiet && args.format == ReportFormat::Terminal {
        eprintln!("   Linking {} ({} libraries)", config.project.name, config.libraries.len());
    }

    let mut link_options = LinkOptions::from_config(&config);
    if args.partial_linkage {
        link_options.partial_linkage = true;
    }
    let mut cache = config
        .cache
        .enabled
        .then(|| FingerprintCache::load_or_create(&root.join(&config.cache.dir), env!("CARGO_PKG_VERSION")));

    let mut linker = Linker::new(link_options);
    let outcome = link_project(&mut linker, &root, &config, cache.as_mut());

    let mut diagnostics = linker.diagnostics().diagnostics();
    let report = match outcome {
        Ok(report) => Some(report),
        Err(e) => {
            diagnostics.push(e.to_diagnostic());
            None
        }
    };
    render_diagnostics(&diagnostics, args.format, global.color);

    if let Some(report) = &report {
        if args.dump {
            print!("{}", IrDumper::new(linker.program(), linker.interner()).dump_program());
        }
        if !global.quiet && args.format == ReportFormat::Terminal {
            eprintln!(
                "   Linked {} modules: {} bound declarations, {} stubs, {} actualized",
                report.modules, report.declarations, report.stubs, report.actualized
            );
        }
    }

    let counts: SeverityCounts = diagnostics.iter().map(|d| d.severity).collect();
    if report.is_some() && counts.errors == 0 {
        if let Some(cache) = &cache {
            cache.save()?;
        }
        Ok(0)
    } else {
        if !global.quiet && args.format == ReportFormat::Terminal {
            eprintln!("   Result: {counts}");
        }
        Ok(1)
    }
}

/// Registers the configured libraries, pairs and entries, then links.
fn link_project(
    linker: &mut Linker,
    root: &Path,
    config: &LinkConfig,
    mut cache: Option<&mut FingerprintCache>,
) -> Result<LinkReport, LinkError> {
    for library in &config.libraries {
        let archive = Archive::read_from(&root.join(&library.path)).map_err(|source| LinkError::Archive {
            location: Origin::module(library.name.clone()),
            source,
        })?;
        let resolver = match cache.as_deref_mut() {
            Some(cache) if library.incremental => {
                let status = cache.check(&library.name, &archive);
                let dirty = status.dirty_files();
                tracing::info!(library = %library.name, dirty = dirty.len(), "incremental library");
                let base = library_resolver(library, &archive, config.link.default_strategy);
                cache.record(&library.name, &archive);
                // No overlay here: clean files are not in the program yet.
                strategy::with_dirty(dirty, base)
            }
            Some(cache) => {
                cache.record(&library.name, &archive);
                library_resolver(library, &archive, config.link.default_strategy)
            }
            None => library_resolver(library, &archive, config.link.default_strategy),
        };
        let dependencies: Vec<&str> = library.dependencies.iter().map(String::as_str).collect();
        linker.add_archive(archive, &dependencies, &resolver, library.builtins)?;
    }

    for (expect, actual) in options::expect_actual_pairs(config)? {
        linker.register_expect_actual(expect, actual)?;
    }
    for entry in options::entry_signatures(config)? {
        linker.resolve_entry(&entry)?;
    }
    linker.finish()
}
