//! Command implementations for the `pdfstitch` binary.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::cli::{CountArgs, LibraryArgs, LibraryCommand, parse_page_range};
use pdfstitch::config::{ExtractConfig, MergeConfig, OverwriteMode};
use pdfstitch::error::{PdfError, Result};
use pdfstitch::io::{PdfReader, PdfWriter};
use pdfstitch::library::{FileRecord, Library};
use pdfstitch::merge::Assembler;
use pdfstitch::output::{
    OutputFormatter, display_assembly, display_load_statistics, display_write_statistics,
};
use pdfstitch::utils::collect_paths_for_patterns;

#[derive(Debug, Serialize)]
struct CountEntry {
    path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pages: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// `pdfstitch count`
pub async fn count(args: &CountArgs, formatter: &OutputFormatter) -> Result<()> {
    let paths = collect_paths_for_patterns(&args.inputs)?;
    let jobs = args.jobs.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });

    let (results, _) = PdfReader::new().load_all(&paths, jobs).await;

    let mut first_error = None;
    let mut entries = Vec::with_capacity(results.len());
    for (path, result) in paths.into_iter().zip(results) {
        match result {
            Ok(loaded) => entries.push(CountEntry {
                path,
                pages: Some(loaded.page_count),
                error: None,
            }),
            Err(err) => {
                entries.push(CountEntry {
                    path,
                    pages: None,
                    error: Some(err.to_string()),
                });
                first_error.get_or_insert(err);
            }
        }
    }

    if args.json {
        formatter.json(&entries)?;
    } else {
        for entry in &entries {
            match (&entry.pages, &entry.error) {
                (Some(pages), _) => println!("{pages}\t{}", entry.path.display()),
                (None, Some(error)) => formatter.error(error),
                (None, None) => {}
            }
        }
    }

    first_error.map_or(Ok(()), Err)
}

/// `pdfstitch extract`
pub async fn extract(config: &ExtractConfig, formatter: &OutputFormatter) -> Result<()> {
    check_output(&config.output, config.overwrite_mode).await?;

    let loaded = PdfReader::new().load(&config.input).await?;
    formatter.info(&format!(
        "Extracting from {} ({} pages)",
        config.input.display(),
        loaded.page_count
    ));

    let assembler = Assembler::with_metadata(config.metadata.clone());
    let assembled = assembler.extract_pages(&loaded.document, &config.pages.to_page_numbers())?;
    display_assembly(formatter, &assembled.statistics);

    let stats = PdfWriter::with_overwrite(config.overwrite_mode)
        .save_with_stats(&assembled.document, &config.output)
        .await?;
    display_write_statistics(formatter, assembled.statistics.pages, &stats);
    Ok(())
}

/// `pdfstitch merge`
pub async fn merge(config: MergeConfig, formatter: &OutputFormatter) -> Result<()> {
    check_output(&config.output, config.overwrite_mode).await?;

    if formatter.should_print() {
        formatter.section(&format!("{} v{}", pdfstitch::NAME, pdfstitch::VERSION));
        formatter.blank_line();
    }
    formatter.info(&format!("Loading {} file(s)...", config.inputs.len()));

    let total = config.inputs.len();
    let (results, load_stats) = PdfReader::new()
        .load_with_progress(&config.inputs, config.effective_jobs(), |idx, result| {
            if let Ok(loaded) = result {
                formatter.debug(&format!(
                    "[{}/{total}] {} ({} pages)",
                    idx + 1,
                    loaded.path.display(),
                    loaded.page_count
                ));
            }
        })
        .await;
    display_load_statistics(formatter, &load_stats);

    let mut documents = Vec::with_capacity(results.len());
    let mut paths = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok(loaded) => {
                paths.push(loaded.path);
                documents.push(loaded.document);
            }
            Err(err) if !config.strict && err.is_recoverable() => {
                log::warn!("skipping input: {err}");
                formatter.warning(&format!("Skipping: {err}"));
            }
            Err(err) => return Err(err),
        }
    }

    let assembler = Assembler::with_metadata(config.metadata.clone());
    let assembled = if config.strict {
        assembler.merge_documents_strict(&documents)?
    } else {
        let (assembled, report) = assembler.merge_documents(&documents)?;
        for skipped in &report.skipped {
            formatter.warning(&format!(
                "Skipping {}: {}",
                paths[skipped.index].display(),
                skipped.error
            ));
        }
        assembled
    };
    display_assembly(formatter, &assembled.statistics);

    let stats = PdfWriter::with_overwrite(config.overwrite_mode)
        .save_with_stats(&assembled.document, &config.output)
        .await?;
    display_write_statistics(formatter, assembled.statistics.pages, &stats);
    Ok(())
}

/// `pdfstitch library`
pub async fn library(args: LibraryArgs, formatter: &OutputFormatter) -> Result<()> {
    let library = Library::open_dir(&args.dir).await?;
    formatter.debug(&format!("Library at {}", args.dir.display()));

    match args.command {
        LibraryCommand::Add { files } => {
            for file in files {
                let bytes = read_input(&file).await?;
                let name = file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "file.pdf".to_string());
                let record = library.upload(&name, &bytes).await?;
                formatter.success(&format!("Added {name} as #{}", record.id));
            }
        }
        LibraryCommand::List { all, json } => {
            let records = if all {
                library.list_all().await?
            } else {
                library.list_pending().await?
            };
            if json {
                formatter.json(&records)?;
            } else if records.is_empty() {
                formatter.info("No files");
            } else {
                for record in &records {
                    println!("{}", describe(record));
                }
            }
        }
        LibraryCommand::Merge { ids } => {
            let outcome = library.merge(&ids).await?;
            for id in &outcome.unknown {
                formatter.warning(&format!("No file with id {id}"));
            }
            for (id, error) in &outcome.skipped {
                formatter.warning(&format!("Skipped #{id}: {error}"));
            }
            formatter.success(&format!(
                "Merged {} file(s) into #{} {}",
                outcome.consumed.len(),
                outcome.record.id,
                outcome.record.file_name
            ));
        }
        LibraryCommand::Split { file, pages } => {
            let range = parse_page_range(&pages)?;
            let bytes = read_input(&file).await?;
            let record = library.split(&bytes, &range.to_page_numbers()).await?;
            formatter.success(&format!("Stored #{} {}", record.id, record.file_name));
        }
        LibraryCommand::Export { id, output } => {
            let bytes = library.read(id).await?;
            PdfWriter::with_overwrite(output.overwrite_mode())
                .write_bytes(&bytes, &output.output)
                .await?;
            formatter.success(&format!("Exported #{id} to {}", output.output.display()));
        }
        LibraryCommand::Remove { id } => {
            library.remove(id).await?;
            formatter.success(&format!("Removed #{id}"));
        }
    }
    Ok(())
}

fn describe(record: &FileRecord) -> String {
    format!(
        "{:>5}  {}  {}{}",
        record.id,
        record.upload_date.format("%Y-%m-%d %H:%M"),
        record.file_name,
        if record.merged { "  (merged)" } else { "" }
    )
}

async fn read_input(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            PdfError::file_not_found(path.to_path_buf())
        } else {
            PdfError::Io(err)
        }
    })
}

/// Fail early when the output exists and must not be replaced.
async fn check_output(path: &Path, mode: OverwriteMode) -> Result<()> {
    if mode == OverwriteMode::NoClobber && tokio::fs::metadata(path).await.is_ok() {
        return Err(PdfError::output_exists(path.to_path_buf()));
    }
    Ok(())
}
