//! One-shot ingestion commands.

use std::path::Path;
use std::sync::Arc;

use console::style;

use crate::config::Settings;
use crate::hub::BroadcastHub;
use crate::ingest::{
    collect_rendered_pages, CommandRasterizer, IngestSummary, IngestWorker, UploadCompleted,
};

fn worker(settings: &Settings, ctx: &crate::repository::DbContext) -> IngestWorker {
    let rasterizer = CommandRasterizer::new(settings.rasterize.clone());
    // No live viewers in a one-shot run.
    IngestWorker::new(ctx, Arc::new(rasterizer), BroadcastHub::default())
}

fn print_summary(name: &str, summary: &IngestSummary) {
    println!(
        "{} Ingested {} as document {} ({} pages, {} words)",
        style("✓").green(),
        name,
        summary.document_id,
        summary.page_count,
        summary.token_count
    );
}

/// Rasterize and ingest one file. The file itself is left in place.
pub async fn cmd_ingest(settings: &Settings, file: &Path, name: Option<&str>) -> anyhow::Result<()> {
    if !file.is_file() {
        anyhow::bail!("{} is not a file", file.display());
    }
    settings.ensure_directories()?;
    let ctx = settings.create_db_context();
    ctx.init_schema().await?;

    let display_name = match name {
        Some(n) => n.to_string(),
        None => file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "untitled".to_string()),
    };

    println!("{} Ingesting {}...", style("→").cyan(), file.display());
    let upload = UploadCompleted {
        path: file.to_path_buf(),
        display_name: display_name.clone(),
    };
    let summary = worker(settings, &ctx).process_upload(&upload).await?;
    print_summary(&display_name, &summary);
    Ok(())
}

/// Ingest pages rendered by an earlier run of the external tools.
pub async fn cmd_ingest_pages(settings: &Settings, dir: &Path, name: &str) -> anyhow::Result<()> {
    settings.ensure_directories()?;
    let ctx = settings.create_db_context();
    ctx.init_schema().await?;

    let pages = collect_rendered_pages(dir).await?;
    println!(
        "{} Ingesting {} pages from {}...",
        style("→").cyan(),
        pages.len(),
        dir.display()
    );

    let summary = worker(settings, &ctx).ingest_rendered(name, &pages).await?;
    print_summary(name, &summary);
    Ok(())
}
