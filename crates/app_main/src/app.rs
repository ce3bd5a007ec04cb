//! Command execution

use crate::cli::{Cli, Commands, ExcludeAction, RootAction};
use anyhow::{bail, Context, Result};
use app_core::{
    indexer, AppConfig, AppState, ExclusionList, ExclusionStore, ImageLoader, LoadedMedia,
    SessionUpdate,
};
use app_db::{DbPool, ExclusionDb, RootBookmarks};
use app_fs::OpenOutcome;
use serde_json::json;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything a command needs besides its arguments
pub struct Services {
    pub config: AppConfig,
    pub pool: DbPool,
}

impl Services {
    fn exclusion_store(&self) -> Arc<dyn ExclusionStore> {
        Arc::new(ExclusionDb::new(self.pool.clone()))
    }

    fn state(&self) -> AppState {
        let mut config = self.config.clone();
        // One-shot commands never live long enough to see changes
        config.library.watch = false;
        AppState::with_filesystem(config, self.exclusion_store())
    }
}

pub async fn run(cli: Cli, ctx: &Services, out: &mut dyn Write) -> Result<()> {
    let json = cli.json;
    match cli.command {
        Commands::Tags { root, query, sort, with_dirs } => {
            let root = match root {
                Some(root) => root,
                None => latest_root(ctx)?,
            };
            tags(ctx, &root, &query, sort.map(Into::into), with_dirs, json, out).await
        }
        Commands::Browse { root, dir, view } => browse(ctx, &root, &dir, view, json, out).await,
        Commands::Exclude { action } => exclude(ctx, action, json, out),
        Commands::Roots { action } => roots(ctx, action, json, out),
        Commands::Index {
            root,
            database,
            workers,
            batch_size,
            follow_symlinks,
        } => {
            let mut options = indexer::IndexOptions::from_config(&ctx.config.index, follow_symlinks);
            if workers.is_some() {
                options.workers = workers;
            }
            if let Some(batch_size) = batch_size {
                options.batch_size = batch_size;
            }
            index(&root, &database, &options, json, out)
        }
        Commands::Open { path, folder } => {
            let outcome = if folder {
                app_fs::open_folder(&path)
            } else {
                app_fs::open_file(&path)
            };
            report_open(&outcome, json, out)
        }
    }
}

fn latest_root(ctx: &Services) -> Result<PathBuf> {
    let bookmarks = RootBookmarks::new(ctx.pool.clone()).list()?;
    match bookmarks.last() {
        Some(root) => Ok(PathBuf::from(&root.path)),
        None => bail!("no root given and none bookmarked (see `media_shelf roots add`)"),
    }
}

fn canonical_root(root: &Path) -> Result<PathBuf> {
    let root = root
        .canonicalize()
        .with_context(|| format!("cannot open library root {}", root.display()))?;
    if !root.is_dir() {
        bail!("{} is not a directory", root.display());
    }
    Ok(root)
}

async fn tags(
    ctx: &Services,
    root: &Path,
    query: &str,
    sort: Option<app_core::TagSortMode>,
    with_dirs: bool,
    json: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let root = canonical_root(root)?;
    let mut state = ctx.state();
    state.load_root(&root).await?;
    state.set_tag_query(query);
    if let Some(sort) = sort {
        state.set_sort_mode(sort);
    }

    let tags = state.visible_tags();
    if json {
        let rows: Vec<_> = tags
            .iter()
            .map(|tag| {
                let dirs: Vec<&str> = state
                    .leaves_for_tag(&tag.id)
                    .into_iter()
                    .map(|leaf| leaf.display_path.as_str())
                    .collect();
                json!({ "id": tag.id, "label": tag.label, "count": tag.count, "directories": dirs })
            })
            .collect();
        writeln!(out, "{}", serde_json::to_string_pretty(&rows)?)?;
        return Ok(());
    }

    writeln!(
        out,
        "{} leaf directories, {} tags",
        state.leaves().len(),
        tags.len()
    )?;
    for tag in &tags {
        writeln!(out, "{} ({})", tag.label, tag.count)?;
        if with_dirs {
            for leaf in state.leaves_for_tag(&tag.id) {
                writeln!(out, "    {}", leaf.display_path)?;
            }
        }
    }
    Ok(())
}

async fn browse(
    ctx: &Services,
    root: &Path,
    dir: &Path,
    view: Option<usize>,
    json: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let root = canonical_root(root)?;
    let dir = if dir.is_absolute() { dir.to_path_buf() } else { root.join(dir) };
    let dir = dir.canonicalize().unwrap_or(dir);

    let mut state = ctx.state();
    state.load_root(&root).await?;
    state.select_directory(&dir)?;

    while let Some(progress) = state.next_session_update().await {
        match progress.update {
            SessionUpdate::PageAppended { range, total, .. } if !json => {
                writeln!(out, "loaded {}..{} of {}", range.start, range.end, total)?;
            }
            SessionUpdate::Failed { error, .. } => bail!(error.user_message()),
            _ => {}
        }
    }

    let session = state.session();
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(session.items())?)?;
    } else {
        for (i, item) in session.items().iter().enumerate() {
            writeln!(out, "{:>5}  {:<5}  {}", i, format!("{:?}", item.kind).to_lowercase(), item.name)?;
        }
    }

    if let Some(index) = view {
        let frame = state.open_viewer(index)?;
        let loader = ImageLoader::new();
        let media = state.load_viewer_media(&loader).await?;
        let name = frame.item.as_ref().map(|i| i.name.as_str()).unwrap_or_default();

        let summary = match &media {
            LoadedMedia::Bitmap { width, height, .. } => format!("{}x{} image", width, height),
            LoadedMedia::Raw { kind, bytes, .. } => {
                format!("{} bytes ({:?})", bytes.len(), kind).to_lowercase()
            }
        };

        if json {
            writeln!(
                out,
                "{}",
                json!({ "index": frame.index, "total": frame.total, "name": name, "media": summary })
            )?;
        } else {
            writeln!(out, "[{}/{}] {}: {}", frame.index + 1, frame.total, name, summary)?;
        }
    }

    Ok(())
}

fn exclude(ctx: &Services, action: ExcludeAction, json: bool, out: &mut dyn Write) -> Result<()> {
    let mut list = ExclusionList::load(ctx.exclusion_store());

    let changed = match &action {
        ExcludeAction::List => None,
        ExcludeAction::Add { keyword } => Some(list.add(keyword)?),
        ExcludeAction::Remove { keyword } => Some(list.remove(keyword)?),
    };

    let keywords = list.set().to_vec();
    if json {
        writeln!(out, "{}", json!({ "changed": changed, "excluded": keywords }))?;
        return Ok(());
    }

    match (&action, changed) {
        (ExcludeAction::Add { keyword }, Some(false)) => writeln!(out, "{} is already excluded", keyword)?,
        (ExcludeAction::Remove { keyword }, Some(false)) => writeln!(out, "{} was not excluded", keyword)?,
        _ => {}
    }
    for keyword in keywords {
        writeln!(out, "{}", keyword)?;
    }
    Ok(())
}

fn roots(ctx: &Services, action: RootAction, json: bool, out: &mut dyn Write) -> Result<()> {
    let bookmarks = RootBookmarks::new(ctx.pool.clone());

    match action {
        RootAction::List => {
            let roots = bookmarks.list()?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&roots)?)?;
            } else {
                for root in roots {
                    writeln!(out, "{}", root.path)?;
                }
            }
        }
        RootAction::Add { path } => {
            let path = canonical_root(&path)?;
            let added = bookmarks.add(&path.to_string_lossy())?;
            report_change(added, "added", &path, json, out)?;
        }
        RootAction::Remove { path } => {
            let path = path.canonicalize().unwrap_or(path);
            let removed = bookmarks.remove(&path.to_string_lossy())?;
            report_change(removed, "removed", &path, json, out)?;
        }
    }
    Ok(())
}

fn report_change(changed: bool, verb: &str, path: &Path, json: bool, out: &mut dyn Write) -> Result<()> {
    if json {
        writeln!(out, "{}", json!({ "changed": changed, "path": path }))?;
    } else if changed {
        writeln!(out, "{} {}", verb, path.display())?;
    } else {
        writeln!(out, "unchanged: {}", path.display())?;
    }
    Ok(())
}

fn index(
    root: &Path,
    database: &Path,
    options: &indexer::IndexOptions,
    json: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let report = indexer::index_into(root, database, options)?;
    if json {
        writeln!(
            out,
            "{}",
            json!({
                "entries": report.entries,
                "removed": report.removed,
                "elapsed_ms": report.elapsed.as_millis() as u64,
                "database": database,
            })
        )?;
    } else {
        writeln!(
            out,
            "indexed {} entries ({} removed) into {} in {:.2?}",
            report.entries,
            report.removed,
            database.display(),
            report.elapsed
        )?;
    }
    Ok(())
}

fn report_open(outcome: &OpenOutcome, json: bool, out: &mut dyn Write) -> Result<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string(outcome)?)?;
        return Ok(());
    }
    match &outcome.error {
        None => Ok(()),
        Some(error) => bail!("{}", error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;

    fn context(dir: &Path) -> Services {
        Services {
            config: AppConfig::default(),
            pool: app_db::open(&dir.join("shelf.db")).unwrap(),
        }
    }

    fn library(dir: &Path) -> PathBuf {
        let root = dir.join("library");
        for name in ["Beach Trip", "Beach Party", "Mountain Trip"] {
            fs::create_dir_all(root.join(name)).unwrap();
            fs::write(root.join(name).join("a.jpg"), b"x").unwrap();
            fs::write(root.join(name).join("b.mp4"), b"x").unwrap();
        }
        root
    }

    async fn exec(ctx: &Services, args: &[&str]) -> Result<String> {
        let cli = Cli::try_parse_from(std::iter::once("media_shelf").chain(args.iter().copied()))?;
        let mut out = Vec::new();
        run(cli, ctx, &mut out).await?;
        Ok(String::from_utf8(out)?)
    }

    #[tokio::test]
    async fn test_tags_command() {
        let dir = tempfile::tempdir().unwrap();
        let root = library(dir.path());
        let ctx = context(dir.path());
        let root_arg = root.to_string_lossy().into_owned();

        let text = exec(&ctx, &["tags", &root_arg, "--with-dirs"]).await.unwrap();
        assert!(text.starts_with("3 leaf directories, 2 tags"));
        assert!(text.contains("Beach (2)\n    Beach Party\n    Beach Trip\n"));
        assert!(text.contains("Trip (2)"));

        exec(&ctx, &["exclude", "add", "trip"]).await.unwrap();
        let text = exec(&ctx, &["--json", "tags", &root_arg]).await.unwrap();
        let rows: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(rows.as_array().unwrap().len(), 1);
        assert_eq!(rows[0]["id"], "beach");
    }

    #[tokio::test]
    async fn test_tags_defaults_to_bookmarked_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = library(dir.path());
        let ctx = context(dir.path());

        assert!(exec(&ctx, &["tags"]).await.is_err());

        let text = exec(&ctx, &["roots", "add", &root.to_string_lossy()]).await.unwrap();
        assert!(text.starts_with("added"));
        let text = exec(&ctx, &["roots", "add", &root.to_string_lossy()]).await.unwrap();
        assert!(text.starts_with("unchanged"));

        let text = exec(&ctx, &["tags"]).await.unwrap();
        assert!(text.starts_with("3 leaf directories"));

        let text = exec(&ctx, &["roots", "list"]).await.unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_browse_command() {
        let dir = tempfile::tempdir().unwrap();
        let root = library(dir.path());
        let ctx = context(dir.path());

        let text = exec(&ctx, &["browse", &root.to_string_lossy(), "Beach Trip", "--view", "1"])
            .await
            .unwrap();
        assert!(text.contains("loaded 0..2 of 2"));
        assert!(text.contains("    0  image  a.jpg"));
        assert!(text.contains("    1  video  b.mp4"));
        assert!(text.contains("[2/2] b.mp4: 1 bytes (video)"));

        let missing = exec(&ctx, &["browse", &root.to_string_lossy(), "Nowhere"]).await;
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn test_exclude_command() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());

        assert_eq!(exec(&ctx, &["exclude", "add", "Beach"]).await.unwrap(), "beach\n");
        assert_eq!(
            exec(&ctx, &["exclude", "add", "beach"]).await.unwrap(),
            "beach is already excluded\nbeach\n"
        );
        let text = exec(&ctx, &["--json", "exclude", "remove", "beach"]).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["changed"], true);
        assert_eq!(value["excluded"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_index_command() {
        let dir = tempfile::tempdir().unwrap();
        let root = library(dir.path());
        let ctx = context(dir.path());
        let database = dir.path().join("index.db");

        let text = exec(
            &ctx,
            &["--json", "index", &root.to_string_lossy(), "--database", &database.to_string_lossy()],
        )
        .await
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        // root + 3 folders + 6 files
        assert_eq!(value["entries"], 10);
    }
}
