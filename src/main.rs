use anyhow::Result;
use std::{env, path::Path, sync::Arc};
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use tributary::{
    CatalogStore, Config, Database, DurationStyle, MediaService, MemoryCatalogStore,
    app_core::ServiceEvent,
    expand_tilde, get_readable_duration,
    library::{BrowseId, BrowseItem, LoftyProbe, SourceBackend},
};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let config = Config::load()?;

    let store: Arc<dyn CatalogStore> = match Database::open(&config) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            warn!("Falling back to an in-memory catalog: {e}");
            Arc::new(MemoryCatalogStore::new())
        }
    };

    let service = MediaService::new(config, Arc::new(LoftyProbe), store);

    for (idx, arg) in env::args().skip(1).enumerate() {
        let root = expand_tilde(&arg)?;
        let id = source_id(&root, idx);
        info!("attaching {} as {id}", root.display());
        service.attach(&id, SourceBackend::Local { root });
    }

    service.join_scans();

    for event in service.events().try_iter() {
        match event {
            ServiceEvent::Synced { id, report } => info!("{id}: {report:?}"),
            ServiceEvent::SyncFailed { id, error } => warn!("{id}: {error}"),
            _ => {}
        }
    }

    for id in service.registry().source_ids() {
        println!("{id}");
        print_tree(&service, &BrowseId::Source(id), 1);
    }

    Ok(())
}

fn source_id(root: &Path, idx: usize) -> String {
    root.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("source{idx}"))
}

fn print_tree(service: &MediaService, node: &BrowseId, depth: usize) {
    let indent = "  ".repeat(depth);

    for item in service.browse(node) {
        match &item {
            BrowseItem::Folder { id, name } => {
                println!("{indent}{name}/");
                print_tree(service, id, depth + 1);
            }
            BrowseItem::Playable {
                title,
                subtitle,
                duration,
                ..
            } => println!(
                "{indent}{title} - {subtitle} [{}]",
                get_readable_duration(*duration, DurationStyle::Compact)
            ),
            other => println!("{indent}{}", other.title()),
        }
    }
}
