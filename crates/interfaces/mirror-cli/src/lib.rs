pub mod logging;
pub mod scheduler;
pub mod validate;

use anyhow::Context;
use camino::Utf8Path;
use mirror_config::clamp_workers;
use mirror_pipeline::SyncOptions;

/// Per-field command line overrides applied on top of the options file.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionOverrides {
    pub batch_size: Option<usize>,
    pub max_workers: Option<usize>,
    pub chunk_size: Option<usize>,
}

/// Build the pass options: defaults, then the JSON file if given, then flags.
pub fn load_options(
    config: Option<&Utf8Path>,
    overrides: OptionOverrides,
) -> anyhow::Result<SyncOptions> {
    let mut opts = match config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {path}"))?;
            serde_json::from_str::<SyncOptions>(&raw)
                .with_context(|| format!("Failed to parse config {path}"))?
        }
        None => SyncOptions::default(),
    };

    if let Some(v) = overrides.batch_size {
        opts.file_copy_batch_size = v;
    }
    if let Some(v) = overrides.max_workers {
        opts.max_workers = v;
    }
    if let Some(v) = overrides.chunk_size {
        opts.hashing_file_chunk_size = v;
    }
    opts.validate()?;
    opts.max_workers = clamp_workers(opts.max_workers);
    Ok(opts)
}
