use clap::{Parser, Subcommand, ValueEnum};
use photo_bridge::channel::{self, Dispatcher};
use photo_bridge::config::{self, BridgeConfig};
use photo_bridge::gallery::Gallery;
use photo_bridge::imaging::RustBackend;
use photo_bridge::index::FsMediaIndex;
use photo_bridge::output::{self, ExportLine};
use photo_bridge::types::{ALL_ALBUM_ID, ContentMode, MediumType};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "photo-bridge")]
#[command(about = "Browse and export a local photo and video library")]
#[command(long_about = "\
Browse and export a local photo and video library

The library is a directory tree. Every directory holding media is an album,
every supported file a medium:

  library/
  ├── config.toml                  # Bridge config (optional)
  ├── Camera/                      # Album \"Camera\"
  │   ├── IMG_0001.jpg             # Medium \"Camera/IMG_0001.jpg\"
  │   └── VID_0002.mp4
  └── Trips/Japan/                 # Album \"Trips/Japan\"
      └── temple.png

Media are listed newest first by modification time. Exports land in the
cache directory and are reused until 'photo-bridge clear'.

Run 'photo-bridge serve' to answer JSON requests on stdin/stdout, and
'photo-bridge gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Media library directory
    #[arg(long, default_value = ".", global = true)]
    library: PathBuf,

    /// Export cache directory (overrides config)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Config file (default: config.toml in the library)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Image,
    Video,
    Audio,
}

impl From<Kind> for MediumType {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Image => MediumType::Image,
            Kind::Video => MediumType::Video,
            Kind::Audio => MediumType::Audio,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Fit,
    Fill,
}

impl From<Mode> for ContentMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Fit => ContentMode::AspectFit,
            Mode::Fill => ContentMode::AspectFill,
        }
    }
}

/// Requested output size. Omitted axes mean "no constraint".
#[derive(clap::Args, Clone)]
struct SizeArgs {
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
}

#[derive(Subcommand)]
enum Command {
    /// List albums, "All" first
    Albums {
        #[arg(long = "type", value_enum, default_value = "image")]
        kind: Kind,
        /// Only media with this file extension (e.g. gif)
        #[arg(long)]
        subtype: Option<String>,
    },
    /// List the media of one album, newest first
    Media {
        #[arg(default_value = ALL_ALBUM_ID)]
        album: String,
        #[arg(long = "type", value_enum, default_value = "image")]
        kind: Kind,
        #[arg(long)]
        subtype: Option<String>,
        #[arg(long)]
        skip: Option<usize>,
        #[arg(long)]
        take: Option<usize>,
    },
    /// Show one medium
    Medium {
        id: String,
        #[arg(long = "type", value_enum)]
        kind: Option<Kind>,
    },
    /// Write a JPEG thumbnail of one medium
    Thumbnail {
        id: String,
        #[arg(long = "type", value_enum)]
        kind: Option<Kind>,
        #[command(flatten)]
        size: SizeArgs,
        #[arg(long)]
        out: PathBuf,
    },
    /// Write a JPEG thumbnail of an album's newest medium
    AlbumThumbnail {
        album: String,
        #[arg(long = "type", value_enum)]
        kind: Option<Kind>,
        #[arg(long)]
        subtype: Option<String>,
        #[command(flatten)]
        size: SizeArgs,
        #[arg(long)]
        out: PathBuf,
    },
    /// Export media into the cache and print their paths
    File {
        #[arg(required = true)]
        ids: Vec<String>,
        #[arg(long = "type", value_enum)]
        kind: Option<Kind>,
        #[command(flatten)]
        size: SizeArgs,
        #[arg(long, value_enum)]
        mode: Option<Mode>,
    },
    /// Delete every exported file
    Clear,
    /// Answer JSON-lines requests on stdin, responses on stdout
    Serve,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let bridge_config = load_bridge_config(&cli)?;
    init_thread_pool(&bridge_config.processing);
    let index = FsMediaIndex::new(&cli.library, RustBackend::new());
    let gallery = Gallery::from_config(index, RustBackend::new(), &bridge_config);

    match cli.command {
        Command::Albums { kind, subtype } => {
            let albums = gallery.list_albums(kind.into(), subtype.as_deref())?;
            output::print_albums(kind.into(), &albums);
        }
        Command::Media {
            album,
            kind,
            subtype,
            skip,
            take,
        } => {
            let page = gallery.list_media(&album, kind.into(), subtype.as_deref(), skip, take)?;
            output::print_media_page(&page);
        }
        Command::Medium { id, kind } => match gallery.get_medium(&id, kind.map(Into::into))? {
            Some(record) => output::print_medium(&record),
            None => return Err(format!("medium not found: {id}").into()),
        },
        Command::Thumbnail {
            id,
            kind,
            size,
            out,
        } => {
            let bytes = gallery.get_thumbnail(&id, kind.map(Into::into), size.width, size.height)?;
            write_thumbnail(bytes, &out, &id)?;
        }
        Command::AlbumThumbnail {
            album,
            kind,
            subtype,
            size,
            out,
        } => {
            let bytes = gallery.get_album_thumbnail(
                &album,
                kind.map(Into::into),
                subtype.as_deref(),
                size.width,
                size.height,
            )?;
            write_thumbnail(bytes, &out, &album)?;
        }
        Command::File {
            ids,
            kind,
            size,
            mode,
        } => {
            let kind = kind.map(Into::into);
            let mode = mode.map(Into::into);
            let results: Vec<_> = ids
                .par_iter()
                .map(|id| gallery.export_medium(id, kind, size.width, size.height, mode))
                .collect();

            for (i, (id, result)) in ids.iter().zip(&results).enumerate() {
                let line = match result {
                    Ok(Some(file)) => ExportLine::Exported(file),
                    Ok(None) => ExportLine::NotFound,
                    Err(e) => ExportLine::Failed(e.to_string()),
                };
                output::print_export(i + 1, id, &line);
            }
            println!("{}", output::format_export_summary(&gallery.cache().stats()));
        }
        Command::Clear => {
            gallery.clear()?;
            println!("Cleared {}", gallery.cache().root().display());
        }
        Command::Serve => {
            let dispatcher = Arc::new(Dispatcher::new(gallery));
            log::info!(
                "serving {} (cache {})",
                dispatcher.gallery().index().root().display(),
                dispatcher.gallery().cache().root().display()
            );
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(channel::serve(
                dispatcher,
                tokio::io::BufReader::new(tokio::io::stdin()),
                tokio::io::stdout(),
            ))?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load the config file and apply command-line overrides.
///
/// An explicit `--config` must exist; the library's `config.toml` is optional.
fn load_bridge_config(cli: &Cli) -> Result<BridgeConfig, Box<dyn std::error::Error>> {
    let path = match &cli.config {
        Some(path) if !path.is_file() => {
            return Err(format!("config file not found: {}", path.display()).into());
        }
        Some(path) => path.clone(),
        None => cli.library.join("config.toml"),
    };
    let mut bridge_config = config::load_config(&path)?;
    if let Some(dir) = &cli.cache_dir {
        bridge_config.cache_dir = Some(dir.clone());
    }
    Ok(bridge_config)
}

fn write_thumbnail(
    bytes: Option<Vec<u8>>,
    out: &Path,
    id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    match bytes {
        Some(bytes) => {
            std::fs::write(out, &bytes)?;
            println!("{} -> {} ({} bytes)", id, out.display(), bytes.len());
            Ok(())
        }
        None => Err(format!("no thumbnail for {id}").into()),
    }
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; users can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
