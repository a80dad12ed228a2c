//! Head pose streaming daemon: landmarks in, 4x4 transforms out over TCP.

use anyhow::Result;
use clap::Parser;
use head_pose_stream::app::HeadPoseApp;
use head_pose_stream::config::Config;
use head_pose_stream::landmarks::JsonlLandmarkSource;
use log::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Landmark stream file (JSON lines, one frame per line); stdin if omitted
    #[arg(short, long)]
    landmarks: Option<String>,

    /// Override the bind address from the configuration
    #[arg(long)]
    bind: Option<String>,

    /// Override the TCP port from the configuration
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Print an example configuration file and exit
    #[arg(long)]
    print_config: bool,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if args.print_config {
        print!("{}", head_pose_stream::config::EXAMPLE_CONFIG);
        return Ok(());
    }

    let mut config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path);
        Config::from_file(config_path)?
    } else {
        Config::default()
    };
    if let Some(bind) = args.bind {
        config.transport.bind_addr = bind;
    }
    if let Some(port) = args.port {
        config.transport.port = port;
    }

    info!("Streaming head transforms on {}", config.transport.endpoint());

    let stats = match &args.landmarks {
        Some(path) => {
            info!("Reading landmarks from: {}", path);
            let source = JsonlLandmarkSource::open(path)?;
            HeadPoseApp::new(&config, source)?.run()?
        }
        None => {
            info!("Reading landmarks from stdin");
            let stdin = std::io::stdin();
            let source = JsonlLandmarkSource::new(stdin.lock());
            HeadPoseApp::new(&config, source)?.run()?
        }
    };

    info!(
        "Done: {} frames, {} transforms published",
        stats.frames, stats.published
    );
    Ok(())
}
