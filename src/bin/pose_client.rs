//! Minimal subscriber: connects to a transform publisher and prints the
//! newest matrix as it arrives. Useful for checking a running daemon.

use anyhow::Result;
use clap::Parser;
use head_pose_stream::streaming::PoseSubscriber;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Publisher endpoint to connect to
    #[arg(short, long, default_value = "127.0.0.1:5555")]
    endpoint: String,

    /// Poll interval in milliseconds
    #[arg(short, long, default_value = "16")]
    interval_ms: u64,
}

fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    let args = Args::parse();

    log::info!("Connecting to {}", args.endpoint);
    let mut subscriber = PoseSubscriber::connect(&args.endpoint)?;

    let interval = Duration::from_millis(args.interval_ms);
    loop {
        if let Some(transform) = subscriber.latest()? {
            println!("{:.4}", transform.matrix());
        }
        if subscriber.is_closed() {
            log::info!("Publisher closed the connection");
            return Ok(());
        }
        std::thread::sleep(interval);
    }
}
