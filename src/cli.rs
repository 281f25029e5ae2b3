use clap::Parser;

#[derive(Parser)]
#[command(name = "ecs-event-tail")]
#[command(about = "Forward ECS service deployment events to a log backend")]
pub struct Cli {
    /// Path to the YAML config file (falls back to $CONFIG_FILE, then config.yaml)
    #[arg(short = 'f', long)]
    pub config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}
