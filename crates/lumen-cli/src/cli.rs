use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "lumen", about = "Lumen image store: synthesize, inspect and replay", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Config file. Missing is fine.
    #[arg(short, long, global = true, default_value = "lumen.toml")]
    pub config: PathBuf,

    /// Overrides `data_dir` from the config file.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a synthetic image aggregate and save it
    Synth(SynthArgs),
    /// Describe a stored aggregate or image
    Show(ShowArgs),
    /// Walk a stored aggregate frame by frame
    Replay(ReplayArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum AggregateKind {
    Sequence,
    Collection,
}

#[derive(Args)]
pub struct SynthArgs {
    #[arg(long, value_enum, default_value = "sequence")]
    pub kind: AggregateKind,
    #[arg(short = 'n', long, default_value = "10")]
    pub frames: u32,
    #[arg(long, default_value = "64")]
    pub width: u32,
    #[arg(long, default_value = "48")]
    pub height: u32,
    #[arg(long)]
    pub stereo: bool,
    /// Camera separation for stereo pairs, in metres.
    #[arg(long, default_value = "0.12")]
    pub baseline: f64,
    #[arg(long)]
    pub depth: bool,
    #[arg(long)]
    pub labels: bool,
    #[arg(long)]
    pub normals: bool,
    /// Seconds between frames.
    #[arg(long, default_value = "0.1")]
    pub interval: f64,
    /// Fixed RNG seed for reproducible output.
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args)]
pub struct ShowArgs {
    pub id: String,
}

#[derive(Args)]
pub struct ReplayArgs {
    pub id: String,
    /// Stop after this many frames.
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_synth_defaults() {
        let cli = Cli::try_parse_from(["lumen", "synth"]).unwrap();
        if let Command::Synth(args) = cli.command {
            assert_eq!(args.kind, AggregateKind::Sequence);
            assert_eq!(args.frames, 10);
            assert!(!args.stereo);
            assert_eq!(args.seed, None);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_synth_collection() {
        let cli = Cli::try_parse_from([
            "lumen", "synth", "--kind", "collection", "-n", "3", "--stereo", "--depth", "--seed",
            "7",
        ])
        .unwrap();
        if let Command::Synth(args) = cli.command {
            assert_eq!(args.kind, AggregateKind::Collection);
            assert_eq!(args.frames, 3);
            assert!(args.stereo && args.depth);
            assert!(!args.labels);
            assert_eq!(args.seed, Some(7));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_replay_limit() {
        let cli = Cli::try_parse_from(["lumen", "replay", "abc", "-n", "2"]).unwrap();
        if let Command::Replay(args) = cli.command {
            assert_eq!(args.id, "abc");
            assert_eq!(args.limit, Some(2));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from(["lumen", "--data-dir", "/tmp/x", "-v", "show", "abc"])
            .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/x")));
        assert_eq!(cli.config, PathBuf::from("lumen.toml"));
        assert!(matches!(cli.command, Command::Show(_)));
    }
}
