use clap::Parser;
use clio::Input;

#[derive(Debug, Parser)]
#[command(name = "park-server", about = "Theme park rides service")]
pub struct Opt {
    /// Config file path
    #[arg(short, long, value_parser, default_value = "config.toml")]
    pub config: Input,
}
