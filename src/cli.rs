use clap::Parser;
use std::path::PathBuf;

use crate::disk::DEFAULT_BLOCK_COUNT;

#[derive(Parser, Debug)]
#[command(
    name = "chainfs",
    version,
    about = "Interactive shell over a chained-block file system image"
)]
pub struct Cli {
    /// Disk image file, created when missing
    #[arg(long, short, default_value = "disk.img")]
    pub image: PathBuf,

    /// Number of 4 KiB blocks when creating or extending the image
    #[arg(long, short, default_value_t = DEFAULT_BLOCK_COUNT)]
    pub blocks: u64,

    /// Reformat the image on start
    #[arg(long)]
    pub format: bool,
}
