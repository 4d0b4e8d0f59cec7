//! Command-line argument parsing (§6.1): `-b`/`-f` select the block size and
//! FAT type used only when `filesystem` does not already exist.

use std::path::PathBuf;

use clap::Parser;
use vfs_fs::{BlockSize, FatType};

#[derive(Parser, Debug)]
#[command(name = "vfs", about = "Host-file-backed FAT virtual file system shell")]
pub struct Args {
    /// Block size in bytes, one of 128/256/512/1024 (ignored if FILESYSTEM exists).
    #[arg(short = 'b', value_parser = parse_block_size, default_value = "256")]
    pub block_size: BlockSize,

    /// FAT type, one of 7/8/9/10 (ignored if FILESYSTEM exists).
    #[arg(short = 'f', value_parser = parse_fat_type, default_value = "8")]
    pub fat_type: FatType,

    /// Path to the backing file, created and formatted if it does not exist.
    pub filesystem: PathBuf,
}

fn parse_block_size(s: &str) -> Result<BlockSize, String> {
    let value: i32 = s.parse().map_err(|_| format!("invalid block size '{s}'"))?;
    BlockSize::try_from(value).map_err(|_| format!("invalid block size '{s}'"))
}

fn parse_fat_type(s: &str) -> Result<FatType, String> {
    let value: i32 = s.parse().map_err(|_| format!("invalid fat type '{s}'"))?;
    FatType::try_from(value).map_err(|_| format!("invalid fat type '{s}'"))
}
