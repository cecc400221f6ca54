//
// bktview.rs -- bucket file inspector
//
// This file is part of the bucketfile software project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use bucketfile::{BucketFile, OpenMode, Result};

#[derive(Parser)]
#[command(name = "bktview", about = "Inspect a bucket file", version)]
struct Args {
    /// Bucket file to inspect
    file: PathBuf,

    /// Also dump the bucket at this index
    #[arg(short, long)]
    index: Option<i32>,

    /// Print the file header as JSON
    #[arg(long)]
    json: bool,
}

fn run(args: &Args) -> Result<()> {
    let bf = BucketFile::open(&args.file, OpenMode::ReadOnly)?;
    let header = bf.file_header();

    if args.json {
        let text = serde_json::to_string_pretty(&header).map_err(io::Error::other)?;
        println!("{text}");
    } else {
        println!("magic {:#06x}", header.magic);
        println!("version {}.{}", header.major_version, header.minor_version);
        println!("header-size {}", header.header_size);
        println!("bucket-size {}", header.bucket_size);
        println!("buckets {}", header.number_of_buckets);
        println!("empty-buckets {}", header.number_of_empty_buckets);
        println!("empty-head {}", header.index_of_empty_bucket);
    }

    if let Some(index) = args.index {
        match bf.read(index)? {
            Some((data, stamp)) => {
                println!("time-stamp {stamp}");
                println!("{}", String::from_utf8_lossy(&data));
            }
            None => println!("bucket {index} holds no data"),
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("bktview: {e}");
            ExitCode::FAILURE
        }
    }
}
