//! nvpower - dump the power tables of an NVIDIA VBIOS image
//!
//! Usage: nvpower [OPTIONS] IMAGE
//!
//! The power directory is found through the BIT table unless `--dir` gives
//! its location explicitly.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use log::LevelFilter;
use memmap2::Mmap;

use nvpower::config::Config;
use nvpower::{bit, logger, render, AppError, AppResult, DirectoryLocation, Image};

const USAGE: &str = "nvpower [--config PATH] [--dir BASE:LEN:VER] [--hexdump] [--all] [--strict] [-v] IMAGE\n       nvpower [--config PATH] [--hexdump] [--all] [--strict] --save-config";

#[derive(Debug, Default, PartialEq)]
struct Args {
    image: PathBuf,
    config: Option<PathBuf>,
    dir: Option<DirectoryLocation>,
    hexdump: bool,
    show_invalid: bool,
    strict: bool,
    verbose: bool,
    /// Write the effective configuration and exit
    save_config: bool,
}

/// Image bytes, memory-mapped when possible
enum ImageData {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl ImageData {
    fn as_slice(&self) -> &[u8] {
        match self {
            ImageData::Mapped(m) => &m[..],
            ImageData::Owned(v) => &v[..],
        }
    }
}

fn main() -> ExitCode {
    logger::init(LevelFilter::Warn);

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(Some(args)) => args,
        Ok(None) => {
            println!("{}", USAGE);
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::from(2);
        }
    };

    if args.verbose {
        logger::init(LevelFilter::Debug);
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> AppResult<()> {
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };
    config.display.hexdump |= args.hexdump;
    config.display.show_invalid |= args.show_invalid;
    config.decode.strict_bounds |= args.strict;

    if args.save_config {
        let path = config.save()?;
        println!("Configuration saved to {}", path.display());
        return Ok(());
    }

    let data = load_image(&args.image)?;
    let image = Image::new(data.as_slice());

    let location = match args.dir {
        Some(loc) => loc,
        None => bit::locate_power_directory(&image)?,
    };

    let power = nvpower::parse_power_with(&image, location, &config.decode.options())?;
    let text = render::render_power(&image, &power, &config.display);

    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

fn load_image(path: &Path) -> AppResult<ImageData> {
    let file = File::open(path)?;

    // mmap doesn't work on empty files
    if file.metadata()?.len() == 0 {
        return Ok(ImageData::Owned(Vec::new()));
    }

    // SAFETY: the mapping is only read, and only for the lifetime of this process.
    match unsafe { Mmap::map(&file) } {
        Ok(m) => Ok(ImageData::Mapped(m)),
        Err(e) => {
            log::debug!("mmap of {} failed ({}), reading instead", path.display(), e);
            Ok(ImageData::Owned(std::fs::read(path)?))
        }
    }
}

/// Returns `Ok(None)` when help was requested.
fn parse_args(mut it: impl Iterator<Item = String>) -> AppResult<Option<Args>> {
    let mut args = Args::default();
    let mut image = None;

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "--hexdump" => args.hexdump = true,
            "--all" => args.show_invalid = true,
            "--strict" => args.strict = true,
            "-v" | "--verbose" => args.verbose = true,
            "--save-config" => args.save_config = true,
            "--config" => {
                let path = it.next().ok_or_else(|| usage("--config needs a path"))?;
                args.config = Some(PathBuf::from(path));
            }
            "--dir" => {
                let value = it.next().ok_or_else(|| usage("--dir needs BASE:LEN:VER"))?;
                args.dir = Some(parse_dir(&value)?);
            }
            s if s.starts_with('-') => return Err(usage(&format!("unknown option {}", s))),
            _ => {
                if image.replace(PathBuf::from(&arg)).is_some() {
                    return Err(usage("only one image may be given"));
                }
            }
        }
    }

    match image {
        Some(image) => args.image = image,
        None if args.save_config => {}
        None => return Err(usage("missing IMAGE")),
    }
    Ok(Some(args))
}

fn usage(msg: &str) -> AppError {
    AppError::Usage(format!("{}\n{}", msg, USAGE))
}

/// `BASE:LEN:VER`, each decimal or 0x-prefixed hex
fn parse_dir(value: &str) -> AppResult<DirectoryLocation> {
    let parts: Vec<&str> = value.split(':').collect();
    let [base, length, version] = parts.as_slice() else {
        return Err(usage("--dir expects BASE:LEN:VER"));
    };
    let base = u16::try_from(parse_number(base)?).map_err(|_| usage("directory base must fit in 16 bits"))?;
    let length = parse_number(length)?;
    if length > nvpower::directory::MAX_DIRECTORY_LENGTH {
        return Err(usage("directory length must not exceed 0x10000"));
    }
    let version = u8::try_from(parse_number(version)?).map_err(|_| usage("directory version must fit in a byte"))?;
    Ok(DirectoryLocation {
        base: base as usize,
        length,
        version,
    })
}

fn parse_number(s: &str) -> AppResult<usize> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|_| usage(&format!("not a number: {}", s)))
}
