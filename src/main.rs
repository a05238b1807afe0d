// Copyright (c) 2026 MIPS-Memview Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use mips_memview::debug;
use mips_memview::disasm_serializer::serialize_compact_frame;
use mips_memview::hex_view::{readout, render_hex, HexOptions};
use mips_memview::request_handler::{serve, HelperState};
use mips_memview::text_canvas::TextCanvas;
use mips_memview::transport::{StdioTransport, TcpTransport, Transport};
use mips_memview::utils::parse_hex_address;
use mips_memview::{CommandView, FormatOptions, Geometry, MipsDecoder, RamImage, ViewerTab, KSEG0};

/// Instruction and memory viewer for big-endian MIPS RDRAM images
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Enable debug output
    #[arg(short = 'd', long = "debug", global = true, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print disassembled rows with branch brackets
    Disasm(DisasmArgs),
    /// Print a hex/ASCII dump, optionally with a value readout
    Hex(HexArgs),
    /// Serve framed JSON requests from a front end
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct FormatArgs {
    /// Lowercase mnemonics, registers and hex digits
    #[arg(long)]
    lowercase: bool,
    /// Print immediates in decimal
    #[arg(long)]
    decimal: bool,
    /// Prefix registers with '$'
    #[arg(long)]
    dollar: bool,
    /// Extra cells between tokens
    #[arg(long, default_value_t = 0)]
    spacing: u32,
}

impl FormatArgs {
    fn options(&self) -> FormatOptions {
        FormatOptions {
            uppercase: !self.lowercase,
            hex_immediates: !self.decimal,
            dollar_registers: self.dollar,
            spacing: self.spacing,
        }
    }
}

#[derive(Args, Debug)]
struct DisasmArgs {
    /// Raw big-endian RDRAM dump
    image: PathBuf,
    /// First row, as a hex address
    #[arg(short = 'a', long = "address", value_parser = address_arg, default_value = "0x80000000")]
    address: u32,
    /// Number of rows
    #[arg(short = 'n', long = "count", default_value_t = 32)]
    count: u32,
    /// Emit a compact JSON chunk instead of text
    #[arg(long)]
    json: bool,
    /// Underline every token to check column alignment
    #[arg(long)]
    overlay: bool,
    #[command(flatten)]
    format: FormatArgs,
}

#[derive(Args, Debug)]
struct HexArgs {
    /// Raw big-endian RDRAM dump
    image: PathBuf,
    #[arg(short = 'a', long = "address", value_parser = address_arg, default_value = "0x80000000")]
    address: u32,
    #[arg(short = 'n', long = "rows", default_value_t = 16)]
    rows: u32,
    /// Print the value readout at this address
    #[arg(short = 'c', long = "cursor", value_parser = address_arg)]
    cursor: Option<u32>,
    /// End of the selection for the readout
    #[arg(short = 'e', long = "end", value_parser = address_arg, requires = "cursor")]
    selection_end: Option<u32>,
    #[arg(long)]
    lowercase: bool,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Raw big-endian RDRAM dump
    image: PathBuf,
    /// Listen on this address (eg "127.0.0.1:9257") instead of stdio
    #[arg(long = "tcp")]
    tcp: Option<String>,
    /// Load the image into memory so hex edits can change it
    #[arg(long)]
    writable: bool,
    /// Pixel width of one character cell in the front end
    #[arg(long = "char-width", default_value_t = 7.0)]
    char_width: f32,
    /// Pixel height of one row in the front end
    #[arg(long = "line-height", default_value_t = 13.0)]
    line_height: f32,
}

fn address_arg(s: &str) -> Result<u32, String> {
    parse_hex_address(s).ok_or_else(|| format!("invalid address '{}'", s))
}

fn open_image(path: &Path) -> Result<RamImage> {
    RamImage::open(path).with_context(|| format!("failed to open {}", path.display()))
}

fn run_disasm(args: DisasmArgs) -> Result<()> {
    let image = open_image(&args.image)?;
    let options = args.format.options();
    options.validate()?;
    let json = args.json;
    let geometry = if json { Geometry::default() } else { Geometry::unit() };
    let width = (options.mnemonic_column() + 48) as usize;

    let view = CommandView::new(options, geometry).with_alignment_overlay(args.overlay);
    let frame = view.render(&image, &MipsDecoder, &ViewerTab::new(args.address), args.count);

    if json {
        println!("{}", serialize_compact_frame(&frame, 0, true));
    } else {
        print!("{}", TextCanvas::render_frame(&frame, width));
    }
    Ok(())
}

fn run_hex(args: HexArgs) -> Result<()> {
    let image = open_image(&args.image)?;
    let options = HexOptions {
        uppercase: !args.lowercase,
        ..HexOptions::default()
    };
    options.validate()?;
    for row in render_hex(&image, args.address, args.rows, &options) {
        println!("{}", row.text(&options));
    }
    if let Some(cursor) = args.cursor {
        println!("{}", readout(&image, cursor, args.selection_end));
    }
    Ok(())
}

fn run_serve(args: ServeArgs) -> Result<()> {
    let image = if args.writable {
        RamImage::load(&args.image)
            .with_context(|| format!("failed to load {}", args.image.display()))?
    } else {
        open_image(&args.image)?
    };
    let size = image.size();
    let session_id = format!("memview-{}", std::process::id());
    log::info!(
        "serving {} (0x{:08x}..0x{:08x})",
        args.image.display(),
        KSEG0,
        KSEG0.wrapping_add(size)
    );

    let mut transport: Box<dyn Transport> = match &args.tcp {
        Some(addr) => Box::new(TcpTransport::listen_and_accept(addr)?),
        None => Box::new(StdioTransport::new()),
    };
    let geometry = Geometry {
        char_width: args.char_width,
        line_height: args.line_height,
        ..Geometry::default()
    };
    let mut state = HelperState::new(Box::new(image), session_id).with_geometry(geometry);
    serve(&mut state, transport.as_mut(), size)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _logger = debug::init_logging(cli.debug)?;

    match cli.command {
        Command::Disasm(args) => run_disasm(args),
        Command::Hex(args) => run_hex(args),
        Command::Serve(args) => run_serve(args),
    }
}
