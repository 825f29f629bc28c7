//! Export Blu-ray IGS menus to PNG images, one file per page and button
//! state combination.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use igs_menu::model::{FramePhase, Menu, SelectionState};
use igs_menu::render::{self, ColorMatrix, ColorRange, RenderOptions};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "igs2png", about = "Export Blu-ray IGS menus to PNG images")]
struct Cli {
    /// Menu files to export: plain IGS streams or Blu-ray transport
    /// streams.
    #[arg(value_name = "file", required = true)]
    files: Vec<PathBuf>,

    /// Show detailed information on error.
    #[arg(short, long)]
    verbose: bool,

    /// YUV matrix of the menu file. If skipped, it will be auto-detected
    /// from the height of the menu.
    #[arg(short, long, value_enum)]
    matrix: Option<MatrixArg>,

    /// Specify that the menu file is in full range. Default is TV range.
    #[arg(long)]
    full_range: bool,
}

#[derive(Copy, Clone, ValueEnum)]
enum MatrixArg {
    #[value(name = "601")]
    Bt601,
    #[value(name = "709")]
    Bt709,
}

impl From<MatrixArg> for ColorMatrix {
    fn from(arg: MatrixArg) -> Self {
        match arg {
            MatrixArg::Bt601 => ColorMatrix::Bt601,
            MatrixArg::Bt709 => ColorMatrix::Bt709,
        }
    }
}

fn export_file(path: &Path, matrix: Option<ColorMatrix>, range: ColorRange) -> anyhow::Result<()> {
    let data =
        std::fs::read(path).with_context(|| format!("unable to read {}", path.display()))?;
    let menu = Menu::from_bytes(&data)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    let options = RenderOptions {
        matrix: matrix.unwrap_or_else(|| ColorMatrix::for_height(menu.height)),
        range,
    };
    let prefix = path.with_extension("");

    for (page_index, page) in menu.pages.iter().enumerate() {
        for state in SelectionState::ALL {
            for phase in FramePhase::ALL {
                let image = render::render_page(&menu, page_index, &options, state, phase)
                    .with_context(|| format!("unable to generate image for {}", path.display()))?;
                let name = format!("{}_{}_{}_{}.png", prefix.display(), page.id, state, phase);
                let file =
                    File::create(&name).with_context(|| format!("unable to create {}", name))?;
                render::write_png(BufWriter::new(file), menu.width, menu.height, &image)
                    .with_context(|| format!("unable to write {}", name))?;
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let range = if cli.full_range {
        ColorRange::Full
    } else {
        ColorRange::Tv
    };
    let matrix = cli.matrix.map(ColorMatrix::from);

    let mut failed = false;
    for path in &cli.files {
        if !path.is_file() {
            eprintln!("Error: {} is not found", path.display());
            failed = true;
            continue;
        }
        if let Err(err) = export_file(path, matrix, range) {
            if cli.verbose {
                eprintln!("Error: {:?}", err);
            } else {
                eprintln!("Error: {:#}", err);
            }
            failed = true;
        }
    }

    if failed {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}
