use byteorder::{ReadBytesExt, LE};
use clap::{Parser, Subcommand, ValueEnum};
use snes_ntsc::{FrameLayout, SnesNtsc, SnesNtscSetup, COLOR_COUNT};
use tracing_subscriber::{filter, layer::SubscriberExt, Layer};

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

mod error;

use error::Error;

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let result = match &args.mode {
        Mode::Render {
            input,
            output,
            phase,
        } => render(&args, input, output, *phase),
        Mode::Bench {
            frames,
            sequential,
            input,
        } => bench(&args, input, *frames, *sequential),
    };

    if let Err(err) = result {
        tracing::error!("{err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        filter::LevelFilter::DEBUG
    } else {
        filter::LevelFilter::INFO
    };
    let log = tracing_subscriber::fmt::layer().with_filter(level);

    tracing::subscriber::set_global_default(tracing_subscriber::registry().with(log))
        .expect("init tracing");
}

fn render(args: &Args, input: &Path, output: &Path, phase: usize) -> Result<(), Error> {
    let ntsc = SnesNtsc::new(&args.setup()?)?;
    let frame = args.frame()?;
    let pixels = read_frame(input, &frame)?;

    let mut screen = vec![0; frame.out_width * frame.height * 2];
    SnesNtsc::check_frame(&frame, &pixels, &screen)?;
    blit(&ntsc, &frame, &pixels, phase, &mut screen, true);
    double_scanlines(&mut screen, frame.out_width);

    write_ppm(output, &screen, frame.out_width, frame.height * 2)?;
    tracing::info!(
        width = frame.out_width,
        height = frame.height * 2,
        "wrote {}",
        output.display()
    );

    Ok(())
}

fn bench(args: &Args, input: &Path, frames: u32, sequential: bool) -> Result<(), Error> {
    let setup = args.setup()?;
    let start = Instant::now();
    let ntsc = SnesNtsc::new(&setup)?;
    tracing::info!("built table in {:?}", start.elapsed());

    let frame = args.frame()?;
    let pixels = read_frame(input, &frame)?;
    let mut screen = vec![0; frame.out_width * frame.height * 2];
    SnesNtsc::check_frame(&frame, &pixels, &screen)?;

    let start = Instant::now();
    let mut phase = 0;
    for _ in 0..frames {
        // merged tables already average the fields, alternating would only shimmer
        if !setup.merge_fields() {
            phase ^= 1;
        }
        blit(&ntsc, &frame, &pixels, phase, &mut screen, !sequential);
        double_scanlines(&mut screen, frame.out_width);
    }

    let elapsed = start.elapsed();
    tracing::info!(
        frames,
        fps = frames as f64 / elapsed.as_secs_f64(),
        "blitted {}x{} in {:?}",
        frame.out_width,
        frame.height * 2,
        elapsed
    );

    Ok(())
}

type BlitFn = fn(&SnesNtsc, &[u16], usize, usize, usize, usize, &mut [u16], usize) -> usize;

fn blit(
    ntsc: &SnesNtsc,
    frame: &FrameLayout,
    pixels: &[u16],
    phase: usize,
    screen: &mut [u16],
    parallel: bool,
) {
    let f: BlitFn = match (frame.hires, parallel) {
        (false, false) => SnesNtsc::blit,
        (true, false) => SnesNtsc::blit_hires,
        (false, true) => SnesNtsc::par_blit,
        (true, true) => SnesNtsc::par_blit_hires,
    };

    f(
        ntsc,
        pixels,
        frame.in_pitch,
        phase,
        frame.out_width,
        frame.height,
        screen,
        frame.out_pitch,
    );
}

/// Fills every odd row with a copy of the row above it.
fn double_scanlines(screen: &mut [u16], width: usize) {
    for rows in screen.chunks_exact_mut(width * 2) {
        let (even, odd) = rows.split_at_mut(width);
        odd.copy_from_slice(even);
    }
}

fn read_frame(path: &Path, frame: &FrameLayout) -> Result<Vec<u16>, Error> {
    let mut file = BufReader::new(File::open(path)?);
    let mut pixels = vec![0; frame.in_pitch * frame.height];
    file.read_u16_into::<LE>(&mut pixels)?;
    Ok(pixels)
}

fn read_palette(path: &Path) -> Result<Box<[u16]>, Error> {
    let mut file = BufReader::new(File::open(path)?);
    let mut palette = vec![0; COLOR_COUNT];
    file.read_u16_into::<LE>(&mut palette)?;
    Ok(palette.into_boxed_slice())
}

fn write_ppm(path: &Path, screen: &[u16], width: usize, height: usize) -> Result<(), Error> {
    let rgb: Vec<[u8; 3]> = screen.iter().map(|&p| rgb888(p)).collect();

    let mut file = BufWriter::new(File::create(path)?);
    write!(file, "P6\n{width} {height}\n255\n")?;
    file.write_all(bytemuck::cast_slice(&rgb))?;
    file.flush()?;

    Ok(())
}

fn rgb888(pixel: u16) -> [u8; 3] {
    let r = (pixel >> 11) as u8;
    let g = (pixel >> 5 & 0x3f) as u8;
    let b = (pixel & 0x1f) as u8;
    [r << 3 | r >> 2, g << 2 | g >> 4, b << 3 | b >> 2]
}

#[derive(Parser)]
struct Args {
    /// Base filter parameters
    #[arg(short, long, value_enum, default_value_t)]
    preset: Preset,
    /// Loads filter parameters from a RON file in place of the preset
    #[arg(short, long)]
    setup: Option<PathBuf>,
    #[arg(long, allow_hyphen_values = true)]
    hue: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    saturation: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    contrast: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    brightness: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    sharpness: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    gamma: Option<f64>,
    /// Blends even and odd fields to remove flicker
    #[arg(long)]
    merge_fields: bool,
    /// Raw little endian RGB565 color for each of the 32768 input colors
    #[arg(long)]
    palette: Option<PathBuf>,
    /// Input rows are in the 512 pixel wide modes
    #[arg(long)]
    hires: bool,
    /// Input width in pixels, defaults to 256 or 512 with --hires
    #[arg(long)]
    width: Option<usize>,
    #[arg(long, default_value_t = 223)]
    height: usize,
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    mode: Mode,
}

impl Args {
    fn setup(&self) -> Result<SnesNtscSetup, Error> {
        let mut setup = match &self.setup {
            Some(path) => ron::from_str(&std::fs::read_to_string(path)?)?,
            None => self.preset.setup(),
        };

        let knobs: [(Option<f64>, fn(&mut SnesNtscSetup, f64) -> &mut SnesNtscSetup); 6] = [
            (self.hue, SnesNtscSetup::set_hue),
            (self.saturation, SnesNtscSetup::set_saturation),
            (self.contrast, SnesNtscSetup::set_contrast),
            (self.brightness, SnesNtscSetup::set_brightness),
            (self.sharpness, SnesNtscSetup::set_sharpness),
            (self.gamma, SnesNtscSetup::set_gamma),
        ];
        for (value, set) in knobs {
            if let Some(value) = value {
                set(&mut setup, value);
            }
        }

        if self.merge_fields {
            setup.set_merge_fields(true);
        }

        if let Some(path) = &self.palette {
            setup.set_palette(Some(read_palette(path)?));
        }

        tracing::debug!(
            merge_fields = setup.merge_fields(),
            remapped = self.palette.is_some(),
            "filter setup"
        );
        Ok(setup)
    }

    /// Input frame blitted to every other row of a screen twice its height.
    fn frame(&self) -> Result<FrameLayout, Error> {
        let width = self
            .width
            .unwrap_or(if self.hires { 512 } else { 256 });
        let frame = FrameLayout::packed(width, self.height, self.hires)?;

        Ok(FrameLayout {
            out_pitch: frame.out_pitch * 2,
            ..frame
        })
    }
}

#[derive(Debug, Copy, Clone, ValueEnum, Default)]
enum Preset {
    #[default]
    Composite,
    Monochrome,
}

impl Preset {
    fn setup(self) -> SnesNtscSetup {
        match self {
            Preset::Composite => SnesNtscSetup::composite(),
            Preset::Monochrome => SnesNtscSetup::monochrome(),
        }
    }
}

#[derive(Subcommand)]
enum Mode {
    /// Filter a raw frame into a PPM image
    Render {
        /// Raw little endian 15-bit BGR pixels
        input: PathBuf,
        output: PathBuf,
        /// Burst phase of the first row
        #[arg(long, default_value_t = 0)]
        phase: usize,
    },
    /// Filter the same frame repeatedly and report the frame rate
    Bench {
        /// Number of frames to filter
        #[arg(short, long, default_value_t = 600)]
        frames: u32,
        /// Filter all rows on the calling thread
        #[arg(long)]
        sequential: bool,
        input: PathBuf,
    },
}
