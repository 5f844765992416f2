// Render a synthetic green-screen clip (and optionally a matching background)
// for trying out the pipeline without real footage.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use image::{ImageBuffer, Rgb};

use backdrop::video::{SyntheticClip, Toolkit};

#[derive(Parser)]
#[command(name = "synth_clip", about = "Render a synthetic green-screen test clip")]
struct Args {
    /// Output video path
    output: PathBuf,

    #[arg(long, default_value_t = 160)]
    width: u32,

    #[arg(long, default_value_t = 120)]
    height: u32,

    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Clip length in seconds
    #[arg(long, default_value_t = 10.0)]
    duration: f64,

    /// Sine tone frequency for the audio track
    #[arg(long, default_value_t = 440.0)]
    tone: f64,

    /// Leave out the audio track
    #[arg(long)]
    silent: bool,

    /// Also write a solid blue background image of the same size here
    #[arg(long)]
    background: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    println!("🎬 Rendering synthetic clip");

    let toolkit = Toolkit::default();
    toolkit.ensure_available()?;

    let clip = SyntheticClip {
        width: args.width,
        height: args.height,
        fps: args.fps,
        duration: args.duration,
        tone_hz: if args.silent { None } else { Some(args.tone) },
        ..SyntheticClip::default()
    };
    clip.render(&toolkit, &args.output)?;
    println!("   📁 Clip saved to: {:?} ({} frames)", args.output, clip.frame_count());

    if let Some(path) = &args.background {
        ImageBuffer::from_pixel(args.width, args.height, Rgb([0u8, 0, 255])).save(path)?;
        println!("   📁 Background saved to: {:?}", path);
    }

    Ok(())
}
