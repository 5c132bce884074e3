use anyhow::Context;
use image::{GrayImage, Luma};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;

/// A rounded hill added on top of the island falloff
struct Bump {
    x: f32,
    y: f32,
    radius: f32,
    height: f32,
}

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let output = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("assets/image6.png"));
    let size: u32 = match args.next() {
        Some(s) => s.parse().context("size must be a positive integer")?,
        None => 256,
    };
    let seed: u64 = match args.next() {
        Some(s) => s.parse().context("seed must be an integer")?,
        None => 6,
    };
    anyhow::ensure!(size > 1, "size must be at least 2");

    println!("Generating {}x{} height map (seed {})", size, size, seed);

    let mut rng = StdRng::seed_from_u64(seed);
    let bumps: Vec<Bump> = (0..24)
        .map(|_| Bump {
            x: rng.random_range(0.1..0.9),
            y: rng.random_range(0.1..0.9),
            radius: rng.random_range(0.04..0.18),
            height: rng.random_range(0.1..0.45),
        })
        .collect();

    let image = GrayImage::from_fn(size, size, |px, py| {
        let u = px as f32 / (size - 1) as f32;
        let v = py as f32 / (size - 1) as f32;

        // Island: high in the middle, sea level at the rim
        let dx = u - 0.5;
        let dy = v - 0.5;
        let rim = (1.0 - (dx * dx + dy * dy).sqrt() * 2.0).clamp(0.0, 1.0);
        let mut h = rim * rim * 0.5;

        for bump in &bumps {
            let d = ((u - bump.x).powi(2) + (v - bump.y).powi(2)).sqrt() / bump.radius;
            if d < 1.0 {
                let falloff = 0.5 + 0.5 * (d * std::f32::consts::PI).cos();
                h += bump.height * falloff * rim;
            }
        }

        let ridges = (u * 23.0).sin() * (v * 17.0).cos() * 0.03;
        Luma([((h + ridges).clamp(0.0, 1.0) * 255.0) as u8])
    });

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    image
        .save(&output)
        .with_context(|| format!("writing {}", output.display()))?;

    println!("✅ Wrote {}", output.display());
    Ok(())
}
