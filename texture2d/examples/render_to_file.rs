//! Draw a generated sprite and a text label into an offscreen target and save it as PNG.
//! Run with: cargo run --example render_to_file -- [output.png]

use std::sync::Arc;

use anyhow::Context;
use texture2d::device::WgpuDevice;
use texture2d::text::FontKitRasterizer;
use texture2d::{DecodedImage, Point, Rect, Texture2D};

const WIDTH: u32 = 320;
const HEIGHT: u32 = 200;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let output = std::env::args().nth(1).unwrap_or_else(|| "texture2d.png".into());
    let device = Arc::new(WgpuDevice::new_headless().await?);
    let target = device.create_target(WIDTH, HEIGHT)?;

    let mut sprite = Texture2D::new(device.clone());
    sprite.init_with_image(&gradient(50, 50)?)?;
    sprite.set_alias_tex_parameters()?;

    let mut label = Texture2D::new(device.clone());
    label.init_with_string("Texture2D", "sans-serif", 32.0, &FontKitRasterizer::new())?;

    log::info!("Sprite: {sprite}");
    log::info!("Label: {label}");

    sprite.draw_in_rect(Rect::new(20.0, 20.0, 100.0, 100.0));
    sprite.draw_at_point(Point::new(150.0, 60.0));
    label.draw_at_point(Point::new(20.0, 140.0));
    device.render(&target, wgpu::Color::BLACK);

    let pixels = device.read_pixels(&target).await?;
    image::RgbaImage::from_raw(WIDTH, HEIGHT, pixels)
        .context("pixel buffer does not match the target size")?
        .save(&output)
        .with_context(|| format!("failed to save {output}"))?;

    log::info!("Saved {output}");
    Ok(())
}

fn gradient(width: u32, height: u32) -> anyhow::Result<DecodedImage> {
    let mut bytes = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            let alpha = if (x / 10 + y / 10) % 2 == 0 { 255 } else { 128 };
            let (red, green) = ((x * 255 / width) as u8, (y * 255 / height) as u8);
            bytes.extend_from_slice(&[red, green, 160, alpha]);
        }
    }

    Ok(DecodedImage::new(bytes, width, height)?)
}
