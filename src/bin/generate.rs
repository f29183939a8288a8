use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose;
use clap::Parser;
use imgen::constants::OPENAI_IMAGES_URL;
use imgen::openai::{
    Background, GenerationRequest, ImageQuality, ImageSize, OpenAiClient, OutputFormat,
};
use std::fs;
use std::path::PathBuf;

/// Generate images from the command line, no server required.
///
/// Minimal UX:
///   generate "a red cube on a white table"
#[derive(Parser, Debug)]
#[command(name = "generate")]
#[command(about = "One-shot image generation via the OpenAI Images API")]
struct Args {
    /// Text prompt for the image
    prompt: String,

    /// OpenAI API key
    #[arg(required = true, long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: String,

    /// Image model
    #[arg(long, default_value = "dall-e-3")]
    model: String,

    /// Image dimensions
    #[arg(long, value_enum, default_value = "1024x1024")]
    size: ImageSize,

    /// Rendering quality
    #[arg(long, value_enum, default_value = "standard")]
    quality: ImageQuality,

    /// Output file format
    #[arg(long, value_enum, default_value = "png")]
    format: OutputFormat,

    /// Background treatment
    #[arg(long, value_enum, default_value = "auto")]
    background: Background,

    /// Number of images to request
    #[arg(short, default_value_t = 1)]
    n: u8,

    /// Output directory (files go in <dir>/generated_<i>.<format>)
    #[arg(long, default_value = "./images", env = "IMGEN_IMAGE_DIR")]
    out_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let client = OpenAiClient::new(
        Some(args.openai_api_key.clone()),
        OPENAI_IMAGES_URL.to_string(),
    );
    let request = GenerationRequest {
        prompt: args.prompt.clone(),
        size: args.size,
        quality: args.quality,
        model: args.model.clone(),
        count: args.n,
        output_format: args.format,
        background: args.background,
    };

    let response = client
        .generate(&request)
        .await
        .map_err(|err| anyhow!("{err}"))?;

    if response.data.is_empty() {
        return Err(anyhow!("No image data returned"));
    }

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("Failed to create {}", args.out_dir.display()))?;

    for (index, image) in response.data.iter().enumerate() {
        if let Some(revised_prompt) = image.revised_prompt.as_deref() {
            eprintln!("Revised prompt from OpenAI: {revised_prompt}");
        }

        let b64_json = image
            .b64_json
            .as_deref()
            .ok_or_else(|| anyhow!("Image {index} response missing b64_json field"))?;
        let bytes = general_purpose::STANDARD
            .decode(b64_json)
            .context("Failed to base64-decode image")?;

        let output_filename = args
            .out_dir
            .join(format!("generated_{index}.{}", args.format.extension()));
        fs::write(&output_filename, &bytes)
            .with_context(|| format!("Failed to write {}", output_filename.display()))?;

        eprintln!("Saved: {}", output_filename.display());
    }

    Ok(())
}
