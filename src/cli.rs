//! CLI parser
use crate::constants::OPENAI_IMAGES_URL;
use clap::Parser;
use std::num::NonZeroU16;
use std::path::PathBuf;

#[derive(Parser, Debug)]
/// CLI Options
pub struct CliOptions {
    #[clap(long, help = "Enable debug logging", env = "IMGEN_DEBUG")]
    /// Enable debug logging. Env: IMGEN_DEBUG
    pub debug: bool,
    #[clap(long, short, default_value = "9000", env = "IMGEN_PORT")]
    /// http listener, defaults to `9000`.
    /// Env: IMGEN_PORT
    pub port: NonZeroU16,
    #[clap(
        long,
        short,
        default_value = "127.0.0.1",
        env = "IMGEN_LISTEN_ADDRESS"
    )]
    /// Listen address, defaults to `127.0.0.1`.
    /// Env: IMGEN_LISTEN_ADDRESS
    pub listen_address: String,

    #[clap(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    /// OpenAI API key. The server starts without one, but every generation
    /// request fails until it is set. Env: OPENAI_API_KEY
    pub openai_api_key: Option<String>,

    #[clap(long, default_value = "dall-e-3", env = "IMGEN_IMAGE_MODEL")]
    /// Image model requested from the API.
    /// Env: IMGEN_IMAGE_MODEL
    pub image_model: String,

    #[clap(long, default_value = "static/images", env = "IMGEN_IMAGE_DIR")]
    /// Directory generated images are written to, eg `static/images`.
    /// Env: IMGEN_IMAGE_DIR
    pub image_dir: PathBuf,

    #[clap(long, default_value = OPENAI_IMAGES_URL, env = "IMGEN_API_URL")]
    /// Images API endpoint. Only worth changing when pointing at a mock.
    /// Env: IMGEN_API_URL
    pub api_url: String,
}
