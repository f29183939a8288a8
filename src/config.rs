//! Config handling

use tracing::log::LevelFilter;

/// Sets up logging based on the debug flag.
///
/// The HTTP client stack is chatty at debug level, so unless debug logging
/// was asked for, the transport crates are pinned to info and above.
pub fn setup_logging(debug: bool) -> Result<(), anyhow::Error> {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut logger = simple_logger::SimpleLogger::new().with_level(level);
    if !debug {
        for module in ["tracing", "rustls", "hyper_util", "h2", "reqwest"] {
            logger = logger.with_module_level(module, LevelFilter::Info);
        }
    }
    logger
        .init()
        .map_err(|err| anyhow::anyhow!("Failed to initialize logger: {err}"))
}
