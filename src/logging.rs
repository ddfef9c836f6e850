use tracing::Level;

/// Installs the global line writer: one timestamped, level-colored line per event.
///
/// Safe to call more than once; only the first call takes effect.
pub fn init(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::INFO };

    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_ansi(true)
        .with_max_level(level)
        .try_init();
}
