use tracing::Level;

/// Install the process-wide subscriber. Library code only emits events, so
/// nothing is printed unless the binary calls this.
pub fn init(level: Level) {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}
