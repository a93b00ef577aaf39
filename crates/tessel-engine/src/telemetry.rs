use tracing::Level;

/// Install a `fmt` subscriber at `level`.
///
/// Returns `false` if a global subscriber was already set, so callers and
/// tests can invoke it repeatedly.
pub fn init_tracing(level: Level) -> bool {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_harmless() {
        init_tracing(Level::DEBUG);
        assert!(!init_tracing(Level::INFO));
    }
}
