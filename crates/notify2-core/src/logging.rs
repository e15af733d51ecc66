use tracing_subscriber::{fmt, EnvFilter};

use crate::Result;

/// Initialize logging/tracing on stderr.
///
/// `verbosity` raises the default level for our crates (0 = warn, 1 = info,
/// 2+ = debug). `RUST_LOG` overrides it entirely. If a subscriber is already
/// installed (embedding application, second call) this leaves it in place.
pub fn init(service_name: &str, verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,notify2_core={level},notify2_telegram={level},{}={level}",
            service_name.replace('-', "_")
        ))
    });

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_is_harmless() {
        init("notify", 0).unwrap();
        init("notify", 2).unwrap();
    }
}
