use tracing_subscriber::{
    filter::LevelFilter,
    fmt::format::FmtSpan,
    prelude::*,
    EnvFilter,
};

use podlink::util::bootstrap;

use crate::options::{
    LogFormat,
    Logging,
};

const CRATES: [&str; 3] = ["podlink", "podlink_message", "podlink_codec"];

pub fn init(logging: &Logging) {
    let filter = level_filter(logging.verbose);
    bootstrap!("tracing with filter {} as {:?}", filter, logging.log_format);

    let stderr = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::CLOSE);

    let registry = tracing_subscriber::registry().with(filter);

    match logging.log_format {
        LogFormat::Pretty => registry.with(stderr.pretty()).init(),
        LogFormat::Compact => registry.with(stderr.compact().with_target(false)).init(),
        LogFormat::Json => registry.with(stderr.json().flatten_event(true)).init(),
    }
}

/// `RUST_LOG` when set; otherwise warnings from dependencies and `verbose` steps above info
/// (or debug, in debug builds) for our own crates.
fn level_filter(verbose: u8) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let base: u8 = if cfg!(debug_assertions) { 1 } else { 0 };
    let ours = match base.saturating_add(verbose) {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let directives = std::iter::once(LevelFilter::WARN.to_string())
        .chain(CRATES.iter().map(|krate| format!("{krate}={ours}")))
        .collect::<Vec<_>>();

    EnvFilter::new(directives.join(","))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn verbosity_raises_our_crates_only() {
        std::env::remove_var(EnvFilter::DEFAULT_ENV);

        let quiet = level_filter(0).to_string();
        assert!(quiet.contains("warn"));

        let loud = level_filter(2).to_string();
        for krate in CRATES {
            assert!(loud.contains(&format!("{krate}=trace")), "{loud}");
        }
    }
}
