use std::{num::NonZeroU8, panic, path::Path};

use time::format_description::well_known::{iso8601, Iso8601};
use tracing::{error, Level};
use tracing_subscriber::{
    fmt::{time::LocalTime, writer::MakeWriterExt},
    prelude::__tracing_subscriber_SubscriberExt,
    EnvFilter, Layer,
};

const MY_CONFIG: iso8601::EncodedConfig = iso8601::Config::DEFAULT
    .set_time_precision(iso8601::TimePrecision::Second {
        decimal_digits: NonZeroU8::new(3),
    })
    .encode();

const DIRECTIVES: &str = if cfg!(debug_assertions) {
    concat!(env!("CARGO_CRATE_NAME"), "=trace,re4ap_lib=trace")
} else {
    concat!(env!("CARGO_CRATE_NAME"), "=info,re4ap_lib=info")
};

/// Logs to `dir/file_name`, and also to stdout when a console is attached.
pub fn init_tracing(dir: &Path, file_name: &str, console: bool) {
    let default_layer = || {
        const WITH_FILE_PATH: bool = cfg!(debug_assertions);
        tracing_subscriber::fmt::layer()
            .compact()
            .with_file(WITH_FILE_PATH)
            .with_line_number(WITH_FILE_PATH)
            .with_target(!WITH_FILE_PATH)
            .with_thread_ids(true)
            .with_timer(LocalTime::new(Iso8601::<MY_CONFIG>))
    };
    let writer = tracing_appender::rolling::never(dir, file_name);
    let max_level = if cfg!(debug_assertions) {
        Level::TRACE
    } else {
        Level::INFO
    };
    let writer = writer.with_max_level(max_level);

    let layer = default_layer()
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(EnvFilter::new(DIRECTIVES));

    let result = if console {
        tracing::subscriber::set_global_default(
            tracing_subscriber::registry().with(
                layer.and_then(
                    default_layer()
                        .with_ansi(true)
                        .with_filter(EnvFilter::new(DIRECTIVES)),
                ),
            ),
        )
    } else {
        tracing::subscriber::set_global_default(tracing_subscriber::registry().with(layer))
    };
    if let Err(err) = result {
        eprintln!("tracing is already initialized: {}", err);
    }

    panic::set_hook(Box::new(|panic| error!("{}", panic)));
}
