//! Console logging for page lifecycle diagnostics.
//!
//! The runtime only emits `tracing` events; hosts that do not bring their own subscriber can call
//! [`install_tracing`] once at startup. The filter honours `RUST_LOG` and defaults to `info`.

use std::io::{self, Write};
use std::sync::Once;

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::writer::MakeWriter;
use tracing_subscriber::fmt::{self, FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const TRACING_PREFIX: &str = "[waterpage]";
const DEFAULT_FILTER: &str = "info";

static TRACING_INSTALLED: Once = Once::new();

/// Install the console subscriber (idempotent).
///
/// Does nothing observable if another global subscriber is already set.
pub fn install_tracing() {
    TRACING_INSTALLED.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        let console = fmt::layer()
            .event_format(LifecycleFormatter)
            .with_writer(PrefixedWriter)
            .with_ansi(false)
            .with_filter(filter);

        if tracing_subscriber::registry().with(console).try_init().is_err() {
            eprintln!("{TRACING_PREFIX} a global tracing subscriber is already installed");
        }
    });
}

// ============================================================================
// Console Output
// ============================================================================

#[derive(Clone, Default)]
struct PrefixedWriter;

impl<'a> MakeWriter<'a> for PrefixedWriter {
    type Writer = PrefixedWriterInner<io::Stderr>;

    fn make_writer(&'a self) -> Self::Writer {
        PrefixedWriterInner {
            inner: io::stderr(),
            wrote_prefix: false,
        }
    }
}

struct PrefixedWriterInner<W> {
    inner: W,
    wrote_prefix: bool,
}

impl<W: Write> Write for PrefixedWriterInner<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.wrote_prefix {
            self.inner.write_all(TRACING_PREFIX.as_bytes())?;
            self.inner.write_all(b" ")?;
            self.wrote_prefix = true;
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Renders `LEVEL target [span > span]: fields`, so events carry the page they belong to.
#[derive(Clone, Default)]
struct LifecycleFormatter;

impl<S, N> FormatEvent<S, N> for LifecycleFormatter
where
    S: tracing::Subscriber + for<'span> LookupSpan<'span>,
    N: for<'writer> FormatFields<'writer> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();
        write!(writer, "{} {}", metadata.level(), metadata.target())?;

        if let Some(scope) = ctx.event_scope() {
            let spans: Vec<_> = scope.from_root().map(|span| span.name()).collect();
            if !spans.is_empty() {
                write!(writer, " [{}]", spans.join(" > "))?;
            }
        }

        write!(writer, ": ")?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_each_record_once() {
        let mut writer = PrefixedWriterInner {
            inner: Vec::new(),
            wrote_prefix: false,
        };
        writer.write_all(b"INFO waterpage: ").unwrap();
        writer.write_all(b"page ready\n").unwrap();
        assert_eq!(
            String::from_utf8(writer.inner).unwrap(),
            "[waterpage] INFO waterpage: page ready\n"
        );
    }

    #[test]
    fn install_is_idempotent() {
        install_tracing();
        install_tracing();
        tracing::info!("logging installed");
    }
}
