use std::fmt::Arguments;

use log::{Level, Log, Metadata, Record};

/// A logger that drops every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl Log for Discard {
    fn enabled(&self, _: &Metadata) -> bool {
        false
    }

    fn log(&self, _: &Record) {}

    fn flush(&self) {}
}

static DISCARD: Discard = Discard;

/// The logger handle a provider writes to.
///
/// Providers are handed an optional [`Log`] by the caller rather than relying
/// on the global logger, so the caller decides where diagnostics end up.
/// Without one, records go to [`Discard`].
#[derive(Clone, Copy)]
pub(crate) struct ProviderLog<'a> {
    inner: &'a dyn Log,
    target: &'static str,
}

impl<'a> ProviderLog<'a> {
    pub(crate) fn new(inner: Option<&'a dyn Log>, target: &'static str) -> Self {
        Self {
            inner: inner.unwrap_or(&DISCARD),
            target,
        }
    }

    pub(crate) fn debug(&self, args: Arguments<'_>) {
        self.emit(Level::Debug, args)
    }

    pub(crate) fn info(&self, args: Arguments<'_>) {
        self.emit(Level::Info, args)
    }

    // Built by hand rather than through `log!`: the macros also check the
    // global `max_level()`, which stays `Off` without a global logger and
    // would drop records meant for a supplied one.
    fn emit(&self, level: Level, args: Arguments<'_>) {
        let metadata = Metadata::builder()
            .level(level)
            .target(self.target)
            .build();
        if !self.inner.enabled(&metadata) {
            return;
        }

        self.inner.log(
            &Record::builder()
                .metadata(metadata)
                .args(args)
                .build(),
        );
    }
}
