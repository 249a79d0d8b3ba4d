#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}

/// Print a tagged trace line to stderr when `$cfg` (a `Config`) has tracing
/// on, either through `--debug` or the `RULEGUESS_DEBUG` variable.
#[macro_export]
macro_rules! debug_trace {
    ($cfg:expr, $($arg:tt)*) => {
        if $cfg.tracing() {
            eprintln!($($arg)*);
        }
    };
}

pub(crate) fn debug_env() -> bool {
    static ENABLED: once_cell::sync::Lazy<bool> =
        once_cell::sync::Lazy::new(|| std::env::var_os("RULEGUESS_DEBUG").is_some());
    *ENABLED
}
