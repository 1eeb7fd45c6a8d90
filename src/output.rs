use std::sync::OnceLock;

static QUIET: OnceLock<bool> = OnceLock::new();

/// Silence human-readable output for the rest of the process.
///
/// Must run before the first call to [`is_quiet`]; later calls are ignored.
pub fn set_quiet(quiet: bool) {
    let _ = QUIET.set(quiet || quiet_from_env());
}

/// `--quiet` or `GEOCACHE_QUIET=1` silences human-readable output. Errors are still shown.
pub fn is_quiet() -> bool {
    *QUIET.get_or_init(quiet_from_env)
}

fn quiet_from_env() -> bool {
    parse_switch(std::env::var("GEOCACHE_QUIET").ok().as_deref())
}

fn parse_switch(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some(v) if v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes"))
}
