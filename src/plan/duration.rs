use std::sync::LazyLock;

use regex::Regex;

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^P(?:(?P<days>\d+)D)?(?:T(?:(?P<hours>\d+)H)?(?:(?P<minutes>\d+)M)?(?:(?P<seconds>\d+)S)?)?",
    )
    .expect("duration pattern is valid")
});

/// Convert an ISO 8601 duration string (e.g. `PT1H2M3S`) to total seconds.
///
/// Total over all inputs: missing or unparseable components count as zero,
/// and a string that is not a duration at all yields zero.
pub fn parse_iso8601_duration(duration: &str) -> u64 {
    let Some(caps) = DURATION_RE.captures(duration) else {
        return 0;
    };
    let part = |name: &str| {
        caps.name(name)
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0)
    };
    part("days") * 86_400 + part("hours") * 3_600 + part("minutes") * 60 + part("seconds")
}
