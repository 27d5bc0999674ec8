use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use stormwatch::config::Config;
use stormwatch::parser::resolve as resolve_advisory_time;

/// Resolve an advisory clock time the way the scheduler would
pub fn resolve(config: &Config, time: &str, timezone: &str, reference: Option<String>) -> Result<()> {
    let reference = match reference {
        Some(text) => DateTime::parse_from_rfc3339(&text)
            .with_context(|| format!("Invalid RFC 3339 reference time: {text}"))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    let resolved = resolve_advisory_time(time, timezone, reference)
        .with_context(|| format!("Could not resolve \"{time} {timezone}\""))?;
    let display = resolved.with_timezone(&config.display_timezone()?);
    let wait = resolved.with_timezone(&Utc) - reference;

    println!("Reference: {}", reference.to_rfc3339());
    println!("Advisory:  {}", resolved.to_rfc3339());
    println!("Display:   {} ({})", display.format("%Y-%m-%d %I:%M %p %Z"), config.display.timezone);
    println!("Wait:      {}s", wait.num_seconds());

    Ok(())
}
