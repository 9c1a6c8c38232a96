use anyhow::{Context, Result, bail};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Largest range a single token may expand to.
const MAX_RANGE_LEN: u64 = 10_000;

fn range_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(?P<start>\d+)\.\.(?P<inclusive>=)?(?P<end>\d+)$").ok())
        .as_ref()
}

fn hex_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^0[xX](?P<digits>[0-9a-fA-F]{1,16})$").ok())
        .as_ref()
}

/// Resolve CLI seed tokens into a de-duplicated, ordered seed list.
///
/// Accepts decimal integers (a leading minus is folded to its magnitude),
/// hex literals such as `0x2A`, and ranges `start..end` / `start..=end`.
/// An empty list falls back to `1337`.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<u64>> {
    let mut seen = HashSet::new();
    let mut seeds = Vec::new();

    for token in tokens {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        for seed in parse_token(token)? {
            if seen.insert(seed) {
                seeds.push(seed);
            }
        }
    }

    if seeds.is_empty() {
        seeds.push(1337);
    }
    Ok(seeds)
}

fn parse_token(token: &str) -> Result<Vec<u64>> {
    if let Ok(value) = token.parse::<i64>() {
        return Ok(vec![value.unsigned_abs()]);
    }
    if let Ok(value) = token.parse::<u64>() {
        return Ok(vec![value]);
    }
    if let Some(caps) = hex_pattern().and_then(|re| re.captures(token)) {
        let value = u64::from_str_radix(&caps["digits"], 16)
            .with_context(|| format!("invalid hex seed: {token}"))?;
        return Ok(vec![value]);
    }
    if let Some(caps) = range_pattern().and_then(|re| re.captures(token)) {
        let start: u64 = caps["start"]
            .parse()
            .with_context(|| format!("invalid range start: {token}"))?;
        let end: u64 = caps["end"]
            .parse()
            .with_context(|| format!("invalid range end: {token}"))?;
        let end = if caps.name("inclusive").is_some() {
            end.saturating_add(1)
        } else {
            end
        };
        if end <= start {
            bail!("empty seed range: {token}");
        }
        if end - start > MAX_RANGE_LEN {
            bail!("seed range {token} exceeds {MAX_RANGE_LEN} seeds");
        }
        return Ok((start..end).collect());
    }
    bail!("Unrecognized seed token: {token}")
}
