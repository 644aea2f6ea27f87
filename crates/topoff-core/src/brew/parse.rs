use crate::models::{OutdatedPackage, UNKNOWN_VERSION, UpgradedPackage};

const HEADER_MARKER: &str = "==>";
const OUTDATED_MARKER: &str = " < ";
const TRANSITION_MARKER: &str = " -> ";
const UPGRADING_HEADER: &str = "==> Upgrading ";
const TRANSITION_PREFIXES: &[&str] = &["==> Upgrading ", "==> ", "Upgrading "];
const FREED_PREFIX: &str = "freed approximately ";
const FREED_SUFFIX: &str = " of disk space";

/// Parses `brew outdated --verbose` lines of the form `name (current) < latest`.
///
/// A repeated name keeps its first position but takes the values of its last occurrence.
pub fn parse_outdated_packages(output: &str) -> Vec<OutdatedPackage> {
    let parsed = output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(parse_outdated_line)
        .collect();
    dedupe_outdated(parsed)
}

pub fn dedupe_outdated(packages: Vec<OutdatedPackage>) -> Vec<OutdatedPackage> {
    let mut deduped: Vec<OutdatedPackage> = Vec::with_capacity(packages.len());
    for package in packages {
        match deduped
            .iter_mut()
            .find(|existing| existing.name == package.name)
        {
            Some(existing) => *existing = package,
            None => deduped.push(package),
        }
    }
    deduped
}

fn parse_outdated_line(line: &str) -> Option<OutdatedPackage> {
    if is_diagnostic(line) {
        return None;
    }

    let (left, right) = line.split_once(OUTDATED_MARKER)?;
    // Trailing annotations such as `[pinned at 1.21]` follow the version.
    let latest_version = right.split_whitespace().next()?;

    let left = left.trim();
    let (name, current_version) = match parenthesized_suffix(left) {
        Some((open, close)) => {
            let inside = left[open + 1..close].trim();
            let current = if inside.is_empty() {
                UNKNOWN_VERSION
            } else {
                inside
            };
            (left[..open].trim(), current)
        }
        None => (left, UNKNOWN_VERSION),
    };

    if name.is_empty() {
        return None;
    }

    Some(OutdatedPackage {
        name: name.to_string(),
        current_version: current_version.to_string(),
        latest_version: latest_version.to_string(),
    })
}

/// Byte offsets of the last `(`…`)` pair in `text`.
fn parenthesized_suffix(text: &str) -> Option<(usize, usize)> {
    let close = text.rfind(')')?;
    let open = text[..close].rfind('(')?;
    Some((open, close))
}

/// Parses the packages reported by `brew upgrade`, in first-seen order without duplicates.
///
/// Two line shapes are recognised:
/// - `[prefix] name old -> new`: the last token before the arrow is the old version and the
///   remaining tokens form the name. Known approximation: a name whose final word looks like
///   a version is split wrongly.
/// - `[prefix] Upgrading name` with no versions (bundle-style output): both versions are
///   recorded as [`UNKNOWN_VERSION`]. `==> Upgrading …` headers are progress markers, not
///   results, and never match this shape.
pub fn parse_upgraded_packages(output: &str) -> Vec<UpgradedPackage> {
    let mut parsed: Vec<UpgradedPackage> = Vec::new();

    for line in output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
    {
        if let Some(package) = parse_transition_line(line) {
            match parsed
                .iter_mut()
                .find(|existing| existing.name == package.name)
            {
                Some(existing) if !existing.has_versions() => *existing = package,
                Some(_) => {}
                None => parsed.push(package),
            }
        } else if let Some(name) = parse_unversioned_line(line)
            && !parsed.iter().any(|existing| existing.name == name)
        {
            parsed.push(UpgradedPackage::unversioned(name));
        }
    }

    parsed
}

fn parse_transition_line(line: &str) -> Option<UpgradedPackage> {
    let (left, right) = line.split_once(TRANSITION_MARKER)?;
    let left = strip_transition_prefix(left.trim());

    let mut tokens: Vec<&str> = left.split_whitespace().collect();
    let old_version = tokens.pop()?;
    if tokens.is_empty() {
        return None;
    }
    let new_version = right.split_whitespace().next()?;

    Some(UpgradedPackage::new(
        tokens.join(" "),
        old_version,
        new_version,
    ))
}

fn strip_transition_prefix(text: &str) -> &str {
    TRANSITION_PREFIXES
        .iter()
        .find_map(|prefix| text.strip_prefix(prefix))
        .map(str::trim_start)
        .unwrap_or(text)
}

fn parse_unversioned_line(line: &str) -> Option<&str> {
    if line.starts_with(HEADER_MARKER) {
        return None;
    }

    let rest = match line.strip_prefix("Upgrading ") {
        Some(rest) => rest,
        None => line.split_once(" Upgrading ")?.1,
    };

    let mut tokens = rest.split_whitespace();
    let name = tokens.next()?;
    if tokens.next().is_some() {
        return None;
    }
    Some(name)
}

/// Status text for a `==> Upgrading <name>` progress header, if `line` is one.
///
/// The `==> Upgrading N outdated packages:` summary header yields `None`.
pub fn upgrading_status(line: &str) -> Option<String> {
    let rest = line.trim().strip_prefix(UPGRADING_HEADER)?;
    let name = rest.split_whitespace().next()?;
    if name.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    Some(format!("Upgrading {name}"))
}

/// Extracts `<SIZE>` from `... freed approximately <SIZE> of disk space.`; empty when brew
/// found nothing to remove.
pub fn parse_cleanup_output(output: &str) -> String {
    output
        .lines()
        .find_map(|line| {
            let start = line.find(FREED_PREFIX)? + FREED_PREFIX.len();
            let rest = &line[start..];
            let end = rest.find(FREED_SUFFIX)?;
            let size = rest[..end].trim();
            (!size.is_empty()).then(|| size.to_string())
        })
        .unwrap_or_default()
}

fn is_diagnostic(line: &str) -> bool {
    line.starts_with(HEADER_MARKER) || line.starts_with("Warning:") || line.starts_with("Error:")
}
