//! Filename grammar of the rotation family.
//!
//! A directory entry belongs to the family iff its basename matches
//! `<base>-<index>.<extension>` exactly, with `index` a string of decimal
//! digits parsing to a value > 0. Anything else is not an error, it is
//! simply invisible to the indexer (but still visible to the generic
//! listing and removal operations).

use core::fmt::Write as _;

use crate::EntryName;

/// A parsed view of a stored file name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogFileName<'a> {
    pub base: &'a str,
    pub index: u32,
    pub extension: &'a str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FindMode {
    /// The literal matching name with the maximum index, unmodified.
    MostRecent,
    /// A synthesized `<pattern>-<max + 1>.<extension>`, starting at index 1
    /// when no family member exists yet.
    NextFree,
}

/// Everything after the last `/`, or the whole string if there is none.
pub(crate) fn basename(name: &str) -> &str {
    name.rsplit_once('/').map_or(name, |(_, base)| base)
}

/// Splits a name into `(base, index, extension)`: the extension after the
/// last `.`, the index after the last `-` before it. Any directory prefix is
/// stripped first. `None` if either delimiter is absent or the middle
/// segment is not a positive decimal number.
pub fn parse(name: &str) -> Option<LogFileName<'_>> {
    let name = basename(name);
    let (stem, extension) = name.rsplit_once('.')?;
    let (base, digits) = stem.rsplit_once('-')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let index: u32 = digits.parse().ok()?;
    (index > 0).then_some(LogFileName {
        base,
        index,
        extension,
    })
}

/// Searches `candidates` for family members of `pattern` + `extension` and
/// returns the most recent member or the next free name, depending on
/// `mode`. Names are returned as basenames without any directory prefix.
///
/// `MostRecent` yields `None` when no candidate matches. `NextFree` is
/// total: with no match it yields `<pattern>-1.<extension>`. Duplicate
/// indices cannot occur on a sane store; should they occur anyway, the
/// later candidate in iteration order wins.
pub fn find<I>(mode: FindMode, candidates: I, pattern: &str, extension: &str) -> Option<EntryName>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut best: Option<(u32, EntryName)> = None;

    for candidate in candidates {
        let candidate = candidate.as_ref();
        let parsed = match parse(candidate) {
            Some(parsed) => parsed,
            None => continue,
        };
        if parsed.base != pattern || parsed.extension != extension {
            continue;
        }
        if best.as_ref().map_or(true, |(max, _)| parsed.index >= *max) {
            let mut literal = EntryName::new();
            if literal.push_str(basename(candidate)).is_err() {
                continue;
            }
            best = Some((parsed.index, literal));
        }
    }

    match mode {
        FindMode::MostRecent => best.map(|(_, literal)| literal),
        FindMode::NextFree => {
            let next_index = best.map_or(1, |(max, _)| max + 1);
            let mut next = EntryName::new();
            write!(next, "{}-{}.{}", pattern, next_index, extension).ok()?;
            Some(next)
        }
    }
}
