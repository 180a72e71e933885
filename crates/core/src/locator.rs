use crate::platform::DirectoryEntry;
use crate::resolve::{pick, Resolution};

/// Find one directory entry from free text matched against display name and username.
///
/// The pool is every entry whose display name or username contains the query.
/// Inside the pool a unique exact match wins, then a unique prefix match, then
/// a pool of one. Anything else is ambiguous and carries the whole pool.
pub fn locate_member<'a>(
    query: &str,
    directory: &'a [DirectoryEntry],
) -> Resolution<&'a DirectoryEntry> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Resolution::NotFound;
    }

    let fields = |entry: &DirectoryEntry| {
        (
            entry.display_name.to_lowercase(),
            entry.username.to_lowercase(),
        )
    };

    let pool: Vec<(&DirectoryEntry, (String, String))> = directory
        .iter()
        .map(|entry| (entry, fields(entry)))
        .filter(|(_, (display, user))| display.contains(&needle) || user.contains(&needle))
        .collect();

    if pool.is_empty() {
        return Resolution::NotFound;
    }

    let exact: Vec<_> = pool
        .iter()
        .filter(|(_, (display, user))| *display == needle || *user == needle)
        .collect();
    if exact.len() == 1 {
        return Resolution::Found(exact[0].0);
    }

    let starts: Vec<_> = pool
        .iter()
        .filter(|(_, (display, user))| display.starts_with(&needle) || user.starts_with(&needle))
        .collect();
    if starts.len() == 1 {
        return Resolution::Found(starts[0].0);
    }

    pick(pool.into_iter().map(|(entry, _)| entry).collect())
}
