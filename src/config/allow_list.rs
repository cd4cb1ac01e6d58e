// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::ALLOW_ALL;
use std::collections::BTreeSet;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Module permission set, either "permit all" or an explicit set of ids.
///
/// Parsed from the comma-separated configuration format:
/// ```
/// use dagwood_task_runner::config::AllowList;
///
/// let list: AllowList = " path, util ,".parse().unwrap();
/// assert!(list.permits("path"));
/// assert!(!list.permits("fs"));
///
/// let everything: AllowList = "*".parse().unwrap();
/// assert!(everything.permits("fs"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowList {
    All,
    Only(BTreeSet<String>),
}

impl AllowList {
    /// An allow-list permitting nothing.
    pub fn none() -> Self {
        AllowList::Only(BTreeSet::new())
    }

    pub fn permits(&self, module_id: &str) -> bool {
        match self {
            AllowList::All => true,
            AllowList::Only(ids) => ids.contains(module_id),
        }
    }
}

impl Default for AllowList {
    fn default() -> Self {
        AllowList::none()
    }
}

impl FromStr for AllowList {
    type Err = Infallible;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw.trim() == ALLOW_ALL {
            return Ok(AllowList::All);
        }
        let ids = raw
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();
        Ok(AllowList::Only(ids))
    }
}

impl fmt::Display for AllowList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllowList::All => f.write_str(ALLOW_ALL),
            AllowList::Only(ids) => {
                let joined: Vec<&str> = ids.iter().map(String::as_str).collect();
                f.write_str(&joined.join(","))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> AllowList {
        raw.parse().unwrap()
    }

    #[test]
    fn test_wildcard_permits_everything() {
        let list = parse(" * ");
        assert_eq!(list, AllowList::All);
        assert!(list.permits("child_process"));
    }

    #[test]
    fn test_entries_are_trimmed() {
        let list = parse("crypto ,  path,util");
        assert!(list.permits("crypto"));
        assert!(list.permits("path"));
        assert!(list.permits("util"));
        assert!(!list.permits(" path"));
    }

    #[test]
    fn test_empty_string_permits_nothing() {
        let list = parse("");
        assert_eq!(list, AllowList::none());
        assert!(!list.permits(""));
    }

    #[test]
    fn test_wildcard_inside_a_list_is_a_literal_id() {
        let list = parse("*,path");
        assert!(list.permits("path"));
        assert!(!list.permits("fs"));
    }

    #[test]
    fn test_display_round_trips_the_config_format() {
        assert_eq!(parse("util, path").to_string(), "path,util");
        assert_eq!(AllowList::All.to_string(), "*");
    }
}
