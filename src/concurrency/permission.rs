use std::fmt;

/// Access level requested for a page.
///
/// `Read` maps to a shared lock, `Write` to an exclusive lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Permission {
    Read,
    Write,
}

impl Permission {
    /// Whether a lock held at `self` already satisfies a request for `requested`.
    #[inline]
    pub fn covers(self, requested: Permission) -> bool {
        self >= requested
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Read => write!(f, "READ"),
            Permission::Write => write!(f, "WRITE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_covers() {
        assert!(Permission::Write.covers(Permission::Read));
        assert!(Permission::Write.covers(Permission::Write));
        assert!(Permission::Read.covers(Permission::Read));
        assert!(!Permission::Read.covers(Permission::Write));
    }
}
