use std::fmt;

/// Application identifier embedded in every partition name.
const APP_ID: &str = "squadcache";

/// Suffix marking a partition that is being populated and has not been
/// committed. Staging directories are invisible to enumeration.
pub(crate) const STAGING_SUFFIX: &str = ".staging";

/// The two partition tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Shell,
    Data,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Shell => "shell",
            Tier::Data => "data",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "shell" => Some(Tier::Shell),
            "data" => Some(Tier::Data),
            _ => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deterministic partition identity: `(tier, version)` rendered as
/// `squadcache-<tier>-<version>`. Two versions never share a name, and
/// GC decides current vs stale by exact name match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionName {
    pub tier: Tier,
    pub version: String,
}

impl PartitionName {
    pub fn new(tier: Tier, version: &str) -> Self {
        Self {
            tier,
            version: version.to_string(),
        }
    }

    /// Directory name for this partition under the store root.
    pub fn dir_name(&self) -> String {
        format!("{}-{}-{}", APP_ID, self.tier, self.version)
    }

    /// Parse a directory name back into a partition identity. Returns
    /// `None` for staging directories and anything this store did not
    /// create.
    pub fn parse(dir: &str) -> Option<Self> {
        if dir.ends_with(STAGING_SUFFIX) {
            return None;
        }
        let rest = dir.strip_prefix(APP_ID)?.strip_prefix('-')?;
        let (tier, version) = rest.split_once('-')?;
        if version.is_empty() {
            return None;
        }
        Some(Self {
            tier: Tier::parse(tier)?,
            version: version.to_string(),
        })
    }
}

impl fmt::Display for PartitionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dir_name())
    }
}
