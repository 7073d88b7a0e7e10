//! Stage identifiers and dependency ordering

use std::fmt;
use std::str::FromStr;

/// Pipeline stage identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageName {
    SongCatalog,
    Activity,
}

impl StageName {
    /// Every stage, in dependency order.
    pub const ALL: [StageName; 2] = [Self::SongCatalog, Self::Activity];

    /// Stages whose output this stage reads.
    pub fn dependencies(self) -> &'static [StageName] {
        match self {
            Self::SongCatalog => &[],
            Self::Activity => &[Self::SongCatalog],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SongCatalog => "song-catalog",
            Self::Activity => "activity",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s || stage.as_str().replace('-', "_") == s)
            .ok_or_else(|| format!("unknown stage '{s}' (expected song-catalog or activity)"))
    }
}

/// Ordered stages to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub stages: Vec<StageName>,
    /// Requested stages whose upstream is not requested; each reads the
    /// output an earlier run left behind.
    pub external_inputs: Vec<(StageName, StageName)>,
}

/// Order `requested` by dependency. Duplicates are collapsed; an empty
/// request means every stage.
pub fn plan(requested: &[StageName]) -> Plan {
    let wanted: Vec<StageName> = if requested.is_empty() {
        StageName::ALL.to_vec()
    } else {
        StageName::ALL
            .into_iter()
            .filter(|s| requested.contains(s))
            .collect()
    };

    let external_inputs = wanted
        .iter()
        .flat_map(|&stage| {
            stage
                .dependencies()
                .iter()
                .filter(|dep| !wanted.contains(dep))
                .map(move |&dep| (stage, dep))
        })
        .collect();

    Plan {
        stages: wanted,
        external_inputs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_depends_on_catalog() {
        assert_eq!(StageName::Activity.dependencies(), &[StageName::SongCatalog]);
        assert!(StageName::SongCatalog.dependencies().is_empty());
    }

    #[test]
    fn plan_orders_by_dependency() {
        let plan = plan(&[StageName::Activity, StageName::SongCatalog, StageName::Activity]);
        assert_eq!(plan.stages, [StageName::SongCatalog, StageName::Activity]);
        assert!(plan.external_inputs.is_empty());
    }

    #[test]
    fn plan_empty_means_all() {
        assert_eq!(plan(&[]).stages, StageName::ALL);
    }

    #[test]
    fn plan_reports_missing_upstream() {
        let plan = plan(&[StageName::Activity]);
        assert_eq!(plan.stages, [StageName::Activity]);
        assert_eq!(
            plan.external_inputs,
            [(StageName::Activity, StageName::SongCatalog)]
        );
    }

    #[test]
    fn parse_and_display() {
        assert_eq!("song-catalog".parse::<StageName>().unwrap(), StageName::SongCatalog);
        assert_eq!("song_catalog".parse::<StageName>().unwrap(), StageName::SongCatalog);
        assert_eq!(StageName::Activity.to_string(), "activity");
        assert!("songs".parse::<StageName>().is_err());
    }
}
