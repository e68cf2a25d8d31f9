//! On-disk fixture files.
//!
//! Fixtures live in a single data directory and are named after the kind
//! of response they hold, optionally tagged with the configured topology:
//!
//! ```text
//! lookup-d.json  lookup-d-isd1.json  list.json  list_clear.json
//! topo-d.json    locations-d.json    isd_whitelist.json
//! get_isd_whitelist-d.json           get_isd_endpoints-d.json
//! ```
//!
//! Files are read on every request and never cached or written.

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::trace;

/// A fixture file kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureKind {
    /// `lookup-{t}.json`
    Lookup,
    /// `lookup-{t}-isd1.json`
    LookupIsd1,
    /// `list.json`
    List,
    /// `list_clear.json`
    ListClear,
    /// `isd_whitelist.json`
    IsdWhitelist,
    /// `get_isd_whitelist-{t}.json`
    GetIsdWhitelist,
    /// `get_isd_endpoints-{t}.json`
    GetIsdEndpoints,
    /// `topo-{t}.json`
    Topology,
    /// `locations-{t}.json`
    Locations,
}

impl FixtureKind {
    /// File name of this fixture for the given topology tag.
    pub fn file_name(self, topology: &str) -> String {
        match self {
            FixtureKind::Lookup => format!("lookup-{topology}.json"),
            FixtureKind::LookupIsd1 => format!("lookup-{topology}-isd1.json"),
            FixtureKind::List => "list.json".to_string(),
            FixtureKind::ListClear => "list_clear.json".to_string(),
            FixtureKind::IsdWhitelist => "isd_whitelist.json".to_string(),
            FixtureKind::GetIsdWhitelist => format!("get_isd_whitelist-{topology}.json"),
            FixtureKind::GetIsdEndpoints => format!("get_isd_endpoints-{topology}.json"),
            FixtureKind::Topology => format!("topo-{topology}.json"),
            FixtureKind::Locations => format!("locations-{topology}.json"),
        }
    }
}

/// Fixture loading errors
#[derive(Debug)]
pub enum FixtureError {
    /// File missing, unreadable or not UTF-8
    Read(PathBuf, std::io::Error),
    /// File content does not have the expected shape
    Malformed(PathBuf, String),
}

impl fmt::Display for FixtureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixtureError::Read(path, e) => {
                write!(f, "Failed to read fixture '{}': {}", path.display(), e)
            }
            FixtureError::Malformed(path, msg) => {
                write!(f, "Malformed fixture '{}': {}", path.display(), msg)
            }
        }
    }
}

impl std::error::Error for FixtureError {}

/// Read-only view of the fixture directory for one topology
#[derive(Debug, Clone)]
pub struct Fixtures {
    root: PathBuf,
    topology: String,
}

impl Fixtures {
    pub fn new(root: impl Into<PathBuf>, topology: impl Into<String>) -> Self {
        Fixtures {
            root: root.into(),
            topology: topology.into(),
        }
    }

    /// Full path of a fixture.
    pub fn path(&self, kind: FixtureKind) -> PathBuf {
        self.root.join(kind.file_name(&self.topology))
    }

    /// Read a fixture verbatim.
    pub fn load(&self, kind: FixtureKind) -> Result<String, FixtureError> {
        let path = self.path(kind);
        trace!(path = %path.display(), "Loading fixture");
        read_fixture(&path)
    }

    /// Read a fixture that must hold a non-empty JSON array.
    pub fn load_array(&self, kind: FixtureKind) -> Result<Vec<serde_json::Value>, FixtureError> {
        let path = self.path(kind);
        let contents = read_fixture(&path)?;

        let entries: Vec<serde_json::Value> = serde_json::from_str(&contents)
            .map_err(|e| FixtureError::Malformed(path.clone(), e.to_string()))?;

        if entries.is_empty() {
            return Err(FixtureError::Malformed(path, "empty array".to_string()));
        }

        Ok(entries)
    }
}

fn read_fixture(path: &Path) -> Result<String, FixtureError> {
    std::fs::read_to_string(path).map_err(|e| FixtureError::Read(path.to_path_buf(), e))
}

/// Directory holding the fixtures shipped with the crate.
#[cfg(test)]
pub(crate) fn shipped_data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names() {
        assert_eq!(FixtureKind::Topology.file_name("d"), "topo-d.json");
        assert_eq!(FixtureKind::LookupIsd1.file_name("w"), "lookup-w-isd1.json");
        assert_eq!(
            FixtureKind::GetIsdEndpoints.file_name("t"),
            "get_isd_endpoints-t.json"
        );
        assert_eq!(FixtureKind::List.file_name("w"), "list.json");
        assert_eq!(FixtureKind::ListClear.file_name("t"), "list_clear.json");
        assert_eq!(FixtureKind::IsdWhitelist.file_name("t"), "isd_whitelist.json");
    }

    #[test]
    fn test_load_verbatim() {
        let fixtures = Fixtures::new(shipped_data_dir(), "d");
        let expected = std::fs::read_to_string(shipped_data_dir().join("topo-d.json")).unwrap();
        assert_eq!(fixtures.load(FixtureKind::Topology).unwrap(), expected);
    }

    #[test]
    fn test_every_shipped_fixture_loads() {
        let kinds = [
            FixtureKind::Lookup,
            FixtureKind::LookupIsd1,
            FixtureKind::List,
            FixtureKind::ListClear,
            FixtureKind::IsdWhitelist,
            FixtureKind::GetIsdWhitelist,
            FixtureKind::GetIsdEndpoints,
            FixtureKind::Topology,
            FixtureKind::Locations,
        ];

        for kind in kinds {
            let fixtures = Fixtures::new(shipped_data_dir(), "d");
            let contents = fixtures.load(kind).unwrap();
            assert!(
                serde_json::from_str::<serde_json::Value>(&contents).is_ok(),
                "{kind:?} is not valid JSON"
            );
        }
    }

    #[test]
    fn test_load_array() {
        let fixtures = Fixtures::new(shipped_data_dir(), "d");
        let entries = fixtures.load_array(FixtureKind::List).unwrap();
        assert!(entries.len() >= 15);

        // An object is not an array
        assert!(matches!(
            fixtures.load_array(FixtureKind::Topology),
            Err(FixtureError::Malformed(..))
        ));
    }

    #[test]
    fn test_missing_fixture() {
        let fixtures = Fixtures::new(shipped_data_dir(), "missing");
        match fixtures.load(FixtureKind::Topology) {
            Err(FixtureError::Read(path, _)) => {
                assert!(path.ends_with("topo-missing.json"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
