//! Command dispatch: maps a parsed request to its response body.

use crate::fixtures::{FixtureError, FixtureKind, Fixtures};
use crate::lookup::generate_random_lookup;
use crate::protocol::Command;
use rand::Rng;
use serde_json::Value;
use tracing::{debug, warn};

/// Number of entries returned for `LIST`
pub const LIST_SAMPLE: usize = 3;

/// `LIST` indices are drawn from `[0, min(LIST_WINDOW, len))`
pub const LIST_WINDOW: usize = 15;

/// Builds response bodies from fixtures
#[derive(Debug, Clone)]
pub struct Dispatcher {
    fixtures: Fixtures,
    random_lookup: bool,
}

impl Dispatcher {
    pub fn new(fixtures: Fixtures, random_lookup: bool) -> Self {
        Dispatcher {
            fixtures,
            random_lookup,
        }
    }

    /// Compute the response body for `command`.
    ///
    /// Unknown commands and fixture failures both produce an empty body.
    pub fn respond<R: Rng + ?Sized>(&self, command: &Command, rng: &mut R) -> String {
        let result = match command {
            Command::Lookup => self.lookup(rng),
            Command::List => self.list(rng),
            Command::Topology => self.fixtures.load(FixtureKind::Topology),
            Command::Locations => self.fixtures.load(FixtureKind::Locations),
            Command::SetIsdWhitelist => self.fixtures.load(FixtureKind::IsdWhitelist),
            Command::GetIsdWhitelist => self.fixtures.load(FixtureKind::GetIsdWhitelist),
            Command::GetIsdEndpoints => self.fixtures.load(FixtureKind::GetIsdEndpoints),
            Command::Clear => self.fixtures.load(FixtureKind::ListClear),
            Command::Unknown(token) => {
                debug!(command = ?token, "Unknown command, empty response");
                return String::new();
            }
        };

        match result {
            Ok(body) => body,
            Err(e) => {
                warn!(?command, error = %e, "Fixture unavailable, empty response");
                String::new()
            }
        }
    }

    fn lookup<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<String, FixtureError> {
        if self.random_lookup {
            return Ok(generate_random_lookup(rng));
        }

        // Base fixture or the ISD-1 variant with equal probability
        if rng.gen_bool(0.5) {
            self.fixtures.load(FixtureKind::Lookup)
        } else {
            self.fixtures.load(FixtureKind::LookupIsd1)
        }
    }

    fn list<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<String, FixtureError> {
        let entries = self.fixtures.load_array(FixtureKind::List)?;
        let window = entries.len().min(LIST_WINDOW);

        let sample: Vec<&Value> = (0..LIST_SAMPLE)
            .map(|_| &entries[rng.gen_range(0..window)])
            .collect();

        serde_json::to_string(&sample).map_err(|e| {
            FixtureError::Malformed(self.fixtures.path(FixtureKind::List), e.to_string())
        })
    }
}
