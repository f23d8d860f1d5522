use std::{ffi::OsString, fs, io, path::PathBuf, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    repository::{self, BusKind, Repository},
    router::{self, Router, RoutingState},
    shared::geo::Coordinate,
};

/// Bumped whenever the snapshot layout changes.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Snapshot encoding error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Snapshot format version {found} is not supported, expected {expected}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("Snapshot catalogue is invalid: {0}")]
    Repository(#[from] repository::Error),
    #[error("Snapshot routing state is invalid: {0}")]
    Router(#[from] router::Error),
    #[error("Router has no routing state to save, precompute it first")]
    NotReady,
}

/// Where snapshots are written to and read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub file_name: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            file_name: "transport_catalogue.db".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopRecord {
    pub id: u32,
    pub name: String,
    pub coordinate: Coordinate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusRecord {
    pub id: u32,
    pub name: String,
    pub kind: BusKind,
    pub stops: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceRecord {
    pub from: u32,
    pub to: u32,
    pub meters: u32,
}

/// Everything needed to answer queries in a fresh process without rebuilding:
/// the catalogue records, the routing state and whatever renderer settings the host keeps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub stops: Vec<StopRecord>,
    pub buses: Vec<BusRecord>,
    pub distances: Vec<DistanceRecord>,
    pub routing: RoutingState,
    /// Carried through untouched.
    pub render_settings: Option<serde_json::Value>,
}

impl Snapshot {
    /// Copies the router's state together with the catalogue it was computed for.
    /// Fails if the router is not ready.
    pub fn capture(router: &Router<'_>) -> Result<Self, self::Error> {
        let routing = router.export_state().ok_or(self::Error::NotReady)?;
        let repository = router.repository();
        let stops = repository
            .all_stops()
            .iter()
            .map(|stop| StopRecord {
                id: stop.id,
                name: stop.name.to_string(),
                coordinate: stop.coordinate,
            })
            .collect();
        let buses = repository
            .all_buses()
            .iter()
            .map(|bus| BusRecord {
                id: bus.id,
                name: bus.name.to_string(),
                kind: bus.kind,
                stops: bus.stops.to_vec(),
            })
            .collect();
        let distances = repository
            .distances()
            .into_iter()
            .map(|(from, to, meters)| DistanceRecord { from, to, meters })
            .collect();
        Ok(Self {
            version: FORMAT_VERSION,
            stops,
            buses,
            distances,
            routing,
            render_settings: None,
        })
    }

    pub fn with_render_settings(mut self, render_settings: serde_json::Value) -> Self {
        self.render_settings = Some(render_settings);
        self
    }

    /// Rebuilds the catalogue with the recorded ids and checks the routing state against it.
    pub fn restore(self) -> Result<Restored, self::Error> {
        if self.version != FORMAT_VERSION {
            return Err(self::Error::VersionMismatch {
                expected: FORMAT_VERSION,
                found: self.version,
            });
        }

        let mut repository = Repository::new();
        for stop in self.stops.iter() {
            repository.add_stop_with_id(stop.id, &stop.name, stop.coordinate);
        }
        for bus in self.buses.iter() {
            repository.add_bus_with_stop_ids(bus.id, &bus.name, bus.kind, &bus.stops)?;
        }
        for distance in self.distances.iter() {
            repository.set_distance_by_id(distance.from, distance.to, distance.meters)?;
        }
        self.routing.validate(&repository)?;

        Ok(Restored {
            repository,
            routing: Arc::new(self.routing),
            render_settings: self.render_settings,
        })
    }
}

/// A validated snapshot, ready to serve queries.
#[derive(Debug)]
pub struct Restored {
    pub repository: Repository,
    routing: Arc<RoutingState>,
    pub render_settings: Option<serde_json::Value>,
}

impl Restored {
    pub fn routing(&self) -> &RoutingState {
        &self.routing
    }

    /// A ready router over the restored catalogue. Routers share the restored state.
    pub fn router(&self) -> Router<'_> {
        Router::from_validated(&self.repository, Arc::clone(&self.routing))
    }
}

/// Serializes the catalogue and the router's precomputed state into one blob.
pub fn export_state(
    router: &Router<'_>,
    render_settings: Option<serde_json::Value>,
) -> Result<Vec<u8>, self::Error> {
    let mut snapshot = Snapshot::capture(router)?;
    snapshot.render_settings = render_settings;
    Ok(serde_json::to_vec(&snapshot)?)
}

/// Decodes and validates a blob produced by [`export_state`].
/// Nothing is returned unless every part of it is usable.
pub fn import_state(blob: &[u8]) -> Result<Restored, self::Error> {
    let snapshot: Snapshot = serde_json::from_slice(blob)?;
    snapshot.restore().inspect_err(|err| {
        warn!(%err, "Rejected snapshot");
    })
}

/// Writes a blob to the configured file. The blob goes to a sibling file first and is
/// renamed over the target, so the target is either the old or the new snapshot.
pub fn save(settings: &Settings, blob: &[u8]) -> Result<(), self::Error> {
    let mut staging = OsString::from(settings.file_name.as_os_str());
    staging.push(".tmp");
    let staging = PathBuf::from(staging);

    let written = fs::write(&staging, blob).and_then(|_| fs::rename(&staging, &settings.file_name));
    if let Err(err) = written {
        let _ = fs::remove_file(&staging);
        return Err(err.into());
    }
    info!(path = %settings.file_name.display(), bytes = blob.len(), "Saved snapshot");
    Ok(())
}

pub fn load(settings: &Settings) -> Result<Restored, self::Error> {
    let blob = fs::read(&settings.file_name)?;
    info!(path = %settings.file_name.display(), bytes = blob.len(), "Loaded snapshot");
    import_state(&blob)
}
