pub use crate::{
    persistence::{Restored, Settings as PersistenceSettings, Snapshot},
    repository::{Bus, BusInfo, BusKind, Repository, Stop},
    router::{Route, RouteItem, Router, RoutingSettings, RoutingState},
    shared::{Coordinate, Distance, Duration, Speed},
};
