use std::sync::Arc;

use serde::Serialize;

use crate::shared::time::Duration;

/// One step of an itinerary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RouteItem {
    /// Wait at a stop for the next bus.
    Wait { stop: Arc<str>, time: Duration },
    /// Ride a bus over `span_count` hops without leaving it.
    Bus {
        bus: Arc<str>,
        from: Arc<str>,
        to: Arc<str>,
        span_count: u32,
        time: Duration,
    },
}

impl RouteItem {
    pub fn time(&self) -> Duration {
        match self {
            RouteItem::Wait { time, .. } => *time,
            RouteItem::Bus { time, .. } => *time,
        }
    }

    pub fn is_wait(&self) -> bool {
        matches!(self, RouteItem::Wait { .. })
    }

    pub fn is_bus(&self) -> bool {
        matches!(self, RouteItem::Bus { .. })
    }
}

/// The fastest way between two stops: alternating wait and ride items.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub total_time: Duration,
    pub items: Vec<RouteItem>,
}

impl Route {
    /// Names of the buses ridden, in order.
    pub fn buses(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|item| match item {
            RouteItem::Bus { bus, .. } => Some(bus.as_ref()),
            RouteItem::Wait { .. } => None,
        })
    }

    pub fn transfers(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.is_bus())
            .count()
            .saturating_sub(1)
    }
}
