use omnibus::{
    repository::{BusKind, Repository},
    router::{Error, Graph, RouteItem, Router, RoutingSettings},
    shared::Duration,
};

fn simple_line() -> Repository {
    let mut repository = Repository::new();
    repository.add_stop("S1", (0.0, 0.0).into());
    repository.add_stop("S2", (0.0, 1.0).into());
    repository.add_stop("S3", (0.0, 2.0).into());
    repository
        .add_bus("L1", BusKind::Linear, &["S1", "S2", "S3"])
        .unwrap();
    repository
}

/// A slow direct bus and two quick ones with a change at B.
fn transfer_network() -> Repository {
    let mut repository = Repository::new();
    repository.add_stop("A", (55.611087, 37.20829).into());
    repository.add_stop("B", (55.595884, 37.209755).into());
    repository.add_stop("X", (55.632761, 37.333324).into());
    repository.add_stop("D", (55.574371, 37.6517).into());
    repository.add_stop("Island", (55.581065, 37.64839).into());
    repository.set_distance("A", "X", 10_000).unwrap();
    repository.set_distance("X", "D", 10_000).unwrap();
    repository.set_distance("A", "B", 1000).unwrap();
    repository.set_distance("B", "D", 1000).unwrap();
    repository
        .add_bus("direct", BusKind::Linear, &["A", "X", "D"])
        .unwrap();
    repository
        .add_bus("first", BusKind::Linear, &["A", "B"])
        .unwrap();
    repository
        .add_bus("second", BusKind::Linear, &["B", "D"])
        .unwrap();
    repository
}

fn transfer_settings() -> RoutingSettings {
    RoutingSettings::new(60.0, 1.0)
}

#[test]
fn simple_linear_line() {
    let repository = simple_line();
    let mut router = Router::new(&repository).with_settings(RoutingSettings::new(1e9, 0.0));
    let route = router.find_route("S1", "S3").unwrap().unwrap();

    assert_eq!(route.items.len(), 2);
    assert!(matches!(&route.items[0], RouteItem::Wait { stop, .. } if &**stop == "S1"));
    match &route.items[1] {
        RouteItem::Bus {
            bus,
            from,
            to,
            span_count,
            time,
        } => {
            assert_eq!(&**bus, "L1");
            assert_eq!(&**from, "S1");
            assert_eq!(&**to, "S3");
            assert_eq!(*span_count, 2);
            assert!(*time > Duration::default());
        }
        item => panic!("expected a ride, got {item:?}"),
    }
    assert!(route.total_time > Duration::default());
}

#[test]
fn transfer_beats_slow_direct_bus() {
    let repository = transfer_network();
    let mut router = Router::new(&repository).with_settings(transfer_settings());
    let route = router.find_route("A", "D").unwrap().unwrap();

    assert_eq!(route.total_time, Duration::from_minutes(4.0));
    assert_eq!(route.buses().collect::<Vec<_>>(), vec!["first", "second"]);
    assert_eq!(route.transfers(), 1);
    assert_eq!(route.items.iter().filter(|item| item.is_wait()).count(), 2);
    assert_eq!(
        route.items,
        vec![
            RouteItem::Wait {
                stop: "A".into(),
                time: Duration::from_minutes(1.0),
            },
            RouteItem::Bus {
                bus: "first".into(),
                from: "A".into(),
                to: "B".into(),
                span_count: 1,
                time: Duration::from_minutes(1.0),
            },
            RouteItem::Wait {
                stop: "B".into(),
                time: Duration::from_minutes(1.0),
            },
            RouteItem::Bus {
                bus: "second".into(),
                from: "B".into(),
                to: "D".into(),
                span_count: 1,
                time: Duration::from_minutes(1.0),
            },
        ]
    );
}

#[test]
fn item_times_add_up() {
    let repository = transfer_network();
    let mut router = Router::new(&repository).with_settings(transfer_settings());
    let route = router.find_route("X", "B").unwrap().unwrap();
    let sum = route
        .items
        .iter()
        .fold(Duration::default(), |sum, item| sum + item.time());
    assert!((sum.as_minutes() - route.total_time.as_minutes()).abs() < 1e-9);
}

#[test]
fn same_stop_is_an_empty_route() {
    let repository = transfer_network();
    let mut router = Router::new(&repository);
    let route = router.find_route("A", "A").unwrap().unwrap();
    assert!(route.items.is_empty());
    assert_eq!(route.total_time, Duration::default());
}

#[test]
fn unreachable_is_not_an_error() {
    let repository = transfer_network();
    let mut router = Router::new(&repository);
    assert!(router.find_route("A", "Island").unwrap().is_none());
    assert!(router.find_route("Island", "D").unwrap().is_none());
}

#[test]
fn unknown_stop_is_an_error() {
    let repository = transfer_network();
    let mut router = Router::new(&repository);
    assert!(matches!(
        router.find_route("A", "Atlantis"),
        Err(Error::UnknownStop(name)) if name == "Atlantis"
    ));
    // Name checks come before any work
    assert!(!router.is_ready());
}

#[test]
fn empty_network_never_routes() {
    let repository = Repository::new();
    let mut router = Router::new(&repository);
    assert!(matches!(
        router.find_route("A", "B"),
        Err(Error::UnknownStop(_))
    ));
}

#[test]
fn first_query_precomputes() {
    let repository = transfer_network();
    let mut router = Router::new(&repository);
    assert!(!router.is_ready());
    router.find_route("A", "D").unwrap();
    assert!(router.is_ready());
}

#[test]
fn route_before_precompute_is_none() {
    let repository = transfer_network();
    let mut router = Router::new(&repository).with_settings(transfer_settings());
    assert!(router.route("A", "D").unwrap().is_none());
    assert!(router.route("A", "Atlantis").is_err());

    router.precompute().unwrap();
    assert_eq!(
        router.route("A", "D").unwrap(),
        router.find_route("A", "D").unwrap()
    );
}

#[test]
fn ready_router_is_shared_between_threads() {
    let repository = transfer_network();
    let mut router = Router::new(&repository).with_settings(transfer_settings());
    router.precompute().unwrap();
    let expected = router.route("A", "D").unwrap();

    let router = &router;
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(move || router.route("A", "D").unwrap()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}

/// Shortest distances by plain edge relaxation, infinite when unreachable.
fn bellman_ford(graph: &Graph, source: usize) -> Vec<f64> {
    let mut best = vec![f64::INFINITY; graph.vertex_count()];
    best[source] = 0.0;
    for _ in 0..graph.vertex_count() {
        for edge in graph.edges() {
            let candidate = best[edge.from as usize] + edge.weight.total_time.as_minutes();
            if candidate < best[edge.to as usize] {
                best[edge.to as usize] = candidate;
            }
        }
    }
    best
}

#[test]
fn routes_are_optimal_and_complete() {
    let repository = transfer_network();
    let mut router = Router::new(&repository).with_settings(transfer_settings());
    router.precompute().unwrap();
    let graph = router.graph().unwrap();
    let stops = repository.all_stops();

    for from in stops {
        let best = bellman_ford(graph, from.id as usize);
        for to in stops {
            let route = router.route(&from.name, &to.name).unwrap();
            match (route, best[to.id as usize]) {
                (None, expected) => assert!(expected.is_infinite(), "{} -> {}", from.name, to.name),
                (Some(route), expected) => {
                    assert!((route.total_time.as_minutes() - expected).abs() < 1e-9)
                }
            }
        }
    }
}

#[test]
fn route_serializes_to_json() {
    let repository = transfer_network();
    let mut router = Router::new(&repository).with_settings(transfer_settings());
    let route = router.find_route("A", "D").unwrap().unwrap();
    assert!(route.items[0].is_wait());
    assert!(route.items[1].is_bus());

    let json = serde_json::to_value(&route).unwrap();
    assert_eq!(json["total_time"], 4.0);
    assert_eq!(json["items"][0]["Wait"]["stop"], "A");
    assert_eq!(json["items"][1]["Bus"]["bus"], "first");
    assert_eq!(json["items"][1]["Bus"]["span_count"], 1);
    assert_eq!(json["items"][3]["Bus"]["to"], "D");
}
